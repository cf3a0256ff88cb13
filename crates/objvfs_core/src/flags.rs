//! Open and sync flag bits passed by the engine.
//!
//! Bit values match the engine's C API so a binding layer can pass them
//! through unchanged.

use std::ops::BitOr;

/// Flags for [`crate::Vfs::open`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OpenFlags(u32);

impl OpenFlags {
    /// Open read-only.
    pub const READ_ONLY: Self = Self(0x0000_0001);
    /// Open for reading and writing.
    pub const READ_WRITE: Self = Self(0x0000_0002);
    /// Create the file if missing.
    pub const CREATE: Self = Self(0x0000_0004);
    /// The file is a main database.
    pub const MAIN_DB: Self = Self(0x0000_0100);
    /// The file is a main rollback journal.
    pub const MAIN_JOURNAL: Self = Self(0x0000_0800);
    /// The file is a write-ahead log.
    pub const WAL: Self = Self(0x0008_0000);

    /// Wraps raw flag bits.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Returns the raw flag bits.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Returns true if every bit of `other` is set.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns true if the handle must reject writes.
    #[must_use]
    pub const fn is_read_only(self) -> bool {
        self.contains(Self::READ_ONLY) && !self.contains(Self::READ_WRITE)
    }
}

impl BitOr for OpenFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Flags for [`crate::VfsFile::sync`].
///
/// Every sync uploads the whole staging file, so the variants only differ
/// for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncFlags(u32);

impl SyncFlags {
    /// Normal sync.
    pub const NORMAL: Self = Self(0x0000_0002);
    /// Full sync.
    pub const FULL: Self = Self(0x0000_0003);
    /// Data only, metadata may lag.
    pub const DATA_ONLY: Self = Self(0x0000_0010);

    /// Wraps raw flag bits.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Returns the raw flag bits.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }
}
