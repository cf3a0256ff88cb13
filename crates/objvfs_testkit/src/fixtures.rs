//! Test fixtures and VFS helpers.
//!
//! Every fixture owns a temporary scratch directory and an in-memory store
//! it shares with the VFS, so tests can inspect uploaded objects directly.

use crate::fault::FaultyStore;
use objvfs_core::{ObjectVfs, OpenFlags, VfsConfig};
use objvfs_store::{CallContext, InMemoryObjectStore, ObjectStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// A VFS over an in-memory store with automatic cleanup.
pub struct TestVfs {
    /// The VFS instance.
    pub vfs: ObjectVfs,
    /// The store the VFS uploads to.
    pub store: InMemoryObjectStore,
    /// The temporary scratch directory (kept alive to prevent cleanup).
    scratch: TempDir,
}

impl TestVfs {
    /// Creates a VFS with a fresh store.
    pub fn new() -> Self {
        Self::with_store(InMemoryObjectStore::new())
    }

    /// Creates a VFS over an existing store, e.g. to simulate a second
    /// process attaching to the same bucket.
    pub fn with_store(store: InMemoryObjectStore) -> Self {
        let scratch = TempDir::new().expect("Failed to create scratch directory");
        let vfs = ObjectVfs::with_store(
            VfsConfig::new().scratch_dir(scratch.path()),
            Arc::new(store.clone()),
        );
        Self {
            vfs,
            store,
            scratch,
        }
    }

    /// Returns the scratch directory.
    pub fn scratch_dir(&self) -> &Path {
        self.scratch.path()
    }

    /// Stores `data` directly as `bucket/key`, bypassing the VFS.
    pub fn seed(&self, bucket: &str, key: &str, data: &[u8]) {
        self.store
            .put(&CallContext::background(), bucket, key, data)
            .expect("Failed to seed object");
    }
}

impl Default for TestVfs {
    fn default() -> Self {
        Self::new()
    }
}

/// A VFS whose store can be told to fail.
pub struct FaultyVfs {
    /// The VFS instance.
    pub vfs: ObjectVfs,
    /// The fault switchboard wrapping the store.
    pub faults: Arc<FaultyStore>,
    /// The store behind the fault layer.
    pub store: InMemoryObjectStore,
    _scratch: TempDir,
}

impl FaultyVfs {
    /// Creates a VFS over a fault-injecting in-memory store.
    pub fn new() -> Self {
        let scratch = TempDir::new().expect("Failed to create scratch directory");
        let store = InMemoryObjectStore::new();
        let faults = Arc::new(FaultyStore::new(Arc::new(store.clone())));
        let vfs = ObjectVfs::with_store(
            VfsConfig::new().scratch_dir(scratch.path()),
            Arc::clone(&faults) as Arc<dyn ObjectStore>,
        );
        Self {
            vfs,
            faults,
            store,
            _scratch: scratch,
        }
    }
}

impl Default for FaultyVfs {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs a test with a temporary VFS.
pub fn with_test_vfs<F, R>(f: F) -> R
where
    F: FnOnce(&TestVfs) -> R,
{
    let t = TestVfs::new();
    f(&t)
}

/// Open flags for a read-write handle that may create the object.
pub fn rw_flags() -> OpenFlags {
    OpenFlags::READ_WRITE | OpenFlags::CREATE
}

/// Returns the staging path of a side file next to `staging`.
pub fn side_path(staging: &Path, suffix: &str) -> PathBuf {
    PathBuf::from(format!("{}{}", staging.display(), suffix))
}
