//! VFS configuration.

use objvfs_store::CallContext;
use std::path::PathBuf;

/// Name the VFS registers under unless configured otherwise.
pub const DEFAULT_VFS_NAME: &str = "objstore";

/// Default size of a single range read while loading a staging file.
pub const DEFAULT_HYDRATE_CHUNK_SIZE: usize = 4 * 1024 * 1024;

/// Configuration for an [`crate::ObjectVfs`].
#[derive(Debug, Clone)]
pub struct VfsConfig {
    /// Name the VFS is registered under.
    pub name: String,

    /// Directory holding staging files, one per open object.
    pub scratch_dir: PathBuf,

    /// Bytes fetched per range read when loading an existing object.
    pub hydrate_chunk_size: usize,

    /// Context handed to every remote call that has no caller context.
    pub context: CallContext,
}

impl Default for VfsConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_VFS_NAME.to_string(),
            scratch_dir: std::env::temp_dir().join("objvfs"),
            hydrate_chunk_size: DEFAULT_HYDRATE_CHUNK_SIZE,
            context: CallContext::background(),
        }
    }
}

impl VfsConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the registration name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the staging directory.
    #[must_use]
    pub fn scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = dir.into();
        self
    }

    /// Sets the hydrate chunk size. Zero is clamped to one byte.
    #[must_use]
    pub fn hydrate_chunk_size(mut self, size: usize) -> Self {
        self.hydrate_chunk_size = size.max(1);
        self
    }

    /// Sets the default call context.
    #[must_use]
    pub fn context(mut self, ctx: CallContext) -> Self {
        self.context = ctx;
        self
    }
}
