//! CLI command implementations.

pub mod resolve;
pub mod rm;
pub mod stat;
pub mod transfer;

use objvfs_core::{ObjectVfs, VfsConfig};
use objvfs_store::{LocalDirObjectStore, ObjectStore, StoreError, StoreResult};
use std::path::PathBuf;
use std::sync::Arc;

/// Backend selection shared by every command.
#[derive(Debug, Default, Clone)]
pub struct StoreArgs {
    /// Root of a local directory store.
    pub store_root: Option<PathBuf>,
    /// Use S3 instead of a local directory.
    #[cfg(feature = "s3")]
    pub s3: bool,
    /// S3 region override.
    #[cfg(feature = "s3")]
    pub region: Option<String>,
    /// S3 endpoint override.
    #[cfg(feature = "s3")]
    pub endpoint: Option<String>,
    /// Staging directory override.
    pub scratch_dir: Option<PathBuf>,
}

/// A VFS and the store client behind it.
pub struct Session {
    /// The VFS every command goes through.
    pub vfs: ObjectVfs,
    /// The raw store, for metadata the VFS contract does not expose.
    pub store: Arc<dyn ObjectStore>,
}

impl StoreArgs {
    /// Builds a VFS over the selected backend.
    pub fn build(&self) -> Result<Session, Box<dyn std::error::Error>> {
        let store = self.build_store()?;
        Ok(Session {
            vfs: ObjectVfs::with_store(self.config(), Arc::clone(&store)),
            store,
        })
    }

    /// Builds a VFS that connects to the backend on first use.
    ///
    /// Commands that only map paths never touch the store, so they work
    /// without any backend flags.
    pub fn build_lazy(&self) -> ObjectVfs {
        let args = self.clone();
        ObjectVfs::new(
            self.config(),
            move || -> StoreResult<Arc<dyn ObjectStore>> {
                args.build_store()
                    .map_err(|e| StoreError::ClientInit(e.to_string()))
            },
        )
    }

    fn config(&self) -> VfsConfig {
        let mut config = VfsConfig::new();
        if let Some(dir) = &self.scratch_dir {
            config = config.scratch_dir(dir);
        }
        config
    }

    #[cfg(feature = "s3")]
    fn build_store(&self) -> Result<Arc<dyn ObjectStore>, Box<dyn std::error::Error>> {
        if self.s3 {
            let mut config = objvfs_store::S3Config::default();
            if let Some(region) = &self.region {
                config = config.region(region);
            }
            if let Some(endpoint) = &self.endpoint {
                config = config.endpoint_url(endpoint);
            }
            return Ok(Arc::new(objvfs_store::S3ObjectStore::new(config)?));
        }
        self.build_local_store()
    }

    #[cfg(not(feature = "s3"))]
    fn build_store(&self) -> Result<Arc<dyn ObjectStore>, Box<dyn std::error::Error>> {
        self.build_local_store()
    }

    fn build_local_store(&self) -> Result<Arc<dyn ObjectStore>, Box<dyn std::error::Error>> {
        let root = self
            .store_root
            .as_ref()
            .ok_or("--store-root required for the local directory store")?;
        Ok(Arc::new(LocalDirObjectStore::open(root)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use objvfs_core::{OpenFlags, Vfs, VfsError};
    use tempfile::tempdir;

    #[test]
    fn lazy_vfs_reports_missing_backend_on_open() {
        let scratch = tempdir().unwrap();
        let vfs = StoreArgs {
            scratch_dir: Some(scratch.path().to_path_buf()),
            ..StoreArgs::default()
        }
        .build_lazy();

        let staging = vfs.full_pathname("mydb/app.db").unwrap();
        assert!(matches!(
            vfs.open(&staging, OpenFlags::READ_WRITE | OpenFlags::CREATE),
            Err(VfsError::StorageClientInit(_))
        ));
    }
}
