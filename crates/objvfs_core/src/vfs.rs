//! The engine-facing VFS contract and its object-store implementation.

use crate::config::VfsConfig;
use crate::error::{RemoteOp, VfsError, VfsResult};
use crate::file::{hydrate, ObjectFile};
use crate::flags::{OpenFlags, SyncFlags};
use crate::path::{PathInfo, PathTable};
use objvfs_store::{CallContext, ObjectHandle, ObjectStore, StoreResult};
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A virtual file system the database engine calls into.
///
/// The method set mirrors what the engine's driver invokes. Implementations
/// must be `Send + Sync`: the engine calls from arbitrary internal threads.
pub trait Vfs: Send + Sync {
    /// Returns the name the VFS is registered under.
    fn name(&self) -> &str;

    /// Maps an engine-supplied path to the path later passed to `open`.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is malformed or its staging path is
    /// held open for a different object.
    fn full_pathname(&self, path: &str) -> VfsResult<PathBuf>;

    /// Opens a file previously resolved by `full_pathname`, or one of its
    /// side files.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is unknown, the storage client cannot be
    /// created, or local staging fails.
    fn open(&self, path: &Path, flags: OpenFlags) -> VfsResult<Box<dyn VfsFile>>;

    /// Deletes the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is unknown or deletion fails.
    fn delete(&self, path: &Path, sync_dir: bool) -> VfsResult<()>;

    /// Returns true if the file at `path` exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is unknown or existence cannot be
    /// determined.
    fn access(&self, path: &Path) -> VfsResult<bool>;
}

/// An open file as seen by the database engine.
pub trait VfsFile: Send + Sync {
    /// Reads into `buf` starting at `offset`, returning the bytes read.
    ///
    /// Reading past the end is not an error: the count is short and the rest
    /// of `buf` is zero-filled.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    fn read_at(&self, buf: &mut [u8], offset: u64) -> VfsResult<usize>;

    /// Writes `buf` at `offset`, returning the bytes written.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn write_at(&self, buf: &[u8], offset: u64) -> VfsResult<usize>;

    /// Makes every previous write durable.
    ///
    /// # Errors
    ///
    /// Returns an error if the data could not be made durable; writes stay
    /// pending and a later sync retries them.
    fn sync(&self, flags: SyncFlags) -> VfsResult<()>;

    /// Truncates or extends the file to `size` bytes.
    ///
    /// Like a write, the new length only becomes durable on the next sync.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be resized.
    fn truncate(&self, size: u64) -> VfsResult<()>;

    /// Returns the file size in bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the size cannot be determined.
    fn file_size(&self) -> VfsResult<u64>;

    /// Releases the handle. Does not sync.
    ///
    /// # Errors
    ///
    /// Returns an error if local resources cannot be released.
    fn close(&mut self) -> VfsResult<()>;
}

/// Creates the object-store client on first use.
pub trait StoreFactory: Send + Sync {
    /// Builds a client.
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be constructed.
    fn create(&self) -> StoreResult<Arc<dyn ObjectStore>>;
}

impl<F> StoreFactory for F
where
    F: Fn() -> StoreResult<Arc<dyn ObjectStore>> + Send + Sync,
{
    fn create(&self) -> StoreResult<Arc<dyn ObjectStore>> {
        self()
    }
}

/// A VFS that keeps every database file in an object store.
///
/// Each open file is staged in a local file under the configured scratch
/// directory and uploaded whole on sync.
///
/// # Example
///
/// ```rust
/// use objvfs_core::{ObjectVfs, OpenFlags, SyncFlags, Vfs, VfsConfig};
/// use objvfs_store::InMemoryObjectStore;
/// use std::sync::Arc;
///
/// let scratch = tempfile::tempdir().unwrap();
/// let vfs = ObjectVfs::with_store(
///     VfsConfig::new().scratch_dir(scratch.path()),
///     Arc::new(InMemoryObjectStore::new()),
/// );
///
/// let staging = vfs.full_pathname("mydb/app.db").unwrap();
/// let mut file = vfs.open(&staging, OpenFlags::READ_WRITE | OpenFlags::CREATE).unwrap();
/// file.write_at(b"page", 0).unwrap();
/// file.sync(SyncFlags::NORMAL).unwrap();
/// assert_eq!(file.file_size().unwrap(), 4);
/// file.close().unwrap();
/// ```
pub struct ObjectVfs {
    config: VfsConfig,
    table: Arc<PathTable>,
    factory: Box<dyn StoreFactory>,
    store: Mutex<Option<Arc<dyn ObjectStore>>>,
}

impl ObjectVfs {
    /// Creates a VFS whose store client is built lazily by `factory`.
    #[must_use]
    pub fn new(config: VfsConfig, factory: impl StoreFactory + 'static) -> Self {
        Self {
            config,
            table: Arc::new(PathTable::new()),
            factory: Box::new(factory),
            store: Mutex::new(None),
        }
    }

    /// Creates a VFS around an existing store client.
    #[must_use]
    pub fn with_store(config: VfsConfig, store: Arc<dyn ObjectStore>) -> Self {
        let vfs = Self::new(config, {
            let store = Arc::clone(&store);
            move || -> StoreResult<Arc<dyn ObjectStore>> { Ok(Arc::clone(&store)) }
        });
        *vfs.store.lock() = Some(store);
        vfs
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &VfsConfig {
        &self.config
    }

    /// Returns the staging-path table.
    #[must_use]
    pub fn path_table(&self) -> &PathTable {
        &self.table
    }

    /// Opens a file whose remote calls honour `ctx` instead of the
    /// configured default context.
    ///
    /// Read-write handles load an existing object into an empty staging
    /// file. Read-only handles never write the staging file, so they skip
    /// that load and read the object directly.
    ///
    /// # Errors
    ///
    /// Returns `UnknownPath` if the path (or its base for side files) was
    /// never registered, `StorageClientInit` if the client cannot be
    /// created, `LocalIo` if the staging file cannot be prepared, and `Read`
    /// if an existing object cannot be loaded.
    pub fn open_with_context(
        &self,
        path: &Path,
        flags: OpenFlags,
        ctx: CallContext,
    ) -> VfsResult<ObjectFile> {
        let store = self.store()?;
        let (info, kind) = self.table.acquire(path)?;

        let object = ObjectHandle::new(store, info.bucket(), info.key());
        let file = match self.prepare_staging(path, flags, &object, &ctx) {
            Ok(file) => file,
            Err(e) => {
                self.table.release_with(path, |remaining| {
                    if remaining == 0 {
                        remove_staging(path);
                    }
                });
                return Err(e);
            }
        };

        debug!(object = %info, ?kind, flags = flags.bits(), staging = %path.display(), "file opened");
        Ok(ObjectFile::new(
            path.to_path_buf(),
            info,
            kind,
            flags,
            file,
            object,
            Arc::clone(&self.table),
            ctx,
        ))
    }

    fn prepare_staging(
        &self,
        path: &Path,
        flags: OpenFlags,
        object: &ObjectHandle,
        ctx: &CallContext,
    ) -> VfsResult<File> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| VfsError::local_io(parent, e))?;
        }
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|e| VfsError::local_io(path, e))?;

        let staged = file
            .metadata()
            .map_err(|e| VfsError::local_io(path, e))?
            .len();
        if staged == 0 && !flags.is_read_only() {
            hydrate(path, &mut file, object, ctx, self.config.hydrate_chunk_size)?;
        }
        Ok(file)
    }

    fn store(&self) -> VfsResult<Arc<dyn ObjectStore>> {
        let mut slot = self.store.lock();
        if let Some(store) = slot.as_ref() {
            return Ok(Arc::clone(store));
        }
        let store = self
            .factory
            .create()
            .map_err(VfsError::StorageClientInit)?;
        info!(vfs = %self.config.name, "storage client initialized");
        *slot = Some(Arc::clone(&store));
        Ok(store)
    }

    fn handle_for(&self, path: &Path) -> VfsResult<ObjectHandle> {
        let store = self.store()?;
        let (info, _) = self.table.resolve(path)?;
        Ok(ObjectHandle::new(store, info.bucket(), info.key()))
    }
}

impl Vfs for ObjectVfs {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn full_pathname(&self, path: &str) -> VfsResult<PathBuf> {
        let info = PathInfo::parse(path)?;
        let staging = self.config.scratch_dir.join(info.key());
        self.table.register(staging.clone(), info)?;
        debug!(logical = path, staging = %staging.display(), "path registered");
        Ok(staging)
    }

    fn open(&self, path: &Path, flags: OpenFlags) -> VfsResult<Box<dyn VfsFile>> {
        let file = self.open_with_context(path, flags, self.config.context.clone())?;
        Ok(Box::new(file))
    }

    fn delete(&self, path: &Path, sync_dir: bool) -> VfsResult<()> {
        let object = self.handle_for(path)?;
        match object.delete(&self.config.context) {
            Ok(()) => {
                info!(bucket = object.bucket(), key = object.key(), sync_dir, "object deleted");
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                debug!(bucket = object.bucket(), key = object.key(), "delete of missing object");
                Ok(())
            }
            Err(e) => Err(VfsError::remote(
                RemoteOp::Delete,
                object.bucket(),
                object.key(),
                e,
            )),
        }
    }

    fn access(&self, path: &Path) -> VfsResult<bool> {
        let object = self.handle_for(path)?;
        match object.attrs(&self.config.context) {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(VfsError::remote(
                RemoteOp::Stat,
                object.bucket(),
                object.key(),
                e,
            )),
        }
    }
}

fn remove_staging(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(error = %e, staging = %path.display(), "failed to remove staging file"),
    }
}

impl std::fmt::Debug for ObjectVfs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectVfs")
            .field("config", &self.config)
            .field("open_paths", &self.table.len())
            .field("client_ready", &self.store.lock().is_some())
            .finish()
    }
}
