//! # objvfs core
//!
//! A virtual file system that lets an embedded database engine keep its
//! files in an object store.
//!
//! The engine addresses a database as `<bucket>/<key...>`. The VFS maps that
//! logical path to a local staging file, serves reads from the remote object,
//! buffers writes in the staging file and uploads the whole file on `sync`.
//!
//! This crate provides:
//! - Path parsing and the staging-path table ([`PathInfo`], [`PathTable`])
//! - The engine-facing contract ([`Vfs`], [`VfsFile`])
//! - The object-store implementation ([`ObjectVfs`], [`ObjectFile`])
//! - A named registry and connection-string selection ([`VfsRegistry`],
//!   [`ConnectionString`])
//!
//! ## Example
//!
//! ```rust
//! use objvfs_core::{ObjectVfs, OpenFlags, SyncFlags, Vfs, VfsConfig};
//! use objvfs_store::InMemoryObjectStore;
//! use std::sync::Arc;
//!
//! let scratch = tempfile::tempdir().unwrap();
//! let store = InMemoryObjectStore::new();
//! let vfs = ObjectVfs::with_store(
//!     VfsConfig::new().scratch_dir(scratch.path()),
//!     Arc::new(store.clone()),
//! );
//!
//! let staging = vfs.full_pathname("mydb/app.db").unwrap();
//! let mut file = vfs.open(&staging, OpenFlags::READ_WRITE | OpenFlags::CREATE).unwrap();
//! file.write_at(&[0u8; 4096], 0).unwrap();
//! assert_eq!(file.file_size().unwrap(), 0);
//!
//! file.sync(SyncFlags::NORMAL).unwrap();
//! assert_eq!(file.file_size().unwrap(), 4096);
//! file.close().unwrap();
//!
//! assert_eq!(store.object("mydb", "app.db").unwrap().len(), 4096);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod file;
mod flags;
mod path;
mod registry;
mod vfs;

pub use config::{VfsConfig, DEFAULT_HYDRATE_CHUNK_SIZE, DEFAULT_VFS_NAME};
pub use error::{VfsError, VfsResult};
pub use file::ObjectFile;
pub use flags::{OpenFlags, SyncFlags};
pub use path::{FileKind, PathInfo, PathTable, JOURNAL_SUFFIX, WAL_SUFFIX};
pub use registry::{ConnectionString, VfsRegistry};
pub use vfs::{ObjectVfs, StoreFactory, Vfs, VfsFile};

/// objvfs core version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use objvfs_store::{
    CallContext, CancelHandle, InMemoryObjectStore, LocalDirObjectStore, ObjectStore, StoreError,
};
