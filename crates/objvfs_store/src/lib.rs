//! # objvfs store
//!
//! Object-store client contract and backends for objvfs.
//!
//! This crate is the lowest layer of objvfs. An object store holds whole
//! objects addressed by `(bucket, key)` and offers exactly four primitives:
//! metadata lookup, whole-object replacement, range reads and deletion.
//! There is no partial overwrite; callers that need random-access writes
//! must buffer locally and re-upload.
//!
//! ## Design Principles
//!
//! - Backends are opaque blob stores and never interpret object contents
//! - "Not found" and "range not satisfiable" are distinguishable errors
//! - Uploads are all-or-nothing: an [`ObjectWriter`] only replaces the object
//!   when [`ObjectWriter::finish`] succeeds
//! - Every call honours a [`CallContext`] (cancellation and deadline)
//! - Must be `Send + Sync` for concurrent access
//!
//! ## Available Backends
//!
//! - [`InMemoryObjectStore`] - For testing and ephemeral storage
//! - [`LocalDirObjectStore`] - Objects as files under a root directory
//! - `S3ObjectStore` - S3-compatible storage (feature `s3`)
//!
//! ## Example
//!
//! ```rust
//! use objvfs_store::{CallContext, InMemoryObjectStore, ObjectStore};
//! use std::io::Write;
//!
//! let store = InMemoryObjectStore::new();
//! let ctx = CallContext::background();
//!
//! let mut writer = store.new_writer(&ctx, "mydb", "app.db").unwrap();
//! writer.write_all(b"hello world").unwrap();
//! writer.finish().unwrap();
//!
//! let data = store.read_range(&ctx, "mydb", "app.db", 6, 5).unwrap();
//! assert_eq!(&data, b"world");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod context;
mod error;
mod local;
mod memory;
#[cfg(feature = "s3")]
mod s3;
mod store;

pub use context::{CallContext, CancelHandle};
pub use error::{StoreError, StoreResult};
pub use local::LocalDirObjectStore;
pub use memory::InMemoryObjectStore;
#[cfg(feature = "s3")]
pub use s3::{S3Config, S3ObjectStore};
pub use store::{ObjectAttrs, ObjectHandle, ObjectStore, ObjectWriter};
