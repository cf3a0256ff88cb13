//! # objvfs testkit
//!
//! Test utilities for objvfs.
//!
//! This crate provides:
//! - Fixtures pairing a VFS with a scratch directory and an in-memory store
//! - A fault-injecting store wrapper for failure-path tests
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust
//! use objvfs_testkit::prelude::*;
//!
//! with_test_vfs(|t| {
//!     let staging = t.vfs.full_pathname("mydb/app.db").unwrap();
//!     let file = t.vfs.open(&staging, rw_flags()).unwrap();
//!     assert_eq!(file.file_size().unwrap(), 0);
//! });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fault;
pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fault::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use objvfs_core::{
        CallContext, ObjectVfs, OpenFlags, SyncFlags, Vfs, VfsConfig, VfsError, VfsFile,
    };
    pub use objvfs_store::{InMemoryObjectStore, ObjectStore};
}

pub use fault::*;
pub use fixtures::*;
pub use generators::*;
