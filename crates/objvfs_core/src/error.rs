//! Error types for the objvfs adapter.

use objvfs_store::StoreError;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for VFS operations.
pub type VfsResult<T> = Result<T, VfsError>;

/// Errors that can occur in VFS and file-handle operations.
#[derive(Debug, Error)]
pub enum VfsError {
    /// The logical path is not of the form `<bucket>/<key...>`.
    #[error("invalid path {path:?}: {reason}")]
    InvalidPath {
        /// The rejected logical path.
        path: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A staging path was used before its base path was registered.
    #[error("unknown staging path {}: resolve it with full_pathname first", .path.display())]
    UnknownPath {
        /// The unregistered staging path.
        path: PathBuf,
    },

    /// A staging path is in use by a handle on a different object.
    ///
    /// Two logical paths whose keys are equal but whose buckets differ
    /// map to the same staging file.
    #[error(
        "staging path {} is in use by {registered}, cannot bind it to {requested}",
        .path.display()
    )]
    StagingConflict {
        /// The shared staging path.
        path: PathBuf,
        /// The object the open handles belong to.
        registered: String,
        /// The object the new registration asked for.
        requested: String,
    },

    /// The object-store client could not be constructed.
    #[error("storage client initialization failed: {0}")]
    StorageClientInit(#[source] StoreError),

    /// A local staging-file operation failed.
    #[error("local I/O error on {}: {source}", .path.display())]
    LocalIo {
        /// The staging file or directory involved.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: io::Error,
    },

    /// A remote range read failed.
    #[error("read of {bucket}/{key} failed: {source}")]
    Read {
        /// Bucket of the object.
        bucket: String,
        /// Key of the object.
        key: String,
        /// The underlying store error.
        #[source]
        source: StoreError,
    },

    /// Uploading the staging file during sync failed.
    #[error("upload of {bucket}/{key} failed: {source}")]
    Upload {
        /// Bucket of the object.
        bucket: String,
        /// Key of the object.
        key: String,
        /// The underlying store error.
        #[source]
        source: StoreError,
    },

    /// Fetching remote object metadata failed.
    #[error("metadata of {bucket}/{key} unavailable: {source}")]
    Stat {
        /// Bucket of the object.
        bucket: String,
        /// Key of the object.
        key: String,
        /// The underlying store error.
        #[source]
        source: StoreError,
    },

    /// Deleting the remote object failed.
    #[error("delete of {bucket}/{key} failed: {source}")]
    ObjectDelete {
        /// Bucket of the object.
        bucket: String,
        /// Key of the object.
        key: String,
        /// The underlying store error.
        #[source]
        source: StoreError,
    },

    /// A remote call was cancelled or ran past its deadline.
    #[error("remote call interrupted: {0}")]
    Interrupted(#[source] StoreError),

    /// A write was attempted on a handle opened read-only.
    #[error("file opened read-only: {}", .path.display())]
    ReadOnly {
        /// The staging path of the handle.
        path: PathBuf,
    },

    /// The handle was already closed.
    #[error("file handle is closed")]
    Closed,

    /// No VFS is registered under the requested name.
    #[error("no VFS registered as {name:?}")]
    UnknownVfs {
        /// The requested name.
        name: String,
    },

    /// A database connection string could not be parsed.
    #[error("invalid connection string {input:?}: {reason}")]
    InvalidConnectionString {
        /// The rejected input.
        input: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// Which remote operation a store error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RemoteOp {
    Read,
    Upload,
    Stat,
    Delete,
}

impl VfsError {
    /// Creates an invalid path error.
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates an unknown path error.
    pub fn unknown_path(path: &Path) -> Self {
        Self::UnknownPath {
            path: path.to_path_buf(),
        }
    }

    /// Creates a local I/O error.
    pub fn local_io(path: &Path, source: io::Error) -> Self {
        Self::LocalIo {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Creates an invalid connection string error.
    pub fn invalid_connection_string(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConnectionString {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// Wraps a store error from `op` on `bucket/key`.
    ///
    /// Cancellation and deadline expiry map to [`VfsError::Interrupted`]
    /// regardless of the operation.
    pub(crate) fn remote(op: RemoteOp, bucket: &str, key: &str, source: StoreError) -> Self {
        if source.is_interrupted() {
            return Self::Interrupted(source);
        }
        let (bucket, key) = (bucket.to_string(), key.to_string());
        match op {
            RemoteOp::Read => Self::Read {
                bucket,
                key,
                source,
            },
            RemoteOp::Upload => Self::Upload {
                bucket,
                key,
                source,
            },
            RemoteOp::Stat => Self::Stat {
                bucket,
                key,
                source,
            },
            RemoteOp::Delete => Self::ObjectDelete {
                bucket,
                key,
                source,
            },
        }
    }

    /// Returns true if a remote call was cancelled or timed out.
    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Interrupted(_))
    }
}

impl From<VfsError> for io::Error {
    fn from(err: VfsError) -> Self {
        match err {
            VfsError::LocalIo { source, .. } => source,
            VfsError::InvalidPath { .. } | VfsError::InvalidConnectionString { .. } => {
                io::Error::new(io::ErrorKind::InvalidInput, err)
            }
            VfsError::UnknownPath { .. } | VfsError::UnknownVfs { .. } => {
                io::Error::new(io::ErrorKind::NotFound, err)
            }
            VfsError::ReadOnly { .. } => io::Error::new(io::ErrorKind::PermissionDenied, err),
            VfsError::StagingConflict { .. } => io::Error::new(io::ErrorKind::AlreadyExists, err),
            VfsError::Interrupted(_) => io::Error::new(io::ErrorKind::Interrupted, err),
            other => io::Error::new(io::ErrorKind::Other, other),
        }
    }
}
