//! Error types for object-store operations.

use std::io;
use thiserror::Error;

/// Result type for object-store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during object-store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The object does not exist.
    #[error("object not found: {bucket}/{key}")]
    NotFound {
        /// Bucket that was searched.
        bucket: String,
        /// Key that was not found.
        key: String,
    },

    /// The requested byte range starts at or past the end of the object.
    #[error("range not satisfiable: offset {offset}")]
    RangeNotSatisfiable {
        /// The requested read offset.
        offset: u64,
    },

    /// The caller cancelled the operation.
    #[error("operation cancelled")]
    Cancelled,

    /// The caller's deadline passed before the operation completed.
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// A local I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The bucket or key cannot be stored by this backend.
    #[error("invalid object name {bucket}/{key}: {reason}")]
    InvalidKey {
        /// Offending bucket.
        bucket: String,
        /// Offending key.
        key: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The remote service reported a failure.
    #[error("backend error: {0}")]
    Backend(String),

    /// The client could not be constructed.
    #[error("client initialization failed: {0}")]
    ClientInit(String),
}

impl StoreError {
    /// Creates a not-found error.
    pub fn not_found(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self::NotFound {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Creates an invalid key error.
    pub fn invalid_key(
        bucket: impl Into<String>,
        key: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidKey {
            bucket: bucket.into(),
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Creates a backend error.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }

    /// Recovers a store error that travelled through an [`io::Error`].
    ///
    /// [`crate::ObjectWriter`] implementations surface store failures from
    /// `write` as `io::Error`s; this undoes that wrapping so callers can still
    /// tell cancellation apart from transport failures.
    pub fn from_io(err: io::Error) -> Self {
        if !err.get_ref().is_some_and(|inner| inner.is::<StoreError>()) {
            return Self::Io(err);
        }
        match err.into_inner().map(|inner| inner.downcast::<StoreError>()) {
            Some(Ok(store)) => *store,
            _ => Self::backend("upload stream failed"),
        }
    }

    /// Returns true if the object does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns true if the requested range lies past the end of the object.
    #[must_use]
    pub fn is_range_not_satisfiable(&self) -> bool {
        matches!(self, Self::RangeNotSatisfiable { .. })
    }

    /// Returns true if the call was interrupted by cancellation or deadline.
    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Cancelled | Self::DeadlineExceeded)
    }
}

impl From<StoreError> for io::Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Io(e) => e,
            StoreError::NotFound { .. } => io::Error::new(io::ErrorKind::NotFound, err),
            StoreError::Cancelled => io::Error::new(io::ErrorKind::Interrupted, err),
            StoreError::DeadlineExceeded => io::Error::new(io::ErrorKind::TimedOut, err),
            other => io::Error::new(io::ErrorKind::Other, other),
        }
    }
}
