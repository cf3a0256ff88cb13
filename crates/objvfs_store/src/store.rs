//! Object-store trait definition.

use crate::context::CallContext;
use crate::error::{StoreError, StoreResult};
use std::fmt;
use std::io::Write;
use std::sync::Arc;

/// Metadata of a stored object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectAttrs {
    /// Object length in bytes.
    pub size: u64,
    /// Monotonic version counter, bumped on every replacement.
    pub generation: u64,
}

/// A sink that replaces a whole object.
///
/// Bytes written are staged by the backend. The stored object is only
/// replaced when [`ObjectWriter::finish`] returns `Ok`; dropping the writer
/// without finishing leaves the previous object (or its absence) untouched.
pub trait ObjectWriter: Write + Send {
    /// Commits the staged bytes as the new object contents.
    ///
    /// # Errors
    ///
    /// Returns an error if the upload fails or the call context was
    /// cancelled. The previous object is left in place in that case.
    fn finish(self: Box<Self>) -> StoreResult<()>;
}

/// A remote object store addressed by `(bucket, key)`.
///
/// Object stores are **whole-object** stores: there is no primitive to
/// overwrite part of an existing object. Reads may address any byte range.
///
/// # Invariants
///
/// - `attrs` and `read_range` return [`crate::StoreError::NotFound`] for a
///   missing object
/// - `read_range` returns [`StoreError::RangeNotSatisfiable`] when
///   `offset` is at or past the end of a non-empty read, and otherwise returns
///   at most `len` bytes (fewer when the range runs off the end)
/// - Objects written through [`ObjectStore::new_writer`] appear atomically
/// - Every call fails fast with `Cancelled`/`DeadlineExceeded` when the
///   supplied [`CallContext`] says so
///
/// # Implementors
///
/// - [`super::InMemoryObjectStore`] - For testing
/// - [`super::LocalDirObjectStore`] - Objects as local files
pub trait ObjectStore: Send + Sync {
    /// Returns the metadata of an object.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the object does not exist.
    fn attrs(&self, ctx: &CallContext, bucket: &str, key: &str) -> StoreResult<ObjectAttrs>;

    /// Starts a whole-object upload.
    ///
    /// # Errors
    ///
    /// Returns an error if the upload cannot be started.
    fn new_writer(
        &self,
        ctx: &CallContext,
        bucket: &str,
        key: &str,
    ) -> StoreResult<Box<dyn ObjectWriter>>;

    /// Reads up to `len` bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for a missing object and `RangeNotSatisfiable` when
    /// `offset` lies at or beyond the object end.
    fn read_range(
        &self,
        ctx: &CallContext,
        bucket: &str,
        key: &str,
        offset: u64,
        len: usize,
    ) -> StoreResult<Vec<u8>>;

    /// Deletes an object.
    ///
    /// # Errors
    ///
    /// Backends that can tell return `NotFound` for a missing object; some
    /// remote services report success instead.
    fn delete(&self, ctx: &CallContext, bucket: &str, key: &str) -> StoreResult<()>;

    /// Replaces an object with `data` in one call.
    ///
    /// # Errors
    ///
    /// Returns an error if the upload fails.
    fn put(&self, ctx: &CallContext, bucket: &str, key: &str, data: &[u8]) -> StoreResult<()> {
        let mut writer = self.new_writer(ctx, bucket, key)?;
        writer.write_all(data).map_err(StoreError::from_io)?;
        writer.finish()
    }
}

/// A store bound to a single `(bucket, key)`.
#[derive(Clone)]
pub struct ObjectHandle {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    key: String,
}

impl ObjectHandle {
    /// Binds `store` to one object.
    #[must_use]
    pub fn new(
        store: Arc<dyn ObjectStore>,
        bucket: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Returns the bucket name.
    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Returns the object key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the object metadata.
    ///
    /// # Errors
    ///
    /// See [`ObjectStore::attrs`].
    pub fn attrs(&self, ctx: &CallContext) -> StoreResult<ObjectAttrs> {
        self.store.attrs(ctx, &self.bucket, &self.key)
    }

    /// Starts a whole-object upload.
    ///
    /// # Errors
    ///
    /// See [`ObjectStore::new_writer`].
    pub fn new_writer(&self, ctx: &CallContext) -> StoreResult<Box<dyn ObjectWriter>> {
        self.store.new_writer(ctx, &self.bucket, &self.key)
    }

    /// Reads a byte range.
    ///
    /// # Errors
    ///
    /// See [`ObjectStore::read_range`].
    pub fn read_range(&self, ctx: &CallContext, offset: u64, len: usize) -> StoreResult<Vec<u8>> {
        self.store
            .read_range(ctx, &self.bucket, &self.key, offset, len)
    }

    /// Deletes the object.
    ///
    /// # Errors
    ///
    /// See [`ObjectStore::delete`].
    pub fn delete(&self, ctx: &CallContext) -> StoreResult<()> {
        self.store.delete(ctx, &self.bucket, &self.key)
    }
}

impl fmt::Debug for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectHandle")
            .field("bucket", &self.bucket)
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

/// Computes the slice of an object of `size` bytes covered by a range read.
///
/// Shared by the local backends so they agree on edge cases.
pub(crate) fn clamp_range(size: u64, offset: u64, len: usize) -> StoreResult<(usize, usize)> {
    if len == 0 {
        let at = offset.min(size) as usize;
        return Ok((at, at));
    }
    if offset >= size {
        return Err(StoreError::RangeNotSatisfiable { offset });
    }
    let end = offset.saturating_add(len as u64).min(size);
    Ok((offset as usize, end as usize))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryObjectStore;

    #[test]
    fn clamp_within_object() {
        assert_eq!(clamp_range(10, 2, 4).unwrap(), (2, 6));
    }

    #[test]
    fn clamp_runs_off_end() {
        assert_eq!(clamp_range(10, 8, 4).unwrap(), (8, 10));
    }

    #[test]
    fn clamp_past_end_is_unsatisfiable() {
        assert!(matches!(
            clamp_range(10, 10, 1),
            Err(StoreError::RangeNotSatisfiable { offset: 10 })
        ));
    }

    #[test]
    fn clamp_empty_read_never_fails() {
        assert_eq!(clamp_range(4, 100, 0).unwrap(), (4, 4));
    }

    #[test]
    fn handle_routes_to_bound_object() {
        let store: Arc<dyn ObjectStore> = Arc::new(InMemoryObjectStore::new());
        let ctx = CallContext::background();
        let handle = ObjectHandle::new(Arc::clone(&store), "mydb", "app.db");

        store.put(&ctx, "mydb", "app.db", b"page data").unwrap();

        assert_eq!(handle.bucket(), "mydb");
        assert_eq!(handle.key(), "app.db");
        assert_eq!(handle.attrs(&ctx).unwrap().size, 9);
        assert_eq!(handle.read_range(&ctx, 5, 4).unwrap(), b"data");

        handle.delete(&ctx).unwrap();
        assert!(handle.attrs(&ctx).unwrap_err().is_not_found());
    }
}
