//! In-memory object store for testing.

use crate::context::CallContext;
use crate::error::{StoreError, StoreResult};
use crate::store::{clamp_range, ObjectAttrs, ObjectStore, ObjectWriter};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone)]
struct StoredObject {
    data: Arc<Vec<u8>>,
    generation: u64,
}

#[derive(Debug, Default)]
struct Shared {
    objects: RwLock<HashMap<(String, String), StoredObject>>,
    generation: AtomicU64,
}

/// An in-memory object store.
///
/// This store keeps all objects in memory and is suitable for:
/// - Unit tests
/// - Integration tests
/// - Ephemeral databases that don't need persistence
///
/// Clones share the same objects, so a test can keep one clone for
/// inspection while handing another to the code under test.
///
/// # Example
///
/// ```rust
/// use objvfs_store::{CallContext, InMemoryObjectStore, ObjectStore};
///
/// let store = InMemoryObjectStore::new();
/// let ctx = CallContext::background();
/// store.put(&ctx, "bucket", "key", b"test data").unwrap();
/// assert_eq!(store.attrs(&ctx, "bucket", "key").unwrap().size, 9);
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryObjectStore {
    shared: Arc<Shared>,
}

impl InMemoryObjectStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of an object's bytes, if present.
    ///
    /// Useful for testing and debugging.
    #[must_use]
    pub fn object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.shared
            .objects
            .read()
            .get(&(bucket.to_string(), key.to_string()))
            .map(|o| o.data.as_ref().clone())
    }

    /// Returns the number of stored objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.objects.read().len()
    }

    /// Returns true if no objects are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes all objects.
    pub fn clear(&self) {
        self.shared.objects.write().clear();
    }

    fn get(&self, bucket: &str, key: &str) -> StoreResult<StoredObject> {
        self.shared
            .objects
            .read()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| StoreError::not_found(bucket, key))
    }
}

impl ObjectStore for InMemoryObjectStore {
    fn attrs(&self, ctx: &CallContext, bucket: &str, key: &str) -> StoreResult<ObjectAttrs> {
        ctx.check()?;
        let object = self.get(bucket, key)?;
        Ok(ObjectAttrs {
            size: object.data.len() as u64,
            generation: object.generation,
        })
    }

    fn new_writer(
        &self,
        ctx: &CallContext,
        bucket: &str,
        key: &str,
    ) -> StoreResult<Box<dyn ObjectWriter>> {
        ctx.check()?;
        Ok(Box::new(MemoryWriter {
            shared: Arc::clone(&self.shared),
            ctx: ctx.clone(),
            bucket: bucket.to_string(),
            key: key.to_string(),
            buffer: Vec::new(),
        }))
    }

    fn read_range(
        &self,
        ctx: &CallContext,
        bucket: &str,
        key: &str,
        offset: u64,
        len: usize,
    ) -> StoreResult<Vec<u8>> {
        ctx.check()?;
        let object = self.get(bucket, key)?;
        let (start, end) = clamp_range(object.data.len() as u64, offset, len)?;
        Ok(object.data[start..end].to_vec())
    }

    fn delete(&self, ctx: &CallContext, bucket: &str, key: &str) -> StoreResult<()> {
        ctx.check()?;
        self.shared
            .objects
            .write()
            .remove(&(bucket.to_string(), key.to_string()))
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found(bucket, key))
    }
}

struct MemoryWriter {
    shared: Arc<Shared>,
    ctx: CallContext,
    bucket: String,
    key: String,
    buffer: Vec<u8>,
}

impl io::Write for MemoryWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.ctx.check()?;
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl ObjectWriter for MemoryWriter {
    fn finish(self: Box<Self>) -> StoreResult<()> {
        let this = *self;
        this.ctx.check()?;
        let generation = this.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
        this.shared.objects.write().insert(
            (this.bucket, this.key),
            StoredObject {
                data: Arc::new(this.buffer),
                generation,
            },
        );
        Ok(())
    }
}
