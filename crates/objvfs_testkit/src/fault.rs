//! Fault injection for store-failure tests.
//!
//! [`FaultyStore`] wraps any store and fails selected operations on demand.
//! Switches are atomics so a test can flip them while another thread is
//! inside the VFS.
//!
//! ## Usage
//!
//! ```rust
//! use objvfs_testkit::prelude::*;
//!
//! let t = FaultyVfs::new();
//! let staging = t.vfs.full_pathname("mydb/app.db").unwrap();
//! let file = t.vfs.open(&staging, rw_flags()).unwrap();
//! file.write_at(b"page", 0).unwrap();
//!
//! t.faults.set_fail_uploads(true);
//! assert!(file.sync(SyncFlags::NORMAL).is_err());
//!
//! t.faults.reset();
//! file.sync(SyncFlags::NORMAL).unwrap();
//! ```

use objvfs_store::{
    CallContext, ObjectAttrs, ObjectStore, ObjectWriter, StoreError, StoreResult,
};
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Default)]
struct Switches {
    fail_reads: AtomicBool,
    fail_uploads: AtomicBool,
    fail_attrs: AtomicBool,
    fail_deletes: AtomicBool,
    reads: AtomicUsize,
    uploads: AtomicUsize,
}

/// A store wrapper that can simulate backend failures.
pub struct FaultyStore {
    inner: Arc<dyn ObjectStore>,
    switches: Arc<Switches>,
}

impl FaultyStore {
    /// Creates a wrapper that passes everything through.
    pub fn new(inner: Arc<dyn ObjectStore>) -> Self {
        Self {
            inner,
            switches: Arc::new(Switches::default()),
        }
    }

    /// Sets whether range reads fail.
    pub fn set_fail_reads(&self, fail: bool) {
        self.switches.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Sets whether uploads fail when committed.
    ///
    /// The switch is read at commit time, so flipping it while an upload is
    /// streaming still fails that upload.
    pub fn set_fail_uploads(&self, fail: bool) {
        self.switches.fail_uploads.store(fail, Ordering::SeqCst);
    }

    /// Sets whether metadata lookups fail.
    pub fn set_fail_attrs(&self, fail: bool) {
        self.switches.fail_attrs.store(fail, Ordering::SeqCst);
    }

    /// Sets whether deletes fail.
    pub fn set_fail_deletes(&self, fail: bool) {
        self.switches.fail_deletes.store(fail, Ordering::SeqCst);
    }

    /// Clears every failure switch. Counters are kept.
    pub fn reset(&self) {
        for flag in [
            &self.switches.fail_reads,
            &self.switches.fail_uploads,
            &self.switches.fail_attrs,
            &self.switches.fail_deletes,
        ] {
            flag.store(false, Ordering::SeqCst);
        }
    }

    /// Returns the number of range reads that reached the inner store.
    pub fn read_count(&self) -> usize {
        self.switches.reads.load(Ordering::SeqCst)
    }

    /// Returns the number of uploads that were committed.
    pub fn upload_count(&self) -> usize {
        self.switches.uploads.load(Ordering::SeqCst)
    }
}

fn injected(what: &str) -> StoreError {
    StoreError::backend(format!("injected {what} failure"))
}

impl ObjectStore for FaultyStore {
    fn attrs(&self, ctx: &CallContext, bucket: &str, key: &str) -> StoreResult<ObjectAttrs> {
        if self.switches.fail_attrs.load(Ordering::SeqCst) {
            return Err(injected("attrs"));
        }
        self.inner.attrs(ctx, bucket, key)
    }

    fn new_writer(
        &self,
        ctx: &CallContext,
        bucket: &str,
        key: &str,
    ) -> StoreResult<Box<dyn ObjectWriter>> {
        let inner = self.inner.new_writer(ctx, bucket, key)?;
        Ok(Box::new(FaultyWriter {
            inner,
            switches: Arc::clone(&self.switches),
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
        if self.switches.fail_reads.load(Ordering::SeqCst) {
            return Err(injected("read"));
        }
        self.switches.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.read_range(ctx, bucket, key, offset, len)
    }

    fn delete(&self, ctx: &CallContext, bucket: &str, key: &str) -> StoreResult<()> {
        if self.switches.fail_deletes.load(Ordering::SeqCst) {
            return Err(injected("delete"));
        }
        self.inner.delete(ctx, bucket, key)
    }
}

struct FaultyWriter {
    inner: Box<dyn ObjectWriter>,
    switches: Arc<Switches>,
}

impl Write for FaultyWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl ObjectWriter for FaultyWriter {
    fn finish(self: Box<Self>) -> StoreResult<()> {
        let this = *self;
        if this.switches.fail_uploads.load(Ordering::SeqCst) {
            // Dropping the inner writer abandons the upload.
            return Err(injected("upload"));
        }
        this.inner.finish()?;
        this.switches.uploads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
