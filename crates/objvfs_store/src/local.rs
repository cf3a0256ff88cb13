//! Local-directory object store.
//!
//! Objects live at `<root>/<bucket>/<key>`. Uploads are staged in a sibling
//! temporary file and renamed into place on finish, so readers never observe
//! a half-written object.

use crate::context::CallContext;
use crate::error::{StoreError, StoreResult};
use crate::store::{clamp_range, ObjectAttrs, ObjectStore, ObjectWriter};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::UNIX_EPOCH;
use tracing::debug;

static UPLOAD_SEQ: AtomicU64 = AtomicU64::new(0);

/// An object store backed by a local directory tree.
///
/// Useful as a stand-in for a remote bucket in development, in tests that
/// need objects to survive the process, and for the CLI.
///
/// # Example
///
/// ```no_run
/// use objvfs_store::{CallContext, LocalDirObjectStore, ObjectStore};
///
/// let store = LocalDirObjectStore::open("/var/lib/objvfs").unwrap();
/// store.put(&CallContext::background(), "mydb", "app.db", b"data").unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct LocalDirObjectStore {
    root: PathBuf,
}

impl LocalDirObjectStore {
    /// Opens a store rooted at `root`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn open(root: impl AsRef<Path>) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Returns the root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, bucket: &str, key: &str) -> StoreResult<PathBuf> {
        for (name, what) in [(bucket, "bucket"), (key, "key")] {
            if name.is_empty() {
                return Err(StoreError::invalid_key(bucket, key, format!("empty {what}")));
            }
            let normal = Path::new(name)
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
            if !normal {
                return Err(StoreError::invalid_key(
                    bucket,
                    key,
                    format!("{what} must be a relative path without '.' or '..'"),
                ));
            }
        }
        if bucket.contains('/') {
            return Err(StoreError::invalid_key(bucket, key, "bucket contains '/'"));
        }
        Ok(self.root.join(bucket).join(key))
    }

    fn open_object(&self, bucket: &str, key: &str) -> StoreResult<(File, fs::Metadata)> {
        let path = self.object_path(bucket, key)?;
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::not_found(bucket, key))
            }
            Err(e) => return Err(e.into()),
        };
        let meta = file.metadata()?;
        if meta.is_dir() {
            return Err(StoreError::not_found(bucket, key));
        }
        Ok((file, meta))
    }
}

fn generation_of(meta: &fs::Metadata) -> u64 {
    meta.modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map_or(0, |d| d.as_nanos() as u64)
}

impl ObjectStore for LocalDirObjectStore {
    fn attrs(&self, ctx: &CallContext, bucket: &str, key: &str) -> StoreResult<ObjectAttrs> {
        ctx.check()?;
        let (_, meta) = self.open_object(bucket, key)?;
        Ok(ObjectAttrs {
            size: meta.len(),
            generation: generation_of(&meta),
        })
    }

    fn new_writer(
        &self,
        ctx: &CallContext,
        bucket: &str,
        key: &str,
    ) -> StoreResult<Box<dyn ObjectWriter>> {
        ctx.check()?;
        let target = self.object_path(bucket, key)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }

        let seq = UPLOAD_SEQ.fetch_add(1, Ordering::Relaxed);
        let mut temp_name = target.as_os_str().to_owned();
        temp_name.push(format!(".{}.{seq}.upload", std::process::id()));
        let temp = PathBuf::from(temp_name);

        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&temp)?;

        Ok(Box::new(LocalWriter {
            ctx: ctx.clone(),
            file: Some(file),
            temp,
            target,
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
        let (mut file, meta) = self.open_object(bucket, key)?;
        let (start, end) = clamp_range(meta.len(), offset, len)?;

        let mut buffer = vec![0u8; end - start];
        if !buffer.is_empty() {
            file.seek(SeekFrom::Start(start as u64))?;
            file.read_exact(&mut buffer)?;
        }
        Ok(buffer)
    }

    fn delete(&self, ctx: &CallContext, bucket: &str, key: &str) -> StoreResult<()> {
        ctx.check()?;
        let path = self.object_path(bucket, key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(StoreError::not_found(bucket, key))
            }
            Err(e) => Err(e.into()),
        }
    }
}

struct LocalWriter {
    ctx: CallContext,
    file: Option<File>,
    temp: PathBuf,
    target: PathBuf,
}

impl Write for LocalWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.ctx.check()?;
        match self.file.as_mut() {
            Some(file) => file.write(buf),
            None => Err(io::Error::new(io::ErrorKind::Other, "upload already finished")),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

impl ObjectWriter for LocalWriter {
    fn finish(mut self: Box<Self>) -> StoreResult<()> {
        self.ctx.check()?;
        if let Some(file) = self.file.take() {
            file.sync_all()?;
        }
        fs::rename(&self.temp, &self.target)?;
        debug!(path = %self.target.display(), "object committed");
        Ok(())
    }
}

impl Drop for LocalWriter {
    fn drop(&mut self) {
        self.file.take();
        // After a successful rename the temp path is gone and this is a no-op.
        let _ = fs::remove_file(&self.temp);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn ctx() -> CallContext {
        CallContext::background()
    }

    #[test]
    fn local_put_and_read() {
        let dir = tempdir().unwrap();
        let store = LocalDirObjectStore::open(dir.path()).unwrap();

        store.put(&ctx(), "mydb", "nested/app.db", b"hello world").unwrap();

        assert!(dir.path().join("mydb").join("nested").join("app.db").exists());
        assert_eq!(store.attrs(&ctx(), "mydb", "nested/app.db").unwrap().size, 11);
        assert_eq!(
            store.read_range(&ctx(), "mydb", "nested/app.db", 6, 5).unwrap(),
            b"world"
        );
    }

    #[test]
    fn local_missing_object() {
        let dir = tempdir().unwrap();
        let store = LocalDirObjectStore::open(dir.path()).unwrap();

        assert!(store.attrs(&ctx(), "b", "k").unwrap_err().is_not_found());
        assert!(store.read_range(&ctx(), "b", "k", 0, 4).unwrap_err().is_not_found());
        assert!(store.delete(&ctx(), "b", "k").unwrap_err().is_not_found());
    }

    #[test]
    fn local_read_past_end() {
        let dir = tempdir().unwrap();
        let store = LocalDirObjectStore::open(dir.path()).unwrap();
        store.put(&ctx(), "b", "k", b"abc").unwrap();

        let err = store.read_range(&ctx(), "b", "k", 3, 1).unwrap_err();
        assert!(err.is_range_not_satisfiable());
        assert_eq!(store.read_range(&ctx(), "b", "k", 1, 10).unwrap(), b"bc");
    }

    #[test]
    fn local_abandoned_upload_leaves_no_trace() {
        let dir = tempdir().unwrap();
        let store = LocalDirObjectStore::open(dir.path()).unwrap();
        store.put(&ctx(), "b", "k", b"v1").unwrap();

        let mut writer = store.new_writer(&ctx(), "b", "k").unwrap();
        writer.write_all(b"v2").unwrap();
        drop(writer);

        assert_eq!(store.read_range(&ctx(), "b", "k", 0, 10).unwrap(), b"v1");
        let entries = fs::read_dir(dir.path().join("b")).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn local_rejects_escaping_keys() {
        let dir = tempdir().unwrap();
        let store = LocalDirObjectStore::open(dir.path()).unwrap();

        for (bucket, key) in [("b", "../escape"), ("..", "k"), ("b", "/abs"), ("", "k"), ("a/b", "k")] {
            let err = store.put(&ctx(), bucket, key, b"x").unwrap_err();
            assert!(matches!(err, StoreError::InvalidKey { .. }), "{bucket}/{key}");
        }
    }

    #[test]
    fn local_delete_removes_file() {
        let dir = tempdir().unwrap();
        let store = LocalDirObjectStore::open(dir.path()).unwrap();
        store.put(&ctx(), "b", "k", b"x").unwrap();

        store.delete(&ctx(), "b", "k").unwrap();
        assert!(!dir.path().join("b").join("k").exists());
    }

    #[test]
    fn local_respects_cancellation() {
        let dir = tempdir().unwrap();
        let store = LocalDirObjectStore::open(dir.path()).unwrap();
        let call = CallContext::background();
        call.cancel_handle().cancel();

        assert!(matches!(
            store.attrs(&call, "b", "k"),
            Err(StoreError::Cancelled)
        ));
    }
}
