//! Per-open-file state: a local staging file in front of one remote object.
//!
//! Writes land only in the staging file and mark the handle dirty. `sync`
//! streams the entire staging file into a whole-object upload; the object
//! store has no partial-overwrite primitive, so every durability point costs
//! a full re-upload.
//!
//! Reads on a clean handle go to the remote object. Once the handle is dirty
//! the staging file is the read-of-record until the next successful sync.

use crate::error::{RemoteOp, VfsError, VfsResult};
use crate::flags::{OpenFlags, SyncFlags};
use crate::path::{FileKind, PathInfo, PathTable};
use crate::vfs::VfsFile;
use objvfs_store::{CallContext, ObjectHandle, StoreError};
use parking_lot::Mutex;
use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Bytes moved per read of the staging file during an upload.
const UPLOAD_BUFFER_SIZE: usize = 256 * 1024;

struct Staging {
    file: Option<File>,
    dirty: bool,
}

impl Staging {
    fn file(&mut self) -> VfsResult<&mut File> {
        self.file.as_mut().ok_or(VfsError::Closed)
    }
}

/// An open file backed by a remote object.
///
/// `read_at`, `write_at` and `sync` run inside one per-handle critical
/// section, so an upload never interleaves with a local write.
///
/// Dropping an open handle releases it like [`VfsFile::close`] without
/// syncing.
pub struct ObjectFile {
    staging_path: PathBuf,
    info: PathInfo,
    kind: FileKind,
    flags: OpenFlags,
    object: ObjectHandle,
    table: Arc<PathTable>,
    ctx: CallContext,
    state: Mutex<Staging>,
}

impl ObjectFile {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        staging_path: PathBuf,
        info: PathInfo,
        kind: FileKind,
        flags: OpenFlags,
        file: File,
        object: ObjectHandle,
        table: Arc<PathTable>,
        ctx: CallContext,
    ) -> Self {
        Self {
            staging_path,
            info,
            kind,
            flags,
            object,
            table,
            ctx,
            state: Mutex::new(Staging {
                file: Some(file),
                dirty: false,
            }),
        }
    }

    /// Returns the local staging path.
    #[must_use]
    pub fn staging_path(&self) -> &Path {
        &self.staging_path
    }

    /// Returns the remote location.
    #[must_use]
    pub fn path_info(&self) -> &PathInfo {
        &self.info
    }

    /// Returns which database file this handle is.
    #[must_use]
    pub fn kind(&self) -> FileKind {
        self.kind
    }

    /// Returns the flags the handle was opened with.
    #[must_use]
    pub fn flags(&self) -> OpenFlags {
        self.flags
    }

    /// Returns true if local writes have not been uploaded yet.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.state.lock().dirty
    }

    /// Returns the length of the staging file, including unsynced writes.
    ///
    /// # Errors
    ///
    /// Returns `Closed` after close, or `LocalIo` if the length cannot be read.
    pub fn staged_len(&self) -> VfsResult<u64> {
        let mut state = self.state.lock();
        let file = state.file()?;
        file.metadata()
            .map(|m| m.len())
            .map_err(|e| VfsError::local_io(&self.staging_path, e))
    }

    fn read_staged(&self, file: &mut File, buf: &mut [u8], offset: u64) -> VfsResult<usize> {
        let local = |e| VfsError::local_io(&self.staging_path, e);
        file.seek(SeekFrom::Start(offset)).map_err(local)?;

        let mut filled = 0;
        while filled < buf.len() {
            match file.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(local(e)),
            }
        }
        Ok(filled)
    }

    fn read_remote(&self, buf: &mut [u8], offset: u64) -> VfsResult<usize> {
        match self.object.read_range(&self.ctx, offset, buf.len()) {
            Ok(data) => {
                let n = data.len().min(buf.len());
                buf[..n].copy_from_slice(&data[..n]);
                Ok(n)
            }
            // Unwritten objects and reads past the end are empty reads.
            Err(e) if e.is_not_found() || e.is_range_not_satisfiable() => {
                debug!(object = %self.info, offset, "remote read past end");
                Ok(0)
            }
            Err(e) => Err(self.remote(RemoteOp::Read, e)),
        }
    }

    fn upload(&self, file: &mut File) -> VfsResult<u64> {
        let local = |e| VfsError::local_io(&self.staging_path, e);

        let mut writer = self
            .object
            .new_writer(&self.ctx)
            .map_err(|e| self.remote(RemoteOp::Upload, e))?;
        file.seek(SeekFrom::Start(0)).map_err(local)?;

        let mut buffer = vec![0u8; UPLOAD_BUFFER_SIZE];
        let mut total = 0u64;
        loop {
            let n = match file.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(local(e)),
            };
            writer
                .write_all(&buffer[..n])
                .map_err(|e| self.remote(RemoteOp::Upload, StoreError::from_io(e)))?;
            total += n as u64;
        }

        writer
            .finish()
            .map_err(|e| self.remote(RemoteOp::Upload, e))?;
        Ok(total)
    }

    fn remote(&self, op: RemoteOp, source: StoreError) -> VfsError {
        VfsError::remote(op, self.info.bucket(), self.info.key(), source)
    }

    fn release(&self, file: File, dirty: bool) -> VfsResult<()> {
        if dirty {
            warn!(object = %self.info, "closing with unsynced writes");
        }
        drop(file);
        let remaining = self.table.release_with(&self.staging_path, |remaining| {
            if remaining > 0 {
                return Ok(remaining);
            }
            match fs::remove_file(&self.staging_path) {
                Ok(()) => Ok(0),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(0),
                Err(e) => Err(VfsError::local_io(&self.staging_path, e)),
            }
        })?;
        if remaining > 0 {
            debug!(object = %self.info, remaining, "file closed, staging still in use");
            return Ok(());
        }
        debug!(object = %self.info, staging = %self.staging_path.display(), "file closed");
        Ok(())
    }
}

impl VfsFile for ObjectFile {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> VfsResult<usize> {
        let mut state = self.state.lock();
        let dirty = state.dirty;
        let file = state.file()?;

        let n = if buf.is_empty() {
            0
        } else if dirty {
            self.read_staged(file, buf, offset)?
        } else {
            self.read_remote(buf, offset)?
        };
        buf[n..].fill(0);
        Ok(n)
    }

    fn write_at(&self, buf: &[u8], offset: u64) -> VfsResult<usize> {
        if self.flags.is_read_only() {
            return Err(VfsError::ReadOnly {
                path: self.staging_path.clone(),
            });
        }
        let mut state = self.state.lock();
        let file = state.file()?;
        let local = |e| VfsError::local_io(&self.staging_path, e);

        file.seek(SeekFrom::Start(offset)).map_err(local)?;
        file.write_all(buf).map_err(local)?;
        state.dirty = true;
        Ok(buf.len())
    }

    fn sync(&self, flags: SyncFlags) -> VfsResult<()> {
        let mut state = self.state.lock();
        let dirty = state.dirty;
        let file = state.file()?;
        if !dirty {
            return Ok(());
        }

        let size = self.upload(file)?;
        state.dirty = false;
        info!(object = %self.info, size, flags = flags.bits(), "staging file uploaded");
        Ok(())
    }

    fn truncate(&self, size: u64) -> VfsResult<()> {
        if self.flags.is_read_only() {
            return Err(VfsError::ReadOnly {
                path: self.staging_path.clone(),
            });
        }
        let mut state = self.state.lock();
        state
            .file()?
            .set_len(size)
            .map_err(|e| VfsError::local_io(&self.staging_path, e))?;
        state.dirty = true;
        Ok(())
    }

    fn file_size(&self) -> VfsResult<u64> {
        self.state.lock().file()?;
        match self.object.attrs(&self.ctx) {
            Ok(attrs) => Ok(attrs.size),
            Err(e) if e.is_not_found() => Ok(0),
            Err(e) => Err(self.remote(RemoteOp::Stat, e)),
        }
    }

    fn close(&mut self) -> VfsResult<()> {
        let state = self.state.get_mut();
        let dirty = state.dirty;
        match state.file.take() {
            Some(file) => self.release(file, dirty),
            None => Ok(()),
        }
    }
}

impl Drop for ObjectFile {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        let dirty = state.dirty;
        if let Some(file) = state.file.take() {
            if let Err(e) = self.release(file, dirty) {
                warn!(error = %e, "failed to release staging file");
            }
        }
    }
}

impl std::fmt::Debug for ObjectFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectFile")
            .field("staging_path", &self.staging_path)
            .field("object", &self.info.to_string())
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Copies an existing remote object into an empty staging file.
///
/// Reads in chunks of `chunk_size` so large objects never sit in memory
/// whole. Returns the number of bytes loaded; a missing object loads zero.
pub(crate) fn hydrate(
    staging_path: &Path,
    file: &mut File,
    object: &ObjectHandle,
    ctx: &CallContext,
    chunk_size: usize,
) -> VfsResult<u64> {
    let remote = |e| VfsError::remote(RemoteOp::Read, object.bucket(), object.key(), e);
    let local = |e| VfsError::local_io(staging_path, e);

    let size = match object.attrs(ctx) {
        Ok(attrs) => attrs.size,
        Err(e) if e.is_not_found() => return Ok(0),
        Err(e) => return Err(remote(e)),
    };

    let mut offset = 0u64;
    while offset < size {
        let want = (size - offset).min(chunk_size as u64) as usize;
        let data = match object.read_range(ctx, offset, want) {
            Ok(data) => data,
            // The object shrank or vanished underneath us; keep what we have.
            Err(e) if e.is_not_found() || e.is_range_not_satisfiable() => break,
            Err(e) => return Err(remote(e)),
        };
        if data.is_empty() {
            break;
        }
        file.seek(SeekFrom::Start(offset)).map_err(local)?;
        file.write_all(&data).map_err(local)?;
        offset += data.len() as u64;
    }

    debug!(bucket = object.bucket(), key = object.key(), bytes = offset, "staging file hydrated");
    Ok(offset)
}
