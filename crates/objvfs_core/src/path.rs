//! Logical path parsing and the staging-path table.
//!
//! The engine addresses a database as `<bucket>/<key...>`. The VFS maps that
//! logical path to a staging path under its scratch directory and records the
//! mapping here. Side files the engine derives by appending a suffix to the
//! staging path (`-journal`, `-wal`) resolve to sibling objects whose key
//! carries the same suffix.

use crate::error::{VfsError, VfsResult};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Suffix of the rollback journal side file.
pub const JOURNAL_SUFFIX: &str = "-journal";

/// Suffix of the write-ahead log side file.
pub const WAL_SUFFIX: &str = "-wal";

/// The remote location of one object: a bucket and a key inside it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathInfo {
    bucket: String,
    key: String,
}

impl PathInfo {
    /// Parses a logical path of the form `<bucket>/<key...>`.
    ///
    /// The first segment is the bucket; the remaining segments, rejoined
    /// with `/`, form the key.
    ///
    /// # Errors
    ///
    /// Returns [`VfsError::InvalidPath`] if there are fewer than two
    /// segments, the bucket is empty, or a key segment is empty, `.` or `..`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use objvfs_core::PathInfo;
    ///
    /// let info = PathInfo::parse("mydb/tenants/acme.db").unwrap();
    /// assert_eq!(info.bucket(), "mydb");
    /// assert_eq!(info.key(), "tenants/acme.db");
    /// ```
    pub fn parse(logical: &str) -> VfsResult<Self> {
        let mut segments = logical.split('/');
        let bucket = segments.next().unwrap_or_default();
        let rest: Vec<&str> = segments.collect();

        if rest.is_empty() {
            return Err(VfsError::invalid_path(
                logical,
                "require <bucket>/<object-key>",
            ));
        }
        if bucket.is_empty() {
            return Err(VfsError::invalid_path(logical, "empty bucket name"));
        }
        if let Some(bad) = rest.iter().find(|s| s.is_empty() || **s == "." || **s == "..") {
            let reason = if bad.is_empty() {
                "empty key segment".to_string()
            } else {
                format!("key segment {bad:?} not allowed")
            };
            return Err(VfsError::invalid_path(logical, reason));
        }

        Ok(Self {
            bucket: bucket.to_string(),
            key: rest.join("/"),
        })
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

    /// Returns the location of `kind`'s object next to this one.
    #[must_use]
    pub fn with_kind(&self, kind: FileKind) -> Self {
        Self {
            bucket: self.bucket.clone(),
            key: format!("{}{}", self.key, kind.suffix()),
        }
    }
}

impl fmt::Display for PathInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.bucket, self.key)
    }
}

/// Which of a database's files a staging path refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    /// The main database file.
    Main,
    /// The rollback journal.
    Journal,
    /// The write-ahead log.
    Wal,
}

impl FileKind {
    /// Returns the suffix appended to the main file's path and key.
    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Main => "",
            Self::Journal => JOURNAL_SUFFIX,
            Self::Wal => WAL_SUFFIX,
        }
    }

    /// Splits a recognised side-file suffix off `path`.
    ///
    /// Returns the base path and the side-file kind, or `path` itself and
    /// [`FileKind::Main`] when no suffix matches.
    #[must_use]
    pub fn split(path: &Path) -> (PathBuf, Self) {
        let Some(text) = path.to_str() else {
            return (path.to_path_buf(), Self::Main);
        };
        for kind in [Self::Journal, Self::Wal] {
            if let Some(base) = text.strip_suffix(kind.suffix()) {
                if !base.is_empty() {
                    return (PathBuf::from(base), kind);
                }
            }
        }
        (path.to_path_buf(), Self::Main)
    }

    const fn slot(self) -> usize {
        match self {
            Self::Main => 0,
            Self::Journal => 1,
            Self::Wal => 2,
        }
    }
}

/// One registered database: its remote location and how many handles of
/// each kind are open on it.
#[derive(Debug, Clone)]
struct Entry {
    info: PathInfo,
    handles: [usize; 3],
}

impl Entry {
    fn new(info: PathInfo) -> Self {
        Self {
            info,
            handles: [0; 3],
        }
    }

    fn in_use(&self) -> bool {
        self.handles.iter().any(|&n| n > 0)
    }
}

/// Process-wide map from staging path to remote location.
///
/// All access goes through a table-wide lock: the engine calls into the VFS
/// from arbitrary threads. Each entry counts the handles open on it per file
/// kind; the entry goes away when its last main handle is released and no
/// side-file handle remains.
#[derive(Debug, Default)]
pub struct PathTable {
    entries: RwLock<HashMap<PathBuf, Entry>>,
}

impl PathTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `staging -> info`.
    ///
    /// Registering the same location again is a no-op. An idle entry for a
    /// different location is replaced.
    ///
    /// # Errors
    ///
    /// Returns [`VfsError::StagingConflict`] if `staging` is bound to a
    /// different location that still has open handles.
    pub fn register(&self, staging: PathBuf, info: PathInfo) -> VfsResult<()> {
        let mut entries = self.entries.write();
        match entries.get_mut(&staging) {
            Some(entry) if entry.info == info => Ok(()),
            Some(entry) if entry.in_use() => Err(VfsError::StagingConflict {
                path: staging,
                registered: entry.info.to_string(),
                requested: info.to_string(),
            }),
            Some(entry) => {
                *entry = Entry::new(info);
                Ok(())
            }
            None => {
                entries.insert(staging, Entry::new(info));
                Ok(())
            }
        }
    }

    /// Resolves a staging path, following side-file suffixes.
    ///
    /// An exact entry wins, so a database whose own key ends in `-wal` is
    /// still found. Otherwise a trailing `-journal`/`-wal` is stripped, the
    /// base path is looked up, and the suffix is re-appended to its key.
    ///
    /// # Errors
    ///
    /// Returns [`VfsError::UnknownPath`] if neither the path nor its base is
    /// registered.
    pub fn resolve(&self, staging: &Path) -> VfsResult<(PathInfo, FileKind)> {
        let entries = self.entries.read();
        let (base, kind) = locate(&entries, staging)?;
        let info = &entries[&base].info;
        Ok((info.with_kind(kind), kind))
    }

    /// Resolves a staging path and counts one more open handle on it.
    ///
    /// Every successful call must be paired with [`PathTable::release`].
    ///
    /// # Errors
    ///
    /// Returns [`VfsError::UnknownPath`] as [`PathTable::resolve`] does.
    pub fn acquire(&self, staging: &Path) -> VfsResult<(PathInfo, FileKind)> {
        let mut entries = self.entries.write();
        let (base, kind) = locate(&entries, staging)?;
        let entry = entries
            .get_mut(&base)
            .ok_or_else(|| VfsError::unknown_path(staging))?;
        entry.handles[kind.slot()] += 1;
        Ok((entry.info.with_kind(kind), kind))
    }

    /// Drops one open handle on a staging path.
    ///
    /// Returns how many handles of the same kind remain open on it. When
    /// a main handle is released and nothing remains open, the entry is
    /// removed.
    pub fn release(&self, staging: &Path) -> usize {
        self.release_with(staging, |remaining| remaining)
    }

    /// Like [`PathTable::release`], but runs `f` with the remaining count
    /// before the table lock is dropped.
    ///
    /// Staging-file cleanup belongs in `f`: no open of the same path can
    /// slip in between the count reaching zero and the file going away.
    pub fn release_with<R>(&self, staging: &Path, f: impl FnOnce(usize) -> R) -> R {
        let mut entries = self.entries.write();
        let Ok((base, kind)) = locate(&entries, staging) else {
            return f(0);
        };
        let Some(entry) = entries.get_mut(&base) else {
            return f(0);
        };
        let count = &mut entry.handles[kind.slot()];
        *count = count.saturating_sub(1);
        let remaining = *count;
        if kind == FileKind::Main && !entry.in_use() {
            entries.remove(&base);
        }
        f(remaining)
    }

    /// Returns how many handles are open on `staging`'s own file.
    #[must_use]
    pub fn open_handles(&self, staging: &Path) -> usize {
        let entries = self.entries.read();
        locate(&entries, staging)
            .ok()
            .and_then(|(base, kind)| entries.get(&base).map(|e| e.handles[kind.slot()]))
            .unwrap_or(0)
    }

    /// Removes the exact entry for `staging`, regardless of open handles.
    pub fn remove(&self, staging: &Path) -> Option<PathInfo> {
        self.entries.write().remove(staging).map(|e| e.info)
    }

    /// Returns the exact entry for `staging`.
    #[must_use]
    pub fn get(&self, staging: &Path) -> Option<PathInfo> {
        self.entries.read().get(staging).map(|e| e.info.clone())
    }

    /// Returns true if `staging` has an exact entry.
    #[must_use]
    pub fn contains(&self, staging: &Path) -> bool {
        self.entries.read().contains_key(staging)
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Finds the entry key and file kind a staging path belongs to.
fn locate(entries: &HashMap<PathBuf, Entry>, staging: &Path) -> VfsResult<(PathBuf, FileKind)> {
    if entries.contains_key(staging) {
        return Ok((staging.to_path_buf(), FileKind::Main));
    }
    let (base, kind) = FileKind::split(staging);
    if kind != FileKind::Main && entries.contains_key(&base) {
        return Ok((base, kind));
    }
    Err(VfsError::unknown_path(staging))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bucket_and_key() {
        let info = PathInfo::parse("mydb/app.db").unwrap();
        assert_eq!(info.bucket(), "mydb");
        assert_eq!(info.key(), "app.db");
        assert_eq!(info.to_string(), "mydb/app.db");
    }

    #[test]
    fn parse_nested_key() {
        let info = PathInfo::parse("b/k1/k2/k3.db").unwrap();
        assert_eq!(info.bucket(), "b");
        assert_eq!(info.key(), "k1/k2/k3.db");
    }

    #[test]
    fn parse_rejects_single_segment() {
        assert!(matches!(
            PathInfo::parse("app.db"),
            Err(VfsError::InvalidPath { .. })
        ));
        assert!(matches!(PathInfo::parse(""), Err(VfsError::InvalidPath { .. })));
    }

    #[test]
    fn parse_rejects_empty_parts() {
        for bad in ["/app.db", "mydb/", "mydb//app.db", "mydb/a/../b", "mydb/./a"] {
            assert!(
                matches!(PathInfo::parse(bad), Err(VfsError::InvalidPath { .. })),
                "{bad}"
            );
        }
    }

    #[test]
    fn split_recognises_suffixes() {
        let (base, kind) = FileKind::split(Path::new("/tmp/app.db-journal"));
        assert_eq!(base, PathBuf::from("/tmp/app.db"));
        assert_eq!(kind, FileKind::Journal);

        let (base, kind) = FileKind::split(Path::new("/tmp/app.db-wal"));
        assert_eq!(base, PathBuf::from("/tmp/app.db"));
        assert_eq!(kind, FileKind::Wal);

        let (base, kind) = FileKind::split(Path::new("/tmp/app.db"));
        assert_eq!(base, PathBuf::from("/tmp/app.db"));
        assert_eq!(kind, FileKind::Main);
    }

    #[test]
    fn resolve_side_files() {
        let table = PathTable::new();
        let staging = PathBuf::from("/scratch/app.db");
        table
            .register(staging.clone(), PathInfo::parse("mydb/app.db").unwrap())
            .unwrap();

        let (info, kind) = table.resolve(&staging).unwrap();
        assert_eq!((info.key(), kind), ("app.db", FileKind::Main));

        let (info, kind) = table.resolve(Path::new("/scratch/app.db-journal")).unwrap();
        assert_eq!(info.bucket(), "mydb");
        assert_eq!((info.key(), kind), ("app.db-journal", FileKind::Journal));

        let (info, kind) = table.resolve(Path::new("/scratch/app.db-wal")).unwrap();
        assert_eq!((info.key(), kind), ("app.db-wal", FileKind::Wal));
    }

    #[test]
    fn resolve_unregistered_is_error() {
        let table = PathTable::new();
        for path in ["/scratch/app.db", "/scratch/app.db-wal"] {
            assert!(matches!(
                table.resolve(Path::new(path)),
                Err(VfsError::UnknownPath { .. })
            ));
        }
    }

    #[test]
    fn resolve_prefers_exact_entry() {
        let table = PathTable::new();
        let staging = PathBuf::from("/scratch/events-wal");
        table
            .register(staging.clone(), PathInfo::parse("logs/events-wal").unwrap())
            .unwrap();

        let (info, kind) = table.resolve(&staging).unwrap();
        assert_eq!(info.key(), "events-wal");
        assert_eq!(kind, FileKind::Main);
    }

    #[test]
    fn register_is_idempotent() {
        let table = PathTable::new();
        let staging = PathBuf::from("/scratch/app.db");
        let info = PathInfo::parse("mydb/app.db").unwrap();

        table.register(staging.clone(), info.clone()).unwrap();
        table.acquire(&staging).unwrap();
        table.register(staging.clone(), info.clone()).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.open_handles(&staging), 1);

        assert_eq!(table.remove(&staging), Some(info));
        assert!(table.is_empty());
    }

    #[test]
    fn register_rejects_other_bucket_while_open() {
        let table = PathTable::new();
        let staging = PathBuf::from("/scratch/x.db");
        let alpha = PathInfo::parse("alpha/x.db").unwrap();
        let beta = PathInfo::parse("beta/x.db").unwrap();

        table.register(staging.clone(), alpha.clone()).unwrap();
        table.acquire(&staging).unwrap();

        let err = table.register(staging.clone(), beta.clone()).unwrap_err();
        match err {
            VfsError::StagingConflict {
                registered,
                requested,
                ..
            } => {
                assert_eq!(registered, "alpha/x.db");
                assert_eq!(requested, "beta/x.db");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(table.get(&staging), Some(alpha));
    }

    #[test]
    fn register_replaces_idle_entry() {
        let table = PathTable::new();
        let staging = PathBuf::from("/scratch/x.db");
        table
            .register(staging.clone(), PathInfo::parse("alpha/x.db").unwrap())
            .unwrap();

        let beta = PathInfo::parse("beta/x.db").unwrap();
        table.register(staging.clone(), beta.clone()).unwrap();
        assert_eq!(table.get(&staging), Some(beta));
    }

    #[test]
    fn side_handle_blocks_rebinding() {
        let table = PathTable::new();
        let staging = PathBuf::from("/scratch/x.db");
        table
            .register(staging.clone(), PathInfo::parse("alpha/x.db").unwrap())
            .unwrap();
        table.acquire(Path::new("/scratch/x.db-journal")).unwrap();

        assert!(matches!(
            table.register(staging, PathInfo::parse("beta/x.db").unwrap()),
            Err(VfsError::StagingConflict { .. })
        ));
    }

    #[test]
    fn entry_lives_until_last_main_release() {
        let table = PathTable::new();
        let staging = PathBuf::from("/scratch/app.db");
        let journal = PathBuf::from("/scratch/app.db-journal");
        table
            .register(staging.clone(), PathInfo::parse("mydb/app.db").unwrap())
            .unwrap();

        table.acquire(&staging).unwrap();
        table.acquire(&staging).unwrap();
        assert_eq!(table.open_handles(&staging), 2);

        assert_eq!(table.release(&staging), 1);
        assert!(table.contains(&staging));
        let (info, kind) = table.acquire(&journal).unwrap();
        assert_eq!((info.key(), kind), ("app.db-journal", FileKind::Journal));

        assert_eq!(table.release(&journal), 0);
        assert!(table.contains(&staging));

        assert_eq!(table.release(&staging), 0);
        assert!(table.is_empty());
        assert_eq!(table.release(&staging), 0);
    }
}
