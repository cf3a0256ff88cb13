//! Named VFS registration and connection-string selection.
//!
//! The engine picks a VFS by name, either from a `?vfs=<name>` query
//! parameter in a `file:` connection string or by falling back to the
//! registry default.

use crate::error::{VfsError, VfsResult};
use crate::flags::OpenFlags;
use crate::vfs::{Vfs, VfsFile};
use parking_lot::RwLock;
use percent_encoding::percent_decode_str;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info};

#[derive(Default)]
struct Entries {
    by_name: HashMap<String, Arc<dyn Vfs>>,
    default: Option<String>,
}

/// A set of VFS implementations addressable by name.
#[derive(Default)]
pub struct VfsRegistry {
    entries: RwLock<Entries>,
}

impl VfsRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the process-wide registry.
    pub fn global() -> &'static VfsRegistry {
        static GLOBAL: OnceLock<VfsRegistry> = OnceLock::new();
        GLOBAL.get_or_init(VfsRegistry::new)
    }

    /// Registers `vfs` under its own name, replacing any VFS of that name.
    ///
    /// The first registered VFS becomes the default; `make_default` forces
    /// it.
    pub fn register(&self, vfs: Arc<dyn Vfs>, make_default: bool) {
        let name = vfs.name().to_string();
        let mut entries = self.entries.write();
        if make_default || entries.default.is_none() {
            entries.default = Some(name.clone());
        }
        info!(vfs = %name, make_default, "vfs registered");
        entries.by_name.insert(name, vfs);
    }

    /// Looks up a VFS by name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<Arc<dyn Vfs>> {
        self.entries.read().by_name.get(name).cloned()
    }

    /// Returns the default VFS, if one is registered.
    #[must_use]
    pub fn default_vfs(&self) -> Option<Arc<dyn Vfs>> {
        let entries = self.entries.read();
        let name = entries.default.as_ref()?;
        entries.by_name.get(name).cloned()
    }

    /// Removes a VFS. If it was the default, the registry has no default
    /// until another VFS is registered.
    pub fn unregister(&self, name: &str) -> Option<Arc<dyn Vfs>> {
        let mut entries = self.entries.write();
        let removed = entries.by_name.remove(name);
        if entries.default.as_deref() == Some(name) {
            entries.default = None;
        }
        if removed.is_some() {
            info!(vfs = name, "vfs unregistered");
        }
        removed
    }

    /// Returns the registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.read().by_name.keys().cloned().collect();
        names.sort();
        names
    }

    /// Picks the VFS a connection string asks for.
    ///
    /// # Errors
    ///
    /// Returns [`VfsError::UnknownVfs`] if the named VFS (or, without a
    /// `vfs` parameter, any default) is not registered.
    pub fn select(&self, conn: &ConnectionString) -> VfsResult<Arc<dyn Vfs>> {
        match conn.vfs() {
            Some(name) => self.find(name).ok_or_else(|| VfsError::UnknownVfs {
                name: name.to_string(),
            }),
            None => self.default_vfs().ok_or_else(|| VfsError::UnknownVfs {
                name: String::from("<default>"),
            }),
        }
    }

    /// Resolves and opens the main database file of a connection string.
    ///
    /// This is the sequence the engine performs when it opens a database:
    /// select the VFS, map the path with `full_pathname`, then `open`.
    ///
    /// # Errors
    ///
    /// Returns any error from selection, path resolution or open.
    pub fn open_database(
        &self,
        conn: &ConnectionString,
        flags: OpenFlags,
    ) -> VfsResult<(PathBuf, Box<dyn VfsFile>)> {
        let vfs = self.select(conn)?;
        let staging = vfs.full_pathname(conn.path())?;
        let file = vfs.open(&staging, flags | OpenFlags::MAIN_DB)?;
        debug!(vfs = vfs.name(), path = conn.path(), "database opened");
        Ok((staging, file))
    }
}

impl std::fmt::Debug for VfsRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entries = self.entries.read();
        f.debug_struct("VfsRegistry")
            .field("names", &entries.by_name.keys().collect::<Vec<_>>())
            .field("default", &entries.default)
            .finish()
    }
}

/// A parsed database connection string.
///
/// Accepts a plain path (`mydb/app.db`) or a URI
/// (`file:mydb/app.db?vfs=objstore&mode=rw`). Query values are
/// percent-decoded; a trailing `#fragment` is ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionString {
    path: String,
    params: Vec<(String, String)>,
}

impl ConnectionString {
    /// Parses a connection string.
    ///
    /// # Errors
    ///
    /// Returns [`VfsError::InvalidConnectionString`] for an empty path, an
    /// authority (`file://`), or invalid percent-encoding.
    ///
    /// # Example
    ///
    /// ```rust
    /// use objvfs_core::ConnectionString;
    ///
    /// let conn = ConnectionString::parse("file:mydb/app.db?vfs=objstore").unwrap();
    /// assert_eq!(conn.path(), "mydb/app.db");
    /// assert_eq!(conn.vfs(), Some("objstore"));
    /// ```
    pub fn parse(input: &str) -> VfsResult<Self> {
        let Some(uri) = input.strip_prefix("file:") else {
            if input.is_empty() {
                return Err(VfsError::invalid_connection_string(input, "empty path"));
            }
            return Ok(Self {
                path: input.to_string(),
                params: Vec::new(),
            });
        };

        if uri.starts_with("//") {
            return Err(VfsError::invalid_connection_string(
                input,
                "URI authority is not supported",
            ));
        }
        let uri = uri.split_once('#').map_or(uri, |(before, _)| before);
        let (raw_path, query) = uri.split_once('?').unwrap_or((uri, ""));

        let path = decode(input, raw_path)?;
        if path.is_empty() {
            return Err(VfsError::invalid_connection_string(input, "empty path"));
        }

        let mut params = Vec::new();
        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
            params.push((decode(input, name)?, decode(input, value)?));
        }

        Ok(Self { path, params })
    }

    /// Returns the database path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the requested VFS name, if any.
    #[must_use]
    pub fn vfs(&self) -> Option<&str> {
        self.param("vfs")
    }

    /// Returns the last value of a query parameter.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

fn decode(input: &str, raw: &str) -> VfsResult<String> {
    percent_decode_str(raw)
        .decode_utf8()
        .map(|s| s.into_owned())
        .map_err(|_| VfsError::invalid_connection_string(input, "invalid percent-encoding"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VfsConfig;
    use crate::vfs::ObjectVfs;
    use objvfs_store::InMemoryObjectStore;
    use tempfile::tempdir;

    fn vfs_named(name: &str, scratch: &std::path::Path) -> Arc<dyn Vfs> {
        Arc::new(ObjectVfs::with_store(
            VfsConfig::new().name(name).scratch_dir(scratch),
            Arc::new(InMemoryObjectStore::new()),
        ))
    }

    #[test]
    fn parse_plain_path() {
        let conn = ConnectionString::parse("mydb/app.db").unwrap();
        assert_eq!(conn.path(), "mydb/app.db");
        assert_eq!(conn.vfs(), None);
    }

    #[test]
    fn parse_uri_with_params() {
        let conn =
            ConnectionString::parse("file:mydb/my%20app.db?vfs=objstore&mode=rw#frag").unwrap();
        assert_eq!(conn.path(), "mydb/my app.db");
        assert_eq!(conn.vfs(), Some("objstore"));
        assert_eq!(conn.param("mode"), Some("rw"));
        assert_eq!(conn.param("cache"), None);
    }

    #[test]
    fn later_param_wins() {
        let conn = ConnectionString::parse("file:b/k?vfs=a&vfs=b").unwrap();
        assert_eq!(conn.vfs(), Some("b"));
    }

    #[test]
    fn parse_rejects_bad_input() {
        for bad in ["", "file:", "file:?vfs=x", "file://host/b/k"] {
            assert!(
                matches!(
                    ConnectionString::parse(bad),
                    Err(VfsError::InvalidConnectionString { .. })
                ),
                "{bad}"
            );
        }
    }

    #[test]
    fn first_registration_becomes_default() {
        let scratch = tempdir().unwrap();
        let registry = VfsRegistry::new();
        registry.register(vfs_named("a", scratch.path()), false);
        registry.register(vfs_named("b", scratch.path()), false);

        assert_eq!(registry.default_vfs().unwrap().name(), "a");
        assert_eq!(registry.names(), vec!["a", "b"]);

        registry.register(vfs_named("c", scratch.path()), true);
        assert_eq!(registry.default_vfs().unwrap().name(), "c");
    }

    #[test]
    fn select_by_name_or_default() {
        let scratch = tempdir().unwrap();
        let registry = VfsRegistry::new();
        registry.register(vfs_named("local", scratch.path()), true);
        registry.register(vfs_named("objstore", scratch.path()), false);

        let named = ConnectionString::parse("file:mydb/app.db?vfs=objstore").unwrap();
        assert_eq!(registry.select(&named).unwrap().name(), "objstore");

        let plain = ConnectionString::parse("mydb/app.db").unwrap();
        assert_eq!(registry.select(&plain).unwrap().name(), "local");

        let missing = ConnectionString::parse("file:mydb/app.db?vfs=gcs").unwrap();
        assert!(matches!(
            registry.select(&missing),
            Err(VfsError::UnknownVfs { .. })
        ));
    }

    #[test]
    fn unregister_clears_default() {
        let scratch = tempdir().unwrap();
        let registry = VfsRegistry::new();
        registry.register(vfs_named("a", scratch.path()), true);

        assert!(registry.unregister("a").is_some());
        assert!(registry.unregister("a").is_none());
        assert!(registry.default_vfs().is_none());
        assert!(registry.find("a").is_none());
    }

    #[test]
    fn open_database_resolves_and_opens() {
        let scratch = tempdir().unwrap();
        let registry = VfsRegistry::new();
        registry.register(vfs_named("objstore", scratch.path()), true);

        let conn = ConnectionString::parse("file:mydb/app.db?vfs=objstore").unwrap();
        let (staging, mut file) = registry
            .open_database(&conn, OpenFlags::READ_WRITE | OpenFlags::CREATE)
            .unwrap();

        assert_eq!(staging, scratch.path().join("app.db"));
        assert_eq!(file.file_size().unwrap(), 0);
        file.close().unwrap();
    }
}
