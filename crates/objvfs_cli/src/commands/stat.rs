//! Stat command implementation.

use super::Session;
use objvfs_core::{FileKind, PathInfo, Vfs};
use objvfs_store::{CallContext, ObjectHandle};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

/// Remote state of one database and its side files.
#[derive(Debug, Serialize)]
pub struct StatReport {
    /// Logical path.
    pub path: String,
    /// Bucket name.
    pub bucket: String,
    /// Staging path on this machine.
    pub staging: String,
    /// Main database object.
    pub main: ObjectStat,
    /// Rollback journal object.
    pub journal: ObjectStat,
    /// Write-ahead log object.
    pub wal: ObjectStat,
}

/// Remote state of a single object.
#[derive(Debug, Serialize)]
pub struct ObjectStat {
    /// Object key.
    pub key: String,
    /// Whether the object exists.
    pub exists: bool,
    /// Size in bytes, if it exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Store generation, if it exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation: Option<u64>,
}

/// Collects the stat report for `logical`.
pub fn collect(session: &Session, logical: &str) -> Result<StatReport, Box<dyn std::error::Error>> {
    let staging = session.vfs.full_pathname(logical)?;
    let base = PathInfo::parse(logical)?;
    let ctx = CallContext::background();

    let stat = |kind: FileKind| -> Result<ObjectStat, Box<dyn std::error::Error>> {
        let info = base.with_kind(kind);
        let side = format!("{}{}", staging.display(), kind.suffix());
        let exists = session.vfs.access(Path::new(&side))?;
        let attrs = if exists {
            let object = ObjectHandle::new(Arc::clone(&session.store), info.bucket(), info.key());
            Some(object.attrs(&ctx)?)
        } else {
            None
        };
        Ok(ObjectStat {
            key: info.key().to_string(),
            exists,
            size: attrs.map(|a| a.size),
            generation: attrs.map(|a| a.generation),
        })
    };

    Ok(StatReport {
        path: logical.to_string(),
        bucket: base.bucket().to_string(),
        staging: staging.display().to_string(),
        main: stat(FileKind::Main)?,
        journal: stat(FileKind::Journal)?,
        wal: stat(FileKind::Wal)?,
    })
}

/// Prints a report in `format` (`text` or `json`).
pub fn print(report: &StatReport, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(report)?);
        }
        _ => {
            println!("Database: {}", report.path);
            println!("Bucket:   {}", report.bucket);
            println!("Staging:  {}", report.staging);
            println!();
            for (label, object) in [
                ("main", &report.main),
                ("journal", &report.journal),
                ("wal", &report.wal),
            ] {
                match object.size {
                    Some(size) => println!("  {label:<8} {:<40} {size} bytes", object.key),
                    None => println!("  {label:<8} {:<40} (absent)", object.key),
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::StoreArgs;
    use objvfs_store::ObjectStore;
    use tempfile::tempdir;

    #[test]
    fn reports_present_and_absent_objects() {
        let dir = tempdir().unwrap();
        let session = StoreArgs {
            store_root: Some(dir.path().join("store")),
            scratch_dir: Some(dir.path().join("scratch")),
            ..StoreArgs::default()
        }
        .build()
        .unwrap();
        let ctx = CallContext::background();
        session.store.put(&ctx, "mydb", "app.db", &[7u8; 4096]).unwrap();
        session.store.put(&ctx, "mydb", "app.db-wal", b"frames").unwrap();

        let report = collect(&session, "mydb/app.db").unwrap();
        assert_eq!(report.bucket, "mydb");
        assert_eq!(report.main.size, Some(4096));
        assert!(!report.journal.exists);
        assert_eq!(report.wal.key, "app.db-wal");
        assert_eq!(report.wal.size, Some(6));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["main"]["size"], 4096);
        assert!(json["journal"].get("size").is_none());
    }
}
