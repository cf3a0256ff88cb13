//! Remove command implementation.

use objvfs_core::{FileKind, ObjectVfs, Vfs};
use std::path::PathBuf;
use tracing::info;

/// Runs the rm command.
pub fn run(
    vfs: &ObjectVfs,
    logical: &str,
    side_files: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let staging = vfs.full_pathname(logical)?;
    let kinds: &[FileKind] = if side_files {
        &[FileKind::Main, FileKind::Journal, FileKind::Wal]
    } else {
        &[FileKind::Main]
    };

    info!(side_files, "Removing {}", logical);
    for kind in kinds {
        let path = PathBuf::from(format!("{}{}", staging.display(), kind.suffix()));
        info!(?kind, "Deleting object {}{}", logical, kind.suffix());
        vfs.delete(&path, false)?;
        println!("removed {logical}{}", kind.suffix());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::StoreArgs;
    use objvfs_store::{CallContext, ObjectStore};
    use tempfile::tempdir;

    #[test]
    fn removes_side_files_on_request() {
        let dir = tempdir().unwrap();
        let session = StoreArgs {
            store_root: Some(dir.path().join("store")),
            scratch_dir: Some(dir.path().join("scratch")),
            ..StoreArgs::default()
        }
        .build()
        .unwrap();
        let ctx = CallContext::background();
        for key in ["app.db", "app.db-journal", "app.db-wal"] {
            session.store.put(&ctx, "mydb", key, b"x").unwrap();
        }

        run(&session.vfs, "mydb/app.db", false).unwrap();
        assert!(session.store.attrs(&ctx, "mydb", "app.db").unwrap_err().is_not_found());
        assert!(session.store.attrs(&ctx, "mydb", "app.db-wal").is_ok());

        run(&session.vfs, "mydb/app.db", true).unwrap();
        assert!(session.store.attrs(&ctx, "mydb", "app.db-wal").unwrap_err().is_not_found());
    }
}
