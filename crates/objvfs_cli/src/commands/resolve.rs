//! Resolve command implementation.

use objvfs_core::{FileKind, ObjectVfs, Vfs};
use tracing::debug;

/// Runs the resolve command.
pub fn run(vfs: &ObjectVfs, logical: &str) -> Result<(), Box<dyn std::error::Error>> {
    let staging = vfs.full_pathname(logical)?;
    let info = vfs
        .path_table()
        .get(&staging)
        .ok_or("path was not registered")?;
    debug!("Resolved {} to {:?}", logical, staging);

    println!("Logical:  {logical}");
    println!("Bucket:   {}", info.bucket());
    println!("Key:      {}", info.key());
    println!("Staging:  {}", staging.display());
    for kind in [FileKind::Journal, FileKind::Wal] {
        println!("{:<9} {}", format!("{kind:?}:"), info.with_kind(kind).key());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::StoreArgs;
    use tempfile::tempdir;

    #[test]
    fn resolves_without_a_store() {
        let scratch = tempdir().unwrap();
        let vfs = StoreArgs {
            scratch_dir: Some(scratch.path().to_path_buf()),
            ..StoreArgs::default()
        }
        .build_lazy();

        run(&vfs, "mydb/tenants/app.db").unwrap();
        assert_eq!(
            vfs.path_table().get(&scratch.path().join("tenants/app.db")).unwrap().bucket(),
            "mydb"
        );
    }

    #[test]
    fn rejects_malformed_path() {
        let vfs = StoreArgs::default().build_lazy();
        assert!(run(&vfs, "app.db").is_err());
    }
}
