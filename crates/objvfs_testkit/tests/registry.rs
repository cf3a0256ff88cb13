//! Engine-side VFS selection through the registry.

use objvfs_core::{ConnectionString, VfsRegistry};
use objvfs_testkit::prelude::*;
use std::sync::Arc;

#[test]
fn connection_string_selects_registered_vfs() {
    let t = TestVfs::new();
    let registry = VfsRegistry::new();
    let vfs: Arc<dyn Vfs> = Arc::new(ObjectVfs::with_store(
        VfsConfig::new().name("gcs").scratch_dir(t.scratch_dir()),
        Arc::new(t.store.clone()),
    ));
    registry.register(vfs, false);

    let conn = ConnectionString::parse("file:mydb/app.db?vfs=gcs").unwrap();
    let (staging, mut file) = registry.open_database(&conn, rw_flags()).unwrap();
    assert_eq!(staging, t.scratch_dir().join("app.db"));

    file.write_at(b"through the registry", 0).unwrap();
    file.sync(SyncFlags::NORMAL).unwrap();
    file.close().unwrap();

    assert_eq!(
        t.store.object("mydb", "app.db").unwrap(),
        b"through the registry"
    );
}

#[test]
fn unknown_vfs_name_is_rejected() {
    let registry = VfsRegistry::new();
    let conn = ConnectionString::parse("file:mydb/app.db?vfs=missing").unwrap();
    assert!(matches!(
        registry.open_database(&conn, rw_flags()),
        Err(VfsError::UnknownVfs { .. })
    ));
}

#[test]
fn global_registry_is_shared() {
    let t = TestVfs::new();
    let vfs: Arc<dyn Vfs> = Arc::new(ObjectVfs::with_store(
        VfsConfig::new()
            .name("objstore-global-test")
            .scratch_dir(t.scratch_dir()),
        Arc::new(t.store.clone()),
    ));
    VfsRegistry::global().register(vfs, false);

    assert!(VfsRegistry::global().find("objstore-global-test").is_some());
    assert!(VfsRegistry::global()
        .unregister("objstore-global-test")
        .is_some());
}
