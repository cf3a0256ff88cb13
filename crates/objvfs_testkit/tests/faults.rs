//! Store failures surface as typed errors and never lose pending writes.

use objvfs_testkit::prelude::*;

#[test]
fn failed_sync_keeps_writes_pending_and_retry_uploads() {
    let t = FaultyVfs::new();
    let staging = t.vfs.full_pathname("mydb/app.db").unwrap();
    let file = t
        .vfs
        .open_with_context(&staging, rw_flags(), CallContext::background())
        .unwrap();
    file.write_at(b"precious", 0).unwrap();

    t.faults.set_fail_uploads(true);
    let err = file.sync(SyncFlags::NORMAL).unwrap_err();
    assert!(matches!(err, VfsError::Upload { .. }));
    assert!(file.is_dirty());
    assert!(t.store.object("mydb", "app.db").is_none());

    let mut buf = [0u8; 8];
    file.read_at(&mut buf, 0).unwrap();
    assert_eq!(&buf, b"precious");

    t.faults.reset();
    file.sync(SyncFlags::NORMAL).unwrap();
    assert!(!file.is_dirty());
    assert_eq!(t.store.object("mydb", "app.db").unwrap(), b"precious");
    assert_eq!(t.faults.upload_count(), 1);
}

#[test]
fn failed_upload_leaves_previous_version() {
    let t = FaultyVfs::new();
    let staging = t.vfs.full_pathname("mydb/app.db").unwrap();
    let file = t.vfs.open(&staging, rw_flags()).unwrap();
    file.write_at(b"v1", 0).unwrap();
    file.sync(SyncFlags::NORMAL).unwrap();

    file.write_at(b"v2", 0).unwrap();
    t.faults.set_fail_uploads(true);
    assert!(file.sync(SyncFlags::NORMAL).is_err());
    assert_eq!(t.store.object("mydb", "app.db").unwrap(), b"v1");
}

#[test]
fn remote_read_failure_is_reported() {
    let t = FaultyVfs::new();
    let staging = t.vfs.full_pathname("mydb/app.db").unwrap();
    let file = t.vfs.open(&staging, rw_flags()).unwrap();
    file.write_at(b"data", 0).unwrap();
    file.sync(SyncFlags::NORMAL).unwrap();

    t.faults.set_fail_reads(true);
    let mut buf = [0u8; 4];
    assert!(matches!(
        file.read_at(&mut buf, 0),
        Err(VfsError::Read { .. })
    ));
}

#[test]
fn clean_reads_hit_the_store_and_dirty_reads_do_not() {
    let t = FaultyVfs::new();
    let staging = t.vfs.full_pathname("mydb/app.db").unwrap();
    let file = t.vfs.open(&staging, rw_flags()).unwrap();
    file.write_at(b"data", 0).unwrap();

    let before = t.faults.read_count();
    let mut buf = [0u8; 4];
    file.read_at(&mut buf, 0).unwrap();
    assert_eq!(t.faults.read_count(), before);

    file.sync(SyncFlags::NORMAL).unwrap();
    file.read_at(&mut buf, 0).unwrap();
    assert_eq!(t.faults.read_count(), before + 1);
}

#[test]
fn metadata_failure_is_reported() {
    let t = FaultyVfs::new();
    let staging = t.vfs.full_pathname("mydb/app.db").unwrap();
    let file = t.vfs.open(&staging, rw_flags()).unwrap();

    t.faults.set_fail_attrs(true);
    assert!(matches!(file.file_size(), Err(VfsError::Stat { .. })));
    assert!(matches!(t.vfs.access(&staging), Err(VfsError::Stat { .. })));
}

#[test]
fn delete_failure_is_reported() {
    let t = FaultyVfs::new();
    let staging = t.vfs.full_pathname("mydb/app.db").unwrap();

    t.faults.set_fail_deletes(true);
    assert!(matches!(
        t.vfs.delete(&staging, false),
        Err(VfsError::ObjectDelete { .. })
    ));
}

#[test]
fn hydrate_failure_removes_staging_file() {
    let t = FaultyVfs::new();
    t.store
        .put(&CallContext::background(), "mydb", "app.db", b"remote")
        .unwrap();
    let staging = t.vfs.full_pathname("mydb/app.db").unwrap();

    t.faults.set_fail_reads(true);
    assert!(matches!(
        t.vfs.open(&staging, rw_flags()),
        Err(VfsError::Read { .. })
    ));
    assert!(!staging.exists());
    assert_eq!(t.vfs.path_table().open_handles(&staging), 0);

    t.faults.reset();
    let file = t.vfs.open(&staging, rw_flags()).unwrap();
    assert_eq!(file.file_size().unwrap(), 6);
}

#[test]
fn read_only_open_downloads_nothing() {
    let t = FaultyVfs::new();
    t.store
        .put(&CallContext::background(), "mydb", "app.db", &[7u8; 64 * 1024])
        .unwrap();
    let staging = t.vfs.full_pathname("mydb/app.db").unwrap();

    let file = t.vfs.open(&staging, OpenFlags::READ_ONLY).unwrap();
    assert_eq!(t.faults.read_count(), 0);
    assert_eq!(std::fs::metadata(&staging).unwrap().len(), 0);

    let mut header = [0u8; 100];
    assert_eq!(file.read_at(&mut header, 0).unwrap(), 100);
    assert!(header.iter().all(|&b| b == 7));
    assert_eq!(t.faults.read_count(), 1);
}

#[test]
fn cancelled_sync_keeps_writes_pending() {
    let t = FaultyVfs::new();
    let staging = t.vfs.full_pathname("mydb/app.db").unwrap();
    let ctx = CallContext::background();
    let cancel = ctx.cancel_handle();
    let file = t.vfs.open_with_context(&staging, rw_flags(), ctx).unwrap();
    file.write_at(b"draft", 0).unwrap();

    cancel.cancel();
    let err = file.sync(SyncFlags::NORMAL).unwrap_err();
    assert!(err.is_interrupted());
    assert!(file.is_dirty());
    assert_eq!(t.faults.upload_count(), 0);
}
