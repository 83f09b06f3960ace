//! Tests for backup module - scoped backup and restore.

use tempfile::TempDir;

use omni_io::{BackupGuard, IoError};

fn entries(dir: &TempDir) -> usize {
    std::fs::read_dir(dir.path()).unwrap().count()
}

#[test]
fn test_discard_keeps_new_content() {
    let dir = TempDir::new().unwrap();
    let target = dir.path().join("lib.rs");
    std::fs::write(&target, "old").unwrap();

    let guard = BackupGuard::create(&target).unwrap();
    assert!(guard.backup_path().exists());
    assert_ne!(guard.backup_path(), target.as_path());
    assert_eq!(std::fs::read_to_string(guard.backup_path()).unwrap(), "old");

    std::fs::write(&target, "new").unwrap();
    guard.discard().unwrap();

    assert_eq!(std::fs::read_to_string(&target).unwrap(), "new");
    assert_eq!(entries(&dir), 1);
}

#[test]
fn test_restore_rolls_back() {
    let dir = TempDir::new().unwrap();
    let target = dir.path().join("lib.rs");
    std::fs::write(&target, "original\n").unwrap();

    let guard = BackupGuard::create(&target).unwrap();
    std::fs::write(&target, "garbage").unwrap();
    guard.restore().unwrap();

    assert_eq!(std::fs::read_to_string(&target).unwrap(), "original\n");
    assert_eq!(entries(&dir), 1);
}

#[test]
fn test_missing_target() {
    let dir = TempDir::new().unwrap();
    let result = BackupGuard::create(dir.path().join("absent.rs"));
    assert!(matches!(result, Err(IoError::NotFound(_))));
    assert_eq!(entries(&dir), 0);
}

#[test]
fn test_same_stamp_twice_does_not_collide() {
    let dir = TempDir::new().unwrap();
    let target = dir.path().join("lib.rs");
    std::fs::write(&target, "v1").unwrap();

    let first = BackupGuard::create_with_stamp(&target, "20250101000000").unwrap();
    let second = BackupGuard::create_with_stamp(&target, "20250101000000").unwrap();
    assert_ne!(first.backup_path(), second.backup_path());

    second.discard().unwrap();
    first.discard().unwrap();
    assert_eq!(entries(&dir), 1);
}
