//! Tests for sync module - read with limits and atomic write.

use std::io::Write;
use tempfile::TempDir;

use omni_io::{IoError, read_text_safe, read_text_strict, write_text_atomic};

#[test]
fn test_sync_read() {
    let dir = TempDir::new().unwrap();
    let p = dir.path().join("sync.txt");
    std::fs::write(&p, "Sync Read").unwrap();
    assert_eq!(read_text_safe(&p, 1024).unwrap(), "Sync Read");
}

#[test]
fn test_sync_binary() {
    let dir = TempDir::new().unwrap();
    let p = dir.path().join("binary.bin");
    let mut file = std::fs::File::create(&p).unwrap();
    file.write_all(b"\x00\x01\x02\x03").unwrap();
    assert!(matches!(read_text_safe(&p, 1024), Err(IoError::BinaryFile)));
}

#[test]
fn test_file_too_large() {
    let dir = TempDir::new().unwrap();
    let p = dir.path().join("large.txt");
    std::fs::write(&p, "12345678901234567890").unwrap();
    assert!(matches!(
        read_text_safe(&p, 10),
        Err(IoError::TooLarge(_, _))
    ));
}

#[test]
fn test_file_not_found() {
    let result = read_text_safe("/nonexistent/file.txt", 1024);
    assert!(matches!(result, Err(IoError::NotFound(_))));
}

#[test]
fn test_atomic_write_roundtrip_preserves_bytes() {
    let dir = TempDir::new().unwrap();
    let p = dir.path().join("crlf.txt");
    std::fs::write(&p, "x").unwrap();
    write_text_atomic(&p, "a\r\nb\r\n").unwrap();
    assert_eq!(std::fs::read(&p).unwrap(), b"a\r\nb\r\n");
}

#[test]
fn test_atomic_write_creates_missing_file() {
    let dir = TempDir::new().unwrap();
    let p = dir.path().join("fresh.txt");
    write_text_atomic(&p, "hello").unwrap();
    assert_eq!(read_text_safe(&p, 1024).unwrap(), "hello");
}

#[test]
fn test_strict_read_rejects_latin1() {
    let dir = TempDir::new().unwrap();
    let p = dir.path().join("latin1.c");
    std::fs::write(&p, b"/* caf\xE9 */\nint x = 1;\n").unwrap();
    assert!(matches!(
        read_text_strict(&p, 1024),
        Err(IoError::InvalidUtf8 { offset: 6 })
    ));
    // The lenient reader still decodes it for display purposes.
    assert!(read_text_safe(&p, 1024).unwrap().contains('\u{FFFD}'));
}
