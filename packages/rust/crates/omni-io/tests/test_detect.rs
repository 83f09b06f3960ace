//! Tests for detect module - binary detection, decoding and line endings.

use omni_io::{IoError, LineEnding, decode_buffer, detect_line_ending, is_binary};

#[test]
fn test_binary_detection() {
    assert!(is_binary(b"\x00\x01\x02\x03"));
    assert!(!is_binary(b"Hello, world!"));
    assert!(!is_binary(b""));
}

#[test]
fn test_decode_text() -> Result<(), Box<dyn std::error::Error>> {
    let result = decode_buffer(b"fn main() {}\n".to_vec())?;
    assert_eq!(result, "fn main() {}\n");
    Ok(())
}

#[test]
fn test_decode_binary() {
    let result = decode_buffer(b"\x00\x01\x02".to_vec());
    assert!(matches!(result, Err(IoError::BinaryFile)));
}

#[test]
fn test_decode_utf8_lossy() {
    let result = decode_buffer(vec![0x48, 0x65, 0x6c, 0xff, 0x6f]).unwrap();
    assert_eq!(result, "Hel\u{fffd}o");
}

#[test]
fn test_detect_crlf() {
    assert_eq!(detect_line_ending("a\r\nb\r\n"), LineEnding::CrLf);
    assert_eq!(LineEnding::CrLf.as_str(), "\r\n");
    assert_eq!(detect_line_ending("a\nb\n"), LineEnding::Lf);
}
