//! Content sniffing: binary detection, decoding and line-ending detection.

use memchr::{memchr, memchr_iter};

use crate::error::IoError;

/// Number of leading bytes inspected by [`is_binary`].
const BINARY_SNIFF_LEN: usize = 8192;

/// Quick binary detection - checks first 8KB for NULL bytes.
///
/// Files containing NULL bytes in the first 8KB are considered binary.
/// Patching those would corrupt them, so they are rejected up front.
#[must_use]
pub fn is_binary(buffer: &[u8]) -> bool {
    let check_len = std::cmp::min(buffer.len(), BINARY_SNIFF_LEN);
    memchr(0, &buffer[..check_len]).is_some()
}

/// Decode bytes to String with lossy fallback.
///
/// First checks for binary content, then attempts UTF-8 decoding.
/// Invalid UTF-8 sequences are replaced with U+FFFD.
///
/// # Errors
/// Returns `IoError::BinaryFile` when binary content is detected.
pub fn decode_buffer(buffer: Vec<u8>) -> Result<String, IoError> {
    if is_binary(&buffer) {
        return Err(IoError::BinaryFile);
    }

    match String::from_utf8(buffer) {
        Ok(s) => Ok(s),
        Err(e) => Ok(String::from_utf8_lossy(&e.into_bytes()).into_owned()),
    }
}

/// Decode bytes to String, rejecting invalid UTF-8.
///
/// Used for documents that are written back: a lossy decode would replace
/// bytes the caller never meant to touch.
///
/// # Errors
/// `IoError::BinaryFile` for binary content, `IoError::InvalidUtf8` with the
/// offset of the first bad byte otherwise.
pub fn decode_buffer_strict(buffer: Vec<u8>) -> Result<String, IoError> {
    if is_binary(&buffer) {
        return Err(IoError::BinaryFile);
    }

    String::from_utf8(buffer).map_err(|e| IoError::InvalidUtf8 {
        offset: e.utf8_error().valid_up_to(),
    })
}

/// Line terminator convention of a text document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    /// Unix `\n`.
    #[default]
    Lf,
    /// Windows `\r\n`.
    CrLf,
}

impl LineEnding {
    /// The terminator as a string slice.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::CrLf => "\r\n",
        }
    }
}

/// Detect the dominant line ending of `text`.
///
/// Counts `\n` bytes and how many of them are preceded by `\r`; CRLF wins
/// only when it is the majority. Text without newlines reports `Lf`.
#[must_use]
pub fn detect_line_ending(text: &str) -> LineEnding {
    let bytes = text.as_bytes();
    let mut lf = 0usize;
    let mut crlf = 0usize;
    for idx in memchr_iter(b'\n', bytes) {
        if idx > 0 && bytes[idx - 1] == b'\r' {
            crlf += 1;
        } else {
            lf += 1;
        }
    }
    if crlf > lf {
        LineEnding::CrLf
    } else {
        LineEnding::Lf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_window_is_bounded() {
        let mut buffer = vec![b'a'; BINARY_SNIFF_LEN];
        buffer.push(0);
        assert!(!is_binary(&buffer));
    }

    #[test]
    fn test_strict_decode_reports_offset() {
        let err = decode_buffer_strict(b"caf\xE9 au lait".to_vec()).unwrap_err();
        assert!(matches!(err, IoError::InvalidUtf8 { offset: 3 }));
        assert_eq!(decode_buffer_strict(b"ok".to_vec()).unwrap(), "ok");
    }

    #[test]
    fn test_line_ending_majority() {
        assert_eq!(detect_line_ending("a\r\nb\r\nc\n"), LineEnding::CrLf);
        assert_eq!(detect_line_ending("a\nb\r\n"), LineEnding::Lf);
        assert_eq!(detect_line_ending("no newline"), LineEnding::Lf);
    }
}
