//! Synchronous file I/O operations.
//!
//! The patch pipeline is single-threaded, so everything here blocks.

use std::fs as std_fs;
use std::io::{Read, Write};
use std::path::Path;

use tempfile::NamedTempFile;

use crate::detect::{decode_buffer, decode_buffer_strict};
use crate::error::IoError;

/// Read text from a file with size and binary checks (synchronous).
///
/// # Arguments
/// * `path` - Path to the file
/// * `max_bytes` - Maximum file size in bytes
///
/// # Returns
/// Decoded text content or an error.
///
/// # Errors
/// `NotFound` when the path does not exist, `TooLarge` above `max_bytes`,
/// `BinaryFile` for binary content and `System` for other OS failures.
///
/// # Example
///
/// ```rust,ignore
/// use omni_io::read_text_safe;
///
/// let content = read_text_safe("README.md", 1024 * 1024)?;
/// ```
pub fn read_text_safe<P: AsRef<Path>>(path: P, max_bytes: u64) -> Result<String, IoError> {
    decode_buffer(read_bytes_checked(path.as_ref(), max_bytes)?)
}

/// Read a document that will be edited and written back.
///
/// Same checks as [`read_text_safe`], but invalid UTF-8 is an error instead
/// of being replaced, so a later write reproduces every untouched byte.
///
/// # Errors
/// As [`read_text_safe`], plus `InvalidUtf8`.
pub fn read_text_strict<P: AsRef<Path>>(path: P, max_bytes: u64) -> Result<String, IoError> {
    decode_buffer_strict(read_bytes_checked(path.as_ref(), max_bytes)?)
}

fn read_bytes_checked(path: &Path, max_bytes: u64) -> Result<Vec<u8>, IoError> {
    let metadata = std_fs::metadata(path)
        .map_err(|_| IoError::NotFound(path.to_string_lossy().to_string()))?;

    if !metadata.is_file() {
        return Err(IoError::NotFound(path.to_string_lossy().to_string()));
    }

    if metadata.len() > max_bytes {
        return Err(IoError::TooLarge(metadata.len(), max_bytes));
    }

    let mut file = std_fs::File::open(path)?;
    let mut buffer = Vec::with_capacity(usize::try_from(metadata.len()).unwrap_or_default());
    file.read_to_end(&mut buffer)?;
    Ok(buffer)
}

/// Replace the contents of `path` atomically.
///
/// The text is written to a temporary file in the same directory, flushed to
/// disk and renamed over the target, so readers observe either the old or the
/// new content. Permissions of an existing target are carried over.
///
/// # Errors
/// Returns `IoError::Write` when any step fails; the target is left as it was.
pub fn write_text_atomic<P: AsRef<Path>>(path: P, content: &str) -> Result<(), IoError> {
    let path = path.as_ref();
    let write_err = |source: std::io::Error| IoError::Write {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(content.as_bytes()).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;

    if let Ok(metadata) = std_fs::metadata(path) {
        std_fs::set_permissions(tmp.path(), metadata.permissions()).map_err(write_err)?;
    }

    tmp.persist(path).map_err(|e| write_err(e.error))?;
    tracing::debug!(path = %path.display(), bytes = content.len(), "wrote file atomically");
    Ok(())
}
