#![allow(clippy::doc_markdown)]

//! omni-io - Safe file I/O for Omni DevEnv
//!
//! File access primitives used by the patch pipeline.
//!
//! # Features
//!
//! - **Safety**: Binary detection & Size limits on read
//! - **Atomic writes**: temp file + fsync + rename
//! - **Scoped backups**: `BackupGuard` restores the target unless discarded
//!
//! # Architecture (ODF-REP Compliant)
//!
//! ```text
//! omni-io/src/
//! ├── lib.rs      # Re-exports (this file)
//! ├── error.rs    # IoError enum
//! ├── detect.rs   # Binary detection, decoding, line endings
//! ├── sync.rs     # Read / atomic write
//! └── backup.rs   # BackupGuard
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use omni_io::{BackupGuard, read_text_safe, write_text_atomic};
//!
//! let guard = BackupGuard::create("src/main.rs")?;
//! let content = read_text_safe("src/main.rs", 1024 * 1024)?;
//! write_text_atomic("src/main.rs", &content.replace("old", "new"))?;
//! guard.discard()?;
//! ```

// ============================================================================
// Module Declarations (ODF-REP: Atomic Structure)
// ============================================================================

mod backup;
mod detect;
mod error;
mod sync;

// ============================================================================
// Public Re-exports
// ============================================================================

pub use backup::{BackupGuard, backup_path_for};
pub use error::IoError;
pub use sync::{read_text_safe, read_text_strict, write_text_atomic};

// Re-export detection utilities for advanced use
pub use detect::{LineEnding, decode_buffer, decode_buffer_strict, detect_line_ending, is_binary};
