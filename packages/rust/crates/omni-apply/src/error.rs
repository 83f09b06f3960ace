//! Error types for a patch transaction.
//!
//! Follows ODF-REP: Library crates use `thiserror` for explicit error enums.
//! Every variant here is fatal; soft outcomes (skipped directives, no-op,
//! version-control trouble) are carried by `TransactionReport` instead.

use std::path::PathBuf;

use omni_io::IoError;
use omni_patch::PatchError;
use thiserror::Error;

/// Fatal errors of one apply invocation.
#[derive(Error, Debug)]
pub enum ApplyError {
    /// Target file does not exist.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Patch file does not exist.
    #[error("Patch file not found: {0}")]
    PatchNotFound(PathBuf),

    /// Patch text could not be parsed; nothing was modified.
    #[error(transparent)]
    Patch(#[from] PatchError),

    /// Reading, backing up or restoring failed.
    #[error(transparent)]
    Io(#[from] IoError),

    /// Writing the patched document failed.
    #[error("Failed to write {path} ({}): {source}", restore_note(.restored))]
    WriteFailure {
        /// Target path.
        path: PathBuf,
        /// Whether the pre-invocation content was restored.
        restored: bool,
        /// Underlying write error.
        #[source]
        source: IoError,
    },
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn restore_note(restored: &bool) -> &'static str {
    if *restored {
        "restored from backup"
    } else {
        "no backup restored"
    }
}
