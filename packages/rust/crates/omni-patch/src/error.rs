//! Error types for patch parsing.
//!
//! Follows ODF-REP: Library crates use `thiserror` for explicit error enums.
//! Only structural problems are errors; a directive whose target cannot be
//! found is reported through `ApplyResult::outcomes` instead.

use thiserror::Error;

/// Error types for patch operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatchError {
    /// Marker pairing or part count does not match the selected mode.
    #[error("Malformed patch: {0}")]
    MalformedPatch(String),

    /// Mode name not recognised.
    #[error("Unsupported patch mode: {0}")]
    UnsupportedMode(String),
}
