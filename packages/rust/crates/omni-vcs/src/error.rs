//! Error types for version-control operations.
//!
//! Follows ODF-REP: Library crates use `thiserror` for explicit error enums.

use thiserror::Error;

/// Errors for `VersionControl` operations.
#[derive(Debug, Error)]
pub enum VcsError {
    /// The git executable could not be started
    #[error("git is not available ({program}): {source}")]
    Unavailable {
        /// Program that failed to spawn.
        program: String,
        /// Spawn error.
        #[source]
        source: std::io::Error,
    },

    /// Command ran but exited unsuccessfully
    #[error("`{command}` failed with exit code {code:?}: {stderr}")]
    CommandFailed {
        /// Command line, for display.
        command: String,
        /// Exit code, `None` when killed by a signal.
        code: Option<i32>,
        /// Trimmed standard error.
        stderr: String,
    },

    /// Command exceeded its time budget and was killed
    #[error("`{command}` timed out after {secs}s")]
    Timeout {
        /// Command line, for display.
        command: String,
        /// Budget in seconds.
        secs: u64,
    },

    /// Path is not inside a repository and init was not requested
    #[error("{0} is not inside a git repository")]
    NotRepository(std::path::PathBuf),

    /// Waiting on or reading from the child failed
    #[error("I/O error while running git: {0}")]
    Io(#[from] std::io::Error),
}
