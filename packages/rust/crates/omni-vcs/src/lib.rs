//! Version-control collaborator for Omni `DevEnv` patching.
//!
//! Defines the `VersionControl` capability trait and its git implementation.
//! libgit2 answers "is this a repository?"; everything that mutates the
//! repository runs through the `git` CLI with a bounded wait.
//!
//! # Architecture (ODF-REP Compliant)
//!
//! ```text
//! omni-vcs/src/
//! ├── lib.rs    # Re-exports (this file)
//! ├── error.rs  # VcsError enum
//! └── git.rs    # VersionControl trait + GitCli
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use omni_vcs::{GitCli, VersionControl};
//!
//! let git = GitCli::new("/path/to/project");
//! if git.is_available() && git.is_repository(git.work_dir()) {
//!     git.stage(Path::new("src/main.rs"))?;
//!     git.commit("Applied patch to main.rs")?;
//! }
//! ```

// ============================================================================
// Module Declarations (ODF-REP: Atomic Structure)
// ============================================================================

mod error;
mod git;

// ============================================================================
// Public Re-exports
// ============================================================================

pub use error::VcsError;
pub use git::{GitCli, GitConfig, GitIdentity, VersionControl};
