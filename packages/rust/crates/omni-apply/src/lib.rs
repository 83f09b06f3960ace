#![allow(clippy::doc_markdown)]

//! omni-apply - Patch Transactions for Omni DevEnv
//!
//! Wraps the omni-patch engine in a file transaction: safe read, optional
//! backup, atomic write, rollback on write failure and an optional git
//! commit of the single patched file.
//!
//! # Architecture (ODF-REP Compliant)
//!
//! ```text
//! omni-apply/src/
//! ├── lib.rs          # Re-exports (this file)
//! ├── main.rs         # CLI entry point
//! ├── cli.rs          # clap argument definitions
//! ├── error.rs        # ApplyError enum (thiserror)
//! ├── settings.rs     # YAML settings (system + user merge)
//! └── transaction.rs  # Transaction state machine
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use omni_apply::{ApplyRequest, AtomicWriter, Transaction};
//!
//! let writer = AtomicWriter;
//! let report = Transaction::new(&writer).run(&request)?;
//! println!("{}", report.summary);
//! ```

// ============================================================================
// Module Declarations (ODF-REP: Atomic Structure)
// ============================================================================

mod error;
mod settings;
mod transaction;

// ============================================================================
// Public Re-exports
// ============================================================================

pub use error::ApplyError;
pub use settings::{
    ApplySettings, DEFAULT_COMMIT_MESSAGE_TEMPLATE, DEFAULT_GIT_TIMEOUT_SECS, DEFAULT_MAX_FILE_SIZE,
    RuntimeSettings, SettingsPaths, load_runtime_settings, load_runtime_settings_from_paths,
    set_config_home_override,
};
pub use transaction::{
    ApplyRequest, AtomicWriter, CommitRequest, DocumentWriter, Transaction, TransactionReport,
    TransactionState, VcsOutcome, VcsStep, parent_dir,
};
