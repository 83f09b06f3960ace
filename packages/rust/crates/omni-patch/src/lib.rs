#![allow(clippy::doc_markdown)]

//! omni-patch - Directive-Driven Source Patching for Omni DevEnv
//!
//! Rewrites sections of a text document according to marker-delimited
//! directive blocks, while every byte outside the edited spans stays as it was.
//!
//! # Features
//!
//! - **Five Modes**: replace, append, prepend, smart (anchored edits and line
//!   inserts) and functions (whole definitions)
//! - **Tiered Matching**: exact, whitespace-normalized, fuzzy LCS similarity
//! - **Brace-Aware Function Lookup**: depth counting skips comments and strings
//! - **Diff Preview**: Unified diff of the rewritten document
//!
//! # Architecture (ODF-REP Compliant)
//!
//! ```text
//! omni-patch/src/
//! ├── lib.rs         # Re-exports (this file)
//! ├── error.rs       # PatchError enum (thiserror)
//! ├── types.rs       # Directive, PatchMode, MatchSpan, ApplyResult
//! ├── directive.rs   # Marker block parser
//! ├── locator.rs     # Exact / normalized / fuzzy section locator
//! ├── function.rs    # Function definition lookup
//! ├── applicator.rs  # PatchEngine implementation
//! └── diff.rs        # Diff generation utilities
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use omni_patch::{ApplyOptions, PatchEngine, PatchMode};
//!
//! let patch = "// FUNCTION\nfoo\n// CODE\nfunction foo() { return 2; }\n// END_FUNCTION\n";
//! let result = PatchEngine::apply_text(
//!     "function foo() { return 1; }\n",
//!     patch,
//!     PatchMode::Functions,
//!     ApplyOptions::default(),
//! )?;
//! assert!(result.changed);
//! ```

// ============================================================================
// Module Declarations (ODF-REP: Atomic Structure)
// ============================================================================

mod applicator;
mod diff;
mod directive;
mod error;
mod function;
mod locator;
mod types;

// ============================================================================
// Public Re-exports
// ============================================================================

pub use applicator::PatchEngine;
pub use error::PatchError;
pub use types::{
    ApplyOptions, ApplyResult, Directive, DirectiveKind, DirectiveOutcome, MatchSpan, MatchTier,
    OutcomeStatus, PatchMode, SkipReason,
};

// Parser entry point and marker constants
pub use directive::{
    ADD_AFTER_START, ADD_BEFORE_START, ADD_END, APPEND_END, APPEND_START, FUNCTION_END,
    FUNCTION_SEPARATOR, FUNCTION_START, INSERT_END, INSERT_START, NEW_CONTENT_SEPARATOR,
    PREPEND_END, PREPEND_START, REPLACE_END, REPLACE_SEPARATOR, REPLACE_START, parse_patch,
};

// Locator and function lookup for callers that only need to search
pub use function::{FunctionDef, FunctionLookup, find_function, scan_functions};
pub use locator::{FUZZY_THRESHOLD, is_fuzzy_match, locate, normalize_text, similarity};

// Re-export diff utilities for external use
pub use diff::{diff_stat, generate_unified_diff};
