//! Tests for omni-io crate.
//!
//! Integration tests for safe file I/O operations.

pub mod test_backup;
pub mod test_detect;
pub mod test_sync;
