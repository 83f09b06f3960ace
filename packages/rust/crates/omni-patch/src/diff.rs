//! Diff generation utilities.
//!
//! Provides unified diff output for patch previews using the `similar` crate.

use similar::{ChangeTag, TextDiff};

/// Generate a unified diff between two strings.
///
/// Hunks carry three lines of context and `--- a/<path>` / `+++ b/<path>`
/// headers. Identical inputs produce an empty string.
///
/// # Arguments
/// * `original` - The original content
/// * `modified` - The modified content
/// * `path` - Label used in the file headers
#[must_use]
pub fn generate_unified_diff(original: &str, modified: &str, path: &str) -> String {
    if original == modified {
        return String::new();
    }
    TextDiff::from_lines(original, modified)
        .unified_diff()
        .context_radius(3)
        .header(&format!("a/{path}"), &format!("b/{path}"))
        .to_string()
}

/// Count inserted and deleted lines between two strings.
#[must_use]
pub fn diff_stat(original: &str, modified: &str) -> (usize, usize) {
    let diff = TextDiff::from_lines(original, modified);
    diff.iter_all_changes()
        .fold((0, 0), |(ins, del), change| match change.tag() {
            ChangeTag::Insert => (ins + 1, del),
            ChangeTag::Delete => (ins, del + 1),
            ChangeTag::Equal => (ins, del),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_diff() {
        let original = "line1\nold_text\nline3\n";
        let modified = "line1\nnew_text\nline3\n";
        let diff = generate_unified_diff(original, modified, "src/lib.rs");

        assert!(diff.starts_with("--- a/src/lib.rs\n+++ b/src/lib.rs\n"));
        assert!(diff.contains("@@ -1,3 +1,3 @@"));
        assert!(diff.contains("-old_text"));
        assert!(diff.contains("+new_text"));
    }

    #[test]
    fn test_no_changes() {
        assert!(generate_unified_diff("same\n", "same\n", "x").is_empty());
        assert_eq!(diff_stat("same\n", "same\n"), (0, 0));
    }

    #[test]
    fn test_stat_counts_lines() {
        assert_eq!(diff_stat("a\nb\n", "a\nc\nd\n"), (2, 1));
    }
}
