//! Tests for diff module - unified diff generation.

use omni_patch::{diff_stat, generate_unified_diff};

#[test]
fn test_simple_diff() {
    let old = "line1\nline2\nline3\n";
    let new = "line1\nmodified\nline3\n";

    let diff = generate_unified_diff(old, new, "notes.txt");

    assert!(diff.contains("-line2"));
    assert!(diff.contains("+modified"));
    assert!(diff.contains("+++ b/notes.txt"));
}

#[test]
fn test_no_changes() {
    let content = "same content\n";
    assert!(generate_unified_diff(content, content, "same.txt").is_empty());
}

#[test]
fn test_addition_only() {
    let diff = generate_unified_diff("", "new line\n", "fresh.txt");
    assert!(diff.contains("+new line"));
    assert_eq!(diff_stat("", "new line\n"), (1, 0));
}

#[test]
fn test_context_is_limited() {
    let old: String = (1..=20).map(|i| format!("line{i}\n")).collect();
    let new = old.replace("line10\n", "changed\n");

    let diff = generate_unified_diff(&old, &new, "long.txt");

    assert!(diff.contains(" line7\n"));
    assert!(!diff.contains(" line6\n"));
    assert!(diff.contains(" line13\n"));
    assert!(!diff.contains(" line14\n"));
}
