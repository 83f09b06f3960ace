//! Tests for directive module - marker block parsing per mode.

use std::num::NonZeroUsize;

use omni_patch::{Directive, PatchError, PatchMode, parse_patch};

fn malformed(patch: &str, mode: PatchMode) -> bool {
    matches!(parse_patch(patch, mode), Err(PatchError::MalformedPatch(_)))
}

#[test]
fn test_replace_blocks_in_declaration_order() {
    let patch = "\
notes before the first block are ignored
// REPLACE_SECTION
alpha
// WITH
ALPHA
// END_REPLACE

// REPLACE_SECTION
  beta
// WITH
  BETA
// END_REPLACE
";
    let directives = parse_patch(patch, PatchMode::Replace).unwrap();
    assert_eq!(
        directives,
        vec![
            Directive::Replace {
                old: "alpha".to_string(),
                new: "ALPHA".to_string()
            },
            Directive::Replace {
                old: "beta".to_string(),
                new: "BETA".to_string()
            },
        ]
    );
}

#[test]
fn test_indented_markers_are_accepted() {
    let patch = "  // APPEND  \n\tline one\n\t// END_APPEND\n";
    let directives = parse_patch(patch, PatchMode::Append).unwrap();
    assert_eq!(
        directives,
        vec![Directive::Append {
            content: "line one".to_string()
        }]
    );
}

#[test]
fn test_missing_end_marker() {
    assert!(malformed(
        "// REPLACE_SECTION\nold\n// WITH\nnew\n",
        PatchMode::Replace
    ));
    assert!(malformed("// PREPEND\nheader\n", PatchMode::Prepend));
}

#[test]
fn test_separator_count_must_be_exact() {
    assert!(malformed(
        "// REPLACE_SECTION\nold only\n// END_REPLACE\n",
        PatchMode::Replace
    ));
    assert!(malformed(
        "// REPLACE_SECTION\na\n// WITH\nb\n// WITH\nc\n// END_REPLACE\n",
        PatchMode::Replace
    ));
}

#[test]
fn test_empty_patch_is_malformed_in_every_mode() {
    for mode in PatchMode::ALL {
        assert!(malformed("", mode), "empty patch accepted in {mode}");
        assert!(
            malformed("just some text\n", mode),
            "marker-less patch accepted in {mode}"
        );
    }
}

#[test]
fn test_smart_kinds_use_fixed_order() {
    let patch = "\
// INSERT_AT_LINE
1
// NEW_CONTENT
top
// END_INSERT
// ADD_BEFORE
target
// NEW_CONTENT
before
// END_ADD
// ADD_AFTER
target
// NEW_CONTENT
after
// END_ADD
// REPLACE_SECTION
old
// WITH
new
// END_REPLACE
";
    let directives = parse_patch(patch, PatchMode::Smart).unwrap();
    assert_eq!(
        directives,
        vec![
            Directive::SmartReplace {
                anchor: "old".to_string(),
                replacement: "new".to_string()
            },
            Directive::SmartAddAfter {
                anchor: "target".to_string(),
                insert: "after".to_string()
            },
            Directive::SmartAddBefore {
                anchor: "target".to_string(),
                insert: "before".to_string()
            },
            Directive::SmartInsertAtLine {
                line: NonZeroUsize::new(1).unwrap(),
                insert: "top".to_string()
            },
        ]
    );
}

#[test]
fn test_insert_line_must_be_positive_integer() {
    for bad in ["0", "-3", "two", ""] {
        let patch = format!("// INSERT_AT_LINE\n{bad}\n// NEW_CONTENT\nx\n// END_INSERT\n");
        assert!(malformed(&patch, PatchMode::Smart), "accepted line `{bad}`");
    }
}

#[test]
fn test_replace_markers_ignored_in_append_mode() {
    let patch = "// REPLACE_SECTION\na\n// WITH\nb\n// END_REPLACE\n";
    assert!(malformed(patch, PatchMode::Append));
}

#[test]
fn test_functions_marker_blocks_win_over_raw_definitions() {
    let patch = "\
// FUNCTION
foo
// CODE
function foo() { return 2; }
// END_FUNCTION

function foo() { return 3; }

function bar(x) {
  return x;
}
";
    let directives = parse_patch(patch, PatchMode::Functions).unwrap();
    assert_eq!(
        directives,
        vec![
            Directive::FunctionUpdate {
                name: "foo".to_string(),
                definition: "function foo() { return 2; }".to_string()
            },
            Directive::FunctionUpdate {
                name: "bar".to_string(),
                definition: "function bar(x) {\n  return x;\n}".to_string()
            },
        ]
    );
}

#[test]
fn test_raw_definitions_only() {
    let patch = "fn first() -> u8 {\n    1\n}\n\nfn second() {}\n";
    let names: Vec<String> = parse_patch(patch, PatchMode::Functions)
        .unwrap()
        .into_iter()
        .filter_map(|d| match d {
            Directive::FunctionUpdate { name, .. } => Some(name),
            _ => None,
        })
        .collect();
    assert_eq!(names, vec!["first", "second"]);
}

#[test]
fn test_function_header_without_name() {
    let patch = "// FUNCTION\n(*&)\n// CODE\n{}\n// END_FUNCTION\n";
    assert!(malformed(patch, PatchMode::Functions));
}

#[test]
fn test_mode_from_str() {
    assert_eq!("SMART".parse::<PatchMode>().unwrap(), PatchMode::Smart);
    assert_eq!(" functions ".parse::<PatchMode>().unwrap(), PatchMode::Functions);
    assert_eq!(
        "rewrite".parse::<PatchMode>(),
        Err(PatchError::UnsupportedMode("rewrite".to_string()))
    );
}
