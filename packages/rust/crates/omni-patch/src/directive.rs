//! Directive parser.
//!
//! Splits raw patch text into typed [`Directive`] records. Every marker must
//! sit on its own line; surrounding spaces and tabs are tolerated.
//!
//! ```text
//! // REPLACE_SECTION          // ADD_AFTER              // FUNCTION
//! <old>                       <anchor>                  <name or signature>
//! // WITH                     // NEW_CONTENT            // CODE
//! <new>                       <insert>                  <definition>
//! // END_REPLACE              // END_ADD                // END_FUNCTION
//! ```
//!
//! Smart mode also accepts `// ADD_BEFORE ... // NEW_CONTENT ... // END_ADD`
//! and `// INSERT_AT_LINE <n> // NEW_CONTENT ... // END_INSERT` (the line
//! number on its own line), plus the replace blocks above.

use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::PatchError;
use crate::function::{FunctionLookup, find_function, scan_functions, signature_name};
use crate::types::{Directive, PatchMode};

/// `// REPLACE_SECTION` start marker.
pub const REPLACE_START: &str = "// REPLACE_SECTION";
/// `// WITH` separator.
pub const REPLACE_SEPARATOR: &str = "// WITH";
/// `// END_REPLACE` end marker.
pub const REPLACE_END: &str = "// END_REPLACE";
/// `// APPEND` start marker.
pub const APPEND_START: &str = "// APPEND";
/// `// END_APPEND` end marker.
pub const APPEND_END: &str = "// END_APPEND";
/// `// PREPEND` start marker.
pub const PREPEND_START: &str = "// PREPEND";
/// `// END_PREPEND` end marker.
pub const PREPEND_END: &str = "// END_PREPEND";
/// `// ADD_AFTER` start marker.
pub const ADD_AFTER_START: &str = "// ADD_AFTER";
/// `// ADD_BEFORE` start marker.
pub const ADD_BEFORE_START: &str = "// ADD_BEFORE";
/// `// NEW_CONTENT` separator shared by the smart insert kinds.
pub const NEW_CONTENT_SEPARATOR: &str = "// NEW_CONTENT";
/// `// END_ADD` end marker.
pub const ADD_END: &str = "// END_ADD";
/// `// INSERT_AT_LINE` start marker.
pub const INSERT_START: &str = "// INSERT_AT_LINE";
/// `// END_INSERT` end marker.
pub const INSERT_END: &str = "// END_INSERT";
/// `// FUNCTION` start marker.
pub const FUNCTION_START: &str = "// FUNCTION";
/// `// CODE` separator.
pub const FUNCTION_SEPARATOR: &str = "// CODE";
/// `// END_FUNCTION` end marker.
pub const FUNCTION_END: &str = "// END_FUNCTION";

/// Start / optional separator / end marker triple of one directive kind.
#[derive(Debug, Clone, Copy)]
struct BlockSyntax {
    start: &'static str,
    separator: Option<&'static str>,
    end: &'static str,
}

const REPLACE_SYNTAX: BlockSyntax = BlockSyntax {
    start: REPLACE_START,
    separator: Some(REPLACE_SEPARATOR),
    end: REPLACE_END,
};
const APPEND_SYNTAX: BlockSyntax = BlockSyntax {
    start: APPEND_START,
    separator: None,
    end: APPEND_END,
};
const PREPEND_SYNTAX: BlockSyntax = BlockSyntax {
    start: PREPEND_START,
    separator: None,
    end: PREPEND_END,
};
const ADD_AFTER_SYNTAX: BlockSyntax = BlockSyntax {
    start: ADD_AFTER_START,
    separator: Some(NEW_CONTENT_SEPARATOR),
    end: ADD_END,
};
const ADD_BEFORE_SYNTAX: BlockSyntax = BlockSyntax {
    start: ADD_BEFORE_START,
    separator: Some(NEW_CONTENT_SEPARATOR),
    end: ADD_END,
};
const INSERT_SYNTAX: BlockSyntax = BlockSyntax {
    start: INSERT_START,
    separator: Some(NEW_CONTENT_SEPARATOR),
    end: INSERT_END,
};
const FUNCTION_SYNTAX: BlockSyntax = BlockSyntax {
    start: FUNCTION_START,
    separator: Some(FUNCTION_SEPARATOR),
    end: FUNCTION_END,
};

static CRLF: LazyLock<Regex> = LazyLock::new(|| compile_regex(r"\r\n?"));

fn compile_regex(pattern: &str) -> Regex {
    match Regex::new(pattern) {
        Ok(regex) => regex,
        Err(_compile_err) => match Regex::new(r"$^") {
            Ok(fallback) => fallback,
            Err(fallback_err) => panic!("hardcoded fallback regex must compile: {fallback_err}"),
        },
    }
}

/// Whole-line matcher for one marker; consumes the line terminator.
fn marker_regex(marker: &str) -> Regex {
    compile_regex(&format!(
        r"(?m)^[ \t]*{}[ \t]*(?:\n|\z)",
        regex::escape(marker)
    ))
}

/// One parsed block: trimmed parts plus the byte range it covered.
#[derive(Debug)]
struct Block {
    parts: Vec<String>,
    span: Range<usize>,
}

/// Parse `patch` into the directives of `mode`.
///
/// # Errors
/// `PatchError::MalformedPatch` when a block misses its end marker, a body
/// has the wrong number of separator-delimited parts, a line number is not a
/// positive integer, a function header has no name, or the patch contains no
/// directives for the mode.
pub fn parse_patch(patch: &str, mode: PatchMode) -> Result<Vec<Directive>, PatchError> {
    let text = CRLF.replace_all(patch, "\n");
    let directives = match mode {
        PatchMode::Replace => parse_replace(&text)?,
        PatchMode::Append => extract_blocks(&text, APPEND_SYNTAX)?
            .into_iter()
            .map(|block| Directive::Append {
                content: take_part(block.parts, 0),
            })
            .collect(),
        PatchMode::Prepend => extract_blocks(&text, PREPEND_SYNTAX)?
            .into_iter()
            .map(|block| Directive::Prepend {
                content: take_part(block.parts, 0),
            })
            .collect(),
        PatchMode::Smart => parse_smart(&text)?,
        PatchMode::Functions => parse_functions(&text)?,
    };

    if directives.is_empty() {
        return Err(PatchError::MalformedPatch(format!(
            "no {mode} directives found in patch"
        )));
    }
    tracing::debug!(mode = %mode, count = directives.len(), "parsed patch");
    Ok(directives)
}

fn parse_replace(text: &str) -> Result<Vec<Directive>, PatchError> {
    Ok(extract_blocks(text, REPLACE_SYNTAX)?
        .into_iter()
        .map(|block| {
            let mut parts = block.parts.into_iter();
            Directive::Replace {
                old: parts.next().unwrap_or_default(),
                new: parts.next().unwrap_or_default(),
            }
        })
        .collect())
}

/// Smart kinds are extracted independently and concatenated in the fixed
/// order section-replace, add-after, add-before, line-insert.
fn parse_smart(text: &str) -> Result<Vec<Directive>, PatchError> {
    let mut directives = Vec::new();

    for block in extract_blocks(text, REPLACE_SYNTAX)? {
        let mut parts = block.parts.into_iter();
        directives.push(Directive::SmartReplace {
            anchor: parts.next().unwrap_or_default(),
            replacement: parts.next().unwrap_or_default(),
        });
    }
    for block in extract_blocks(text, ADD_AFTER_SYNTAX)? {
        let mut parts = block.parts.into_iter();
        directives.push(Directive::SmartAddAfter {
            anchor: parts.next().unwrap_or_default(),
            insert: parts.next().unwrap_or_default(),
        });
    }
    for block in extract_blocks(text, ADD_BEFORE_SYNTAX)? {
        let mut parts = block.parts.into_iter();
        directives.push(Directive::SmartAddBefore {
            anchor: parts.next().unwrap_or_default(),
            insert: parts.next().unwrap_or_default(),
        });
    }
    for (idx, block) in extract_blocks(text, INSERT_SYNTAX)?.into_iter().enumerate() {
        let mut parts = block.parts.into_iter();
        let raw_line = parts.next().unwrap_or_default();
        let line = raw_line
            .parse::<usize>()
            .ok()
            .and_then(NonZeroUsize::new)
            .ok_or_else(|| {
                PatchError::MalformedPatch(format!(
                    "`{INSERT_START}` block #{} needs a positive line number, got `{raw_line}`",
                    idx + 1
                ))
            })?;
        directives.push(Directive::SmartInsertAtLine {
            line,
            insert: parts.next().unwrap_or_default(),
        });
    }

    Ok(directives)
}

/// Marker blocks first, then raw definitions found outside any block whose
/// name no marker block already claims.
fn parse_functions(text: &str) -> Result<Vec<Directive>, PatchError> {
    let blocks = extract_blocks(text, FUNCTION_SYNTAX)?;

    let mut remainder = String::with_capacity(text.len());
    let mut cursor = 0;
    for block in &blocks {
        remainder.push_str(&text[cursor..block.span.start]);
        remainder.push('\n');
        cursor = block.span.end;
    }
    remainder.push_str(&text[cursor..]);

    let mut directives = Vec::with_capacity(blocks.len());
    let mut claimed = HashSet::new();
    for (idx, block) in blocks.into_iter().enumerate() {
        let mut parts = block.parts.into_iter();
        let header = parts.next().unwrap_or_default();
        let code = parts.next().unwrap_or_default();
        let name = signature_name(&header).ok_or_else(|| {
            PatchError::MalformedPatch(format!(
                "`{FUNCTION_START}` block #{} has no function name, got `{header}`",
                idx + 1
            ))
        })?;
        let definition = wrap_body(&header, &name, code);
        claimed.insert(name.clone());
        directives.push(Directive::FunctionUpdate { name, definition });
    }

    for def in scan_functions(&remainder) {
        if claimed.contains(&def.name) {
            tracing::debug!(name = %def.name, "raw definition shadowed by marker block");
            continue;
        }
        claimed.insert(def.name.clone());
        directives.push(Directive::FunctionUpdate {
            name: def.name,
            definition: remainder[def.span].trim().to_string(),
        });
    }

    Ok(directives)
}

/// A `// CODE` part that is only a body under a signature header gets wrapped
/// as `<signature> {\n<body>\n}`; a full definition is kept as written.
fn wrap_body(header: &str, name: &str, code: String) -> String {
    let header_is_signature = header != name;
    let code_is_definition = !matches!(find_function(&code, name), FunctionLookup::Missing);
    if header_is_signature && !code_is_definition {
        format!("{header} {{\n{code}\n}}")
    } else {
        code
    }
}

fn take_part(parts: Vec<String>, idx: usize) -> String {
    parts.into_iter().nth(idx).unwrap_or_default()
}

/// Split `text` on the start marker and validate every fragment.
///
/// The fragment before the first start marker is discarded. Each later
/// fragment is cut at its first end marker (text after it is ignored) and the
/// body must split on the separator into exactly two parts.
fn extract_blocks(text: &str, syntax: BlockSyntax) -> Result<Vec<Block>, PatchError> {
    let start_re = marker_regex(syntax.start);
    let end_re = marker_regex(syntax.end);
    let separator_re = syntax.separator.map(marker_regex);
    let expected_parts = if syntax.separator.is_some() { 2 } else { 1 };

    let starts: Vec<_> = start_re.find_iter(text).collect();
    let mut blocks = Vec::with_capacity(starts.len());

    for (idx, start) in starts.iter().enumerate() {
        let fragment_end = starts.get(idx + 1).map_or(text.len(), |next| next.start());
        let fragment = &text[start.end()..fragment_end];

        let Some(end) = end_re.find(fragment) else {
            return Err(PatchError::MalformedPatch(format!(
                "`{}` block #{} is missing `{}`",
                syntax.start,
                idx + 1,
                syntax.end
            )));
        };
        let body = &fragment[..end.start()];

        let parts: Vec<String> = match &separator_re {
            Some(re) => re.split(body).map(|p| p.trim().to_string()).collect(),
            None => vec![body.trim().to_string()],
        };
        if parts.len() != expected_parts {
            let separator = syntax.separator.unwrap_or_default();
            return Err(PatchError::MalformedPatch(format!(
                "`{}` block #{} needs exactly one `{separator}` line, found {}",
                syntax.start,
                idx + 1,
                parts.len().saturating_sub(1)
            )));
        }

        blocks.push(Block {
            parts,
            span: start.start()..start.end() + end.end(),
        });
    }

    Ok(blocks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_must_be_whole_line() {
        let patch = "// APPEND_ALL\nnot a block\n// END_APPEND\n";
        assert!(matches!(
            parse_patch(patch, PatchMode::Append),
            Err(PatchError::MalformedPatch(_))
        ));
    }

    #[test]
    fn test_text_after_end_marker_is_ignored() {
        let patch = "// APPEND\nx\n// END_APPEND\ntrailing notes\n";
        let directives = parse_patch(patch, PatchMode::Append).unwrap();
        assert_eq!(
            directives,
            vec![Directive::Append {
                content: "x".to_string()
            }]
        );
    }

    #[test]
    fn test_crlf_patch() {
        let patch = "// REPLACE_SECTION\r\nold\r\n// WITH\r\nnew\r\n// END_REPLACE\r\n";
        let directives = parse_patch(patch, PatchMode::Replace).unwrap();
        assert_eq!(
            directives,
            vec![Directive::Replace {
                old: "old".to_string(),
                new: "new".to_string()
            }]
        );
    }

    #[test]
    fn test_body_wrapped_under_signature() {
        let patch = "// FUNCTION\nfunction foo(a)\n// CODE\nreturn a;\n// END_FUNCTION\n";
        let directives = parse_patch(patch, PatchMode::Functions).unwrap();
        assert_eq!(
            directives,
            vec![Directive::FunctionUpdate {
                name: "foo".to_string(),
                definition: "function foo(a) {\nreturn a;\n}".to_string()
            }]
        );
    }
}
