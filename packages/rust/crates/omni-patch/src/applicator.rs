//! Patch applicator.
//!
//! Applies parsed directives to a document, one mode-specific algorithm per
//! directive kind. Directives run in sequence against the progressively
//! modified document; bytes outside the edited spans are copied unchanged.

use std::ops::Range;

use omni_io::detect_line_ending;

use crate::diff::{diff_stat, generate_unified_diff};
use crate::directive::parse_patch;
use crate::error::PatchError;
use crate::function::{FunctionLookup, find_function};
use crate::locator::locate;
use crate::types::{
    ApplyOptions, ApplyResult, Directive, DirectiveOutcome, OutcomeStatus, PatchMode, SkipReason,
};

/// PatchEngine - directive-driven document rewriting.
///
/// # Example
///
/// ```rust,ignore
/// use omni_patch::{ApplyOptions, PatchEngine, PatchMode};
///
/// let patch = "// REPLACE_SECTION\nbar\n// WITH\nqux\n// END_REPLACE\n";
/// let result = PatchEngine::apply_text("foo\nbar\n", patch, PatchMode::Replace, ApplyOptions::default())?;
/// assert_eq!(result.document, "foo\nqux\n");
/// ```
pub struct PatchEngine;

impl PatchEngine {
    /// Parse `patch` for `mode` and apply it to `document`.
    ///
    /// # Errors
    /// `PatchError::MalformedPatch` when the patch does not parse; the
    /// document is never touched in that case.
    pub fn apply_text(
        document: &str,
        patch: &str,
        mode: PatchMode,
        options: ApplyOptions,
    ) -> Result<ApplyResult, PatchError> {
        let directives = parse_patch(patch, mode)?;
        Ok(Self::apply(document, &directives, options))
    }

    /// Apply `directives` to `document`.
    ///
    /// A directive whose target is missing is recorded as skipped and does not
    /// stop the batch. Prepend lists are applied in reverse so the first
    /// declared block ends up closest to the original content.
    #[must_use]
    pub fn apply(document: &str, directives: &[Directive], options: ApplyOptions) -> ApplyResult {
        let all_prepend = !directives.is_empty()
            && directives
                .iter()
                .all(|d| matches!(d, Directive::Prepend { .. }));
        let order: Vec<usize> = if all_prepend {
            (0..directives.len()).rev().collect()
        } else {
            (0..directives.len()).collect()
        };

        let (modified, mut outcomes) = order.into_iter().fold(
            (document.to_string(), Vec::with_capacity(directives.len())),
            |(current, mut outcomes), index| {
                let directive = &directives[index];
                let (next, status) = apply_one(current, directive, options);
                let outcome = DirectiveOutcome {
                    index,
                    kind: directive.kind(),
                    label: directive.label(),
                    status,
                };
                log_outcome(&outcome);
                outcomes.push(outcome);
                (next, outcomes)
            },
        );
        outcomes.sort_by_key(|o| o.index);

        ApplyResult {
            original: document.to_string(),
            changed: outcomes.iter().any(|o| o.status.is_applied()),
            document: modified,
            outcomes,
        }
    }

    /// Format an apply result for display.
    ///
    /// Returns a human-readable summary with one line per directive and the
    /// unified diff.
    #[must_use]
    pub fn format_result(result: &ApplyResult, path: Option<&str>) -> String {
        let mut output = String::new();
        let label = path.unwrap_or("document");

        output.push_str(&format!("// PATCH: {label}\n"));
        output.push_str(&format!(
            "// Applied: {}/{}\n",
            result.applied_count(),
            result.outcomes.len()
        ));

        for outcome in &result.outcomes {
            let status = match &outcome.status {
                OutcomeStatus::Applied { tier: Some(tier) } => format!("applied ({tier:?})"),
                OutcomeStatus::Applied { tier: None } => "applied".to_string(),
                OutcomeStatus::Added => "added".to_string(),
                OutcomeStatus::Skipped(reason) => format!("skipped: {reason}"),
            };
            output.push_str(&format!(
                "#{} {} \"{}\": {status}\n",
                outcome.index + 1,
                outcome.kind,
                outcome.label
            ));
        }

        if !result.changed {
            output.push_str("[No changes applied]\n");
            return output;
        }

        let (insertions, deletions) = diff_stat(&result.original, &result.document);
        output.push_str(&format!(
            "\n// {insertions} insertion(s)(+), {deletions} deletion(s)(-)\n"
        ));
        output.push_str(&generate_unified_diff(
            &result.original,
            &result.document,
            label,
        ));

        output
    }
}

fn log_outcome(outcome: &DirectiveOutcome) {
    match &outcome.status {
        OutcomeStatus::Skipped(reason) => tracing::warn!(
            directive = outcome.index + 1,
            kind = %outcome.kind,
            target = %outcome.label,
            reason = %reason,
            "directive skipped"
        ),
        OutcomeStatus::Applied { tier } => tracing::debug!(
            directive = outcome.index + 1,
            kind = %outcome.kind,
            tier = ?tier,
            "directive applied"
        ),
        OutcomeStatus::Added => tracing::info!(
            directive = outcome.index + 1,
            target = %outcome.label,
            "function not found; appended new definition"
        ),
    }
}

fn apply_one(document: String, directive: &Directive, options: ApplyOptions) -> (String, OutcomeStatus) {
    let eol = detect_line_ending(&document).as_str();
    match directive {
        Directive::Replace { old: anchor, new: text }
        | Directive::SmartReplace {
            anchor,
            replacement: text,
        } => match locate(&document, anchor, options.ignore_whitespace) {
            Some(span) => (
                splice(&document, span.range(), text),
                OutcomeStatus::Applied {
                    tier: Some(span.tier),
                },
            ),
            None => skipped(document, SkipReason::NoMatchFound),
        },
        Directive::Append { content } => (
            append_block(&document, content, eol),
            OutcomeStatus::Applied { tier: None },
        ),
        Directive::Prepend { content } => (
            format!("{content}{eol}{document}"),
            OutcomeStatus::Applied { tier: None },
        ),
        Directive::SmartAddAfter { anchor, insert } => {
            match locate(&document, anchor, options.ignore_whitespace) {
                Some(span) => {
                    let indent = line_indent(&document, span.start);
                    let text = format!("{eol}{indent}{insert}");
                    (
                        splice(&document, span.end..span.end, &text),
                        OutcomeStatus::Applied {
                            tier: Some(span.tier),
                        },
                    )
                }
                None => skipped(document, SkipReason::NoMatchFound),
            }
        }
        Directive::SmartAddBefore { anchor, insert } => {
            match locate(&document, anchor, options.ignore_whitespace) {
                Some(span) => {
                    let indent = line_indent(&document, span.start);
                    let text = format!("{insert}{eol}{indent}");
                    (
                        splice(&document, span.start..span.start, &text),
                        OutcomeStatus::Applied {
                            tier: Some(span.tier),
                        },
                    )
                }
                None => skipped(document, SkipReason::NoMatchFound),
            }
        }
        Directive::SmartInsertAtLine { line, insert } => {
            match insert_line(&document, line.get(), insert, eol) {
                Ok(next) => (next, OutcomeStatus::Applied { tier: None }),
                Err(reason) => skipped(document, reason),
            }
        }
        Directive::FunctionUpdate { name, definition } => match find_function(&document, name) {
            FunctionLookup::Found(range) => (
                splice(&document, range, definition),
                OutcomeStatus::Applied { tier: None },
            ),
            FunctionLookup::Missing => (
                append_block(&document, definition, eol),
                OutcomeStatus::Added,
            ),
            FunctionLookup::Unbalanced => skipped(document, SkipReason::UnbalancedFunction),
        },
    }
}

fn skipped(document: String, reason: SkipReason) -> (String, OutcomeStatus) {
    (document, OutcomeStatus::Skipped(reason))
}

fn splice(document: &str, range: Range<usize>, text: &str) -> String {
    let mut out = String::with_capacity(document.len() - range.len() + text.len());
    out.push_str(&document[..range.start]);
    out.push_str(text);
    out.push_str(&document[range.end..]);
    out
}

/// Whitespace between the start of the line holding `offset` and `offset`,
/// or empty when anything else precedes it on that line.
fn line_indent(document: &str, offset: usize) -> &str {
    let line_start = document[..offset].rfind('\n').map_or(0, |i| i + 1);
    let prefix = &document[line_start..offset];
    if prefix.chars().all(|c| c == ' ' || c == '\t') {
        prefix
    } else {
        ""
    }
}

/// Append `block` after exactly one blank line; the result ends with `eol`.
fn append_block(document: &str, block: &str, eol: &str) -> String {
    let mut out = String::with_capacity(document.len() + block.len() + eol.len() * 3);
    out.push_str(document);
    if !out.is_empty() {
        if !out.ends_with('\n') {
            out.push_str(eol);
        }
        if !out.ends_with(&format!("{eol}{eol}")) {
            out.push_str(eol);
        }
    }
    out.push_str(block);
    out.push_str(eol);
    out
}

/// Insert `text` as a whole line at 1-based `line`.
///
/// Existing bytes, including a missing final newline, are preserved; only the
/// new line and one terminator are added.
fn insert_line(document: &str, line: usize, text: &str, eol: &str) -> Result<String, SkipReason> {
    let mut starts: Vec<usize> = Vec::new();
    if !document.is_empty() {
        starts.push(0);
        starts.extend(
            document
                .match_indices('\n')
                .map(|(i, _)| i + 1)
                .filter(|&i| i < document.len()),
        );
    }
    let line_count = starts.len();

    if line == 0 || line > line_count + 1 {
        return Err(SkipReason::LineOutOfRange { line, line_count });
    }

    if let Some(&offset) = starts.get(line - 1) {
        return Ok(splice(document, offset..offset, &format!("{text}{eol}")));
    }

    // line == line_count + 1
    if document.is_empty() {
        Ok(text.to_string())
    } else if document.ends_with('\n') {
        Ok(format!("{document}{text}{eol}"))
    } else {
        Ok(format!("{document}{eol}{text}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_block_separation() {
        assert_eq!(append_block("a\n", "b", "\n"), "a\n\nb\n");
        assert_eq!(append_block("a", "b", "\n"), "a\n\nb\n");
        assert_eq!(append_block("a\n\n", "b", "\n"), "a\n\nb\n");
        assert_eq!(append_block("", "b", "\n"), "b\n");
    }

    #[test]
    fn test_insert_line_bounds() {
        let doc = "one\ntwo\n";
        assert_eq!(insert_line(doc, 1, "zero", "\n").unwrap(), "zero\none\ntwo\n");
        assert_eq!(insert_line(doc, 3, "three", "\n").unwrap(), "one\ntwo\nthree\n");
        assert_eq!(
            insert_line(doc, 4, "x", "\n"),
            Err(SkipReason::LineOutOfRange {
                line: 4,
                line_count: 2
            })
        );
    }

    #[test]
    fn test_insert_line_without_trailing_newline() {
        assert_eq!(insert_line("a\nb", 3, "c", "\n").unwrap(), "a\nb\nc");
        assert_eq!(insert_line("", 1, "c", "\n").unwrap(), "c");
    }

    #[test]
    fn test_insert_line_crlf() {
        assert_eq!(
            insert_line("a\r\nb\r\n", 2, "x", "\r\n").unwrap(),
            "a\r\nx\r\nb\r\n"
        );
    }

    #[test]
    fn test_line_indent() {
        let doc = "fn f() {\n    call();\n}\n";
        let offset = doc.find("call").unwrap();
        assert_eq!(line_indent(doc, offset), "    ");
        assert_eq!(line_indent(doc, doc.find("f()").unwrap()), "");
    }
}
