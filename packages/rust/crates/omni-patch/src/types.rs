//! Core types for directive-driven patching.
//!
//! Defines the data structures used throughout the patch pipeline.

use std::fmt;
use std::num::NonZeroUsize;
use std::ops::Range;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PatchError;

/// Patch mode selected per invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchMode {
    /// `// REPLACE_SECTION` blocks.
    #[default]
    Replace,
    /// `// APPEND` blocks.
    Append,
    /// `// PREPEND` blocks.
    Prepend,
    /// Anchored section replace, add-after, add-before and line insert.
    Smart,
    /// Whole function definitions.
    Functions,
}

impl PatchMode {
    /// Every mode, in CLI listing order.
    pub const ALL: [Self; 5] = [
        Self::Replace,
        Self::Append,
        Self::Prepend,
        Self::Smart,
        Self::Functions,
    ];

    /// Lowercase mode name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Replace => "replace",
            Self::Append => "append",
            Self::Prepend => "prepend",
            Self::Smart => "smart",
            Self::Functions => "functions",
        }
    }
}

impl fmt::Display for PatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PatchMode {
    type Err = PatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| PatchError::UnsupportedMode(wanted.to_string()))
    }
}

/// One parsed edit instruction.
///
/// All text fields are trimmed of leading and trailing whitespace by the
/// parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Directive {
    /// Replace the first occurrence of `old` with `new`.
    Replace {
        /// Text to locate.
        old: String,
        /// Replacement text.
        new: String,
    },
    /// Append `content` at the end of the document.
    Append {
        /// Appended block.
        content: String,
    },
    /// Prepend `content` at the start of the document.
    Prepend {
        /// Prepended block.
        content: String,
    },
    /// Smart mode: replace the section matching `anchor`.
    SmartReplace {
        /// Section to locate.
        anchor: String,
        /// Replacement text.
        replacement: String,
    },
    /// Smart mode: insert after the section matching `anchor`.
    SmartAddAfter {
        /// Section to locate.
        anchor: String,
        /// Inserted text.
        insert: String,
    },
    /// Smart mode: insert before the section matching `anchor`.
    SmartAddBefore {
        /// Section to locate.
        anchor: String,
        /// Inserted text.
        insert: String,
    },
    /// Smart mode: insert a whole line at 1-based position `line`.
    SmartInsertAtLine {
        /// Target line number.
        line: NonZeroUsize,
        /// Inserted text.
        insert: String,
    },
    /// Replace (or add) the definition of function `name`.
    FunctionUpdate {
        /// Function identifier.
        name: String,
        /// Full signature and body.
        definition: String,
    },
}

impl Directive {
    /// Kind tag used in reports and logs.
    #[must_use]
    pub fn kind(&self) -> DirectiveKind {
        match self {
            Self::Replace { .. } => DirectiveKind::Replace,
            Self::Append { .. } => DirectiveKind::Append,
            Self::Prepend { .. } => DirectiveKind::Prepend,
            Self::SmartReplace { .. } => DirectiveKind::SectionReplace,
            Self::SmartAddAfter { .. } => DirectiveKind::AddAfter,
            Self::SmartAddBefore { .. } => DirectiveKind::AddBefore,
            Self::SmartInsertAtLine { .. } => DirectiveKind::InsertAtLine,
            Self::FunctionUpdate { .. } => DirectiveKind::Function,
        }
    }

    /// Mode this directive belongs to.
    #[must_use]
    pub fn mode(&self) -> PatchMode {
        match self {
            Self::Replace { .. } => PatchMode::Replace,
            Self::Append { .. } => PatchMode::Append,
            Self::Prepend { .. } => PatchMode::Prepend,
            Self::SmartReplace { .. }
            | Self::SmartAddAfter { .. }
            | Self::SmartAddBefore { .. }
            | Self::SmartInsertAtLine { .. } => PatchMode::Smart,
            Self::FunctionUpdate { .. } => PatchMode::Functions,
        }
    }

    /// Short human label: the anchor, old text or function name.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Replace { old: text, .. }
            | Self::SmartReplace { anchor: text, .. }
            | Self::SmartAddAfter { anchor: text, .. }
            | Self::SmartAddBefore { anchor: text, .. } => first_line(text),
            Self::Append { content } | Self::Prepend { content } => first_line(content),
            Self::SmartInsertAtLine { line, .. } => format!("line {line}"),
            Self::FunctionUpdate { name, .. } => format!("{name}()"),
        }
    }
}

fn first_line(text: &str) -> String {
    let line = text.lines().next().unwrap_or_default();
    if text.lines().nth(1).is_some() {
        format!("{line} ...")
    } else {
        line.to_string()
    }
}

/// Directive kind tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DirectiveKind {
    /// Replace mode.
    Replace,
    /// Append mode.
    Append,
    /// Prepend mode.
    Prepend,
    /// Smart section replace.
    SectionReplace,
    /// Smart add-after.
    AddAfter,
    /// Smart add-before.
    AddBefore,
    /// Smart line insert.
    InsertAtLine,
    /// Function update.
    Function,
}

impl fmt::Display for DirectiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Replace => "replace",
            Self::Append => "append",
            Self::Prepend => "prepend",
            Self::SectionReplace => "section-replace",
            Self::AddAfter => "add-after",
            Self::AddBefore => "add-before",
            Self::InsertAtLine => "insert-at-line",
            Self::Function => "function",
        })
    }
}

/// Locator tier that produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "tier", rename_all = "lowercase")]
pub enum MatchTier {
    /// Literal substring.
    Exact,
    /// Equal after whitespace normalization.
    Normalized,
    /// Similarity above the fuzzy threshold.
    Fuzzy {
        /// Similarity ratio in `(0.80, 1.0]`.
        ratio: f64,
    },
}

/// Half-open byte range `[start, end)` into the searched document.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MatchSpan {
    /// First byte of the match.
    pub start: usize,
    /// One past the last byte of the match.
    pub end: usize,
    /// How the match was found.
    pub tier: MatchTier,
}

impl MatchSpan {
    /// The span as a `Range`.
    #[must_use]
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// Why a directive was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// Anchor or old text not present in the current document.
    NoMatchFound,
    /// Line number outside `1..=line_count + 1`.
    LineOutOfRange {
        /// Requested line.
        line: usize,
        /// Lines in the document at that point.
        line_count: usize,
    },
    /// A definition header was found but its braces never close.
    UnbalancedFunction,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoMatchFound => f.write_str("no match found"),
            Self::LineOutOfRange { line, line_count } => write!(
                f,
                "line {line} out of range (document has {line_count} lines)"
            ),
            Self::UnbalancedFunction => f.write_str("existing definition has unbalanced braces"),
        }
    }
}

/// Result of one directive.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// Target found and edited; `tier` is set for located edits.
    Applied {
        /// Locator tier, if the directive needed one.
        tier: Option<MatchTier>,
    },
    /// Function was not present and has been appended.
    Added,
    /// Directive contributed nothing.
    Skipped(SkipReason),
}

impl OutcomeStatus {
    /// Whether the directive changed the document.
    #[must_use]
    pub fn is_applied(&self) -> bool {
        !matches!(self, Self::Skipped(_))
    }
}

/// Per-directive report entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirectiveOutcome {
    /// Zero-based position in the directive list.
    pub index: usize,
    /// Directive kind.
    pub kind: DirectiveKind,
    /// Short label (anchor first line, function name, line number).
    pub label: String,
    /// What happened.
    #[serde(flatten)]
    pub status: OutcomeStatus,
}

/// Result of applying a directive list to a document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplyResult {
    /// Input document.
    #[serde(skip)]
    pub original: String,
    /// Output document.
    #[serde(skip)]
    pub document: String,
    /// `true` iff at least one directive applied.
    pub changed: bool,
    /// One entry per directive, ordered by index.
    pub outcomes: Vec<DirectiveOutcome>,
}

impl ApplyResult {
    /// Number of directives that changed the document.
    #[must_use]
    pub fn applied_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.status.is_applied()).count()
    }

    /// Directives that were skipped.
    pub fn skipped(&self) -> impl Iterator<Item = &DirectiveOutcome> {
        self.outcomes.iter().filter(|o| !o.status.is_applied())
    }
}

/// Options for applying directives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyOptions {
    /// Enable the normalized and fuzzy locator tiers.
    pub ignore_whitespace: bool,
}
