//! Section locator.
//!
//! Finds the span of a document that a piece of reference text refers to:
//!
//! 1. **Exact**: first literal occurrence.
//! 2. **Normalized**: tabs expanded to four spaces, line endings unified and
//!    every line trimmed; the first window of document lines equal to the
//!    reference lines wins.
//! 3. **Fuzzy**: the window with the highest LCS similarity ratio, accepted
//!    only above [`FUZZY_THRESHOLD`].
//!
//! Tiers 2 and 3 run only when whitespace is ignored.

use std::collections::HashMap;
use std::ops::Range;

use crate::types::{MatchSpan, MatchTier};

/// A fuzzy candidate must score strictly above this ratio.
pub const FUZZY_THRESHOLD: f64 = 0.80;

const TAB_EXPANSION: &str = "    ";

/// Locate `reference` in `document`.
///
/// Returns `None` when the reference is blank or no tier matches. Offsets are
/// byte offsets into `document`.
#[must_use]
pub fn locate(document: &str, reference: &str, ignore_whitespace: bool) -> Option<MatchSpan> {
    if reference.trim().is_empty() {
        return None;
    }

    if let Some(start) = document.find(reference) {
        return Some(MatchSpan {
            start,
            end: start + reference.len(),
            tier: MatchTier::Exact,
        });
    }

    if !ignore_whitespace {
        return None;
    }

    let wanted: Vec<String> = split_lines(reference.trim())
        .into_iter()
        .map(normalize_line)
        .collect();
    let lines = DocumentLines::new(document);
    let width = wanted.len();
    if lines.len() < width {
        return None;
    }

    if let Some(first) = (0..=lines.len() - width).find(|&i| lines.normalized[i..i + width] == wanted[..]) {
        return Some(lines.span(document, first, width, MatchTier::Normalized));
    }

    let reference_chars: Vec<char> = wanted.join("\n").chars().collect();
    let lcs = LcsTable::new(&reference_chars);
    let mut best: Option<(usize, f64)> = None;
    for i in 0..=lines.len() - width {
        let window_chars: Vec<char> = lines.normalized[i..i + width].join("\n").chars().collect();
        let floor = best.map_or(FUZZY_THRESHOLD, |(_, ratio)| ratio.max(FUZZY_THRESHOLD));
        if ratio_upper_bound(reference_chars.len(), window_chars.len()) <= floor {
            continue;
        }
        let ratio = lcs.ratio(&window_chars);
        if ratio > floor {
            best = Some((i, ratio));
        }
    }

    best.map(|(first, ratio)| {
        tracing::debug!(ratio, line = first + 1, "fuzzy match accepted");
        lines.span(document, first, width, MatchTier::Fuzzy { ratio })
    })
}

/// Whether a similarity ratio clears the fuzzy threshold.
#[must_use]
pub fn is_fuzzy_match(ratio: f64) -> bool {
    ratio > FUZZY_THRESHOLD
}

/// LCS similarity ratio `2·M / (|a| + |b|)` over characters, in `[0, 1]`.
///
/// Two empty strings are identical (`1.0`).
#[must_use]
pub fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    char_ratio(&a, &b)
}

fn char_ratio(a: &[char], b: &[char]) -> f64 {
    LcsTable::new(a).ratio(b)
}

/// Bit-parallel LCS length against a fixed reference (Hyyro's bit-vector
/// formulation): one bit per reference character, 64 per word, so each
/// character of the other string costs `len / 64` word operations.
struct LcsTable {
    len: usize,
    words: usize,
    masks: HashMap<char, Vec<u64>>,
}

impl LcsTable {
    fn new(reference: &[char]) -> Self {
        let words = reference.len().div_ceil(64);
        let mut masks: HashMap<char, Vec<u64>> = HashMap::new();
        for (i, &c) in reference.iter().enumerate() {
            masks.entry(c).or_insert_with(|| vec![0; words])[i / 64] |= 1u64 << (i % 64);
        }
        Self {
            len: reference.len(),
            words,
            masks,
        }
    }

    /// Length of the longest common subsequence of the reference and `other`.
    fn lcs_len(&self, other: &[char]) -> usize {
        // Zero bits in `v` mark reference positions consumed by the LCS.
        let mut v = vec![u64::MAX; self.words];
        for c in other {
            let Some(mask) = self.masks.get(c) else {
                continue;
            };
            let mut carry = false;
            for (word, &m) in v.iter_mut().zip(mask) {
                let u = *word & m;
                let (sum, c1) = word.overflowing_add(u);
                let (sum, c2) = sum.overflowing_add(u64::from(carry));
                carry = c1 || c2;
                *word = sum | (*word & !m);
            }
        }

        let tail = self.len % 64;
        v.iter()
            .enumerate()
            .map(|(i, &word)| {
                let live = if i + 1 == self.words && tail != 0 {
                    (1u64 << tail) - 1
                } else {
                    u64::MAX
                };
                (!word & live).count_ones() as usize
            })
            .sum()
    }

    /// `2 * LCS / (|reference| + |other|)`; two empty strings score `1.0`.
    #[allow(clippy::cast_precision_loss)]
    fn ratio(&self, other: &[char]) -> f64 {
        let total = self.len + other.len();
        if total == 0 {
            return 1.0;
        }
        (2 * self.lcs_len(other)) as f64 / total as f64
    }
}

/// Best ratio two strings of these lengths could reach.
#[allow(clippy::cast_precision_loss)]
fn ratio_upper_bound(a_len: usize, b_len: usize) -> f64 {
    let total = a_len + b_len;
    if total == 0 {
        return 1.0;
    }
    (2 * a_len.min(b_len)) as f64 / total as f64
}

/// Normalize one line: tabs to four spaces, surrounding whitespace stripped.
#[must_use]
pub fn normalize_line(line: &str) -> String {
    line.replace('\t', TAB_EXPANSION).trim().to_string()
}

/// Normalize a whole text block line by line, joined with `\n`.
#[must_use]
pub fn normalize_text(text: &str) -> String {
    split_lines(text)
        .into_iter()
        .map(normalize_line)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Split on `\r\n`, `\n` or a lone `\r`. A trailing terminator does not open
/// an extra empty line.
fn split_lines(text: &str) -> Vec<&str> {
    line_ranges(text).into_iter().map(|r| &text[r]).collect()
}

/// Content ranges (terminators excluded) of every line in `text`.
fn line_ranges(text: &str) -> Vec<Range<usize>> {
    let bytes = text.as_bytes();
    let mut ranges = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\n' => {
                ranges.push(start..i);
                i += 1;
                start = i;
            }
            b'\r' => {
                ranges.push(start..i);
                i += if bytes.get(i + 1) == Some(&b'\n') { 2 } else { 1 };
                start = i;
            }
            _ => i += 1,
        }
    }
    if start < bytes.len() {
        ranges.push(start..bytes.len());
    }
    ranges
}

/// Document lines with original offsets and their normalized form.
struct DocumentLines {
    ranges: Vec<Range<usize>>,
    normalized: Vec<String>,
}

impl DocumentLines {
    fn new(document: &str) -> Self {
        let ranges = line_ranges(document);
        let normalized = ranges
            .iter()
            .map(|r| normalize_line(&document[r.clone()]))
            .collect();
        Self { ranges, normalized }
    }

    fn len(&self) -> usize {
        self.ranges.len()
    }

    /// Span of lines `first..first + width`, narrowed to its non-whitespace
    /// content so leading indentation and trailing blanks stay outside.
    fn span(&self, document: &str, first: usize, width: usize, tier: MatchTier) -> MatchSpan {
        let outer = self.ranges[first].start..self.ranges[first + width - 1].end;
        let slice = &document[outer.clone()];
        let trimmed_start = slice.len() - slice.trim_start().len();
        let trimmed_end = slice.trim_end().len();
        let (start, end) = if trimmed_end <= trimmed_start {
            (outer.start, outer.start)
        } else {
            (outer.start + trimmed_start, outer.start + trimmed_end)
        };
        MatchSpan { start, end, tier }
    }
}
