//! Function definition lookup.
//!
//! A definition is an optional prefix (`function`, `pub fn`, `static int`, ...)
//! at the start of a line, an identifier, optional generics, a parenthesized
//! parameter list without nested parentheses and an opening brace on the same
//! line as the closing parenthesis. The body ends at the matching closing
//! brace, found by depth counting that skips `//` and `/* */` comments,
//! double-quoted strings and the `'{'` / `'}'` character literals.
//!
//! This is a heuristic, not a parser: single-quoted strings, raw strings and
//! template literals containing braces can still throw the count off.

use std::ops::Range;
use std::sync::LazyLock;

use memchr::memchr;
use regex::Regex;

/// Identifier immediately preceding a parameter list, used to pull a name out
/// of a signature line such as `pub fn foo(x: u8)`.
static SIGNATURE_NAME: LazyLock<Regex> =
    LazyLock::new(|| compile_regex(r"([A-Za-z_][A-Za-z0-9_]*)[ \t]*(?:<[^(){};]*>)?[ \t]*\("));

static ANY_DEFINITION: LazyLock<Regex> =
    LazyLock::new(|| compile_regex(&header_pattern(r"[A-Za-z_][A-Za-z0-9_]*")));

/// Control-flow keywords that look like `name(...) {` but never define anything.
const NOT_FUNCTION_NAMES: &[&str] = &[
    "if", "for", "while", "switch", "catch", "match", "return", "foreach", "elif", "until", "with",
    "lock", "using", "synchronized",
];

/// Keywords that turn the rest of the line into an expression: a prefix
/// containing one of these means `name(...)` is a call, not a definition.
const CALL_CONTEXT_KEYWORDS: &[&str] = &["else", "await", "new", "throw", "yield", "case", "in"];

fn compile_regex(pattern: &str) -> Regex {
    match Regex::new(pattern) {
        Ok(regex) => regex,
        Err(_compile_err) => match Regex::new(r"$^") {
            Ok(fallback) => fallback,
            Err(fallback_err) => panic!("hardcoded fallback regex must compile: {fallback_err}"),
        },
    }
}

fn header_pattern(name: &str) -> String {
    format!(
        r"(?m)^[ \t]*(?P<def>(?P<prefix>[A-Za-z_][A-Za-z0-9_:<>&*,\[\] \t]*?[ \t]+)?(?P<name>{name})[ \t]*(?:<[^(){{}};]*>)?[ \t]*\([^()]*\)[^{{}};\n]*\{{)"
    )
}

/// A function definition found in some text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDef {
    /// Function identifier.
    pub name: String,
    /// Byte range from the first character of the signature through the
    /// closing brace (leading indentation excluded).
    pub span: Range<usize>,
}

/// Result of looking up one function by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FunctionLookup {
    /// Definition located.
    Found(Range<usize>),
    /// Header found, but the body never closes.
    Unbalanced,
    /// No definition with that name.
    Missing,
}

/// Find the first definition of `name` in `text`.
#[must_use]
pub fn find_function(text: &str, name: &str) -> FunctionLookup {
    let Ok(re) = Regex::new(&header_pattern(&regex::escape(name))) else {
        return FunctionLookup::Missing;
    };
    let mut unbalanced = false;
    for caps in re.captures_iter(text) {
        let Some(def) = caps.name("def") else {
            continue;
        };
        if is_call_site(&caps) {
            continue;
        }
        match matching_brace(text, def.end() - 1) {
            Some(end) => return FunctionLookup::Found(def.start()..end),
            None => unbalanced = true,
        }
    }
    if unbalanced {
        FunctionLookup::Unbalanced
    } else {
        FunctionLookup::Missing
    }
}

/// Scan `text` for every top-level function definition, in order.
///
/// After a definition is found the scan resumes past its closing brace, so
/// nested functions and control-flow blocks inside a body are not reported.
#[must_use]
pub fn scan_functions(text: &str) -> Vec<FunctionDef> {
    let mut defs = Vec::new();
    let mut pos = 0;
    while pos < text.len() {
        let Some(caps) = ANY_DEFINITION.captures_at(text, pos) else {
            break;
        };
        let (Some(def), Some(name)) = (caps.name("def"), caps.name("name")) else {
            break;
        };
        if NOT_FUNCTION_NAMES.contains(&name.as_str()) || is_call_site(&caps) {
            pos = def.end();
            continue;
        }
        match matching_brace(text, def.end() - 1) {
            Some(end) => {
                defs.push(FunctionDef {
                    name: name.as_str().to_string(),
                    span: def.start()..end,
                });
                pos = end;
            }
            None => {
                tracing::debug!(name = name.as_str(), "function body never closes; skipping");
                pos = def.end();
            }
        }
    }
    defs
}

/// `if valid(x) {`, `match compute(x) {` and the like: the name is called
/// from a control-flow header rather than defined.
fn is_call_site(caps: &regex::Captures<'_>) -> bool {
    caps.name("prefix").is_some_and(|prefix| {
        prefix
            .as_str()
            .split(|c: char| c != '_' && !c.is_ascii_alphanumeric())
            .any(|token| {
                NOT_FUNCTION_NAMES.contains(&token) || CALL_CONTEXT_KEYWORDS.contains(&token)
            })
    })
}

/// Extract the function name from a marker header: either a bare identifier
/// or a signature such as `function foo(a, b)`.
#[must_use]
pub fn signature_name(header: &str) -> Option<String> {
    let header = header.trim();
    if is_identifier(header) {
        return Some(header.to_string());
    }
    SIGNATURE_NAME
        .captures_iter(header)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .find(|name| !NOT_FUNCTION_NAMES.contains(name))
        .map(str::to_string)
}

fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    matches!(chars.next(), Some(c) if c == '_' || c.is_ascii_alphabetic())
        && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

/// Byte offset one past the brace that closes the one at `open`.
fn matching_brace(text: &str, open: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    if bytes.get(open) != Some(&b'{') {
        return None;
    }
    let mut depth = 0usize;
    let mut i = open;
    while i < bytes.len() {
        match bytes[i] {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                i = memchr(b'\n', &bytes[i..]).map_or(bytes.len(), |p| p + i);
                continue;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i = find_from(text, "*/", i + 2).map_or(bytes.len(), |p| p + 2);
                continue;
            }
            b'"' => {
                i = skip_string(bytes, i + 1);
                continue;
            }
            b'\''
                if matches!(bytes.get(i + 1), Some(b'{' | b'}'))
                    && bytes.get(i + 2) == Some(&b'\'') =>
            {
                i += 3;
                continue;
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Index just past the closing quote of a string whose body starts at `i`.
fn skip_string(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'"' => return i + 1,
            b'\n' => return i,
            _ => i += 1,
        }
    }
    bytes.len()
}

fn find_from(text: &str, needle: &str, from: usize) -> Option<usize> {
    text.get(from..)?.find(needle).map(|p| p + from)
}
