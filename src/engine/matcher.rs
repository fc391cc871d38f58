//! Delimiter matching
//!
//! A pattern's `open`, `close` and `escape` are each a [`MatcherSpec`]: a
//! literal, a regular expression, or a custom callback. [`try_match`]
//! resolves a spec against a line in one of two [`MatchMode`]s:
//!
//! - `Search` - earliest match at or after a position
//! - `Suffix` - a match that ends exactly at a position (escape detection)
//!
//! [`find_unescaped`] layers escape handling on top: a match immediately
//! preceded by the escape spec is skipped and the search resumes after it.
//! Only one escape occurrence is looked back at, so escapes are never
//! themselves escaped (`\\"` still counts as an escaped quote).

use super::error::TokenizeError;
use super::regex_cache;
use memchr::memmem;
use std::fmt;
use std::rc::Rc;

/// Grammar-specific values available to callbacks and hooks
pub type Scratch = hashbrown::HashMap<String, serde_json::Value, ahash::RandomState>;

/// How a spec is resolved against a line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchMode {
    /// First match at or after the position
    Search,
    /// Match ending exactly at the position
    Suffix,
}

/// A successful match
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    /// Byte offset where the match starts
    pub position: usize,
    /// Matched text; `None` for zero-width matches
    pub text: Option<String>,
}

impl Match {
    /// Create a match, folding empty text into `None`
    pub fn new(position: usize, text: Option<String>) -> Self {
        Self {
            position,
            text: text.filter(|t| !t.is_empty()),
        }
    }

    /// Length of the matched text in bytes
    #[inline]
    pub fn len(&self) -> usize {
        self.text.as_ref().map_or(0, String::len)
    }

    /// Whether the match is zero-width
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Byte offset just past the match
    #[inline]
    pub fn end(&self) -> usize {
        self.position + self.len()
    }
}

/// Read-only view of the tokenizer state given to custom matchers
#[derive(Debug, Clone, Copy)]
pub struct ScanContext<'a> {
    /// Un-styled text on this line since the last transition
    pub text_before: &'a str,
    /// Whether earlier lines held only whitespace since the last transition
    pub blank_before_line: bool,
    /// Grammar-specific flags
    pub scratch: &'a Scratch,
}

impl ScanContext<'_> {
    /// Whether `key` holds `true` in the scratch map
    pub fn flag(&self, key: &str) -> bool {
        matches!(self.scratch.get(key), Some(serde_json::Value::Bool(true)))
    }

    /// Whether only whitespace separates the last transition from `at`
    ///
    /// `from` is where the current search started; text between it and the
    /// last transition on this line is already in `text_before`.
    pub fn only_whitespace_before(&self, line: &str, from: usize, at: usize) -> bool {
        let skipped = line.get(from..at).unwrap_or("");
        self.blank_before_line
            && self.text_before.chars().all(char::is_whitespace)
            && skipped.chars().all(char::is_whitespace)
    }
}

/// Callback matcher for context-sensitive delimiters
pub trait CustomMatcher {
    /// Find a match in `line` relative to `position`
    ///
    /// Called directly in both modes; the callback owns the meaning of
    /// `mode`. In `Search` mode the result must not start before `position`.
    fn find(
        &self,
        line: &str,
        position: usize,
        mode: MatchMode,
        ctx: &ScanContext<'_>,
    ) -> Option<Match>;

    /// Human-readable description used in debug output
    fn description(&self) -> &str;
}

/// [`CustomMatcher`] backed by a closure
pub struct FnMatcher<F> {
    description: String,
    func: F,
}

impl<F> CustomMatcher for FnMatcher<F>
where
    F: Fn(&str, usize, MatchMode, &ScanContext<'_>) -> Option<Match>,
{
    fn find(
        &self,
        line: &str,
        position: usize,
        mode: MatchMode,
        ctx: &ScanContext<'_>,
    ) -> Option<Match> {
        (self.func)(line, position, mode, ctx)
    }

    fn description(&self) -> &str {
        &self.description
    }
}

/// Regular expression source plus flags
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RegexSpec {
    /// Pattern source, anchors included
    pub source: String,
    /// Case-insensitive matching
    pub ignore_case: bool,
}

/// Open/close/escape specification
#[derive(Clone)]
pub enum MatcherSpec {
    /// Exact text
    Literal(String),
    /// Regular expression
    Regex(RegexSpec),
    /// Custom callback
    Custom(Rc<dyn CustomMatcher>),
}

impl MatcherSpec {
    /// Literal matcher
    #[inline]
    pub fn literal(text: impl Into<String>) -> Self {
        MatcherSpec::Literal(text.into())
    }

    /// Case-sensitive regex matcher
    #[inline]
    pub fn regex(source: impl Into<String>) -> Self {
        MatcherSpec::Regex(RegexSpec {
            source: source.into(),
            ignore_case: false,
        })
    }

    /// Case-insensitive regex matcher
    #[inline]
    pub fn regex_ignore_case(source: impl Into<String>) -> Self {
        MatcherSpec::Regex(RegexSpec {
            source: source.into(),
            ignore_case: true,
        })
    }

    /// Matcher backed by a [`CustomMatcher`] implementation
    #[inline]
    pub fn custom(matcher: impl CustomMatcher + 'static) -> Self {
        MatcherSpec::Custom(Rc::new(matcher))
    }

    /// Matcher backed by a closure
    pub fn from_fn<F>(description: impl Into<String>, func: F) -> Self
    where
        F: Fn(&str, usize, MatchMode, &ScanContext<'_>) -> Option<Match> + 'static,
    {
        MatcherSpec::custom(FnMatcher {
            description: description.into(),
            func,
        })
    }

    /// Short description for debug output
    pub fn describe(&self) -> String {
        match self {
            MatcherSpec::Literal(text) => format!("{:?}", text),
            MatcherSpec::Regex(re) if re.ignore_case => format!("/{}/i", re.source),
            MatcherSpec::Regex(re) => format!("/{}/", re.source),
            MatcherSpec::Custom(m) => format!("<{}>", m.description()),
        }
    }
}

impl From<&str> for MatcherSpec {
    fn from(text: &str) -> Self {
        MatcherSpec::literal(text)
    }
}

impl fmt::Debug for MatcherSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

/// Resolve `spec` against `line` at `position`
///
/// Returns `Ok(None)` when nothing matches.
pub fn try_match(
    line: &str,
    position: usize,
    mode: MatchMode,
    spec: &MatcherSpec,
    ctx: &ScanContext<'_>,
) -> Result<Option<Match>, TokenizeError> {
    let Some(prefix) = line.get(..position) else {
        return Ok(None);
    };

    let found = match (spec, mode) {
        (MatcherSpec::Literal(text), MatchMode::Search) => {
            memmem::find(&line.as_bytes()[position..], text.as_bytes())
                .map(|offset| Match::new(position + offset, Some(text.clone())))
        }
        (MatcherSpec::Literal(text), MatchMode::Suffix) => prefix
            .ends_with(text.as_str())
            .then(|| Match::new(position - text.len(), Some(text.clone()))),
        (MatcherSpec::Regex(re), MatchMode::Search) => {
            let regex = regex_cache::for_search(&re.source, re.ignore_case).ok_or_else(|| {
                TokenizeError::InvalidRegex {
                    source: re.source.clone(),
                }
            })?;
            regex
                .find_at(line, position)
                .map(|m| Match::new(m.start(), Some(m.as_str().to_string())))
        }
        (MatcherSpec::Regex(re), MatchMode::Suffix) => {
            // An end-anchored pattern can only ever end at the line end
            if regex_cache::anchors_of(&re.source).has_end() && position != line.len() {
                None
            } else {
                let regex =
                    regex_cache::for_suffix(&re.source, re.ignore_case).ok_or_else(|| {
                        TokenizeError::InvalidRegex {
                            source: re.source.clone(),
                        }
                    })?;
                regex
                    .find(prefix)
                    .filter(|m| m.end() == position)
                    .map(|m| Match::new(m.start(), Some(m.as_str().to_string())))
            }
        }
        (MatcherSpec::Custom(matcher), _) => matcher.find(line, position, mode, ctx),
    };

    match found {
        Some(m) => check_bounds(line, position, mode, m).map(Some),
        None => Ok(None),
    }
}

/// Reject matches that a caller could not slice the line with
fn check_bounds(
    line: &str,
    from: usize,
    mode: MatchMode,
    m: Match,
) -> Result<Match, TokenizeError> {
    let in_line = m.end() <= line.len()
        && line.is_char_boundary(m.position)
        && line.is_char_boundary(m.end());
    let ordered = mode == MatchMode::Suffix || m.position >= from;
    if in_line && ordered {
        Ok(m)
    } else {
        Err(TokenizeError::InvalidMatch {
            position: m.position,
            line_len: line.len(),
        })
    }
}

/// Earliest match of `spec` at or after `position` that is not escaped
pub fn find_unescaped(
    line: &str,
    position: usize,
    spec: &MatcherSpec,
    escape: Option<&MatcherSpec>,
    ctx: &ScanContext<'_>,
) -> Result<Option<Match>, TokenizeError> {
    let mut from = position;
    loop {
        let Some(found) = try_match(line, from, MatchMode::Search, spec, ctx)? else {
            return Ok(None);
        };
        let Some(escape) = escape else {
            return Ok(Some(found));
        };
        if try_match(line, found.position, MatchMode::Suffix, escape, ctx)?.is_none() {
            return Ok(Some(found));
        }

        // Escaped: resume right after the escaped match
        from = if found.is_empty() {
            next_boundary(line, found.position)
        } else {
            found.end()
        };
        if from > line.len() {
            return Ok(None);
        }
    }
}

/// Offset of the char boundary after `pos`, or one past the end
fn next_boundary(line: &str, pos: usize) -> usize {
    line[pos..]
        .chars()
        .next()
        .map_or(line.len() + 1, |c| pos + c.len_utf8())
}
