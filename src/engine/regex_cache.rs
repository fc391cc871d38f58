//! Thread-local regex cache with anchor normalization
//!
//! A grammar regex is used in two ways: searched forward from an arbitrary
//! offset, and checked as a suffix that must end exactly at an offset. Both
//! uses need a differently anchored compiled form, so patterns are first
//! rewritten by [`normalize`] and then cached by the rewritten source plus
//! [`RegexFlags`].
//!
//! Compiled patterns are shared by every tokenizer state on the thread and
//! are never invalidated while in use.

use hashbrown::HashMap;
use regex::{Regex, RegexBuilder};
use std::cell::{Cell, RefCell};

/// Anchoring required of a normalized pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Anchor {
    /// No anchors
    None,
    /// Must match at the start of the haystack
    Start,
    /// Must match at the end of the haystack
    End,
    /// Must match the whole haystack
    Both,
}

impl Anchor {
    /// Build from the two anchor bits
    #[inline]
    pub fn from_bits(start: bool, end: bool) -> Self {
        match (start, end) {
            (false, false) => Anchor::None,
            (true, false) => Anchor::Start,
            (false, true) => Anchor::End,
            (true, true) => Anchor::Both,
        }
    }

    /// Whether a start anchor is present
    #[inline]
    pub fn has_start(self) -> bool {
        matches!(self, Anchor::Start | Anchor::Both)
    }

    /// Whether an end anchor is present
    #[inline]
    pub fn has_end(self) -> bool {
        matches!(self, Anchor::End | Anchor::Both)
    }
}

/// Compilation flags that take part in the cache key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RegexFlags {
    /// Forward search from an offset (the "global" flag); off for suffix checks
    pub search: bool,
    /// Case-insensitive matching
    pub ignore_case: bool,
}

/// Snapshot of cache counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    /// Number of compiled patterns held
    pub entries: usize,
    /// Lookups served from the cache
    pub hits: u64,
    /// Lookups that compiled a new pattern
    pub misses: u64,
}

type CacheKey = (String, RegexFlags);

thread_local! {
    /// Thread-local cache of compiled regex patterns
    static REGEX_CACHE: RefCell<HashMap<CacheKey, Regex, ahash::RandomState>> =
        RefCell::new(HashMap::default());
    static CACHE_HITS: Cell<u64> = const { Cell::new(0) };
    static CACHE_MISSES: Cell<u64> = const { Cell::new(0) };
}

/// Detect the anchors a user-written pattern carries
///
/// Only a leading `^` and a trailing unescaped `$` count.
pub fn anchors_of(source: &str) -> Anchor {
    Anchor::from_bits(source.starts_with('^'), ends_with_anchor(source))
}

/// Rewrite `source` so that it carries exactly the anchors in `anchor`
///
/// A source that already carries the requested anchors is returned as is.
/// Missing anchors are added around a non-capturing group holding the whole
/// source, so top-level alternations keep their scope. Only anchors that
/// must go away are stripped.
pub fn normalize(source: &str, anchor: Anchor) -> String {
    let own = anchors_of(source);
    if own == anchor {
        return source.to_string();
    }

    let mut body = source;
    if own.has_start() && !anchor.has_start() {
        body = &body[1..];
    }
    if own.has_end() && !anchor.has_end() {
        body = &body[..body.len() - 1];
    }

    let add_start = anchor.has_start() && !own.has_start();
    let add_end = anchor.has_end() && !own.has_end();
    if !add_start && !add_end {
        return body.to_string();
    }
    format!(
        "{}(?:{}){}",
        if add_start { "^" } else { "" },
        body,
        if add_end { "$" } else { "" }
    )
}

/// A trailing `$` is an anchor when preceded by an even number of backslashes
fn ends_with_anchor(source: &str) -> bool {
    let Some(head) = source.strip_suffix('$') else {
        return false;
    };
    let backslashes = head.bytes().rev().take_while(|&b| b == b'\\').count();
    backslashes % 2 == 0
}

/// Get or compile a normalized pattern
///
/// # Returns
/// * `Some(Regex)` if the pattern is valid
/// * `None` if the pattern is invalid
pub fn get_or_compile(normalized: &str, flags: RegexFlags) -> Option<Regex> {
    REGEX_CACHE.with(|cache| {
        let key = (normalized.to_string(), flags);
        if let Some(regex) = cache.borrow().get(&key) {
            CACHE_HITS.with(|hits| hits.set(hits.get() + 1));
            return Some(regex.clone());
        }

        CACHE_MISSES.with(|misses| misses.set(misses.get() + 1));
        let regex = RegexBuilder::new(normalized)
            .case_insensitive(flags.ignore_case)
            .build()
            .ok()?;
        cache.borrow_mut().insert(key, regex.clone());
        Some(regex)
    })
}

/// Compile `source` for forward search, keeping its own anchors
#[inline]
pub fn for_search(source: &str, ignore_case: bool) -> Option<Regex> {
    let normalized = normalize(source, anchors_of(source));
    get_or_compile(
        &normalized,
        RegexFlags {
            search: true,
            ignore_case,
        },
    )
}

/// Compile `source` for a suffix check (always end-anchored)
#[inline]
pub fn for_suffix(source: &str, ignore_case: bool) -> Option<Regex> {
    let anchor = Anchor::from_bits(anchors_of(source).has_start(), true);
    let normalized = normalize(source, anchor);
    get_or_compile(
        &normalized,
        RegexFlags {
            search: false,
            ignore_case,
        },
    )
}

/// Clear the regex cache and its counters
pub fn clear_cache() {
    REGEX_CACHE.with(|cache| cache.borrow_mut().clear());
    CACHE_HITS.with(|hits| hits.set(0));
    CACHE_MISSES.with(|misses| misses.set(0));
}

/// Get the number of cached patterns
pub fn cache_size() -> usize {
    REGEX_CACHE.with(|cache| cache.borrow().len())
}

/// Current cache counters
pub fn stats() -> CacheStats {
    CacheStats {
        entries: cache_size(),
        hits: CACHE_HITS.with(Cell::get),
        misses: CACHE_MISSES.with(Cell::get),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anchor_detection() {
        assert_eq!(anchors_of("abc"), Anchor::None);
        assert_eq!(anchors_of("^abc"), Anchor::Start);
        assert_eq!(anchors_of("abc$"), Anchor::End);
        assert_eq!(anchors_of("^abc$"), Anchor::Both);
        // Escaped dollar is a literal
        assert_eq!(anchors_of(r"abc\$"), Anchor::None);
        // Escaped backslash followed by an anchor
        assert_eq!(anchors_of(r"abc\\$"), Anchor::End);
    }

    #[test]
    fn test_normalize_rewrites_anchors() {
        assert_eq!(normalize("x$", Anchor::None), "x");
        assert_eq!(normalize("^x", Anchor::Both), "(?:^x)$");
        assert_eq!(normalize("^x$", Anchor::End), "x$");
        assert_eq!(normalize("a|b", Anchor::Both), "^(?:a|b)$");
        assert_eq!(normalize(r"\$", Anchor::End), r"(?:\$)$");
    }

    #[test]
    fn test_own_anchors_leave_source_untouched() {
        assert_eq!(normalize("a|b$", Anchor::End), "a|b$");
        assert_eq!(normalize("^a|b", Anchor::Start), "^a|b");

        // The `$` binds to the second alternative only
        let re = for_search("a|b$", false).unwrap();
        assert_eq!(re.find("xa b").map(|m| m.start()), Some(1));

        // Suffix form keeps the alternation intact too
        let re = for_suffix("a|b$", false).unwrap();
        assert_eq!(re.as_str(), "a|b$");
        let re = for_suffix("a|b", false).unwrap();
        assert_eq!(re.as_str(), "(?:a|b)$");
    }

    #[test]
    fn test_cache_compilation() {
        clear_cache();

        // First access compiles
        let r1 = for_search("[0-9]+", false);
        assert!(r1.is_some());
        assert_eq!(cache_size(), 1);

        // Second access uses cache
        let r2 = for_search("[0-9]+", false);
        assert!(r2.is_some());
        assert_eq!(cache_size(), 1);

        // Same source in suffix mode is a different entry
        let r3 = for_suffix("[0-9]+", false);
        assert!(r3.is_some());
        assert_eq!(cache_size(), 2);

        let s = stats();
        assert_eq!(s.hits, 1);
        assert_eq!(s.misses, 2);
    }

    #[test]
    fn test_flags_are_part_of_key() {
        clear_cache();

        let lower = for_search("abc", false).unwrap();
        let any_case = for_search("abc", true).unwrap();
        assert_eq!(cache_size(), 2);
        assert!(lower.find("ABC").is_none());
        assert!(any_case.find("ABC").is_some());
    }

    #[test]
    fn test_invalid_pattern() {
        clear_cache();

        assert!(for_search("[invalid", false).is_none());
        assert_eq!(cache_size(), 0);
    }

    #[test]
    fn test_suffix_form_matches_only_at_end() {
        clear_cache();

        let r = for_suffix("ab", false).unwrap();
        assert!(r.is_match("xxab"));
        assert!(!r.is_match("abxx"));
    }
}
