//! Incremental document highlighting
//!
//! Tokenizing line `n` only needs the [`OverlayState`] at the start of line
//! `n`. [`IncrementalHighlighter`] keeps one such checkpoint per line, so
//! after an edit only the lines from the first changed one onward are
//! tokenized again.
//!
//! ```text
//! lines:        0      1      2      3
//! checkpoints: [s0]   [s1]   [s2]   [s3]   [s4]
//!                             ^ edit on line 2
//! reused: lines 0-1 (tokens and s0..=s2)
//! re-tokenized: lines 2-3 starting from s2
//! ```
//!
//! # Usage
//!
//! ```
//! use modelayer::engine::{IncrementalHighlighter, LineEdit, OverlayBuilder};
//!
//! let mode = OverlayBuilder::new().build().unwrap();
//! let mut highlighter = IncrementalHighlighter::new(mode);
//!
//! let result = highlighter.highlight(&["a (b", "c)"]);
//! assert_eq!(result.retokenized_lines, 2);
//!
//! highlighter.apply_edit(LineEdit::replace(1, 1, 1));
//! let result = highlighter.highlight(&["a (b", "d)"]);
//! assert_eq!(result.reused_lines, 1);
//! ```

use super::dispatcher::{OverlayMode, Token};
use super::error::TokenizeError;
use super::state::OverlayState;

/// A change to the document, in lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineEdit {
    /// First affected line
    pub line: usize,
    /// Number of lines replaced
    pub old_count: usize,
    /// Number of lines inserted in their place
    pub new_count: usize,
}

impl LineEdit {
    /// Create a new edit
    #[inline]
    pub fn new(line: usize, old_count: usize, new_count: usize) -> Self {
        Self {
            line,
            old_count,
            new_count,
        }
    }

    /// Lines inserted before `line`
    #[inline]
    pub fn insert(line: usize, count: usize) -> Self {
        Self::new(line, 0, count)
    }

    /// Lines removed starting at `line`
    #[inline]
    pub fn delete(line: usize, count: usize) -> Self {
        Self::new(line, count, 0)
    }

    /// Lines replaced starting at `line`
    #[inline]
    pub fn replace(line: usize, old_count: usize, new_count: usize) -> Self {
        Self::new(line, old_count, new_count)
    }

    /// Change in line count
    #[inline]
    pub fn delta(&self) -> isize {
        self.new_count as isize - self.old_count as isize
    }
}

/// Outcome of one [`IncrementalHighlighter::highlight`] call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IncrementalResult {
    /// Lines whose tokens were kept
    pub reused_lines: usize,
    /// Lines tokenized again
    pub retokenized_lines: usize,
    /// Re-tokenized lines that were abandoned with an error
    pub failed_lines: usize,
}

impl IncrementalResult {
    /// Share of lines that did not need tokenizing
    pub fn efficiency(&self) -> f64 {
        let total = self.reused_lines + self.retokenized_lines;
        if total == 0 {
            1.0
        } else {
            self.reused_lines as f64 / total as f64
        }
    }
}

/// Per-line checkpoints and tokens of one document
#[derive(Debug)]
pub struct IncrementalHighlighter {
    mode: OverlayMode,
    /// `checkpoints[i]` is the state before line `i`
    checkpoints: Vec<OverlayState>,
    tokens: Vec<Vec<Token>>,
    errors: Vec<Option<TokenizeError>>,
}

impl IncrementalHighlighter {
    /// Highlighter for an empty document
    pub fn new(mode: OverlayMode) -> Self {
        let start = mode.start_state();
        Self {
            mode,
            checkpoints: vec![start],
            tokens: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// The tokenizer
    #[inline]
    pub fn mode(&self) -> &OverlayMode {
        &self.mode
    }

    /// Tokens of every line highlighted so far
    #[inline]
    pub fn tokens(&self) -> &[Vec<Token>] {
        &self.tokens
    }

    /// Number of lines whose tokens are up to date
    #[inline]
    pub fn valid_lines(&self) -> usize {
        self.tokens.len()
    }

    /// Error that cut `line` short, if any
    pub fn error_at(&self, line: usize) -> Option<&TokenizeError> {
        self.errors.get(line).and_then(Option::as_ref)
    }

    /// State at the start of `line`, if computed
    pub fn state_at(&self, line: usize) -> Option<&OverlayState> {
        self.checkpoints.get(line)
    }

    /// Forget everything from `line` onward
    pub fn invalidate_from(&mut self, line: usize) {
        let keep = line.min(self.tokens.len());
        self.tokens.truncate(keep);
        self.errors.truncate(keep);
        self.checkpoints.truncate(keep + 1);
    }

    /// Record an edit; the next [`highlight`](Self::highlight) restarts at it
    pub fn apply_edit(&mut self, edit: LineEdit) {
        log_debug!(
            "edit at line {}: -{} +{}",
            edit.line,
            edit.old_count,
            edit.new_count
        );
        self.invalidate_from(edit.line);
    }

    /// Bring tokens up to date with `lines`
    ///
    /// Lines before the first invalidated one are reused as is. A line that
    /// fails keeps its text unstyled and the lines after it are still
    /// highlighted.
    pub fn highlight(&mut self, lines: &[&str]) -> IncrementalResult {
        self.invalidate_from(lines.len());
        let reused = self.tokens.len();

        let mut state = match self.checkpoints.last() {
            Some(state) => state.clone(),
            None => self.mode.start_state(),
        };
        let mut failed = 0;
        for line in &lines[reused..] {
            let (tokens, error) = self.mode.tokenize_line_lossy(line, &mut state);
            failed += usize::from(error.is_some());
            self.tokens.push(tokens);
            self.errors.push(error);
            self.checkpoints.push(state.clone());
        }

        IncrementalResult {
            reused_lines: reused,
            retokenized_lines: lines.len() - reused,
            failed_lines: failed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::config::OverlayBuilder;
    use crate::engine::keyword_mode::KeywordMode;
    use crate::engine::scanner::ScanLimits;
    use std::rc::Rc;

    #[test]
    fn test_edit_constructors() {
        assert_eq!(LineEdit::insert(3, 2), LineEdit::new(3, 0, 2));
        assert_eq!(LineEdit::delete(3, 2).delta(), -2);
        assert_eq!(LineEdit::replace(0, 1, 4).delta(), 3);
    }

    #[test]
    fn test_efficiency() {
        let r = IncrementalResult {
            reused_lines: 3,
            retokenized_lines: 1,
            failed_lines: 0,
        };
        assert!((r.efficiency() - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_highlight_reuses_prefix() {
        let mode = OverlayBuilder::new().build().unwrap();
        let mut h = IncrementalHighlighter::new(mode);
        h.highlight(&["(a", "b", "c)"]);
        assert_eq!(h.valid_lines(), 3);
        assert_eq!(h.state_at(1).map(|s| s.pattern_depth()), Some(2));

        h.apply_edit(LineEdit::replace(2, 1, 1));
        let result = h.highlight(&["(a", "b", "c"]);
        assert_eq!(result.reused_lines, 2);
        assert_eq!(result.retokenized_lines, 1);
        assert_eq!(h.state_at(3).map(|s| s.pattern_depth()), Some(2));
    }

    #[test]
    fn test_shorter_document_drops_trailing_lines() {
        let mode = OverlayBuilder::new().build().unwrap();
        let mut h = IncrementalHighlighter::new(mode);
        h.highlight(&["a", "b", "c"]);
        let result = h.highlight(&["a"]);
        assert_eq!(result.reused_lines, 1);
        assert_eq!(h.tokens().len(), 1);
    }

    #[test]
    fn test_failed_line_does_not_stop_later_lines() {
        let mode = OverlayBuilder::new()
            .mode(Rc::new(KeywordMode::new("sql", ["where"])))
            .limits(ScanLimits::new().with_max_depth(3))
            .build()
            .unwrap();
        let mut h = IncrementalHighlighter::new(mode);
        let result = h.highlight(&["((((", "where x"]);

        assert_eq!(result.failed_lines, 1);
        assert_eq!(h.valid_lines(), 2);
        assert!(matches!(
            h.error_at(0),
            Some(TokenizeError::DepthLimitExceeded { max_depth: 3, .. })
        ));
        assert_eq!(h.error_at(1), None);
        assert_eq!(
            h.tokens()[0],
            vec![Token {
                start: 0,
                end: 4,
                style: None
            }]
        );
        assert_eq!(h.tokens()[1][0].style.as_deref(), Some("keyword"));
        assert_eq!(h.state_at(2).map(|s| s.pattern_depth()), Some(1));
    }
}
