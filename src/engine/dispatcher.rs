//! Token dispatcher
//!
//! [`OverlayMode`] is the host-facing tokenizer. At the start of every line
//! it runs the [`LayerScanner`] once, then answers token requests by walking
//! the line's layers in order:
//!
//! - text between layers goes to the active sub-mode, cut at the next layer
//! - styled delimiters become one token each
//! - other delimiters go to the inner or outer sub-mode depending on their
//!   [`Delimiters`] treatment and direction
//!
//! The embedded-mode stack is kept in step with the pattern stack as the
//! cursor crosses each layer.

use super::error::TokenizeError;
use super::grammar::{Delimiters, Grammar};
use super::mode::{ModeRef, Style};
use super::scanner::{Direction, Layer, LayerScanner, ScanLimits};
use super::state::OverlayState;
use super::stream::LineStream;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::rc::Rc;

/// A styled byte range produced by [`OverlayMode::tokenize_line`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Start offset
    pub start: usize,
    /// End offset (exclusive)
    pub end: usize,
    /// Style class, `None` for unstyled text
    pub style: Option<Style>,
}

/// Tokens of a whole text, with the lines that could not be tokenized
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenizedText {
    /// Tokens of every line
    pub lines: Vec<Vec<Token>>,
    /// Line index and error of each abandoned line
    pub errors: Vec<(usize, TokenizeError)>,
}

impl TokenizedText {
    /// Whether every line tokenized without error
    #[inline]
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

impl Token {
    /// Text of the token within `line`
    #[inline]
    pub fn text<'a>(&self, line: &'a str) -> &'a str {
        &line[self.start..self.end]
    }
}

/// Layered tokenizer over a grammar
#[derive(Debug, Clone)]
pub struct OverlayMode {
    name: String,
    grammar: Rc<Grammar>,
    limits: ScanLimits,
}

impl OverlayMode {
    /// Tokenizer for `grammar` with default limits
    pub fn new(name: impl Into<String>, grammar: Rc<Grammar>) -> Self {
        Self {
            name: name.into(),
            grammar,
            limits: ScanLimits::default(),
        }
    }

    /// Replace the scan limits
    pub fn with_limits(mut self, limits: ScanLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Mode name
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The grammar
    #[inline]
    pub fn grammar(&self) -> &Rc<Grammar> {
        &self.grammar
    }

    /// Scan limits
    #[inline]
    pub fn limits(&self) -> ScanLimits {
        self.limits
    }

    /// State for the first line of a document
    pub fn start_state(&self) -> OverlayState {
        OverlayState::new(Rc::clone(&self.grammar))
    }

    /// Consume one token from `stream` and return its style
    ///
    /// On error the rest of the line is skipped and its scan discarded, so
    /// the next line starts cleanly.
    pub fn token(
        &self,
        stream: &mut LineStream<'_>,
        state: &mut OverlayState,
    ) -> Result<Option<Style>, TokenizeError> {
        let result = self.next_token(stream, state);
        match &result {
            Err(_err) => {
                log_debug!("abandoning line at {}: {}", stream.pos(), _err);
                self.finish_line(state);
                stream.skip_to_end();
            }
            Ok(_) if stream.eol() => self.finish_line(state),
            Ok(_) => {}
        }
        result
    }

    /// Process an empty line
    ///
    /// Transitions matching the empty string still apply, and the active
    /// sub-mode gets its own blank-line notification.
    pub fn blank_line(&self, state: &mut OverlayState) -> Result<(), TokenizeError> {
        self.finish_line(state);
        let mut stream = LineStream::new("");
        let scanned = self.scan(&mut stream, state);
        self.finish_line(state);
        scanned?;

        if let Some(frame) = state.modes.top_mut() {
            frame.mode.blank_line(&mut *frame.state);
        }
        Ok(())
    }

    /// Indentation requested by the active sub-mode
    pub fn indent(&self, state: &OverlayState, text_after: &str) -> Option<usize> {
        state
            .modes
            .peek()
            .and_then(|frame| frame.mode.indent(&*frame.state, text_after))
    }

    /// Active sub-mode and its state
    pub fn active_mode<'s>(&self, state: &'s OverlayState) -> Option<(&'s ModeRef, &'s dyn Any)> {
        state.active_mode()
    }

    /// Tokenize a whole line, empty lines included
    ///
    /// Fails on the first error; the state is still left ready for the
    /// next line.
    pub fn tokenize_line(
        &self,
        line: &str,
        state: &mut OverlayState,
    ) -> Result<Vec<Token>, TokenizeError> {
        match self.tokenize_line_lossy(line, state) {
            (tokens, None) => Ok(tokens),
            (_, Some(err)) => Err(err),
        }
    }

    /// Tokenize a whole line, never failing
    ///
    /// When tokenizing breaks off, the rest of the line becomes one
    /// unstyled token and the error is returned next to the tokens.
    pub fn tokenize_line_lossy(
        &self,
        line: &str,
        state: &mut OverlayState,
    ) -> (Vec<Token>, Option<TokenizeError>) {
        if line.is_empty() {
            return (Vec::new(), self.blank_line(state).err());
        }

        let mut stream = LineStream::new(line);
        let mut tokens = Vec::new();
        while !stream.eol() {
            stream.begin_token();
            let failure = match self.token(&mut stream, state) {
                Ok(_) if stream.pos() == stream.start() => {
                    self.finish_line(state);
                    Some(TokenizeError::Internal {
                        message: format!("no progress at offset {}", stream.pos()),
                    })
                }
                Ok(style) => {
                    tokens.push(Token {
                        start: stream.start(),
                        end: stream.pos(),
                        style,
                    });
                    None
                }
                Err(err) => Some(err),
            };
            if let Some(err) = failure {
                if stream.start() < line.len() {
                    tokens.push(Token {
                        start: stream.start(),
                        end: line.len(),
                        style: None,
                    });
                }
                return (tokens, Some(err));
            }
        }
        (tokens, None)
    }

    /// Tokenize every line of `text` from the start state
    ///
    /// A line that fails is kept as unstyled text and tokenizing goes on
    /// with the next line.
    pub fn tokenize_text(&self, text: &str) -> TokenizedText {
        let mut state = self.start_state();
        let mut result = TokenizedText::default();
        for (index, line) in text.split('\n').enumerate() {
            let (tokens, error) = self.tokenize_line_lossy(line, &mut state);
            result.lines.push(tokens);
            if let Some(err) = error {
                log_debug!("line {} abandoned: {}", index, err);
                result.errors.push((index, err));
            }
        }
        result
    }

    fn next_token(
        &self,
        stream: &mut LineStream<'_>,
        state: &mut OverlayState,
    ) -> Result<Option<Style>, TokenizeError> {
        if !state.line.needs_scan && stream.sol() {
            // A new line arrived before the previous one reached its end
            self.finish_line(state);
        }
        if state.line.needs_scan {
            self.scan(stream, state)?;
        }
        let grammar = Rc::clone(&state.grammar);

        loop {
            let pos = stream.pos();
            let Some(layer) = state.line.pending().cloned() else {
                let end = stream.string().len();
                return Ok(self.delegate(stream, state, end));
            };
            if pos < layer.position {
                return Ok(self.delegate(stream, state, layer.position));
            }
            if pos > layer.position && pos >= layer.end() {
                return Err(TokenizeError::Misaligned {
                    position: pos,
                    expected: layer.position,
                });
            }

            match &grammar.pattern(layer.pattern()).delimiters {
                Delimiters::Styled { open, close } => {
                    if pos != layer.position {
                        return Err(TokenizeError::Misaligned {
                            position: pos,
                            expected: layer.position,
                        });
                    }
                    stream.advance_to(layer.end());
                    self.cross(state, &layer);
                    if layer.is_empty() {
                        continue;
                    }
                    let style = match layer.direction {
                        Direction::Open => open,
                        Direction::Close => close,
                    };
                    return Ok(Some(style.clone()));
                }
                delimiters => {
                    // Entering an included pattern or leaving a plain one
                    // hands the delimiter to the mode on the far side.
                    let effect_first = matches!(
                        (delimiters, layer.direction),
                        (Delimiters::Included, Direction::Open)
                            | (Delimiters::Plain, Direction::Close)
                    );
                    if effect_first && !state.line.synced {
                        state.apply_mode_effect(&layer);
                        state.line.synced = true;
                    }
                    if layer.is_empty() {
                        self.cross(state, &layer);
                        continue;
                    }
                    let style = self.delegate(stream, state, layer.end());
                    if stream.pos() >= layer.end() {
                        self.cross(state, &layer);
                    }
                    return Ok(style);
                }
            }
        }
    }

    /// Compute the layers of the line under `stream`
    ///
    /// The scan works on copies of the pattern stack and scratch map, which
    /// replace the originals only when the whole line scanned cleanly.
    fn scan(&self, stream: &mut LineStream<'_>, state: &mut OverlayState) -> Result<(), TokenizeError> {
        let mut patterns = state.patterns.clone();
        let mut scratch = state.scratch.clone();
        let mut text_before = String::new();
        let layers = LayerScanner::new(&state.grammar, self.limits).scan_line(
            &mut patterns,
            stream.string(),
            stream.pos(),
            &mut text_before,
            &mut scratch,
        )?;

        state.patterns = patterns;
        state.scratch = scratch;
        state.line.text_before = text_before;
        state.line.layers = layers;
        state.line.next = 0;
        state.line.synced = false;
        state.line.needs_scan = false;
        Ok(())
    }

    /// Consume the pending layer, applying its mode effect if still due
    fn cross(&self, state: &mut OverlayState, layer: &Layer) {
        if !state.line.synced {
            state.apply_mode_effect(layer);
        }
        state.line.advance();
    }

    /// Hand `stream` to the active sub-mode, never past `limit`
    fn delegate(
        &self,
        stream: &mut LineStream<'_>,
        state: &mut OverlayState,
        limit: usize,
    ) -> Option<Style> {
        let start = stream.pos();
        let Some(frame) = state.modes.top_mut() else {
            stream.advance_to(limit);
            return None;
        };

        let style = frame.token(stream);
        let pos = stream.pos();
        if pos > limit {
            stream.back_up(pos - limit);
        } else if pos <= start {
            log_debug!("sub-mode {} did not advance at {}", frame.mode.name(), start);
            stream.next_char();
        }
        style
    }

    /// Apply every outstanding layer of the line and request a rescan
    fn finish_line(&self, state: &mut OverlayState) {
        while let Some(layer) = state.line.pending().cloned() {
            self.cross(state, &layer);
        }
        state.line.discard();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::grammar::{GrammarBuilder, Pattern};
    use crate::engine::mode::{ModeState, SubMode};

    /// Consumes the rest of the line and counts its calls
    struct Greedy(&'static str);

    impl SubMode for Greedy {
        fn name(&self) -> &str {
            self.0
        }
        fn start_state(&self) -> ModeState {
            Box::new(0u32)
        }
        fn token(&self, stream: &mut LineStream<'_>, state: &mut dyn Any) -> Option<Style> {
            if let Some(n) = state.downcast_mut::<u32>() {
                *n += 1;
            }
            stream.skip_to_end();
            Some(self.0.to_string())
        }
        fn copy_state(&self, state: &dyn Any) -> ModeState {
            Box::new(state.downcast_ref::<u32>().copied().unwrap_or_default())
        }
        fn blank_line(&self, state: &mut dyn Any) {
            if let Some(n) = state.downcast_mut::<u32>() {
                *n += 100;
            }
        }
        fn indent(&self, _state: &dyn Any, text_after: &str) -> Option<usize> {
            Some(if text_after.starts_with('}') { 0 } else { 4 })
        }
    }

    /// Never advances
    struct Stuck;

    impl SubMode for Stuck {
        fn name(&self) -> &str {
            "stuck"
        }
        fn start_state(&self) -> ModeState {
            Box::new(())
        }
        fn token(&self, _stream: &mut LineStream<'_>, _state: &mut dyn Any) -> Option<Style> {
            Some("stuck".to_string())
        }
        fn copy_state(&self, _state: &dyn Any) -> ModeState {
            Box::new(())
        }
    }

    fn overlay(inner: Pattern) -> OverlayMode {
        let mut b = GrammarBuilder::new();
        let root = b.add(Pattern::new("root").mode(Rc::new(Greedy("outer"))));
        let inner = b.add(inner.mode(Rc::new(Greedy("inner"))));
        b.set_children(root, [inner]);
        OverlayMode::new("test", Rc::new(b.build().unwrap()))
    }

    fn spans(line: &str, tokens: &[Token]) -> Vec<(String, Option<String>)> {
        tokens
            .iter()
            .map(|t| (t.text(line).to_string(), t.style.clone()))
            .collect()
    }

    fn owned(items: &[(&str, Option<&str>)]) -> Vec<(String, Option<String>)> {
        items
            .iter()
            .map(|(t, s)| (t.to_string(), s.map(str::to_string)))
            .collect()
    }

    #[test]
    fn test_plain_delimiters_go_to_outer_mode() {
        let mode = overlay(Pattern::new("code").open("{{").close("}}"));
        let mut state = mode.start_state();
        let line = "a {{b}} c";
        let tokens = mode.tokenize_line(line, &mut state).unwrap();
        assert_eq!(
            spans(line, &tokens),
            owned(&[
                ("a ", Some("outer")),
                ("{{", Some("outer")),
                ("b", Some("inner")),
                ("}}", Some("outer")),
                (" c", Some("outer")),
            ])
        );
        assert_eq!(state.mode_depth(), 1);
    }

    #[test]
    fn test_included_delimiters_go_to_inner_mode() {
        let mode = overlay(Pattern::new("code").open("{{").close("}}").include_pattern());
        let mut state = mode.start_state();
        let line = "a {{b}} c";
        let tokens = mode.tokenize_line(line, &mut state).unwrap();
        assert_eq!(
            spans(line, &tokens),
            owned(&[
                ("a ", Some("outer")),
                ("{{", Some("inner")),
                ("b", Some("inner")),
                ("}}", Some("inner")),
                (" c", Some("outer")),
            ])
        );
    }

    #[test]
    fn test_styled_delimiters_are_single_tokens() {
        let mode = overlay(Pattern::new("code").open("{{").close("}}").styled("open", "close"));
        let mut state = mode.start_state();
        let line = "{{b}}";
        let tokens = mode.tokenize_line(line, &mut state).unwrap();
        assert_eq!(
            spans(line, &tokens),
            owned(&[
                ("{{", Some("open")),
                ("b", Some("inner")),
                ("}}", Some("close")),
            ])
        );
    }

    #[test]
    fn test_mode_stack_spans_lines() {
        let mode = overlay(Pattern::new("code").open("{{").close("}}").styled("o", "c"));
        let mut state = mode.start_state();
        mode.tokenize_line("x {{ y", &mut state).unwrap();
        assert_eq!(state.mode_depth(), 2);
        assert_eq!(state.mode_path(), vec!["outer", "inner"]);

        let line = "z }} w";
        let tokens = mode.tokenize_line(line, &mut state).unwrap();
        assert_eq!(tokens[0].style.as_deref(), Some("inner"));
        assert_eq!(state.mode_depth(), 1);
    }

    #[test]
    fn test_stuck_sub_mode_is_forced_forward() {
        let mut b = GrammarBuilder::new();
        b.add(Pattern::new("root").mode(Rc::new(Stuck)));
        let mode = OverlayMode::new("stuck", Rc::new(b.build().unwrap()));
        let mut state = mode.start_state();
        let tokens = mode.tokenize_line("ab", &mut state).unwrap();
        assert_eq!(tokens.len(), 2);
        assert!(tokens.iter().all(|t| t.end == t.start + 1));
    }

    #[test]
    fn test_without_sub_mode_text_is_unstyled() {
        let mut b = GrammarBuilder::new();
        let root = b.add(Pattern::new("root"));
        let paren = b.add(Pattern::new("paren").open("(").close(")").styled("p", "p"));
        b.set_children(root, [paren]);
        let mode = OverlayMode::new("bare", Rc::new(b.build().unwrap()));
        let mut state = mode.start_state();
        let line = "ab(cd)";
        let tokens = mode.tokenize_line(line, &mut state).unwrap();
        assert_eq!(
            spans(line, &tokens),
            owned(&[("ab", None), ("(", Some("p")), ("cd", None), (")", Some("p"))])
        );
    }

    #[test]
    fn test_misaligned_cursor_abandons_line() {
        let mode = overlay(Pattern::new("code").open("{{").close("}}").styled("o", "c"));
        let mut state = mode.start_state();
        let mut stream = LineStream::new("a {{b}}");
        mode.token(&mut stream, &mut state).unwrap();
        assert_eq!(stream.pos(), 2);

        // The host skips over a styled delimiter
        stream.advance_to(3);
        let err = mode.token(&mut stream, &mut state).unwrap_err();
        assert_eq!(
            err,
            TokenizeError::Misaligned {
                position: 3,
                expected: 2
            }
        );
        assert!(stream.eol());
        assert!(state.layers().is_empty());
        assert_eq!(state.mode_depth(), 1);

        // The next line tokenizes normally
        let tokens = mode.tokenize_line("x", &mut state).unwrap();
        assert_eq!(tokens.len(), 1);
    }

    #[test]
    fn test_blank_line_reaches_active_sub_mode() {
        let mode = overlay(Pattern::new("code").open("{{").close("}}"));
        let mut state = mode.start_state();
        mode.tokenize_line("{{", &mut state).unwrap();
        mode.tokenize_line("", &mut state).unwrap();

        let (active, inner_state) = mode.active_mode(&state).unwrap();
        assert_eq!(active.name(), "inner");
        assert_eq!(inner_state.downcast_ref::<u32>(), Some(&100));
        assert!(state.text_before().is_empty());
    }

    #[test]
    fn test_indent_comes_from_active_sub_mode() {
        let mode = overlay(Pattern::new("code").open("{{").close("}}"));
        let state = mode.start_state();
        assert_eq!(mode.indent(&state, "}"), Some(0));
        assert_eq!(mode.indent(&state, "x"), Some(4));
    }

    #[test]
    fn test_tokenize_text_keeps_state_between_lines() {
        let mode = overlay(Pattern::new("code").open("{{").close("}}").styled("o", "c"));
        let text = mode.tokenize_text("{{\nb\n}}");
        assert!(text.is_clean());
        let lines = text.lines;
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1][0].style.as_deref(), Some("inner"));
        assert_eq!(lines[2][0].style.as_deref(), Some("c"));
    }
}
