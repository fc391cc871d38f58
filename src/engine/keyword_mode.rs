//! Small keyword-highlighting sub-mode
//!
//! [`KeywordMode`] is a minimal host or code-expression tokenizer: keywords,
//! numbers, quoted strings and operators. Strings are tracked in the mode
//! state so that a string may be split across several token requests (the
//! dispatcher cuts tokens at delimiter boundaries) and across lines.

use super::mode::{ModeState, Style, SubMode};
use super::stream::LineStream;
use hashbrown::HashSet;
use std::any::Any;

/// Style for keywords
pub const KEYWORD: &str = "keyword";
/// Style for numeric literals
pub const NUMBER: &str = "number";
/// Style for quoted strings
pub const STRING: &str = "string";
/// Style for operator characters
pub const OPERATOR: &str = "operator";
/// Style for identifiers that are not keywords
pub const VARIABLE: &str = "variable";

const OPERATOR_CHARS: &str = "+-*/%=<>!&|^~?:";

/// State of a [`KeywordMode`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordState {
    /// Quote character of the open string, if any
    pub in_string: Option<char>,
    /// Tokens produced so far
    pub tokens: usize,
}

/// Keyword-based sub-mode
#[derive(Debug, Clone)]
pub struct KeywordMode {
    name: String,
    keywords: HashSet<String, ahash::RandomState>,
    ignore_case: bool,
    style_identifiers: bool,
    indent_unit: usize,
}

impl KeywordMode {
    /// Mode named `name` highlighting `keywords`
    pub fn new<'k>(name: impl Into<String>, keywords: impl IntoIterator<Item = &'k str>) -> Self {
        Self {
            name: name.into(),
            keywords: keywords.into_iter().map(str::to_string).collect(),
            ignore_case: false,
            style_identifiers: false,
            indent_unit: 2,
        }
    }

    /// Match keywords case-insensitively
    pub fn ignore_case(mut self, ignore_case: bool) -> Self {
        if ignore_case {
            self.keywords = self.keywords.iter().map(|k| k.to_lowercase()).collect();
        }
        self.ignore_case = ignore_case;
        self
    }

    /// Style non-keyword identifiers as [`VARIABLE`]
    pub fn style_identifiers(mut self, style: bool) -> Self {
        self.style_identifiers = style;
        self
    }

    /// Indentation used inside an open string
    pub fn indent_unit(mut self, unit: usize) -> Self {
        self.indent_unit = unit;
        self
    }

    /// Whether `word` is a keyword
    pub fn is_keyword(&self, word: &str) -> bool {
        if self.ignore_case {
            self.keywords.contains(&word.to_lowercase())
        } else {
            self.keywords.contains(word)
        }
    }

    fn string_body(&self, stream: &mut LineStream<'_>, state: &mut KeywordState, quote: char) {
        if stream.eat(|c| c == quote).is_some() {
            state.in_string = None;
            return;
        }
        while let Some(c) = stream.peek() {
            if c == quote {
                break;
            }
            stream.next_char();
            if c == '\\' {
                stream.next_char();
            }
        }
    }
}

impl SubMode for KeywordMode {
    fn name(&self) -> &str {
        &self.name
    }

    fn start_state(&self) -> ModeState {
        Box::new(KeywordState::default())
    }

    fn token(&self, stream: &mut LineStream<'_>, state: &mut dyn Any) -> Option<Style> {
        let Some(state) = state.downcast_mut::<KeywordState>() else {
            stream.skip_to_end();
            return None;
        };
        state.tokens += 1;

        if let Some(quote) = state.in_string {
            self.string_body(stream, state, quote);
            return Some(STRING.to_string());
        }
        if stream.eat_space() {
            return None;
        }

        let c = stream.peek()?;
        if c == '\'' || c == '"' {
            stream.next_char();
            state.in_string = Some(c);
            return Some(STRING.to_string());
        }
        if c.is_ascii_digit() {
            stream.eat_while(|c| c.is_ascii_digit() || c == '.');
            return Some(NUMBER.to_string());
        }
        if c.is_alphabetic() || c == '_' {
            stream.eat_while(|c| c.is_alphanumeric() || c == '_');
            return if self.is_keyword(stream.current()) {
                Some(KEYWORD.to_string())
            } else if self.style_identifiers {
                Some(VARIABLE.to_string())
            } else {
                None
            };
        }
        if OPERATOR_CHARS.contains(c) {
            stream.eat_while(|c| OPERATOR_CHARS.contains(c));
            return Some(OPERATOR.to_string());
        }
        stream.next_char();
        None
    }

    fn copy_state(&self, state: &dyn Any) -> ModeState {
        Box::new(
            state
                .downcast_ref::<KeywordState>()
                .cloned()
                .unwrap_or_default(),
        )
    }

    fn indent(&self, state: &dyn Any, _text_after: &str) -> Option<usize> {
        let state = state.downcast_ref::<KeywordState>()?;
        state.in_string.map(|_| self.indent_unit)
    }
}
