//! Line cursor handed to tokenizers
//!
//! [`LineStream`] is the host-side cursor over a single line. The host calls
//! [`LineStream::begin_token`] before each token request, the tokenizer
//! advances the cursor, and the consumed slice is then styled. Positions are
//! byte offsets that always sit on char boundaries.

use regex::Regex;

/// Cursor over one line of text
#[derive(Debug, Clone)]
pub struct LineStream<'a> {
    string: &'a str,
    pos: usize,
    start: usize,
}

impl<'a> LineStream<'a> {
    /// Create a cursor at the start of `line`
    #[inline]
    pub fn new(line: &'a str) -> Self {
        Self {
            string: line,
            pos: 0,
            start: 0,
        }
    }

    /// The whole line
    #[inline]
    pub fn string(&self) -> &'a str {
        self.string
    }

    /// Current cursor position
    #[inline]
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Start of the token being read
    #[inline]
    pub fn start(&self) -> usize {
        self.start
    }

    /// Mark the current position as the start of a new token
    #[inline]
    pub fn begin_token(&mut self) {
        self.start = self.pos;
    }

    /// At start of line
    #[inline]
    pub fn sol(&self) -> bool {
        self.pos == 0
    }

    /// At end of line
    #[inline]
    pub fn eol(&self) -> bool {
        self.pos >= self.string.len()
    }

    /// Text from the cursor to the end of the line
    #[inline]
    pub fn remaining(&self) -> &'a str {
        &self.string[self.pos..]
    }

    /// Text consumed since [`begin_token`](Self::begin_token)
    #[inline]
    pub fn current(&self) -> &'a str {
        &self.string[self.start..self.pos]
    }

    /// Next char without consuming it
    #[inline]
    pub fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    /// Consume and return the next char
    pub fn next_char(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    /// Consume the next char if it satisfies `pred`
    pub fn eat(&mut self, pred: impl Fn(char) -> bool) -> Option<char> {
        match self.peek() {
            Some(ch) if pred(ch) => {
                self.pos += ch.len_utf8();
                Some(ch)
            }
            _ => None,
        }
    }

    /// Consume chars while `pred` holds; returns whether anything was eaten
    pub fn eat_while(&mut self, pred: impl Fn(char) -> bool) -> bool {
        let from = self.pos;
        while self.eat(&pred).is_some() {}
        self.pos > from
    }

    /// Consume whitespace
    #[inline]
    pub fn eat_space(&mut self) -> bool {
        self.eat_while(char::is_whitespace)
    }

    /// Move to the end of the line
    #[inline]
    pub fn skip_to_end(&mut self) {
        self.pos = self.string.len();
    }

    /// Move to the next occurrence of `ch`; returns whether it was found
    pub fn skip_to(&mut self, ch: char) -> bool {
        match self.remaining().find(ch) {
            Some(offset) => {
                self.pos += offset;
                true
            }
            None => false,
        }
    }

    /// Move the cursor forward to `pos`, clamped to the line end
    ///
    /// Positions before the cursor or off a char boundary are ignored.
    pub fn advance_to(&mut self, pos: usize) {
        let pos = pos.min(self.string.len());
        if pos >= self.pos && self.string.is_char_boundary(pos) {
            self.pos = pos;
        }
    }

    /// Move the cursor back by `n` bytes (never before the token start)
    pub fn back_up(&mut self, n: usize) {
        let mut pos = self.pos.saturating_sub(n).max(self.start);
        while !self.string.is_char_boundary(pos) {
            pos += 1;
        }
        self.pos = pos;
    }

    /// Check whether the remaining text starts with `s`, optionally consuming it
    pub fn match_str(&mut self, s: &str, consume: bool) -> bool {
        if self.remaining().starts_with(s) {
            if consume {
                self.pos += s.len();
            }
            true
        } else {
            false
        }
    }

    /// Match `re` exactly at the cursor, optionally consuming it
    pub fn match_regex(&mut self, re: &Regex, consume: bool) -> Option<&'a str> {
        let m = re.find_at(self.string, self.pos)?;
        if m.start() != self.pos {
            return None;
        }
        if consume {
            self.pos = m.end();
        }
        Some(m.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_movement() {
        let mut s = LineStream::new("ab cd");
        assert!(s.sol());
        assert_eq!(s.next_char(), Some('a'));
        assert!(!s.sol());
        assert!(s.eat_while(|c| c != ' '));
        assert_eq!(s.current(), "ab");
        s.begin_token();
        assert!(s.eat_space());
        assert!(s.match_str("cd", true));
        assert!(s.eol());
        assert_eq!(s.next_char(), None);
    }

    #[test]
    fn test_back_up_stops_at_token_start() {
        let mut s = LineStream::new("hello");
        s.advance_to(2);
        s.begin_token();
        s.skip_to_end();
        s.back_up(10);
        assert_eq!(s.pos(), 2);
    }

    #[test]
    fn test_back_up_respects_char_boundaries() {
        let mut s = LineStream::new("aé");
        s.skip_to_end();
        s.back_up(1);
        // Cannot land inside the two-byte 'é'
        assert_eq!(s.pos(), 3);
        s.back_up(2);
        assert_eq!(s.pos(), 1);
    }

    #[test]
    fn test_match_regex_only_at_cursor() {
        let re = Regex::new("[0-9]+").unwrap();
        let mut s = LineStream::new("ab12");
        assert_eq!(s.match_regex(&re, true), None);
        s.advance_to(2);
        assert_eq!(s.match_regex(&re, true), Some("12"));
        assert!(s.eol());
    }

    #[test]
    fn test_skip_to() {
        let mut s = LineStream::new("abc]def");
        assert!(s.skip_to(']'));
        assert_eq!(s.pos(), 3);
        assert!(!s.skip_to('x'));
        assert_eq!(s.pos(), 3);
    }
}
