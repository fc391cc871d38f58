//! Layer scanner
//!
//! For one line, the scanner repeatedly looks for the nearest transition out
//! of the active pattern (its closer) or into one of its children (their
//! openers), applies it to the pattern-context stack and records it as a
//! [`Layer`]. The dispatcher later walks these layers to decide who
//! tokenizes which byte range.
//!
//! # Tie-breaking
//!
//! - the nearest match wins
//! - the closer wins over an opener at the same position
//! - among openers at the same position, the first declared child wins

use super::error::TokenizeError;
use super::grammar::{Grammar, PatternId};
use super::hooks::{HookContext, HookPoint};
use super::matcher::{find_unescaped, Match, ScanContext, Scratch};
use super::stack::LinkedStack;
use serde::{Deserialize, Serialize};

/// Default maximum pattern nesting depth
pub const DEFAULT_MAX_DEPTH: usize = 1000;

/// Default maximum number of transitions on a single line
pub const DEFAULT_MAX_LAYERS_PER_LINE: usize = 10_000;

/// Scratch key: only whitespace was skipped on earlier lines since the
/// last transition
pub const BLANK_BEFORE_LINE: &str = "blank_before_line";

/// Direction of a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// A child pattern was entered
    Open,
    /// The active pattern was exited
    Close,
}

/// One transition found on a line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layer {
    /// Byte offset of the delimiter
    pub position: usize,
    /// Delimiter text; `None` for zero-width matches
    pub text: Option<String>,
    /// Opening or closing
    pub direction: Direction,
    /// Active pattern before the transition
    pub before: PatternId,
    /// Active pattern after the transition
    pub after: PatternId,
}

impl Layer {
    /// Delimiter length in bytes
    #[inline]
    pub fn len(&self) -> usize {
        self.text.as_ref().map_or(0, String::len)
    }

    /// Whether the delimiter is zero-width
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Offset just past the delimiter
    #[inline]
    pub fn end(&self) -> usize {
        self.position + self.len()
    }

    /// The pattern whose delimiter this is
    #[inline]
    pub fn pattern(&self) -> PatternId {
        match self.direction {
            Direction::Open => self.after,
            Direction::Close => self.before,
        }
    }
}

/// Safety limits for a scan
///
/// # Example
///
/// ```
/// use modelayer::engine::ScanLimits;
///
/// let limits = ScanLimits::new()
///     .with_max_depth(64)
///     .with_max_layers_per_line(512);
/// assert_eq!(limits.max_depth, 64);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanLimits {
    /// Maximum pattern-context depth, root included
    pub max_depth: usize,
    /// Maximum transitions recorded for one line
    pub max_layers_per_line: usize,
}

impl Default for ScanLimits {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_layers_per_line: DEFAULT_MAX_LAYERS_PER_LINE,
        }
    }
}

impl ScanLimits {
    /// Limits with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum nesting depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Set the maximum number of transitions per line
    pub fn with_max_layers_per_line(mut self, layers: usize) -> Self {
        self.max_layers_per_line = layers;
        self
    }
}

/// Computes the layers of a line
#[derive(Debug, Clone, Copy)]
pub struct LayerScanner<'g> {
    grammar: &'g Grammar,
    limits: ScanLimits,
}

impl<'g> LayerScanner<'g> {
    /// Scanner over `grammar`
    #[inline]
    pub fn new(grammar: &'g Grammar, limits: ScanLimits) -> Self {
        Self { grammar, limits }
    }

    /// Scan `line` from `start`, updating `patterns` and `text_before`
    ///
    /// `text_before` holds this line's text only. Text not consumed by a
    /// transition is appended to it and the buffer is cleared at every
    /// transition. Whether the line ends with nothing but whitespace since
    /// the last transition is kept in `scratch` under [`BLANK_BEFORE_LINE`].
    pub fn scan_line(
        &self,
        patterns: &mut LinkedStack<PatternId>,
        line: &str,
        start: usize,
        text_before: &mut String,
        scratch: &mut Scratch,
    ) -> Result<Vec<Layer>, TokenizeError> {
        let mut layers = Vec::new();
        let mut offset = start.min(line.len());
        let mut blank_before_line = !matches!(
            scratch.get(BLANK_BEFORE_LINE),
            Some(serde_json::Value::Bool(false))
        );

        loop {
            let current = *patterns.peek().ok_or_else(|| TokenizeError::Internal {
                message: "pattern-context stack is empty".to_string(),
            })?;

            let ctx = ScanContext {
                text_before: text_before.as_str(),
                blank_before_line,
                scratch: &*scratch,
            };
            let Some((found, direction, target)) =
                self.next_transition(patterns, current, line, offset, &ctx)?
            else {
                text_before.push_str(&line[offset..]);
                break;
            };

            text_before.push_str(&line[offset..found.position]);

            let after = match direction {
                Direction::Open => {
                    if patterns.len() >= self.limits.max_depth {
                        return Err(TokenizeError::DepthLimitExceeded {
                            depth: patterns.len() + 1,
                            max_depth: self.limits.max_depth,
                        });
                    }
                    self.run_hook(HookPoint::BeforeEnter, target, patterns, text_before, scratch);
                    patterns.push(target);
                    self.run_hook(HookPoint::AfterEnter, target, patterns, text_before, scratch);
                    target
                }
                Direction::Close => {
                    self.run_hook(HookPoint::BeforeExit, current, patterns, text_before, scratch);
                    patterns.discard();
                    self.run_hook(HookPoint::AfterExit, current, patterns, text_before, scratch);
                    *patterns.peek().ok_or_else(|| TokenizeError::Internal {
                        message: "closed the root pattern".to_string(),
                    })?
                }
            };
            text_before.clear();
            blank_before_line = true;

            log_trace!(
                "{:?} {} at {} ({:?})",
                direction,
                self.grammar.pattern(target).name,
                found.position,
                found.text
            );

            offset = found.end();
            layers.push(Layer {
                position: found.position,
                text: found.text,
                direction,
                before: current,
                after,
            });
            if layers.len() > self.limits.max_layers_per_line {
                return Err(TokenizeError::LayerLimitExceeded {
                    max_layers: self.limits.max_layers_per_line,
                });
            }
        }

        let blank = blank_before_line && text_before.chars().all(char::is_whitespace);
        scratch.insert(
            BLANK_BEFORE_LINE.to_string(),
            serde_json::Value::Bool(blank),
        );
        Ok(layers)
    }

    /// Nearest closer or opener at or after `offset`
    fn next_transition(
        &self,
        patterns: &LinkedStack<PatternId>,
        current: PatternId,
        line: &str,
        offset: usize,
        ctx: &ScanContext<'_>,
    ) -> Result<Option<(Match, Direction, PatternId)>, TokenizeError> {
        let pattern = self.grammar.pattern(current);
        let mut best: Option<(Match, Direction, PatternId)> = None;

        // The root is never popped
        if patterns.len() > 1 {
            if let Some(close) = &pattern.close {
                if let Some(m) = find_unescaped(line, offset, close, pattern.escape.as_ref(), ctx)? {
                    best = Some((m, Direction::Close, current));
                }
            }
        }

        for &child_id in &pattern.children {
            let child = self.grammar.pattern(child_id);
            let Some(open) = &child.open else {
                continue;
            };
            if let Some(m) = find_unescaped(line, offset, open, child.escape.as_ref(), ctx)? {
                // Strictly nearer only: ties keep the closer or the earlier child
                if best.as_ref().map_or(true, |(b, _, _)| m.position < b.position) {
                    best = Some((m, Direction::Open, child_id));
                }
            }
        }

        Ok(best)
    }

    fn run_hook(
        &self,
        point: HookPoint,
        id: PatternId,
        patterns: &LinkedStack<PatternId>,
        text_before: &str,
        scratch: &mut Scratch,
    ) {
        let mut ctx = HookContext {
            id,
            pattern: self.grammar.pattern(id),
            text_before,
            scratch,
            depth: patterns.len(),
        };
        self.grammar.hooks().run(point, &mut ctx);
    }
}
