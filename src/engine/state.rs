//! Per-document tokenizer state
//!
//! [`OverlayState`] holds everything needed to resume tokenizing at a line
//! boundary: the pattern-context stack, the embedded-mode-state stack, the
//! custom scratch map and the current line's scan. The host keeps one per
//! document (or per checkpoint) and clones it to take a snapshot; clones
//! share stack links and copy a mode state only when one of them writes
//! to it.

use super::grammar::{Grammar, Pattern, PatternId};
use super::matcher::Scratch;
use super::mode::{ModeFrame, ModeRef};
use super::scanner::{Direction, Layer};
use super::stack::LinkedStack;
use std::any::Any;
use std::rc::Rc;

/// Scan results for the line being tokenized
#[derive(Debug, Clone)]
pub struct LineScan {
    /// Un-styled text on the current line since the last transition
    pub text_before: String,
    /// Whether the next token request must rescan
    pub needs_scan: bool,
    /// Transitions of the current line, in order
    pub layers: Vec<Layer>,
    /// Index of the first unconsumed layer
    pub next: usize,
    /// Whether the mode-stack effect of `layers[next]` was already applied
    pub synced: bool,
}

impl Default for LineScan {
    fn default() -> Self {
        Self {
            text_before: String::new(),
            needs_scan: true,
            layers: Vec::new(),
            next: 0,
            synced: false,
        }
    }
}

impl LineScan {
    /// The first unconsumed layer
    #[inline]
    pub fn pending(&self) -> Option<&Layer> {
        self.layers.get(self.next)
    }

    /// Mark the pending layer as consumed
    #[inline]
    pub fn advance(&mut self) {
        self.next += 1;
        self.synced = false;
    }

    /// Drop the scan so that the next request rescans
    pub fn discard(&mut self) {
        self.layers.clear();
        self.next = 0;
        self.synced = false;
        self.needs_scan = true;
    }
}

/// Resumable tokenizer state of one document
#[derive(Debug, Clone)]
pub struct OverlayState {
    pub(crate) grammar: Rc<Grammar>,
    pub(crate) patterns: LinkedStack<PatternId>,
    pub(crate) modes: LinkedStack<ModeFrame>,
    pub(crate) scratch: Scratch,
    pub(crate) line: LineScan,
}

impl OverlayState {
    /// Start-of-document state: only the root is active
    pub fn new(grammar: Rc<Grammar>) -> Self {
        let mut patterns = LinkedStack::new();
        patterns.push(grammar.root());
        let mut modes = LinkedStack::new();
        if let Some(mode) = &grammar.root_pattern().mode {
            modes.push(ModeFrame::start(Rc::clone(mode)));
        }
        Self {
            grammar,
            patterns,
            modes,
            scratch: Scratch::default(),
            line: LineScan::default(),
        }
    }

    /// Grammar this state belongs to
    #[inline]
    pub fn grammar(&self) -> &Rc<Grammar> {
        &self.grammar
    }

    /// Active pattern
    #[inline]
    pub fn active_pattern(&self) -> PatternId {
        self.patterns.peek().copied().unwrap_or(self.grammar.root())
    }

    /// Pattern-context stack depth (root counts as 1)
    #[inline]
    pub fn pattern_depth(&self) -> usize {
        self.patterns.len()
    }

    /// Embedded-mode-state stack depth
    #[inline]
    pub fn mode_depth(&self) -> usize {
        self.modes.len()
    }

    /// Active patterns from the root up
    pub fn pattern_path(&self) -> Vec<PatternId> {
        let mut path: Vec<PatternId> = self.patterns.iter().copied().collect();
        path.reverse();
        path
    }

    /// Names of the active sub-modes from the outermost in
    pub fn mode_path(&self) -> Vec<String> {
        let mut path: Vec<String> = self
            .modes
            .iter()
            .map(|frame| frame.mode.name().to_string())
            .collect();
        path.reverse();
        path
    }

    /// Active sub-mode and its state
    pub fn active_mode(&self) -> Option<(&ModeRef, &dyn Any)> {
        self.modes
            .peek()
            .map(|frame| (&frame.mode, &*frame.state as &dyn Any))
    }

    /// Custom scratch values
    #[inline]
    pub fn scratch(&self) -> &Scratch {
        &self.scratch
    }

    /// Mutable custom scratch values
    #[inline]
    pub fn scratch_mut(&mut self) -> &mut Scratch {
        &mut self.scratch
    }

    /// Text since the last transition
    #[inline]
    pub fn text_before(&self) -> &str {
        &self.line.text_before
    }

    /// Layers of the line being tokenized
    #[inline]
    pub fn layers(&self) -> &[Layer] {
        &self.line.layers
    }

    /// Whether two states share their stack tops (cheap snapshot check)
    pub fn shares_stacks_with(&self, other: &OverlayState) -> bool {
        self.patterns.shares_top_with(&other.patterns) && self.modes.shares_top_with(&other.modes)
    }

    /// Apply the embedded-mode effect of `layer`
    pub(crate) fn apply_mode_effect(&mut self, layer: &Layer) {
        match layer.direction {
            Direction::Open => {
                let mode = self.grammar.pattern(layer.after).mode.clone();
                if let Some(mode) = mode {
                    self.modes.push(ModeFrame::start(mode));
                }
            }
            Direction::Close => {
                if self.grammar.pattern(layer.before).mode.is_some() {
                    self.modes.discard();
                }
            }
        }
    }

    /// Pattern whose delimiter `layer` is
    #[inline]
    pub(crate) fn layer_pattern(&self, layer: &Layer) -> &Pattern {
        self.grammar.pattern(layer.pattern())
    }
}
