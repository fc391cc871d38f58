//! Embedded sub-mode contract
//!
//! A sub-mode is an external tokenizer (the host language, the code
//! expression language, ...) that the engine delegates byte ranges to. The
//! engine never looks inside a sub-mode's state: states are opaque
//! [`ModeState`] boxes created, copied and consumed only by the mode that
//! owns them.

use super::stream::LineStream;
use std::any::Any;
use std::fmt;
use std::rc::Rc;

/// Style class assigned to a token (e.g. `"keyword"`, `"string"`)
pub type Style = String;

/// Opaque per-document state of a sub-mode
pub type ModeState = Box<dyn Any>;

/// Shared handle to a sub-mode
pub type ModeRef = Rc<dyn SubMode>;

/// Tokenizer supplied by the host for an embedded language
///
/// # Example
///
/// ```
/// use modelayer::engine::{LineStream, ModeState, Style, SubMode};
/// use std::any::Any;
///
/// /// Styles every run of digits as "number"
/// struct Digits;
///
/// impl SubMode for Digits {
///     fn name(&self) -> &str { "digits" }
///     fn start_state(&self) -> ModeState { Box::new(()) }
///     fn copy_state(&self, _state: &dyn Any) -> ModeState { Box::new(()) }
///     fn token(&self, stream: &mut LineStream<'_>, _state: &mut dyn Any) -> Option<Style> {
///         if stream.eat_while(|c| c.is_ascii_digit()) {
///             return Some("number".to_string());
///         }
///         stream.next_char();
///         None
///     }
/// }
/// ```
pub trait SubMode {
    /// Mode identifier, used in debug output and JSON grammars
    fn name(&self) -> &str;

    /// Fresh state for the first line inside this mode
    fn start_state(&self) -> ModeState;

    /// Consume one token from `stream` and return its style
    ///
    /// Must advance the stream. The engine backs the cursor up if the token
    /// runs past a delimiter boundary.
    fn token(&self, stream: &mut LineStream<'_>, state: &mut dyn Any) -> Option<Style>;

    /// Independent copy of `state`
    fn copy_state(&self, state: &dyn Any) -> ModeState;

    /// Indentation for a line starting with `text_after`; `None` passes
    fn indent(&self, _state: &dyn Any, _text_after: &str) -> Option<usize> {
        None
    }

    /// Called for empty lines while this mode is active
    fn blank_line(&self, _state: &mut dyn Any) {}
}

/// One entry of the embedded-mode-state stack
pub struct ModeFrame {
    /// Owning sub-mode
    pub mode: ModeRef,
    /// The mode's opaque state
    pub state: ModeState,
}

impl ModeFrame {
    /// Frame holding a fresh start state of `mode`
    pub fn start(mode: ModeRef) -> Self {
        let state = mode.start_state();
        Self { mode, state }
    }

    /// Delegate one token to the frame's mode
    #[inline]
    pub fn token(&mut self, stream: &mut LineStream<'_>) -> Option<Style> {
        self.mode.token(stream, &mut *self.state)
    }
}

// Copies go through the owning mode so that the state layout stays private
// to it.
impl Clone for ModeFrame {
    fn clone(&self) -> Self {
        Self {
            mode: Rc::clone(&self.mode),
            state: self.mode.copy_state(&*self.state),
        }
    }
}

impl fmt::Debug for ModeFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModeFrame")
            .field("mode", &self.mode.name())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct Counting {
        copies: Cell<usize>,
    }

    impl SubMode for Counting {
        fn name(&self) -> &str {
            "counting"
        }
        fn start_state(&self) -> ModeState {
            Box::new(0u32)
        }
        fn token(&self, stream: &mut LineStream<'_>, state: &mut dyn Any) -> Option<Style> {
            if let Some(n) = state.downcast_mut::<u32>() {
                *n += 1;
            }
            stream.next_char();
            None
        }
        fn copy_state(&self, state: &dyn Any) -> ModeState {
            self.copies.set(self.copies.get() + 1);
            Box::new(state.downcast_ref::<u32>().copied().unwrap_or_default())
        }
    }

    #[test]
    fn test_clone_delegates_to_mode() {
        let mode = Rc::new(Counting {
            copies: Cell::new(0),
        });
        let mut frame = ModeFrame::start(mode.clone());
        let mut stream = LineStream::new("ab");
        frame.token(&mut stream);

        let copy = frame.clone();
        assert_eq!(mode.copies.get(), 1);
        assert_eq!(copy.state.downcast_ref::<u32>(), Some(&1));

        frame.token(&mut stream);
        assert_eq!(frame.state.downcast_ref::<u32>(), Some(&2));
        assert_eq!(copy.state.downcast_ref::<u32>(), Some(&1));
    }
}
