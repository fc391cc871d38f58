//! Error types for grammar construction and tokenizing
//!
//! Two families exist:
//! - [`GrammarError`] - the grammar author produced an inconsistent pattern
//!   model (detected when the grammar is built or loaded)
//! - [`TokenizeError`] - an internal invariant broke while tokenizing a line
//!
//! "No transition found", an exhausted escape search and a missing sub-mode
//! are not errors and never surface here.

use std::fmt;

/// Error raised while building, validating or loading a grammar
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrammarError {
    /// A child or root reference names a pattern that was never defined
    UnknownPattern {
        /// The unresolved pattern name
        name: String,
    },

    /// A child id points outside the pattern arena
    DanglingChild {
        /// Pattern holding the bad reference
        parent: String,
        /// The out-of-range id
        child: usize,
    },

    /// A non-root pattern can never be entered because it has no opener
    MissingOpen {
        /// Pattern name
        pattern: String,
    },

    /// Both `include_pattern` and `pattern_styles` were requested
    ConflictingDelimiters {
        /// Pattern name
        pattern: String,
    },

    /// A regular expression failed to compile
    InvalidRegex {
        /// The offending source
        source: String,
        /// Message from the regex engine
        message: String,
    },

    /// A custom matcher name was not found in the registry
    UnknownMatcher {
        /// Matcher name
        name: String,
    },

    /// A sub-mode name was not found in the registry
    UnknownMode {
        /// Mode name
        name: String,
    },

    /// The JSON grammar description could not be decoded
    Json {
        /// Message from serde_json
        message: String,
    },
}

impl fmt::Display for GrammarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrammarError::UnknownPattern { name } => {
                write!(f, "Unknown pattern: {:?}", name)
            }
            GrammarError::DanglingChild { parent, child } => {
                write!(
                    f,
                    "Pattern {:?} references missing child id {}",
                    parent, child
                )
            }
            GrammarError::MissingOpen { pattern } => {
                write!(f, "Pattern {:?} has no opener", pattern)
            }
            GrammarError::ConflictingDelimiters { pattern } => {
                write!(
                    f,
                    "Pattern {:?} sets both include_pattern and pattern_styles",
                    pattern
                )
            }
            GrammarError::InvalidRegex { source, message } => {
                write!(f, "Invalid regex {:?}: {}", source, message)
            }
            GrammarError::UnknownMatcher { name } => {
                write!(f, "Unknown custom matcher: {:?}", name)
            }
            GrammarError::UnknownMode { name } => {
                write!(f, "Unknown sub-mode: {:?}", name)
            }
            GrammarError::Json { message } => {
                write!(f, "Invalid grammar JSON: {}", message)
            }
        }
    }
}

impl std::error::Error for GrammarError {}

impl From<serde_json::Error> for GrammarError {
    fn from(err: serde_json::Error) -> Self {
        GrammarError::Json {
            message: err.to_string(),
        }
    }
}

/// Error raised while tokenizing a line
///
/// Every variant indicates a gap in the layer computation or a broken
/// grammar callback. The dispatcher abandons the current line when it
/// returns one of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenizeError {
    /// The stream cursor does not sit on the boundary the next layer expects
    Misaligned {
        /// Current cursor position
        position: usize,
        /// Position of the pending layer
        expected: usize,
    },

    /// A matcher returned a position outside the line or off a char boundary
    InvalidMatch {
        /// Reported match position
        position: usize,
        /// Line length in bytes
        line_len: usize,
    },

    /// A regex used by the grammar failed to compile
    InvalidRegex {
        /// The normalized source
        source: String,
    },

    /// Pattern nesting exceeded the configured limit
    DepthLimitExceeded {
        /// Depth that would have been reached
        depth: usize,
        /// Configured maximum
        max_depth: usize,
    },

    /// A single line produced more transitions than allowed
    LayerLimitExceeded {
        /// Configured maximum
        max_layers: usize,
    },

    /// Internal error (shouldn't happen in normal use)
    Internal {
        /// Error message describing the internal error
        message: String,
    },
}

impl fmt::Display for TokenizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenizeError::Misaligned { position, expected } => {
                write!(
                    f,
                    "Cursor at {} does not align with layer boundary at {}",
                    position, expected
                )
            }
            TokenizeError::InvalidMatch { position, line_len } => {
                write!(
                    f,
                    "Matcher returned position {} for a line of {} bytes",
                    position, line_len
                )
            }
            TokenizeError::InvalidRegex { source } => {
                write!(f, "Invalid regex pattern: {}", source)
            }
            TokenizeError::DepthLimitExceeded { depth, max_depth } => {
                write!(
                    f,
                    "Nesting limit exceeded: depth {} exceeds limit of {}",
                    depth, max_depth
                )
            }
            TokenizeError::LayerLimitExceeded { max_layers } => {
                write!(f, "Line produced more than {} transitions", max_layers)
            }
            TokenizeError::Internal { message } => {
                write!(f, "Internal error: {}", message)
            }
        }
    }
}

impl std::error::Error for TokenizeError {}
