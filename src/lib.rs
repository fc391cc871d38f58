//! Modelayer - Incremental Layered Tokenizer
//!
//! Tokenizes a host language that embeds a templating layer, which in turn
//! embeds a code-expression language. Each layer is delimited by nested
//! open/close markers with optional escapes. It provides:
//! - A pattern model with literal, regex and callback delimiters
//! - A per-line layer scanner with lifecycle hooks
//! - Persistent, cheaply cloneable tokenizer state
//! - Delegation of text to embedded sub-modes through a small trait
//! - A ready-made template preset and JSON grammar descriptions
//! - Incremental re-highlighting from per-line checkpoints
//!
//! ## Quick Start
//!
//! ```rust
//! use modelayer::prelude::*;
//! use std::rc::Rc;
//!
//! let mode = OverlayBuilder::new()
//!     .mode(Rc::new(KeywordMode::new("sql", ["where"])))
//!     .code_mode(Rc::new(KeywordMode::new("groovy", ["if"])))
//!     .build()
//!     .unwrap();
//!
//! let line = "where #[if][#{x==1}][a=1][a=0]";
//! let mut state = mode.start_state();
//! let tokens = mode.tokenize_line(line, &mut state).unwrap();
//!
//! assert_eq!(tokens[0].text(line), "where");
//! assert_eq!(tokens[0].style.as_deref(), Some("keyword"));
//! assert_eq!(tokens[2].text(line), "#[");
//! assert_eq!(tokens[2].style.as_deref(), Some("meta"));
//! ```
//!
//! ## Building Grammars by Hand
//!
//! ```rust
//! use modelayer::prelude::*;
//! use std::rc::Rc;
//!
//! let mut builder = GrammarBuilder::new();
//! let root = builder.add(Pattern::new("root"));
//! let quote = builder.add(Pattern::new("quote").open("'").close("'").escape("\\"));
//! builder.set_children(root, [quote]);
//! let grammar = builder.build().unwrap();
//!
//! let mode = OverlayMode::new("quotes", Rc::new(grammar));
//! let mut state = mode.start_state();
//! mode.tokenize_line("say 'it\\'s", &mut state).unwrap();
//! assert_eq!(state.pattern_depth(), 2);
//! ```
//!
//! ## Feature Flags
//!
//! - `logging` - Enable debug logging using the `log` crate

// Lint configuration for production quality
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(clippy::all)]
#![allow(clippy::new_without_default)]
#![allow(clippy::module_inception)]

#[macro_use]
mod macros;

// Prelude module for convenient imports
pub mod prelude;

// Matching-and-layering engine
pub mod engine;

/// Re-export commonly used types for convenience
pub use engine::{
    // Configuration
    config::{OverlayBuilder, OverlayConfig},
    // Debug tools
    debug::{render_tokens, GrammarVisualizer, LayerPrinter},
    // Incremental highlighting
    incremental::{IncrementalHighlighter, IncrementalResult, LineEdit},
    // JSON grammars
    loader::{GrammarRegistry, GrammarSpec},
    Grammar,
    GrammarBuilder,
    GrammarError,
    LineStream,
    OverlayMode,
    OverlayState,
    Pattern,
    SubMode,
    TokenizeError,
};
