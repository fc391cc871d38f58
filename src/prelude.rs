//! Prelude module for convenient imports
//!
//! This module re-exports the most commonly used types and traits from
//! modelayer. Importing this module with a wildcard import brings the core
//! types into scope:
//!
//! ```
//! use modelayer::prelude::*;
//! ```
//!
//! # Re-exported Items
//!
//! ## Building a Tokenizer
//! - [`OverlayBuilder`] - Preset defaults plus overrides
//! - [`GrammarBuilder`] - Hand-built grammars
//! - [`Pattern`] - A delimited region
//! - [`MatcherSpec`] - Literal, regex or callback delimiter
//!
//! ## Tokenizing
//! - [`OverlayMode`] - The tokenizer
//! - [`OverlayState`] - Per-document state
//! - [`LineStream`] - Line cursor
//! - [`SubMode`] - Embedded tokenizer contract
//!
//! ## Error Handling
//! - [`GrammarError`] - Grammar construction errors
//! - [`TokenizeError`] - Tokenizing errors

// ============================================================================
// Building a Tokenizer
// ============================================================================

pub use crate::engine::{
    GrammarBuilder, GrammarRegistry, HookPoint, LifecycleHooks, MatcherSpec, OverlayBuilder,
    Pattern, PatternId, ScanLimits,
};

// ============================================================================
// Tokenizing
// ============================================================================

pub use crate::engine::{
    IncrementalHighlighter, KeywordMode, LineStream, ModeRef, ModeState, OverlayMode,
    OverlayState, Style, SubMode, Token,
};

// ============================================================================
// Error Handling
// ============================================================================

pub use crate::engine::{GrammarError, TokenizeError};
