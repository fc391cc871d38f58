//! Layered tokenizer engine
//!
//! This module contains the matching-and-layering engine: the pattern
//! model, delimiter matching, the per-line layer scanner, the persistent
//! stacks and the token dispatcher that hands byte ranges to embedded
//! sub-modes.
//!
//! # Module Organization
//!
//! ## Pattern Model
//! - [`Grammar`] - Immutable arena of patterns
//! - [`Pattern`] - A nestable, delimited region
//! - [`GrammarBuilder`] - Construction with forward references
//!
//! ## Matching
//! - [`matcher`] - Literal, regex and callback delimiters
//! - [`regex_cache`] - Anchor normalization and compiled regex cache
//!
//! ## Scanning
//! - [`LayerScanner`] - Transitions of one line
//! - [`hooks`] - Lifecycle hooks around transitions
//!
//! ## Tokenizing
//! - [`OverlayMode`] - Host-facing tokenizer
//! - [`OverlayState`] - Resumable per-document state
//! - [`SubMode`] - Contract of embedded tokenizers
//!
//! ## Configuration
//! - [`OverlayBuilder`] - Defaults plus overrides
//! - [`preset`] - The template grammar
//! - [`loader`] - JSON grammar descriptions
//!
//! ## Tools
//! - [`incremental`] - Per-line checkpoints
//! - [`debug`] - Text renderings

// ============================================================================
// Module Declarations
// ============================================================================

pub mod config;
pub mod debug;
pub mod dispatcher;
pub mod error;
pub mod grammar;
pub mod hooks;
pub mod incremental;
pub mod keyword_mode;
pub mod loader;
pub mod matcher;
pub mod mode;
pub mod preset;
pub mod regex_cache;
pub mod scanner;
pub mod stack;
pub mod state;
pub mod stream;

// ============================================================================
// Pattern Model
// ============================================================================

pub use grammar::{
    Delimiters, Grammar, GrammarBuilder, GrammarWarning, Pattern, PatternId, WarningKind,
};

// ============================================================================
// Error Handling
// ============================================================================

pub use error::{GrammarError, TokenizeError};

// ============================================================================
// Matching
// ============================================================================

pub use matcher::{
    find_unescaped, try_match, CustomMatcher, FnMatcher, Match, MatchMode, MatcherSpec,
    RegexSpec, ScanContext, Scratch,
};

pub use regex_cache::{stats as regex_stats, Anchor, CacheStats, RegexFlags};

// ============================================================================
// Scanning
// ============================================================================

pub use hooks::{Hook, HookContext, HookPoint, LifecycleHooks};
pub use scanner::{
    Direction, Layer, LayerScanner, ScanLimits, BLANK_BEFORE_LINE, DEFAULT_MAX_DEPTH,
    DEFAULT_MAX_LAYERS_PER_LINE,
};

// ============================================================================
// Stacks and State
// ============================================================================

pub use mode::{ModeFrame, ModeRef, ModeState, Style, SubMode};
pub use stack::LinkedStack;
pub use state::{LineScan, OverlayState};
pub use stream::LineStream;

// ============================================================================
// Tokenizing
// ============================================================================

pub use dispatcher::{OverlayMode, Token, TokenizedText};
pub use keyword_mode::{KeywordMode, KeywordState};

// ============================================================================
// Configuration
// ============================================================================

pub use config::{OverlayBuilder, OverlayConfig, PatternDecl};
pub use loader::{GrammarRegistry, GrammarSpec, MatcherDef, PatternDef};
pub use preset::TemplateOpener;

// ============================================================================
// Tools
// ============================================================================

pub use debug::{coalesce, layers_to_json, render_tokens, GrammarVisualizer, LayerPrinter};
pub use incremental::{IncrementalHighlighter, IncrementalResult, LineEdit};
