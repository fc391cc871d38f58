//! Configuration surface
//!
//! An [`OverlayConfig`] is a record of optional settings. [`OverlayBuilder`]
//! composes two of them, the fixed defaults (normally the
//! [`preset`](super::preset)) and the caller's overrides:
//!
//! - every plain field takes the override when it is set
//! - the four lifecycle hooks run the default first, then the override
//! - override pattern declarations replace preset ones with the same name
//!
//! # Example
//!
//! ```
//! use modelayer::engine::{KeywordMode, OverlayBuilder};
//! use std::rc::Rc;
//!
//! let mode = OverlayBuilder::new()
//!     .mode(Rc::new(KeywordMode::new("sql", ["select", "where"])))
//!     .code_mode(Rc::new(KeywordMode::new("groovy", ["if", "else"])))
//!     .build()
//!     .unwrap();
//! let lines = mode.tokenize_text("where #{x}").lines;
//! assert_eq!(lines[0][0].style.as_deref(), Some("keyword"));
//! ```

use super::dispatcher::OverlayMode;
use super::error::GrammarError;
use super::grammar::{Delimiters, Grammar, GrammarBuilder, Pattern};
use super::hooks::{HookContext, HookPoint, LifecycleHooks};
use super::matcher::MatcherSpec;
use super::mode::{ModeRef, Style};
use super::preset;
use super::scanner::ScanLimits;
use std::fmt;
use std::rc::Rc;

/// A named pattern with its children given by name
#[derive(Debug, Clone)]
pub struct PatternDecl {
    /// The pattern (its `children` ids are ignored)
    pub pattern: Pattern,
    /// Child pattern names in priority order
    pub children: Vec<String>,
}

impl PatternDecl {
    /// Declare `pattern` with `children`
    pub fn new(pattern: Pattern, children: &[&str]) -> Self {
        Self {
            pattern,
            children: children.iter().map(|c| c.to_string()).collect(),
        }
    }

    /// Pattern name
    #[inline]
    pub fn name(&self) -> &str {
        &self.pattern.name
    }
}

/// Optional settings of an overlay mode
#[derive(Clone, Default)]
pub struct OverlayConfig {
    /// Mode name
    pub name: Option<String>,
    /// Host sub-mode active at the root
    pub mode: Option<ModeRef>,
    /// Sub-mode of code expressions
    pub code_mode: Option<ModeRef>,
    /// Root opener (kept for debug output and export)
    pub open: Option<MatcherSpec>,
    /// Root closer (kept for debug output and export)
    pub close: Option<MatcherSpec>,
    /// Root escape
    pub escape: Option<MatcherSpec>,
    /// Root children by name
    pub children: Option<Vec<String>>,
    /// Additional or replacement patterns
    pub patterns: Vec<PatternDecl>,
    /// Hand root delimiters to the inner mode
    pub include_pattern: Option<bool>,
    /// Style root delimiters directly
    pub pattern_styles: Option<(Style, Style)>,
    /// Lifecycle hooks
    pub hooks: LifecycleHooks,
    /// Scan limits
    pub limits: Option<ScanLimits>,
}

impl OverlayConfig {
    /// Empty configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Field-by-field composition with `overrides` taking precedence
    pub fn merge(&self, overrides: &OverlayConfig) -> OverlayConfig {
        let mut patterns = self.patterns.clone();
        for decl in &overrides.patterns {
            match patterns.iter_mut().find(|d| d.name() == decl.name()) {
                Some(existing) => *existing = decl.clone(),
                None => patterns.push(decl.clone()),
            }
        }

        OverlayConfig {
            name: overrides.name.clone().or_else(|| self.name.clone()),
            mode: overrides.mode.clone().or_else(|| self.mode.clone()),
            code_mode: overrides.code_mode.clone().or_else(|| self.code_mode.clone()),
            open: overrides.open.clone().or_else(|| self.open.clone()),
            close: overrides.close.clone().or_else(|| self.close.clone()),
            escape: overrides.escape.clone().or_else(|| self.escape.clone()),
            children: overrides.children.clone().or_else(|| self.children.clone()),
            patterns,
            include_pattern: overrides.include_pattern.or(self.include_pattern),
            pattern_styles: overrides
                .pattern_styles
                .clone()
                .or_else(|| self.pattern_styles.clone()),
            hooks: self.hooks.chain(&overrides.hooks),
            limits: overrides.limits.or(self.limits),
        }
    }
}

impl fmt::Debug for OverlayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OverlayConfig")
            .field("name", &self.name)
            .field("mode", &self.mode.as_ref().map(|m| m.name().to_string()))
            .field(
                "code_mode",
                &self.code_mode.as_ref().map(|m| m.name().to_string()),
            )
            .field("open", &self.open)
            .field("close", &self.close)
            .field("escape", &self.escape)
            .field("children", &self.children)
            .field("patterns", &self.patterns)
            .field("include_pattern", &self.include_pattern)
            .field("pattern_styles", &self.pattern_styles)
            .field("hooks", &self.hooks)
            .field("limits", &self.limits)
            .finish()
    }
}

/// Builds an [`OverlayMode`] from defaults plus overrides
#[derive(Debug, Clone)]
pub struct OverlayBuilder {
    defaults: OverlayConfig,
    overrides: OverlayConfig,
    with_preset: bool,
}

impl OverlayBuilder {
    /// Builder starting from the template preset
    pub fn new() -> Self {
        Self {
            defaults: preset::default_config(),
            overrides: OverlayConfig::default(),
            with_preset: true,
        }
    }

    /// Builder with no preset patterns, hooks or children
    pub fn bare() -> Self {
        Self {
            defaults: OverlayConfig::default(),
            overrides: OverlayConfig::default(),
            with_preset: false,
        }
    }

    /// Replace the override record wholesale
    pub fn overrides(mut self, overrides: OverlayConfig) -> Self {
        self.overrides = overrides;
        self
    }

    /// Set the mode name
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.overrides.name = Some(name.into());
        self
    }

    /// Set the host sub-mode
    pub fn mode(mut self, mode: ModeRef) -> Self {
        self.overrides.mode = Some(mode);
        self
    }

    /// Set the code expression sub-mode
    pub fn code_mode(mut self, mode: ModeRef) -> Self {
        self.overrides.code_mode = Some(mode);
        self
    }

    /// Set the root opener
    pub fn open(mut self, spec: impl Into<MatcherSpec>) -> Self {
        self.overrides.open = Some(spec.into());
        self
    }

    /// Set the root closer
    pub fn close(mut self, spec: impl Into<MatcherSpec>) -> Self {
        self.overrides.close = Some(spec.into());
        self
    }

    /// Set the root escape
    pub fn escape(mut self, spec: impl Into<MatcherSpec>) -> Self {
        self.overrides.escape = Some(spec.into());
        self
    }

    /// Replace the root children
    pub fn children(mut self, names: &[&str]) -> Self {
        self.overrides.children = Some(names.iter().map(|n| n.to_string()).collect());
        self
    }

    /// Add a pattern, or replace the one with the same name
    pub fn pattern(mut self, pattern: Pattern, children: &[&str]) -> Self {
        self.overrides.patterns.push(PatternDecl::new(pattern, children));
        self
    }

    /// Hand root delimiters to the inner mode
    pub fn include_pattern(mut self, include: bool) -> Self {
        self.overrides.include_pattern = Some(include);
        self
    }

    /// Style root delimiters directly
    pub fn pattern_styles(mut self, open: impl Into<Style>, close: impl Into<Style>) -> Self {
        self.overrides.pattern_styles = Some((open.into(), close.into()));
        self
    }

    /// Add a hook, run after any default hook for the same point
    pub fn hook(mut self, point: HookPoint, f: impl Fn(&mut HookContext<'_>) + 'static) -> Self {
        let extra = LifecycleHooks::new().with(point, f);
        self.overrides.hooks = self.overrides.hooks.chain(&extra);
        self
    }

    /// Shorthand for [`HookPoint::BeforeEnter`]
    pub fn before_enter(self, f: impl Fn(&mut HookContext<'_>) + 'static) -> Self {
        self.hook(HookPoint::BeforeEnter, f)
    }

    /// Shorthand for [`HookPoint::AfterEnter`]
    pub fn after_enter(self, f: impl Fn(&mut HookContext<'_>) + 'static) -> Self {
        self.hook(HookPoint::AfterEnter, f)
    }

    /// Shorthand for [`HookPoint::BeforeExit`]
    pub fn before_exit(self, f: impl Fn(&mut HookContext<'_>) + 'static) -> Self {
        self.hook(HookPoint::BeforeExit, f)
    }

    /// Shorthand for [`HookPoint::AfterExit`]
    pub fn after_exit(self, f: impl Fn(&mut HookContext<'_>) + 'static) -> Self {
        self.hook(HookPoint::AfterExit, f)
    }

    /// Set the scan limits
    pub fn limits(mut self, limits: ScanLimits) -> Self {
        self.overrides.limits = Some(limits);
        self
    }

    /// The composed configuration
    pub fn config(&self) -> OverlayConfig {
        self.defaults.merge(&self.overrides)
    }

    /// Build only the grammar
    pub fn build_grammar(&self) -> Result<Grammar, GrammarError> {
        let config = self.config();
        self.grammar_from(&config)
    }

    /// Build the tokenizer
    pub fn build(&self) -> Result<OverlayMode, GrammarError> {
        let config = self.config();
        let grammar = self.grammar_from(&config)?;
        let name = config
            .name
            .clone()
            .unwrap_or_else(|| preset::MODE_NAME.to_string());
        Ok(OverlayMode::new(name, Rc::new(grammar)).with_limits(config.limits.unwrap_or_default()))
    }

    fn grammar_from(&self, config: &OverlayConfig) -> Result<Grammar, GrammarError> {
        let base = if self.with_preset {
            preset::patterns(config.code_mode.clone())
        } else {
            Vec::new()
        };
        let decls = OverlayConfig {
            patterns: base,
            ..OverlayConfig::default()
        }
        .merge(config)
        .patterns;

        let mut root = Pattern::new(preset::ROOT);
        root.mode = config.mode.clone();
        root.open = config.open.clone();
        root.close = config.close.clone();
        root.escape = config.escape.clone();
        root.delimiters = Delimiters::from_options(
            preset::ROOT,
            config.include_pattern.unwrap_or(false),
            config.pattern_styles.clone(),
        )?;

        let mut builder = GrammarBuilder::new();
        let root_id = builder.add(root);
        let root_children = config.children.clone().unwrap_or_default();
        let root_children: Vec<&str> = root_children.iter().map(String::as_str).collect();
        builder.child_names(root_id, &root_children);

        for decl in decls {
            let children: Vec<&str> = decl.children.iter().map(String::as_str).collect();
            let mut pattern = decl.pattern.clone();
            pattern.children.clear();
            let id = builder.add(pattern);
            builder.child_names(id, &children);
        }

        builder.root(root_id).hooks(config.hooks.clone()).build()
    }
}

impl Default for OverlayBuilder {
    fn default() -> Self {
        Self::new()
    }
}
