//! Pattern model
//!
//! A [`Grammar`] is an arena of [`Pattern`]s addressed by [`PatternId`].
//! Children are stored as ids, so a pattern may list itself or any ancestor
//! without creating ownership cycles. Grammars are immutable once built and
//! are shared (`Rc`) by every tokenizer state that uses them.

use super::error::GrammarError;
use super::hooks::LifecycleHooks;
use super::matcher::MatcherSpec;
use super::mode::{ModeRef, Style};
use super::regex_cache;
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a pattern inside its grammar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PatternId(pub usize);

impl PatternId {
    /// Position in the grammar's pattern arena
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// How a pattern's own delimiter text is tokenized
///
/// Exactly one treatment applies per pattern.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Delimiters {
    /// Delimiters go to the enclosing context's mode
    #[default]
    Plain,
    /// The opener goes to the entered mode and the closer to the exited one
    Included,
    /// Each delimiter is one token with its own style
    Styled {
        /// Style of the opening delimiter
        open: Style,
        /// Style of the closing delimiter
        close: Style,
    },
}

impl Delimiters {
    /// Build from the configuration surface's two independent fields
    pub fn from_options(
        pattern: &str,
        include_pattern: bool,
        pattern_styles: Option<(Style, Style)>,
    ) -> Result<Self, GrammarError> {
        match (include_pattern, pattern_styles) {
            (true, Some(_)) => Err(GrammarError::ConflictingDelimiters {
                pattern: pattern.to_string(),
            }),
            (true, None) => Ok(Delimiters::Included),
            (false, Some((open, close))) => Ok(Delimiters::Styled { open, close }),
            (false, None) => Ok(Delimiters::Plain),
        }
    }
}

/// A nestable, delimited region of the grammar
#[derive(Clone, Default)]
pub struct Pattern {
    /// Name used by hooks, debug output and JSON grammars
    pub name: String,
    /// Sub-mode active inside the pattern; `None` inherits the outer one
    pub mode: Option<ModeRef>,
    /// Opening delimiter (absent on the root)
    pub open: Option<MatcherSpec>,
    /// Closing delimiter
    pub close: Option<MatcherSpec>,
    /// Escape that disables an immediately following delimiter
    pub escape: Option<MatcherSpec>,
    /// Patterns that may open while this one is active, in priority order
    pub children: Vec<PatternId>,
    /// Delimiter tokenization
    pub delimiters: Delimiters,
}

impl Pattern {
    /// Pattern with only a name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set the opener
    pub fn open(mut self, spec: impl Into<MatcherSpec>) -> Self {
        self.open = Some(spec.into());
        self
    }

    /// Set the closer
    pub fn close(mut self, spec: impl Into<MatcherSpec>) -> Self {
        self.close = Some(spec.into());
        self
    }

    /// Set the escape
    pub fn escape(mut self, spec: impl Into<MatcherSpec>) -> Self {
        self.escape = Some(spec.into());
        self
    }

    /// Activate `mode` inside the pattern
    pub fn mode(mut self, mode: ModeRef) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Set children by id
    pub fn children(mut self, children: impl IntoIterator<Item = PatternId>) -> Self {
        self.children = children.into_iter().collect();
        self
    }

    /// Hand delimiter text to the inner mode
    pub fn include_pattern(mut self) -> Self {
        self.delimiters = Delimiters::Included;
        self
    }

    /// Style delimiters directly
    pub fn styled(mut self, open: impl Into<Style>, close: impl Into<Style>) -> Self {
        self.delimiters = Delimiters::Styled {
            open: open.into(),
            close: close.into(),
        };
        self
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pattern")
            .field("name", &self.name)
            .field("mode", &self.mode.as_ref().map(|m| m.name().to_string()))
            .field("open", &self.open)
            .field("close", &self.close)
            .field("escape", &self.escape)
            .field("children", &self.children)
            .field("delimiters", &self.delimiters)
            .finish()
    }
}

/// Kinds of non-fatal grammar issues
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// No path of children leads from the root to this pattern
    Unreachable,
    /// A non-root pattern without a closer never exits
    NeverCloses,
}

/// Non-fatal grammar issue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrammarWarning {
    /// Pattern the warning is about
    pub pattern: String,
    /// What is wrong
    pub kind: WarningKind,
}

/// Immutable arena of patterns plus hooks
#[derive(Debug, Clone)]
pub struct Grammar {
    patterns: Vec<Pattern>,
    root: PatternId,
    hooks: LifecycleHooks,
}

impl Grammar {
    /// Build and validate a grammar from parts
    pub fn new(
        patterns: Vec<Pattern>,
        root: PatternId,
        hooks: LifecycleHooks,
    ) -> Result<Self, GrammarError> {
        let grammar = Self {
            patterns,
            root,
            hooks,
        };
        grammar.validate()?;
        Ok(grammar)
    }

    /// Root pattern id
    #[inline]
    pub fn root(&self) -> PatternId {
        self.root
    }

    /// Root pattern
    #[inline]
    pub fn root_pattern(&self) -> &Pattern {
        self.pattern(self.root)
    }

    /// Pattern by id
    ///
    /// Ids are checked when the grammar is built, so every id obtained from
    /// this grammar is valid.
    #[inline]
    pub fn pattern(&self, id: PatternId) -> &Pattern {
        &self.patterns[id.0]
    }

    /// Pattern by id, `None` when out of range
    #[inline]
    pub fn get(&self, id: PatternId) -> Option<&Pattern> {
        self.patterns.get(id.0)
    }

    /// Look a pattern up by name
    pub fn find(&self, name: &str) -> Option<PatternId> {
        self.patterns
            .iter()
            .position(|p| p.name == name)
            .map(PatternId)
    }

    /// Lifecycle hooks
    #[inline]
    pub fn hooks(&self) -> &LifecycleHooks {
        &self.hooks
    }

    /// Number of patterns
    #[inline]
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Whether the grammar has no patterns
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Iterate over `(id, pattern)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (PatternId, &Pattern)> + '_ {
        self.patterns
            .iter()
            .enumerate()
            .map(|(i, p)| (PatternId(i), p))
    }

    /// Check structural consistency
    ///
    /// Fails on dangling ids, children without an opener and regexes that
    /// do not compile. Returns the non-fatal warnings otherwise.
    pub fn validate(&self) -> Result<Vec<GrammarWarning>, GrammarError> {
        if self.get(self.root).is_none() {
            return Err(GrammarError::DanglingChild {
                parent: "<root>".to_string(),
                child: self.root.0,
            });
        }

        for pattern in &self.patterns {
            for &child in &pattern.children {
                let Some(target) = self.get(child) else {
                    return Err(GrammarError::DanglingChild {
                        parent: pattern.name.clone(),
                        child: child.0,
                    });
                };
                if target.open.is_none() {
                    return Err(GrammarError::MissingOpen {
                        pattern: target.name.clone(),
                    });
                }
            }
            for spec in [&pattern.open, &pattern.close, &pattern.escape]
                .into_iter()
                .flatten()
            {
                check_regex(spec)?;
            }
        }

        let reachable = self.reachable();
        let mut warnings = Vec::new();
        for (id, pattern) in self.iter() {
            if !reachable[id.0] {
                warnings.push(GrammarWarning {
                    pattern: pattern.name.clone(),
                    kind: WarningKind::Unreachable,
                });
            } else if id != self.root && pattern.close.is_none() {
                warnings.push(GrammarWarning {
                    pattern: pattern.name.clone(),
                    kind: WarningKind::NeverCloses,
                });
            }
        }
        Ok(warnings)
    }

    /// Flags for patterns reachable from the root through children
    fn reachable(&self) -> Vec<bool> {
        let mut seen = vec![false; self.patterns.len()];
        let mut pending = vec![self.root];
        while let Some(id) = pending.pop() {
            if std::mem::replace(&mut seen[id.0], true) {
                continue;
            }
            pending.extend(self.pattern(id).children.iter().copied());
        }
        seen
    }
}

fn check_regex(spec: &MatcherSpec) -> Result<(), GrammarError> {
    if let MatcherSpec::Regex(re) = spec {
        let compiles = regex_cache::for_search(&re.source, re.ignore_case).is_some()
            && regex_cache::for_suffix(&re.source, re.ignore_case).is_some();
        if !compiles {
            let message = regex::Regex::new(&re.source)
                .err()
                .map_or_else(|| "cannot be re-anchored".to_string(), |e| e.to_string());
            return Err(GrammarError::InvalidRegex {
                source: re.source.clone(),
                message,
            });
        }
    }
    Ok(())
}

/// Incremental grammar construction with forward references by name
///
/// # Example
///
/// ```
/// use modelayer::engine::{GrammarBuilder, Pattern};
///
/// let mut builder = GrammarBuilder::new();
/// let root = builder.add(Pattern::new("root"));
/// let paren = builder.add(Pattern::new("paren").open("(").close(")"));
/// builder.child_names(root, &["paren"]);
/// // Parentheses nest inside themselves
/// builder.set_children(paren, [paren]);
/// let grammar = builder.root(root).build().unwrap();
/// assert_eq!(grammar.len(), 2);
/// ```
#[derive(Debug, Default)]
pub struct GrammarBuilder {
    patterns: Vec<Pattern>,
    names: HashMap<String, PatternId, ahash::RandomState>,
    pending: Vec<(PatternId, Vec<String>)>,
    root: Option<PatternId>,
    hooks: LifecycleHooks,
}

impl GrammarBuilder {
    /// Empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a pattern and return its id
    ///
    /// The first pattern added becomes the root unless [`root`](Self::root)
    /// says otherwise.
    pub fn add(&mut self, pattern: Pattern) -> PatternId {
        let id = PatternId(self.patterns.len());
        self.names.insert(pattern.name.clone(), id);
        self.patterns.push(pattern);
        id
    }

    /// Replace the children of `id`
    pub fn set_children(
        &mut self,
        id: PatternId,
        children: impl IntoIterator<Item = PatternId>,
    ) -> &mut Self {
        if let Some(pattern) = self.patterns.get_mut(id.0) {
            pattern.children = children.into_iter().collect();
        }
        self
    }

    /// Append children by name, resolved at [`build`](Self::build)
    pub fn child_names(&mut self, id: PatternId, names: &[&str]) -> &mut Self {
        self.pending
            .push((id, names.iter().map(|n| n.to_string()).collect()));
        self
    }

    /// Id of a previously added pattern
    pub fn id_of(&self, name: &str) -> Option<PatternId> {
        self.names.get(name).copied()
    }

    /// Choose the root pattern
    pub fn root(&mut self, id: PatternId) -> &mut Self {
        self.root = Some(id);
        self
    }

    /// Set the lifecycle hooks
    pub fn hooks(&mut self, hooks: LifecycleHooks) -> &mut Self {
        self.hooks = hooks;
        self
    }

    /// Resolve references and validate
    pub fn build(&mut self) -> Result<Grammar, GrammarError> {
        let mut patterns = std::mem::take(&mut self.patterns);
        for (id, names) in std::mem::take(&mut self.pending) {
            for name in names {
                let child = self
                    .names
                    .get(&name)
                    .copied()
                    .ok_or(GrammarError::UnknownPattern { name })?;
                if let Some(pattern) = patterns.get_mut(id.0) {
                    pattern.children.push(child);
                }
            }
        }
        let root = self.root.take().unwrap_or(PatternId(0));
        Grammar::new(patterns, root, std::mem::take(&mut self.hooks))
    }
}
