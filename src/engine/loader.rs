//! JSON grammar descriptions
//!
//! A [`GrammarSpec`] is the serializable form of a [`Grammar`]. Anything
//! that cannot be written as data (sub-modes, callback matchers, hooks) is
//! referenced by name and resolved through a [`GrammarRegistry`].
//!
//! ```
//! use modelayer::engine::GrammarRegistry;
//!
//! let json = r#"{
//!     "root": "root",
//!     "patterns": [
//!         { "name": "root", "children": ["paren"] },
//!         {
//!             "name": "paren",
//!             "open": { "type": "literal", "text": "(" },
//!             "close": { "type": "literal", "text": ")" },
//!             "children": ["paren"]
//!         }
//!     ]
//! }"#;
//!
//! let grammar = GrammarRegistry::new().load(json).unwrap();
//! assert_eq!(grammar.len(), 2);
//! ```

use super::error::GrammarError;
use super::grammar::{Delimiters, Grammar, GrammarBuilder, Pattern};
use super::hooks::LifecycleHooks;
use super::matcher::{CustomMatcher, MatcherSpec};
use super::mode::{ModeRef, Style};
use super::preset;
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::rc::Rc;

/// Serializable matcher
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MatcherDef {
    /// Exact text
    Literal {
        /// The text
        text: String,
    },
    /// Regular expression
    Regex {
        /// Pattern source
        source: String,
        /// Case-insensitive matching
        #[serde(default)]
        ignore_case: bool,
    },
    /// Callback registered under `name`
    Custom {
        /// Registry key
        name: String,
    },
}

/// Serializable pattern
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternDef {
    /// Pattern name, unique within the grammar
    pub name: String,
    /// Registered sub-mode name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    /// Opener
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open: Option<MatcherDef>,
    /// Closer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub close: Option<MatcherDef>,
    /// Escape
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub escape: Option<MatcherDef>,
    /// Child names in priority order
    #[serde(default)]
    pub children: Vec<String>,
    /// Hand delimiters to the inner mode
    #[serde(default)]
    pub include_pattern: bool,
    /// Delimiter styles
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern_styles: Option<(Style, Style)>,
}

/// Serializable grammar
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrammarSpec {
    /// Name of the root pattern
    pub root: String,
    /// All patterns
    pub patterns: Vec<PatternDef>,
}

impl GrammarSpec {
    /// Decode from JSON
    pub fn from_json(json: &str) -> Result<Self, GrammarError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Encode as pretty-printed JSON
    pub fn to_json(&self) -> Result<String, GrammarError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Describe an existing grammar
    ///
    /// Sub-modes are referenced by their name and callbacks by their
    /// description, which is also how [`GrammarRegistry`] keys them.
    pub fn from_grammar(grammar: &Grammar) -> Self {
        let name_of = |id| grammar.pattern(id).name.clone();
        let patterns = grammar
            .iter()
            .map(|(_, pattern)| {
                let (include_pattern, pattern_styles) = match &pattern.delimiters {
                    Delimiters::Plain => (false, None),
                    Delimiters::Included => (true, None),
                    Delimiters::Styled { open, close } => (false, Some((open.clone(), close.clone()))),
                };
                PatternDef {
                    name: pattern.name.clone(),
                    mode: pattern.mode.as_ref().map(|m| m.name().to_string()),
                    open: pattern.open.as_ref().map(MatcherDef::from_spec),
                    close: pattern.close.as_ref().map(MatcherDef::from_spec),
                    escape: pattern.escape.as_ref().map(MatcherDef::from_spec),
                    children: pattern.children.iter().map(|&c| name_of(c)).collect(),
                    include_pattern,
                    pattern_styles,
                }
            })
            .collect();
        GrammarSpec {
            root: name_of(grammar.root()),
            patterns,
        }
    }
}

impl MatcherDef {
    /// Serializable form of `spec`
    pub fn from_spec(spec: &MatcherSpec) -> Self {
        match spec {
            MatcherSpec::Literal(text) => MatcherDef::Literal { text: text.clone() },
            MatcherSpec::Regex(re) => MatcherDef::Regex {
                source: re.source.clone(),
                ignore_case: re.ignore_case,
            },
            MatcherSpec::Custom(m) => MatcherDef::Custom {
                name: m.description().to_string(),
            },
        }
    }
}

/// Named sub-modes, callbacks and hooks for loading grammars
#[derive(Clone, Default)]
pub struct GrammarRegistry {
    modes: HashMap<String, ModeRef, ahash::RandomState>,
    matchers: HashMap<String, MatcherSpec, ahash::RandomState>,
    hooks: LifecycleHooks,
}

impl GrammarRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry knowing the preset's template opener and hooks
    pub fn with_preset() -> Self {
        let mut registry = Self::new();
        registry.register_matcher(preset::TemplateOpener);
        registry.hooks = preset::hooks();
        registry
    }

    /// Register a sub-mode under its name
    pub fn register_mode(&mut self, mode: ModeRef) -> &mut Self {
        self.modes.insert(mode.name().to_string(), mode);
        self
    }

    /// Register a callback under its description
    pub fn register_matcher(&mut self, matcher: impl CustomMatcher + 'static) -> &mut Self {
        let name = matcher.description().to_string();
        self.matchers
            .insert(name, MatcherSpec::Custom(Rc::new(matcher)));
        self
    }

    /// Hooks given to every loaded grammar (chained after existing ones)
    pub fn add_hooks(&mut self, hooks: &LifecycleHooks) -> &mut Self {
        self.hooks = self.hooks.chain(hooks);
        self
    }

    /// Registered sub-mode
    pub fn mode(&self, name: &str) -> Option<&ModeRef> {
        self.modes.get(name)
    }

    /// Parse and build a grammar
    pub fn load(&self, json: &str) -> Result<Grammar, GrammarError> {
        self.build(&GrammarSpec::from_json(json)?)
    }

    /// Build a grammar from its description
    pub fn build(&self, spec: &GrammarSpec) -> Result<Grammar, GrammarError> {
        let mut builder = GrammarBuilder::new();
        for def in &spec.patterns {
            let mut pattern = Pattern::new(def.name.clone());
            if let Some(mode) = &def.mode {
                let mode = self
                    .modes
                    .get(mode)
                    .ok_or_else(|| GrammarError::UnknownMode { name: mode.clone() })?;
                pattern.mode = Some(Rc::clone(mode));
            }
            pattern.open = self.resolve(def.open.as_ref())?;
            pattern.close = self.resolve(def.close.as_ref())?;
            pattern.escape = self.resolve(def.escape.as_ref())?;
            pattern.delimiters = Delimiters::from_options(
                &def.name,
                def.include_pattern,
                def.pattern_styles.clone(),
            )?;

            let id = builder.add(pattern);
            let children: Vec<&str> = def.children.iter().map(String::as_str).collect();
            builder.child_names(id, &children);
        }

        let root = builder
            .id_of(&spec.root)
            .ok_or_else(|| GrammarError::UnknownPattern {
                name: spec.root.clone(),
            })?;
        builder.root(root).hooks(self.hooks.clone()).build()
    }

    fn resolve(&self, def: Option<&MatcherDef>) -> Result<Option<MatcherSpec>, GrammarError> {
        let Some(def) = def else {
            return Ok(None);
        };
        let spec = match def {
            MatcherDef::Literal { text } => MatcherSpec::literal(text.clone()),
            MatcherDef::Regex {
                source,
                ignore_case: false,
            } => MatcherSpec::regex(source.clone()),
            MatcherDef::Regex {
                source,
                ignore_case: true,
            } => MatcherSpec::regex_ignore_case(source.clone()),
            MatcherDef::Custom { name } => self
                .matchers
                .get(name)
                .cloned()
                .ok_or_else(|| GrammarError::UnknownMatcher { name: name.clone() })?,
        };
        Ok(Some(spec))
    }
}

impl fmt::Debug for GrammarRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut modes: Vec<&String> = self.modes.keys().collect();
        modes.sort();
        let mut matchers: Vec<&String> = self.matchers.keys().collect();
        matchers.sort();
        f.debug_struct("GrammarRegistry")
            .field("modes", &modes)
            .field("matchers", &matchers)
            .field("hooks", &self.hooks)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_mode_and_matcher() {
        let json = r#"{"root":"r","patterns":[{"name":"r","mode":"nope"}]}"#;
        assert_eq!(
            GrammarRegistry::new().load(json).unwrap_err(),
            GrammarError::UnknownMode {
                name: "nope".to_string()
            }
        );

        let json = r#"{"root":"r","patterns":[
            {"name":"r","children":["c"]},
            {"name":"c","open":{"type":"custom","name":"magic"}}
        ]}"#;
        assert_eq!(
            GrammarRegistry::new().load(json).unwrap_err(),
            GrammarError::UnknownMatcher {
                name: "magic".to_string()
            }
        );
    }

    #[test]
    fn test_bad_json_and_unknown_root() {
        assert!(matches!(
            GrammarRegistry::new().load("{"),
            Err(GrammarError::Json { .. })
        ));
        let json = r#"{"root":"missing","patterns":[{"name":"r"}]}"#;
        assert_eq!(
            GrammarRegistry::new().load(json).unwrap_err(),
            GrammarError::UnknownPattern {
                name: "missing".to_string()
            }
        );
    }

    #[test]
    fn test_invalid_regex_is_reported_at_load() {
        let json = r#"{"root":"r","patterns":[
            {"name":"r","children":["c"]},
            {"name":"c","open":{"type":"regex","source":"("}}
        ]}"#;
        assert!(matches!(
            GrammarRegistry::new().load(json),
            Err(GrammarError::InvalidRegex { .. })
        ));
    }

    #[test]
    fn test_export_then_load_preserves_structure() {
        let mut b = GrammarBuilder::new();
        let root = b.add(Pattern::new("root"));
        let q = b.add(
            Pattern::new("q")
                .open(MatcherSpec::regex_ignore_case("q'"))
                .close("'")
                .escape("\\")
                .styled("string", "string"),
        );
        b.set_children(root, [q]);
        let grammar = b.build().unwrap();

        let spec = GrammarSpec::from_grammar(&grammar);
        let json = spec.to_json().unwrap();
        let reloaded = GrammarSpec::from_json(&json).unwrap();
        assert_eq!(reloaded, spec);

        let rebuilt = GrammarRegistry::new().build(&reloaded).unwrap();
        assert_eq!(GrammarSpec::from_grammar(&rebuilt), spec);
    }
}
