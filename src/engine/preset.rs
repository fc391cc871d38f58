//! Default template grammar
//!
//! The preset wires the pattern model for a host language carrying a
//! templating layer:
//!
//! - `'...'` and `"..."` strings with `\` escapes
//! - `(...)`, `[...]` and `{...}` groups
//! - `#{ ... }` code expressions, tokenized by the configured code mode
//! - `#[ ... ]` flag headers
//! - `[ ... ]` template regions, recognized only right after a flag header
//!   or another template region with nothing but whitespace in between
//!
//! Template regions are context sensitive, so their opener is a
//! [`TemplateOpener`] callback that reads the [`AFTER_TEMPLATE`] scratch
//! flag maintained by the preset's hooks.

use super::config::{OverlayConfig, PatternDecl};
use super::grammar::Pattern;
use super::hooks::{HookPoint, LifecycleHooks};
use super::matcher::{CustomMatcher, Match, MatchMode, MatcherSpec, ScanContext};
use super::mode::ModeRef;

/// Name of the preset mode
pub const MODE_NAME: &str = "template-overlay";

/// Root pattern name
pub const ROOT: &str = "root";
/// Template region pattern name
pub const TEMPLATE: &str = "template";
/// Flag header pattern name
pub const FLAG_HEADER: &str = "flag-header";
/// Code expression pattern name
pub const CODE: &str = "code";
/// Single-quoted string pattern name
pub const SINGLE_QUOTE: &str = "single-quote";
/// Double-quoted string pattern name
pub const DOUBLE_QUOTE: &str = "double-quote";
/// Parenthesis group pattern name
pub const PAREN: &str = "paren";
/// Bracket group pattern name
pub const BRACKET: &str = "bracket";
/// Brace group pattern name
pub const BRACE: &str = "brace";

/// Scratch flag: the last transition exited a flag header or template
pub const AFTER_TEMPLATE: &str = "after_template";

/// Style of flag header delimiters
pub const FLAG_HEADER_STYLE: &str = "meta";
/// Style of template region delimiters
pub const TEMPLATE_STYLE: &str = "bracket";
/// Style of code expression delimiters
pub const CODE_STYLE: &str = "variable-2";

/// Children of the root, groups and template regions, in priority order
pub const NESTED: [&str; 8] = [
    TEMPLATE,
    FLAG_HEADER,
    CODE,
    SINGLE_QUOTE,
    DOUBLE_QUOTE,
    PAREN,
    BRACKET,
    BRACE,
];

/// Children of code expressions and flag headers
const EMBEDDED: [&str; 6] = [CODE, SINGLE_QUOTE, DOUBLE_QUOTE, PAREN, BRACKET, BRACE];

/// Opener of a template region
///
/// Matches a `[` only while [`AFTER_TEMPLATE`] is set and only whitespace
/// separates it from the previous transition.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateOpener;

impl CustomMatcher for TemplateOpener {
    fn find(
        &self,
        line: &str,
        position: usize,
        mode: MatchMode,
        ctx: &ScanContext<'_>,
    ) -> Option<Match> {
        if !ctx.flag(AFTER_TEMPLATE) {
            return None;
        }
        match mode {
            MatchMode::Search => {
                let at = position + memchr::memchr(b'[', line.get(position..)?.as_bytes())?;
                ctx.only_whitespace_before(line, position, at)
                    .then(|| Match::new(at, Some("[".to_string())))
            }
            MatchMode::Suffix => line
                .get(..position)?
                .ends_with('[')
                .then(|| Match::new(position - 1, Some("[".to_string()))),
        }
    }

    fn description(&self) -> &str {
        "template opener"
    }
}

/// Hooks maintaining [`AFTER_TEMPLATE`]
pub fn hooks() -> LifecycleHooks {
    LifecycleHooks::new()
        .with(HookPoint::BeforeEnter, |ctx| ctx.set_flag(AFTER_TEMPLATE, false))
        .with(HookPoint::AfterExit, |ctx| {
            let exited_template = ctx.pattern.name == FLAG_HEADER || ctx.pattern.name == TEMPLATE;
            ctx.set_flag(AFTER_TEMPLATE, exited_template);
        })
}

/// Default configuration the builder starts from
pub fn default_config() -> OverlayConfig {
    OverlayConfig {
        name: Some(MODE_NAME.to_string()),
        children: Some(NESTED.iter().map(|n| n.to_string()).collect()),
        hooks: hooks(),
        ..OverlayConfig::default()
    }
}

/// The preset's non-root patterns
///
/// Code expressions run in `code_mode`; without one they inherit the
/// enclosing sub-mode.
pub fn patterns(code_mode: Option<ModeRef>) -> Vec<PatternDecl> {
    let quote = |name: &str, q: &str| {
        PatternDecl::new(Pattern::new(name).open(q).close(q).escape("\\"), &[])
    };
    let group = |name: &str, open: &str, close: &str| {
        PatternDecl::new(Pattern::new(name).open(open).close(close), &NESTED)
    };

    let mut code = Pattern::new(CODE)
        .open("#{")
        .close("}")
        .styled(CODE_STYLE, CODE_STYLE);
    code.mode = code_mode;

    vec![
        PatternDecl::new(
            Pattern::new(TEMPLATE)
                .open(MatcherSpec::custom(TemplateOpener))
                .close("]")
                .styled(TEMPLATE_STYLE, TEMPLATE_STYLE),
            &NESTED,
        ),
        PatternDecl::new(
            Pattern::new(FLAG_HEADER)
                .open("#[")
                .close("]")
                .styled(FLAG_HEADER_STYLE, FLAG_HEADER_STYLE),
            &EMBEDDED,
        ),
        PatternDecl::new(code, &EMBEDDED),
        quote(SINGLE_QUOTE, "'"),
        quote(DOUBLE_QUOTE, "\""),
        group(PAREN, "(", ")"),
        group(BRACKET, "[", "]"),
        group(BRACE, "{", "}"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::matcher::Scratch;

    #[test]
    fn test_template_opener_requires_flag_and_whitespace() {
        let mut scratch = Scratch::default();
        let ctx = ScanContext {
            text_before: "",
            blank_before_line: true,
            scratch: &scratch,
        };
        assert_eq!(TemplateOpener.find(" [x]", 0, MatchMode::Search, &ctx), None);

        scratch.insert(AFTER_TEMPLATE.to_string(), serde_json::Value::Bool(true));
        let ctx = ScanContext {
            text_before: "",
            blank_before_line: true,
            scratch: &scratch,
        };
        assert_eq!(
            TemplateOpener.find(" [x]", 0, MatchMode::Search, &ctx),
            Some(Match::new(1, Some("[".into())))
        );
        assert_eq!(TemplateOpener.find("a[x]", 0, MatchMode::Search, &ctx), None);

        let ctx = ScanContext {
            text_before: "x",
            blank_before_line: true,
            scratch: &scratch,
        };
        assert_eq!(TemplateOpener.find("[x]", 0, MatchMode::Search, &ctx), None);

        // Text left on an earlier line also separates the opener
        let ctx = ScanContext {
            text_before: "",
            blank_before_line: false,
            scratch: &scratch,
        };
        assert_eq!(TemplateOpener.find("[x]", 0, MatchMode::Search, &ctx), None);
    }

    #[test]
    fn test_preset_patterns_are_all_named() {
        let decls = patterns(None);
        let names: Vec<&str> = decls.iter().map(|d| d.pattern.name.as_str()).collect();
        for name in NESTED {
            assert!(names.contains(&name), "missing {}", name);
        }
    }
}
