//! Developer tools
//!
//! Text renderings of grammars, layers and tokens for tests, logs and
//! bug reports.
//!
//! # Features
//! - Grammar visualization (Mermaid/DOT diagrams of the children graph)
//! - Layer listings for one scanned line
//! - Inline token rendering (`[style:text]`)

use super::dispatcher::Token;
use super::grammar::{Delimiters, Grammar, Pattern};
use super::scanner::{Direction, Layer};
use std::fmt::Write;

/// Grammar visualizer
pub struct GrammarVisualizer<'a> {
    grammar: &'a Grammar,
}

impl<'a> GrammarVisualizer<'a> {
    /// Create a new grammar visualizer
    pub fn new(grammar: &'a Grammar) -> Self {
        Self { grammar }
    }

    /// Generate a Mermaid diagram
    pub fn to_mermaid(&self) -> String {
        let mut output = String::from("graph TD\n");
        for (id, pattern) in self.grammar.iter() {
            let _ = writeln!(output, "  p{}[\"{}\"]", id.0, pattern_label(pattern));
            for child in &pattern.children {
                let _ = writeln!(output, "  p{} --> p{}", id.0, child.0);
            }
        }
        output
    }

    /// Generate a GraphViz DOT diagram
    pub fn to_dot(&self) -> String {
        let mut output = String::new();
        output.push_str("digraph Grammar {\n");
        output.push_str("  rankdir=TB;\n");
        output.push_str("  node [shape=box];\n");

        for (id, pattern) in self.grammar.iter() {
            let label = pattern_label(pattern).replace('"', "\\\"");
            let _ = writeln!(output, "  p{} [label=\"{}\"]", id.0, label);
            for child in &pattern.children {
                let _ = writeln!(output, "  p{} -> p{}", id.0, child.0);
            }
        }

        // Mark root
        let _ = writeln!(
            output,
            "  p{} [style=filled, fillcolor=lightblue]",
            self.grammar.root().0
        );
        output.push_str("}\n");
        output
    }
}

fn pattern_label(pattern: &Pattern) -> String {
    let mut label = pattern.name.clone();
    if let (Some(open), Some(close)) = (&pattern.open, &pattern.close) {
        let _ = write!(label, " {} .. {}", open.describe(), close.describe());
    }
    if let Some(mode) = &pattern.mode {
        let _ = write!(label, " @{}", mode.name());
    }
    match &pattern.delimiters {
        Delimiters::Plain => {}
        Delimiters::Included => label.push_str(" +include"),
        Delimiters::Styled { open, close } => {
            let _ = write!(label, " [{}|{}]", open, close);
        }
    }
    label
}

/// Layer listing printer
pub struct LayerPrinter<'a> {
    grammar: &'a Grammar,
}

impl<'a> LayerPrinter<'a> {
    /// Printer resolving pattern names through `grammar`
    pub fn new(grammar: &'a Grammar) -> Self {
        Self { grammar }
    }

    /// One line per layer: position, direction, text and the transition
    pub fn print(&self, layers: &[Layer]) -> String {
        let mut output = String::new();
        for layer in layers {
            let direction = match layer.direction {
                Direction::Open => "open ",
                Direction::Close => "close",
            };
            let _ = writeln!(
                output,
                "{:>4} {} {:<8} {} -> {}",
                layer.position,
                direction,
                format!("{:?}", layer.text.as_deref().unwrap_or("")),
                self.grammar.pattern(layer.before).name,
                self.grammar.pattern(layer.after).name,
            );
        }
        output
    }
}

/// Render tokens inline: styled tokens as `[style:text]`, others verbatim
pub fn render_tokens(line: &str, tokens: &[Token]) -> String {
    let mut output = String::new();
    for token in tokens {
        match &token.style {
            Some(style) => {
                let _ = write!(output, "[{}:{}]", style, token.text(line));
            }
            None => output.push_str(token.text(line)),
        }
    }
    output
}

/// Merge adjacent tokens with the same style
pub fn coalesce(tokens: &[Token]) -> Vec<Token> {
    let mut merged: Vec<Token> = Vec::with_capacity(tokens.len());
    for token in tokens {
        match merged.last_mut() {
            Some(last) if last.end == token.start && last.style == token.style => {
                last.end = token.end;
            }
            _ => merged.push(token.clone()),
        }
    }
    merged
}

/// Layers as JSON
pub fn layers_to_json(layers: &[Layer]) -> Result<String, serde_json::Error> {
    serde_json::to_string(layers)
}
