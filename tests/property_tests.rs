//! Property-based tests using proptest
//!
//! These tests use property-based testing to verify tokenizer behavior
//! across a wide range of inputs.

use modelayer::engine::{
    Direction, GrammarBuilder, KeywordMode, LayerScanner, LinkedStack, OverlayBuilder,
    OverlayMode, Pattern, PatternId, ScanLimits, Scratch,
};
use proptest::prelude::*;
use std::rc::Rc;

fn preset_mode() -> OverlayMode {
    OverlayBuilder::new()
        .mode(Rc::new(KeywordMode::new("sql", ["where"])))
        .code_mode(Rc::new(KeywordMode::new("groovy", ["if"])))
        .build()
        .unwrap()
}

const OPEN: [char; 3] = ['(', '[', '{'];
const CLOSE: [char; 3] = [')', ']', '}'];

// =============================================================================
// Token Coverage
// =============================================================================

proptest! {
    /// Tokens cover every line exactly, in order
    #[test]
    fn test_tokens_cover_line(lines in prop::collection::vec("[a-z #'\"()\\[\\]{}\\\\=]{0,30}", 1..6)) {
        let mode = preset_mode();
        let mut state = mode.start_state();
        for line in &lines {
            let tokens = mode.tokenize_line(line, &mut state).unwrap();
            let mut end = 0;
            for token in &tokens {
                prop_assert_eq!(token.start, end);
                prop_assert!(token.end > token.start);
                end = token.end;
            }
            prop_assert_eq!(end, line.len());
            prop_assert!(state.pattern_depth() >= 1);
        }
    }

    /// Same state and same lines give the same tokens
    #[test]
    fn test_idempotent(lines in prop::collection::vec("[a-z #'()\\[\\]{}]{0,30}", 1..6)) {
        let mode = preset_mode();
        let mut first = mode.start_state();
        let mut second = mode.start_state();
        for line in &lines {
            let a = mode.tokenize_line(line, &mut first).unwrap();
            let b = mode.tokenize_line(line, &mut second).unwrap();
            prop_assert_eq!(a, b);
        }
    }

    /// A clone tokenizes the next line exactly like its original
    #[test]
    fn test_clone_tokenizes_like_original(
        head in "[a-z #'()\\[\\]{}]{0,30}",
        tail in "[a-z #'()\\[\\]{}]{0,30}",
    ) {
        let mode = preset_mode();
        let mut state = mode.start_state();
        mode.tokenize_line(&head, &mut state).unwrap();

        let mut copy = state.clone();
        let a = mode.tokenize_line(&tail, &mut state).unwrap();
        let b = mode.tokenize_line(&tail, &mut copy).unwrap();
        prop_assert_eq!(a, b);
        prop_assert_eq!(state.pattern_path(), copy.pattern_path());
    }
}

// =============================================================================
// Nesting
// =============================================================================

proptest! {
    /// Balanced groups return the stack to the root
    #[test]
    fn test_balanced_nesting_round_trip(kinds in prop::collection::vec(0..3usize, 0..20)) {
        let mut b = GrammarBuilder::new();
        let root = b.add(Pattern::new("root"));
        let groups: Vec<PatternId> = (0..3)
            .map(|i| b.add(Pattern::new(format!("g{}", i)).open(OPEN[i].to_string().as_str()).close(CLOSE[i].to_string().as_str())))
            .collect();
        for id in std::iter::once(root).chain(groups.iter().copied()) {
            b.set_children(id, groups.iter().copied());
        }
        let grammar = b.build().unwrap();

        let mut line: String = kinds.iter().map(|&k| OPEN[k]).collect();
        line.push('x');
        line.extend(kinds.iter().rev().map(|&k| CLOSE[k]));

        let mut stack: LinkedStack<PatternId> = [root].into_iter().collect();
        let mut text = String::new();
        let mut scratch = Scratch::default();
        let layers = LayerScanner::new(&grammar, ScanLimits::default())
            .scan_line(&mut stack, &line, 0, &mut text, &mut scratch)
            .unwrap();

        prop_assert_eq!(layers.len(), kinds.len() * 2);
        prop_assert_eq!(stack.len(), 1);
        let opens = layers.iter().filter(|l| l.direction == Direction::Open).count();
        prop_assert_eq!(opens, kinds.len());
        prop_assert_eq!(text, "x");
    }
}
