//! Integration tests for tokenizer state
//!
//! These tests cover snapshots of `OverlayState`: clones must be
//! independent of the original, and tokenizing must be a pure function of
//! state and line.

use modelayer::engine::{
    KeywordMode, KeywordState, LineStream, OverlayBuilder, OverlayMode, OverlayState,
    ScanLimits, Token, TokenizeError,
};
use std::rc::Rc;

fn preset_mode() -> OverlayMode {
    OverlayBuilder::new()
        .mode(Rc::new(KeywordMode::new("sql", ["where"])))
        .code_mode(Rc::new(KeywordMode::new("groovy", ["if"])))
        .build()
        .unwrap()
}

fn host_string(mode: &OverlayMode, state: &OverlayState) -> Option<char> {
    let (_, inner) = mode.active_mode(state).unwrap();
    inner
        .downcast_ref::<KeywordState>()
        .and_then(|s| s.in_string)
}

fn run(mode: &OverlayMode, state: &mut OverlayState, lines: &[&str]) -> Vec<Vec<Token>> {
    lines
        .iter()
        .map(|line| mode.tokenize_line(line, state).unwrap())
        .collect()
}

// ============================================================================
// Clone Independence
// ============================================================================

#[test]
fn test_clone_is_independent_of_original() {
    let mode = preset_mode();
    let mut state = mode.start_state();
    mode.tokenize_line("where 'abc", &mut state).unwrap();
    assert_eq!(host_string(&mode, &state), Some('\''));

    let snapshot = state.clone();
    assert!(snapshot.shares_stacks_with(&state));

    mode.tokenize_line("def' (", &mut state).unwrap();
    assert_eq!(host_string(&mode, &state), None);
    assert_eq!(state.pattern_depth(), 2);

    // The snapshot still sits inside the unclosed string
    assert_eq!(host_string(&mode, &snapshot), Some('\''));
    assert_eq!(snapshot.pattern_depth(), 2);
    assert_eq!(
        mode.grammar().pattern(snapshot.active_pattern()).name,
        "single-quote"
    );
}

#[test]
fn test_clone_of_nested_code_state() {
    let mode = preset_mode();
    let mut state = mode.start_state();
    mode.tokenize_line("#{ 'x", &mut state).unwrap();
    let snapshot = state.clone();

    mode.tokenize_line("' }", &mut state).unwrap();
    assert_eq!(state.mode_path(), vec!["sql"]);
    assert_eq!(snapshot.mode_path(), vec!["sql", "groovy"]);
    assert_eq!(host_string(&mode, &snapshot), Some('\''));
}

#[test]
fn test_scratch_is_copied() {
    let mode = preset_mode();
    let mut state = mode.start_state();
    mode.tokenize_line("#[if]", &mut state).unwrap();
    let snapshot = state.clone();

    mode.tokenize_line("x", &mut state).unwrap();
    state
        .scratch_mut()
        .insert("extra".to_string(), serde_json::json!(1));
    assert!(snapshot.scratch().get("extra").is_none());
    assert_eq!(
        snapshot.scratch().get("after_template"),
        Some(&serde_json::json!(true))
    );
}

// ============================================================================
// Idempotence
// ============================================================================

#[test]
fn test_same_state_and_lines_give_same_tokens() {
    let mode = preset_mode();
    let lines = ["where #[if] [#{x}] (a", "b) 'c", "d' [e]", "", "#{ 1 +", "2 }"];

    let mut first = mode.start_state();
    let mut second = mode.start_state();
    assert_eq!(run(&mode, &mut first, &lines), run(&mode, &mut second, &lines));
    assert_eq!(first.pattern_path(), second.pattern_path());
    assert_eq!(first.mode_path(), second.mode_path());
}

#[test]
fn test_resuming_from_snapshot_matches_straight_run() {
    let mode = preset_mode();
    let lines = ["(a [b", "#{ c", "} d]", "e)"];

    let mut straight = mode.start_state();
    let all = run(&mode, &mut straight, &lines);

    let mut state = mode.start_state();
    run(&mode, &mut state, &lines[..2]);
    let mut resumed = state.clone();
    let rest = run(&mode, &mut resumed, &lines[2..]);

    assert_eq!(&all[2..], &rest[..]);
    assert_eq!(straight.pattern_depth(), 1);
    assert_eq!(resumed.pattern_depth(), 1);
}

// ============================================================================
// Limits
// ============================================================================

#[test]
fn test_depth_limit_abandons_line_only() {
    let mode = OverlayBuilder::new()
        .limits(ScanLimits::new().with_max_depth(3))
        .build()
        .unwrap();
    let mut state = mode.start_state();
    let err = mode.tokenize_line("((((", &mut state).unwrap_err();
    assert!(matches!(
        err,
        TokenizeError::DepthLimitExceeded { max_depth: 3, .. }
    ));
    assert!(state.layers().is_empty());
    assert!(mode.tokenize_line("x", &mut state).is_ok());
}

#[test]
fn test_aborted_line_keeps_stacks_in_step() {
    let mode = OverlayBuilder::new()
        .mode(Rc::new(KeywordMode::new("sql", ["where"])))
        .code_mode(Rc::new(KeywordMode::new("groovy", ["if"])))
        .limits(ScanLimits::new().with_max_depth(3))
        .build()
        .unwrap();
    let mut state = mode.start_state();

    // The second paren would be the fourth level
    assert!(mode.tokenize_line("#{ ((", &mut state).is_err());
    assert_eq!(state.pattern_depth(), 1);
    assert_eq!(state.mode_path(), vec!["sql"]);

    let tokens = mode.tokenize_line(") } where", &mut state).unwrap();
    assert_eq!(state.mode_path(), vec!["sql"]);
    assert_eq!(
        tokens.last().and_then(|t| t.style.as_deref()),
        Some("keyword")
    );
}

#[test]
fn test_tokenize_text_continues_after_failed_line() {
    let mode = OverlayBuilder::new()
        .mode(Rc::new(KeywordMode::new("sql", ["where"])))
        .limits(ScanLimits::new().with_max_depth(3))
        .build()
        .unwrap();

    let text = mode.tokenize_text("((((\nwhere x");
    assert_eq!(text.lines.len(), 2);
    assert_eq!(text.errors.len(), 1);
    assert_eq!(text.errors[0].0, 0);
    assert_eq!(
        text.lines[0],
        vec![Token {
            start: 0,
            end: 4,
            style: None
        }]
    );
    assert_eq!(text.lines[1][0].style.as_deref(), Some("keyword"));
}

// ============================================================================
// Line Boundaries
// ============================================================================

#[test]
fn test_line_left_early_is_finished_before_next_line() {
    let mode = preset_mode();
    let mut state = mode.start_state();

    // The host stops after the first token of the line
    let mut stream = LineStream::new("where (x");
    mode.token(&mut stream, &mut state).unwrap();
    assert!(!stream.eol());

    mode.tokenize_line("y) z", &mut state).unwrap();
    assert_eq!(state.pattern_depth(), 1);
    assert!(state.layers().is_empty());
}

#[test]
fn test_text_before_holds_only_the_current_line() {
    let mode = preset_mode();
    let mut state = mode.start_state();
    for i in 0..200 {
        mode.tokenize_line(&format!("select col{} from t", i), &mut state)
            .unwrap();
    }
    assert_eq!(state.text_before(), "select col199 from t");

    let snapshot = state.clone();
    assert!(snapshot.shares_stacks_with(&state));
    assert_eq!(snapshot.text_before().len(), "select col199 from t".len());
}
