// crates/mash-harness-core/tests/interp_unit.rs
// ============================================================================
// Module: Interpolation Unit Tests
// Description: ${var} substitution over parameter values.
// Purpose: Validate type preservation and unknown-token behavior.
// ============================================================================

//! Interpolation tests: whole-token type preservation, embedded rendering,
//! nesting, and untouched unknown tokens.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::collections::BTreeMap;

use mash_harness_core::ActionParams;
use mash_harness_core::interpolate_params;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

fn vars() -> BTreeMap<String, Value> {
    let mut vars = BTreeMap::new();
    vars.insert("zone_id".to_string(), json!("aaaaaaaaaaaaaaaa"));
    vars.insert("count".to_string(), json!(5));
    vars
}

fn params(entries: &[(&str, Value)]) -> ActionParams {
    entries.iter().map(|(key, value)| ((*key).to_string(), value.clone())).collect()
}

// ============================================================================
// SECTION: Substitution
// ============================================================================

#[test]
fn whole_token_preserves_the_variable_type() {
    let input = params(&[("n", json!("${count}"))]);
    let output = interpolate_params(&input, &vars());
    assert_eq!(output.get("n"), Some(&json!(5)));
}

#[test]
fn embedded_tokens_render_textually() {
    let input = params(&[("key", json!("main-${zone_id}"))]);
    let output = interpolate_params(&input, &vars());
    assert_eq!(output.get("key"), Some(&json!("main-aaaaaaaaaaaaaaaa")));
}

#[test]
fn unknown_tokens_stay_untouched() {
    let input = params(&[("a", json!("${missing}")), ("b", json!("x-${missing}-y"))]);
    let output = interpolate_params(&input, &vars());
    assert_eq!(output.get("a"), Some(&json!("${missing}")));
    assert_eq!(output.get("b"), Some(&json!("x-${missing}-y")));
}

#[test]
fn nested_structures_interpolate_recursively() {
    let input = params(&[(
        "payload",
        json!({
            "zone": "${zone_id}",
            "list": ["${count}", "literal"],
        }),
    )]);
    let output = interpolate_params(&input, &vars());
    assert_eq!(
        output.get("payload"),
        Some(&json!({
            "zone": "aaaaaaaaaaaaaaaa",
            "list": [5, "literal"],
        }))
    );
}

#[test]
fn non_string_values_pass_through() {
    let input = params(&[("flag", json!(true)), ("n", json!(3))]);
    let output = interpolate_params(&input, &vars());
    assert_eq!(output.get("flag"), Some(&json!(true)));
    assert_eq!(output.get("n"), Some(&json!(3)));
}

#[test]
fn unterminated_token_is_left_verbatim() {
    let input = params(&[("key", json!("prefix-${zone_id"))]);
    let output = interpolate_params(&input, &vars());
    assert_eq!(output.get("key"), Some(&json!("prefix-${zone_id")));
}
