// crates/mash-harness-core/src/interp.rs
// ============================================================================
// Module: Parameter Interpolation
// Description: ${var} substitution over step parameters.
// Purpose: Resolve prior-step outputs into the parameters of the next step.
// Dependencies: crate::core, serde_json
// ============================================================================

//! ## Overview
//! Dispatch interpolates `${var}` tokens against execution-state variables
//! before invoking a handler. A string that is exactly one token is replaced
//! by the variable's value with its type preserved, so numeric outputs stay
//! numeric; tokens embedded in longer strings are rendered textually.
//! Unknown variables leave their token untouched so expectation checkers can
//! surface the mismatch. Interpolation is synchronous and never blocks.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde_json::Value;

use crate::core::value::ActionParams;

// ============================================================================
// SECTION: Interpolation
// ============================================================================

/// Interpolates `${var}` tokens in every parameter value.
#[must_use]
pub fn interpolate_params(params: &ActionParams, vars: &BTreeMap<String, Value>) -> ActionParams {
    params
        .iter()
        .map(|(key, value)| (key.clone(), interpolate_value(value, vars)))
        .collect()
}

/// Recursively interpolates one value.
fn interpolate_value(value: &Value, vars: &BTreeMap<String, Value>) -> Value {
    match value {
        Value::String(text) => interpolate_string(text, vars),
        Value::Array(items) => {
            Value::Array(items.iter().map(|item| interpolate_value(item, vars)).collect())
        }
        Value::Object(entries) => Value::Object(
            entries
                .iter()
                .map(|(key, entry)| (key.clone(), interpolate_value(entry, vars)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Interpolates one string, preserving the variable type for whole-token
/// strings.
fn interpolate_string(text: &str, vars: &BTreeMap<String, Value>) -> Value {
    if let Some(name) = whole_token(text) {
        if let Some(value) = vars.get(name) {
            return value.clone();
        }
        return Value::String(text.to_string());
    }

    let mut rendered = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("${") {
        rendered.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let name = &after[..end];
                match vars.get(name) {
                    Some(value) => rendered.push_str(&render(value)),
                    None => {
                        rendered.push_str("${");
                        rendered.push_str(name);
                        rendered.push('}');
                    }
                }
                rest = &after[end + 1..];
            }
            None => {
                rendered.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    rendered.push_str(rest);
    Value::String(rendered)
}

/// Returns the variable name when the string is exactly one `${name}` token.
fn whole_token(text: &str) -> Option<&str> {
    let inner = text.strip_prefix("${")?.strip_suffix('}')?;
    if inner.contains("${") || inner.contains('}') {
        return None;
    }
    Some(inner)
}

/// Renders a value into textual form for embedded tokens.
fn render(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
