// crates/mash-harness-core/src/core/value.rs
// ============================================================================
// Module: Parameter and Output Values
// Description: Typed wrappers for action parameters and handler output maps.
// Purpose: Provide coercion-aware access to heterogeneous step values.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Steps carry heterogeneous `string -> any` mappings in both directions:
//! interpolated parameters flow into handlers, and output maps flow out to
//! the expectation layer. Both sides are wrapped here so numeric coercion is
//! applied in exactly one place.
//!
//! Coercion policy: YAML-origin numbers arrive as 64-bit floats; bounded
//! fields accept float, signed integer, or the native unsigned type and
//! enforce range at the access boundary. Counters written into output maps
//! are always native integers so equality against YAML integers holds.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

// ============================================================================
// SECTION: Action Parameters
// ============================================================================

/// Interpolated parameter mapping handed to an action handler.
///
/// # Invariants
/// - Keys are unique; insertion order is not significant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionParams(BTreeMap<String, Value>);

impl ActionParams {
    /// Creates an empty parameter mapping.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Creates a parameter mapping from raw entries.
    #[must_use]
    pub const fn from_map(map: BTreeMap<String, Value>) -> Self {
        Self(map)
    }

    /// Returns the raw value for a key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns true when the key is present.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Inserts a value, replacing any previous entry.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    /// Returns the string form of a parameter when it is a string.
    #[must_use]
    pub fn str_param(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Returns a boolean parameter, accepting only JSON booleans.
    #[must_use]
    pub fn bool_param(&self, key: &str) -> Option<bool> {
        self.0.get(key).and_then(Value::as_bool)
    }

    /// Returns an unsigned parameter after numeric coercion.
    #[must_use]
    pub fn u64_param(&self, key: &str) -> Option<u64> {
        self.0.get(key).and_then(coerce_u64)
    }

    /// Returns a signed parameter after numeric coercion.
    #[must_use]
    pub fn i64_param(&self, key: &str) -> Option<i64> {
        self.0.get(key).and_then(coerce_i64)
    }

    /// Returns a nested object parameter.
    #[must_use]
    pub fn map_param(&self, key: &str) -> Option<&serde_json::Map<String, Value>> {
        self.0.get(key).and_then(Value::as_object)
    }

    /// Returns a list parameter.
    #[must_use]
    pub fn list_param(&self, key: &str) -> Option<&Vec<Value>> {
        self.0.get(key).and_then(Value::as_array)
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true when no entries are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Consumes the wrapper and returns the underlying map.
    #[must_use]
    pub fn into_inner(self) -> BTreeMap<String, Value> {
        self.0
    }
}

impl FromIterator<(String, Value)> for ActionParams {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

// ============================================================================
// SECTION: Output Map
// ============================================================================

/// Output mapping produced by an action handler.
///
/// # Invariants
/// - Integer-valued counters are stored as native JSON integers, never floats.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutputMap(BTreeMap<String, Value>);

impl OutputMap {
    /// Creates an empty output map.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Sets a boolean output key.
    pub fn set_bool(&mut self, key: &str, value: bool) {
        self.0.insert(key.to_string(), Value::Bool(value));
    }

    /// Sets a string output key.
    pub fn set_str(&mut self, key: &str, value: impl Into<String>) {
        self.0.insert(key.to_string(), Value::String(value.into()));
    }

    /// Sets an unsigned integer output key as a native integer.
    pub fn set_u64(&mut self, key: &str, value: u64) {
        self.0.insert(key.to_string(), Value::Number(value.into()));
    }

    /// Sets a signed integer output key as a native integer.
    pub fn set_i64(&mut self, key: &str, value: i64) {
        self.0.insert(key.to_string(), Value::Number(value.into()));
    }

    /// Sets an arbitrary value output key.
    pub fn set_value(&mut self, key: &str, value: Value) {
        self.0.insert(key.to_string(), value);
    }

    /// Returns the raw value for a key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns a boolean output value.
    #[must_use]
    pub fn bool_value(&self, key: &str) -> Option<bool> {
        self.0.get(key).and_then(Value::as_bool)
    }

    /// Returns a string output value.
    #[must_use]
    pub fn str_value(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Returns an unsigned output value.
    #[must_use]
    pub fn u64_value(&self, key: &str) -> Option<u64> {
        self.0.get(key).and_then(coerce_u64)
    }

    /// Returns true when the key is present.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true when no entries are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Consumes the wrapper and returns the underlying map.
    #[must_use]
    pub fn into_inner(self) -> BTreeMap<String, Value> {
        self.0
    }
}

impl FromIterator<(String, Value)> for OutputMap {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

// ============================================================================
// SECTION: Numeric Coercion
// ============================================================================

/// Coerces a JSON value into `u64` under the harness numeric policy.
///
/// Floats are accepted only when integral and in range; negative values are
/// rejected.
#[must_use]
pub fn coerce_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(number) => {
            if let Some(unsigned) = number.as_u64() {
                return Some(unsigned);
            }
            if let Some(signed) = number.as_i64() {
                return u64::try_from(signed).ok();
            }
            number.as_f64().and_then(float_to_u64)
        }
        _ => None,
    }
}

/// Coerces a JSON value into `i64` under the harness numeric policy.
#[must_use]
pub fn coerce_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => {
            if let Some(signed) = number.as_i64() {
                return Some(signed);
            }
            number.as_f64().and_then(float_to_i64)
        }
        _ => None,
    }
}

/// Converts an integral, in-range float into `u64`.
fn float_to_u64(value: f64) -> Option<u64> {
    if !value.is_finite() || value.fract() != 0.0 || value < 0.0 {
        return None;
    }
    if value > u64::MAX as f64 {
        return None;
    }
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "Integrality, sign, and range are checked above."
    )]
    let converted = value as u64;
    Some(converted)
}

/// Converts an integral, in-range float into `i64`.
fn float_to_i64(value: f64) -> Option<i64> {
    if !value.is_finite() || value.fract() != 0.0 {
        return None;
    }
    if value < i64::MIN as f64 || value > i64::MAX as f64 {
        return None;
    }
    #[allow(
        clippy::cast_possible_truncation,
        reason = "Integrality and range are checked above."
    )]
    let converted = value as i64;
    Some(converted)
}
