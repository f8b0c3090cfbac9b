// crates/mash-harness-net/src/codec.rs
// ============================================================================
// Module: CBOR Codec
// Description: CBOR marshalling and the integer-keyed map encoding policy.
// Purpose: Bridge step-level JSON values and wire-level CBOR values.
// Dependencies: serde_cbor, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Payloads on the wire are CBOR. Steps author payloads as user-friendly
//! JSON mappings whose keys may be decimal integers written as strings
//! (`"1"`, `"2"`); [`encode_int_keyed_map`] turns those keys into integer
//! CBOR keys while purely non-numeric keys stay strings and mixed maps
//! preserve each key's original kind. Nested maps recurse with the same
//! policy. Decoding bridges back into JSON for output maps, rendering byte
//! strings as lowercase hex.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde_cbor::Value as CborValue;
use serde_json::Value as JsonValue;
use thiserror::Error;

// ============================================================================
// SECTION: Codec Errors
// ============================================================================

/// Errors raised by CBOR marshalling.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum CodecError {
    /// CBOR serialization failed.
    #[error("cbor encode failure: {0}")]
    Encode(String),
    /// CBOR deserialization failed.
    #[error("cbor decode failure: {0}")]
    Decode(String),
    /// A JSON number could not be represented in CBOR.
    #[error("unrepresentable number: {0}")]
    Number(String),
}

// ============================================================================
// SECTION: Marshalling
// ============================================================================

/// Serializes a CBOR value to bytes.
///
/// # Errors
///
/// Returns [`CodecError::Encode`] when serialization fails.
pub fn marshal(value: &CborValue) -> Result<Vec<u8>, CodecError> {
    serde_cbor::to_vec(value).map_err(|err| CodecError::Encode(err.to_string()))
}

/// Deserializes bytes into a CBOR value.
///
/// # Errors
///
/// Returns [`CodecError::Decode`] when the bytes are not valid CBOR.
pub fn unmarshal(bytes: &[u8]) -> Result<CborValue, CodecError> {
    serde_cbor::from_slice(bytes).map_err(|err| CodecError::Decode(err.to_string()))
}

// ============================================================================
// SECTION: Integer-Keyed Map Encoding
// ============================================================================

/// Encodes a string-keyed mapping into CBOR, turning decimal-integer string
/// keys into integer CBOR keys.
///
/// # Errors
///
/// Returns [`CodecError::Number`] when a value carries a number CBOR cannot
/// represent.
pub fn encode_int_keyed_map(
    map: &BTreeMap<String, JsonValue>,
) -> Result<CborValue, CodecError> {
    let mut encoded = BTreeMap::new();
    for (key, value) in map {
        let cbor_key = match key.parse::<i64>() {
            Ok(numeric) => CborValue::Integer(i128::from(numeric)),
            Err(_) => CborValue::Text(key.clone()),
        };
        encoded.insert(cbor_key, json_to_cbor(value)?);
    }
    Ok(CborValue::Map(encoded))
}

// ============================================================================
// SECTION: Value Bridging
// ============================================================================

/// Converts a JSON value into a CBOR value, applying the integer-key policy
/// to nested objects.
///
/// # Errors
///
/// Returns [`CodecError::Number`] for non-finite floats.
pub fn json_to_cbor(value: &JsonValue) -> Result<CborValue, CodecError> {
    match value {
        JsonValue::Null => Ok(CborValue::Null),
        JsonValue::Bool(flag) => Ok(CborValue::Bool(*flag)),
        JsonValue::Number(number) => {
            if let Some(unsigned) = number.as_u64() {
                Ok(CborValue::Integer(i128::from(unsigned)))
            } else if let Some(signed) = number.as_i64() {
                Ok(CborValue::Integer(i128::from(signed)))
            } else if let Some(float) = number.as_f64() {
                if float.is_finite() {
                    Ok(CborValue::Float(float))
                } else {
                    Err(CodecError::Number(number.to_string()))
                }
            } else {
                Err(CodecError::Number(number.to_string()))
            }
        }
        JsonValue::String(text) => Ok(CborValue::Text(text.clone())),
        JsonValue::Array(items) => {
            let mut encoded = Vec::with_capacity(items.len());
            for item in items {
                encoded.push(json_to_cbor(item)?);
            }
            Ok(CborValue::Array(encoded))
        }
        JsonValue::Object(entries) => {
            let map = entries
                .iter()
                .map(|(key, entry)| (key.clone(), entry.clone()))
                .collect::<BTreeMap<String, JsonValue>>();
            encode_int_keyed_map(&map)
        }
    }
}

/// Converts a CBOR value into a JSON value for output maps.
///
/// Integer keys render as decimal strings; byte strings render as lowercase
/// hex.
#[must_use]
pub fn cbor_to_json(value: &CborValue) -> JsonValue {
    match value {
        CborValue::Null => JsonValue::Null,
        CborValue::Bool(flag) => JsonValue::Bool(*flag),
        CborValue::Integer(number) => integer_to_json(*number),
        CborValue::Float(float) => serde_json::Number::from_f64(*float)
            .map_or(JsonValue::Null, JsonValue::Number),
        CborValue::Bytes(bytes) => JsonValue::String(hex_encode(bytes)),
        CborValue::Text(text) => JsonValue::String(text.clone()),
        CborValue::Array(items) => JsonValue::Array(items.iter().map(cbor_to_json).collect()),
        CborValue::Map(entries) => {
            let mut object = serde_json::Map::new();
            for (key, entry) in entries {
                object.insert(map_key_to_string(key), cbor_to_json(entry));
            }
            JsonValue::Object(object)
        }
        _ => JsonValue::Null,
    }
}

/// Renders a CBOR map key as a JSON object key.
fn map_key_to_string(key: &CborValue) -> String {
    match key {
        CborValue::Text(text) => text.clone(),
        CborValue::Integer(number) => number.to_string(),
        CborValue::Bool(flag) => flag.to_string(),
        _ => "unsupported_key".to_string(),
    }
}

/// Converts a CBOR integer into a JSON number, falling back to a decimal
/// string outside the 64-bit windows.
fn integer_to_json(number: i128) -> JsonValue {
    if let Ok(unsigned) = u64::try_from(number) {
        return JsonValue::Number(unsigned.into());
    }
    if let Ok(signed) = i64::try_from(number) {
        return JsonValue::Number(signed.into());
    }
    JsonValue::String(number.to_string())
}

// ============================================================================
// SECTION: Hex Helpers
// ============================================================================

/// Encodes bytes as lowercase hex.
#[must_use]
pub fn hex_encode(bytes: &[u8]) -> String {
    let mut encoded = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = std::fmt::Write::write_fmt(&mut encoded, format_args!("{byte:02x}"));
    }
    encoded
}
