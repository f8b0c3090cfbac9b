// crates/mash-harness-actions/src/support.rs
// ============================================================================
// Module: Handler Support
// Description: Shared parameter access and output-shape helpers.
// Purpose: Keep the tier-2 failure shapes identical across handlers.
// Dependencies: mash-harness-core
// ============================================================================

//! Small helpers every handler family leans on: required-parameter access,
//! per-action deadlines, the canonical timeout output shape, and hex
//! decoding for byte-carrying state variables.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use mash_harness_core::ActionError;
use mash_harness_core::ActionParams;
use mash_harness_core::OutputMap;
use mash_harness_core::StepContext;
use mash_harness_core::keys;

// ============================================================================
// SECTION: Parameter Access
// ============================================================================

/// Returns a required string parameter.
///
/// # Errors
///
/// Returns [`ActionError::MissingParameter`] when absent and
/// [`ActionError::InvalidParameter`] when not a string.
pub fn require_str<'a>(
    params: &'a ActionParams,
    name: &'static str,
) -> Result<&'a str, ActionError> {
    match params.get(name) {
        None => Err(ActionError::MissingParameter(name)),
        Some(value) => value.as_str().ok_or_else(|| ActionError::InvalidParameter {
            name,
            reason: format!("expected string, got {value}"),
        }),
    }
}

/// Returns a required unsigned parameter under the numeric coercion policy.
///
/// # Errors
///
/// Returns [`ActionError::MissingParameter`] when absent and
/// [`ActionError::InvalidParameter`] when not coercible.
pub fn require_u64(params: &ActionParams, name: &'static str) -> Result<u64, ActionError> {
    match params.get(name) {
        None => Err(ActionError::MissingParameter(name)),
        Some(value) => {
            mash_harness_core::coerce_u64(value).ok_or_else(|| ActionError::InvalidParameter {
                name,
                reason: format!("expected unsigned integer, got {value}"),
            })
        }
    }
}

/// Returns a required `u32` parameter with range enforcement.
///
/// # Errors
///
/// Returns [`ActionError`] when absent, uncoercible, or out of range.
pub fn require_u32(params: &ActionParams, name: &'static str) -> Result<u32, ActionError> {
    let raw = require_u64(params, name)?;
    u32::try_from(raw).map_err(|_| ActionError::InvalidParameter {
        name,
        reason: format!("out of range: {raw}"),
    })
}

// ============================================================================
// SECTION: Deadlines
// ============================================================================

/// Default wire deadline when neither a parameter nor much step budget
/// remains.
const MIN_WIRE_TIMEOUT_MS: u64 = 10;

/// Returns the wire deadline for an action: the `timeout_ms` parameter when
/// present, capped by the step's remaining budget.
#[must_use]
pub fn wire_timeout(ctx: &StepContext, params: &ActionParams) -> Duration {
    let remaining = ctx.remaining().max(Duration::from_millis(MIN_WIRE_TIMEOUT_MS));
    match params.u64_param("timeout_ms") {
        Some(requested) => remaining.min(Duration::from_millis(requested)),
        None => remaining,
    }
}

/// Returns a duration as whole milliseconds for output maps.
#[must_use]
pub fn as_millis_u64(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

// ============================================================================
// SECTION: Output Shapes
// ============================================================================

/// Canonical timeout output shape shared by read, write, and ping paths.
#[must_use]
pub fn timeout_output(success_key: &str, elapsed: Duration) -> OutputMap {
    let mut output = OutputMap::new();
    output.set_bool(success_key, false);
    output.set_str(keys::ERROR, "TIMEOUT");
    output.set_u64(keys::TIMEOUT_AFTER, as_millis_u64(elapsed));
    output
}

/// Canonical closed-connection output shape (tier 3).
#[must_use]
pub fn closed_output(error: &str) -> OutputMap {
    let mut output = OutputMap::new();
    output.set_bool(keys::CONNECTION_CLOSED, true);
    output.set_str(keys::ERROR, error);
    output
}

/// Canonical no-connection output shape for routing misses.
#[must_use]
pub fn no_connection_output(success_key: &str) -> OutputMap {
    let mut output = OutputMap::new();
    output.set_bool(success_key, false);
    output.set_str(keys::ERROR, keys::ERROR_NO_CONNECTION);
    output
}

// ============================================================================
// SECTION: Hex
// ============================================================================

/// Decodes lowercase or uppercase hex into bytes.
#[must_use]
pub fn hex_decode(text: &str) -> Option<Vec<u8>> {
    if text.len() % 2 != 0 {
        return None;
    }
    let mut bytes = Vec::with_capacity(text.len() / 2);
    let digits = text.as_bytes();
    for pair in digits.chunks_exact(2) {
        let high = (pair[0] as char).to_digit(16)?;
        let low = (pair[1] as char).to_digit(16)?;
        let byte = u8::try_from(high * 16 + low).ok()?;
        bytes.push(byte);
    }
    Some(bytes)
}
