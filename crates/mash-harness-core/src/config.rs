// crates/mash-harness-core/src/config.rs
// ============================================================================
// Module: Harness Configuration
// Description: Validated configuration for a suite run.
// Purpose: Reject unusable targets and limits before any step executes.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! The surrounding runner supplies one configuration per suite: the device
//! target, optional pairing material, and the process-wide limits (frame
//! cap, zone cap, step budget). Validation fails closed; a configuration
//! that does not validate never reaches the step runtime.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Default maximum frame size in bytes.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 65_536;

/// Default cap on zone-scoped connections.
pub const DEFAULT_MAX_ZONES: usize = 5;

/// Default per-step budget in milliseconds.
pub const DEFAULT_STEP_TIMEOUT_MS: u64 = 10_000;

/// Default renewal nonce length in bytes.
pub const DEFAULT_RENEWAL_NONCE_LEN: usize = 32;

/// Hard ceiling on the configurable frame size.
const MAX_FRAME_SIZE_CEILING: usize = 16 * 1024 * 1024;

// ============================================================================
// SECTION: Configuration Errors
// ============================================================================

/// Errors raised by configuration validation.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Target was empty or not `host:port` shaped.
    #[error("invalid target: {0}")]
    InvalidTarget(String),
    /// Frame size fell outside the supported window.
    #[error("max_frame_size out of range: {0}")]
    FrameSizeRange(usize),
    /// Zone cap fell outside the supported window.
    #[error("max_zones out of range: {0}")]
    ZoneCapRange(usize),
    /// Step timeout was zero.
    #[error("step_timeout_ms must be non-zero")]
    ZeroStepTimeout,
    /// Renewal nonce length fell outside the supported window.
    #[error("renewal_nonce_len out of range: {0}")]
    NonceLenRange(usize),
    /// Setup code was present but not 8 decimal digits.
    #[error("invalid setup code")]
    InvalidSetupCode,
}

// ============================================================================
// SECTION: Harness Configuration
// ============================================================================

/// Per-suite harness configuration.
///
/// # Invariants
/// - `validate` has accepted the instance before any step executes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HarnessConfig {
    /// Device target as `host:port`.
    pub target: String,
    /// Optional pairing setup code (8 decimal digits).
    #[serde(default)]
    pub setup_code: Option<String>,
    /// Optional enable key for test-trigger frames.
    #[serde(default)]
    pub enable_key: Option<String>,
    /// Maximum frame size in bytes, both directions.
    #[serde(default = "default_max_frame_size")]
    pub max_frame_size: usize,
    /// Cap on zone-scoped connections.
    #[serde(default = "default_max_zones")]
    pub max_zones: usize,
    /// Per-step budget in milliseconds.
    #[serde(default = "default_step_timeout_ms")]
    pub step_timeout_ms: u64,
    /// Renewal nonce length in bytes.
    #[serde(default = "default_renewal_nonce_len")]
    pub renewal_nonce_len: usize,
    /// Accept any server certificate on pre-commissioning connections.
    #[serde(default = "default_true")]
    pub accept_uncommissioned_peer: bool,
}

impl HarnessConfig {
    /// Creates a configuration with defaults for the given target.
    #[must_use]
    pub fn for_target(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            setup_code: None,
            enable_key: None,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            max_zones: DEFAULT_MAX_ZONES,
            step_timeout_ms: DEFAULT_STEP_TIMEOUT_MS,
            renewal_nonce_len: DEFAULT_RENEWAL_NONCE_LEN,
            accept_uncommissioned_peer: true,
        }
    }

    /// Returns the per-step budget as a duration.
    #[must_use]
    pub const fn step_timeout(&self) -> Duration {
        Duration::from_millis(self.step_timeout_ms)
    }

    /// Validates limits and target shape.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for any field outside its supported window.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let (host, port) = self
            .target
            .rsplit_once(':')
            .ok_or_else(|| ConfigError::InvalidTarget(self.target.clone()))?;
        if host.is_empty() || port.parse::<u16>().is_err() {
            return Err(ConfigError::InvalidTarget(self.target.clone()));
        }
        if self.max_frame_size < 16 || self.max_frame_size > MAX_FRAME_SIZE_CEILING {
            return Err(ConfigError::FrameSizeRange(self.max_frame_size));
        }
        if self.max_zones == 0 || self.max_zones > 16 {
            return Err(ConfigError::ZoneCapRange(self.max_zones));
        }
        if self.step_timeout_ms == 0 {
            return Err(ConfigError::ZeroStepTimeout);
        }
        if self.renewal_nonce_len < 16 || self.renewal_nonce_len > 64 {
            return Err(ConfigError::NonceLenRange(self.renewal_nonce_len));
        }
        if let Some(code) = &self.setup_code
            && (code.len() != 8 || !code.chars().all(|ch| ch.is_ascii_digit()))
        {
            return Err(ConfigError::InvalidSetupCode);
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Serde Defaults
// ============================================================================

/// Serde default for the frame cap.
const fn default_max_frame_size() -> usize {
    DEFAULT_MAX_FRAME_SIZE
}

/// Serde default for the zone cap.
const fn default_max_zones() -> usize {
    DEFAULT_MAX_ZONES
}

/// Serde default for the step budget.
const fn default_step_timeout_ms() -> u64 {
    DEFAULT_STEP_TIMEOUT_MS
}

/// Serde default for the renewal nonce length.
const fn default_renewal_nonce_len() -> usize {
    DEFAULT_RENEWAL_NONCE_LEN
}

/// Serde default for boolean flags that default on.
const fn default_true() -> bool {
    true
}
