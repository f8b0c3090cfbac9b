// crates/mash-harness-core/tests/config_validation.rs
// ============================================================================
// Module: Configuration Validation Tests
// Description: Target shape and limit-window enforcement.
// Purpose: Validate that unusable configurations fail closed.
// ============================================================================

//! Boundary tests for harness configuration validation.

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

use mash_harness_core::ConfigError;
use mash_harness_core::HarnessConfig;

// ============================================================================
// SECTION: Defaults
// ============================================================================

#[test]
fn defaults_validate() {
    let config = HarnessConfig::for_target("localhost:5540");
    assert!(config.validate().is_ok());
    assert_eq!(config.max_frame_size, 65_536);
    assert_eq!(config.max_zones, 5);
    assert_eq!(config.renewal_nonce_len, 32);
}

// ============================================================================
// SECTION: Targets
// ============================================================================

#[test]
fn target_requires_host_and_numeric_port() {
    for target in ["", "localhost", ":5540", "localhost:", "localhost:port"] {
        let config = HarnessConfig::for_target(target);
        assert!(
            matches!(config.validate(), Err(ConfigError::InvalidTarget(_))),
            "target should be rejected: {target}"
        );
    }
    assert!(HarnessConfig::for_target("192.0.2.1:1").validate().is_ok());
}

// ============================================================================
// SECTION: Limit Windows
// ============================================================================

#[test]
fn frame_size_window_is_enforced() {
    let mut config = HarnessConfig::for_target("localhost:5540");
    config.max_frame_size = 8;
    assert!(matches!(config.validate(), Err(ConfigError::FrameSizeRange(8))));
    config.max_frame_size = 64 * 1024 * 1024;
    assert!(matches!(config.validate(), Err(ConfigError::FrameSizeRange(_))));
}

#[test]
fn zone_cap_window_is_enforced() {
    let mut config = HarnessConfig::for_target("localhost:5540");
    config.max_zones = 0;
    assert!(matches!(config.validate(), Err(ConfigError::ZoneCapRange(0))));
    config.max_zones = 17;
    assert!(matches!(config.validate(), Err(ConfigError::ZoneCapRange(17))));
}

#[test]
fn zero_step_timeout_is_rejected() {
    let mut config = HarnessConfig::for_target("localhost:5540");
    config.step_timeout_ms = 0;
    assert!(matches!(config.validate(), Err(ConfigError::ZeroStepTimeout)));
}

#[test]
fn nonce_length_window_is_enforced() {
    let mut config = HarnessConfig::for_target("localhost:5540");
    config.renewal_nonce_len = 8;
    assert!(matches!(config.validate(), Err(ConfigError::NonceLenRange(8))));
    config.renewal_nonce_len = 128;
    assert!(matches!(config.validate(), Err(ConfigError::NonceLenRange(128))));
}

#[test]
fn setup_code_must_be_eight_digits() {
    let mut config = HarnessConfig::for_target("localhost:5540");
    config.setup_code = Some("1234".to_string());
    assert!(matches!(config.validate(), Err(ConfigError::InvalidSetupCode)));
    config.setup_code = Some("12a45678".to_string());
    assert!(matches!(config.validate(), Err(ConfigError::InvalidSetupCode)));
    config.setup_code = Some("12345678".to_string());
    assert!(config.validate().is_ok());
}

// ============================================================================
// SECTION: Serde Shape
// ============================================================================

#[test]
fn unknown_fields_are_rejected_on_deserialize() {
    let yaml = "target: localhost:5540\nsurprise: true\n";
    let parsed: Result<HarnessConfig, _> = serde_yaml::from_str(yaml);
    assert!(parsed.is_err());
}

#[test]
fn minimal_yaml_deserializes_with_defaults() {
    let yaml = "target: localhost:5540\n";
    let parsed: HarnessConfig = serde_yaml::from_str(yaml).unwrap();
    assert!(parsed.validate().is_ok());
    assert_eq!(parsed.step_timeout_ms, 10_000);
}
