// crates/mash-harness-core/tests/resolver_unit.rs
// ============================================================================
// Module: Name Resolver Unit Tests
// Description: Case-insensitive lookup and ranged numeric coercion.
// Purpose: Validate the parameter coercion policy against YAML-origin values.
// ============================================================================

//! Resolver tests, including values that arrive through a YAML parse the
//! way suite files deliver them (numbers as 64-bit floats).

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

use mash_harness_core::BuiltinNameRegistry;
use mash_harness_core::ResolveError;
use mash_harness_core::coerce_u64;
use mash_harness_core::resolve_attribute;
use mash_harness_core::resolve_endpoint;
use mash_harness_core::resolve_feature;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Name Lookup
// ============================================================================

#[test]
fn feature_names_resolve_case_insensitively() {
    let registry = BuiltinNameRegistry;
    let lower = resolve_feature(&registry, &json!("electrical")).unwrap();
    let upper = resolve_feature(&registry, &json!("ELECTRICAL")).unwrap();
    let mixed = resolve_feature(&registry, &json!("Electrical")).unwrap();
    assert_eq!(lower, upper);
    assert_eq!(lower, mixed);
}

#[test]
fn unknown_feature_name_fails_with_descriptive_error() {
    let registry = BuiltinNameRegistry;
    let err = resolve_feature(&registry, &json!("frobnicator")).unwrap_err();
    assert!(matches!(err, ResolveError::UnknownFeature(name) if name == "frobnicator"));
}

#[test]
fn attribute_resolution_requires_feature_context() {
    let registry = BuiltinNameRegistry;
    let feature = resolve_feature(&registry, &json!("electrical")).unwrap();
    let attribute = resolve_attribute(&registry, feature, &json!("power")).unwrap();
    assert_eq!(attribute, 1);

    // The same attribute name does not exist under another feature.
    let other = resolve_feature(&registry, &json!("diagnostics")).unwrap();
    let err = resolve_attribute(&registry, other, &json!("power")).unwrap_err();
    assert!(matches!(err, ResolveError::UnknownAttribute { .. }));
}

#[test]
fn endpoint_names_resolve() {
    let registry = BuiltinNameRegistry;
    assert_eq!(resolve_endpoint(&registry, &json!("root")).unwrap(), 0);
    assert_eq!(resolve_endpoint(&registry, &json!("EVSE")).unwrap(), 1);
}

// ============================================================================
// SECTION: Numeric Coercion
// ============================================================================

#[test]
fn yaml_origin_floats_coerce_when_integral() {
    // YAML scalars deserialize as f64; integral values must still resolve.
    let yaml: Value = serde_yaml::from_str("3.0").unwrap();
    let registry = BuiltinNameRegistry;
    assert_eq!(resolve_feature(&registry, &yaml).unwrap(), 3);
}

#[test]
fn fractional_floats_are_rejected() {
    let registry = BuiltinNameRegistry;
    let err = resolve_feature(&registry, &json!(3.5)).unwrap_err();
    assert!(matches!(err, ResolveError::WrongType { .. }));
}

#[test]
fn out_of_range_numbers_are_rejected() {
    let registry = BuiltinNameRegistry;
    let err = resolve_feature(&registry, &json!(300)).unwrap_err();
    assert!(matches!(
        err,
        ResolveError::OutOfRange {
            field: "feature_id",
            value: 300,
            max: 255,
        }
    ));

    let err = resolve_attribute(&registry, 2, &json!(70_000)).unwrap_err();
    assert!(matches!(err, ResolveError::OutOfRange { field: "attribute_id", .. }));
}

#[test]
fn negative_numbers_do_not_coerce() {
    assert!(coerce_u64(&json!(-1)).is_none());
    assert!(coerce_u64(&json!(-1.0)).is_none());
    assert_eq!(coerce_u64(&json!(7)), Some(7));
    assert_eq!(coerce_u64(&json!(7.0)), Some(7));
    assert!(coerce_u64(&json!("7")).is_none());
}
