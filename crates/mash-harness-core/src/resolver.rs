// crates/mash-harness-core/src/resolver.rs
// ============================================================================
// Module: Name Resolver
// Description: Feature, attribute, and endpoint name-to-id resolution.
// Purpose: Turn step parameters into range-checked protocol identifiers.
// Dependencies: crate::core, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Steps may address features, attributes, and endpoints either by name or
//! by number. Names resolve case-insensitively against a registry; numbers
//! accept float (YAML origin), signed integer, or the native unsigned type
//! and are range-checked. Attribute resolution always requires the feature
//! context because attribute ids are scoped per feature.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;
use thiserror::Error;

use crate::core::value::coerce_u64;

// ============================================================================
// SECTION: Registry Model
// ============================================================================

/// Attribute definition within a feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeDef {
    /// Attribute identifier, scoped to the owning feature.
    pub id: u16,
    /// Canonical attribute name.
    pub name: &'static str,
}

/// Feature definition with its attribute table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureDef {
    /// Feature identifier.
    pub id: u8,
    /// Canonical feature name.
    pub name: &'static str,
    /// Attributes owned by the feature.
    pub attributes: &'static [AttributeDef],
}

/// Endpoint definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointDef {
    /// Endpoint identifier.
    pub id: u8,
    /// Canonical endpoint name.
    pub name: &'static str,
}

/// Registry of protocol names, supplied by the device model.
pub trait NameRegistry: Send + Sync {
    /// Returns every known feature.
    fn features(&self) -> &[FeatureDef];

    /// Returns every known endpoint.
    fn endpoints(&self) -> &[EndpointDef];

    /// Looks up a feature by name, case-insensitively.
    fn feature_by_name(&self, name: &str) -> Option<&FeatureDef> {
        self.features().iter().find(|feature| feature.name.eq_ignore_ascii_case(name))
    }

    /// Looks up a feature by identifier.
    fn feature_by_id(&self, id: u8) -> Option<&FeatureDef> {
        self.features().iter().find(|feature| feature.id == id)
    }

    /// Looks up an attribute by name within a feature, case-insensitively.
    fn attribute_by_name(&self, feature_id: u8, name: &str) -> Option<&AttributeDef> {
        self.feature_by_id(feature_id)?
            .attributes
            .iter()
            .find(|attribute| attribute.name.eq_ignore_ascii_case(name))
    }

    /// Looks up an endpoint by name, case-insensitively.
    fn endpoint_by_name(&self, name: &str) -> Option<&EndpointDef> {
        self.endpoints().iter().find(|endpoint| endpoint.name.eq_ignore_ascii_case(name))
    }
}

// ============================================================================
// SECTION: Built-in Registry
// ============================================================================

/// Attribute table for the device-information feature.
const DEVICE_INFORMATION_ATTRS: &[AttributeDef] = &[
    AttributeDef {
        id: 1,
        name: "vendor_name",
    },
    AttributeDef {
        id: 2,
        name: "model",
    },
    AttributeDef {
        id: 3,
        name: "serial_number",
    },
    AttributeDef {
        id: 4,
        name: "firmware_version",
    },
];

/// Attribute table for the electrical feature.
const ELECTRICAL_ATTRS: &[AttributeDef] = &[
    AttributeDef {
        id: 1,
        name: "power",
    },
    AttributeDef {
        id: 2,
        name: "energy",
    },
    AttributeDef {
        id: 3,
        name: "voltage",
    },
    AttributeDef {
        id: 4,
        name: "current",
    },
];

/// Attribute table for the charging feature.
const CHARGING_ATTRS: &[AttributeDef] = &[
    AttributeDef {
        id: 1,
        name: "ev_connected",
    },
    AttributeDef {
        id: 2,
        name: "cable_plugged_in",
    },
    AttributeDef {
        id: 3,
        name: "charge_rate",
    },
    AttributeDef {
        id: 4,
        name: "charge_limit",
    },
];

/// Attribute table for the control feature.
const CONTROL_ATTRS: &[AttributeDef] = &[
    AttributeDef {
        id: 1,
        name: "operating_state",
    },
    AttributeDef {
        id: 2,
        name: "control_state",
    },
    AttributeDef {
        id: 3,
        name: "setpoint",
    },
    AttributeDef {
        id: 4,
        name: "process_state",
    },
];

/// Attribute table for the diagnostics feature.
const DIAGNOSTICS_ATTRS: &[AttributeDef] = &[
    AttributeDef {
        id: 1,
        name: "fault_count",
    },
    AttributeDef {
        id: 2,
        name: "uptime",
    },
];

/// Built-in feature table for the simulated device model.
const FEATURES: &[FeatureDef] = &[
    FeatureDef {
        id: 1,
        name: "device_information",
        attributes: DEVICE_INFORMATION_ATTRS,
    },
    FeatureDef {
        id: 2,
        name: "electrical",
        attributes: ELECTRICAL_ATTRS,
    },
    FeatureDef {
        id: 3,
        name: "charging",
        attributes: CHARGING_ATTRS,
    },
    FeatureDef {
        id: 4,
        name: "control",
        attributes: CONTROL_ATTRS,
    },
    FeatureDef {
        id: 5,
        name: "diagnostics",
        attributes: DIAGNOSTICS_ATTRS,
    },
];

/// Built-in endpoint table for the simulated device model.
const ENDPOINTS: &[EndpointDef] = &[
    EndpointDef {
        id: 0,
        name: "root",
    },
    EndpointDef {
        id: 1,
        name: "evse",
    },
    EndpointDef {
        id: 2,
        name: "meter",
    },
    EndpointDef {
        id: 3,
        name: "inverter",
    },
];

/// Built-in registry mirroring the simulated device model.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinNameRegistry;

impl NameRegistry for BuiltinNameRegistry {
    fn features(&self) -> &[FeatureDef] {
        FEATURES
    }

    fn endpoints(&self) -> &[EndpointDef] {
        ENDPOINTS
    }
}

// ============================================================================
// SECTION: Resolution Errors
// ============================================================================

/// Errors raised while resolving protocol identifiers.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    /// Feature name was not found in the registry.
    #[error("unknown feature name: {0}")]
    UnknownFeature(String),
    /// Attribute name was not found within the feature.
    #[error("unknown attribute name for feature {feature_id}: {name}")]
    UnknownAttribute {
        /// Feature context used for the lookup.
        feature_id: u8,
        /// Attribute name that failed to resolve.
        name: String,
    },
    /// Endpoint name was not found in the registry.
    #[error("unknown endpoint name: {0}")]
    UnknownEndpoint(String),
    /// Numeric identifier fell outside the field's range.
    #[error("{field} out of range: {value} (max {max})")]
    OutOfRange {
        /// Field label for diagnostics.
        field: &'static str,
        /// Offending value.
        value: u64,
        /// Inclusive maximum for the field.
        max: u64,
    },
    /// Value was neither a usable number nor a string.
    #[error("{field} must be a name or a number")]
    WrongType {
        /// Field label for diagnostics.
        field: &'static str,
    },
}

// ============================================================================
// SECTION: Resolution
// ============================================================================

/// Resolves a feature identifier from a name or number.
///
/// # Errors
///
/// Returns [`ResolveError`] on unknown names, out-of-range numbers, or
/// unusable value types.
pub fn resolve_feature(registry: &dyn NameRegistry, value: &Value) -> Result<u8, ResolveError> {
    match value {
        Value::String(name) => registry
            .feature_by_name(name)
            .map(|feature| feature.id)
            .ok_or_else(|| ResolveError::UnknownFeature(name.clone())),
        _ => ranged_u8(value, "feature_id"),
    }
}

/// Resolves an attribute identifier from a name or number, within a feature.
///
/// # Errors
///
/// Returns [`ResolveError`] on unknown names, out-of-range numbers, or
/// unusable value types.
pub fn resolve_attribute(
    registry: &dyn NameRegistry,
    feature_id: u8,
    value: &Value,
) -> Result<u16, ResolveError> {
    match value {
        Value::String(name) => registry
            .attribute_by_name(feature_id, name)
            .map(|attribute| attribute.id)
            .ok_or_else(|| ResolveError::UnknownAttribute {
                feature_id,
                name: name.clone(),
            }),
        _ => ranged_u16(value, "attribute_id"),
    }
}

/// Resolves an endpoint identifier from a name or number.
///
/// # Errors
///
/// Returns [`ResolveError`] on unknown names, out-of-range numbers, or
/// unusable value types.
pub fn resolve_endpoint(registry: &dyn NameRegistry, value: &Value) -> Result<u8, ResolveError> {
    match value {
        Value::String(name) => registry
            .endpoint_by_name(name)
            .map(|endpoint| endpoint.id)
            .ok_or_else(|| ResolveError::UnknownEndpoint(name.clone())),
        _ => ranged_u8(value, "endpoint_id"),
    }
}

/// Coerces a numeric value into `u8` with range enforcement.
fn ranged_u8(value: &Value, field: &'static str) -> Result<u8, ResolveError> {
    let raw = coerce_u64(value).ok_or(ResolveError::WrongType {
        field,
    })?;
    u8::try_from(raw).map_err(|_| ResolveError::OutOfRange {
        field,
        value: raw,
        max: u64::from(u8::MAX),
    })
}

/// Coerces a numeric value into `u16` with range enforcement.
fn ranged_u16(value: &Value, field: &'static str) -> Result<u16, ResolveError> {
    let raw = coerce_u64(value).ok_or(ResolveError::WrongType {
        field,
    })?;
    u16::try_from(raw).map_err(|_| ResolveError::OutOfRange {
        field,
        value: raw,
        max: u64::from(u16::MAX),
    })
}
