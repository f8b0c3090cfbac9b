// crates/mash-harness-actions/src/zones.rs
// ============================================================================
// Module: Zone Actions
// Description: Zone creation, deletion, enumeration, and priority scans.
// Purpose: Drive the zone sub-state and its CA material from suite steps.
// Dependencies: crate::{execution, support}, mash-harness-core, mash-harness-net
// ============================================================================

//! ## Overview
//! `create_zone` mints the zone CA and controller certificate, fingerprints
//! the CA, and registers the zone under the cap and type-uniqueness rules;
//! rejections are tier-2 outputs, not hard errors. Priority scans break ties
//! by insertion order and return empty strings on an empty candidate set.

// ============================================================================
// SECTION: Imports
// ============================================================================

use mash_harness_core::ActionError;
use mash_harness_core::ActionParams;
use mash_harness_core::OutputMap;
use mash_harness_core::StepContext;
use mash_harness_core::Timestamp;
use mash_harness_core::ZoneError;
use mash_harness_core::ZoneInfo;
use mash_harness_core::ZoneType;
use mash_harness_core::generate_zone_id;
use mash_harness_core::is_valid_zone_id;
use mash_harness_core::keys;
use mash_harness_core::registry::HandlerFuture;
use mash_harness_net::generate_zone_crypto;
use serde_json::Value;
use serde_json::json;

use crate::execution::Execution;
use crate::support::require_str;

// ============================================================================
// SECTION: Creation
// ============================================================================

/// Outcome of the shared zone-creation path.
pub(crate) struct CreatedZone {
    /// Zone identifier.
    pub zone_id: String,
    /// CA fingerprint.
    pub fingerprint: String,
}

/// Shared creation path used by `create_zone` and `commission`.
///
/// # Errors
///
/// Returns a tier-2 output map as `Err` when the zone set rejects the
/// insertion or crypto generation fails.
pub(crate) fn create_zone_record(
    exec: &mut Execution,
    zone_id: Option<String>,
    zone_name: &str,
    zone_type: ZoneType,
) -> Result<CreatedZone, OutputMap> {
    let zone_id = match zone_id {
        Some(id) => {
            if !is_valid_zone_id(&id) {
                let mut output = OutputMap::new();
                output.set_bool(keys::ZONE_CREATED, false);
                output.set_str(keys::ERROR, format!("invalid zone id: {id}"));
                output.set_str(keys::ERROR_CODE, keys::CODE_INVALID_PARAMETER);
                return Err(output);
            }
            id
        }
        None => generate_zone_id(&mut rand::thread_rng()),
    };

    let generated = match generate_zone_crypto(
        &zone_id,
        zone_type.as_str(),
        &exec.state.controller.controller_id,
    ) {
        Ok(generated) => generated,
        Err(err) => {
            let mut output = OutputMap::new();
            output.set_bool(keys::ZONE_CREATED, false);
            output.set_str(keys::ERROR, err.to_string());
            return Err(output);
        }
    };

    let mut info = ZoneInfo::new(&zone_id, zone_name, zone_type, Timestamp::now());
    info.ca_fingerprint = Some(generated.fingerprint.clone());
    if let Err(err) = exec.state.zones.insert(info) {
        let mut output = OutputMap::new();
        output.set_bool(keys::ZONE_CREATED, false);
        output.set_str(keys::ZONE_ID, &zone_id);
        output.set_str(keys::ERROR, err.to_string());
        let code = match err {
            ZoneError::CapReached(_) => keys::CODE_MAX_CONNECTIONS_EXCEEDED,
            ZoneError::DuplicateType(_) | ZoneError::DuplicateId(_) => {
                keys::CODE_INVALID_PARAMETER
            }
        };
        output.set_str(keys::ERROR_CODE, code);
        return Err(output);
    }
    exec.zone_crypto.insert(zone_id.clone(), generated.crypto);
    Ok(CreatedZone {
        zone_id,
        fingerprint: generated.fingerprint,
    })
}

/// `create_zone`: creates a zone with fresh CA material.
pub(crate) fn create_zone<'a>(
    _ctx: &'a StepContext,
    params: &'a ActionParams,
    exec: &'a mut Execution,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let zone_type_label = require_str(params, "zone_type")?;
        let zone_type =
            ZoneType::parse(zone_type_label).ok_or_else(|| ActionError::InvalidParameter {
                name: "zone_type",
                reason: format!("unknown zone type: {zone_type_label}"),
            })?;
        let zone_name =
            params.str_param("zone_name").unwrap_or(zone_type_label).to_string();
        let zone_id = params.str_param("zone_id").map(str::to_string);

        let created = match create_zone_record(exec, zone_id, &zone_name, zone_type) {
            Ok(created) => created,
            Err(output) => return Ok(output),
        };

        let mut output = OutputMap::new();
        output.set_bool(keys::ZONE_CREATED, true);
        output.set_str(keys::ZONE_ID, &created.zone_id);
        output.set_str(keys::ZONE_NAME, zone_name);
        output.set_str(keys::ZONE_TYPE, zone_type.as_str());
        output.set_u64(keys::ZONE_PRIORITY, u64::from(zone_type.priority()));
        output.set_str(keys::CA_FINGERPRINT, created.fingerprint);
        output.set_u64(keys::ZONE_COUNT, exec.state.zones.len() as u64);
        Ok(output)
    })
}

// ============================================================================
// SECTION: Deletion and Enumeration
// ============================================================================

/// `delete_zone`: removes a zone, its crypto, and any live connection;
/// idempotent.
pub(crate) fn delete_zone<'a>(
    _ctx: &'a StepContext,
    params: &'a ActionParams,
    exec: &'a mut Execution,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let zone_id = require_str(params, "zone_id")?.to_string();
        let removed = exec.state.zones.remove(&zone_id);
        exec.zone_crypto.remove(&zone_id);
        let _ = exec.manager.disconnect_zone(&zone_id).await;
        let mut output = OutputMap::new();
        output.set_bool(keys::ZONE_REMOVED, removed);
        output.set_str(keys::ZONE_ID, &zone_id);
        output.set_u64(keys::ZONE_COUNT, exec.state.zones.len() as u64);
        Ok(output)
    })
}

/// `list_zones`: enumerates zones in insertion order.
pub(crate) fn list_zones<'a>(
    _ctx: &'a StepContext,
    _params: &'a ActionParams,
    exec: &'a mut Execution,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let zones: Vec<Value> = exec
            .state
            .zones
            .in_order()
            .map(|zone| {
                json!({
                    "zone_id": zone.zone_id,
                    "zone_name": zone.zone_name,
                    "zone_type": zone.zone_type.as_str(),
                    "priority": zone.priority,
                    "connected": zone.connected,
                })
            })
            .collect();
        let mut output = OutputMap::new();
        output.set_u64(keys::ZONE_COUNT, zones.len() as u64);
        output.set_value(keys::ZONES, Value::Array(zones));
        Ok(output)
    })
}

// ============================================================================
// SECTION: Priority Scans
// ============================================================================

/// Shapes the priority-scan output, empty strings when no zone qualifies.
fn priority_output(zone: Option<&ZoneInfo>) -> OutputMap {
    let mut output = OutputMap::new();
    match zone {
        Some(zone) => {
            output.set_str(keys::ZONE_ID, &zone.zone_id);
            output.set_str(keys::ZONE_TYPE, zone.zone_type.as_str());
            output.set_u64(keys::ZONE_PRIORITY, u64::from(zone.priority));
        }
        None => {
            output.set_str(keys::ZONE_ID, "");
            output.set_str(keys::ZONE_TYPE, "");
        }
    }
    output
}

/// `highest_priority_zone`: single-pass scan, insertion order breaks ties.
pub(crate) fn highest_priority_zone<'a>(
    _ctx: &'a StepContext,
    _params: &'a ActionParams,
    exec: &'a mut Execution,
) -> HandlerFuture<'a> {
    Box::pin(async move { Ok(priority_output(exec.state.zones.highest_priority())) })
}

/// `highest_priority_connected_zone`: scan restricted to connected zones.
pub(crate) fn highest_priority_connected_zone<'a>(
    _ctx: &'a StepContext,
    _params: &'a ActionParams,
    exec: &'a mut Execution,
) -> HandlerFuture<'a> {
    Box::pin(
        async move { Ok(priority_output(exec.state.zones.highest_priority_connected())) },
    )
}

/// `verify_zone_id_derivation`: checks the 16-hex-character shape.
pub(crate) fn verify_zone_id_derivation<'a>(
    _ctx: &'a StepContext,
    params: &'a ActionParams,
    exec: &'a mut Execution,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let zone_id = params
            .str_param("zone_id")
            .map(str::to_string)
            .or_else(|| exec.state.session.zone_id().map(str::to_string))
            .ok_or(ActionError::MissingParameter("zone_id"))?;
        let mut output = OutputMap::new();
        output.set_bool(keys::ZONE_ID_VALID, is_valid_zone_id(&zone_id));
        output.set_str(keys::ZONE_ID, zone_id);
        Ok(output)
    })
}
