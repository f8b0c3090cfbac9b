// crates/mash-harness-actions/src/commissioning.rs
// ============================================================================
// Module: Commissioning Actions
// Description: Prerequisite checks and zone enrollment for a device.
// Purpose: Record the commissioned zone and its crypto in the suite session.
// Dependencies: crate::{execution, support, zones}, mash-harness-core
// ============================================================================

//! ## Overview
//! Commissioning enrolls the device into a fresh zone: the PASE-phase
//! connection is established (unless the step opts out for offline tests),
//! the zone and its CA material are created, the suite session records the
//! commissioned zone so later steps can reconnect, and the controller binds
//! the device into the zone.

// ============================================================================
// SECTION: Imports
// ============================================================================

use mash_harness_core::ActionError;
use mash_harness_core::ActionParams;
use mash_harness_core::OutputMap;
use mash_harness_core::StepContext;
use mash_harness_core::Timestamp;
use mash_harness_core::ZoneType;
use mash_harness_core::keys;
use mash_harness_core::registry::HandlerFuture;

use crate::execution::Execution;
use crate::zones::create_zone_record;

// ============================================================================
// SECTION: Prerequisites
// ============================================================================

/// `verify_commissioning_prerequisites`: setup code and discovery checks.
pub(crate) fn verify_commissioning_prerequisites<'a>(
    _ctx: &'a StepContext,
    params: &'a ActionParams,
    exec: &'a mut Execution,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let setup_code = params
            .str_param("setup_code")
            .map(str::to_string)
            .or_else(|| exec.config.setup_code.clone());
        let code_ok = setup_code
            .as_deref()
            .is_some_and(|code| code.len() == 8 && code.chars().all(|ch| ch.is_ascii_digit()));
        let discovery_ok = exec.state.discovery.qr_payload.is_some()
            || exec
                .state
                .discovery
                .services
                .iter()
                .any(|service| service.kind == mash_harness_core::ServiceKind::Commissionable);
        let mut output = OutputMap::new();
        output.set_bool(keys::PREREQUISITES_MET, code_ok && discovery_ok);
        if !code_ok {
            output.set_str(keys::ERROR, "missing or malformed setup code");
        } else if !discovery_ok {
            output.set_str(keys::ERROR, "no commissionable device discovered");
        }
        Ok(output)
    })
}

// ============================================================================
// SECTION: Commission
// ============================================================================

/// `commission`: enrolls the device into a fresh zone and records the suite
/// session.
pub(crate) fn commission<'a>(
    _ctx: &'a StepContext,
    params: &'a ActionParams,
    exec: &'a mut Execution,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let zone_type_label = params.str_param("zone_type").unwrap_or("LOCAL");
        let zone_type =
            ZoneType::parse(zone_type_label).ok_or_else(|| ActionError::InvalidParameter {
                name: "zone_type",
                reason: format!("unknown zone type: {zone_type_label}"),
            })?;
        let zone_name = params.str_param("zone_name").unwrap_or("commissioned").to_string();
        let device_id = params.str_param("device_id").unwrap_or("mash-dev-1").to_string();
        let offline = params.bool_param("offline").unwrap_or(false);

        if !offline {
            // PASE-phase connection: no zone CA exists yet.
            if let Err(err) = exec.manager.ensure_connected(None, None).await {
                let mut output = OutputMap::new();
                output.set_bool(keys::COMMISSIONING_COMPLETE, false);
                output.set_str(keys::TARGET, exec.manager.target());
                output.set_str(keys::ERROR, err.to_string());
                output.set_str(keys::ERROR_CODE, keys::CODE_CONNECTION_FAILED);
                return Ok(output);
            }
        }

        let created = match create_zone_record(exec, None, &zone_name, zone_type) {
            Ok(created) => created,
            Err(mut output) => {
                output.set_bool(keys::COMMISSIONING_COMPLETE, false);
                return Ok(output);
            }
        };

        let crypto = match exec.zone_crypto.get(&created.zone_id) {
            Some(crypto) => crypto.clone(),
            None => {
                return Err(ActionError::State(format!(
                    "zone crypto missing for {}",
                    created.zone_id
                )));
            }
        };
        exec.state.session.record(&created.zone_id, crypto);
        exec.state.controller.bind_device(&device_id, &created.zone_id);
        if let Some(zone) = exec.state.zones.get_mut(&created.zone_id) {
            zone.device_ids.push(device_id.clone());
            zone.last_seen = Timestamp::now();
        }

        let mut output = OutputMap::new();
        output.set_bool(keys::COMMISSIONING_COMPLETE, true);
        output.set_str(keys::ZONE_ID, &created.zone_id);
        output.set_str(keys::ZONE_TYPE, zone_type.as_str());
        output.set_str(keys::CA_FINGERPRINT, created.fingerprint);
        output.set_str("device_id", device_id);
        Ok(output)
    })
}
