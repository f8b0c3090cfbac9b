// crates/mash-harness-actions/src/discovery.rs
// ============================================================================
// Module: Discovery Actions
// Description: Simulated mDNS browse, device waits, and QR payload handling.
// Purpose: Produce deterministic discovery results from precondition flags.
// Dependencies: crate::{execution, support}, mash-harness-core
// ============================================================================

//! ## Overview
//! Discovery is a simulator. Precondition flags placed into execution-state
//! variables by test setup (`device_in_zone`, `no_devices_advertising`, and
//! friends) select a deterministic synthesized result set; the branch is
//! taken before any real network call so runs never block on mDNS. When no
//! flag selects a scenario, browse reports `device_found=false` with
//! `error="browse_timeout"`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use mash_harness_core::ActionError;
use mash_harness_core::ActionParams;
use mash_harness_core::DiscoveredService;
use mash_harness_core::OutputMap;
use mash_harness_core::QrPayload;
use mash_harness_core::ServiceKind;
use mash_harness_core::StepContext;
use mash_harness_core::keys;
use mash_harness_core::registry::HandlerFuture;
use rand::Rng;

use crate::execution::Execution;

// ============================================================================
// SECTION: Precondition Flags
// ============================================================================

/// Flag: one device commissioned into the expected zone.
const FLAG_DEVICE_IN_ZONE: &str = "device_in_zone";
/// Flag: one device commissioned into two zones.
const FLAG_DEVICE_IN_TWO_ZONES: &str = "device_in_two_zones";
/// Flag: nothing advertising at all.
const FLAG_NO_DEVICES: &str = "no_devices_advertising";
/// Flag: several controllers on the network.
const FLAG_MULTIPLE_CONTROLLERS: &str = "multiple_controllers_running";
/// Flag: several commissioned devices advertising.
const FLAG_MULTIPLE_DEVICES: &str = "multiple_devices_commissioned";
/// Flag: two commissionable devices sharing a discriminator.
const FLAG_SAME_DISCRIMINATOR: &str = "two_devices_same_discriminator";

// ============================================================================
// SECTION: Service Synthesis
// ============================================================================

/// Builds one synthesized service record.
fn service(
    instance: &str,
    kind: ServiceKind,
    discriminator: u16,
    zone_id: Option<&str>,
) -> DiscoveredService {
    let mut txt = BTreeMap::new();
    txt.insert("D".to_string(), discriminator.to_string());
    txt.insert("VP".to_string(), "65521+32769".to_string());
    txt.insert("CM".to_string(), "1".to_string());
    if let Some(zone_id) = zone_id {
        txt.insert("Z".to_string(), zone_id.to_string());
    }
    DiscoveredService {
        instance_name: instance.to_string(),
        host: format!("{instance}.local"),
        port: 5_540,
        addresses: vec!["192.0.2.10".to_string()],
        kind,
        txt,
        discriminator,
    }
}

/// Returns the zone identifier the scenario should bind services to.
fn expected_zone(exec: &Execution) -> String {
    exec.state
        .session
        .zone_id()
        .map(str::to_string)
        .unwrap_or_else(|| "0000000000000000".to_string())
}

/// Synthesizes the browse result set for the active flag combination.
fn synthesize(exec: &Execution) -> Option<Vec<DiscoveredService>> {
    let state = &exec.state;
    if state.flag(FLAG_NO_DEVICES) {
        return Some(Vec::new());
    }
    if state.flag(FLAG_DEVICE_IN_TWO_ZONES) {
        let zone = expected_zone(exec);
        return Some(vec![
            service("mash-dev-1", ServiceKind::Operational, 0x0101, Some(&zone)),
            service("mash-dev-1-alt", ServiceKind::Operational, 0x0101, Some("f1f2f3f4f5f6f7f8")),
        ]);
    }
    if state.flag(FLAG_DEVICE_IN_ZONE) {
        let zone = expected_zone(exec);
        return Some(vec![service("mash-dev-1", ServiceKind::Operational, 0x0101, Some(&zone))]);
    }
    if state.flag(FLAG_MULTIPLE_DEVICES) {
        let zone = expected_zone(exec);
        return Some(vec![
            service("mash-dev-1", ServiceKind::Operational, 0x0101, Some(&zone)),
            service("mash-dev-2", ServiceKind::Operational, 0x0102, Some(&zone)),
            service("mash-dev-3", ServiceKind::Operational, 0x0103, Some(&zone)),
        ]);
    }
    if state.flag(FLAG_SAME_DISCRIMINATOR) {
        return Some(vec![
            service("mash-pair-a", ServiceKind::Commissionable, 0x00aa, None),
            service("mash-pair-b", ServiceKind::Commissionable, 0x00aa, None),
        ]);
    }
    if state.flag(FLAG_MULTIPLE_CONTROLLERS) {
        return Some(vec![
            service("mash-ctl-1", ServiceKind::Controller, 0, None),
            service("mash-ctl-2", ServiceKind::Controller, 0, None),
        ]);
    }
    None
}

// ============================================================================
// SECTION: Browse Handlers
// ============================================================================

/// `browse_mdns`: deterministic browse over the precondition flags.
pub(crate) fn browse_mdns<'a>(
    _ctx: &'a StepContext,
    _params: &'a ActionParams,
    exec: &'a mut Execution,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let mut output = OutputMap::new();
        output.set_bool(keys::DISCOVERY_STARTED, true);

        let Some(services) = synthesize(exec) else {
            exec.state.discovery.end_browse();
            output.set_bool(keys::DEVICE_FOUND, false);
            output.set_str(keys::ERROR, keys::ERROR_BROWSE_TIMEOUT);
            return Ok(output);
        };

        let token: u64 = rand::thread_rng().r#gen();
        let device_services: Vec<&DiscoveredService> = services
            .iter()
            .filter(|entry| entry.kind != ServiceKind::Controller)
            .collect();
        let controllers =
            services.iter().filter(|entry| entry.kind == ServiceKind::Controller).count();

        output.set_bool(keys::DEVICE_FOUND, !device_services.is_empty());
        output.set_u64(keys::SERVICES_FOUND, services.len() as u64);
        if controllers > 0 {
            output.set_u64(keys::CONTROLLERS_FOUND, controllers as u64);
        }
        let first_instance = device_services.first().map(|entry| entry.instance_name.clone());
        if let Some(instance) = first_instance {
            let instances = device_services
                .iter()
                .filter(|entry| entry.instance_name.starts_with(instance.trim_end_matches("-alt")))
                .count();
            output.set_u64(keys::INSTANCES_FOR_DEVICE, instances as u64);
        }

        let zone = expected_zone(exec);
        let all_in_zone = !device_services.is_empty()
            && device_services
                .iter()
                .all(|entry| entry.txt.get("Z").is_some_and(|txt_zone| txt_zone == &zone));
        output.set_bool(keys::ALL_RESULTS_IN_ZONE, all_in_zone);

        exec.state.discovery.begin_browse(token, services);
        Ok(output)
    })
}

/// `wait_for_device`: finds a discriminator match, or synthesizes the
/// commissionable stand-in when no discriminator is given.
pub(crate) fn wait_for_device<'a>(
    _ctx: &'a StepContext,
    params: &'a ActionParams,
    exec: &'a mut Execution,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let mut output = OutputMap::new();
        match params.u64_param("discriminator") {
            Some(raw) => {
                let discriminator =
                    u16::try_from(raw).map_err(|_| ActionError::InvalidParameter {
                        name: "discriminator",
                        reason: format!("out of range: {raw}"),
                    })?;
                let matched = exec
                    .state
                    .discovery
                    .services
                    .iter()
                    .find(|entry| entry.discriminator == discriminator);
                match matched {
                    Some(entry) => {
                        output.set_bool(keys::DEVICE_FOUND, true);
                        output.set_str("instance_name", entry.instance_name.clone());
                        output.set_bool(keys::TXT_VALID, entry.txt_valid());
                    }
                    None => {
                        output.set_bool(keys::DEVICE_FOUND, false);
                        output.set_str(keys::ERROR, keys::ERROR_BROWSE_TIMEOUT);
                    }
                }
            }
            None => {
                let stand_in = service("MASH-SIM-0000", ServiceKind::Commissionable, 0, None);
                output.set_bool(keys::DEVICE_FOUND, true);
                output.set_str("instance_name", stand_in.instance_name.clone());
                output.set_bool(keys::TXT_VALID, stand_in.txt_valid());
                exec.state.discovery.services.push(stand_in);
            }
        }
        Ok(output)
    })
}

/// `browse_controllers`: controller-instance browse over the flags.
pub(crate) fn browse_controllers<'a>(
    _ctx: &'a StepContext,
    _params: &'a ActionParams,
    exec: &'a mut Execution,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let mut output = OutputMap::new();
        output.set_bool(keys::DISCOVERY_STARTED, true);
        let controllers = if exec.state.flag(FLAG_MULTIPLE_CONTROLLERS) { 2 } else { 0 };
        output.set_u64(keys::CONTROLLERS_FOUND, controllers);
        Ok(output)
    })
}

// ============================================================================
// SECTION: QR Payloads
// ============================================================================

/// `generate_qr_payload`: accepts an explicit payload, constructs from
/// parts, or auto-generates; the result is cached in discovery state.
pub(crate) fn generate_qr_payload<'a>(
    _ctx: &'a StepContext,
    params: &'a ActionParams,
    exec: &'a mut Execution,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let mut output = OutputMap::new();
        let payload = if let Some(explicit) = params.str_param("payload") {
            match QrPayload::parse(explicit) {
                Ok(payload) => payload,
                Err(err) => {
                    output.set_bool(keys::QR_PRESENT, false);
                    output.set_str(keys::ERROR, err.to_string());
                    return Ok(output);
                }
            }
        } else if let Some(raw) = params.u64_param("discriminator") {
            let discriminator = u16::try_from(raw).map_err(|_| ActionError::InvalidParameter {
                name: "discriminator",
                reason: format!("out of range: {raw}"),
            })?;
            let setup_code = params
                .str_param("setup_code")
                .map(str::to_string)
                .or_else(|| exec.config.setup_code.clone())
                .ok_or(ActionError::MissingParameter("setup_code"))?;
            match QrPayload::new(discriminator, setup_code) {
                Ok(payload) => payload,
                Err(err) => {
                    output.set_bool(keys::QR_PRESENT, false);
                    output.set_str(keys::ERROR, err.to_string());
                    return Ok(output);
                }
            }
        } else {
            QrPayload::generate(&mut rand::thread_rng())
        };

        output.set_bool(keys::QR_PRESENT, true);
        output.set_str(keys::QR_PAYLOAD, payload.to_string());
        output.set_u64(keys::DISCRIMINATOR, u64::from(payload.discriminator));
        output.set_str(keys::SETUP_CODE, payload.setup_code.clone());
        exec.state.discovery.qr_payload = Some(payload);
        Ok(output)
    })
}

/// `parse_qr_payload`: parses a payload string and reports its parts.
pub(crate) fn parse_qr_payload<'a>(
    _ctx: &'a StepContext,
    params: &'a ActionParams,
    exec: &'a mut Execution,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let text = match params.str_param("payload") {
            Some(text) => text.to_string(),
            None => match &exec.state.discovery.qr_payload {
                Some(cached) => cached.to_string(),
                None => return Err(ActionError::MissingParameter("payload")),
            },
        };
        let mut output = OutputMap::new();
        match QrPayload::parse(&text) {
            Ok(payload) => {
                output.set_bool(keys::PARSE_SUCCESS, true);
                output.set_u64(keys::DISCRIMINATOR, u64::from(payload.discriminator));
                output.set_str(keys::SETUP_CODE, payload.setup_code.clone());
                exec.state.discovery.qr_payload = Some(payload);
            }
            Err(err) => {
                output.set_bool(keys::PARSE_SUCCESS, false);
                output.set_str(keys::ERROR, err.to_string());
            }
        }
        Ok(output)
    })
}
