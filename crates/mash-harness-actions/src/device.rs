// crates/mash-harness-actions/src/device.rs
// ============================================================================
// Module: Device Simulation Actions
// Description: Operating/control/process state, faults, and EV lifecycle.
// Purpose: Mutate simulated device state and mirror changes as triggers.
// Dependencies: crate::{execution, support}, mash-harness-core, mash-harness-net
// ============================================================================

//! ## Overview
//! State-changing handlers mutate the device sub-state first and, when a
//! connection is live, additionally emit a `Trigger` frame so an external
//! device simulator can observe the change. Every mutation marks the
//! device-state-modified flag so teardown can choose to restore. Fault
//! injection forces the FAULT operating state; clearing the last fault
//! restores STANDBY.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use mash_harness_core::ActionError;
use mash_harness_core::ActionParams;
use mash_harness_core::ControlState;
use mash_harness_core::Fault;
use mash_harness_core::OperatingState;
use mash_harness_core::OutputMap;
use mash_harness_core::ProcessState;
use mash_harness_core::StepContext;
use mash_harness_core::Timestamp;
use mash_harness_core::keys;
use mash_harness_core::registry::HandlerFuture;
use mash_harness_net::WireMessage;
use serde_cbor::Value as CborValue;

use crate::execution::Execution;
use crate::support::require_str;
use crate::support::require_u32;

// ============================================================================
// SECTION: Trigger Emission
// ============================================================================

/// Emits a trigger frame to the routed connection when one is live.
///
/// Returns true when a frame left the harness.
async fn emit_trigger(
    exec: &mut Execution,
    params: &ActionParams,
    name: &str,
    fields: Vec<(&'static str, CborValue)>,
) -> bool {
    let enable_key = exec.config.enable_key.clone();
    let Some(connection) = exec.manager.pick_connection(params) else {
        return false;
    };
    let mut trigger_params: BTreeMap<String, CborValue> = fields
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect();
    if let Some(enable_key) = enable_key {
        trigger_params.insert("enable_key".to_string(), CborValue::Text(enable_key));
    }
    let message = WireMessage::Trigger {
        name: name.to_string(),
        params: trigger_params,
    };
    connection.send_message(&message).await.is_ok()
}

/// Marks the device simulation as modified for teardown accounting.
fn mark_modified(exec: &mut Execution) {
    exec.state.device_state_modified = true;
}

// ============================================================================
// SECTION: State Setters
// ============================================================================

/// `set_operating_state`: parses and applies the operating state.
pub(crate) fn set_operating_state<'a>(
    _ctx: &'a StepContext,
    params: &'a ActionParams,
    exec: &'a mut Execution,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let label = require_str(params, "state")?;
        let state = OperatingState::parse(label).ok_or_else(|| ActionError::InvalidParameter {
            name: "state",
            reason: format!("unknown operating state: {label}"),
        })?;
        exec.state.device.operating_state = state;
        mark_modified(exec);
        let sent = emit_trigger(
            exec,
            params,
            "set_operating_state",
            vec![("state", CborValue::Text(state.as_str().to_string()))],
        )
        .await;
        let mut output = OutputMap::new();
        output.set_bool(keys::STATE_CHANGED, true);
        output.set_str(keys::OPERATING_STATE, state.as_str());
        output.set_bool(keys::TRIGGER_SENT, sent);
        Ok(output)
    })
}

/// `set_control_state`: parses and applies the control state.
pub(crate) fn set_control_state<'a>(
    _ctx: &'a StepContext,
    params: &'a ActionParams,
    exec: &'a mut Execution,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let label = require_str(params, "state")?;
        let state = ControlState::parse(label).ok_or_else(|| ActionError::InvalidParameter {
            name: "state",
            reason: format!("unknown control state: {label}"),
        })?;
        exec.state.device.control_state = state;
        mark_modified(exec);
        let sent = emit_trigger(
            exec,
            params,
            "set_control_state",
            vec![("state", CborValue::Text(state.as_str().to_string()))],
        )
        .await;
        let mut output = OutputMap::new();
        output.set_bool(keys::STATE_CHANGED, true);
        output.set_str(keys::CONTROL_STATE, state.as_str());
        output.set_bool(keys::TRIGGER_SENT, sent);
        Ok(output)
    })
}

/// `set_process_state`: parses and applies the process state.
pub(crate) fn set_process_state<'a>(
    _ctx: &'a StepContext,
    params: &'a ActionParams,
    exec: &'a mut Execution,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let label = require_str(params, "state")?;
        let state = ProcessState::parse(label).ok_or_else(|| ActionError::InvalidParameter {
            name: "state",
            reason: format!("unknown process state: {label}"),
        })?;
        exec.state.device.process_state = state;
        mark_modified(exec);
        let sent = emit_trigger(
            exec,
            params,
            "set_process_state",
            vec![("state", CborValue::Text(state.as_str().to_string()))],
        )
        .await;
        let mut output = OutputMap::new();
        output.set_bool(keys::STATE_CHANGED, true);
        output.set_str(keys::PROCESS_STATE, state.as_str());
        output.set_bool(keys::TRIGGER_SENT, sent);
        Ok(output)
    })
}

/// `set_ev_connected`: flips the EV-connected flag.
pub(crate) fn set_ev_connected<'a>(
    _ctx: &'a StepContext,
    params: &'a ActionParams,
    exec: &'a mut Execution,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let connected = params.bool_param("connected").unwrap_or(true);
        exec.state.device.ev_connected = connected;
        mark_modified(exec);
        let sent =
            emit_trigger(exec, params, "set_ev_connected", vec![("connected", CborValue::Bool(connected))])
                .await;
        let mut output = OutputMap::new();
        output.set_bool(keys::STATE_CHANGED, true);
        output.set_bool(keys::EV_CONNECTED, connected);
        output.set_bool(keys::TRIGGER_SENT, sent);
        Ok(output)
    })
}

/// `set_cable_plugged_in`: flips the cable flag.
pub(crate) fn set_cable_plugged_in<'a>(
    _ctx: &'a StepContext,
    params: &'a ActionParams,
    exec: &'a mut Execution,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let plugged = params.bool_param("plugged").unwrap_or(true);
        exec.state.device.cable_plugged_in = plugged;
        mark_modified(exec);
        let sent = emit_trigger(
            exec,
            params,
            "set_cable_plugged_in",
            vec![("plugged", CborValue::Bool(plugged))],
        )
        .await;
        let mut output = OutputMap::new();
        output.set_bool(keys::STATE_CHANGED, true);
        output.set_bool(keys::CABLE_PLUGGED_IN, plugged);
        output.set_bool(keys::TRIGGER_SENT, sent);
        Ok(output)
    })
}

// ============================================================================
// SECTION: Faults
// ============================================================================

/// `trigger_fault`: appends a fault and forces the FAULT state.
pub(crate) fn trigger_fault<'a>(
    _ctx: &'a StepContext,
    params: &'a ActionParams,
    exec: &'a mut Execution,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let code = require_u32(params, "code")?;
        let message = params.str_param("message").unwrap_or("simulated fault").to_string();
        exec.state.device.inject_fault(Fault {
            code,
            message: message.clone(),
            time: Timestamp::now(),
        });
        mark_modified(exec);
        let sent = emit_trigger(
            exec,
            params,
            "trigger_fault",
            vec![
                ("code", CborValue::Integer(i128::from(code))),
                ("message", CborValue::Text(message)),
            ],
        )
        .await;
        let mut output = OutputMap::new();
        output.set_bool(keys::FAULT_INJECTED, true);
        output.set_u64(keys::FAULT_COUNT, exec.state.device.faults.len() as u64);
        output.set_str(keys::OPERATING_STATE, exec.state.device.operating_state.as_str());
        output.set_bool(keys::TRIGGER_SENT, sent);
        Ok(output)
    })
}

/// `clear_fault`: clears one fault by code, or every fault without a code.
pub(crate) fn clear_fault<'a>(
    _ctx: &'a StepContext,
    params: &'a ActionParams,
    exec: &'a mut Execution,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let cleared = match params.u64_param("code") {
            Some(raw) => {
                let code = u32::try_from(raw).map_err(|_| ActionError::InvalidParameter {
                    name: "code",
                    reason: format!("out of range: {raw}"),
                })?;
                exec.state.device.clear_fault(code)
            }
            None => {
                let had_faults = !exec.state.device.faults.is_empty();
                exec.state.device.clear_all_faults();
                had_faults
            }
        };
        mark_modified(exec);
        let sent = emit_trigger(exec, params, "clear_fault", Vec::new()).await;
        let mut output = OutputMap::new();
        output.set_bool(keys::FAULT_CLEARED, cleared);
        output.set_u64(keys::FAULT_COUNT, exec.state.device.faults.len() as u64);
        output.set_str(keys::OPERATING_STATE, exec.state.device.operating_state.as_str());
        output.set_bool(keys::TRIGGER_SENT, sent);
        Ok(output)
    })
}

/// `factory_reset`: restores every field to its initial value.
pub(crate) fn factory_reset<'a>(
    _ctx: &'a StepContext,
    params: &'a ActionParams,
    exec: &'a mut Execution,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        exec.state.device.factory_reset();
        mark_modified(exec);
        let sent = emit_trigger(exec, params, "factory_reset", Vec::new()).await;
        let mut output = OutputMap::new();
        output.set_bool(keys::FACTORY_RESET, true);
        output.set_str(keys::OPERATING_STATE, exec.state.device.operating_state.as_str());
        output.set_u64(keys::FAULT_COUNT, 0);
        output.set_bool(keys::TRIGGER_SENT, sent);
        Ok(output)
    })
}

/// `set_device_attribute`: writes a free-form simulated attribute.
pub(crate) fn set_device_attribute<'a>(
    _ctx: &'a StepContext,
    params: &'a ActionParams,
    exec: &'a mut Execution,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let name = require_str(params, "name")?.to_string();
        let value = params
            .get("value")
            .cloned()
            .ok_or(ActionError::MissingParameter("value"))?;
        exec.state.device.attributes.insert(name, value);
        mark_modified(exec);
        let mut output = OutputMap::new();
        output.set_bool(keys::STATE_CHANGED, true);
        Ok(output)
    })
}
