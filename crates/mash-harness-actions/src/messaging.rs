// crates/mash-harness-actions/src/messaging.rs
// ============================================================================
// Module: Messaging Actions
// Description: Ping, attribute read/write, subscriptions, raw frames, and
// notification handlers.
// Purpose: Drive correlated wire I/O from declarative suite steps.
// Dependencies: crate::{execution, support}, mash-harness-core, mash-harness-net
// ============================================================================

//! ## Overview
//! Messaging handlers route through the manager's pick policy, resolve
//! names through the registry, and translate every wire outcome into the
//! tier-2 output contract. Deadline expiry always produces the canonical
//! timeout shape (`error="TIMEOUT"`, `timeout_after`); a dead channel
//! produces the tier-3 closed shape. The simulated no-response mode yields
//! exactly the timeout shape without touching the wire.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use mash_harness_core::ActionError;
use mash_harness_core::ActionParams;
use mash_harness_core::OutputMap;
use mash_harness_core::StepContext;
use mash_harness_core::keys;
use mash_harness_core::registry::HandlerFuture;
use mash_harness_core::resolver::resolve_attribute;
use mash_harness_core::resolver::resolve_endpoint;
use mash_harness_core::resolver::resolve_feature;
use mash_harness_net::ConnectionError;
use mash_harness_net::Operation;
use mash_harness_net::RequestOutcome;
use mash_harness_net::RequestSpec;
use mash_harness_net::StatusCode;
use mash_harness_net::WireMessage;
use mash_harness_net::cbor_to_json;
use mash_harness_net::encode_int_keyed_map;
use mash_harness_net::json_to_cbor;
use mash_harness_net::marshal;
use mash_harness_net::unmarshal;

use crate::execution::Execution;
use crate::support::as_millis_u64;
use crate::support::closed_output;
use crate::support::hex_decode;
use crate::support::no_connection_output;
use crate::support::require_u32;
use crate::support::timeout_output;
use crate::support::wire_timeout;

// ============================================================================
// SECTION: Request Assembly
// ============================================================================

/// Resolves the endpoint/feature/attribute triple from parameters.
fn resolve_address(
    params: &ActionParams,
    exec: &Execution,
) -> Result<(u8, u8, u16), ActionError> {
    let endpoint = match params.get("endpoint") {
        Some(value) => resolve_endpoint(&exec.names, value)?,
        None => 0,
    };
    let feature_value =
        params.get("feature").ok_or(ActionError::MissingParameter("feature"))?;
    let feature = resolve_feature(&exec.names, feature_value)?;
    let attribute_value =
        params.get("attribute").ok_or(ActionError::MissingParameter("attribute"))?;
    let attribute = resolve_attribute(&exec.names, feature, attribute_value)?;
    Ok((endpoint, feature, attribute))
}

/// Runs one correlated request and shapes the outcome.
async fn run_request(
    ctx: &StepContext,
    params: &ActionParams,
    exec: &mut Execution,
    spec: RequestSpec,
    success_key: &'static str,
) -> Result<OutputMap, ActionError> {
    let timeout = wire_timeout(ctx, params);

    // Simulation branch taken before any wire call.
    if params.bool_param("simulate_no_response").unwrap_or(false) {
        return Ok(timeout_output(success_key, timeout));
    }

    let explicit_id = params.u64_param("message_id");
    let Some(connection) = exec.manager.pick_connection(params) else {
        return Ok(no_connection_output(success_key));
    };

    let outcome = match explicit_id {
        Some(raw) => {
            let message_id = u32::try_from(raw).map_err(|_| ActionError::InvalidParameter {
                name: "message_id",
                reason: format!("out of range: {raw}"),
            })?;
            connection.request_with_id(message_id, &spec, timeout).await
        }
        None => connection.request(&spec, timeout).await,
    };

    match outcome {
        Ok(RequestOutcome::Responded {
            message_id,
            status,
            payload,
        }) => {
            let mut output = OutputMap::new();
            output.set_bool(keys::RESPONSE_RECEIVED, true);
            output.set_u64(keys::RESPONSE_MESSAGE_ID, u64::from(message_id));
            if status == StatusCode::Success {
                output.set_bool(success_key, true);
                if let Some(payload) = payload {
                    output.set_value(keys::VALUE, cbor_to_json(&payload));
                }
            } else {
                output.set_bool(success_key, false);
                output.set_u64(keys::ERROR_STATUS, u64::from(status.code()));
                output.set_str(keys::ERROR_CODE, status.as_str());
            }
            Ok(output)
        }
        Ok(RequestOutcome::TimedOut {
            elapsed, ..
        }) => Ok(timeout_output(success_key, elapsed)),
        Err(ConnectionError::ReservedMessageId) => {
            let mut output = OutputMap::new();
            output.set_bool(keys::CONNECTION_ERROR, true);
            output.set_bool(success_key, false);
            output.set_str(keys::ERROR, "message id 0 is reserved");
            Ok(output)
        }
        Err(ConnectionError::Closed(reason)) => Ok(closed_output(&reason)),
        Err(err) => {
            let mut output = OutputMap::new();
            output.set_bool(success_key, false);
            output.set_str(keys::ERROR, err.to_string());
            Ok(output)
        }
    }
}

// ============================================================================
// SECTION: Ping
// ============================================================================

/// `send_ping`: one control ping round-trip with sequence tracking.
pub(crate) fn send_ping<'a>(
    ctx: &'a StepContext,
    params: &'a ActionParams,
    exec: &'a mut Execution,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let timeout = wire_timeout(ctx, params);
        let Some(connection) = exec.manager.pick_connection(params) else {
            return Ok(no_connection_output(keys::PONG_RECEIVED));
        };
        match connection.ping(timeout).await {
            Ok(outcome) => {
                let mut output = OutputMap::new();
                output.set_bool(keys::PONG_RECEIVED, true);
                output.set_u64(keys::PONG_SEQ, u64::from(outcome.sequence));
                output.set_bool(keys::LATENCY_UNDER, outcome.rtt < timeout);
                Ok(output)
            }
            Err(ConnectionError::Timeout) => Ok(timeout_output(keys::PONG_RECEIVED, timeout)),
            Err(ConnectionError::Closed(reason)) => Ok(closed_output(&reason)),
            Err(err) => {
                let mut output = OutputMap::new();
                output.set_bool(keys::PONG_RECEIVED, false);
                output.set_str(keys::ERROR, err.to_string());
                Ok(output)
            }
        }
    })
}

// ============================================================================
// SECTION: Attribute Access
// ============================================================================

/// `read_attribute`: correlated attribute read.
pub(crate) fn read_attribute<'a>(
    ctx: &'a StepContext,
    params: &'a ActionParams,
    exec: &'a mut Execution,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let (endpoint, feature, attribute) = resolve_address(params, exec)?;
        let spec = RequestSpec {
            operation: Operation::Read,
            endpoint,
            feature,
            attribute,
            value: None,
        };
        run_request(ctx, params, exec, spec, keys::READ_SUCCESS).await
    })
}

/// `write_attribute`: correlated attribute write.
pub(crate) fn write_attribute<'a>(
    ctx: &'a StepContext,
    params: &'a ActionParams,
    exec: &'a mut Execution,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let (endpoint, feature, attribute) = resolve_address(params, exec)?;
        let value = params.get("value").ok_or(ActionError::MissingParameter("value"))?;
        let encoded = json_to_cbor(value).map_err(|err| ActionError::InvalidParameter {
            name: "value",
            reason: err.to_string(),
        })?;
        let spec = RequestSpec {
            operation: Operation::Write,
            endpoint,
            feature,
            attribute,
            value: Some(encoded),
        };
        run_request(ctx, params, exec, spec, keys::WRITE_SUCCESS).await
    })
}

/// `concurrent_reads`: N outstanding reads on one connection, gathered by
/// message-id.
pub(crate) fn concurrent_reads<'a>(
    ctx: &'a StepContext,
    params: &'a ActionParams,
    exec: &'a mut Execution,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let count = params.u64_param("count").unwrap_or(3);
        let count = usize::try_from(count).map_err(|_| ActionError::InvalidParameter {
            name: "count",
            reason: format!("out of range: {count}"),
        })?;
        let (endpoint, feature, attribute) = resolve_address(params, exec)?;
        let timeout = wire_timeout(ctx, params);
        let specs = vec![
            RequestSpec {
                operation: Operation::Read,
                endpoint,
                feature,
                attribute,
                value: None,
            };
            count
        ];
        let Some(connection) = exec.manager.pick_connection(params) else {
            return Ok(no_connection_output(keys::READ_SUCCESS));
        };
        match connection.request_many(&specs, timeout).await {
            Ok(outcomes) => {
                let responded = outcomes
                    .iter()
                    .filter(|outcome| {
                        matches!(
                            outcome,
                            RequestOutcome::Responded {
                                status: StatusCode::Success,
                                ..
                            }
                        )
                    })
                    .count();
                let mut output = OutputMap::new();
                output.set_u64(keys::RESPONSES_RECEIVED, responded as u64);
                output.set_bool(keys::ALL_IDS_MATCHED, responded == outcomes.len());
                output.set_bool(keys::READ_SUCCESS, responded == outcomes.len());
                Ok(output)
            }
            Err(ConnectionError::Closed(reason)) => Ok(closed_output(&reason)),
            Err(err) => {
                let mut output = OutputMap::new();
                output.set_bool(keys::READ_SUCCESS, false);
                output.set_str(keys::ERROR, err.to_string());
                Ok(output)
            }
        }
    })
}

// ============================================================================
// SECTION: Subscriptions
// ============================================================================

/// `subscribe`: establishes a numeric-id subscription.
///
/// Subscription ids are numeric only; a string id that does not parse as an
/// unsigned integer aborts the step.
pub(crate) fn subscribe<'a>(
    ctx: &'a StepContext,
    params: &'a ActionParams,
    exec: &'a mut Execution,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let subscription_id = match params.get("subscription_id") {
            Some(serde_json::Value::String(text)) => {
                text.parse::<u32>().map_err(|_| ActionError::InvalidParameter {
                    name: "subscription_id",
                    reason: format!("subscription ids are numeric, got {text}"),
                })?
            }
            Some(_) => require_u32(params, "subscription_id")?,
            None => 1,
        };
        let (endpoint, feature, attribute) = resolve_address(params, exec)?;
        let spec = RequestSpec {
            operation: Operation::Subscribe,
            endpoint,
            feature,
            attribute,
            value: Some(serde_cbor::Value::Integer(i128::from(subscription_id))),
        };
        let mut output = run_request(ctx, params, exec, spec, keys::SUBSCRIPTION_ACTIVE).await?;
        output.set_u64(keys::SUBSCRIPTION_ID, u64::from(subscription_id));
        Ok(output)
    })
}

/// `read_subscription_update`: awaits the next subscription notification.
pub(crate) fn read_subscription_update<'a>(
    ctx: &'a StepContext,
    params: &'a ActionParams,
    exec: &'a mut Execution,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let timeout = wire_timeout(ctx, params);
        let Some(connection) = exec.manager.pick_connection(params) else {
            return Ok(no_connection_output(keys::NOTIFICATION_RECEIVED));
        };
        match connection.next_notification(timeout).await {
            Ok(Some(WireMessage::Notification {
                event_type,
                payload,
            })) => {
                let mut output = OutputMap::new();
                output.set_bool(keys::NOTIFICATION_RECEIVED, true);
                output.set_str(keys::NOTIFICATION_EVENT, event_type);
                if let Some(payload) = payload {
                    output.set_value(keys::VALUE, cbor_to_json(&payload));
                }
                Ok(output)
            }
            Ok(Some(other)) => {
                let mut output = OutputMap::new();
                output.set_bool(keys::NOTIFICATION_RECEIVED, false);
                output.set_str(keys::ERROR, format!("unexpected frame: {}", frame_label(&other)));
                Ok(output)
            }
            Ok(None) => Ok(timeout_output(keys::NOTIFICATION_RECEIVED, timeout)),
            Err(ConnectionError::Closed(reason)) => Ok(closed_output(&reason)),
            Err(err) => {
                let mut output = OutputMap::new();
                output.set_bool(keys::NOTIFICATION_RECEIVED, false);
                output.set_str(keys::ERROR, err.to_string());
                Ok(output)
            }
        }
    })
}

// ============================================================================
// SECTION: Notifications
// ============================================================================

/// Stable label for an inbound frame in outputs.
fn frame_label(message: &WireMessage) -> &'static str {
    match message {
        WireMessage::Request {
            ..
        } => "request",
        WireMessage::Response {
            ..
        } => "response",
        WireMessage::Notification {
            ..
        } => "notification",
        WireMessage::ControlPing {
            ..
        } => "ping",
        WireMessage::ControlPong {
            ..
        } => "pong",
        WireMessage::ControlClose {
            ..
        } => "close",
        WireMessage::Trigger {
            ..
        } => "trigger",
    }
}

/// `wait_for_notification`: awaits the next queued notification or control
/// frame.
pub(crate) fn wait_for_notification<'a>(
    ctx: &'a StepContext,
    params: &'a ActionParams,
    exec: &'a mut Execution,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let timeout = wire_timeout(ctx, params);
        let Some(connection) = exec.manager.pick_connection(params) else {
            return Ok(no_connection_output(keys::NOTIFICATION_RECEIVED));
        };
        match connection.next_notification(timeout).await {
            Ok(Some(message)) => {
                let mut output = OutputMap::new();
                output.set_bool(keys::NOTIFICATION_RECEIVED, true);
                match &message {
                    WireMessage::Notification {
                        event_type,
                        payload,
                    } => {
                        output.set_str(keys::NOTIFICATION_EVENT, event_type.clone());
                        if let Some(payload) = payload {
                            output.set_value(keys::VALUE, cbor_to_json(payload));
                        }
                    }
                    other => {
                        output.set_str(keys::NOTIFICATION_EVENT, frame_label(other));
                    }
                }
                Ok(output)
            }
            Ok(None) => Ok(timeout_output(keys::NOTIFICATION_RECEIVED, timeout)),
            Err(ConnectionError::Closed(reason)) => Ok(closed_output(&reason)),
            Err(err) => {
                let mut output = OutputMap::new();
                output.set_bool(keys::NOTIFICATION_RECEIVED, false);
                output.set_str(keys::ERROR, err.to_string());
                Ok(output)
            }
        }
    })
}

/// `flush_notifications`: drains the notification queue without blocking.
pub(crate) fn flush_notifications<'a>(
    _ctx: &'a StepContext,
    params: &'a ActionParams,
    exec: &'a mut Execution,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let drained = match exec.manager.pick_connection(params) {
            Some(connection) => connection.drain_notifications().len(),
            None => 0,
        };
        let mut output = OutputMap::new();
        output.set_u64(keys::NOTIFICATIONS_DRAINED, drained as u64);
        Ok(output)
    })
}

// ============================================================================
// SECTION: Raw Frames
// ============================================================================

/// `send_raw`: writes a raw frame built from an integer-keyed payload map,
/// a hex string, or a bare length override.
pub(crate) fn send_raw<'a>(
    ctx: &'a StepContext,
    params: &'a ActionParams,
    exec: &'a mut Execution,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let timeout = wire_timeout(ctx, params);

        if let Some(declared) = params.u64_param("length_override") {
            let declared = u32::try_from(declared).map_err(|_| ActionError::InvalidParameter {
                name: "length_override",
                reason: format!("out of range: {declared}"),
            })?;
            let Some(connection) = exec.manager.pick_connection(params) else {
                return Ok(no_connection_output(keys::RAW_SENT));
            };
            if let Err(err) = connection.send_length_only(declared).await {
                let mut output = OutputMap::new();
                output.set_bool(keys::RAW_SENT, false);
                output.set_str(keys::ERROR, err.to_string());
                return Ok(output);
            }
            // The peer closes on the oversize declaration; observe it.
            let mut output = OutputMap::new();
            output.set_bool(keys::RAW_SENT, true);
            match connection.next_notification(timeout).await {
                Err(ConnectionError::Closed(reason)) => {
                    output.set_bool(keys::CONNECTION_CLOSED, true);
                    output.set_str(keys::ERROR, reason);
                }
                Ok(Some(WireMessage::ControlClose {
                    reason,
                })) => {
                    output.set_bool(keys::CONNECTION_CLOSED, true);
                    output.set_str(keys::ERROR, reason);
                }
                _ => {
                    output.set_bool(keys::CONNECTION_CLOSED, !connection.is_live());
                }
            }
            return Ok(output);
        }

        let payload = if let Some(map) = params.map_param("payload") {
            let entries = map
                .iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect::<BTreeMap<String, serde_json::Value>>();
            let encoded = encode_int_keyed_map(&entries).map_err(|err| {
                ActionError::InvalidParameter {
                    name: "payload",
                    reason: err.to_string(),
                }
            })?;
            marshal(&encoded).map_err(|err| ActionError::InvalidParameter {
                name: "payload",
                reason: err.to_string(),
            })?
        } else if let Some(hex) = params.str_param("payload_hex") {
            hex_decode(hex).ok_or_else(|| ActionError::InvalidParameter {
                name: "payload_hex",
                reason: "not valid hex".to_string(),
            })?
        } else {
            return Err(ActionError::MissingParameter("payload"));
        };

        let Some(connection) = exec.manager.pick_connection(params) else {
            return Ok(no_connection_output(keys::RAW_SENT));
        };
        match connection.send_raw(&payload).await {
            Ok(()) => {
                let mut output = OutputMap::new();
                output.set_bool(keys::RAW_SENT, true);
                Ok(output)
            }
            Err(err) => {
                let mut output = OutputMap::new();
                output.set_bool(keys::RAW_SENT, false);
                output.set_str(keys::ERROR, err.to_string());
                Ok(output)
            }
        }
    })
}

/// `parse_payload`: decodes a hex frame payload as a protocol message.
pub(crate) fn parse_payload<'a>(
    _ctx: &'a StepContext,
    params: &'a ActionParams,
    _exec: &'a mut Execution,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let hex = params.str_param("payload_hex").map(str::to_string);
        let hex = hex.ok_or(ActionError::MissingParameter("payload_hex"))?;
        let Some(bytes) = hex_decode(&hex) else {
            return Err(ActionError::InvalidParameter {
                name: "payload_hex",
                reason: "not valid hex".to_string(),
            });
        };
        let mut output = OutputMap::new();
        match unmarshal(&bytes) {
            Ok(value) => {
                output.set_bool(keys::PARSE_SUCCESS, true);
                output.set_value(keys::VALUE, cbor_to_json(&value));
            }
            Err(err) => {
                output.set_bool(keys::PARSE_SUCCESS, false);
                output.set_str(keys::ERROR, err.to_string());
            }
        }
        Ok(output)
    })
}

/// `send_close`: emits `ControlClose` and closes the local end.
pub(crate) fn send_close<'a>(
    _ctx: &'a StepContext,
    params: &'a ActionParams,
    exec: &'a mut Execution,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let reason = params.str_param("reason").unwrap_or("suite close").to_string();
        let Some(connection) = exec.manager.pick_connection(params) else {
            return Ok(no_connection_output(keys::CONNECTION_CLOSED));
        };
        connection.close(&reason).await;
        let mut output = OutputMap::new();
        output.set_bool(keys::CONNECTION_CLOSED, true);
        output.set_str(keys::STATE, keys::STATE_DISCONNECTED);
        Ok(output)
    })
}

/// `measure_latency`: ping round-trip reported in milliseconds.
pub(crate) fn measure_latency<'a>(
    ctx: &'a StepContext,
    params: &'a ActionParams,
    exec: &'a mut Execution,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let timeout = wire_timeout(ctx, params);
        let Some(connection) = exec.manager.pick_connection(params) else {
            return Ok(no_connection_output(keys::PONG_RECEIVED));
        };
        match connection.ping(timeout).await {
            Ok(outcome) => {
                let mut output = OutputMap::new();
                output.set_bool(keys::PONG_RECEIVED, true);
                output.set_u64("latency_ms", as_millis_u64(outcome.rtt));
                output.set_bool(keys::LATENCY_UNDER, outcome.rtt < timeout);
                Ok(output)
            }
            Err(ConnectionError::Timeout) => Ok(timeout_output(keys::PONG_RECEIVED, timeout)),
            Err(err) => {
                let mut output = OutputMap::new();
                output.set_bool(keys::PONG_RECEIVED, false);
                output.set_str(keys::ERROR, err.to_string());
                Ok(output)
            }
        }
    })
}
