// crates/mash-harness-actions/src/renewal.rs
// ============================================================================
// Module: Renewal Actions
// Description: The four-step certificate-renewal protocol and grace periods.
// Purpose: Drive CSR round-trips over the current connection.
// Dependencies: crate::{execution, support}, mash-harness-core, mash-harness-net
// ============================================================================

//! ## Overview
//! The renewal flow is four framed messages on the current connection:
//! request (nonce), CSR, install (signed certificate plus a monotonic
//! sequence), acknowledgement. Intermediate state (`renewal_nonce`,
//! `pending_csr`, `renewal_sequence`) lives in execution-state variables so
//! expectation checkers can inspect it between steps. `full_renewal_flow`
//! chains the steps and hard-fails on the first false intermediate result.
//! Grace-period accounting is pure state against the simulated day clock.

// ============================================================================
// SECTION: Imports
// ============================================================================

use mash_harness_core::ActionError;
use mash_harness_core::ActionParams;
use mash_harness_core::OutputMap;
use mash_harness_core::StepContext;
use mash_harness_core::keys;
use mash_harness_core::registry::HandlerFuture;
use mash_harness_net::RenewalMessage;
use mash_harness_net::StatusCode;
use mash_harness_net::hex_encode;
use mash_harness_net::sign_csr;
use mash_harness_net::validate_csr;
use rand::RngCore;
use serde_json::Value;

use crate::execution::Execution;
use crate::support::hex_decode;
use crate::support::no_connection_output;
use crate::support::require_u32;
use crate::support::timeout_output;
use crate::support::wire_timeout;

// ============================================================================
// SECTION: State Variables
// ============================================================================

/// Variable holding the hex nonce of the outstanding renewal request.
const VAR_RENEWAL_NONCE: &str = "renewal_nonce";
/// Variable holding the hex bytes of the received CSR.
const VAR_PENDING_CSR: &str = "pending_csr";
/// Variable holding the last minted install sequence.
const VAR_RENEWAL_SEQUENCE: &str = "renewal_sequence";

// ============================================================================
// SECTION: Renewal Steps
// ============================================================================

/// `send_renewal_request`: mints a nonce and sends the renewal request.
pub(crate) fn send_renewal_request<'a>(
    _ctx: &'a StepContext,
    params: &'a ActionParams,
    exec: &'a mut Execution,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let nonce_len = exec.config.renewal_nonce_len;
        let mut nonce = vec![0u8; nonce_len];
        rand::thread_rng().fill_bytes(&mut nonce);
        let nonce_hex = hex_encode(&nonce);

        let Some(connection) = exec.manager.pick_connection(params) else {
            return Ok(no_connection_output(keys::RENEWAL_REQUEST_SENT));
        };
        let message = RenewalMessage::Request {
            nonce,
        };
        match connection.send_renewal(&message).await {
            Ok(()) => {
                exec.state.set_var(VAR_RENEWAL_NONCE, Value::String(nonce_hex));
                let mut output = OutputMap::new();
                output.set_bool(keys::RENEWAL_REQUEST_SENT, true);
                Ok(output)
            }
            Err(err) => {
                let mut output = OutputMap::new();
                output.set_bool(keys::RENEWAL_REQUEST_SENT, false);
                output.set_str(keys::ERROR, err.to_string());
                Ok(output)
            }
        }
    })
}

/// `receive_renewal_csr`: reads one renewal frame, accepting only a valid
/// PKCS#10 CSR.
pub(crate) fn receive_renewal_csr<'a>(
    ctx: &'a StepContext,
    params: &'a ActionParams,
    exec: &'a mut Execution,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let timeout = wire_timeout(ctx, params);
        let Some(connection) = exec.manager.pick_connection(params) else {
            return Ok(no_connection_output(keys::CSR_RECEIVED));
        };
        match connection.next_renewal(timeout).await {
            Ok(Some(RenewalMessage::Csr {
                csr_der,
            })) => {
                if let Err(err) = validate_csr(&csr_der) {
                    let mut output = OutputMap::new();
                    output.set_bool(keys::CSR_RECEIVED, false);
                    output.set_str(keys::ERROR, err.to_string());
                    return Ok(output);
                }
                exec.state.set_var(VAR_PENDING_CSR, Value::String(hex_encode(&csr_der)));
                let mut output = OutputMap::new();
                output.set_bool(keys::CSR_RECEIVED, true);
                Ok(output)
            }
            Ok(Some(other)) => {
                let mut output = OutputMap::new();
                output.set_bool(keys::CSR_RECEIVED, false);
                output.set_str(
                    keys::ERROR,
                    format!("unexpected renewal message: {}", renewal_label(&other)),
                );
                Ok(output)
            }
            Ok(None) => Ok(timeout_output(keys::CSR_RECEIVED, timeout)),
            Err(err) => {
                let mut output = OutputMap::new();
                output.set_bool(keys::CSR_RECEIVED, false);
                output.set_str(keys::ERROR, err.to_string());
                Ok(output)
            }
        }
    })
}

/// `send_cert_install`: signs the pending CSR and sends the install frame.
///
/// Without zone CA material the handler echoes the CSR bytes (simulated
/// mode) so wire shapes stay testable before commissioning.
pub(crate) fn send_cert_install<'a>(
    _ctx: &'a StepContext,
    params: &'a ActionParams,
    exec: &'a mut Execution,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let pending = exec
            .state
            .get_var(VAR_PENDING_CSR)
            .and_then(Value::as_str)
            .map(str::to_string);
        let Some(pending_hex) = pending else {
            let mut output = OutputMap::new();
            output.set_bool(keys::CERT_INSTALLED, false);
            output.set_str(keys::ERROR, "no pending csr");
            return Ok(output);
        };
        let Some(csr_der) = hex_decode(&pending_hex) else {
            return Err(ActionError::State("pending csr is not valid hex".to_string()));
        };

        let cert_der = match exec.state.session.crypto() {
            Some(crypto) => match sign_csr(crypto, &csr_der) {
                Ok(cert_der) => cert_der,
                Err(err) => {
                    let mut output = OutputMap::new();
                    output.set_bool(keys::CERT_INSTALLED, false);
                    output.set_str(keys::ERROR, err.to_string());
                    return Ok(output);
                }
            },
            None => csr_der.clone(),
        };

        let sequence = exec
            .state
            .get_var(VAR_RENEWAL_SEQUENCE)
            .and_then(Value::as_u64)
            .unwrap_or(0)
            .saturating_add(1);
        let sequence_u32 = u32::try_from(sequence).unwrap_or(u32::MAX);

        let Some(connection) = exec.manager.pick_connection(params) else {
            return Ok(no_connection_output(keys::CERT_INSTALLED));
        };
        let message = RenewalMessage::Install {
            cert_der,
            sequence: sequence_u32,
        };
        match connection.send_renewal(&message).await {
            Ok(()) => {
                exec.state.set_var(VAR_RENEWAL_SEQUENCE, Value::Number(sequence.into()));
                let mut output = OutputMap::new();
                output.set_bool(keys::CERT_INSTALLED, true);
                output.set_u64(keys::CERT_SEQUENCE, sequence);
                Ok(output)
            }
            Err(err) => {
                let mut output = OutputMap::new();
                output.set_bool(keys::CERT_INSTALLED, false);
                output.set_str(keys::ERROR, err.to_string());
                Ok(output)
            }
        }
    })
}

/// `receive_renewal_ack`: reads the acknowledgement and reports completion.
pub(crate) fn receive_renewal_ack<'a>(
    ctx: &'a StepContext,
    params: &'a ActionParams,
    exec: &'a mut Execution,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let timeout = wire_timeout(ctx, params);
        let Some(connection) = exec.manager.pick_connection(params) else {
            return Ok(no_connection_output(keys::RENEWAL_COMPLETE));
        };
        match connection.next_renewal(timeout).await {
            Ok(Some(RenewalMessage::Ack {
                status,
                active_sequence,
            })) => {
                let mut output = OutputMap::new();
                output.set_bool(keys::RENEWAL_COMPLETE, status == StatusCode::Success);
                output.set_u64(keys::STATUS, u64::from(status.code()));
                output.set_u64(keys::ACTIVE_SEQUENCE, u64::from(active_sequence));
                Ok(output)
            }
            Ok(Some(other)) => {
                let mut output = OutputMap::new();
                output.set_bool(keys::RENEWAL_COMPLETE, false);
                output.set_str(
                    keys::ERROR,
                    format!("unexpected renewal message: {}", renewal_label(&other)),
                );
                Ok(output)
            }
            Ok(None) => Ok(timeout_output(keys::RENEWAL_COMPLETE, timeout)),
            Err(err) => {
                let mut output = OutputMap::new();
                output.set_bool(keys::RENEWAL_COMPLETE, false);
                output.set_str(keys::ERROR, err.to_string());
                Ok(output)
            }
        }
    })
}

/// `full_renewal_flow`: chains the four steps, hard-failing on the first
/// false intermediate result.
pub(crate) fn full_renewal_flow<'a>(
    ctx: &'a StepContext,
    params: &'a ActionParams,
    exec: &'a mut Execution,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let request = send_renewal_request(ctx, params, exec).await?;
        if request.bool_value(keys::RENEWAL_REQUEST_SENT) != Some(true) {
            return Ok(flow_failed(request));
        }
        let csr = receive_renewal_csr(ctx, params, exec).await?;
        if csr.bool_value(keys::CSR_RECEIVED) != Some(true) {
            return Ok(flow_failed(csr));
        }
        let install = send_cert_install(ctx, params, exec).await?;
        if install.bool_value(keys::CERT_INSTALLED) != Some(true) {
            return Ok(flow_failed(install));
        }
        receive_renewal_ack(ctx, params, exec).await
    })
}

/// Marks a partial flow output as a failed renewal.
fn flow_failed(mut output: OutputMap) -> OutputMap {
    output.set_bool(keys::RENEWAL_COMPLETE, false);
    output
}

/// Stable label for a renewal message in outputs.
const fn renewal_label(message: &RenewalMessage) -> &'static str {
    match message {
        RenewalMessage::Request {
            ..
        } => "request",
        RenewalMessage::Csr {
            ..
        } => "csr",
        RenewalMessage::Install {
            ..
        } => "install",
        RenewalMessage::Ack {
            ..
        } => "ack",
    }
}

// ============================================================================
// SECTION: Grace Periods
// ============================================================================

/// `set_grace_period`: configures the grace period in days.
pub(crate) fn set_grace_period<'a>(
    _ctx: &'a StepContext,
    params: &'a ActionParams,
    exec: &'a mut Execution,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let days = require_u32(params, "days")?;
        exec.state.grace.set_grace_period(days);
        let mut output = OutputMap::new();
        output.set_bool(keys::GRACE_PERIOD_SET, true);
        output.set_u64(keys::GRACE_PERIOD_DAYS, u64::from(days));
        Ok(output)
    })
}

/// `simulate_time_advance`: advances the simulated day clock.
pub(crate) fn simulate_time_advance<'a>(
    _ctx: &'a StepContext,
    params: &'a ActionParams,
    exec: &'a mut Execution,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let days = require_u32(params, "days")?;
        exec.state.grace.advance_days(days);
        exec.state.clock_offset_ms = exec
            .state
            .clock_offset_ms
            .saturating_add(i64::from(days) * 24 * 60 * 60 * 1_000);
        let mut output = OutputMap::new();
        output.set_u64(keys::DAYS_PAST_EXPIRY, u64::from(exec.state.grace.days_past_expiry()));
        Ok(output)
    })
}

/// `check_grace_period_status`: reports the derived grace-period status.
pub(crate) fn check_grace_period_status<'a>(
    _ctx: &'a StepContext,
    _params: &'a ActionParams,
    exec: &'a mut Execution,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let status = exec.state.grace.status();
        let mut output = OutputMap::new();
        output.set_u64(keys::GRACE_PERIOD_DAYS, u64::from(status.grace_period_days));
        output.set_u64(keys::DAYS_PAST_EXPIRY, u64::from(status.days_past_expiry));
        output.set_bool(keys::IN_GRACE_PERIOD, status.in_grace_period);
        output.set_bool(keys::GRACE_PERIOD_EXPIRED, status.grace_period_expired);
        Ok(output)
    })
}
