// crates/mash-harness-actions/src/connection.rs
// ============================================================================
// Module: Connection Actions
// Description: Connect, disconnect, zone routing, and health-probe handlers.
// Purpose: Drive the connection manager from declarative suite steps.
// Dependencies: crate::{execution, support}, mash-harness-core, mash-harness-net
// ============================================================================

//! ## Overview
//! Connection handlers translate manager outcomes into the tier-2 output
//! contract: a failed dial is not a hard error, it is an output map carrying
//! `connection_established=false`, the echoed target, and a populated
//! `error_code`. Only parameter-shape violations abort the step.

// ============================================================================
// SECTION: Imports
// ============================================================================

use mash_harness_core::ActionParams;
use mash_harness_core::OutputMap;
use mash_harness_core::StepContext;
use mash_harness_core::Timestamp;
use mash_harness_core::keys;
use mash_harness_core::registry::HandlerFuture;
use mash_harness_net::ManagerError;

use crate::execution::Execution;
use crate::support::require_str;
use crate::support::wire_timeout;

// ============================================================================
// SECTION: Target Resolution
// ============================================================================

/// Builds the dial target from `host`/`port` parameters when present.
fn override_target(params: &ActionParams) -> Option<String> {
    let host = params.str_param("host")?;
    let port = params.u64_param("port")?;
    Some(format!("{host}:{port}"))
}

/// Maps a manager error onto the shared failure keys.
fn connect_failure_output(target: &str, err: &ManagerError) -> OutputMap {
    let mut output = OutputMap::new();
    output.set_bool(keys::CONNECTION_ESTABLISHED, false);
    output.set_str(keys::TARGET, target);
    output.set_str(keys::ERROR, err.to_string());
    let code = match err {
        ManagerError::MaxConnectionsExceeded {
            ..
        } => keys::CODE_MAX_CONNECTIONS_EXCEEDED,
        _ => keys::CODE_CONNECTION_FAILED,
    };
    output.set_str(keys::ERROR_CODE, code);
    if let ManagerError::Connect(failure) = err {
        output.set_str(keys::STATE, failure.stage.as_str());
    }
    output
}

// ============================================================================
// SECTION: Main Connection Handlers
// ============================================================================

/// `connect`: ensures the main connection is live, dialing when necessary.
pub(crate) fn connect<'a>(
    _ctx: &'a StepContext,
    params: &'a ActionParams,
    exec: &'a mut Execution,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let target = override_target(params).unwrap_or_else(|| exec.config.target.clone());
        let use_session = params.bool_param("use_zone_crypto").unwrap_or(false);
        let crypto = if use_session { self_crypto(exec) } else { None };
        match exec.manager.ensure_connected(Some(&target), crypto.as_ref()).await {
            Ok(()) => {
                let mut output = OutputMap::new();
                output.set_bool(keys::CONNECTION_ESTABLISHED, true);
                output.set_bool(keys::CONNECTION_OPEN, true);
                output.set_str(keys::STATE, keys::STATE_OPERATIONAL);
                if let Some(version) =
                    exec.manager.main().and_then(|conn| conn.peer().tls_version.clone())
                {
                    output.set_str(keys::TLS_VERSION, version);
                }
                Ok(output)
            }
            Err(err) => Ok(connect_failure_output(&target, &err)),
        }
    })
}

/// Clones the suite-session crypto so the manager borrow stays clean.
fn self_crypto(exec: &Execution) -> Option<mash_harness_core::CryptoState> {
    exec.state.session.crypto().cloned()
}

/// `disconnect`: closes the main connection and clears session crypto.
pub(crate) fn disconnect<'a>(
    _ctx: &'a StepContext,
    _params: &'a ActionParams,
    exec: &'a mut Execution,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let Execution {
            manager,
            state,
            ..
        } = exec;
        manager.ensure_disconnected(&mut state.session).await;
        let mut output = OutputMap::new();
        output.set_bool(keys::CONNECTION_CLOSED, true);
        output.set_bool(keys::CONNECTION_OPEN, false);
        output.set_str(keys::STATE, keys::STATE_DISCONNECTED);
        Ok(output)
    })
}

// ============================================================================
// SECTION: Zone Connection Handlers
// ============================================================================

/// `connect_as_zone`: opens a zone-scoped connection under the zone cap.
pub(crate) fn connect_as_zone<'a>(
    _ctx: &'a StepContext,
    params: &'a ActionParams,
    exec: &'a mut Execution,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let zone_id = require_str(params, "zone_id")?.to_string();
        let target = override_target(params).unwrap_or_else(|| exec.config.target.clone());
        let crypto = exec.crypto_for_zone(&zone_id).cloned();
        match exec.manager.connect_as_zone(&zone_id, Some(&target), crypto.as_ref()).await {
            Ok(()) => {
                if let Some(zone) = exec.state.zones.get_mut(&zone_id) {
                    zone.connected = true;
                    zone.last_seen = Timestamp::now();
                }
                let mut output = OutputMap::new();
                output.set_bool(keys::CONNECTION_ESTABLISHED, true);
                output.set_str(keys::STATE, keys::STATE_OPERATIONAL);
                output.set_str(keys::ZONE_ID, &zone_id);
                Ok(output)
            }
            Err(err) => {
                let mut output = connect_failure_output(&target, &err);
                output.set_str(keys::ZONE_ID, &zone_id);
                Ok(output)
            }
        }
    })
}

/// `disconnect_zone`: closes and removes a zone connection; idempotent.
pub(crate) fn disconnect_zone<'a>(
    _ctx: &'a StepContext,
    params: &'a ActionParams,
    exec: &'a mut Execution,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let zone_id = require_str(params, "zone_id")?.to_string();
        let removed = exec.manager.disconnect_zone(&zone_id).await;
        if let Some(zone) = exec.state.zones.get_mut(&zone_id) {
            zone.connected = false;
        }
        let mut output = OutputMap::new();
        output.set_bool(keys::ZONE_DISCONNECTED, removed);
        output.set_str(keys::ZONE_ID, &zone_id);
        Ok(output)
    })
}

/// `reconnect_to_zone`: re-opens the main connection from the suite session.
pub(crate) fn reconnect_to_zone<'a>(
    _ctx: &'a StepContext,
    _params: &'a ActionParams,
    exec: &'a mut Execution,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let session = exec.state.session.clone();
        match exec.manager.reconnect_to_zone(&session).await {
            Ok(()) => {
                let mut output = OutputMap::new();
                output.set_bool(keys::CONNECTION_ESTABLISHED, true);
                if let Some(zone_id) = session.zone_id() {
                    output.set_str(keys::ZONE_ID, zone_id);
                }
                output.set_str(keys::STATE, keys::STATE_OPERATIONAL);
                Ok(output)
            }
            Err(ManagerError::NoSuiteZone) => {
                let mut output = OutputMap::new();
                output.set_bool(keys::CONNECTION_ESTABLISHED, false);
                output.set_str(keys::ERROR, "no suite zone");
                Ok(output)
            }
            Err(err) => Ok(connect_failure_output(exec.manager.target(), &err)),
        }
    })
}

// ============================================================================
// SECTION: Monitoring Handlers
// ============================================================================

/// `monitor_reconnect`: arms reconnect monitoring; idempotent.
pub(crate) fn monitor_reconnect<'a>(
    _ctx: &'a StepContext,
    _params: &'a ActionParams,
    exec: &'a mut Execution,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        exec.manager.monitor_reconnect(Timestamp::now());
        let mut output = OutputMap::new();
        output.set_bool(keys::MONITORING_ACTIVE, true);
        Ok(output)
    })
}

/// `cancel_reconnect`: clears the reconnect descriptor; idempotent.
pub(crate) fn cancel_reconnect<'a>(
    _ctx: &'a StepContext,
    _params: &'a ActionParams,
    exec: &'a mut Execution,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        exec.manager.cancel_reconnect();
        let mut output = OutputMap::new();
        output.set_bool(keys::MONITORING_ACTIVE, false);
        Ok(output)
    })
}

/// `probe_session_health`: best-effort liveness check on the main channel.
pub(crate) fn probe_session_health<'a>(
    ctx: &'a StepContext,
    params: &'a ActionParams,
    exec: &'a mut Execution,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let timeout = wire_timeout(ctx, params);
        match exec.manager.probe_session_health(timeout).await {
            Ok(outcome) => {
                let mut output = OutputMap::new();
                output.set_bool(keys::SESSION_HEALTHY, true);
                output.set_u64(keys::PONG_SEQ, u64::from(outcome.sequence));
                Ok(output)
            }
            Err(err) => {
                let mut output = OutputMap::new();
                output.set_bool(keys::SESSION_HEALTHY, false);
                output.set_str(keys::ERROR, err.to_string());
                Ok(output)
            }
        }
    })
}

/// `check_tls_status`: reports the TLS session facts for the routed
/// connection.
pub(crate) fn check_tls_status<'a>(
    _ctx: &'a StepContext,
    params: &'a ActionParams,
    exec: &'a mut Execution,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let Some(connection) = exec.manager.pick_connection(params) else {
            let mut output = OutputMap::new();
            output.set_bool(keys::TLS_ACTIVE, false);
            output.set_str(keys::ERROR, keys::ERROR_NO_CONNECTION);
            return Ok(output);
        };
        let mut output = OutputMap::new();
        output.set_bool(keys::TLS_ACTIVE, true);
        if let Some(version) = connection.peer().tls_version.clone() {
            output.set_str(keys::TLS_VERSION, version);
        }
        output.set_bool(keys::SESSION_TICKET_RECEIVED, connection.peer().resumed);
        output.set_bool(
            keys::PEER_CERTIFICATE_PRESENT,
            connection.peer().certificate_der.is_some(),
        );
        output.set_bool(keys::BIDIRECTIONAL_ACTIVE, connection.bidirectional_active());
        Ok(output)
    })
}
