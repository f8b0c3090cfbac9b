// crates/mash-harness-net/src/manager.rs
// ============================================================================
// Module: Connection Manager
// Description: Main and zone-scoped connections with cap and backoff state.
// Purpose: Open, route, monitor, and tear down the suite's framed channels.
// Dependencies: crate::{connection, verifier}, mash-harness-core
// ============================================================================

//! ## Overview
//! The manager owns the main connection plus at most `max_zones` zone-scoped
//! connections. Routing for ping/read/write handlers inspects the
//! `connection` or `zone` parameter: a live zone connection wins, anything
//! else silently falls back to the main connection. Crypto handed to a
//! connection dies with it; the suite-session copy owned by the caller is
//! what reconnects are built from. Reconnect monitoring is pure state here;
//! timing policy lives outside the step-execution core.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::time::Duration;

use mash_harness_core::ActionParams;
use mash_harness_core::CryptoState;
use mash_harness_core::HarnessConfig;
use mash_harness_core::SuiteSession;
use mash_harness_core::Timestamp;
use thiserror::Error;

use crate::connection::ConnectFailure;
use crate::connection::Connection;
use crate::connection::ConnectionError;
use crate::connection::PingOutcome;
use crate::verifier::TlsContext;
use crate::verifier::TlsError;

// ============================================================================
// SECTION: Manager Errors
// ============================================================================

/// Errors raised by connection-manager operations.
///
/// # Invariants
/// - Variants are stable for programmatic handling; the cap variant maps to
///   the `MAX_CONNECTIONS_EXCEEDED` output code.
#[derive(Debug, Error)]
pub enum ManagerError {
    /// The zone-connection cap was reached.
    #[error("max connections exceeded: {max}")]
    MaxConnectionsExceeded {
        /// Configured cap.
        max: usize,
    },
    /// No suite zone is recorded for reconnect.
    #[error("no suite zone")]
    NoSuiteZone,
    /// No live connection exists for the operation.
    #[error("no active connection")]
    NotConnected,
    /// Pre-commissioning trust is disabled by configuration.
    #[error("uncommissioned connections disabled")]
    UncommissionedDisabled,
    /// TLS context assembly failed.
    #[error(transparent)]
    Tls(#[from] TlsError),
    /// Connection attempt failed.
    #[error(transparent)]
    Connect(#[from] ConnectFailure),
    /// Connection operation failed.
    #[error(transparent)]
    Connection(#[from] ConnectionError),
}

// ============================================================================
// SECTION: Reconnect Backoff
// ============================================================================

/// Reconnect monitoring descriptor.
///
/// # Invariants
/// - `monitoring == true` implies the descriptor exists on the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectBackoff {
    /// Reconnect attempts observed so far.
    pub attempts: u32,
    /// Baseline timestamp of the first monitored attempt.
    pub last_attempt: Option<Timestamp>,
    /// True while monitoring is armed.
    pub monitoring: bool,
}

// ============================================================================
// SECTION: Connection Manager
// ============================================================================

/// Manager for the main connection and zone-scoped connections.
///
/// # Invariants
/// - `zones.len() <= max_zones`; a zone key appears at most once.
pub struct ConnectionManager {
    /// Default dial target.
    target: String,
    /// Maximum frame size for every connection.
    max_frame: usize,
    /// Cap on zone-scoped connections.
    max_zones: usize,
    /// Whether pre-commissioning trust is permitted.
    accept_uncommissioned: bool,
    /// Main connection.
    main: Option<Connection>,
    /// Zone-scoped connections keyed by zone identifier.
    zones: BTreeMap<String, Connection>,
    /// Reconnect monitoring descriptor.
    backoff: Option<ReconnectBackoff>,
}

impl ConnectionManager {
    /// Creates a manager from validated configuration.
    #[must_use]
    pub fn new(config: &HarnessConfig) -> Self {
        Self {
            target: config.target.clone(),
            max_frame: config.max_frame_size,
            max_zones: config.max_zones,
            accept_uncommissioned: config.accept_uncommissioned_peer,
            main: None,
            zones: BTreeMap::new(),
            backoff: None,
        }
    }

    /// Returns the default dial target.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Returns the main connection.
    #[must_use]
    pub const fn main(&self) -> Option<&Connection> {
        self.main.as_ref()
    }

    /// Returns the main connection mutably.
    #[must_use]
    pub fn main_mut(&mut self) -> Option<&mut Connection> {
        self.main.as_mut()
    }

    /// Returns the number of zone-scoped connections.
    #[must_use]
    pub fn zone_count(&self) -> usize {
        self.zones.len()
    }

    /// Returns a zone-scoped connection.
    #[must_use]
    pub fn zone(&self, zone_id: &str) -> Option<&Connection> {
        self.zones.get(zone_id)
    }

    /// Returns a zone-scoped connection mutably.
    #[must_use]
    pub fn zone_mut(&mut self, zone_id: &str) -> Option<&mut Connection> {
        self.zones.get_mut(zone_id)
    }

    /// Builds the TLS context for the given crypto material.
    fn tls_context(&self, crypto: Option<&CryptoState>) -> Result<TlsContext, ManagerError> {
        match crypto {
            Some(crypto) => Ok(TlsContext::for_zone(crypto)?),
            None if self.accept_uncommissioned => Ok(TlsContext::uncommissioned()?),
            None => Err(ManagerError::UncommissionedDisabled),
        }
    }

    /// Ensures the main connection is live, dialing when necessary.
    ///
    /// No-op while the main connection is TLS-connected or operational.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError`] when the dial or handshake fails; the error
    /// carries the furthest lifecycle stage reached.
    pub async fn ensure_connected(
        &mut self,
        override_target: Option<&str>,
        crypto: Option<&CryptoState>,
    ) -> Result<(), ManagerError> {
        if self.main.as_ref().is_some_and(Connection::is_live) {
            return Ok(());
        }
        let target = override_target.unwrap_or(&self.target).to_string();
        let tls = self.tls_context(crypto)?;
        let connection = Connection::connect(&target, &tls, crypto, self.max_frame).await?;
        self.main = Some(connection);
        Ok(())
    }

    /// Closes the main connection and clears suite-session crypto; idempotent.
    pub async fn ensure_disconnected(&mut self, session: &mut SuiteSession) {
        if let Some(mut main) = self.main.take() {
            main.close("harness disconnect").await;
        }
        session.clear();
    }

    /// Opens a zone-scoped connection, enforcing the cap.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::MaxConnectionsExceeded`] at the cap and
    /// propagates dial failures.
    pub async fn connect_as_zone(
        &mut self,
        zone_id: &str,
        override_target: Option<&str>,
        crypto: Option<&CryptoState>,
    ) -> Result<(), ManagerError> {
        if !self.zones.contains_key(zone_id) && self.zones.len() >= self.max_zones {
            return Err(ManagerError::MaxConnectionsExceeded {
                max: self.max_zones,
            });
        }
        let target = override_target.unwrap_or(&self.target).to_string();
        let tls = self.tls_context(crypto)?;
        let connection = Connection::connect(&target, &tls, crypto, self.max_frame).await?;
        if let Some(mut previous) = self.zones.insert(zone_id.to_string(), connection) {
            previous.close("zone connection replaced").await;
        }
        Ok(())
    }

    /// Closes and removes a zone-scoped connection; idempotent.
    ///
    /// Returns true when a connection was found and removed.
    pub async fn disconnect_zone(&mut self, zone_id: &str) -> bool {
        match self.zones.remove(zone_id) {
            Some(mut connection) => {
                connection.close("zone disconnect").await;
                true
            }
            None => false,
        }
    }

    /// Routes to the connection named by the `connection` or `zone`
    /// parameter, silently falling back to the main connection.
    #[must_use]
    pub fn pick_connection(&mut self, params: &ActionParams) -> Option<&mut Connection> {
        let name = params.str_param("connection").or_else(|| params.str_param("zone"));
        if let Some(name) = name
            && self.zones.get(name).is_some_and(Connection::is_live)
        {
            return self.zones.get_mut(name);
        }
        if self.main.as_ref().is_some_and(Connection::is_live) {
            return self.main.as_mut();
        }
        None
    }

    /// Re-opens the main connection against the recorded suite zone.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::NoSuiteZone`] when no zone is recorded and
    /// propagates dial failures.
    pub async fn reconnect_to_zone(&mut self, session: &SuiteSession) -> Result<(), ManagerError> {
        let crypto = session.crypto().ok_or(ManagerError::NoSuiteZone)?;
        if !session.is_commissioned() {
            return Err(ManagerError::NoSuiteZone);
        }
        if let Some(mut previous) = self.main.take() {
            previous.close("reconnect").await;
        }
        let target = self.target.clone();
        let tls = TlsContext::for_zone(crypto)?;
        let connection = Connection::connect(&target, &tls, Some(crypto), self.max_frame).await?;
        self.main = Some(connection);
        if let Some(backoff) = &mut self.backoff {
            backoff.attempts = backoff.attempts.saturating_add(1);
        }
        Ok(())
    }

    /// Probes liveness of the main connection with a control ping.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::NotConnected`] without a live connection and
    /// propagates ping failures.
    pub async fn probe_session_health(
        &mut self,
        timeout: Duration,
    ) -> Result<PingOutcome, ManagerError> {
        let main = self
            .main
            .as_mut()
            .filter(|connection| connection.is_live())
            .ok_or(ManagerError::NotConnected)?;
        Ok(main.ping(timeout).await?)
    }

    /// Arms reconnect monitoring; idempotent.
    pub fn monitor_reconnect(&mut self, now: Timestamp) {
        match &mut self.backoff {
            Some(backoff) => {
                backoff.monitoring = true;
                if backoff.last_attempt.is_none() {
                    backoff.last_attempt = Some(now);
                }
            }
            None => {
                self.backoff = Some(ReconnectBackoff {
                    attempts: 0,
                    last_attempt: Some(now),
                    monitoring: true,
                });
            }
        }
    }

    /// Clears the reconnect descriptor entirely; idempotent.
    pub fn cancel_reconnect(&mut self) {
        self.backoff = None;
    }

    /// Returns the reconnect descriptor.
    #[must_use]
    pub const fn backoff(&self) -> Option<&ReconnectBackoff> {
        self.backoff.as_ref()
    }

    /// Closes every connection; used by suite teardown.
    pub async fn close_all(&mut self) {
        if let Some(mut main) = self.main.take() {
            main.close("suite teardown").await;
        }
        let zone_ids: Vec<String> = self.zones.keys().cloned().collect();
        for zone_id in zone_ids {
            if let Some(mut connection) = self.zones.remove(&zone_id) {
                connection.close("suite teardown").await;
            }
        }
    }
}
