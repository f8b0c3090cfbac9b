// crates/mash-harness-actions/src/execution.rs
// ============================================================================
// Module: Execution Bundle
// Description: Per-suite ownership bundle handed to every action handler.
// Purpose: Pair the execution state with the connection manager and config.
// Dependencies: mash-harness-core, mash-harness-net
// ============================================================================

//! ## Overview
//! One `Execution` exists per suite and is owned by the driver task. It
//! bundles the pure execution state, the connection manager holding live
//! channels, the validated configuration, and the per-zone crypto minted by
//! `create_zone` (the suite session holds only the commissioned zone's
//! copy). Handlers receive `&mut Execution` and never touch anything wider.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use mash_harness_core::BuiltinNameRegistry;
use mash_harness_core::CryptoState;
use mash_harness_core::ExecutionState;
use mash_harness_core::HarnessConfig;
use mash_harness_net::ConnectionManager;

// ============================================================================
// SECTION: Execution Bundle
// ============================================================================

/// Ownership bundle for one suite run.
///
/// # Invariants
/// - Single-owner and single-threaded; handlers borrow it mutably one at a
///   time.
pub struct Execution {
    /// Validated harness configuration.
    pub config: HarnessConfig,
    /// Per-suite execution state and sub-stores.
    pub state: ExecutionState,
    /// Main and zone-scoped connections.
    pub manager: ConnectionManager,
    /// Working crypto per zone, keyed by zone identifier.
    pub zone_crypto: BTreeMap<String, CryptoState>,
    /// Protocol name registry for the simulated device model.
    pub names: BuiltinNameRegistry,
}

impl Execution {
    /// Creates the bundle from validated configuration.
    #[must_use]
    pub fn new(config: HarnessConfig) -> Self {
        let manager = ConnectionManager::new(&config);
        Self {
            config,
            state: ExecutionState::new(),
            manager,
            zone_crypto: BTreeMap::new(),
            names: BuiltinNameRegistry,
        }
    }

    /// Returns the crypto recorded for a zone, preferring the working copy
    /// and falling back to the suite session.
    #[must_use]
    pub fn crypto_for_zone(&self, zone_id: &str) -> Option<&CryptoState> {
        if let Some(crypto) = self.zone_crypto.get(zone_id) {
            return Some(crypto);
        }
        match self.state.session.zone_id() {
            Some(session_zone) if session_zone == zone_id => self.state.session.crypto(),
            _ => None,
        }
    }
}
