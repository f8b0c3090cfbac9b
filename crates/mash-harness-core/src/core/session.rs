// crates/mash-harness-core/src/core/session.rs
// ============================================================================
// Module: Suite Session
// Description: Commissioned-zone identity and crypto material carried across steps.
// Purpose: Let later steps reconnect with the crypto minted at commissioning.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! The suite session records which zone the suite commissioned and the PEM
//! material minted for it. Recording overwrites prior state atomically and
//! `clear` is idempotent. Connections clear their working crypto on
//! disconnect; the session copy survives so reconnects can re-apply it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Crypto State
// ============================================================================

/// Zone crypto material serialized as PEM/DER so it can outlive connections.
///
/// # Invariants
/// - Read-only after recording; replaced wholesale, never patched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CryptoState {
    /// Zone CA certificate, PEM.
    pub zone_ca_cert_pem: String,
    /// Zone CA private key, PEM.
    pub zone_ca_key_pem: String,
    /// Zone CA certificate, DER, for trust-pool construction.
    pub zone_ca_der: Vec<u8>,
    /// Controller operational certificate, PEM.
    pub controller_cert_pem: String,
    /// Controller operational private key, PEM.
    pub controller_key_pem: String,
    /// Controller operational certificate, DER, for client identity.
    pub controller_cert_der: Vec<u8>,
    /// Controller operational private key, PKCS#8 DER, for client identity.
    pub controller_key_der: Vec<u8>,
    /// Most recently issued device certificate, PEM.
    pub issued_device_cert_pem: Option<String>,
}

// ============================================================================
// SECTION: Suite Session
// ============================================================================

/// Per-suite session store for the commissioned zone.
///
/// # Invariants
/// - `zone_id` and `crypto` are both `Some` or both `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SuiteSession {
    /// Commissioned zone identifier.
    zone_id: Option<String>,
    /// Crypto material recorded at commissioning.
    crypto: Option<CryptoState>,
}

impl SuiteSession {
    /// Records the commissioned zone, atomically replacing prior state.
    pub fn record(&mut self, zone_id: impl Into<String>, crypto: CryptoState) {
        self.zone_id = Some(zone_id.into());
        self.crypto = Some(crypto);
    }

    /// Zeroes all fields; idempotent.
    pub fn clear(&mut self) {
        self.zone_id = None;
        self.crypto = None;
    }

    /// Returns true when a commissioned zone is recorded.
    #[must_use]
    pub const fn is_commissioned(&self) -> bool {
        self.zone_id.is_some()
    }

    /// Returns the commissioned zone identifier.
    #[must_use]
    pub fn zone_id(&self) -> Option<&str> {
        self.zone_id.as_deref()
    }

    /// Returns the recorded crypto material.
    #[must_use]
    pub const fn crypto(&self) -> Option<&CryptoState> {
        self.crypto.as_ref()
    }

    /// Returns the derived connection key (`"main-" + zone_id`).
    #[must_use]
    pub fn conn_key(&self) -> Option<String> {
        self.zone_id.as_ref().map(|zone_id| format!("main-{zone_id}"))
    }
}
