// crates/mash-harness-core/src/core/discovery.rs
// ============================================================================
// Module: Discovery Sub-State
// Description: Simulated mDNS discovery results and QR pairing payloads.
// Purpose: Hold deterministic browse results selected by precondition flags.
// Dependencies: rand, serde, thiserror
// ============================================================================

//! ## Overview
//! Discovery is a simulator: browse actions synthesize services from
//! precondition flags placed into execution state by test setup, and this
//! sub-state stores what was synthesized. TXT records and discriminators use
//! the commissionable-service conventions of the MASH protocol; the
//! discriminator is a 12-bit value.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use rand::Rng;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum value of the 12-bit discriminator.
pub const MAX_DISCRIMINATOR: u16 = 0x0FFF;

/// QR payload prefix for the MASH pairing format.
pub const QR_PREFIX: &str = "MASH";

/// QR payload version field.
pub const QR_VERSION: &str = "0001";

// ============================================================================
// SECTION: Service Kinds
// ============================================================================

/// Advertised service classification.
///
/// # Invariants
/// - Variants are stable for serialization and expectation matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceKind {
    /// Commissionable device awaiting enrollment.
    Commissionable,
    /// Operational device already commissioned into a zone.
    Operational,
    /// Controller instance advertising itself.
    Controller,
}

impl ServiceKind {
    /// Returns the mDNS service-type tag for this kind.
    #[must_use]
    pub const fn service_type(self) -> &'static str {
        match self {
            Self::Commissionable => "_mashc._udp",
            Self::Operational => "_mash._tcp",
            Self::Controller => "_mashd._tcp",
        }
    }
}

// ============================================================================
// SECTION: Discovered Services
// ============================================================================

/// One advertised service instance.
///
/// # Invariants
/// - `discriminator <= MAX_DISCRIMINATOR`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredService {
    /// Instance name as advertised.
    pub instance_name: String,
    /// Hostname of the advertising peer.
    pub host: String,
    /// Service port.
    pub port: u16,
    /// Resolved addresses.
    pub addresses: Vec<String>,
    /// Service classification.
    pub kind: ServiceKind,
    /// TXT-record mapping.
    pub txt: BTreeMap<String, String>,
    /// 12-bit pairing discriminator.
    pub discriminator: u16,
}

impl DiscoveredService {
    /// Returns true when the mandatory commissionable TXT keys are present
    /// and the advertised discriminator matches the TXT record.
    #[must_use]
    pub fn txt_valid(&self) -> bool {
        let Some(txt_disc) = self.txt.get("D") else {
            return false;
        };
        if txt_disc.parse::<u16>() != Ok(self.discriminator) {
            return false;
        }
        self.txt.contains_key("VP") && self.txt.contains_key("CM")
    }
}

// ============================================================================
// SECTION: QR Payload
// ============================================================================

/// Errors raised while parsing a QR pairing payload.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QrPayloadError {
    /// Payload did not carry the MASH prefix or field count.
    #[error("malformed qr payload: {0}")]
    Malformed(String),
    /// Discriminator was not a 12-bit value.
    #[error("discriminator out of range: {0}")]
    DiscriminatorRange(u32),
    /// Setup code was not an 8-digit decimal string.
    #[error("invalid setup code: {0}")]
    SetupCode(String),
}

/// Parsed QR pairing payload.
///
/// # Invariants
/// - `discriminator <= MAX_DISCRIMINATOR`; `setup_code` is 8 decimal digits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QrPayload {
    /// 12-bit pairing discriminator.
    pub discriminator: u16,
    /// 8-digit decimal setup code.
    pub setup_code: String,
}

impl QrPayload {
    /// Builds a payload from parts, validating ranges.
    ///
    /// # Errors
    ///
    /// Returns [`QrPayloadError`] when the discriminator or setup code is
    /// out of shape.
    pub fn new(discriminator: u16, setup_code: impl Into<String>) -> Result<Self, QrPayloadError> {
        if discriminator > MAX_DISCRIMINATOR {
            return Err(QrPayloadError::DiscriminatorRange(u32::from(discriminator)));
        }
        let setup_code = setup_code.into();
        if setup_code.len() != 8 || !setup_code.chars().all(|ch| ch.is_ascii_digit()) {
            return Err(QrPayloadError::SetupCode(setup_code));
        }
        Ok(Self {
            discriminator,
            setup_code,
        })
    }

    /// Parses the textual payload form.
    ///
    /// # Errors
    ///
    /// Returns [`QrPayloadError`] when the payload is malformed.
    pub fn parse(payload: &str) -> Result<Self, QrPayloadError> {
        let mut fields = payload.split(':');
        let prefix = fields.next().unwrap_or_default();
        if prefix != QR_PREFIX {
            return Err(QrPayloadError::Malformed(format!("bad prefix: {prefix}")));
        }
        let version = fields.next().unwrap_or_default();
        if version != QR_VERSION {
            return Err(QrPayloadError::Malformed(format!("bad version: {version}")));
        }
        let disc_field = fields
            .next()
            .ok_or_else(|| QrPayloadError::Malformed("missing discriminator".to_string()))?;
        let discriminator = u16::from_str_radix(disc_field, 16)
            .map_err(|_| QrPayloadError::Malformed(format!("bad discriminator: {disc_field}")))?;
        let code_field = fields
            .next()
            .ok_or_else(|| QrPayloadError::Malformed("missing setup code".to_string()))?;
        if fields.next().is_some() {
            return Err(QrPayloadError::Malformed("trailing fields".to_string()));
        }
        Self::new(discriminator, code_field)
    }

    /// Generates a random payload.
    #[must_use]
    pub fn generate<R: Rng>(rng: &mut R) -> Self {
        let discriminator = rng.gen_range(0..=MAX_DISCRIMINATOR);
        let code: u32 = rng.gen_range(0..=99_999_999);
        Self {
            discriminator,
            setup_code: format!("{code:08}"),
        }
    }
}

impl fmt::Display for QrPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{QR_PREFIX}:{QR_VERSION}:{disc:04x}:{code}",
            disc = self.discriminator,
            code = self.setup_code
        )
    }
}

// ============================================================================
// SECTION: Discovery State
// ============================================================================

/// Discovery sub-state.
///
/// # Invariants
/// - `services` preserves synthesis order.
/// - `browser_token` is `Some` exactly while `active` is true.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryState {
    /// Services produced by the most recent browse.
    pub services: Vec<DiscoveredService>,
    /// Opaque browser handle for the active browse session.
    pub browser_token: Option<u64>,
    /// True while a browse session is considered active.
    pub active: bool,
    /// Cached QR pairing payload.
    pub qr_payload: Option<QrPayload>,
}

impl DiscoveryState {
    /// Replaces the result set and marks the browse active.
    pub fn begin_browse(&mut self, token: u64, services: Vec<DiscoveredService>) {
        self.services = services;
        self.browser_token = Some(token);
        self.active = true;
    }

    /// Ends the active browse session; idempotent.
    pub fn end_browse(&mut self) {
        self.browser_token = None;
        self.active = false;
    }
}
