// crates/mash-harness-core/src/core/zones.rs
// ============================================================================
// Module: Zone Sub-State
// Description: Zone lifecycle, priority, CA fingerprints, and device binding.
// Purpose: Track commissioned trust domains across suite steps.
// Dependencies: rand, serde, thiserror
// ============================================================================

//! ## Overview
//! A zone is a logical trust domain; at most one TLS connection per zone is
//! permitted and at most one zone per type exists at any time. Priority is
//! fully determined by type (GRID=2, LOCAL=1, TEST=0). The ordered identifier
//! list mirrors the zone map exactly and preserves insertion order for
//! tie-breaks in priority scans.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use rand::Rng;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default cap on simultaneously commissioned zones.
pub const DEFAULT_MAX_ZONES: usize = 5;

/// Length of a zone identifier in hexadecimal characters.
pub const ZONE_ID_HEX_LEN: usize = 16;

// ============================================================================
// SECTION: Zone Type
// ============================================================================

/// Trust-domain classification for a zone.
///
/// # Invariants
/// - Variants are stable for serialization and expectation matching.
/// - Each type appears at most once within a zone set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ZoneType {
    /// Grid-operator zone, highest priority.
    Grid,
    /// Local-installation zone.
    Local,
    /// Test zone, lowest priority.
    Test,
}

impl ZoneType {
    /// Returns the priority derived from the zone type.
    #[must_use]
    pub const fn priority(self) -> u8 {
        match self {
            Self::Grid => 2,
            Self::Local => 1,
            Self::Test => 0,
        }
    }

    /// Returns the stable wire label for the type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Grid => "GRID",
            Self::Local => "LOCAL",
            Self::Test => "TEST",
        }
    }

    /// Parses a type label case-insensitively.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label.to_ascii_uppercase().as_str() {
            "GRID" => Some(Self::Grid),
            "LOCAL" => Some(Self::Local),
            "TEST" => Some(Self::Test),
            _ => None,
        }
    }
}

impl fmt::Display for ZoneType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Zone Info
// ============================================================================

/// Commissioned zone record.
///
/// # Invariants
/// - `priority` always equals `zone_type.priority()`.
/// - `ca_fingerprint`, once set from real CA material, is stable until the
///   zone is removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneInfo {
    /// Zone identifier (16 hex characters).
    pub zone_id: String,
    /// Human-readable zone name.
    pub zone_name: String,
    /// Trust-domain classification.
    pub zone_type: ZoneType,
    /// Priority derived from the zone type.
    pub priority: u8,
    /// Free-form metadata attached at creation.
    pub metadata: BTreeMap<String, Value>,
    /// Hex SHA-256 fingerprint of the zone CA certificate DER.
    pub ca_fingerprint: Option<String>,
    /// True while a zone-scoped connection is live.
    pub connected: bool,
    /// Devices bound into the zone.
    pub device_ids: Vec<String>,
    /// Commissioning timestamp.
    pub commissioned_at: Timestamp,
    /// Last activity timestamp.
    pub last_seen: Timestamp,
}

impl ZoneInfo {
    /// Creates a zone record with priority derived from the type.
    #[must_use]
    pub fn new(
        zone_id: impl Into<String>,
        zone_name: impl Into<String>,
        zone_type: ZoneType,
        commissioned_at: Timestamp,
    ) -> Self {
        Self {
            zone_id: zone_id.into(),
            zone_name: zone_name.into(),
            zone_type,
            priority: zone_type.priority(),
            metadata: BTreeMap::new(),
            ca_fingerprint: None,
            connected: false,
            device_ids: Vec::new(),
            commissioned_at,
            last_seen: commissioned_at,
        }
    }
}

// ============================================================================
// SECTION: Zone Errors
// ============================================================================

/// Errors raised by zone-set mutations.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum ZoneError {
    /// A zone of the same type already exists.
    #[error("zone type already present: {0}")]
    DuplicateType(ZoneType),
    /// A zone with the same identifier already exists.
    #[error("zone id already present: {0}")]
    DuplicateId(String),
    /// The zone set is at its configured maximum.
    #[error("zone cap reached: {0}")]
    CapReached(usize),
}

// ============================================================================
// SECTION: Zone State
// ============================================================================

/// Zone sub-state with insertion-ordered enumeration.
///
/// # Invariants
/// - `order` contains exactly the keys of `zones`, in insertion order.
/// - `zones.len() <= max_zones`.
/// - Zone types are pairwise distinct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneState {
    /// Zone records keyed by zone identifier.
    zones: BTreeMap<String, ZoneInfo>,
    /// Insertion-ordered zone identifiers.
    order: Vec<String>,
    /// Maximum number of simultaneous zones.
    max_zones: usize,
}

impl Default for ZoneState {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ZONES)
    }
}

impl ZoneState {
    /// Creates an empty zone set with the given cap.
    #[must_use]
    pub const fn new(max_zones: usize) -> Self {
        Self {
            zones: BTreeMap::new(),
            order: Vec::new(),
            max_zones,
        }
    }

    /// Returns the configured zone cap.
    #[must_use]
    pub const fn max_zones(&self) -> usize {
        self.max_zones
    }

    /// Returns the number of zones in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.zones.len()
    }

    /// Returns true when the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    /// Returns the zone record for an identifier.
    #[must_use]
    pub fn get(&self, zone_id: &str) -> Option<&ZoneInfo> {
        self.zones.get(zone_id)
    }

    /// Returns a mutable zone record for an identifier.
    #[must_use]
    pub fn get_mut(&mut self, zone_id: &str) -> Option<&mut ZoneInfo> {
        self.zones.get_mut(zone_id)
    }

    /// Inserts a zone, enforcing the cap and type/id uniqueness.
    ///
    /// # Errors
    ///
    /// Returns [`ZoneError`] when the cap is reached or a duplicate type or
    /// identifier is present.
    pub fn insert(&mut self, info: ZoneInfo) -> Result<(), ZoneError> {
        if self.zones.len() >= self.max_zones {
            return Err(ZoneError::CapReached(self.max_zones));
        }
        if self.zones.contains_key(&info.zone_id) {
            return Err(ZoneError::DuplicateId(info.zone_id));
        }
        if self.zones.values().any(|zone| zone.zone_type == info.zone_type) {
            return Err(ZoneError::DuplicateType(info.zone_type));
        }
        self.order.push(info.zone_id.clone());
        self.zones.insert(info.zone_id.clone(), info);
        Ok(())
    }

    /// Removes a zone; idempotent.
    ///
    /// Returns true when a zone was actually removed.
    pub fn remove(&mut self, zone_id: &str) -> bool {
        let removed = self.zones.remove(zone_id).is_some();
        if removed {
            self.order.retain(|id| id != zone_id);
        }
        removed
    }

    /// Iterates zones in insertion order.
    pub fn in_order(&self) -> impl Iterator<Item = &ZoneInfo> {
        self.order.iter().filter_map(|id| self.zones.get(id))
    }

    /// Returns the highest-priority zone, ties broken by insertion order.
    #[must_use]
    pub fn highest_priority(&self) -> Option<&ZoneInfo> {
        self.scan_highest(|_| true)
    }

    /// Returns the highest-priority connected zone, ties broken by insertion
    /// order.
    #[must_use]
    pub fn highest_priority_connected(&self) -> Option<&ZoneInfo> {
        self.scan_highest(|zone| zone.connected)
    }

    /// Single-pass priority scan with strict-greater comparison so earlier
    /// insertions win ties.
    fn scan_highest(&self, keep: impl Fn(&ZoneInfo) -> bool) -> Option<&ZoneInfo> {
        let mut best: Option<&ZoneInfo> = None;
        for zone in self.in_order() {
            if !keep(zone) {
                continue;
            }
            match best {
                Some(current) if zone.priority <= current.priority => {}
                _ => best = Some(zone),
            }
        }
        best
    }
}

// ============================================================================
// SECTION: Zone Identifiers
// ============================================================================

/// Generates a random 16-hex-character zone identifier.
#[must_use]
pub fn generate_zone_id<R: Rng>(rng: &mut R) -> String {
    let raw: u64 = rng.r#gen();
    format!("{raw:016x}")
}

/// Returns true when the identifier is exactly 16 hexadecimal characters.
#[must_use]
pub fn is_valid_zone_id(zone_id: &str) -> bool {
    zone_id.len() == ZONE_ID_HEX_LEN && zone_id.chars().all(|ch| ch.is_ascii_hexdigit())
}
