// crates/mash-harness-core/src/core/controller.rs
// ============================================================================
// Module: Controller Sub-State
// Description: Controller identity and device-to-zone bindings.
// Purpose: Track the commissioning controller's view across suite steps.
// Dependencies: serde
// ============================================================================

//! Controller identity, the advertised commissioning window, and the
//! device-id to zone-id binding table.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default commissioning-window duration in seconds.
pub const DEFAULT_COMMISSIONING_WINDOW_SECS: u64 = 300;

// ============================================================================
// SECTION: Controller State
// ============================================================================

/// Controller sub-state.
///
/// # Invariants
/// - `controller_id` is stable for the lifetime of a suite run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerState {
    /// Stable controller identifier.
    pub controller_id: String,
    /// Advertised commissioning-window duration in seconds.
    pub commissioning_window_secs: u64,
    /// Device identifier to zone identifier bindings.
    pub device_zones: BTreeMap<String, String>,
}

impl Default for ControllerState {
    fn default() -> Self {
        Self {
            controller_id: "mash-controller-1".to_string(),
            commissioning_window_secs: DEFAULT_COMMISSIONING_WINDOW_SECS,
            device_zones: BTreeMap::new(),
        }
    }
}

impl ControllerState {
    /// Binds a device into a zone, replacing any previous binding.
    pub fn bind_device(&mut self, device_id: impl Into<String>, zone_id: impl Into<String>) {
        self.device_zones.insert(device_id.into(), zone_id.into());
    }

    /// Returns the zone a device is bound to.
    #[must_use]
    pub fn zone_for_device(&self, device_id: &str) -> Option<&str> {
        self.device_zones.get(device_id).map(String::as_str)
    }
}
