// crates/mash-harness-core/src/core/device.rs
// ============================================================================
// Module: Device Sub-State
// Description: Simulated device operating, control, and process states.
// Purpose: Track device-side behavior mutated by simulation actions.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! The device sub-state mirrors what a remote device simulator would hold:
//! coarse operating state, control mode, process state, the active fault
//! list, and EV lifecycle flags. The fault coupling invariant is enforced
//! here: a non-empty fault list forces `operating_state = FAULT`, and
//! clearing the last fault restores `STANDBY`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::time::Timestamp;

// ============================================================================
// SECTION: State Enumerations
// ============================================================================

/// Coarse device operating state.
///
/// # Invariants
/// - Variants are stable for serialization and expectation matching.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperatingState {
    /// Idle, ready to run.
    #[default]
    Standby,
    /// Actively running a process.
    Running,
    /// Paused mid-process.
    Paused,
    /// At least one active fault.
    Fault,
    /// Powered down.
    Off,
}

impl OperatingState {
    /// Returns the stable wire label for the state.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Standby => "STANDBY",
            Self::Running => "RUNNING",
            Self::Paused => "PAUSED",
            Self::Fault => "FAULT",
            Self::Off => "OFF",
        }
    }

    /// Parses a state label case-insensitively.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label.to_ascii_uppercase().as_str() {
            "STANDBY" => Some(Self::Standby),
            "RUNNING" => Some(Self::Running),
            "PAUSED" => Some(Self::Paused),
            "FAULT" => Some(Self::Fault),
            "OFF" => Some(Self::Off),
            _ => None,
        }
    }
}

impl fmt::Display for OperatingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Device control mode.
///
/// # Invariants
/// - Variants are stable for serialization and expectation matching.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlState {
    /// Device decides on its own.
    #[default]
    Autonomous,
    /// Controller-issued setpoints are in force.
    Controlled,
    /// Manual override engaged.
    Override,
    /// Failsafe limits engaged after communication loss.
    Failsafe,
}

impl ControlState {
    /// Returns the stable wire label for the state.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Autonomous => "AUTONOMOUS",
            Self::Controlled => "CONTROLLED",
            Self::Override => "OVERRIDE",
            Self::Failsafe => "FAILSAFE",
        }
    }

    /// Parses a state label case-insensitively.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label.to_ascii_uppercase().as_str() {
            "AUTONOMOUS" => Some(Self::Autonomous),
            "CONTROLLED" => Some(Self::Controlled),
            "OVERRIDE" => Some(Self::Override),
            "FAILSAFE" => Some(Self::Failsafe),
            _ => None,
        }
    }
}

impl fmt::Display for ControlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Device process state.
///
/// # Invariants
/// - Variants are stable for serialization and expectation matching.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessState {
    /// No process configured.
    #[default]
    None,
    /// Process available to schedule.
    Available,
    /// Process scheduled for a future slot.
    Scheduled,
    /// Process currently active.
    Active,
    /// Process finished.
    Completed,
    /// Process aborted before completion.
    Aborted,
}

impl ProcessState {
    /// Returns the stable wire label for the state.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Available => "AVAILABLE",
            Self::Scheduled => "SCHEDULED",
            Self::Active => "ACTIVE",
            Self::Completed => "COMPLETED",
            Self::Aborted => "ABORTED",
        }
    }

    /// Parses a state label case-insensitively.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label.to_ascii_uppercase().as_str() {
            "NONE" => Some(Self::None),
            "AVAILABLE" => Some(Self::Available),
            "SCHEDULED" => Some(Self::Scheduled),
            "ACTIVE" => Some(Self::Active),
            "COMPLETED" => Some(Self::Completed),
            "ABORTED" => Some(Self::Aborted),
            _ => None,
        }
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Faults
// ============================================================================

/// Active fault entry.
///
/// # Invariants
/// - `code` identifies the fault for targeted clearing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fault {
    /// Numeric fault code.
    pub code: u32,
    /// Human-readable fault description.
    pub message: String,
    /// Injection timestamp.
    pub time: Timestamp,
}

// ============================================================================
// SECTION: Device State
// ============================================================================

/// Device simulation sub-state.
///
/// # Invariants
/// - `operating_state == Fault` if and only if `faults` is non-empty, for
///   transitions driven through [`DeviceState::inject_fault`] and
///   [`DeviceState::clear_fault`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceState {
    /// Coarse operating state.
    pub operating_state: OperatingState,
    /// Control mode.
    pub control_state: ControlState,
    /// Process state.
    pub process_state: ProcessState,
    /// Active faults, in injection order.
    pub faults: Vec<Fault>,
    /// True while an EV is connected.
    pub ev_connected: bool,
    /// True while the charge cable is plugged in.
    pub cable_plugged_in: bool,
    /// Free-form simulated attribute values.
    pub attributes: BTreeMap<String, Value>,
}

impl DeviceState {
    /// Appends a fault and forces the FAULT operating state.
    pub fn inject_fault(&mut self, fault: Fault) {
        self.faults.push(fault);
        self.operating_state = OperatingState::Fault;
    }

    /// Clears the fault with the given code; clearing the last fault
    /// restores STANDBY.
    ///
    /// Returns true when a fault was removed.
    pub fn clear_fault(&mut self, code: u32) -> bool {
        let before = self.faults.len();
        self.faults.retain(|fault| fault.code != code);
        let removed = self.faults.len() != before;
        if removed && self.faults.is_empty() {
            self.operating_state = OperatingState::Standby;
        }
        removed
    }

    /// Clears every fault and restores STANDBY.
    pub fn clear_all_faults(&mut self) {
        self.faults.clear();
        self.operating_state = OperatingState::Standby;
    }

    /// Restores all fields to their initial values.
    pub fn factory_reset(&mut self) {
        *self = Self::default();
    }
}
