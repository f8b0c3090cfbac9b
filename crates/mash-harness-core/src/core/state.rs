// crates/mash-harness-core/src/core/state.rs
// ============================================================================
// Module: Execution State
// Description: Per-suite state container owning all harness sub-stores.
// Purpose: Give steps a single-owner home for variables and typed sub-state.
// Dependencies: crate::core, serde
// ============================================================================

//! ## Overview
//! One `ExecutionState` exists per suite run and is owned by the driver
//! task, so no locking is required within a step. It holds user-visible
//! variables produced by prior steps and the typed sub-stores (zones,
//! device, discovery, controller, session, grace) plus the pure bookkeeping
//! half of the connection tracker: the FIFO pending-command queue and the
//! simulated clock offset used by renewal tests. Live connections are owned
//! by the connection manager, not by this container.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::VecDeque;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::controller::ControllerState;
use crate::core::device::DeviceState;
use crate::core::discovery::DiscoveryState;
use crate::core::grace::GracePeriodState;
use crate::core::session::SuiteSession;
use crate::core::value::ActionParams;
use crate::core::zones::ZoneState;

// ============================================================================
// SECTION: Queued Commands
// ============================================================================

/// Command deferred by a step for later execution.
///
/// # Invariants
/// - Entries are consumed strictly FIFO.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedCommand {
    /// Action name to run when dequeued.
    pub action: String,
    /// Parameters captured at queue time.
    pub params: ActionParams,
}

// ============================================================================
// SECTION: Execution State
// ============================================================================

/// Per-suite execution state.
///
/// # Invariants
/// - Single-owner and single-threaded within a suite run.
/// - `pending_queue` is strict FIFO.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionState {
    /// User-visible variables produced by prior steps.
    vars: BTreeMap<String, Value>,
    /// Zone sub-state.
    pub zones: ZoneState,
    /// Device simulation sub-state.
    pub device: DeviceState,
    /// Discovery simulation sub-state.
    pub discovery: DiscoveryState,
    /// Controller sub-state.
    pub controller: ControllerState,
    /// Suite session (commissioned zone and crypto material).
    pub session: SuiteSession,
    /// Grace-period accounting.
    pub grace: GracePeriodState,
    /// FIFO queue of deferred commands.
    pub pending_queue: VecDeque<QueuedCommand>,
    /// Simulated clock offset in milliseconds for renewal tests.
    pub clock_offset_ms: i64,
    /// Set when a step mutated device state, so teardown can restore.
    pub device_state_modified: bool,
}

impl ExecutionState {
    /// Creates an empty execution state with default sub-stores.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a variable produced by a prior step.
    #[must_use]
    pub fn get_var(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    /// Sets a variable, replacing any previous value.
    pub fn set_var(&mut self, name: impl Into<String>, value: Value) {
        self.vars.insert(name.into(), value);
    }

    /// Returns the full variable mapping.
    #[must_use]
    pub const fn vars(&self) -> &BTreeMap<String, Value> {
        &self.vars
    }

    /// Returns true when a boolean precondition flag is set in variables.
    #[must_use]
    pub fn flag(&self, name: &str) -> bool {
        self.vars.get(name).and_then(Value::as_bool).unwrap_or(false)
    }

    /// Appends a deferred command to the pending queue.
    pub fn queue_command(&mut self, command: QueuedCommand) {
        self.pending_queue.push_back(command);
    }

    /// Pops the oldest deferred command.
    pub fn dequeue_command(&mut self) -> Option<QueuedCommand> {
        self.pending_queue.pop_front()
    }
}
