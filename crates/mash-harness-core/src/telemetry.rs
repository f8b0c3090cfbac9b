// crates/mash-harness-core/src/telemetry.rs
// ============================================================================
// Module: Harness Telemetry
// Description: Observability hooks for step execution and wire I/O.
// Purpose: Provide metric events and audit records without hard deps.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! This module exposes a thin metrics interface for step counters and wire
//! latency plus an audit sink emitting one JSON line per executed step. It
//! is intentionally dependency-light so downstream deployments can plug in
//! their own telemetry without redesign; the defaults are a no-op sink and
//! a stderr sink.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::time::Duration;

use serde::Serialize;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default latency buckets in milliseconds for wire round-trip histograms.
pub const WIRE_LATENCY_BUCKETS_MS: &[u64] =
    &[1, 2, 5, 10, 25, 50, 100, 250, 500, 1_000, 2_500, 5_000];

// ============================================================================
// SECTION: Outcome Labels
// ============================================================================

/// Step outcome classification.
///
/// # Invariants
/// - Variants are stable for telemetry labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
    /// Handler returned an output map.
    Completed,
    /// Handler aborted with a hard error.
    Aborted,
}

impl StepOutcome {
    /// Returns a stable label for the outcome.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Aborted => "aborted",
        }
    }
}

// ============================================================================
// SECTION: Metrics Interface
// ============================================================================

/// Metrics sink for step execution and wire I/O.
pub trait HarnessMetrics: Send + Sync {
    /// Records one executed step.
    fn record_step(&self, action: &str, outcome: StepOutcome, elapsed: Duration) {
        let _ = (action, outcome, elapsed);
    }

    /// Records one wire request round-trip.
    fn record_wire_latency(&self, elapsed: Duration) {
        let _ = elapsed;
    }
}

/// Metrics sink that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl HarnessMetrics for NoopMetrics {}

// ============================================================================
// SECTION: Step Audit
// ============================================================================

/// Audit record for one executed step.
///
/// # Invariants
/// - `error` is `Some` exactly when `outcome` is [`StepOutcome::Aborted`].
#[derive(Debug, Clone, Serialize)]
pub struct StepAuditEvent {
    /// Action name executed.
    pub action: String,
    /// Step outcome.
    pub outcome: StepOutcome,
    /// Step duration in milliseconds.
    pub duration_ms: u64,
    /// Hard-error description for aborted steps.
    pub error: Option<String>,
}

/// Audit sink receiving one event per executed step.
pub trait StepAuditSink: Send + Sync {
    /// Records one step event.
    fn record(&self, event: &StepAuditEvent);
}

/// Audit sink that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAuditSink;

impl StepAuditSink for NoopAuditSink {
    fn record(&self, _event: &StepAuditEvent) {}
}

/// Audit sink writing JSON lines to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrAuditSink;

impl StepAuditSink for StderrAuditSink {
    fn record(&self, event: &StepAuditEvent) {
        if let Ok(line) = serde_json::to_string(event) {
            let mut stderr = std::io::stderr().lock();
            let _ = writeln!(stderr, "{line}");
        }
    }
}
