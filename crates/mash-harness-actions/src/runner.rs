// crates/mash-harness-actions/src/runner.rs
// ============================================================================
// Module: Step Runner
// Description: Sequential step execution with interpolation and telemetry.
// Purpose: The single canonical execution path for suite steps.
// Dependencies: crate::{execution, registry_setup}, mash-harness-core
// ============================================================================

//! ## Overview
//! One runner exists per suite and owns the execution bundle. Every step
//! flows through the same path: interpolate parameters against state
//! variables, dispatch through the shared registry under the step deadline,
//! record telemetry and an audit line, then persist any outputs the step
//! asked to keep (`store_outputs`) into state variables for later steps.
//! Steps execute strictly sequentially; only wire I/O within one step is
//! concurrent.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use mash_harness_core::ActionError;
use mash_harness_core::ActionParams;
use mash_harness_core::ConfigError;
use mash_harness_core::HarnessConfig;
use mash_harness_core::HarnessMetrics;
use mash_harness_core::NoopAuditSink;
use mash_harness_core::NoopMetrics;
use mash_harness_core::OutputMap;
use mash_harness_core::StepAuditEvent;
use mash_harness_core::StepAuditSink;
use mash_harness_core::StepContext;
use mash_harness_core::StepOutcome;
use mash_harness_core::interpolate_params;

use crate::execution::Execution;
use crate::registry_setup::registry;

// ============================================================================
// SECTION: Step Runner
// ============================================================================

/// Sequential driver for one suite run.
///
/// # Invariants
/// - Steps never overlap; the runner is the sole owner of the execution
///   bundle.
pub struct StepRunner {
    /// Execution bundle owned by this suite run.
    exec: Execution,
    /// Metrics sink.
    metrics: Arc<dyn HarnessMetrics>,
    /// Step audit sink.
    audit: Arc<dyn StepAuditSink>,
}

impl StepRunner {
    /// Creates a runner from configuration, validating it first.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the configuration is unusable.
    pub fn new(config: HarnessConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            exec: Execution::new(config),
            metrics: Arc::new(NoopMetrics),
            audit: Arc::new(NoopAuditSink),
        })
    }

    /// Replaces the metrics sink.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<dyn HarnessMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Replaces the audit sink.
    #[must_use]
    pub fn with_audit(mut self, audit: Arc<dyn StepAuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Returns the execution bundle.
    #[must_use]
    pub const fn execution(&self) -> &Execution {
        &self.exec
    }

    /// Returns the execution bundle mutably.
    #[must_use]
    pub const fn execution_mut(&mut self) -> &mut Execution {
        &mut self.exec
    }

    /// Executes one step: interpolate, dispatch, record, persist.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError`] for tier-1 failures (unknown action, invalid
    /// parameter shapes); step-domain failures arrive as `Ok` output maps.
    pub async fn run_step(
        &mut self,
        action: &str,
        params: &ActionParams,
    ) -> Result<OutputMap, ActionError> {
        let interpolated = interpolate_params(params, self.exec.state.vars());
        let budget = self.step_budget(&interpolated);
        let ctx = StepContext::new(budget);
        let started = Instant::now();

        let result = registry().dispatch(&ctx, action, &interpolated, &mut self.exec).await;
        let elapsed = started.elapsed();

        let (outcome, error) = match &result {
            Ok(_) => (StepOutcome::Completed, None),
            Err(err) => (StepOutcome::Aborted, Some(err.to_string())),
        };
        self.metrics.record_step(action, outcome, elapsed);
        self.audit.record(&StepAuditEvent {
            action: action.to_string(),
            outcome,
            duration_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            error,
        });

        if let Ok(output) = &result {
            self.persist_outputs(&interpolated, output);
        }
        result
    }

    /// Returns the step budget, honoring a per-step `timeout_ms` parameter.
    fn step_budget(&self, params: &ActionParams) -> Duration {
        let configured = self.exec.config.step_timeout();
        match params.u64_param("timeout_ms") {
            Some(requested) => configured.max(Duration::from_millis(requested)),
            None => configured,
        }
    }

    /// Copies the outputs named by `store_outputs` into state variables.
    fn persist_outputs(&mut self, params: &ActionParams, output: &OutputMap) {
        let Some(requested) = params.list_param("store_outputs") else {
            return;
        };
        let names: Vec<String> = requested
            .iter()
            .filter_map(|entry| entry.as_str().map(str::to_string))
            .collect();
        for name in names {
            if let Some(value) = output.get(&name) {
                self.exec.state.set_var(name, value.clone());
            }
        }
    }

    /// Closes every connection at suite end.
    pub async fn teardown(&mut self) {
        self.exec.manager.close_all().await;
    }
}
