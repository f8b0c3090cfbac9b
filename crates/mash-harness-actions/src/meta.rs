// crates/mash-harness-actions/src/meta.rs
// ============================================================================
// Module: Meta-Dispatch Actions
// Description: Sub-action forwarding for controller and device-local paths.
// Purpose: Let suites assert the dispatch path via action_triggered.
// Dependencies: crate::{execution, registry_setup}, mash-harness-core
// ============================================================================

//! Meta-dispatchers read a `sub_action` parameter and forward to the named
//! handler. On success the sub-handler's output is augmented with
//! `action_triggered=true` and the echoed sub-action name so expectations
//! can assert the dispatch path. Unknown sub-actions abort the step.

// ============================================================================
// SECTION: Imports
// ============================================================================

use mash_harness_core::ActionError;
use mash_harness_core::ActionParams;
use mash_harness_core::OutputMap;
use mash_harness_core::StepContext;
use mash_harness_core::keys;
use mash_harness_core::registry::HandlerFuture;

use crate::execution::Execution;
use crate::registry_setup::registry;
use crate::support::require_str;

// ============================================================================
// SECTION: Forwarding
// ============================================================================

/// Forwards to the sub-action handler and wraps the output.
async fn forward(
    ctx: &StepContext,
    params: &ActionParams,
    exec: &mut Execution,
) -> Result<OutputMap, ActionError> {
    let sub_action = require_str(params, "sub_action")?.to_string();
    let handler = registry()
        .lookup(&sub_action)
        .ok_or_else(|| ActionError::UnknownSubAction(sub_action.clone()))?;
    let mut output = handler(ctx, params, exec).await?;
    output.set_bool(keys::ACTION_TRIGGERED, true);
    output.set_str(keys::SUB_ACTION, sub_action);
    Ok(output)
}

/// `controller_action`: forwards controller-side sub-actions.
pub(crate) fn controller_action<'a>(
    ctx: &'a StepContext,
    params: &'a ActionParams,
    exec: &'a mut Execution,
) -> HandlerFuture<'a> {
    Box::pin(forward(ctx, params, exec))
}

/// `device_local_action`: forwards device-simulation sub-actions.
pub(crate) fn device_local_action<'a>(
    ctx: &'a StepContext,
    params: &'a ActionParams,
    exec: &'a mut Execution,
) -> HandlerFuture<'a> {
    Box::pin(forward(ctx, params, exec))
}
