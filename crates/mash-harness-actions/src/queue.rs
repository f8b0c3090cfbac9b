// crates/mash-harness-actions/src/queue.rs
// ============================================================================
// Module: Queue Actions
// Description: Deferred-command queue handlers.
// Purpose: Let steps defer sends and consume results strictly FIFO.
// Dependencies: crate::{execution, support}, mash-harness-core
// ============================================================================

//! The pending queue is strict FIFO: `queue_command` appends, and
//! `wait_for_queued_result` consumes exactly one entry, reporting
//! `queue_empty=true` when nothing is pending.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use mash_harness_core::ActionParams;
use mash_harness_core::OutputMap;
use mash_harness_core::QueuedCommand;
use mash_harness_core::StepContext;
use mash_harness_core::keys;
use mash_harness_core::registry::HandlerFuture;
use serde_json::Value;

use crate::execution::Execution;
use crate::support::require_str;

// ============================================================================
// SECTION: Handlers
// ============================================================================

/// `queue_command`: appends a deferred command to the pending queue.
pub(crate) fn queue_command<'a>(
    _ctx: &'a StepContext,
    params: &'a ActionParams,
    exec: &'a mut Execution,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let action = require_str(params, "action")?.to_string();
        let command_params = params
            .map_param("params")
            .map(|entries| {
                entries
                    .iter()
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect::<BTreeMap<String, Value>>()
            })
            .unwrap_or_default();
        exec.state.queue_command(QueuedCommand {
            action,
            params: ActionParams::from_map(command_params),
        });
        let mut output = OutputMap::new();
        output.set_bool(keys::COMMAND_QUEUED, true);
        output.set_u64(keys::QUEUE_LENGTH, exec.state.pending_queue.len() as u64);
        Ok(output)
    })
}

/// `wait_for_queued_result`: consumes the oldest pending command.
pub(crate) fn wait_for_queued_result<'a>(
    _ctx: &'a StepContext,
    _params: &'a ActionParams,
    exec: &'a mut Execution,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let mut output = OutputMap::new();
        match exec.state.dequeue_command() {
            Some(command) => {
                output.set_bool(keys::RESULT_RECEIVED, true);
                output.set_str(keys::ACTION, command.action);
                output.set_u64(keys::QUEUE_LENGTH, exec.state.pending_queue.len() as u64);
            }
            None => {
                output.set_bool(keys::QUEUE_EMPTY, true);
                output.set_bool(keys::RESULT_RECEIVED, false);
            }
        }
        Ok(output)
    })
}
