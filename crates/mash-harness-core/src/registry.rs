// crates/mash-harness-core/src/registry.rs
// ============================================================================
// Module: Action Registry and Dispatch
// Description: Name-to-handler registry with a uniform async contract.
// Purpose: Route step actions to handlers over a caller-chosen execution bundle.
// Dependencies: crate::{core, resolver}, thiserror
// ============================================================================

//! ## Overview
//! Every action shares one contract: consume interpolated parameters, mutate
//! or consult state through the execution bundle, and return an output map
//! for the expectation layer. The registry is generic over the execution
//! bundle `E` so the core stays free of transport types; the harness crate
//! instantiates it with its state-plus-connection bundle.
//!
//! Error tiers: programmer errors (unknown action, bad parameter types)
//! surface as [`ActionError`] and abort the step; step-domain failures are
//! returned as `Ok` output maps carrying failure keys.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use std::time::Instant;

use thiserror::Error;

use crate::core::value::ActionParams;
use crate::core::value::OutputMap;
use crate::resolver::ResolveError;

// ============================================================================
// SECTION: Step Context
// ============================================================================

/// Per-step context carrying the cancellation deadline.
///
/// # Invariants
/// - `remaining()` never exceeds the configured step timeout.
#[derive(Debug, Clone)]
pub struct StepContext {
    /// Moment the step started executing.
    started: Instant,
    /// Total budget for the step.
    timeout: Duration,
}

impl StepContext {
    /// Creates a context with the given step budget.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            started: Instant::now(),
            timeout,
        }
    }

    /// Returns the total step budget.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns elapsed time since the step started.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Returns the remaining budget, saturating at zero.
    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.timeout.saturating_sub(self.started.elapsed())
    }

    /// Returns true when the budget is exhausted.
    #[must_use]
    pub fn expired(&self) -> bool {
        self.remaining().is_zero()
    }
}

// ============================================================================
// SECTION: Action Errors
// ============================================================================

/// Hard errors aborting a step (tier 1 of the error model).
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum ActionError {
    /// No handler is registered for the action name.
    #[error("unknown action: {0}")]
    UnknownAction(String),
    /// A meta-dispatcher received an unknown sub-action.
    #[error("unknown sub-action: {0}")]
    UnknownSubAction(String),
    /// A required parameter was absent.
    #[error("missing parameter: {0}")]
    MissingParameter(&'static str),
    /// A parameter carried an unusable type or value.
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Human-readable reason.
        reason: String,
    },
    /// Name or identifier resolution failed.
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    /// An action name was registered twice.
    #[error("action already registered: {0}")]
    DuplicateAction(&'static str),
    /// Internal invariant breach while mutating state.
    #[error("state error: {0}")]
    State(String),
}

// ============================================================================
// SECTION: Handler Contract
// ============================================================================

/// Boxed future returned by action handlers.
pub type HandlerFuture<'a> =
    Pin<Box<dyn Future<Output = Result<OutputMap, ActionError>> + Send + 'a>>;

/// Handler function over the execution bundle `E`.
pub type HandlerFn<E> =
    for<'a> fn(&'a StepContext, &'a ActionParams, &'a mut E) -> HandlerFuture<'a>;

// ============================================================================
// SECTION: Action Registry
// ============================================================================

/// Registry mapping action names to handlers.
///
/// # Invariants
/// - Action names are unique; registration happens once at startup.
pub struct ActionRegistry<E> {
    /// Handlers keyed by action name.
    handlers: BTreeMap<&'static str, HandlerFn<E>>,
}

impl<E> Default for ActionRegistry<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> FromIterator<(&'static str, HandlerFn<E>)> for ActionRegistry<E> {
    /// Builds a registry from entries; later entries overwrite earlier ones.
    fn from_iter<T: IntoIterator<Item = (&'static str, HandlerFn<E>)>>(iter: T) -> Self {
        Self {
            handlers: iter.into_iter().collect(),
        }
    }
}

impl<E> ActionRegistry<E> {
    /// Creates an empty registry.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            handlers: BTreeMap::new(),
        }
    }

    /// Registers a handler for an action name.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::DuplicateAction`] when the name is taken.
    pub fn register(&mut self, name: &'static str, handler: HandlerFn<E>) -> Result<(), ActionError> {
        if self.handlers.contains_key(name) {
            return Err(ActionError::DuplicateAction(name));
        }
        self.handlers.insert(name, handler);
        Ok(())
    }

    /// Returns the handler for an action name.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<HandlerFn<E>> {
        self.handlers.get(name).copied()
    }

    /// Returns true when the action name is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Returns the number of registered actions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns true when no actions are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Iterates registered action names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.handlers.keys().copied()
    }

    /// Dispatches an action by name.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::UnknownAction`] for unregistered names and
    /// propagates handler tier-1 errors.
    pub async fn dispatch(
        &self,
        ctx: &StepContext,
        name: &str,
        params: &ActionParams,
        exec: &mut E,
    ) -> Result<OutputMap, ActionError> {
        let handler = self
            .lookup(name)
            .ok_or_else(|| ActionError::UnknownAction(name.to_string()))?;
        handler(ctx, params, exec).await
    }
}
