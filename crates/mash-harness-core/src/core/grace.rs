// crates/mash-harness-core/src/core/grace.rs
// ============================================================================
// Module: Grace-Period Accounting
// Description: Pure state-keeping for certificate-renewal grace periods.
// Purpose: Answer in/expired questions against a simulated day clock.
// Dependencies: serde
// ============================================================================

//! Grace-period accounting never touches the wall clock: tests set the
//! period, advance a simulated day counter, and query the derived status.
//! The status law is `in_grace_period = 0 < past <= grace` and
//! `grace_period_expired = past > grace`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Grace Status
// ============================================================================

/// Derived grace-period status snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraceStatus {
    /// Configured grace period in days.
    pub grace_period_days: u32,
    /// Simulated days past certificate expiry.
    pub days_past_expiry: u32,
    /// True when the clock sits inside the grace period.
    pub in_grace_period: bool,
    /// True when the clock passed the grace period.
    pub grace_period_expired: bool,
}

// ============================================================================
// SECTION: Grace-Period State
// ============================================================================

/// Grace-period sub-state.
///
/// # Invariants
/// - `days_past_expiry` only grows within a suite, via
///   [`GracePeriodState::advance_days`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GracePeriodState {
    /// Configured grace period in days; `None` until set by a step.
    grace_period_days: Option<u32>,
    /// Simulated days elapsed past certificate expiry.
    days_past_expiry: u32,
}

impl GracePeriodState {
    /// Sets the grace period in days.
    pub const fn set_grace_period(&mut self, days: u32) {
        self.grace_period_days = Some(days);
    }

    /// Returns the configured grace period.
    #[must_use]
    pub const fn grace_period_days(&self) -> Option<u32> {
        self.grace_period_days
    }

    /// Advances the simulated clock by whole days.
    pub const fn advance_days(&mut self, days: u32) {
        self.days_past_expiry = self.days_past_expiry.saturating_add(days);
    }

    /// Returns the simulated days past expiry.
    #[must_use]
    pub const fn days_past_expiry(&self) -> u32 {
        self.days_past_expiry
    }

    /// Computes the derived status; a missing grace period reads as zero
    /// days of grace.
    #[must_use]
    pub fn status(&self) -> GraceStatus {
        let grace = self.grace_period_days.unwrap_or(0);
        let past = self.days_past_expiry;
        GraceStatus {
            grace_period_days: grace,
            days_past_expiry: past,
            in_grace_period: past > 0 && past <= grace,
            grace_period_expired: past > grace,
        }
    }
}
