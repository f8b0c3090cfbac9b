// crates/mash-harness-core/src/core/time.rs
// ============================================================================
// Module: Harness Time Model
// Description: Canonical timestamp representation for suite state records.
// Purpose: Provide explicit, serializable time values for zone and fault logs.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Sub-stores record wall-clock moments (commissioning time, fault time,
//! last-seen) as unix-epoch milliseconds. Renewal tests never consult the
//! wall clock; they advance a simulated day counter kept in grace-period
//! state instead.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Timestamp
// ============================================================================

/// Unix-epoch milliseconds timestamp.
///
/// # Invariants
/// - Values are non-negative for any moment after the epoch; callers supply
///   the value, no monotonicity is enforced.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Epoch origin.
    pub const EPOCH: Self = Self(0);

    /// Creates a timestamp from unix milliseconds.
    #[must_use]
    pub const fn from_unix_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns the current wall-clock time.
    #[must_use]
    pub fn now() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
            .unwrap_or(0);
        Self(millis)
    }

    /// Returns the timestamp as unix milliseconds.
    #[must_use]
    pub const fn as_unix_millis(self) -> i64 {
        self.0
    }

    /// Returns a copy shifted by the given millisecond offset.
    #[must_use]
    pub const fn offset_by(self, millis: i64) -> Self {
        Self(self.0.saturating_add(millis))
    }
}
