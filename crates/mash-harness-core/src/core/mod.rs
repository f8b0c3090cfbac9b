// crates/mash-harness-core/src/core/mod.rs
// ============================================================================
// Module: Core Data Model
// Description: Execution state, sub-stores, values, and output-key constants.
// Purpose: Group the per-suite data model behind one module path.
// Dependencies: crate::core submodules
// ============================================================================

//! Core data model for the step-execution runtime.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod controller;
pub mod device;
pub mod discovery;
pub mod grace;
pub mod keys;
pub mod session;
pub mod state;
pub mod time;
pub mod value;
pub mod zones;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use controller::ControllerState;
pub use device::ControlState;
pub use device::DeviceState;
pub use device::Fault;
pub use device::OperatingState;
pub use device::ProcessState;
pub use discovery::DiscoveredService;
pub use discovery::DiscoveryState;
pub use discovery::QrPayload;
pub use discovery::QrPayloadError;
pub use discovery::ServiceKind;
pub use grace::GracePeriodState;
pub use grace::GraceStatus;
pub use session::CryptoState;
pub use session::SuiteSession;
pub use state::ExecutionState;
pub use state::QueuedCommand;
pub use time::Timestamp;
pub use value::ActionParams;
pub use value::OutputMap;
pub use value::coerce_i64;
pub use value::coerce_u64;
pub use zones::ZoneError;
pub use zones::ZoneInfo;
pub use zones::ZoneState;
pub use zones::ZoneType;
pub use zones::generate_zone_id;
pub use zones::is_valid_zone_id;
