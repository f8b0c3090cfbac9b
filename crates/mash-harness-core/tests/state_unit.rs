// crates/mash-harness-core/tests/state_unit.rs
// ============================================================================
// Module: Execution State Unit Tests
// Description: Session laws, grace arithmetic, queue order, fault coupling.
// Purpose: Validate the sub-store invariants the action layer relies on.
// ============================================================================

//! Round-trip and idempotence laws for the execution-state sub-stores.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use mash_harness_core::ActionParams;
use mash_harness_core::CryptoState;
use mash_harness_core::DeviceState;
use mash_harness_core::ExecutionState;
use mash_harness_core::Fault;
use mash_harness_core::GracePeriodState;
use mash_harness_core::OperatingState;
use mash_harness_core::QueuedCommand;
use mash_harness_core::SuiteSession;
use mash_harness_core::Timestamp;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

fn crypto(tag: &str) -> CryptoState {
    CryptoState {
        zone_ca_cert_pem: format!("cert-{tag}"),
        zone_ca_key_pem: format!("key-{tag}"),
        zone_ca_der: vec![1, 2, 3],
        controller_cert_pem: format!("ctl-cert-{tag}"),
        controller_key_pem: format!("ctl-key-{tag}"),
        controller_cert_der: vec![4, 5, 6],
        controller_key_der: vec![7, 8, 9],
        issued_device_cert_pem: None,
    }
}

// ============================================================================
// SECTION: Suite Session Laws
// ============================================================================

#[test]
fn record_then_clear_leaves_uncommissioned() {
    let mut session = SuiteSession::default();
    session.record("aaaaaaaaaaaaaaaa", crypto("a"));
    assert!(session.is_commissioned());
    session.clear();
    assert!(!session.is_commissioned());
    assert!(session.zone_id().is_none());
    assert!(session.crypto().is_none());
    // Idempotent.
    session.clear();
    assert!(!session.is_commissioned());
}

#[test]
fn second_record_overwrites_the_first() {
    let mut session = SuiteSession::default();
    session.record("aaaaaaaaaaaaaaaa", crypto("a"));
    session.record("bbbbbbbbbbbbbbbb", crypto("b"));
    assert_eq!(session.zone_id(), Some("bbbbbbbbbbbbbbbb"));
    assert_eq!(session.conn_key().unwrap(), "main-bbbbbbbbbbbbbbbb");
    assert_eq!(session.crypto().unwrap().zone_ca_cert_pem, "cert-b");
}

// ============================================================================
// SECTION: Grace-Period Arithmetic
// ============================================================================

#[test]
fn grace_window_law_holds() {
    let mut grace = GracePeriodState::default();
    grace.set_grace_period(30);
    grace.advance_days(10);
    let status = grace.status();
    assert!(status.in_grace_period);
    assert!(!status.grace_period_expired);

    grace.advance_days(20);
    let status = grace.status();
    assert!(status.in_grace_period, "day 30 is the last day inside the window");

    grace.advance_days(1);
    let status = grace.status();
    assert!(!status.in_grace_period);
    assert!(status.grace_period_expired);
}

#[test]
fn zero_days_past_expiry_is_not_in_grace() {
    let mut grace = GracePeriodState::default();
    grace.set_grace_period(30);
    let status = grace.status();
    assert!(!status.in_grace_period);
    assert!(!status.grace_period_expired);
}

// ============================================================================
// SECTION: Pending Queue
// ============================================================================

#[test]
fn pending_queue_is_strict_fifo() {
    let mut state = ExecutionState::new();
    state.queue_command(QueuedCommand {
        action: "read".to_string(),
        params: ActionParams::new(),
    });
    state.queue_command(QueuedCommand {
        action: "write".to_string(),
        params: ActionParams::new(),
    });
    assert_eq!(state.pending_queue.len(), 2);
    assert_eq!(state.dequeue_command().unwrap().action, "read");
    assert_eq!(state.dequeue_command().unwrap().action, "write");
    assert!(state.dequeue_command().is_none());
}

// ============================================================================
// SECTION: Fault Coupling
// ============================================================================

#[test]
fn faults_force_fault_state_and_clearing_restores_standby() {
    let mut device = DeviceState::default();
    assert_eq!(device.operating_state, OperatingState::Standby);

    device.inject_fault(Fault {
        code: 7,
        message: "overtemp".to_string(),
        time: Timestamp::from_unix_millis(0),
    });
    device.inject_fault(Fault {
        code: 9,
        message: "ground fault".to_string(),
        time: Timestamp::from_unix_millis(1),
    });
    assert_eq!(device.operating_state, OperatingState::Fault);

    assert!(device.clear_fault(7));
    assert_eq!(device.operating_state, OperatingState::Fault, "one fault remains");

    assert!(device.clear_fault(9));
    assert_eq!(device.operating_state, OperatingState::Standby);
    assert!(device.faults.is_empty());
}

#[test]
fn clearing_unknown_fault_changes_nothing() {
    let mut device = DeviceState::default();
    device.inject_fault(Fault {
        code: 7,
        message: "overtemp".to_string(),
        time: Timestamp::from_unix_millis(0),
    });
    assert!(!device.clear_fault(42));
    assert_eq!(device.operating_state, OperatingState::Fault);
}

#[test]
fn factory_reset_restores_defaults() {
    let mut device = DeviceState::default();
    device.ev_connected = true;
    device.inject_fault(Fault {
        code: 1,
        message: "x".to_string(),
        time: Timestamp::from_unix_millis(0),
    });
    device.factory_reset();
    assert_eq!(device, DeviceState::default());
}

// ============================================================================
// SECTION: Variables
// ============================================================================

#[test]
fn flags_read_false_for_missing_or_non_boolean_vars() {
    let mut state = ExecutionState::new();
    assert!(!state.flag("device_in_zone"));
    state.set_var("device_in_zone", serde_json::Value::String("yes".to_string()));
    assert!(!state.flag("device_in_zone"));
    state.set_var("device_in_zone", serde_json::Value::Bool(true));
    assert!(state.flag("device_in_zone"));
}
