// crates/mash-harness-actions/tests/simulation.rs
// ============================================================================
// Module: Simulation Tests
// Description: Discovery precondition branches and device-state actions.
// Purpose: Validate the deterministic simulators behind browse and device
// steps.
// ============================================================================

//! Simulation tests: flag-selected browse results, the commissionable
//! stand-in service, QR payload round trips, and device-state mutation
//! through the action surface.

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

use std::time::Duration;
use std::time::Instant;

use mash_harness_actions::StepRunner;
use mash_harness_core::ActionParams;
use mash_harness_core::HarnessConfig;
use mash_harness_core::OperatingState;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

fn runner() -> StepRunner {
    StepRunner::new(HarnessConfig::for_target("localhost:5540")).unwrap()
}

fn params(entries: &[(&str, Value)]) -> ActionParams {
    entries.iter().map(|(key, value)| ((*key).to_string(), value.clone())).collect()
}

// ============================================================================
// SECTION: Browse Branches
// ============================================================================

#[tokio::test]
async fn browse_without_flags_reports_browse_timeout() {
    let mut runner = runner();
    let output = runner.run_step("browse_mdns", &ActionParams::new()).await.unwrap();
    assert_eq!(output.bool_value("discovery_started"), Some(true));
    assert_eq!(output.bool_value("device_found"), Some(false));
    assert_eq!(output.str_value("error"), Some("browse_timeout"));
}

#[tokio::test]
async fn simulated_branches_complete_without_real_io() {
    let mut runner = runner();
    runner.execution_mut().state.set_var("multiple_devices_commissioned", json!(true));

    let started = Instant::now();
    let output = runner.run_step("browse_mdns", &ActionParams::new()).await.unwrap();
    assert!(started.elapsed() < Duration::from_millis(500), "simulation must not block");

    assert_eq!(output.bool_value("device_found"), Some(true));
    assert_eq!(output.u64_value("services_found"), Some(3));
    assert_eq!(runner.execution().state.discovery.services.len(), 3);
    assert!(runner.execution().state.discovery.active);
}

#[tokio::test]
async fn no_devices_flag_yields_an_empty_deterministic_set() {
    let mut runner = runner();
    runner.execution_mut().state.set_var("no_devices_advertising", json!(true));
    let output = runner.run_step("browse_mdns", &ActionParams::new()).await.unwrap();
    assert_eq!(output.bool_value("device_found"), Some(false));
    assert_eq!(output.u64_value("services_found"), Some(0));
    assert!(!output.contains("error"), "empty set is not a browse timeout");
}

#[tokio::test]
async fn two_zone_flag_reports_two_instances_for_the_device() {
    let mut runner = runner();
    runner.execution_mut().state.set_var("device_in_two_zones", json!(true));
    let output = runner.run_step("browse_mdns", &ActionParams::new()).await.unwrap();
    assert_eq!(output.u64_value("instances_for_device"), Some(2));
    assert_eq!(output.bool_value("all_results_in_zone"), Some(false));
}

#[tokio::test]
async fn controller_flag_reports_controllers_found() {
    let mut runner = runner();
    runner.execution_mut().state.set_var("multiple_controllers_running", json!(true));
    let output = runner.run_step("browse_controllers", &ActionParams::new()).await.unwrap();
    assert_eq!(output.u64_value("controllers_found"), Some(2));
}

#[tokio::test]
async fn same_discriminator_flag_synthesizes_the_collision() {
    let mut runner = runner();
    runner.execution_mut().state.set_var("two_devices_same_discriminator", json!(true));
    runner.run_step("browse_mdns", &ActionParams::new()).await.unwrap();
    let services = &runner.execution().state.discovery.services;
    assert_eq!(services.len(), 2);
    assert_eq!(services[0].discriminator, services[1].discriminator);
}

// ============================================================================
// SECTION: Device Waits and TXT Records
// ============================================================================

#[tokio::test]
async fn wait_for_device_without_discriminator_synthesizes_the_stand_in() {
    let mut runner = runner();
    let output = runner.run_step("wait_for_device", &ActionParams::new()).await.unwrap();
    assert_eq!(output.bool_value("device_found"), Some(true));
    assert_eq!(output.str_value("instance_name"), Some("MASH-SIM-0000"));
    assert_eq!(output.bool_value("txt_valid"), Some(true));
    assert!(
        runner
            .execution()
            .state
            .discovery
            .services
            .iter()
            .any(|service| service.instance_name == "MASH-SIM-0000")
    );
}

#[tokio::test]
async fn wait_for_device_matches_a_browsed_discriminator() {
    let mut runner = runner();
    runner.execution_mut().state.set_var("two_devices_same_discriminator", json!(true));
    runner.run_step("browse_mdns", &ActionParams::new()).await.unwrap();

    let output = runner
        .run_step("wait_for_device", &params(&[("discriminator", json!(0x00aa))]))
        .await
        .unwrap();
    assert_eq!(output.bool_value("device_found"), Some(true));

    let output = runner
        .run_step("wait_for_device", &params(&[("discriminator", json!(0x0bbb))]))
        .await
        .unwrap();
    assert_eq!(output.bool_value("device_found"), Some(false));
}

// ============================================================================
// SECTION: QR Payloads
// ============================================================================

#[tokio::test]
async fn generated_qr_payloads_parse_round_trip() {
    let mut runner = runner();
    let output = runner.run_step("generate_qr_payload", &ActionParams::new()).await.unwrap();
    assert_eq!(output.bool_value("qr_present"), Some(true));
    let payload = output.str_value("qr_payload").unwrap().to_string();

    let output = runner
        .run_step("parse_qr_payload", &params(&[("payload", json!(payload))]))
        .await
        .unwrap();
    assert_eq!(output.bool_value("parse_success"), Some(true));
}

#[tokio::test]
async fn qr_payload_from_parts_echoes_the_parts() {
    let mut runner = runner();
    let output = runner
        .run_step(
            "generate_qr_payload",
            &params(&[("discriminator", json!(0x0aa)), ("setup_code", json!("12345678"))]),
        )
        .await
        .unwrap();
    assert_eq!(output.u64_value("discriminator"), Some(0x0aa));
    assert_eq!(output.str_value("setup_code"), Some("12345678"));
}

#[tokio::test]
async fn malformed_qr_payload_fails_as_step_domain_output() {
    let mut runner = runner();
    let output = runner
        .run_step("generate_qr_payload", &params(&[("payload", json!("NOPE:0001:0aa:123"))]))
        .await
        .unwrap();
    assert_eq!(output.bool_value("qr_present"), Some(false));
    assert!(output.contains("error"));
}

// ============================================================================
// SECTION: Device State
// ============================================================================

#[tokio::test]
async fn fault_injection_and_clearing_follow_the_invariant() {
    let mut runner = runner();

    let output = runner
        .run_step("trigger_fault", &params(&[("code", json!(7)), ("message", json!("overtemp"))]))
        .await
        .unwrap();
    assert_eq!(output.bool_value("fault_injected"), Some(true));
    assert_eq!(output.str_value("operating_state"), Some("FAULT"));
    assert_eq!(output.u64_value("fault_count"), Some(1));
    assert_eq!(output.bool_value("trigger_sent"), Some(false), "no connection is live");

    let output = runner.run_step("clear_fault", &params(&[("code", json!(7))])).await.unwrap();
    assert_eq!(output.bool_value("fault_cleared"), Some(true));
    assert_eq!(output.str_value("operating_state"), Some("STANDBY"));
    assert_eq!(output.u64_value("fault_count"), Some(0));
}

#[tokio::test]
async fn state_setters_mark_the_modified_flag() {
    let mut runner = runner();
    assert!(!runner.execution().state.device_state_modified);

    let output = runner
        .run_step("set_operating_state", &params(&[("state", json!("running"))]))
        .await
        .unwrap();
    assert_eq!(output.str_value("operating_state"), Some("RUNNING"));
    assert!(runner.execution().state.device_state_modified);
    assert_eq!(runner.execution().state.device.operating_state, OperatingState::Running);
}

#[tokio::test]
async fn factory_reset_restores_the_initial_simulation() {
    let mut runner = runner();
    runner
        .run_step("set_ev_connected", &params(&[("connected", json!(true))]))
        .await
        .unwrap();
    runner
        .run_step("trigger_fault", &params(&[("code", json!(1))]))
        .await
        .unwrap();

    let output = runner.run_step("factory_reset", &ActionParams::new()).await.unwrap();
    assert_eq!(output.bool_value("factory_reset"), Some(true));
    assert_eq!(output.str_value("operating_state"), Some("STANDBY"));
    let device = &runner.execution().state.device;
    assert!(!device.ev_connected);
    assert!(device.faults.is_empty());
}

#[tokio::test]
async fn unknown_state_label_aborts_the_step() {
    let mut runner = runner();
    let err = runner
        .run_step("set_operating_state", &params(&[("state", json!("SIDEWAYS"))]))
        .await
        .unwrap_err();
    assert!(matches!(err, mash_harness_core::ActionError::InvalidParameter { .. }));
}
