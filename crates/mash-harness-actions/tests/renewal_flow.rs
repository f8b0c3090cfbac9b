// crates/mash-harness-actions/tests/renewal_flow.rs
// ============================================================================
// Module: Renewal Flow Tests
// Description: The four-step certificate renewal against the stub device.
// Purpose: Validate the chained flow and its intermediate state.
// ============================================================================

//! Renewal tests: the happy path through `full_renewal_flow`, the
//! intermediate state variables, and the install sequence monotonicity.

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

mod helpers;

use mash_harness_actions::StepRunner;
use mash_harness_core::ActionParams;
use mash_harness_core::HarnessConfig;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

fn params(entries: &[(&str, Value)]) -> ActionParams {
    entries.iter().map(|(key, value)| ((*key).to_string(), value.clone())).collect()
}

async fn commissioned_runner(stub: &helpers::StubDevice) -> StepRunner {
    let mut runner = StepRunner::new(HarnessConfig::for_target(stub.target())).unwrap();
    let output = runner
        .run_step("commission", &params(&[("offline", json!(true))]))
        .await
        .unwrap();
    assert_eq!(output.bool_value("commissioning_complete"), Some(true));
    let output = runner.run_step("connect", &ActionParams::new()).await.unwrap();
    assert_eq!(output.bool_value("connection_established"), Some(true));
    runner
}

// ============================================================================
// SECTION: Happy Path
// ============================================================================

#[tokio::test]
async fn full_renewal_flow_completes_with_success_status() {
    let stub = helpers::spawn_stub().await;
    let mut runner = commissioned_runner(&stub).await;

    let output = runner
        .run_step("full_renewal_flow", &params(&[("timeout_ms", json!(5_000))]))
        .await
        .unwrap();
    assert_eq!(output.bool_value("renewal_complete"), Some(true));
    assert_eq!(output.u64_value("status"), Some(0));
    assert_eq!(output.u64_value("active_sequence"), Some(1));

    // Intermediate state survives for expectation checks.
    let state = &runner.execution().state;
    assert!(state.get_var("renewal_nonce").is_some());
    assert!(state.get_var("pending_csr").is_some());
    assert_eq!(state.get_var("renewal_sequence").and_then(Value::as_u64), Some(1));

    runner.teardown().await;
}

#[tokio::test]
async fn renewal_steps_compose_individually() {
    let stub = helpers::spawn_stub().await;
    let mut runner = commissioned_runner(&stub).await;

    let output = runner.run_step("send_renewal_request", &ActionParams::new()).await.unwrap();
    assert_eq!(output.bool_value("renewal_request_sent"), Some(true));
    let nonce = runner
        .execution()
        .state
        .get_var("renewal_nonce")
        .and_then(Value::as_str)
        .unwrap()
        .to_string();
    assert_eq!(nonce.len(), 64, "default nonce is 32 bytes hex-encoded");

    let output = runner
        .run_step("receive_renewal_csr", &params(&[("timeout_ms", json!(5_000))]))
        .await
        .unwrap();
    assert_eq!(output.bool_value("csr_received"), Some(true));

    let output = runner.run_step("send_cert_install", &ActionParams::new()).await.unwrap();
    assert_eq!(output.bool_value("cert_installed"), Some(true));
    assert_eq!(output.u64_value("cert_sequence"), Some(1));

    let output = runner
        .run_step("receive_renewal_ack", &params(&[("timeout_ms", json!(5_000))]))
        .await
        .unwrap();
    assert_eq!(output.bool_value("renewal_complete"), Some(true));
    assert_eq!(output.u64_value("status"), Some(0));

    runner.teardown().await;
}

#[tokio::test]
async fn install_sequence_is_monotonic_across_flows() {
    let stub = helpers::spawn_stub().await;
    let mut runner = commissioned_runner(&stub).await;

    let output = runner
        .run_step("full_renewal_flow", &params(&[("timeout_ms", json!(5_000))]))
        .await
        .unwrap();
    assert_eq!(output.u64_value("active_sequence"), Some(1));

    let output = runner
        .run_step("full_renewal_flow", &params(&[("timeout_ms", json!(5_000))]))
        .await
        .unwrap();
    assert_eq!(output.u64_value("active_sequence"), Some(2));

    runner.teardown().await;
}

// ============================================================================
// SECTION: Failure Shapes
// ============================================================================

#[tokio::test]
async fn install_without_pending_csr_fails_as_step_domain_output() {
    let stub = helpers::spawn_stub().await;
    let mut runner = commissioned_runner(&stub).await;

    let output = runner.run_step("send_cert_install", &ActionParams::new()).await.unwrap();
    assert_eq!(output.bool_value("cert_installed"), Some(false));
    assert_eq!(output.str_value("error"), Some("no pending csr"));

    runner.teardown().await;
}

#[tokio::test]
async fn csr_wait_times_out_without_a_request() {
    let stub = helpers::spawn_stub().await;
    let mut runner = commissioned_runner(&stub).await;

    // No renewal request was sent, so no CSR will arrive.
    let output = runner
        .run_step("receive_renewal_csr", &params(&[("timeout_ms", json!(100))]))
        .await
        .unwrap();
    assert_eq!(output.bool_value("csr_received"), Some(false));
    assert_eq!(output.str_value("error"), Some("TIMEOUT"));
    assert!(output.contains("timeout_after"));

    runner.teardown().await;
}
