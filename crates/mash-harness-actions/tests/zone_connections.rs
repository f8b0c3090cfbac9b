// crates/mash-harness-actions/tests/zone_connections.rs
// ============================================================================
// Module: Zone Connection Tests
// Description: Zone cap enforcement and disconnect idempotence.
// Purpose: Validate zone-scoped connection pooling against the stub device.
// ============================================================================

//! Zone connection tests: the five-connection cap, the distinct error code
//! for plain dial failures, and idempotent zone disconnects.

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

/// Returns a port with nothing listening on it.
async fn dead_port() -> u16 {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

// ============================================================================
// SECTION: Cap Enforcement
// ============================================================================

#[tokio::test]
async fn sixth_zone_connection_hits_the_cap() {
    let stub = helpers::spawn_stub().await;
    let mut runner = StepRunner::new(HarnessConfig::for_target(stub.target())).unwrap();

    for index in 0..5 {
        let output = runner
            .run_step(
                "connect_as_zone",
                &params(&[("zone_id", json!(format!("zone{index}")))]),
            )
            .await
            .unwrap();
        assert_eq!(output.bool_value("connection_established"), Some(true), "zone{index}");
        assert_eq!(output.str_value("state"), Some("OPERATIONAL"));
    }

    let output = runner
        .run_step("connect_as_zone", &params(&[("zone_id", json!("zone5"))]))
        .await
        .unwrap();
    assert_eq!(output.bool_value("connection_established"), Some(false));
    assert_eq!(output.str_value("error_code"), Some("MAX_CONNECTIONS_EXCEEDED"));
    assert_eq!(output.str_value("zone_id"), Some("zone5"));

    runner.teardown().await;
}

#[tokio::test]
async fn dial_failure_uses_a_different_error_code_than_the_cap() {
    let stub = helpers::spawn_stub().await;
    let mut runner = StepRunner::new(HarnessConfig::for_target(stub.target())).unwrap();

    let output = runner
        .run_step("connect_as_zone", &params(&[("zone_id", json!("zone0"))]))
        .await
        .unwrap();
    assert_eq!(output.bool_value("connection_established"), Some(true));

    let port = dead_port().await;
    let output = runner
        .run_step(
            "connect_as_zone",
            &params(&[
                ("zone_id", json!("zone1")),
                ("host", json!("127.0.0.1")),
                ("port", json!(port)),
            ]),
        )
        .await
        .unwrap();
    assert_eq!(output.bool_value("connection_established"), Some(false));
    let code = output.str_value("error_code").unwrap();
    assert_ne!(code, "MAX_CONNECTIONS_EXCEEDED");
    assert_eq!(code, "CONNECTION_FAILED");
    assert!(output.str_value("target").unwrap().ends_with(&port.to_string()));

    runner.teardown().await;
}

// ============================================================================
// SECTION: Disconnect Idempotence
// ============================================================================

#[tokio::test]
async fn disconnect_zone_is_idempotent() {
    let stub = helpers::spawn_stub().await;
    let mut runner = StepRunner::new(HarnessConfig::for_target(stub.target())).unwrap();

    runner
        .run_step("connect_as_zone", &params(&[("zone_id", json!("zoneA"))]))
        .await
        .unwrap();

    let output = runner
        .run_step("disconnect_zone", &params(&[("zone_id", json!("zoneA"))]))
        .await
        .unwrap();
    assert_eq!(output.bool_value("zone_disconnected"), Some(true));

    let output = runner
        .run_step("disconnect_zone", &params(&[("zone_id", json!("zoneA"))]))
        .await
        .unwrap();
    assert_eq!(output.bool_value("zone_disconnected"), Some(false));

    runner.teardown().await;
}

// ============================================================================
// SECTION: Reconnect Monitoring
// ============================================================================

#[tokio::test]
async fn monitor_and_cancel_are_idempotent() {
    let mut runner = StepRunner::new(HarnessConfig::for_target("localhost:5540")).unwrap();

    for _ in 0..2 {
        let output = runner.run_step("monitor_reconnect", &ActionParams::new()).await.unwrap();
        assert_eq!(output.bool_value("monitoring_active"), Some(true));
        assert!(runner.execution().manager.backoff().is_some());
        assert!(runner.execution().manager.backoff().unwrap().monitoring);
    }

    for _ in 0..2 {
        let output = runner.run_step("cancel_reconnect", &ActionParams::new()).await.unwrap();
        assert_eq!(output.bool_value("monitoring_active"), Some(false));
        assert!(runner.execution().manager.backoff().is_none());
    }
}

#[tokio::test]
async fn reconnect_without_suite_zone_reports_no_suite_zone() {
    let mut runner = StepRunner::new(HarnessConfig::for_target("localhost:5540")).unwrap();
    let output = runner.run_step("reconnect_to_zone", &ActionParams::new()).await.unwrap();
    assert_eq!(output.bool_value("connection_established"), Some(false));
    assert_eq!(output.str_value("error"), Some("no suite zone"));
}
