// crates/mash-harness-actions/tests/wire_flows.rs
// ============================================================================
// Module: Wire Flow Tests
// Description: Reads, writes, correlation edge cases, and oversize frames.
// Purpose: Validate correlated I/O semantics against the stub device.
// ============================================================================

//! Wire tests: attribute round trips, the reserved message-id refusal, the
//! simulated no-response shape, concurrent reads, and the oversize-frame
//! close scenario.

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

async fn connected_runner(stub: &helpers::StubDevice) -> StepRunner {
    let mut runner = StepRunner::new(HarnessConfig::for_target(stub.target())).unwrap();
    let output = runner.run_step("connect", &ActionParams::new()).await.unwrap();
    assert_eq!(output.bool_value("connection_established"), Some(true));
    runner
}

// ============================================================================
// SECTION: Attribute Round Trips
// ============================================================================

#[tokio::test]
async fn read_attribute_returns_the_stub_payload() {
    let stub = helpers::spawn_stub().await;
    let mut runner = connected_runner(&stub).await;

    let output = runner
        .run_step(
            "read_attribute",
            &params(&[
                ("feature", json!("electrical")),
                ("attribute", json!("power")),
                ("timeout_ms", json!(5_000)),
            ]),
        )
        .await
        .unwrap();
    assert_eq!(output.bool_value("read_success"), Some(true));
    assert_eq!(output.bool_value("response_received"), Some(true));
    assert_eq!(output.u64_value("response_message_id"), Some(1));
    assert_eq!(output.u64_value("value"), Some(42));

    runner.teardown().await;
}

#[tokio::test]
async fn write_attribute_echoes_the_written_value() {
    let stub = helpers::spawn_stub().await;
    let mut runner = connected_runner(&stub).await;

    let output = runner
        .run_step(
            "write_attribute",
            &params(&[
                ("feature", json!("control")),
                ("attribute", json!("setpoint")),
                ("value", json!(1500)),
                ("timeout_ms", json!(5_000)),
            ]),
        )
        .await
        .unwrap();
    assert_eq!(output.bool_value("write_success"), Some(true));
    assert_eq!(output.u64_value("value"), Some(1500));

    runner.teardown().await;
}

#[tokio::test]
async fn message_ids_increase_monotonically_across_steps() {
    let stub = helpers::spawn_stub().await;
    let mut runner = connected_runner(&stub).await;

    for expected in 1..=3u64 {
        let output = runner
            .run_step(
                "read_attribute",
                &params(&[
                    ("feature", json!("electrical")),
                    ("attribute", json!("energy")),
                    ("timeout_ms", json!(5_000)),
                ]),
            )
            .await
            .unwrap();
        assert_eq!(output.u64_value("response_message_id"), Some(expected));
    }

    runner.teardown().await;
}

// ============================================================================
// SECTION: Correlation Edge Cases
// ============================================================================

#[tokio::test]
async fn message_id_zero_is_refused_locally() {
    let stub = helpers::spawn_stub().await;
    let mut runner = connected_runner(&stub).await;

    let output = runner
        .run_step(
            "read_attribute",
            &params(&[
                ("feature", json!("electrical")),
                ("attribute", json!("power")),
                ("message_id", json!(0)),
            ]),
        )
        .await
        .unwrap();
    assert_eq!(output.bool_value("connection_error"), Some(true));
    assert_eq!(output.bool_value("read_success"), Some(false));

    // The channel survives the refusal: a normal read still works.
    let output = runner
        .run_step(
            "read_attribute",
            &params(&[
                ("feature", json!("electrical")),
                ("attribute", json!("power")),
                ("timeout_ms", json!(5_000)),
            ]),
        )
        .await
        .unwrap();
    assert_eq!(output.bool_value("read_success"), Some(true));

    runner.teardown().await;
}

#[tokio::test]
async fn simulated_no_response_yields_the_timeout_shape() {
    let stub = helpers::spawn_stub().await;
    let mut runner = connected_runner(&stub).await;

    let output = runner
        .run_step(
            "read_attribute",
            &params(&[
                ("feature", json!("electrical")),
                ("attribute", json!("power")),
                ("simulate_no_response", json!(true)),
                ("timeout_ms", json!(50)),
            ]),
        )
        .await
        .unwrap();
    assert_eq!(output.bool_value("read_success"), Some(false));
    assert_eq!(output.str_value("error"), Some("TIMEOUT"));
    assert!(output.contains("timeout_after"));

    runner.teardown().await;
}

#[tokio::test]
async fn concurrent_reads_gather_every_response() {
    let stub = helpers::spawn_stub().await;
    let mut runner = connected_runner(&stub).await;

    let output = runner
        .run_step(
            "concurrent_reads",
            &params(&[
                ("count", json!(5)),
                ("feature", json!("electrical")),
                ("attribute", json!("power")),
                ("timeout_ms", json!(5_000)),
            ]),
        )
        .await
        .unwrap();
    assert_eq!(output.u64_value("responses_received"), Some(5));
    assert_eq!(output.bool_value("all_ids_matched"), Some(true));
    assert_eq!(output.bool_value("read_success"), Some(true));

    runner.teardown().await;
}

// ============================================================================
// SECTION: Oversize Frames
// ============================================================================

#[tokio::test]
async fn oversize_length_override_closes_the_connection() {
    let stub = helpers::spawn_stub().await;
    let mut runner = connected_runner(&stub).await;

    let output = runner
        .run_step(
            "send_raw",
            &params(&[("length_override", json!(65_537)), ("timeout_ms", json!(5_000))]),
        )
        .await
        .unwrap();
    assert_eq!(output.bool_value("connection_closed"), Some(true));

    runner.teardown().await;
}

#[tokio::test]
async fn oversize_payload_is_rejected_locally_and_keeps_the_channel() {
    let stub = helpers::spawn_stub().await;
    let mut runner = connected_runner(&stub).await;

    let oversize_hex = "00".repeat(65_537);
    let output = runner
        .run_step("send_raw", &params(&[("payload_hex", json!(oversize_hex))]))
        .await
        .unwrap();
    assert_eq!(output.bool_value("raw_sent"), Some(false));
    assert!(output.str_value("error").unwrap().contains("frame too large"));

    // Local rejection leaves the channel usable.
    let output = runner
        .run_step("send_ping", &params(&[("timeout_ms", json!(5_000))]))
        .await
        .unwrap();
    assert_eq!(output.bool_value("pong_received"), Some(true));

    runner.teardown().await;
}

#[tokio::test]
async fn int_keyed_payload_sends_as_a_frame() {
    let stub = helpers::spawn_stub().await;
    let mut runner = connected_runner(&stub).await;

    let output = runner
        .run_step(
            "send_raw",
            &params(&[("payload", json!({"1": 5, "2": "hello"}))]),
        )
        .await
        .unwrap();
    assert_eq!(output.bool_value("raw_sent"), Some(true));

    runner.teardown().await;
}
