// crates/mash-harness-net/tests/correlator_unit.rs
// ============================================================================
// Module: Correlator Unit Tests
// Description: Waiter matching by id, duplicate discard, and routing.
// Purpose: Validate correlation semantics independent of sockets.
// ============================================================================

//! Correlator tests: responses match by message-id rather than position,
//! duplicates are counted and discarded, and the inbound router sorts
//! frames into the right queues.

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

use mash_harness_net::Correlator;
use mash_harness_net::RenewalMessage;
use mash_harness_net::StatusCode;
use mash_harness_net::WireMessage;
use mash_harness_net::correlator::dispatch_inbound;
use mash_harness_net::correlator::inbound_channel;
use mash_harness_net::protocol::DecodedFrame;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

fn response(message_id: u32) -> WireMessage {
    WireMessage::Response {
        message_id,
        status: StatusCode::Success,
        payload: None,
    }
}

// ============================================================================
// SECTION: Matching
// ============================================================================

#[tokio::test]
async fn responses_match_waiters_by_id_not_position() {
    let correlator = Correlator::new();
    let first = correlator.register(1);
    let second = correlator.register(2);

    // Complete out of order.
    assert!(correlator.complete(2, response(2)));
    assert!(correlator.complete(1, response(1)));

    let WireMessage::Response {
        message_id, ..
    } = first.await.unwrap()
    else {
        panic!("expected a response");
    };
    assert_eq!(message_id, 1);

    let WireMessage::Response {
        message_id, ..
    } = second.await.unwrap()
    else {
        panic!("expected a response");
    };
    assert_eq!(message_id, 2);
}

#[tokio::test]
async fn duplicate_responses_are_discarded_and_counted() {
    let correlator = Correlator::new();
    let waiter = correlator.register(5);
    assert!(correlator.complete(5, response(5)));
    assert!(!correlator.complete(5, response(5)), "second response must not match");
    assert_eq!(correlator.duplicates_discarded(), 1);
    drop(waiter);
}

#[tokio::test]
async fn cancelled_waiters_leave_no_residue() {
    let correlator = Correlator::new();
    let waiter = correlator.register(9);
    correlator.cancel(9);
    assert_eq!(correlator.pending_len(), 0);
    assert!(!correlator.complete(9, response(9)));
    drop(waiter);
}

#[tokio::test]
async fn fail_all_wakes_outstanding_waiters_with_closed_channels() {
    let correlator = Correlator::new();
    let waiter = correlator.register(3);
    correlator.fail_all();
    assert!(correlator.is_closed());
    assert!(waiter.await.is_err(), "waiter must observe a closed channel");
}

// ============================================================================
// SECTION: Inbound Routing
// ============================================================================

#[tokio::test]
async fn router_sorts_frames_into_queues() {
    let correlator = Correlator::new();
    let (senders, mut queues) = inbound_channel();

    let keep = dispatch_inbound(
        &correlator,
        &senders,
        DecodedFrame::Wire(WireMessage::Notification {
            event_type: "state_changed".to_string(),
            payload: None,
        }),
    );
    assert!(keep);

    let keep = dispatch_inbound(
        &correlator,
        &senders,
        DecodedFrame::Wire(WireMessage::ControlPong {
            sequence: 4,
        }),
    );
    assert!(keep);

    let keep = dispatch_inbound(
        &correlator,
        &senders,
        DecodedFrame::Renewal(RenewalMessage::Ack {
            status: StatusCode::Success,
            active_sequence: 1,
        }),
    );
    assert!(keep);

    assert!(matches!(
        queues.notifications.try_recv().unwrap(),
        WireMessage::Notification { .. }
    ));
    assert_eq!(queues.pongs.try_recv().unwrap(), 4);
    assert!(matches!(queues.renewals.try_recv().unwrap(), RenewalMessage::Ack { .. }));
}

#[tokio::test]
async fn close_frame_stops_the_reader_and_fails_waiters() {
    let correlator = Correlator::new();
    let (senders, mut queues) = inbound_channel();
    let waiter = correlator.register(1);

    let keep = dispatch_inbound(
        &correlator,
        &senders,
        DecodedFrame::Wire(WireMessage::ControlClose {
            reason: "shutting down".to_string(),
        }),
    );
    assert!(!keep, "close must stop the reader loop");
    assert!(correlator.is_closed());
    assert!(waiter.await.is_err());
    assert!(matches!(
        queues.notifications.try_recv().unwrap(),
        WireMessage::ControlClose { .. }
    ));
}

#[tokio::test]
async fn notifications_deliver_in_arrival_order() {
    let correlator = Correlator::new();
    let (senders, mut queues) = inbound_channel();
    for index in 0..3u32 {
        let _ = dispatch_inbound(
            &correlator,
            &senders,
            DecodedFrame::Wire(WireMessage::Notification {
                event_type: format!("event-{index}"),
                payload: None,
            }),
        );
    }
    for index in 0..3u32 {
        let WireMessage::Notification {
            event_type, ..
        } = queues.notifications.try_recv().unwrap()
        else {
            panic!("expected a notification");
        };
        assert_eq!(event_type, format!("event-{index}"));
    }
}
