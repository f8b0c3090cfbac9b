// crates/mash-harness-net/tests/protocol_unit.rs
// ============================================================================
// Module: Wire Protocol Unit Tests
// Description: Message kinds, field keys, status codes, and family routing.
// Purpose: Validate encode/decode across every frame shape.
// ============================================================================

//! Protocol-layer tests: per-kind round trips, the integer field keys, the
//! status table, and separation of the renewal family from the general
//! decoder.

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

use std::collections::BTreeMap;

use mash_harness_net::Operation;
use mash_harness_net::RenewalMessage;
use mash_harness_net::StatusCode;
use mash_harness_net::WireError;
use mash_harness_net::WireMessage;
use mash_harness_net::decode;
use mash_harness_net::decode_renewal;
use mash_harness_net::encode;
use mash_harness_net::marshal;
use mash_harness_net::renewal_to_bytes;
use mash_harness_net::to_bytes;
use serde_cbor::Value as CborValue;

// ============================================================================
// SECTION: Round Trips
// ============================================================================

#[test]
fn request_round_trips_with_integer_keys() {
    let message = WireMessage::Request {
        message_id: 42,
        operation: Operation::Read,
        endpoint: 1,
        feature: 2,
        attribute: 3,
        value: Some(CborValue::Integer(7)),
    };
    let bytes = to_bytes(&message).unwrap();
    assert_eq!(decode(&bytes).unwrap(), message);

    // The encoded form is a map keyed by small integers.
    let CborValue::Map(map) = encode(&message) else {
        panic!("expected a map");
    };
    assert!(map.contains_key(&CborValue::Integer(0)), "kind tag");
    assert!(map.contains_key(&CborValue::Integer(1)), "message id");
    assert!(map.contains_key(&CborValue::Integer(2)), "operation");
}

#[test]
fn response_round_trips() {
    let message = WireMessage::Response {
        message_id: 42,
        status: StatusCode::Success,
        payload: Some(CborValue::Text("ok".to_string())),
    };
    let bytes = to_bytes(&message).unwrap();
    assert_eq!(decode(&bytes).unwrap(), message);
}

#[test]
fn control_frames_round_trip() {
    for message in [
        WireMessage::ControlPing {
            sequence: 1,
        },
        WireMessage::ControlPong {
            sequence: 2,
        },
        WireMessage::ControlClose {
            reason: "done".to_string(),
        },
        WireMessage::Notification {
            event_type: "state_changed".to_string(),
            payload: None,
        },
    ] {
        let bytes = to_bytes(&message).unwrap();
        assert_eq!(decode(&bytes).unwrap(), message);
    }
}

#[test]
fn trigger_round_trips_with_params() {
    let mut params = BTreeMap::new();
    params.insert("state".to_string(), CborValue::Text("FAULT".to_string()));
    let message = WireMessage::Trigger {
        name: "trigger_fault".to_string(),
        params,
    };
    let bytes = to_bytes(&message).unwrap();
    assert_eq!(decode(&bytes).unwrap(), message);
}

#[test]
fn renewal_family_round_trips() {
    for message in [
        RenewalMessage::Request {
            nonce: vec![9u8; 32],
        },
        RenewalMessage::Csr {
            csr_der: vec![1, 2, 3],
        },
        RenewalMessage::Install {
            cert_der: vec![4, 5, 6],
            sequence: 1,
        },
        RenewalMessage::Ack {
            status: StatusCode::Success,
            active_sequence: 1,
        },
    ] {
        let bytes = renewal_to_bytes(&message).unwrap();
        assert_eq!(decode_renewal(&bytes).unwrap(), message);
    }
}

// ============================================================================
// SECTION: Family Separation
// ============================================================================

#[test]
fn general_decoder_rejects_renewal_kinds() {
    let bytes = renewal_to_bytes(&RenewalMessage::Request {
        nonce: vec![0u8; 16],
    })
    .unwrap();
    let err = decode(&bytes).unwrap_err();
    assert!(matches!(err, WireError::WrongFamily(_)));
}

#[test]
fn renewal_decoder_rejects_general_kinds() {
    let bytes = to_bytes(&WireMessage::ControlPing {
        sequence: 1,
    })
    .unwrap();
    let err = decode_renewal(&bytes).unwrap_err();
    assert!(matches!(err, WireError::WrongFamily(_)));
}

// ============================================================================
// SECTION: Malformed Frames
// ============================================================================

#[test]
fn missing_kind_tag_is_rejected() {
    let mut map = BTreeMap::new();
    map.insert(CborValue::Integer(1), CborValue::Integer(5));
    let bytes = marshal(&CborValue::Map(map)).unwrap();
    assert!(matches!(decode(&bytes).unwrap_err(), WireError::MissingKind));
}

#[test]
fn unknown_kind_is_rejected() {
    let mut map = BTreeMap::new();
    map.insert(CborValue::Integer(0), CborValue::Integer(99));
    let bytes = marshal(&CborValue::Map(map)).unwrap();
    assert!(matches!(decode(&bytes).unwrap_err(), WireError::UnknownKind(99)));
}

#[test]
fn non_map_payload_is_rejected() {
    let bytes = marshal(&CborValue::Text("nope".to_string())).unwrap();
    assert!(matches!(decode(&bytes).unwrap_err(), WireError::NotAMap));
}

#[test]
fn response_missing_status_is_rejected() {
    let mut map = BTreeMap::new();
    map.insert(CborValue::Integer(0), CborValue::Integer(2));
    map.insert(CborValue::Integer(1), CborValue::Integer(7));
    let bytes = marshal(&CborValue::Map(map)).unwrap();
    assert!(matches!(decode(&bytes).unwrap_err(), WireError::MissingField("status")));
}

// ============================================================================
// SECTION: Status Table
// ============================================================================

#[test]
fn status_codes_are_stable() {
    assert_eq!(StatusCode::Success.code(), 0);
    assert_eq!(StatusCode::Success.as_str(), "SUCCESS");
    assert_eq!(StatusCode::Timeout.as_str(), "TIMEOUT");
    assert_eq!(StatusCode::MaxConnectionsExceeded.as_str(), "MAX_CONNECTIONS_EXCEEDED");
    for code in 0..=6u8 {
        let status = StatusCode::from_code(code).unwrap();
        assert_eq!(status.code(), code);
    }
    assert!(StatusCode::from_code(200).is_none());
}
