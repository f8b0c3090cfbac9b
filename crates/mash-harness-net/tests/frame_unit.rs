// crates/mash-harness-net/tests/frame_unit.rs
// ============================================================================
// Module: Framing Unit Tests
// Description: Length-prefix laws, oversize rejection, and short reads.
// Purpose: Validate the frame contract on both paths.
// ============================================================================

//! Framing tests: the on-wire byte law, oversize behavior on send and
//! receive, and truncated-stream handling.

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

use mash_harness_net::FrameError;
use mash_harness_net::read_frame;
use mash_harness_net::write_frame;
use mash_harness_net::write_length_only;

// ============================================================================
// SECTION: Write Laws
// ============================================================================

#[tokio::test]
async fn written_frame_is_prefix_plus_payload() {
    let mut wire: Vec<u8> = Vec::new();
    let payload = b"hello mash".to_vec();
    write_frame(&mut wire, &payload, 65_536).await.unwrap();

    assert_eq!(wire.len(), 4 + payload.len());
    let declared = u32::from_be_bytes([wire[0], wire[1], wire[2], wire[3]]);
    assert_eq!(declared as usize, payload.len());
    assert_eq!(&wire[4..], payload.as_slice());
}

#[tokio::test]
async fn empty_payload_writes_only_the_prefix() {
    let mut wire: Vec<u8> = Vec::new();
    write_frame(&mut wire, &[], 65_536).await.unwrap();
    assert_eq!(wire, vec![0, 0, 0, 0]);
}

#[tokio::test]
async fn oversize_send_is_rejected_locally_with_no_bytes_written() {
    let mut wire: Vec<u8> = Vec::new();
    let payload = vec![0u8; 17];
    let err = write_frame(&mut wire, &payload, 16).await.unwrap_err();
    assert!(matches!(
        err,
        FrameError::Oversize {
            declared: 17,
            max: 16,
        }
    ));
    assert!(wire.is_empty(), "local rejection must not touch the wire");
}

#[tokio::test]
async fn length_only_write_emits_exactly_four_bytes() {
    let mut wire: Vec<u8> = Vec::new();
    write_length_only(&mut wire, 65_537).await.unwrap();
    assert_eq!(wire, 65_537u32.to_be_bytes().to_vec());
}

// ============================================================================
// SECTION: Read Laws
// ============================================================================

#[tokio::test]
async fn round_trip_preserves_payload() {
    let mut wire: Vec<u8> = Vec::new();
    let payload = vec![7u8; 300];
    write_frame(&mut wire, &payload, 65_536).await.unwrap();

    let mut reader = wire.as_slice();
    let read = read_frame(&mut reader, 65_536).await.unwrap();
    assert_eq!(read, payload);
}

#[tokio::test]
async fn oversize_declaration_fails_the_read() {
    let mut wire: Vec<u8> = Vec::new();
    write_length_only(&mut wire, 65_537).await.unwrap();

    let mut reader = wire.as_slice();
    let err = read_frame(&mut reader, 65_536).await.unwrap_err();
    assert!(matches!(
        err,
        FrameError::Oversize {
            declared: 65_537,
            max: 65_536,
        }
    ));
}

#[tokio::test]
async fn frame_shorter_than_declared_reports_closed() {
    let mut wire: Vec<u8> = Vec::new();
    wire.extend_from_slice(&10u32.to_be_bytes());
    wire.extend_from_slice(b"abc");

    let mut reader = wire.as_slice();
    let err = read_frame(&mut reader, 65_536).await.unwrap_err();
    assert!(matches!(err, FrameError::Closed));
}

#[tokio::test]
async fn empty_stream_reports_closed() {
    let mut reader: &[u8] = &[];
    let err = read_frame(&mut reader, 65_536).await.unwrap_err();
    assert!(matches!(err, FrameError::Closed));
}

#[tokio::test]
async fn consecutive_frames_read_in_order() {
    let mut wire: Vec<u8> = Vec::new();
    write_frame(&mut wire, b"first", 64).await.unwrap();
    write_frame(&mut wire, b"second", 64).await.unwrap();

    let mut reader = wire.as_slice();
    assert_eq!(read_frame(&mut reader, 64).await.unwrap(), b"first");
    assert_eq!(read_frame(&mut reader, 64).await.unwrap(), b"second");
}
