// crates/mash-harness-net/tests/proptest_codec.rs
// ============================================================================
// Module: Codec Property Tests
// Description: Round-trip laws for framing and integer-keyed encoding.
// Purpose: Validate the codec laws over generated inputs.
// ============================================================================

//! Property tests: every all-decimal-key map round-trips to integer CBOR
//! keys, string-only maps preserve string keys, and frames always obey the
//! length law.

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

use mash_harness_net::encode_int_keyed_map;
use mash_harness_net::marshal;
use mash_harness_net::unmarshal;
use proptest::prelude::*;
use serde_cbor::Value as CborValue;
use serde_json::Value as JsonValue;

// ============================================================================
// SECTION: Generators
// ============================================================================

/// Scalar JSON values that survive CBOR bridging unchanged.
fn scalar_value() -> impl Strategy<Value = JsonValue> {
    prop_oneof![
        any::<bool>().prop_map(JsonValue::Bool),
        any::<u32>().prop_map(|n| JsonValue::Number(u64::from(n).into())),
        "[a-z]{0,12}".prop_map(JsonValue::String),
    ]
}

// ============================================================================
// SECTION: Properties
// ============================================================================

proptest! {
    #[test]
    fn all_decimal_keys_round_trip_to_integer_keys(
        entries in proptest::collection::btree_map(0i64..100, scalar_value(), 0..8)
    ) {
        let input: BTreeMap<String, JsonValue> = entries
            .iter()
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect();
        let encoded = encode_int_keyed_map(&input).unwrap();
        let decoded = unmarshal(&marshal(&encoded).unwrap()).unwrap();
        let CborValue::Map(map) = decoded else {
            panic!("expected a map");
        };
        prop_assert_eq!(map.len(), input.len());
        for key in map.keys() {
            prop_assert!(matches!(key, CborValue::Integer(_)), "non-integer key survived");
        }
    }

    #[test]
    fn string_only_keys_round_trip_to_string_keys(
        entries in proptest::collection::btree_map("[a-z]{1,8}", scalar_value(), 0..8)
    ) {
        // Alphabetic keys can never parse as decimal integers.
        let encoded = encode_int_keyed_map(&entries).unwrap();
        let decoded = unmarshal(&marshal(&encoded).unwrap()).unwrap();
        let CborValue::Map(map) = decoded else {
            panic!("expected a map");
        };
        prop_assert_eq!(map.len(), entries.len());
        for key in map.keys() {
            prop_assert!(matches!(key, CborValue::Text(_)), "non-string key survived");
        }
    }

    #[test]
    fn frame_bytes_obey_the_length_law(payload in proptest::collection::vec(any::<u8>(), 0..2048)) {
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        rt.block_on(async {
            let mut wire: Vec<u8> = Vec::new();
            mash_harness_net::write_frame(&mut wire, &payload, 65_536).await.unwrap();
            assert_eq!(wire.len(), 4 + payload.len());
            let declared = u32::from_be_bytes([wire[0], wire[1], wire[2], wire[3]]);
            assert_eq!(declared as usize, payload.len());

            let mut reader = wire.as_slice();
            let read = mash_harness_net::read_frame(&mut reader, 65_536).await.unwrap();
            assert_eq!(read, payload);
        });
    }
}
