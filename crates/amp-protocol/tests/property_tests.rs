//! Property-based tests for the wire format and value codecs: round-trip
//! and arbitrary-fragmentation invariants that must hold for every valid
//! `AmpBox`, independent of any particular hand-picked example.

mod common;

use amp_protocol::amp_box::AmpBox;
use amp_protocol::codecs;
use amp_protocol::parser::{ParseOutcome, Parser};
use bytes::Bytes;
use proptest::prelude::*;

/// A key is 1-255 arbitrary bytes (ASCII-ish, to keep generated cases
/// readable in failure output, though the wire format allows any byte).
fn arb_key() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 1..=255)
}

/// A value is 0-2048 arbitrary bytes — capped well under the 65535 limit
/// so generated boxes stay cheap to shrink, while still exercising the
/// full key-length range.
fn arb_value() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=2048)
}

/// A box with 1-6 entries, keys forced unique the way a real box requires.
fn arb_box() -> impl Strategy<Value = AmpBox> {
    prop::collection::vec((arb_key(), arb_value()), 1..=6).prop_map(|pairs| {
        let mut box_ = AmpBox::new();
        for (key, value) in pairs {
            // later entries with a colliding key legitimately replace
            // earlier ones; that is exactly `put_bytes`'s documented
            // behavior, so no dedup step is needed here.
            let _ = box_.put_bytes(Bytes::from(key), Bytes::from(value));
        }
        box_
    })
}

proptest! {
    /// `deserialize(serialize(B)) == B` for any valid box.
    #[test]
    fn serialize_then_parse_round_trips(box_ in arb_box()) {
        let wire = box_.serialize().unwrap();
        let mut parser = Parser::new();
        let (consumed, outcome) = parser.feed(&wire).unwrap();
        prop_assert_eq!(consumed, wire.len());
        prop_assert_eq!(outcome, ParseOutcome::BoxReady);
        let parsed = parser.take_box();
        prop_assert_eq!(parsed, box_);
    }

    /// Feeding a serialized box through the parser one byte at a time
    /// always reconstructs the exact same box, regardless of content.
    #[test]
    fn byte_at_a_time_fragmentation_reconstructs_box(box_ in arb_box()) {
        let wire = box_.serialize().unwrap();
        let mut parser = Parser::new();
        let mut got = None;

        for byte in wire.iter() {
            let (_, outcome) = parser.feed(std::slice::from_ref(byte)).unwrap();
            if outcome == ParseOutcome::BoxReady {
                got = Some(parser.take_box());
                break;
            }
        }

        prop_assert_eq!(got, Some(box_));
    }

    /// Any chunking scheme (not just 1-byte) reconstructs the same box.
    #[test]
    fn arbitrary_chunking_reconstructs_box(box_ in arb_box()) {
        let wire = box_.serialize().unwrap();
        let chunks = common::uneven_chunks(&wire);
        let mut parser = Parser::new();
        let mut got = None;

        for chunk in chunks {
            let (_, outcome) = parser.feed(chunk).unwrap();
            if outcome == ParseOutcome::BoxReady {
                got = Some(parser.take_box());
                break;
            }
        }

        prop_assert_eq!(got, Some(box_));
    }

    /// `get_long_long(put_long_long(n)) == n` for any `i64`.
    #[test]
    fn long_long_round_trips(n in any::<i64>()) {
        let mut box_ = AmpBox::new();
        codecs::put_long_long(&mut box_, "n", n).unwrap();
        prop_assert_eq!(codecs::get_long_long(&box_, "n").unwrap(), n);
    }

    /// `get_int(put_int(n)) == n` for any `i32`.
    #[test]
    fn int_round_trips(n in any::<i32>()) {
        let mut box_ = AmpBox::new();
        codecs::put_int(&mut box_, "n", n).unwrap();
        prop_assert_eq!(codecs::get_int(&box_, "n").unwrap(), n);
    }

    /// `get_uint(put_uint(n)) == n` for any `u32`.
    #[test]
    fn uint_round_trips(n in any::<u32>()) {
        let mut box_ = AmpBox::new();
        codecs::put_uint(&mut box_, "n", n).unwrap();
        prop_assert_eq!(codecs::get_uint(&box_, "n").unwrap(), n);
    }

    /// `get_bool(put_bool(b)) == b` for both booleans.
    #[test]
    fn bool_round_trips(b in any::<bool>()) {
        let mut box_ = AmpBox::new();
        codecs::put_bool(&mut box_, "b", b).unwrap();
        prop_assert_eq!(codecs::get_bool(&box_, "b").unwrap(), b);
    }

    /// Any finite `f64` round-trips through the 17-digit fixed-point
    /// encoding to within its own representable precision.
    #[test]
    fn finite_double_round_trips(n in any::<f64>().prop_filter("finite only", |n| n.is_finite())) {
        let mut box_ = AmpBox::new();
        codecs::put_double(&mut box_, "x", n).unwrap();
        let decoded = codecs::get_double(&box_, "x").unwrap();
        let scale = n.abs().max(1.0);
        prop_assert!((decoded - n).abs() <= scale * 1e-9);
    }

    /// `put_bytes` followed by `get_bytes` always returns a view equal to
    /// the input, for any byte string within the wire's value-length limit.
    #[test]
    fn put_bytes_then_get_bytes_is_identity(value in arb_value()) {
        let mut box_ = AmpBox::new();
        codecs::put_bytes(&mut box_, "k", Bytes::from(value.clone())).unwrap();
        prop_assert_eq!(codecs::get_bytes(&box_, "k").unwrap(), value.as_slice());
    }

    /// Inserting an existing key replaces the value without changing the
    /// box's cardinality.
    #[test]
    fn re_insert_replaces_without_changing_count(key in arb_key(), v1 in arb_value(), v2 in arb_value()) {
        let mut box_ = AmpBox::new();
        box_.put_bytes(Bytes::from(key.clone()), Bytes::from(v1)).unwrap();
        let count_before = box_.num_keys();
        box_.put_bytes(Bytes::from(key.clone()), Bytes::from(v2.clone())).unwrap();
        prop_assert_eq!(box_.num_keys(), count_before);
        prop_assert_eq!(box_.get_bytes(&key).unwrap(), v2.as_slice());
    }
}
