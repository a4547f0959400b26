use alloc::{boxed::Box, vec, vec::Vec};

use assert_matches::assert_matches;
use proptest::prelude::*;
use rstest::rstest;

use super::*;
use crate::{
    DEFAULT_SIZE_LIMIT, Guard, InputProtocol, WireType,
    test_utils::{Address, FixtureWriter, Profile},
};

// HELPERS
// ================================================================================================

/// Encodes a record holding a profile id and an opaque field padding the encoding to exactly
/// `len` bytes.
fn padded_record(id: i64, len: usize) -> Vec<u8> {
    // id field (11 bytes), padding field header and length (7 bytes), stop marker (1 byte)
    const OVERHEAD: usize = 19;
    assert!(len >= OVERHEAD);

    let mut writer = FixtureWriter::new();
    writer.field(WireType::I64, 1).i64(id);
    writer.field(WireType::String, 99).binary(&vec![0xab; len - OVERHEAD]);
    writer.stop();
    let bytes = writer.into_bytes();
    assert_eq!(bytes.len(), len);
    bytes
}

/// A record which fails the test if it is ever read.
#[derive(Default)]
struct Untouched;

impl Record for Untouched {
    fn read<P: InputProtocol>(&mut self, _input: &mut P) -> Result<(), DecodeError> {
        panic!("record must not be read");
    }
}

// CONSTRUCTION TESTS
// ================================================================================================

#[test]
fn new_uses_default_config() {
    let decoder = GuardedDecoder::new();
    assert_eq!(decoder.config(), &DecoderConfig::default());
    assert_eq!(decoder.size_limit(), DEFAULT_SIZE_LIMIT);
    assert_eq!(decoder.growth_count(), 0);

    let decoder = GuardedDecoder::default();
    assert_eq!(decoder.size_limit(), DEFAULT_SIZE_LIMIT);
}

#[test]
fn with_config() {
    let config = DecoderConfig::default().with_initial_size_limit(256).with_max_depth(3);
    let decoder = GuardedDecoder::with_config(config.clone());
    assert_eq!(decoder.config(), &config);
    assert_eq!(decoder.size_limit(), 256);
}

// DECODING TESTS
// ================================================================================================

#[test]
fn deserialize_whole_buffer() {
    let profile = Profile::sample(7, 5);
    let bytes = profile.encode();

    let mut decoder = GuardedDecoder::new();
    let mut decoded = Profile::default();
    decoder.deserialize_all(&mut decoded, &bytes).unwrap();
    assert_eq!(decoded, profile);

    let decoded: Profile = decoder.decode(&bytes, 0, bytes.len()).unwrap();
    assert_eq!(decoded, profile);
}

#[test]
fn deserialize_window_of_larger_buffer() {
    let profile = Profile::sample(3, 2);
    let encoded = profile.encode();

    let mut block = vec![0xff; 10];
    block.extend_from_slice(&encoded);
    block.extend_from_slice(&[0xee; 10]);

    let mut decoder = GuardedDecoder::new();
    let decoded: Profile = decoder.decode(&block, 10, encoded.len()).unwrap();
    assert_eq!(decoded, profile);
}

#[test]
fn unknown_fields_are_skipped() {
    let profile = Profile::sample(11, 3);

    let mut writer = FixtureWriter::new();
    writer.field(WireType::Map, 50).map_header(WireType::String, WireType::List, 1);
    writer.string("k").list_header(WireType::Double, 2).double(1.0).double(2.0);
    profile.write_fields(&mut writer);
    writer.field(WireType::Struct, 51);
    writer.field(WireType::Set, 1).list_header(WireType::I16, 2).i16(1).i16(2);
    writer.field(WireType::Bool, 2).bool(true);
    writer.stop();
    // a known field id with an unexpected type is skipped too
    writer.field(WireType::I32, 2).i32(99);
    writer.stop();
    let bytes = writer.into_bytes();

    let mut decoder = GuardedDecoder::new();
    let decoded: Profile = decoder.decode(&bytes, 0, bytes.len()).unwrap();
    assert_eq!(decoded, profile);
}

#[test]
fn missing_required_field_is_invalid() {
    let mut writer = FixtureWriter::new();
    writer.field(WireType::String, 2).string("nameless").stop();
    let bytes = writer.into_bytes();

    let mut decoder = GuardedDecoder::new();
    assert_matches!(
        decoder.decode::<Profile>(&bytes, 0, bytes.len()),
        Err(DecodeError::InvalidValue(_))
    );
}

#[test]
fn truncated_records_underrun() {
    let bytes = Profile::sample(5, 4).encode();
    let mut decoder = GuardedDecoder::new();

    for len in 0..bytes.len() {
        let mut profile = Profile::default();
        assert_matches!(
            decoder.deserialize(&mut profile, &bytes, 0, len),
            Err(DecodeError::Underrun { .. }),
            "prefix of {len} bytes"
        );
    }
}

#[test]
fn malformed_field_tag() {
    let mut bytes = Profile::sample(1, 1).encode();
    bytes[0] = 0x07;

    let mut decoder = GuardedDecoder::new();
    assert_matches!(
        decoder.decode::<Profile>(&bytes, 0, bytes.len()),
        Err(DecodeError::MalformedTag { tag: 0x07, context: crate::TagContext::Field })
    );
}

#[test]
fn nesting_depth_follows_config() {
    let bytes = Profile::sample(1, 1).encode();

    // the profile itself is at depth 1; its address and containers at depth 2
    let mut decoder = GuardedDecoder::with_config(DecoderConfig::default().with_max_depth(1));
    assert_matches!(
        decoder.decode::<Profile>(&bytes, 0, bytes.len()),
        Err(DecodeError::DepthExceeded(1))
    );

    let mut decoder = GuardedDecoder::with_config(DecoderConfig::default().with_max_depth(2));
    decoder.decode::<Profile>(&bytes, 0, bytes.len()).unwrap();
}

#[test]
fn nested_record_decodes_on_its_own() {
    let mut writer = FixtureWriter::new();
    writer.field(WireType::String, 1).string("Porto").field(WireType::I32, 2).i32(4000).stop();
    let bytes = writer.into_bytes();

    let mut decoder = GuardedDecoder::new();
    let address: Address = decoder.decode(&bytes, 0, bytes.len()).unwrap();
    assert_eq!(address, Address { city: "Porto".into(), zip: 4000 });
}

// BOUNDS TESTS
// ================================================================================================

#[test]
fn boxed_record_decodes_in_place() {
    let profile = Profile::sample(5, 2);
    let bytes = profile.encode();

    let mut decoder = GuardedDecoder::new();
    let mut boxed = Box::new(Profile::default());
    decoder.deserialize_all(&mut boxed, &bytes).unwrap();
    assert_eq!(*boxed, profile);

    let decoded: Box<Profile> = decoder.decode(&bytes, 0, bytes.len()).unwrap();
    assert_eq!(*decoded, profile);
}

#[cfg(feature = "serde")]
#[test]
fn deserialized_config_decodes_records() {
    use serde::{
        Deserialize,
        de::value::{Error, MapDeserializer},
    };

    let fields = [("initial_size_limit", 1024_usize), ("max_depth", 0)];
    let config =
        DecoderConfig::deserialize(MapDeserializer::<_, Error>::new(fields.into_iter())).unwrap();

    // the record itself is one level deep, so the clamped depth still admits it
    let mut writer = FixtureWriter::new();
    writer.field(WireType::String, 1).string("Porto").field(WireType::I32, 2).i32(4000).stop();
    let bytes = writer.into_bytes();
    let address: Address =
        GuardedDecoder::with_config(config).decode(&bytes, 0, bytes.len()).unwrap();
    assert_eq!(address.zip, 4000);
}

#[rstest]
#[case::offset_past_end(17, 0)]
#[case::window_past_end(8, 9)]
#[case::len_past_end(0, 17)]
#[case::overflowing_window(usize::MAX, 1)]
#[case::overflowing_len(1, usize::MAX)]
fn out_of_range_window_is_rejected(#[case] offset: usize, #[case] len: usize) {
    let bytes = [0u8; 16];
    let config = DecoderConfig::default().with_initial_size_limit(4);
    let mut decoder = GuardedDecoder::with_config(config);

    assert_matches!(
        decoder.deserialize(&mut Untouched, &bytes, offset, len),
        Err(DecodeError::InvalidRange { offset: o, len: l, buffer_len: 16 })
            if o == offset && l == len
    );

    // a rejected window never grows the limit
    assert_eq!(decoder.size_limit(), 4);
    assert_eq!(decoder.growth_count(), 0);
}

#[test]
fn empty_window_underruns() {
    let bytes = [0u8; 4];
    let mut decoder = GuardedDecoder::new();
    assert_matches!(
        decoder.decode::<Profile>(&bytes, 4, 0),
        Err(DecodeError::Underrun { requested: 1, remaining: 0 })
    );
}

#[test]
fn only_caller_errors_are_not_corruption() {
    let bytes = [10u8, 0, 1, 0];
    let mut decoder = GuardedDecoder::new();

    let err = decoder.decode::<Profile>(&bytes, 2, 4).unwrap_err();
    assert_matches!(err, DecodeError::InvalidRange { .. });
    assert!(!err.is_corruption());

    let err = decoder.decode::<Profile>(&bytes, 0, bytes.len()).unwrap_err();
    assert_matches!(err, DecodeError::Underrun { .. });
    assert!(err.is_corruption());

    assert!(DecodeError::invalid_value("missing id").is_corruption());
}

// GUARD TESTS
// ================================================================================================

#[test]
fn implausible_container_size_is_rejected() {
    // a profile whose tag list claims a hundred million entries
    let mut writer = FixtureWriter::new();
    writer.field(WireType::I64, 1).i64(1);
    writer.field(WireType::List, 4).list_header(WireType::String, 100_000_000);
    writer.string("only one").stop();
    let bytes = writer.into_bytes();

    let mut decoder = GuardedDecoder::new();
    assert_matches!(
        decoder.decode::<Profile>(&bytes, 0, bytes.len()),
        Err(DecodeError::GuardExceeded {
            guard: Guard::ContainerSize,
            requested: 100_000_000,
            limit: DEFAULT_SIZE_LIMIT
        })
    );

    // a string claiming 2 GiB is rejected just the same
    let mut writer = FixtureWriter::new();
    writer.field(WireType::I64, 1).i64(1);
    writer.field(WireType::String, 2).i32(i32::MAX).raw(b"short");
    let bytes = writer.into_bytes();

    assert_matches!(
        decoder.decode::<Profile>(&bytes, 0, bytes.len()),
        Err(DecodeError::GuardExceeded { guard: Guard::ContainerSize, .. })
    );
}

#[test]
fn counters_are_reset_between_calls() {
    // records exactly as long as the limit; carried-over byte counts would trip the guard
    let bytes = padded_record(9, 128);
    let mut decoder =
        GuardedDecoder::with_config(DecoderConfig::default().with_initial_size_limit(128));

    for _ in 0..3 {
        let profile: Profile = decoder.decode(&bytes, 0, bytes.len()).unwrap();
        assert_eq!(profile.id, 9);
    }
    assert_eq!(decoder.size_limit(), 128);
    assert_eq!(decoder.growth_count(), 0);
}

#[test]
fn failed_call_does_not_poison_next_call() {
    let good = Profile::sample(2, 2).encode();
    let mut bad = good.clone();
    bad.truncate(good.len() / 2);

    let mut decoder = GuardedDecoder::new();
    assert!(decoder.decode::<Profile>(&bad, 0, bad.len()).is_err());

    let decoded: Profile = decoder.decode(&good, 0, good.len()).unwrap();
    assert_eq!(decoded, Profile::sample(2, 2));
}

// LIMIT GROWTH TESTS
// ================================================================================================

#[test]
fn limit_grows_for_large_records() {
    const MIB: usize = 1024 * 1024;

    // a 64 byte record leaves the default limit alone
    let small = padded_record(1, 64);
    let mut decoder = GuardedDecoder::new();
    let profile: Profile = decoder.decode(&small, 0, small.len()).unwrap();
    assert_eq!(profile.id, 1);
    assert_eq!(decoder.size_limit(), 10 * MIB);
    assert_eq!(decoder.growth_count(), 0);

    // an 11 MiB record grows the limit to the record length plus 10%
    let large = padded_record(2, 11 * MIB);
    let profile: Profile = decoder.decode(&large, 0, large.len()).unwrap();
    assert_eq!(profile.id, 2);
    assert_eq!(decoder.size_limit(), 11 * MIB + 11 * MIB / 10);
    assert_eq!(decoder.size_limit(), 12_687_769);
    assert_eq!(decoder.growth_count(), 1);

    // the limit never shrinks
    let profile: Profile = decoder.decode(&small, 0, small.len()).unwrap();
    assert_eq!(profile.id, 1);
    assert_eq!(decoder.size_limit(), 12_687_769);
    assert_eq!(decoder.growth_count(), 1);
}

#[test]
fn limit_grows_from_zero() {
    let bytes = padded_record(4, 100);
    let config = DecoderConfig::default().with_initial_size_limit(0);
    let mut decoder = GuardedDecoder::with_config(config);

    let profile: Profile = decoder.decode(&bytes, 0, bytes.len()).unwrap();
    assert_eq!(profile.id, 4);
    assert_eq!(decoder.size_limit(), 110);

    // records within the margin do not grow the limit again
    let bytes = padded_record(5, 110);
    decoder.decode::<Profile>(&bytes, 0, bytes.len()).unwrap();
    assert_eq!(decoder.size_limit(), 110);
    assert_eq!(decoder.growth_count(), 1);

    let bytes = padded_record(6, 111);
    decoder.decode::<Profile>(&bytes, 0, bytes.len()).unwrap();
    assert_eq!(decoder.size_limit(), 122);
    assert_eq!(decoder.growth_count(), 2);
}

#[test]
fn grown_limit_applies_to_container_guard() {
    // a window larger than the initial limit holding a string of that many bytes
    let bytes = padded_record(3, 300);
    let config = DecoderConfig::default().with_initial_size_limit(32);
    let mut decoder = GuardedDecoder::with_config(config);

    let profile: Profile = decoder.decode(&bytes, 0, bytes.len()).unwrap();
    assert_eq!(profile.id, 3);
    assert_eq!(decoder.size_limit(), 330);
}

// PROPERTY TESTS
// ================================================================================================

fn profiles() -> impl Strategy<Value = Vec<Profile>> {
    prop::collection::vec((any::<i64>(), 0usize..40), 1..12).prop_map(|specs| {
        specs.into_iter().map(|(id, num_tags)| Profile::sample(id, num_tags)).collect()
    })
}

proptest! {
    #[test]
    fn reuse_matches_fresh_decoders(profiles in profiles(), initial_limit in 0usize..2048) {
        let config = DecoderConfig::default().with_initial_size_limit(initial_limit);
        let mut reused = GuardedDecoder::with_config(config.clone());
        let mut previous_limit = reused.size_limit();

        for profile in profiles.iter() {
            let bytes = profile.encode();

            let mut fresh = GuardedDecoder::with_config(config.clone());
            let expected: Profile = fresh.decode(&bytes, 0, bytes.len()).unwrap();
            let actual: Profile = reused.decode(&bytes, 0, bytes.len()).unwrap();

            prop_assert_eq!(&actual, &expected);
            prop_assert_eq!(&actual, profile);

            prop_assert!(reused.size_limit() >= previous_limit);
            prop_assert!(reused.size_limit() >= bytes.len());
            previous_limit = reused.size_limit();
        }
    }

    #[test]
    fn windows_match_isolated_buffers(profiles in profiles(), gap in 0usize..8) {
        let mut block = Vec::new();
        let mut windows = Vec::new();
        for profile in profiles.iter() {
            block.extend(core::iter::repeat_n(0xff, gap));
            let bytes = profile.encode();
            windows.push((block.len(), bytes.len()));
            block.extend_from_slice(&bytes);
        }

        let mut decoder = GuardedDecoder::new();
        for (profile, (offset, len)) in profiles.iter().zip(windows) {
            let isolated = profile.encode();
            let expected: Profile =
                GuardedDecoder::new().decode(&isolated, 0, isolated.len()).unwrap();
            let actual: Profile = decoder.decode(&block, offset, len).unwrap();
            prop_assert_eq!(actual, expected);
        }
    }

    #[test]
    fn arbitrary_bytes_never_panic(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
        let config = DecoderConfig::default().with_initial_size_limit(64);
        let mut decoder = GuardedDecoder::with_config(config);
        let _ = decoder.decode::<Profile>(&bytes, 0, bytes.len());
        prop_assert!(decoder.size_limit() >= bytes.len());
    }
}
