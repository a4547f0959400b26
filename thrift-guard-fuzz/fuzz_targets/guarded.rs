#![no_main]

use libfuzzer_sys::fuzz_target;
use thrift_guard::{DecoderConfig, GuardedDecoder, test_utils::Profile};

fuzz_target!(|data: &[u8]| {
    // Use a small initial limit so that both the growth path and the guards are exercised.
    let config = DecoderConfig::default().with_initial_size_limit(64);
    let mut decoder = GuardedDecoder::with_config(config);

    // Whole input as one record
    let _ = decoder.decode::<Profile>(data, 0, data.len());

    // Two adjacent windows of the remaining bytes, split where the first byte says
    if let Some((&split, rest)) = data.split_first() {
        let split = split as usize % (rest.len() + 1);
        let _ = decoder.decode::<Profile>(rest, 0, split);
        let _ = decoder.decode::<Profile>(rest, split, rest.len() - split);
    }

    assert!(decoder.size_limit() >= data.len());
});
