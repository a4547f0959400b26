#![no_main]

use libfuzzer_sys::fuzz_target;
use thrift_guard::{
    BinaryInputProtocol, DecoderLimits, DecoderState, InputProtocol, LimitedByteSource, WireType,
};

fuzz_target!(|data: &[u8]| {
    // The first byte selects the type to skip; the rest is the value. Skipping must terminate
    // without consuming more than the window or exceeding the depth bound.
    let Some((&tag, rest)) = data.split_first() else {
        return;
    };
    let Ok(wire_type) = WireType::try_from(tag) else {
        return;
    };
    let Ok(source) = LimitedByteSource::new(rest, 0, rest.len()) else {
        return;
    };

    let mut state = DecoderState::new(DecoderLimits::uniform(rest.len(), 16));
    let mut input = BinaryInputProtocol::new(&mut state, source);
    let _ = input.skip(wire_type);

    assert!(input.bytes_read() <= rest.len());
    assert!(state.depth() <= 16);
});
