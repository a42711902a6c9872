//! Fuzz target for Frame::decode and Payload::from_frame
//!
//! This fuzzer feeds arbitrary byte sequences through the inbound decode path
//! to find:
//! - Parser crashes or panics
//! - Integer overflows in size calculations
//! - Buffer over-reads
//! - CBOR payloads that panic instead of failing
//!
//! The fuzzer should NEVER panic. All invalid inputs should return an error.

#![no_main]

use libfuzzer_sys::fuzz_target;
use screenwall_proto::{Frame, FrameHeader, Payload};

fuzz_target!(|data: &[u8]| {
    let Ok(frame) = Frame::decode(data) else {
        return;
    };

    assert_eq!(frame.payload.len(), frame.header.payload_size() as usize);
    assert!(frame.payload.len() <= FrameHeader::MAX_PAYLOAD_SIZE as usize);

    // Decoded payloads must re-encode into a frame.
    if let Ok(payload) = Payload::from_frame(&frame) {
        let _ = payload.to_frame();
    }
});
