//! Fuzz target for frame header boundary conditions
//!
//! # Strategy
//!
//! - Magic bytes: Valid, off-by-one, all-zeros, all-ones, random
//! - Version: Valid (0x01), zero, max, random
//! - Payload size: Zero, small, at-max, just-over-max, u32::MAX, random
//! - Body: shorter than, equal to, or longer than the declared size
//! - Opcode: any u16, known or not
//!
//! # Invariants
//!
//! - Buffers under 16 bytes MUST return `ProtocolError::FrameTooShort`
//! - Invalid magic MUST return `ProtocolError::InvalidMagic`
//! - Wrong version MUST return `ProtocolError::UnsupportedVersion`
//! - `payload_size > MAX_PAYLOAD_SIZE` MUST return
//!   `ProtocolError::PayloadTooLarge`
//! - Short bodies MUST return `ProtocolError::FrameTruncated`
//! - Unknown opcodes decode as frames but MUST fail payload decoding with
//!   `ProtocolError::UnknownOpcode`
//! - Encoded size MUST equal 16 + payload_size

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use screenwall_proto::{Frame, FrameHeader, Opcode, Payload, ProtocolError};

#[derive(Debug, Clone, Arbitrary)]
struct BoundaryFrame {
    magic: MagicBytes,
    version: VersionByte,
    reserved: u8,
    opcode: u16,
    request_id: u32,
    payload_size: PayloadSize,
    body: BodyLength,
    /// Truncate the whole buffer to this many bytes when set
    cut: Option<u8>,
}

#[derive(Debug, Clone, Arbitrary)]
enum MagicBytes {
    Valid,
    OffByOne(u8),
    AllZeros,
    AllOnes,
    Random([u8; 4]),
}

#[derive(Debug, Clone, Arbitrary)]
enum VersionByte {
    Valid,
    Zero,
    Max,
    Random(u8),
}

#[derive(Debug, Clone, Arbitrary)]
enum PayloadSize {
    Zero,
    Small(u8),
    AtMax,
    JustOverMax,
    MaxU32,
    Random(u32),
}

#[derive(Debug, Clone, Arbitrary)]
enum BodyLength {
    Exact,
    Short(u8),
    Long(u8),
}

fuzz_target!(|boundary: BoundaryFrame| {
    let max = FrameHeader::MAX_PAYLOAD_SIZE;

    let declared = match boundary.payload_size {
        PayloadSize::Zero => 0,
        PayloadSize::Small(s) => u32::from(s),
        PayloadSize::AtMax => max,
        PayloadSize::JustOverMax => max + 1,
        PayloadSize::MaxU32 => u32::MAX,
        PayloadSize::Random(r) => r,
    };

    // Never allocate more than one maximal frame's worth of body.
    let exact = declared.min(max + 1) as usize;
    let body_len = match boundary.body {
        BodyLength::Exact => exact,
        BodyLength::Short(n) => exact.saturating_sub(usize::from(n).max(1)),
        BodyLength::Long(n) => exact + usize::from(n),
    };

    let mut buffer = vec![0u8; FrameHeader::SIZE + body_len];

    let magic = FrameHeader::MAGIC.to_be_bytes();
    match boundary.magic {
        MagicBytes::Valid => buffer[0..4].copy_from_slice(&magic),
        MagicBytes::OffByOne(offset) => {
            buffer[0..4].copy_from_slice(&magic);
            let idx = usize::from(offset % 4);
            buffer[idx] = buffer[idx].wrapping_add(1);
        },
        MagicBytes::AllZeros => buffer[0..4].fill(0),
        MagicBytes::AllOnes => buffer[0..4].fill(0xFF),
        MagicBytes::Random(bytes) => buffer[0..4].copy_from_slice(&bytes),
    }

    let version = match boundary.version {
        VersionByte::Valid => FrameHeader::VERSION,
        VersionByte::Zero => 0,
        VersionByte::Max => u8::MAX,
        VersionByte::Random(v) => v,
    };
    buffer[4] = version;
    buffer[5] = boundary.reserved;
    buffer[6..8].copy_from_slice(&boundary.opcode.to_be_bytes());
    buffer[8..12].copy_from_slice(&boundary.request_id.to_be_bytes());
    buffer[12..16].copy_from_slice(&declared.to_be_bytes());

    if let Some(cut) = boundary.cut {
        buffer.truncate(usize::from(cut));
    }

    let result = Frame::decode(&buffer);

    if buffer.len() < FrameHeader::SIZE {
        assert!(
            matches!(result, Err(ProtocolError::FrameTooShort { .. })),
            "short buffer: {result:?}"
        );
        return;
    }

    if u32::from_be_bytes([buffer[0], buffer[1], buffer[2], buffer[3]]) != FrameHeader::MAGIC {
        assert!(matches!(result, Err(ProtocolError::InvalidMagic)), "bad magic: {result:?}");
        return;
    }

    if version != FrameHeader::VERSION {
        assert!(
            matches!(result, Err(ProtocolError::UnsupportedVersion(v)) if v == version),
            "bad version: {result:?}"
        );
        return;
    }

    if declared > max {
        assert!(
            matches!(result, Err(ProtocolError::PayloadTooLarge { .. })),
            "oversized payload: {result:?}"
        );
        return;
    }

    if buffer.len() < FrameHeader::SIZE + declared as usize {
        assert!(
            matches!(result, Err(ProtocolError::FrameTruncated { .. })),
            "truncated body: {result:?}"
        );
        return;
    }

    let frame = match result {
        Ok(frame) => frame,
        Err(e) => panic!("well-formed header rejected: {e:?}"),
    };

    assert_eq!(frame.header.opcode(), boundary.opcode);
    assert_eq!(frame.header.request_id(), boundary.request_id);
    assert_eq!(frame.payload.len(), declared as usize);
    assert_eq!(frame.encoded_len(), FrameHeader::SIZE + declared as usize);

    if Opcode::from_u16(boundary.opcode).is_none() {
        assert!(
            matches!(
                Payload::from_frame(&frame),
                Err(ProtocolError::UnknownOpcode(op)) if op == boundary.opcode
            ),
            "unknown opcode decoded"
        );
    }
});
