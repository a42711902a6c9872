//! Frame header with zero-copy parsing.
//!
//! The `FrameHeader` is a fixed 16-byte structure serialized as raw binary
//! (Big Endian). The server reads the opcode and payload size without
//! deserializing anything.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::{
    Opcode,
    errors::{ProtocolError, Result},
};

/// Fixed 16-byte frame header (Big Endian network byte order)
///
/// Fields are stored as raw byte arrays so the struct has alignment 1 and
/// every 16-byte pattern is a valid value; casting untrusted network bytes
/// cannot cause undefined behavior. Structural validation (magic, version,
/// size limit) happens in [`FrameHeader::from_bytes`].
#[repr(C, packed)]
#[derive(Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct FrameHeader {
    magic: [u8; 4],                   // 0x53435257 ("SCRW" in ASCII)
    version: u8,                      // 0x01
    reserved: u8,                     // must be zero
    pub(crate) opcode: [u8; 2],       // u16 operation code
    request_id: [u8; 4],              // u32 client nonce, echoed in replies
    pub(crate) payload_size: [u8; 4], // u32 payload length
}

impl FrameHeader {
    /// Size of the serialized header (16 bytes)
    pub const SIZE: usize = 16;

    /// Magic number: "SCRW" in ASCII (0x53435257)
    pub const MAGIC: u32 = 0x5343_5257;

    /// Current protocol version
    pub const VERSION: u8 = 0x01;

    /// Maximum payload size (64 KiB)
    ///
    /// The largest legitimate payload is a snapshot of a handful of screens;
    /// anything near this limit is hostile.
    pub const MAX_PAYLOAD_SIZE: u32 = 64 * 1024;

    /// Create a new header with the specified opcode.
    #[must_use]
    pub fn new(opcode: Opcode) -> Self {
        Self {
            magic: Self::MAGIC.to_be_bytes(),
            version: Self::VERSION,
            reserved: 0,
            opcode: opcode.to_u16().to_be_bytes(),
            request_id: [0; 4],
            payload_size: [0; 4],
        }
    }

    /// Parse header from network bytes (zero-copy, safe)
    ///
    /// Trailing bytes after the header are ignored.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::FrameTooShort` if buffer is shorter than 16 bytes
    /// - `ProtocolError::InvalidMagic` if magic number is invalid
    /// - `ProtocolError::UnsupportedVersion` if protocol version is unsupported
    /// - `ProtocolError::PayloadTooLarge` if payload size exceeds maximum
    pub fn from_bytes(bytes: &[u8]) -> Result<&Self> {
        let header = Self::ref_from_prefix(bytes)
            .map_err(|_| ProtocolError::FrameTooShort {
                expected: Self::SIZE,
                actual: bytes.len(),
            })?
            .0;

        if u32::from_be_bytes(header.magic) != Self::MAGIC {
            return Err(ProtocolError::InvalidMagic);
        }

        if header.version != Self::VERSION {
            return Err(ProtocolError::UnsupportedVersion(header.version));
        }

        let payload_size = u32::from_be_bytes(header.payload_size);
        if payload_size > Self::MAX_PAYLOAD_SIZE {
            return Err(ProtocolError::PayloadTooLarge {
                size: payload_size as usize,
                max: Self::MAX_PAYLOAD_SIZE as usize,
            });
        }

        Ok(header)
    }

    /// Serialize header to bytes.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut arr = [0u8; Self::SIZE];
        arr.copy_from_slice(IntoBytes::as_bytes(self));
        arr
    }

    /// Protocol magic number.
    #[must_use]
    pub fn magic(&self) -> u32 {
        u32::from_be_bytes(self.magic)
    }

    /// Protocol version byte.
    #[must_use]
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Operation code as raw u16.
    #[must_use]
    pub fn opcode(&self) -> u16 {
        u16::from_be_bytes(self.opcode)
    }

    /// Operation code as enum. `None` if unrecognized.
    #[must_use]
    pub fn opcode_enum(&self) -> Option<Opcode> {
        Opcode::from_u16(self.opcode())
    }

    /// Client-assigned nonce for request/response correlation.
    #[must_use]
    pub fn request_id(&self) -> u32 {
        u32::from_be_bytes(self.request_id)
    }

    /// Set the request correlation nonce.
    pub fn set_request_id(&mut self, request_id: u32) {
        self.request_id = request_id.to_be_bytes();
    }

    /// Payload length in bytes.
    #[must_use]
    pub fn payload_size(&self) -> u32 {
        u32::from_be_bytes(self.payload_size)
    }
}

impl std::fmt::Debug for FrameHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameHeader")
            .field("version", &self.version())
            .field("opcode", &format_args!("{:#06x}", self.opcode()))
            .field("request_id", &self.request_id())
            .field("payload_size", &self.payload_size())
            .finish_non_exhaustive()
    }
}

impl PartialEq for FrameHeader {
    fn eq(&self, other: &Self) -> bool {
        self.to_bytes() == other.to_bytes()
    }
}

impl Eq for FrameHeader {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_header_parses_back() {
        let mut header = FrameHeader::new(Opcode::RequestClaim);
        header.set_request_id(0xDEAD_BEEF);

        let bytes = header.to_bytes();
        let parsed = FrameHeader::from_bytes(&bytes).unwrap();

        assert_eq!(parsed.magic(), FrameHeader::MAGIC);
        assert_eq!(parsed.version(), FrameHeader::VERSION);
        assert_eq!(parsed.opcode_enum(), Some(Opcode::RequestClaim));
        assert_eq!(parsed.request_id(), 0xDEAD_BEEF);
        assert_eq!(parsed.payload_size(), 0);
    }

    #[test]
    fn reject_short_buffer() {
        let result = FrameHeader::from_bytes(&[0u8; 15]);
        assert!(matches!(result, Err(ProtocolError::FrameTooShort { expected: 16, actual: 15 })));
    }

    #[test]
    fn reject_bad_magic() {
        let mut bytes = FrameHeader::new(Opcode::Release).to_bytes();
        bytes[0] = b'X';
        assert_eq!(FrameHeader::from_bytes(&bytes).err(), Some(ProtocolError::InvalidMagic));
    }

    #[test]
    fn reject_future_version() {
        let mut bytes = FrameHeader::new(Opcode::Release).to_bytes();
        bytes[4] = 0x02;
        assert_eq!(
            FrameHeader::from_bytes(&bytes).err(),
            Some(ProtocolError::UnsupportedVersion(0x02))
        );
    }

    #[test]
    fn reject_oversized_payload_claim() {
        let mut bytes = FrameHeader::new(Opcode::Release).to_bytes();
        bytes[12..16].copy_from_slice(&(FrameHeader::MAX_PAYLOAD_SIZE + 1).to_be_bytes());
        assert!(matches!(
            FrameHeader::from_bytes(&bytes),
            Err(ProtocolError::PayloadTooLarge { .. })
        ));
    }

    #[test]
    fn unknown_opcode_is_structurally_valid() {
        let mut bytes = FrameHeader::new(Opcode::Release).to_bytes();
        bytes[6..8].copy_from_slice(&0x7777u16.to_be_bytes());

        let header = FrameHeader::from_bytes(&bytes).unwrap();
        assert_eq!(header.opcode(), 0x7777);
        assert_eq!(header.opcode_enum(), None);
    }
}
