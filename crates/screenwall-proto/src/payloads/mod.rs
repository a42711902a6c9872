//! CBOR-encoded protocol messages.
//!
//! Frame headers are raw binary, payloads are CBOR: self-describing, compact,
//! and no code generation. The opcode in the header selects the payload type,
//! so only the inner struct is serialized (no variant tag).
//!
//! # Invariants
//!
//! Each payload variant maps to exactly one opcode (enforced by match
//! exhaustiveness). Decoding an encoded payload with its own opcode yields an
//! equal value.

pub mod room;
pub mod screen;

use bytes::BufMut;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{
    Frame, FrameHeader, Opcode,
    errors::{ProtocolError, Result},
};

/// All possible frame payloads
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    // Client to server
    /// Bind connection as a screen's display endpoint
    RegisterEndpoint(screen::RegisterEndpoint),
    /// Request to occupy a screen
    RequestClaim(screen::RequestClaim),
    /// Give up the occupied screen
    Release,
    /// Join a presence room
    JoinRoom(room::JoinRoom),

    // Server to client
    /// Public occupancy snapshot
    StateSnapshot(screen::ScreensState),
    /// Claim succeeded
    ClaimConfirmed(screen::ClaimConfirmed),
    /// Claim refused, screen occupied
    ResourceBusy(screen::ResourceBusy),
    /// Claim refused, unknown screen
    ResourceUnknown,
    /// Room member joined
    UserConnected(room::UserPresence),
    /// Room member left
    UserDisconnected(room::UserPresence),
    /// Error response
    Error(ErrorPayload),
}

/// Error payload for error frames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// Error code identifying the type of error.
    pub code: u16,
    /// Human-readable error message.
    pub message: String,
}

impl ErrorPayload {
    /// Payload could not be decoded for its opcode.
    pub const INVALID_PAYLOAD: u16 = 0x0001;
    /// Opcode is unknown or not accepted from clients.
    pub const UNEXPECTED_OPCODE: u16 = 0x0002;

    /// Create an invalid payload error.
    pub fn invalid_payload(msg: impl Into<String>) -> Self {
        Self { code: Self::INVALID_PAYLOAD, message: msg.into() }
    }

    /// Create an unexpected opcode error.
    pub fn unexpected_opcode(opcode: u16) -> Self {
        Self {
            code: Self::UNEXPECTED_OPCODE,
            message: format!("opcode {opcode:#06x} not accepted from clients"),
        }
    }
}

impl Payload {
    /// Opcode corresponding to this payload type.
    #[must_use]
    pub const fn opcode(&self) -> Opcode {
        match self {
            Self::RegisterEndpoint(_) => Opcode::RegisterEndpoint,
            Self::RequestClaim(_) => Opcode::RequestClaim,
            Self::Release => Opcode::Release,
            Self::JoinRoom(_) => Opcode::JoinRoom,
            Self::StateSnapshot(_) => Opcode::StateSnapshot,
            Self::ClaimConfirmed(_) => Opcode::ClaimConfirmed,
            Self::ResourceBusy(_) => Opcode::ResourceBusy,
            Self::ResourceUnknown => Opcode::ResourceUnknown,
            Self::UserConnected(_) => Opcode::UserConnected,
            Self::UserDisconnected(_) => Opcode::UserDisconnected,
            Self::Error(_) => Opcode::Error,
        }
    }

    /// Encode payload to buffer.
    ///
    /// Serializes only the inner struct, not the variant tag. Size limits are
    /// enforced later by [`Frame::encode`].
    ///
    /// # Errors
    ///
    /// - `ProtocolError::CborEncode` if serialization fails
    pub fn encode(&self, dst: &mut impl BufMut) -> Result<()> {
        let mut writer = dst.writer();

        match self {
            Self::RegisterEndpoint(inner) => ciborium::ser::into_writer(inner, &mut writer),
            Self::RequestClaim(inner) => ciborium::ser::into_writer(inner, &mut writer),
            Self::Release | Self::ResourceUnknown => Ok(()), // Zero-byte payloads
            Self::JoinRoom(inner) => ciborium::ser::into_writer(inner, &mut writer),
            Self::StateSnapshot(inner) => ciborium::ser::into_writer(inner, &mut writer),
            Self::ClaimConfirmed(inner) => ciborium::ser::into_writer(inner, &mut writer),
            Self::ResourceBusy(inner) => ciborium::ser::into_writer(inner, &mut writer),
            Self::UserConnected(inner) | Self::UserDisconnected(inner) => {
                ciborium::ser::into_writer(inner, &mut writer)
            },
            Self::Error(inner) => ciborium::ser::into_writer(inner, &mut writer),
        }
        .map_err(|e| ProtocolError::CborEncode(e.to_string()))
    }

    /// Decode payload from bytes based on opcode.
    ///
    /// The size check runs before any CBOR parsing.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::PayloadTooLarge` if bytes exceed `MAX_PAYLOAD_SIZE`
    /// - `ProtocolError::CborDecode` if CBOR deserialization fails
    pub fn decode(opcode: Opcode, bytes: &[u8]) -> Result<Self> {
        if bytes.len() > FrameHeader::MAX_PAYLOAD_SIZE as usize {
            return Err(ProtocolError::PayloadTooLarge {
                size: bytes.len(),
                max: FrameHeader::MAX_PAYLOAD_SIZE as usize,
            });
        }

        let payload = match opcode {
            Opcode::RegisterEndpoint => Self::RegisterEndpoint(cbor(bytes)?),
            Opcode::RequestClaim => Self::RequestClaim(cbor(bytes)?),
            Opcode::Release => Self::Release,
            Opcode::JoinRoom => Self::JoinRoom(cbor(bytes)?),
            Opcode::StateSnapshot => Self::StateSnapshot(cbor(bytes)?),
            Opcode::ClaimConfirmed => Self::ClaimConfirmed(cbor(bytes)?),
            Opcode::ResourceBusy => Self::ResourceBusy(cbor(bytes)?),
            Opcode::ResourceUnknown => Self::ResourceUnknown,
            Opcode::UserConnected => Self::UserConnected(cbor(bytes)?),
            Opcode::UserDisconnected => Self::UserDisconnected(cbor(bytes)?),
            Opcode::Error => Self::Error(cbor(bytes)?),
        };

        Ok(payload)
    }

    /// Convert payload into a transport frame.
    ///
    /// Encodes the payload, stamps the matching opcode into `header` and
    /// sets the payload size. Other header fields (request id) are kept.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::CborEncode` if serialization fails
    pub fn into_frame(self, mut header: FrameHeader) -> Result<Frame> {
        let mut buf = Vec::new();
        self.encode(&mut buf)?;
        header.opcode = self.opcode().to_u16().to_be_bytes();
        Ok(Frame::new(header, buf))
    }

    /// Convert payload into a frame with a fresh header.
    pub fn to_frame(self) -> Result<Frame> {
        let header = FrameHeader::new(self.opcode());
        self.into_frame(header)
    }

    /// Parse payload from a raw transport frame.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::UnknownOpcode` if the header opcode is not recognized
    /// - `ProtocolError::CborDecode` if CBOR deserialization fails
    /// - `ProtocolError::PayloadTooLarge` if payload exceeds maximum size
    pub fn from_frame(frame: &Frame) -> Result<Self> {
        let opcode = frame
            .header
            .opcode_enum()
            .ok_or_else(|| ProtocolError::UnknownOpcode(frame.header.opcode()))?;
        Self::decode(opcode, &frame.payload)
    }
}

fn cbor<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    ciborium::de::from_reader(bytes).map_err(|e| ProtocolError::CborDecode(e.to_string()))
}
