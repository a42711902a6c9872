//! Screenwall wire protocol.
//!
//! Every message between the server and a client is a [`Frame`]: a fixed
//! 16-byte binary header followed by a CBOR payload. The header carries just
//! enough to route and size the frame without touching the payload; the
//! [`Payload`] enum is the typed view of the body.
//!
//! # Components
//!
//! - [`FrameHeader`]: zero-copy header (magic, version, opcode, request id,
//!   payload size)
//! - [`Frame`]: header + raw payload bytes
//! - [`Opcode`]: message type discriminator
//! - [`Payload`]: typed, CBOR-encoded message bodies

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod errors;
mod frame;
mod header;
mod opcode;
pub mod payloads;

pub use errors::{ProtocolError, Result};
pub use frame::Frame;
pub use header::FrameHeader;
pub use opcode::Opcode;
pub use payloads::{ErrorPayload, Payload};

/// ALPN protocol identifier negotiated on QUIC connections.
pub const ALPN_PROTOCOL: &[u8] = b"screenwall";
