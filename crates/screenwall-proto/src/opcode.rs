//! Message type discriminators.

/// Operation code carried in every frame header.
///
/// Client-to-server opcodes live in `0x00xx`, server-to-client opcodes in
/// `0x01xx`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Opcode {
    /// Bind this connection as the display endpoint of a screen
    RegisterEndpoint = 0x0010,
    /// Ask to occupy a screen
    RequestClaim = 0x0011,
    /// Give up the screen this connection occupies
    Release = 0x0012,
    /// Join a presence room
    JoinRoom = 0x0020,

    /// Public occupancy snapshot
    StateSnapshot = 0x0100,
    /// Claim succeeded
    ClaimConfirmed = 0x0101,
    /// Claim refused, screen occupied
    ResourceBusy = 0x0102,
    /// Claim refused, screen does not exist
    ResourceUnknown = 0x0103,
    /// Another user joined a room this connection is in
    UserConnected = 0x0120,
    /// A user left a room this connection is in
    UserDisconnected = 0x0121,
    /// Inbound frame could not be processed
    Error = 0x01FF,
}

impl Opcode {
    /// Wire representation.
    #[must_use]
    pub const fn to_u16(self) -> u16 {
        self as u16
    }

    /// Parse a wire opcode. `None` if unrecognized.
    #[must_use]
    pub const fn from_u16(value: u16) -> Option<Self> {
        match value {
            0x0010 => Some(Self::RegisterEndpoint),
            0x0011 => Some(Self::RequestClaim),
            0x0012 => Some(Self::Release),
            0x0020 => Some(Self::JoinRoom),
            0x0100 => Some(Self::StateSnapshot),
            0x0101 => Some(Self::ClaimConfirmed),
            0x0102 => Some(Self::ResourceBusy),
            0x0103 => Some(Self::ResourceUnknown),
            0x0120 => Some(Self::UserConnected),
            0x0121 => Some(Self::UserDisconnected),
            0x01FF => Some(Self::Error),
            _ => None,
        }
    }

    /// Whether clients may send this opcode to the server.
    #[must_use]
    pub const fn is_client_opcode(self) -> bool {
        matches!(self, Self::RegisterEndpoint | Self::RequestClaim | Self::Release | Self::JoinRoom)
    }
}
