//! Operations for model-based testing.
//!
//! Operations represent all possible actions in the system. They are generated
//! randomly by proptest and applied to both the model and real implementation.

use arbitrary::Arbitrary;

/// Client identifier (0-indexed).
pub type ClientId = u8;

/// Screen index into [`MODEL_SCREENS`]; anything past the end is unknown.
pub type ModelScreen = u8;

/// Screens the model world serves.
pub const MODEL_SCREENS: [&str; 3] = ["screen1", "screen2", "screen3"];

/// Screen id used for out-of-range indices.
pub const UNKNOWN_SCREEN: &str = "screen9";

/// Screen id for a model index.
///
/// Indices wrap so roughly one in four hits the unknown screen.
pub fn screen_name(screen: ModelScreen) -> &'static str {
    screen_index(screen).map_or(UNKNOWN_SCREEN, |index| MODEL_SCREENS[index])
}

/// Known screen index for a model index, `None` for the unknown screen.
pub fn screen_index(screen: ModelScreen) -> Option<usize> {
    let index = usize::from(screen) % (MODEL_SCREENS.len() + 1);
    (index < MODEL_SCREENS.len()).then_some(index)
}

/// Operations that can be applied to the system.
///
/// Each operation targets one client. Connection state is part of the
/// operation space so disconnect cleanup gets exercised.
#[derive(Debug, Clone, Arbitrary)]
pub enum Operation {
    /// Client opens a connection.
    Connect {
        /// Client connecting.
        client_id: ClientId,
    },

    /// Client's connection closes.
    Disconnect {
        /// Client disconnecting.
        client_id: ClientId,
    },

    /// Client becomes a screen's display endpoint.
    RegisterEndpoint {
        /// Client registering.
        client_id: ClientId,
        /// Screen displayed.
        screen: ModelScreen,
    },

    /// Client asks to occupy a screen.
    Claim {
        /// Client claiming.
        client_id: ClientId,
        /// Screen requested.
        screen: ModelScreen,
        /// Name offered, if any.
        name: Option<ModelName>,
    },

    /// Client gives up its screen.
    Release {
        /// Client releasing.
        client_id: ClientId,
    },
}

impl Operation {
    /// Client the operation acts for.
    pub fn client_id(&self) -> ClientId {
        match self {
            Self::Connect { client_id }
            | Self::Disconnect { client_id }
            | Self::RegisterEndpoint { client_id, .. }
            | Self::Claim { client_id, .. }
            | Self::Release { client_id } => *client_id,
        }
    }
}

/// Names a claimant may offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Arbitrary)]
pub enum ModelName {
    /// Whitespace only; published as the placeholder
    Blank,
    /// A plain name
    Alice,
    /// Another plain name
    Bob,
}

impl ModelName {
    /// Name as sent on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Blank => "   ",
            Self::Alice => "Alice",
            Self::Bob => "Bob",
        }
    }
}

/// Result of applying an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationResult {
    /// Applied; no reply expected.
    Ok,
    /// Claim confirmed.
    Confirmed,
    /// Claim refused, screen occupied.
    Busy,
    /// Claim refused, no such screen.
    Unknown,
    /// Dropped without a reply.
    Ignored,
    /// Not applicable in the current state.
    Error(OperationError),
}

/// Why an operation could not be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationError {
    /// Client id out of range.
    InvalidClient,
    /// Client has no open connection.
    NotConnected,
    /// Client is already connected.
    AlreadyConnected,
}
