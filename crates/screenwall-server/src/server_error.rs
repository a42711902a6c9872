//! Driver error types.
//!
//! Errors raised while the driver processes an event. None of them are fatal
//! to the process; the runtime logs them and keeps serving other
//! connections.

use std::fmt;

use screenwall_core::{AllocationError, RegistryError};

/// Errors from `ServerDriver::process_event`.
#[derive(Debug)]
pub enum ServerError {
    /// Event for a session the driver never accepted.
    ///
    /// Usually a frame racing a disconnect. Transient.
    SessionNotFound(u64),

    /// Session id reused while still live.
    ///
    /// Session ids are drawn at random; a collision is a runtime bug.
    SessionAlreadyExists(u64),

    /// Coordinator rejected an operation.
    Allocation(AllocationError),

    /// Configured screen set is invalid.
    ///
    /// Only raised at construction. Fix configuration and restart.
    Registry(RegistryError),

    /// Frame could not be encoded or decoded.
    Protocol(String),
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SessionNotFound(id) => write!(f, "session not found: {id}"),
            Self::SessionAlreadyExists(id) => write!(f, "session already exists: {id}"),
            Self::Allocation(err) => write!(f, "allocation error: {err}"),
            Self::Registry(err) => write!(f, "registry error: {err}"),
            Self::Protocol(msg) => write!(f, "protocol error: {msg}"),
        }
    }
}

impl std::error::Error for ServerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Allocation(err) => Some(err),
            Self::Registry(err) => Some(err),
            _ => None,
        }
    }
}

impl From<AllocationError> for ServerError {
    fn from(err: AllocationError) -> Self {
        match err {
            AllocationError::SessionNotFound(id) => Self::SessionNotFound(id),
            AllocationError::SessionAlreadyExists(id) => Self::SessionAlreadyExists(id),
            other => Self::Allocation(other),
        }
    }
}

impl From<RegistryError> for ServerError {
    fn from(err: RegistryError) -> Self {
        Self::Registry(err)
    }
}

impl From<screenwall_proto::ProtocolError> for ServerError {
    fn from(err: screenwall_proto::ProtocolError) -> Self {
        Self::Protocol(err.to_string())
    }
}
