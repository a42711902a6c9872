//! Runtime error types.

use std::fmt;

use crate::server_error::ServerError as DriverError;

/// Errors from the production runtime.
#[derive(Debug)]
pub enum ServerError {
    /// Configuration error (bad bind address, unreadable TLS files, invalid
    /// screen list).
    ///
    /// Fatal at startup. Fix configuration and restart.
    Config(String),

    /// Transport/network error.
    ///
    /// May be transient (peer went away) or fatal (bind address in use).
    Transport(String),

    /// Peer sent bytes that are not a frame.
    ///
    /// Fatal for that connection only.
    Protocol(String),

    /// Unexpected runtime state. Indicates a bug.
    Internal(String),

    /// Driver rejected an event.
    Driver(DriverError),
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {msg}"),
            Self::Transport(msg) => write!(f, "transport error: {msg}"),
            Self::Protocol(msg) => write!(f, "protocol error: {msg}"),
            Self::Internal(msg) => write!(f, "internal error: {msg}"),
            Self::Driver(err) => write!(f, "driver error: {err}"),
        }
    }
}

impl std::error::Error for ServerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Driver(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DriverError> for ServerError {
    fn from(err: DriverError) -> Self {
        match err {
            DriverError::Registry(e) => Self::Config(e.to_string()),
            other => Self::Driver(other),
        }
    }
}

impl From<std::io::Error> for ServerError {
    fn from(err: std::io::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<screenwall_proto::ProtocolError> for ServerError {
    fn from(err: screenwall_proto::ProtocolError) -> Self {
        Self::Protocol(err.to_string())
    }
}
