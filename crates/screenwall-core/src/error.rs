//! Allocation and registry errors.
//!
//! `UnknownScreen`, `ScreenBusy` and `EndpointCannotClaim` are answered to
//! the requester; `StaleOperation` is swallowed (logged only).
//! The session bookkeeping variants mean the runtime fed the coordinator an
//! event for a connection it never announced, or announced twice.

use crate::{registry::ScreenId, session::SessionId};

/// Errors from screen registry construction and lookup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// Screen id is not part of the registry.
    #[error("unknown screen: {0}")]
    UnknownScreen(String),

    /// Same screen id configured twice.
    #[error("duplicate screen: {0}")]
    DuplicateScreen(String),

    /// Screen id is empty or contains a path separator or whitespace.
    #[error("invalid screen id: {0:?}")]
    InvalidScreenId(String),

    /// No screens configured.
    #[error("registry needs at least one screen")]
    Empty,
}

/// Errors from allocation operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AllocationError {
    /// Requested screen does not exist.
    #[error("unknown screen: {0}")]
    UnknownScreen(String),

    /// Requested screen already has an occupant.
    #[error("screen busy: {0}")]
    ScreenBusy(ScreenId),

    /// Release or cleanup no longer matches current occupancy.
    ///
    /// Expected outcome of races (double release, release after the endpoint
    /// already freed the screen). Never reported to the client.
    #[error("stale operation from session {session_id}: {reason}")]
    StaleOperation {
        /// Session that sent the operation
        session_id: SessionId,
        /// What no longer matched
        reason: &'static str,
    },

    /// A display endpoint tried to claim a screen. Answered as busy.
    #[error("endpoint session {session_id} cannot claim {screen}")]
    EndpointCannotClaim {
        /// Endpoint session
        session_id: SessionId,
        /// Screen it asked for
        screen: ScreenId,
    },

    /// Event for a session that was never connected (or already closed).
    #[error("session not found: {0}")]
    SessionNotFound(SessionId),

    /// Connect for a session id that is already live.
    #[error("session already exists: {0}")]
    SessionAlreadyExists(SessionId),

    /// Registry rejected a mutation.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}
