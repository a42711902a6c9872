//! Presence room messages.
//!
//! Rooms are a lightweight relay: the server only tells members who came and
//! went. Call setup itself goes through the external media relay.

use serde::{Deserialize, Serialize};

/// Join a presence room under a caller-chosen user id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRoom {
    /// Room to join (created on first join)
    pub room_id: String,
    /// Identifier announced to the other members
    pub user_id: String,
}

/// A member joined or left a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPresence {
    /// Room the change happened in
    pub room_id: String,
    /// User id supplied by that member when joining
    pub user_id: String,
}
