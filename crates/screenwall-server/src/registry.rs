//! Connection registry for live sessions and presence rooms.
//!
//! Bidirectional mappings: room → members (for announcements) and session →
//! rooms (for cleanup on disconnect). Each membership remembers the user id
//! the session announced when joining, so the departure notice can repeat it.
//!
//! Rooms are created by the first join and dropped when their last member
//! leaves. Ordered maps keep announcement order deterministic.

use std::collections::{BTreeMap, BTreeSet, HashMap};

/// A session's membership in one room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomMembership {
    /// Room joined
    pub room_id: String,
    /// User id announced in that room
    pub user_id: String,
}

/// Registry of live sessions and their room memberships.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    /// Session ID → rooms joined
    sessions: HashMap<u64, BTreeSet<String>>,
    /// Room ID → (session ID → announced user ID)
    rooms: BTreeMap<String, BTreeMap<u64, String>>,
}

impl ConnectionRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new session.
    ///
    /// Returns `false` if the session already exists.
    pub fn register_session(&mut self, session_id: u64) -> bool {
        if self.sessions.contains_key(&session_id) {
            return false;
        }
        self.sessions.insert(session_id, BTreeSet::new());
        true
    }

    /// Unregister a session and drop all its room memberships.
    ///
    /// Returns the memberships it held, `None` if it was never registered.
    pub fn unregister_session(&mut self, session_id: u64) -> Option<Vec<RoomMembership>> {
        let rooms = self.sessions.remove(&session_id)?;

        let mut memberships = Vec::with_capacity(rooms.len());
        for room_id in rooms {
            let Some(members) = self.rooms.get_mut(&room_id) else { continue };
            if let Some(user_id) = members.remove(&session_id) {
                memberships.push(RoomMembership { room_id: room_id.clone(), user_id });
            }
            if members.is_empty() {
                self.rooms.remove(&room_id);
            }
        }

        Some(memberships)
    }

    /// Check if a session is registered.
    pub fn has_session(&self, session_id: u64) -> bool {
        self.sessions.contains_key(&session_id)
    }

    /// Add a session to a room under `user_id`.
    ///
    /// Joining a room again replaces the announced user id. Returns `false`
    /// if the session is not registered.
    pub fn join_room(&mut self, session_id: u64, room_id: &str, user_id: &str) -> bool {
        let Some(joined) = self.sessions.get_mut(&session_id) else {
            return false;
        };

        joined.insert(room_id.to_string());
        self.rooms.entry(room_id.to_string()).or_default().insert(session_id, user_id.to_string());
        true
    }

    /// Check if a session is in a room.
    pub fn is_member(&self, session_id: u64, room_id: &str) -> bool {
        self.rooms.get(room_id).is_some_and(|m| m.contains_key(&session_id))
    }

    /// User id a session announced in a room.
    pub fn user_id(&self, session_id: u64, room_id: &str) -> Option<&str> {
        self.rooms.get(room_id).and_then(|m| m.get(&session_id)).map(String::as_str)
    }

    /// All sessions in a room, in id order.
    pub fn sessions_in_room(&self, room_id: &str) -> impl Iterator<Item = u64> + '_ {
        self.rooms.get(room_id).into_iter().flat_map(|m| m.keys().copied())
    }

    /// All rooms a session joined.
    pub fn rooms_for_session(&self, session_id: u64) -> impl Iterator<Item = &str> + '_ {
        self.sessions.get(&session_id).into_iter().flat_map(|r| r.iter().map(String::as_str))
    }

    /// Total number of registered sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Number of rooms with at least one member.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Number of sessions in a room.
    pub fn room_session_count(&self, room_id: &str) -> usize {
        self.rooms.get(room_id).map_or(0, BTreeMap::len)
    }
}
