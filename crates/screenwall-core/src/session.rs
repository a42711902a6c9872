//! Per-connection session state.
//!
//! A session is either a display endpoint for one screen, a claimant that
//! asked for one, or neither. The endpoint role is terminal for the life of
//! the connection.

use crate::registry::{ScreenId, ScreenRegistry};

/// Server-assigned connection identifier.
pub type SessionId = u64;

/// What a connection is doing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionRole {
    /// Connected, watching the snapshot only
    #[default]
    Unassigned,
    /// Display endpoint for a screen
    Endpoint(ScreenId),
    /// Last screen this session successfully claimed
    Claimant(ScreenId),
}

impl SessionRole {
    /// Screen associated with the role, if any.
    #[must_use]
    pub fn screen(&self) -> Option<&ScreenId> {
        match self {
            Self::Unassigned => None,
            Self::Endpoint(screen) | Self::Claimant(screen) => Some(screen),
        }
    }

    /// Whether this is a display endpoint.
    #[must_use]
    pub fn is_endpoint(&self) -> bool {
        matches!(self, Self::Endpoint(_))
    }

    /// Whether this session claimed a screen.
    #[must_use]
    pub fn is_claimant(&self) -> bool {
        matches!(self, Self::Claimant(_))
    }
}

/// State of one connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    id: SessionId,
    role: SessionRole,
}

impl Session {
    /// Fresh unassigned session.
    #[must_use]
    pub fn new(id: SessionId) -> Self {
        Self { id, role: SessionRole::Unassigned }
    }

    /// Session id.
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Current role.
    #[must_use]
    pub fn role(&self) -> &SessionRole {
        &self.role
    }

    /// Become the display endpoint of `screen_id`.
    ///
    /// Returns `false` and leaves the role untouched when the screen is not
    /// registered. Registering again (same or other screen) overwrites.
    pub fn mark_as_endpoint(&mut self, registry: &ScreenRegistry, screen_id: &str) -> bool {
        match registry.screen_id(screen_id) {
            Some(id) => {
                self.role = SessionRole::Endpoint(id.clone());
                true
            },
            None => false,
        }
    }

    /// Record a successful claim of `screen`.
    ///
    /// Returns `false` for endpoint sessions, which never claim.
    pub fn mark_as_claimant(&mut self, screen: ScreenId) -> bool {
        if self.role.is_endpoint() {
            return false;
        }
        self.role = SessionRole::Claimant(screen);
        true
    }

    /// Back to unassigned, returning the old role.
    pub fn clear(&mut self) -> SessionRole {
        std::mem::take(&mut self.role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_requires_known_screen() {
        let registry = ScreenRegistry::with_default_screens();
        let mut session = Session::new(1);

        assert!(!session.mark_as_endpoint(&registry, "screen9"));
        assert_eq!(session.role(), &SessionRole::Unassigned);

        assert!(session.mark_as_endpoint(&registry, "screen3"));
        assert_eq!(session.role(), &SessionRole::Endpoint(ScreenId::from("screen3")));

        assert!(session.mark_as_endpoint(&registry, "screen1"));
        assert_eq!(session.role().screen().map(ScreenId::as_str), Some("screen1"));
    }

    #[test]
    fn endpoint_role_blocks_claims() {
        let registry = ScreenRegistry::with_default_screens();
        let mut session = Session::new(1);
        session.mark_as_endpoint(&registry, "screen1");

        assert!(!session.mark_as_claimant(ScreenId::from("screen2")));
        assert!(session.role().is_endpoint());
    }

    #[test]
    fn clear_returns_previous_role() {
        let mut session = Session::new(5);
        assert!(session.mark_as_claimant(ScreenId::from("screen2")));

        assert_eq!(session.clear(), SessionRole::Claimant(ScreenId::from("screen2")));
        assert_eq!(session.role(), &SessionRole::Unassigned);
    }
}
