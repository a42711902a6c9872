//! Screen registry.
//!
//! Fixed set of screens and who occupies each one. The screen set is decided
//! at construction and never changes afterwards; only occupancy mutates.
//!
//! # Invariants
//!
//! - Every screen has at most one occupant.
//! - Screen ids are unique, non-empty, and contain no `/` or whitespace (they
//!   appear in page paths and as media relay peer ids).

use std::{borrow::Borrow, collections::BTreeMap, fmt};

use screenwall_proto::payloads::screen::{ScreenStatus, ScreensState};

use crate::{error::RegistryError, session::SessionId};

/// Stable identifier of a screen.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScreenId(String);

impl ScreenId {
    /// Wrap a screen id without validation.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(id: &str) -> Result<(), RegistryError> {
        if id.is_empty() || id.contains('/') || id.chars().any(char::is_whitespace) {
            return Err(RegistryError::InvalidScreenId(id.to_string()));
        }
        Ok(())
    }
}

impl Borrow<str> for ScreenId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScreenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ScreenId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Who occupies a screen.
///
/// The session id stays server-side; only `name` is ever published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occupant {
    /// Claimant session
    pub session_id: SessionId,
    /// Display name shown to everyone
    pub name: String,
}

/// One screen slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Screen {
    occupant: Option<Occupant>,
}

impl Screen {
    /// Current occupant, if any.
    #[must_use]
    pub fn occupant(&self) -> Option<&Occupant> {
        self.occupant.as_ref()
    }

    /// Whether someone occupies the screen.
    #[must_use]
    pub fn is_occupied(&self) -> bool {
        self.occupant.is_some()
    }

    fn status(&self) -> ScreenStatus {
        match &self.occupant {
            Some(occupant) => ScreenStatus::occupied_by(occupant.name.clone()),
            None => ScreenStatus::free(),
        }
    }
}

/// Fixed set of screens with their occupancy.
#[derive(Debug, Clone)]
pub struct ScreenRegistry {
    screens: BTreeMap<ScreenId, Screen>,
}

impl ScreenRegistry {
    /// Screens served when none are configured.
    pub const DEFAULT_SCREENS: [&'static str; 4] = ["screen1", "screen2", "screen3", "screen4"];

    /// Create a registry with every screen free.
    ///
    /// # Errors
    ///
    /// - `RegistryError::Empty` if `ids` yields nothing
    /// - `RegistryError::InvalidScreenId` if an id is empty or contains `/` or
    ///   whitespace
    /// - `RegistryError::DuplicateScreen` if an id appears twice
    pub fn new<I, S>(ids: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut screens = BTreeMap::new();
        for id in ids {
            let id = id.into();
            ScreenId::validate(&id)?;
            if screens.contains_key(id.as_str()) {
                return Err(RegistryError::DuplicateScreen(id));
            }
            screens.insert(ScreenId(id), Screen::default());
        }

        if screens.is_empty() {
            return Err(RegistryError::Empty);
        }

        Ok(Self { screens })
    }

    /// Registry with `screen1` through `screen4`.
    #[must_use]
    pub fn with_default_screens() -> Self {
        let screens = Self::DEFAULT_SCREENS
            .iter()
            .map(|id| (ScreenId::from(*id), Screen::default()))
            .collect();
        Self { screens }
    }

    /// Whether `screen_id` is part of the registry.
    #[must_use]
    pub fn contains(&self, screen_id: &str) -> bool {
        self.screens.contains_key(screen_id)
    }

    /// Canonical id for `screen_id`, if known.
    #[must_use]
    pub fn screen_id(&self, screen_id: &str) -> Option<&ScreenId> {
        self.screens.get_key_value(screen_id).map(|(id, _)| id)
    }

    /// Look up a screen.
    ///
    /// # Errors
    ///
    /// - `RegistryError::UnknownScreen` if the id is not registered
    pub fn lookup(&self, screen_id: &str) -> Result<&Screen, RegistryError> {
        self.screens
            .get(screen_id)
            .ok_or_else(|| RegistryError::UnknownScreen(screen_id.to_string()))
    }

    /// Occupant of a screen. `None` for free or unknown screens.
    #[must_use]
    pub fn occupant_of(&self, screen_id: &str) -> Option<&Occupant> {
        self.screens.get(screen_id).and_then(Screen::occupant)
    }

    /// Replace the occupant of a screen, returning the previous one.
    ///
    /// # Errors
    ///
    /// - `RegistryError::UnknownScreen` if the id is not registered
    pub fn set_occupant(
        &mut self,
        screen_id: &str,
        occupant: Option<Occupant>,
    ) -> Result<Option<Occupant>, RegistryError> {
        let screen = self
            .screens
            .get_mut(screen_id)
            .ok_or_else(|| RegistryError::UnknownScreen(screen_id.to_string()))?;
        Ok(std::mem::replace(&mut screen.occupant, occupant))
    }

    /// Screen currently occupied by `session_id`, if any.
    #[must_use]
    pub fn screen_held_by(&self, session_id: SessionId) -> Option<&ScreenId> {
        self.screens
            .iter()
            .find(|(_, screen)| screen.occupant().is_some_and(|o| o.session_id == session_id))
            .map(|(id, _)| id)
    }

    /// All screen ids in order.
    pub fn ids(&self) -> impl Iterator<Item = &ScreenId> {
        self.screens.keys()
    }

    /// All screens in id order.
    pub fn iter(&self) -> impl Iterator<Item = (&ScreenId, &Screen)> {
        self.screens.iter()
    }

    /// Number of screens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.screens.len()
    }

    /// Always `false` for a constructed registry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.screens.is_empty()
    }

    /// Number of occupied screens.
    #[must_use]
    pub fn occupied_count(&self) -> usize {
        self.screens.values().filter(|s| s.is_occupied()).count()
    }

    /// Public snapshot: every screen, occupancy flag and name only.
    #[must_use]
    pub fn snapshot(&self) -> ScreensState {
        self.screens.iter().map(|(id, screen)| (id.0.clone(), screen.status())).collect()
    }
}

impl Default for ScreenRegistry {
    fn default() -> Self {
        Self::with_default_screens()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice(session_id: SessionId) -> Occupant {
        Occupant { session_id, name: "Alice".to_string() }
    }

    #[test]
    fn default_screens_start_free() {
        let registry = ScreenRegistry::with_default_screens();

        assert_eq!(registry.len(), 4);
        assert_eq!(registry.occupied_count(), 0);
        let ids: Vec<_> = registry.ids().map(ScreenId::as_str).collect();
        assert_eq!(ids, ScreenRegistry::DEFAULT_SCREENS);
    }

    #[test]
    fn rejects_bad_configuration() {
        let empty: [&str; 0] = [];
        assert_eq!(ScreenRegistry::new(empty).unwrap_err(), RegistryError::Empty);
        assert_eq!(
            ScreenRegistry::new(["a", "b", "a"]).unwrap_err(),
            RegistryError::DuplicateScreen("a".to_string())
        );
        assert!(matches!(
            ScreenRegistry::new(["lobby/left"]),
            Err(RegistryError::InvalidScreenId(_))
        ));
        assert!(matches!(ScreenRegistry::new([""]), Err(RegistryError::InvalidScreenId(_))));
        assert!(matches!(ScreenRegistry::new(["two words"]), Err(RegistryError::InvalidScreenId(_))));
    }

    #[test]
    fn set_occupant_returns_previous() {
        let mut registry = ScreenRegistry::with_default_screens();

        assert_eq!(registry.set_occupant("screen2", Some(alice(7))).unwrap(), None);
        assert_eq!(registry.occupant_of("screen2"), Some(&alice(7)));
        assert_eq!(registry.screen_held_by(7).map(ScreenId::as_str), Some("screen2"));

        assert_eq!(registry.set_occupant("screen2", None).unwrap(), Some(alice(7)));
        assert_eq!(registry.occupant_of("screen2"), None);
        assert_eq!(registry.screen_held_by(7), None);
    }

    #[test]
    fn unknown_screen_lookups() {
        let mut registry = ScreenRegistry::with_default_screens();

        assert!(!registry.contains("Z"));
        assert_eq!(registry.lookup("Z").unwrap_err(), RegistryError::UnknownScreen("Z".to_string()));
        assert!(registry.set_occupant("Z", Some(alice(1))).is_err());
        assert_eq!(registry.occupied_count(), 0);
    }

    #[test]
    fn snapshot_is_redacted() {
        let mut registry = ScreenRegistry::new(["left", "right"]).unwrap();
        registry.set_occupant("right", Some(alice(99))).unwrap();

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.get("left"), Some(&ScreenStatus::free()));
        assert_eq!(snapshot.get("right"), Some(&ScreenStatus::occupied_by("Alice")));
    }
}
