//! Screen occupancy messages.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Bind the sending connection as the display endpoint of a screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterEndpoint {
    /// Screen the connection displays
    pub screen_id: String,
}

/// Ask to occupy a screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestClaim {
    /// Screen to occupy
    pub screen_id: String,
    /// Display name shown to everyone while the claim lasts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Claim succeeded; the requester now occupies `screen_id`.
///
/// The screen id doubles as the stable peer identifier of the display
/// endpoint on the media relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimConfirmed {
    /// Screen now occupied by the requester
    pub screen_id: String,
}

/// Claim refused because the screen is occupied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceBusy {
    /// Screen that was requested
    pub screen_id: String,
}

/// Public view of one screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenStatus {
    /// Whether someone occupies the screen
    pub occupied: bool,
    /// Occupant display name. Absent when free.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ScreenStatus {
    /// Status of an unoccupied screen.
    #[must_use]
    pub fn free() -> Self {
        Self { occupied: false, name: None }
    }

    /// Status of a screen occupied by `name`.
    pub fn occupied_by(name: impl Into<String>) -> Self {
        Self { occupied: true, name: Some(name.into()) }
    }
}

/// Redacted occupancy snapshot broadcast to every connection.
///
/// Serialized as a plain map `screen_id -> status`. Occupant session ids are
/// never included.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScreensState {
    screens: BTreeMap<String, ScreenStatus>,
}

impl ScreensState {
    /// Empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the status of a screen.
    pub fn insert(&mut self, screen_id: impl Into<String>, status: ScreenStatus) {
        self.screens.insert(screen_id.into(), status);
    }

    /// Status of a screen. `None` if the screen is not part of the snapshot.
    #[must_use]
    pub fn get(&self, screen_id: &str) -> Option<&ScreenStatus> {
        self.screens.get(screen_id)
    }

    /// All screens in id order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ScreenStatus)> {
        self.screens.iter().map(|(id, status)| (id.as_str(), status))
    }

    /// Number of screens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.screens.len()
    }

    /// Whether the snapshot lists no screens.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.screens.is_empty()
    }

    /// Number of occupied screens.
    #[must_use]
    pub fn occupied_count(&self) -> usize {
        self.screens.values().filter(|s| s.occupied).count()
    }
}

impl FromIterator<(String, ScreenStatus)> for ScreensState {
    fn from_iter<T: IntoIterator<Item = (String, ScreenStatus)>>(iter: T) -> Self {
        Self { screens: iter.into_iter().collect() }
    }
}
