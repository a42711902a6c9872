//! Page route resolution.
//!
//! Maps request paths to the pages a front end serves: the overview, one
//! page per screen (the display endpoint), and one page per presence room.
//! Screen pages are validated against the same registry the coordinator
//! allocates from, so a page can never exist for a screen nobody can claim.

use screenwall_core::{ScreenId, ScreenRegistry};

/// A resolvable page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageRoute {
    /// `/`: screen picker
    Overview,
    /// `/screen/{id}`: display endpoint for a screen
    Screen(ScreenId),
    /// `/room/{id}`: presence room
    Room(String),
}

/// Path does not name a page.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouteError {
    /// No such page.
    #[error("not found: {0}")]
    NotFound(String),
}

impl RouteError {
    /// HTTP status code for this error.
    pub fn status(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
        }
    }
}

impl PageRoute {
    /// Resolve a request path.
    ///
    /// Query strings and fragments are ignored, trailing slashes tolerated.
    ///
    /// # Errors
    ///
    /// - `RouteError::NotFound` for unknown paths and screen ids outside
    ///   `screens`
    pub fn resolve(path: &str, screens: &ScreenRegistry) -> Result<Self, RouteError> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let trimmed = path.trim_end_matches('/');
        let not_found = || RouteError::NotFound(path.to_string());

        let segments: Vec<&str> = trimmed.split('/').collect();
        match segments.as_slice() {
            [""] => Ok(Self::Overview),
            ["", "screen", id] => {
                screens.screen_id(id).cloned().map(Self::Screen).ok_or_else(not_found)
            },
            ["", "room", id] if !id.is_empty() => Ok(Self::Room((*id).to_string())),
            _ => Err(not_found()),
        }
    }

    /// Canonical path of this page.
    pub fn path(&self) -> String {
        match self {
            Self::Overview => "/".to_string(),
            Self::Screen(id) => format!("/screen/{id}"),
            Self::Room(id) => format!("/room/{id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn screens() -> ScreenRegistry {
        ScreenRegistry::with_default_screens()
    }

    #[test]
    fn overview() {
        assert_eq!(PageRoute::resolve("/", &screens()), Ok(PageRoute::Overview));
        assert_eq!(PageRoute::resolve("/?lang=cs", &screens()), Ok(PageRoute::Overview));
    }

    #[test]
    fn known_screen() {
        let route = PageRoute::resolve("/screen/screen2", &screens()).unwrap();
        assert_eq!(route, PageRoute::Screen(ScreenId::from("screen2")));
        assert_eq!(route.path(), "/screen/screen2");

        assert_eq!(PageRoute::resolve("/screen/screen2/", &screens()), Ok(route));
    }

    #[test]
    fn unknown_screen_is_404() {
        let err = PageRoute::resolve("/screen/screen9", &screens()).unwrap_err();
        assert_eq!(err, RouteError::NotFound("/screen/screen9".to_string()));
        assert_eq!(err.status(), 404);

        assert!(PageRoute::resolve("/screen/", &screens()).is_err());
    }

    #[test]
    fn rooms_are_free_form() {
        assert_eq!(
            PageRoute::resolve("/room/standup", &screens()),
            Ok(PageRoute::Room("standup".to_string()))
        );
        assert!(PageRoute::resolve("/room/", &screens()).is_err());
    }

    #[test]
    fn anything_else_is_404() {
        for path in ["/screens", "/screen/screen1/extra", "/admin", "screen/screen1"] {
            assert!(PageRoute::resolve(path, &screens()).is_err(), "{path} resolved");
        }
    }
}
