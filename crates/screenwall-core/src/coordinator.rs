//! Allocation coordinator.
//!
//! Owns the registry, the sessions and the projector. Each operation runs to
//! completion against `&mut self`, so a claim's check-then-set can never
//! interleave with another claim, and every state change produces exactly one
//! [`Publication`] in the order the changes happened.
//!
//! # Screen lifecycle
//!
//! ```text
//!          request-claim (free)
//!   Free ─────────────────────────▶ Occupied(session, name)
//!    ▲                                  │
//!    │  release by occupant             │
//!    │  occupant disconnects            │
//!    │  endpoint disconnects            │
//!    │  occupant claims another screen  │
//!    └──────────────────────────────────┘
//! ```
//!
//! Requests that no longer match current occupancy (double release, release
//! after the endpoint already freed the screen) are reported as
//! [`AllocationAction::Ignored`] and change nothing.

use std::collections::HashMap;

use screenwall_proto::payloads::screen::ScreensState;

use crate::{
    error::AllocationError,
    projector::{Projector, Publication},
    registry::{Occupant, ScreenId, ScreenRegistry},
    session::{Session, SessionId, SessionRole},
};

/// Coordinator settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Name shown for claimants that did not give one
    pub placeholder_name: String,
}

impl CoordinatorConfig {
    /// Default placeholder label.
    pub const DEFAULT_PLACEHOLDER_NAME: &'static str = "Participant";
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self { placeholder_name: Self::DEFAULT_PLACEHOLDER_NAME.to_string() }
    }
}

/// Direct answer to a claim request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Requester now occupies the screen
    ClaimConfirmed(ScreenId),
    /// Screen already occupied
    ResourceBusy(ScreenId),
    /// No such screen
    ResourceUnknown,
}

/// Why an occupant lost its screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseCause {
    /// Occupant released explicitly
    Released,
    /// Occupant's connection closed
    ClaimantDisconnected,
    /// The screen's display endpoint went away
    EndpointDisconnected,
    /// Occupant claimed another screen or became an endpoint
    Relocated,
}

/// Side effects of a coordinator operation.
///
/// `Reply` and `Publish` must reach the network; the rest are for logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllocationAction {
    /// Send an answer to one session
    Reply {
        /// Requesting session
        session_id: SessionId,
        /// Answer
        reply: Reply,
    },

    /// Deliver a snapshot to its recipients
    Publish(Publication),

    /// A claim was committed
    Claimed {
        /// Screen now occupied
        screen: ScreenId,
        /// New occupant
        session_id: SessionId,
        /// Published display name
        name: String,
    },

    /// A screen became free
    Freed {
        /// Screen now free
        screen: ScreenId,
        /// Occupant that was removed
        occupant: Occupant,
        /// What triggered it
        cause: ReleaseCause,
    },

    /// A session became a screen's display endpoint
    EndpointRegistered {
        /// Screen displayed
        screen: ScreenId,
        /// Endpoint session
        session_id: SessionId,
    },

    /// Claim answered as busy because the requester may not claim at all
    Refused {
        /// Session that sent it
        session_id: SessionId,
        /// Why it was refused
        reason: AllocationError,
    },

    /// Request dropped without a reply
    Ignored {
        /// Session that sent it
        session_id: SessionId,
        /// Why it was dropped
        reason: AllocationError,
    },
}

/// Serializes every allocation decision.
#[derive(Debug)]
pub struct Coordinator {
    registry: ScreenRegistry,
    sessions: HashMap<SessionId, Session>,
    projector: Projector,
    config: CoordinatorConfig,
}

impl Coordinator {
    /// Coordinator over `registry` with no sessions.
    #[must_use]
    pub fn new(registry: ScreenRegistry, config: CoordinatorConfig) -> Self {
        Self { registry, sessions: HashMap::new(), projector: Projector::new(), config }
    }

    /// Register a new connection and push it the current snapshot.
    ///
    /// # Errors
    ///
    /// - `AllocationError::SessionAlreadyExists` if the id is live
    pub fn connect(&mut self, session_id: SessionId) -> Result<Vec<AllocationAction>, AllocationError> {
        if self.sessions.contains_key(&session_id) {
            return Err(AllocationError::SessionAlreadyExists(session_id));
        }

        self.sessions.insert(session_id, Session::new(session_id));
        self.projector.subscribe(session_id);

        let snapshot = Projector::project(&self.registry);
        Ok(vec![AllocationAction::Publish(self.projector.welcome(session_id, snapshot))])
    }

    /// Bind a session as the display endpoint of `screen_id`.
    ///
    /// Unknown screens are ignored. A claimant that registers gives up the
    /// screen it holds first.
    ///
    /// # Errors
    ///
    /// - `AllocationError::SessionNotFound` if the session is not connected
    pub fn register_endpoint(
        &mut self,
        session_id: SessionId,
        screen_id: &str,
    ) -> Result<Vec<AllocationAction>, AllocationError> {
        let session =
            self.sessions.get_mut(&session_id).ok_or(AllocationError::SessionNotFound(session_id))?;

        let Some(screen) = self.registry.screen_id(screen_id).cloned() else {
            return Ok(vec![AllocationAction::Ignored {
                session_id,
                reason: AllocationError::UnknownScreen(screen_id.to_string()),
            }]);
        };

        let mut actions = Vec::new();
        let mut changed = false;
        if let SessionRole::Claimant(held) = session.role() {
            let held = held.clone();
            if let Some(occupant) = free_if_held(&mut self.registry, &held, session_id)? {
                actions.push(AllocationAction::Freed {
                    screen: held,
                    occupant,
                    cause: ReleaseCause::Relocated,
                });
                changed = true;
            }
        }

        session.mark_as_endpoint(&self.registry, screen.as_str());
        actions.push(AllocationAction::EndpointRegistered { screen, session_id });

        if changed {
            actions.push(AllocationAction::Publish(self.publish()));
        }
        Ok(actions)
    }

    /// Try to occupy `screen_id` on behalf of a session.
    ///
    /// Unknown and busy screens are answered to the requester only, and so
    /// is a claim from a display endpoint, which is always busy. On
    /// success the requester gets a confirmation and every subscriber gets the
    /// new snapshot. A claimant that already holds another screen moves: the
    /// old screen is freed in the same step.
    ///
    /// # Errors
    ///
    /// - `AllocationError::SessionNotFound` if the session is not connected
    pub fn request_claim(
        &mut self,
        session_id: SessionId,
        screen_id: &str,
        name: Option<&str>,
    ) -> Result<Vec<AllocationAction>, AllocationError> {
        match self.try_claim(session_id, screen_id, name) {
            Ok(mut actions) => {
                actions.push(AllocationAction::Publish(self.publish()));
                Ok(actions)
            },
            Err(AllocationError::UnknownScreen(_)) => Ok(vec![AllocationAction::Reply {
                session_id,
                reply: Reply::ResourceUnknown,
            }]),
            Err(AllocationError::ScreenBusy(screen)) => Ok(vec![AllocationAction::Reply {
                session_id,
                reply: Reply::ResourceBusy(screen),
            }]),
            Err(AllocationError::EndpointCannotClaim { session_id, screen }) => Ok(vec![
                AllocationAction::Reply { session_id, reply: Reply::ResourceBusy(screen.clone()) },
                AllocationAction::Refused {
                    session_id,
                    reason: AllocationError::EndpointCannotClaim { session_id, screen },
                },
            ]),
            Err(e) => Err(e),
        }
    }

    /// Give up the screen a session occupies.
    ///
    /// No-op (reported as `Ignored`) unless the session still occupies the
    /// screen it claimed.
    ///
    /// # Errors
    ///
    /// - `AllocationError::SessionNotFound` if the session is not connected
    pub fn release(&mut self, session_id: SessionId) -> Result<Vec<AllocationAction>, AllocationError> {
        let session =
            self.sessions.get_mut(&session_id).ok_or(AllocationError::SessionNotFound(session_id))?;

        let SessionRole::Claimant(screen) = session.role().clone() else {
            return Ok(vec![stale(session_id, "no claimed screen")]);
        };

        let Some(occupant) = free_if_held(&mut self.registry, &screen, session_id)? else {
            return Ok(vec![stale(session_id, "screen no longer held")]);
        };
        session.clear();

        Ok(vec![
            AllocationAction::Freed { screen, occupant, cause: ReleaseCause::Released },
            AllocationAction::Publish(self.publish()),
        ])
    }

    /// Remove a closed connection.
    ///
    /// A departing occupant frees its screen. A departing endpoint frees its
    /// screen whoever occupies it. The session is unsubscribed before the
    /// resulting publication.
    ///
    /// # Errors
    ///
    /// - `AllocationError::SessionNotFound` if the session is not connected
    pub fn disconnect(&mut self, session_id: SessionId) -> Result<Vec<AllocationAction>, AllocationError> {
        let session =
            self.sessions.remove(&session_id).ok_or(AllocationError::SessionNotFound(session_id))?;
        self.projector.unsubscribe(session_id);

        let freed = match session.role() {
            SessionRole::Claimant(screen) => free_if_held(&mut self.registry, screen, session_id)?
                .map(|occupant| (screen.clone(), occupant, ReleaseCause::ClaimantDisconnected)),
            SessionRole::Endpoint(screen) => self
                .registry
                .set_occupant(screen.as_str(), None)?
                .map(|occupant| (screen.clone(), occupant, ReleaseCause::EndpointDisconnected)),
            SessionRole::Unassigned => None,
        };

        let Some((screen, occupant, cause)) = freed else {
            return Ok(Vec::new());
        };

        Ok(vec![
            AllocationAction::Freed { screen, occupant, cause },
            AllocationAction::Publish(self.publish()),
        ])
    }

    /// Screen registry.
    #[must_use]
    pub fn registry(&self) -> &ScreenRegistry {
        &self.registry
    }

    /// Snapshot fan-out state.
    #[must_use]
    pub fn projector(&self) -> &Projector {
        &self.projector
    }

    /// Settings in use.
    #[must_use]
    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Look up a live session.
    #[must_use]
    pub fn session(&self, session_id: SessionId) -> Option<&Session> {
        self.sessions.get(&session_id)
    }

    /// All live sessions, in no particular order.
    pub fn sessions(&self) -> impl Iterator<Item = &Session> {
        self.sessions.values()
    }

    /// Number of live sessions.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Current public snapshot.
    #[must_use]
    pub fn snapshot(&self) -> ScreensState {
        self.registry.snapshot()
    }

    fn try_claim(
        &mut self,
        session_id: SessionId,
        screen_id: &str,
        name: Option<&str>,
    ) -> Result<Vec<AllocationAction>, AllocationError> {
        let name = self.display_name(name);
        let session =
            self.sessions.get_mut(&session_id).ok_or(AllocationError::SessionNotFound(session_id))?;

        let screen = self
            .registry
            .screen_id(screen_id)
            .cloned()
            .ok_or_else(|| AllocationError::UnknownScreen(screen_id.to_string()))?;

        // Endpoints stay endpoints.
        if session.role().is_endpoint() {
            return Err(AllocationError::EndpointCannotClaim { session_id, screen });
        }

        if self.registry.lookup(screen.as_str())?.is_occupied() {
            return Err(AllocationError::ScreenBusy(screen));
        }

        let mut actions = Vec::new();
        if let SessionRole::Claimant(held) = session.role() {
            let held = held.clone();
            if let Some(occupant) = free_if_held(&mut self.registry, &held, session_id)? {
                actions.push(AllocationAction::Freed {
                    screen: held,
                    occupant,
                    cause: ReleaseCause::Relocated,
                });
            }
        }

        let occupant = Occupant { session_id, name: name.clone() };
        self.registry.set_occupant(screen.as_str(), Some(occupant))?;
        session.mark_as_claimant(screen.clone());

        actions.push(AllocationAction::Claimed { screen: screen.clone(), session_id, name });
        actions.push(AllocationAction::Reply { session_id, reply: Reply::ClaimConfirmed(screen) });
        Ok(actions)
    }

    fn publish(&mut self) -> Publication {
        let snapshot = Projector::project(&self.registry);
        self.projector.publish(snapshot)
    }

    /// Name as sent, or the placeholder when missing or blank.
    fn display_name(&self, name: Option<&str>) -> String {
        match name {
            Some(name) if !name.trim().is_empty() => name.to_string(),
            _ => self.config.placeholder_name.clone(),
        }
    }
}

/// Free `screen` if `session_id` is its occupant.
fn free_if_held(
    registry: &mut ScreenRegistry,
    screen: &ScreenId,
    session_id: SessionId,
) -> Result<Option<Occupant>, AllocationError> {
    if registry.occupant_of(screen.as_str()).is_some_and(|o| o.session_id == session_id) {
        Ok(registry.set_occupant(screen.as_str(), None)?)
    } else {
        Ok(None)
    }
}

fn stale(session_id: SessionId, reason: &'static str) -> AllocationAction {
    AllocationAction::Ignored {
        session_id,
        reason: AllocationError::StaleOperation { session_id, reason },
    }
}
