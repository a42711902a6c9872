//! Standard invariant checks.
//!
//! These invariants capture behavioral properties that must always hold.
//! They verify WHAT must be true, not specific test scenarios.

use std::collections::{BTreeMap, HashMap};

use screenwall_core::SessionRole;
use screenwall_proto::payloads::screen::ScreensState;

use super::{Invariant, InvariantResult, SystemSnapshot, Violation};

/// Every occupant is a live claimant of the screen it occupies.
///
/// An occupant whose session is gone, or whose role points elsewhere, means
/// a disconnect or relocation forgot to free a screen.
pub struct OccupantIsClaimant;

impl Invariant for OccupantIsClaimant {
    fn name(&self) -> &'static str {
        "occupant_is_claimant"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        let Some(server) = &state.server else { return Ok(()) };

        for (screen, (session_id, _)) in &server.occupants {
            match server.roles.get(session_id) {
                Some(SessionRole::Claimant(claimed)) if claimed.as_str() == screen.as_str() => {},
                role => {
                    return Err(Violation {
                        invariant: self.name(),
                        message: format!(
                            "{screen} occupied by session {session_id} with role {role:?}"
                        ),
                    });
                },
            }
        }
        Ok(())
    }
}

/// No session occupies two screens at once.
pub struct SingleScreenPerClaimant;

impl Invariant for SingleScreenPerClaimant {
    fn name(&self) -> &'static str {
        "single_screen_per_claimant"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        let Some(server) = &state.server else { return Ok(()) };

        let mut held: HashMap<u64, &str> = HashMap::new();
        for (screen, (session_id, _)) in &server.occupants {
            if let Some(other) = held.insert(*session_id, screen) {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!("session {session_id} occupies both {other} and {screen}"),
                });
            }
        }
        Ok(())
    }
}

/// Each client sees strictly increasing revisions.
///
/// A repeated or decreasing revision means snapshots were delivered out of
/// publication order, or one state change was published twice.
pub struct RevisionMonotonicity;

impl Invariant for RevisionMonotonicity {
    fn name(&self) -> &'static str {
        "revision_monotonicity"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for client in &state.clients {
            for window in client.history.windows(2) {
                if window[1].0 <= window[0].0 {
                    return Err(Violation {
                        invariant: self.name(),
                        message: format!(
                            "client {}: revision {} followed by {}",
                            client.id, window[0].0, window[1].0
                        ),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Clients that saw the same revision saw the same occupancy.
pub struct ConvergedViews;

impl Invariant for ConvergedViews {
    fn name(&self) -> &'static str {
        "converged_views"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        let mut seen: BTreeMap<u64, (u64, &ScreensState)> = BTreeMap::new();

        for client in &state.clients {
            for (revision, snapshot) in &client.history {
                match seen.get(revision) {
                    Some((first_client, first)) if *first != snapshot => {
                        return Err(Violation {
                            invariant: self.name(),
                            message: format!(
                                "revision {revision}: client {first_client} saw {first:?}, client {} saw {snapshot:?}",
                                client.id
                            ),
                        });
                    },
                    Some(_) => {},
                    None => {
                        seen.insert(*revision, (client.id, snapshot));
                    },
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use screenwall_core::ScreenId;
    use screenwall_proto::payloads::screen::ScreenStatus;

    use super::*;
    use crate::invariants::{ClientSnapshot, ServerSnapshot};

    fn state(occupied: &[(&str, &str)]) -> ScreensState {
        let mut state = ScreensState::new();
        for screen in ["screen1", "screen2"] {
            state.insert(screen, ScreenStatus::free());
        }
        for (screen, name) in occupied {
            state.insert(*screen, ScreenStatus::occupied_by(*name));
        }
        state
    }

    fn server(occupants: &[(&str, u64)], roles: &[(u64, SessionRole)]) -> SystemSnapshot {
        let server = ServerSnapshot {
            occupants: occupants
                .iter()
                .map(|(screen, session)| ((*screen).to_string(), (*session, "x".to_string())))
                .collect(),
            roles: roles.iter().cloned().collect(),
            published: ScreensState::new(),
        };
        SystemSnapshot { server: Some(server), clients: Vec::new() }
    }

    #[test]
    fn occupant_without_session_violates() {
        let snapshot = server(&[("screen1", 5)], &[]);
        let violation = OccupantIsClaimant.check(&snapshot).unwrap_err();
        assert_eq!(violation.invariant, "occupant_is_claimant");
    }

    #[test]
    fn occupant_with_matching_role_passes() {
        let snapshot =
            server(&[("screen1", 5)], &[(5, SessionRole::Claimant(ScreenId::new("screen1")))]);
        assert!(OccupantIsClaimant.check(&snapshot).is_ok());

        let moved =
            server(&[("screen1", 5)], &[(5, SessionRole::Claimant(ScreenId::new("screen2")))]);
        assert!(OccupantIsClaimant.check(&moved).is_err());
    }

    #[test]
    fn double_occupancy_violates() {
        let snapshot = server(&[("screen1", 5), ("screen2", 5)], &[]);
        assert!(SingleScreenPerClaimant.check(&snapshot).is_err());
    }

    #[test]
    fn repeated_revision_violates() {
        let client = ClientSnapshot::new(1).with_history([(0, state(&[])), (0, state(&[]))]);
        let snapshot = SystemSnapshot::from_clients(vec![client]);
        assert!(RevisionMonotonicity.check(&snapshot).is_err());
    }

    #[test]
    fn diverging_views_violate() {
        let a = ClientSnapshot::new(1).with_history([(1, state(&[("screen1", "Alice")]))]);
        let b = ClientSnapshot::new(2).with_history([(1, state(&[("screen1", "Bob")]))]);
        let snapshot = SystemSnapshot::from_clients(vec![a, b]);

        let violation = ConvergedViews.check(&snapshot).unwrap_err();
        assert!(violation.message.contains("revision 1"));
    }

    #[test]
    fn matching_views_pass() {
        let a = ClientSnapshot::new(1)
            .with_history([(0, state(&[])), (1, state(&[("screen1", "Alice")]))]);
        let b = ClientSnapshot::new(2).with_history([(1, state(&[("screen1", "Alice")]))]);
        let snapshot = SystemSnapshot::from_clients(vec![a, b]);

        assert!(ConvergedViews.check(&snapshot).is_ok());
        assert!(RevisionMonotonicity.check(&snapshot).is_ok());
    }
}
