//! Observable state snapshots for invariant checking.
//!
//! Snapshots capture the observable state of the system at a point in time.
//! Invariants operate on snapshots rather than live state to ensure
//! consistent, atomic checks.

use std::collections::BTreeMap;

use screenwall_core::{Coordinator, SessionId, SessionRole};
use screenwall_proto::payloads::screen::ScreensState;

/// Snapshot of the entire system state.
///
/// Server state is only available when the test owns the coordinator;
/// client histories come from [`SimClient`](crate::SimClient)s.
#[derive(Debug, Clone, Default)]
pub struct SystemSnapshot {
    /// Coordinator state, if captured.
    pub server: Option<ServerSnapshot>,
    /// Per-client observations.
    pub clients: Vec<ClientSnapshot>,
}

impl SystemSnapshot {
    /// Create an empty snapshot (no server, no clients).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Capture a coordinator.
    pub fn from_coordinator(coordinator: &Coordinator) -> Self {
        Self { server: Some(ServerSnapshot::capture(coordinator)), clients: Vec::new() }
    }

    /// Create a snapshot from client observations only.
    pub fn from_clients(clients: Vec<ClientSnapshot>) -> Self {
        Self { server: None, clients }
    }

    /// Add a client snapshot.
    pub fn add_client(&mut self, client: ClientSnapshot) {
        self.clients.push(client);
    }
}

/// Coordinator state at one instant.
#[derive(Debug, Clone, Default)]
pub struct ServerSnapshot {
    /// Screen id → occupant session and display name, occupied screens only.
    pub occupants: BTreeMap<String, (SessionId, String)>,
    /// Live session → role.
    pub roles: BTreeMap<SessionId, SessionRole>,
    /// Public snapshot as it would be published now.
    pub published: ScreensState,
}

impl ServerSnapshot {
    /// Read everything invariants need from `coordinator`.
    pub fn capture(coordinator: &Coordinator) -> Self {
        let occupants = coordinator
            .registry()
            .iter()
            .filter_map(|(id, screen)| {
                screen.occupant().map(|o| (id.to_string(), (o.session_id, o.name.clone())))
            })
            .collect();

        let roles = coordinator.sessions().map(|s| (s.id(), s.role().clone())).collect();

        Self { occupants, roles, published: coordinator.snapshot() }
    }
}

/// What one client saw over its lifetime.
#[derive(Debug, Clone, Default)]
pub struct ClientSnapshot {
    /// Client identifier.
    pub id: u64,
    /// `(revision, state)` per snapshot received, in arrival order.
    pub history: Vec<(u64, ScreensState)>,
}

impl ClientSnapshot {
    /// Create a new client snapshot.
    pub fn new(id: u64) -> Self {
        Self { id, history: Vec::new() }
    }

    /// Set the observed history.
    pub fn with_history(mut self, history: impl IntoIterator<Item = (u64, ScreensState)>) -> Self {
        self.history.extend(history);
        self
    }

    /// Record one received snapshot.
    pub fn record(&mut self, revision: u64, state: ScreensState) {
        self.history.push((revision, state));
    }
}
