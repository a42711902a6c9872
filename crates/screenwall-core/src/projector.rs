//! Snapshot fan-out.
//!
//! Every connected session subscribes on connect. Each publication carries a
//! monotonically increasing revision so clients (and tests) can tell stale
//! snapshots from fresh ones. Publications are produced inside the
//! coordinator's critical section, which gives every subscriber the same
//! order.

use std::{collections::BTreeSet, sync::Arc};

use screenwall_proto::payloads::screen::ScreensState;

use crate::{registry::ScreenRegistry, session::SessionId};

/// A snapshot addressed to a set of sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publication {
    /// Revision of the registry this snapshot reflects
    pub revision: u64,
    /// Sessions to deliver to
    pub recipients: Vec<SessionId>,
    /// Shared snapshot, encoded once per recipient by the runtime
    pub snapshot: Arc<ScreensState>,
}

/// Tracks subscribers and the publication revision.
#[derive(Debug, Default)]
pub struct Projector {
    subscribers: BTreeSet<SessionId>,
    revision: u64,
}

impl Projector {
    /// No subscribers, revision 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Project the registry into its public form.
    #[must_use]
    pub fn project(registry: &ScreenRegistry) -> Arc<ScreensState> {
        Arc::new(registry.snapshot())
    }

    /// Add a subscriber. Returns `false` if already subscribed.
    pub fn subscribe(&mut self, session_id: SessionId) -> bool {
        self.subscribers.insert(session_id)
    }

    /// Remove a subscriber. Returns `false` if it was not subscribed.
    pub fn unsubscribe(&mut self, session_id: SessionId) -> bool {
        self.subscribers.remove(&session_id)
    }

    /// Whether `session_id` receives publications.
    #[must_use]
    pub fn is_subscribed(&self, session_id: SessionId) -> bool {
        self.subscribers.contains(&session_id)
    }

    /// Number of subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Revision of the most recent broadcast.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Broadcast a changed snapshot to every subscriber.
    pub fn publish(&mut self, snapshot: Arc<ScreensState>) -> Publication {
        self.revision += 1;
        Publication {
            revision: self.revision,
            recipients: self.subscribers.iter().copied().collect(),
            snapshot,
        }
    }

    /// Current snapshot for a single newcomer.
    ///
    /// Does not bump the revision: nothing changed, one session just needs
    /// to catch up.
    #[must_use]
    pub fn welcome(&self, session_id: SessionId, snapshot: Arc<ScreensState>) -> Publication {
        Publication { revision: self.revision, recipients: vec![session_id], snapshot }
    }
}
