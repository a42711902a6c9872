//! Property-based tests for the allocation coordinator.
//!
//! Random operation sequences over a small pool of sessions and screens so
//! collisions (double claims, stale releases, endpoint loss) are frequent.

use std::collections::BTreeSet;

use proptest::prelude::*;
use screenwall_core::{
    AllocationAction, AllocationError, Coordinator, CoordinatorConfig, Reply, ScreenRegistry,
    SessionRole,
};

const SCREENS: [&str; 3] = ["screen1", "screen2", "screen3"];

#[derive(Debug, Clone)]
enum Op {
    Connect(u64),
    Disconnect(u64),
    RegisterEndpoint(u64, usize),
    Claim(u64, usize),
    ClaimUnknown(u64),
    Release(u64),
}

fn arb_op() -> impl Strategy<Value = Op> {
    let session = 0u64..6;
    let screen = 0usize..SCREENS.len();
    prop_oneof![
        3 => session.clone().prop_map(Op::Connect),
        1 => session.clone().prop_map(Op::Disconnect),
        1 => (session.clone(), screen.clone()).prop_map(|(s, r)| Op::RegisterEndpoint(s, r)),
        4 => (session.clone(), screen).prop_map(|(s, r)| Op::Claim(s, r)),
        1 => session.clone().prop_map(Op::ClaimUnknown),
        2 => session.prop_map(Op::Release),
    ]
}

fn apply(coordinator: &mut Coordinator, op: &Op) -> Result<Vec<AllocationAction>, AllocationError> {
    match *op {
        Op::Connect(s) => coordinator.connect(s),
        Op::Disconnect(s) => coordinator.disconnect(s),
        Op::RegisterEndpoint(s, r) => coordinator.register_endpoint(s, SCREENS[r]),
        Op::Claim(s, r) => coordinator.request_claim(s, SCREENS[r], Some("guest")),
        Op::ClaimUnknown(s) => coordinator.request_claim(s, "nowhere", None),
        Op::Release(s) => coordinator.release(s),
    }
}

fn check_state(coordinator: &Coordinator) -> Result<(), TestCaseError> {
    let mut holders = BTreeSet::new();
    for (screen, slot) in coordinator.registry().iter() {
        let Some(occupant) = slot.occupant() else { continue };

        // Occupant is a live claimant of exactly this screen.
        let session = coordinator.session(occupant.session_id);
        prop_assert!(session.is_some(), "{screen} occupied by dead session");
        prop_assert_eq!(session.map(|s| s.role().clone()), Some(SessionRole::Claimant(screen.clone())));

        // Nobody holds two screens.
        prop_assert!(holders.insert(occupant.session_id), "session holds two screens");
    }
    Ok(())
}

proptest! {
    /// Property: occupancy always matches live claimant sessions
    #[test]
    fn prop_occupants_are_live_claimants(ops in prop::collection::vec(arb_op(), 0..60)) {
        let mut coordinator =
            Coordinator::new(ScreenRegistry::new(SCREENS)?, CoordinatorConfig::default());

        for op in &ops {
            let _ = apply(&mut coordinator, op);
            check_state(&coordinator)?;
        }
    }

    /// Property: a broadcast happens exactly when the snapshot changes
    #[test]
    fn prop_publish_iff_snapshot_changed(ops in prop::collection::vec(arb_op(), 0..60)) {
        let mut coordinator =
            Coordinator::new(ScreenRegistry::new(SCREENS)?, CoordinatorConfig::default());

        for op in &ops {
            let before = coordinator.snapshot();
            let revision = coordinator.projector().revision();
            let Ok(actions) = apply(&mut coordinator, op) else { continue };

            let broadcasts: Vec<_> = actions
                .iter()
                .filter_map(|a| match a {
                    AllocationAction::Publish(p) if p.revision > revision => Some(p),
                    _ => None,
                })
                .collect();

            let changed = coordinator.snapshot() != before;
            prop_assert_eq!(broadcasts.len(), usize::from(changed), "op {:?}", op);
            if let Some(publication) = broadcasts.first() {
                prop_assert_eq!(publication.revision, revision + 1);
                prop_assert_eq!(publication.snapshot.as_ref(), &coordinator.snapshot());

                let live: Vec<_> = {
                    let mut ids: Vec<_> = coordinator.sessions().map(|s| s.id()).collect();
                    ids.sort_unstable();
                    ids
                };
                prop_assert_eq!(&publication.recipients, &live);
            }
        }
    }

    /// Property: two claims on one free screen yield one confirmation and one busy
    #[test]
    fn prop_claim_race_has_single_winner(first in 0u64..100, second in 100u64..200, screen in 0usize..3) {
        let mut coordinator =
            Coordinator::new(ScreenRegistry::new(SCREENS)?, CoordinatorConfig::default());
        coordinator.connect(first)?;
        coordinator.connect(second)?;

        let mut replies = Vec::new();
        for session in [first, second] {
            for action in coordinator.request_claim(session, SCREENS[screen], None)? {
                if let AllocationAction::Reply { reply, .. } = action {
                    replies.push(reply);
                }
            }
        }

        prop_assert_eq!(replies.len(), 2);
        prop_assert!(matches!(replies[0], Reply::ClaimConfirmed(_)));
        prop_assert!(matches!(replies[1], Reply::ResourceBusy(_)));
        prop_assert_eq!(coordinator.registry().occupied_count(), 1);
        prop_assert_eq!(
            coordinator.registry().occupant_of(SCREENS[screen]).map(|o| o.session_id),
            Some(first)
        );
    }

    /// Property: replies only ever go to the session that asked
    #[test]
    fn prop_replies_target_requester(ops in prop::collection::vec(arb_op(), 0..60)) {
        let mut coordinator =
            Coordinator::new(ScreenRegistry::new(SCREENS)?, CoordinatorConfig::default());

        for op in &ops {
            let requester = match *op {
                Op::Connect(s)
                | Op::Disconnect(s)
                | Op::RegisterEndpoint(s, _)
                | Op::Claim(s, _)
                | Op::ClaimUnknown(s)
                | Op::Release(s) => s,
            };
            let Ok(actions) = apply(&mut coordinator, op) else { continue };
            for action in actions {
                if let AllocationAction::Reply { session_id, .. } = action {
                    prop_assert_eq!(session_id, requester);
                }
            }
        }
    }
}
