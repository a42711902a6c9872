//! Fuzz target comparing the coordinator against the reference model
//!
//! # Strategy
//!
//! - Arbitrary sequences of connect, disconnect, endpoint registration,
//!   claim and release across a handful of clients
//! - Screen indices past the served set hit an unknown screen
//! - Names include blank ones that fall back to the placeholder
//!
//! # Invariants
//!
//! - Every operation yields the same result in model and coordinator
//! - Occupancy, roles and revision match after every operation
//! - Standard invariants hold on the coordinator after every operation
//! - NEVER panic inside the coordinator

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use screenwall_core::{
    AllocationAction, AllocationError, Coordinator, CoordinatorConfig, Reply, ScreenRegistry,
    SessionRole,
};
use screenwall_harness::{
    ClientId, InvariantRegistry, ModelName, ModelRole, ModelWorld, Operation, OperationError,
    OperationResult, SystemSnapshot,
    model::{MODEL_SCREENS, screen_name},
};

const NUM_CLIENTS: usize = 4;
const SESSION_OFFSET: u64 = 1_000;

#[derive(Debug, Arbitrary)]
struct Scenario {
    operations: Vec<Operation>,
}

fuzz_target!(|scenario: Scenario| {
    let Ok(registry) = ScreenRegistry::new(MODEL_SCREENS) else {
        return;
    };
    let mut coordinator = Coordinator::new(registry, CoordinatorConfig::default());
    let mut model = ModelWorld::new(NUM_CLIENTS);
    let invariants = InvariantRegistry::standard();

    for (i, op) in scenario.operations.iter().take(256).enumerate() {
        let expected = model.apply(op);
        let actual = apply(&mut coordinator, op);
        assert_eq!(expected, actual, "result divergence at {i}: {op:?}");

        let state = model.observable_state();
        for (index, screen) in MODEL_SCREENS.iter().enumerate() {
            let occupant = coordinator.registry().occupant_of(screen).map(|o| {
                ((o.session_id - SESSION_OFFSET) as ClientId, o.name.clone())
            });
            assert_eq!(state.occupants[index], occupant, "occupant divergence at {i}: {op:?}");
        }
        for (client, role) in state.roles.iter().enumerate() {
            let real = coordinator.session(session(client as ClientId)).map(|s| model_role(s.role()));
            assert_eq!(*role, real, "role divergence at {i}: {op:?}");
        }
        assert_eq!(state.revision, coordinator.projector().revision());

        invariants.assert_all(&SystemSnapshot::from_coordinator(&coordinator), &format!("at {i}"));
    }
});

fn session(client_id: ClientId) -> u64 {
    u64::from(client_id) + SESSION_OFFSET
}

fn apply(coordinator: &mut Coordinator, op: &Operation) -> OperationResult {
    let client_id = op.client_id();
    if usize::from(client_id) >= NUM_CLIENTS {
        return OperationResult::Error(OperationError::InvalidClient);
    }
    let session_id = session(client_id);

    let result = match op {
        Operation::Connect { .. } => coordinator.connect(session_id),
        Operation::Disconnect { .. } => coordinator.disconnect(session_id),
        Operation::RegisterEndpoint { screen, .. } => {
            coordinator.register_endpoint(session_id, screen_name(*screen))
        },
        Operation::Claim { screen, name, .. } => coordinator.request_claim(
            session_id,
            screen_name(*screen),
            name.map(ModelName::as_str),
        ),
        Operation::Release { .. } => coordinator.release(session_id),
    };

    match result {
        Ok(actions) => classify(&actions),
        Err(AllocationError::SessionNotFound(_)) => {
            OperationResult::Error(OperationError::NotConnected)
        },
        Err(AllocationError::SessionAlreadyExists(_)) => {
            OperationResult::Error(OperationError::AlreadyConnected)
        },
        Err(e) => panic!("unexpected coordinator error: {e}"),
    }
}

fn classify(actions: &[AllocationAction]) -> OperationResult {
    for action in actions {
        match action {
            AllocationAction::Reply { reply: Reply::ClaimConfirmed(_), .. } => {
                return OperationResult::Confirmed;
            },
            AllocationAction::Reply { reply: Reply::ResourceBusy(_), .. } => {
                return OperationResult::Busy;
            },
            AllocationAction::Reply { reply: Reply::ResourceUnknown, .. } => {
                return OperationResult::Unknown;
            },
            AllocationAction::Ignored { .. } => return OperationResult::Ignored,
            _ => {},
        }
    }
    OperationResult::Ok
}

fn model_role(role: &SessionRole) -> ModelRole {
    let index = |screen: &str| MODEL_SCREENS.iter().position(|s| *s == screen);
    match role {
        SessionRole::Unassigned => ModelRole::Unassigned,
        SessionRole::Endpoint(screen) => {
            index(screen.as_str()).map_or(ModelRole::Unassigned, ModelRole::Endpoint)
        },
        SessionRole::Claimant(screen) => {
            index(screen.as_str()).map_or(ModelRole::Unassigned, ModelRole::Claimant)
        },
    }
}
