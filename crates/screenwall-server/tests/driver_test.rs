//! Driver tests: events in, frames out.
//!
//! No network. Each test feeds `ServerEvent`s straight into the driver and
//! inspects which frames would reach which session.

use std::collections::HashMap;

use proptest::prelude::*;
use rand::{SeedableRng, seq::SliceRandom};
use rand_chacha::ChaCha8Rng;
use screenwall_harness::SimEnv;
use screenwall_proto::{
    Frame, FrameHeader, Opcode, Payload,
    payloads::{
        ErrorPayload,
        room::{JoinRoom, UserPresence},
        screen::{
            ClaimConfirmed, RegisterEndpoint, RequestClaim, ResourceBusy, ScreenStatus, ScreensState,
        },
    },
};
use screenwall_server::{
    DriverConfig, DriverError, PageRoute, ServerAction, ServerDriver, ServerEvent,
};

type Actions = Vec<ServerAction<tokio::time::Instant>>;

fn driver() -> ServerDriver<SimEnv> {
    ServerDriver::new(SimEnv::with_seed(7), DriverConfig::default()).unwrap()
}

fn frame(payload: Payload, request_id: u32) -> Frame {
    let mut header = FrameHeader::new(payload.opcode());
    header.set_request_id(request_id);
    payload.into_frame(header).unwrap()
}

fn connect(driver: &mut ServerDriver<SimEnv>, session_id: u64) -> Actions {
    driver.process_event(ServerEvent::ConnectionAccepted { session_id }).unwrap()
}

fn send(driver: &mut ServerDriver<SimEnv>, session_id: u64, payload: Payload, request_id: u32) -> Actions {
    driver
        .process_event(ServerEvent::FrameReceived { session_id, frame: frame(payload, request_id) })
        .unwrap()
}

fn close(driver: &mut ServerDriver<SimEnv>, session_id: u64) -> Actions {
    driver
        .process_event(ServerEvent::ConnectionClosed { session_id, reason: "test".to_string() })
        .unwrap()
}

fn claim(screen_id: &str, name: Option<&str>) -> Payload {
    Payload::RequestClaim(RequestClaim {
        screen_id: screen_id.to_string(),
        name: name.map(str::to_string),
    })
}

/// Frames each session would receive, in order.
fn deliveries(driver: &ServerDriver<SimEnv>, actions: &Actions) -> Vec<(u64, Frame)> {
    let mut out = Vec::new();
    for action in actions {
        match action {
            ServerAction::SendToSession { session_id, frame } => out.push((*session_id, frame.clone())),
            ServerAction::SendToSessions { session_ids, frame } => {
                out.extend(session_ids.iter().map(|id| (*id, frame.clone())));
            },
            ServerAction::BroadcastToRoom { room_id, frame, exclude_session } => {
                out.extend(
                    driver
                        .sessions_in_room(room_id)
                        .filter(|id| Some(*id) != *exclude_session)
                        .map(|id| (id, frame.clone())),
                );
            },
            ServerAction::CloseConnection { .. } | ServerAction::Log { .. } => {},
        }
    }
    out
}

fn payloads_for(driver: &ServerDriver<SimEnv>, actions: &Actions, session_id: u64) -> Vec<Payload> {
    deliveries(driver, actions)
        .into_iter()
        .filter(|(id, _)| *id == session_id)
        .map(|(_, frame)| Payload::from_frame(&frame).unwrap())
        .collect()
}

#[test]
fn new_connection_gets_exactly_one_snapshot() {
    let mut driver = driver();
    connect(&mut driver, 1);

    let actions = connect(&mut driver, 2);
    let deliveries = deliveries(&driver, &actions);

    assert_eq!(deliveries.len(), 1);
    assert_eq!(deliveries[0].0, 2);
    let Payload::StateSnapshot(snapshot) = Payload::from_frame(&deliveries[0].1).unwrap() else {
        panic!("expected snapshot");
    };
    assert_eq!(snapshot.len(), 4);
    assert_eq!(snapshot.occupied_count(), 0);
}

#[test]
fn claim_confirms_requester_and_broadcasts() {
    let mut driver = driver();
    for session in 1..=3 {
        connect(&mut driver, session);
    }

    let actions = send(&mut driver, 2, claim("screen1", Some("Alice")), 77);
    let deliveries = deliveries(&driver, &actions);

    let (_, confirm) = deliveries.iter().find(|(id, f)| {
        *id == 2 && f.header.opcode_enum() == Some(Opcode::ClaimConfirmed)
    }).unwrap();
    assert_eq!(confirm.header.request_id(), 77);
    assert_eq!(
        Payload::from_frame(confirm).unwrap(),
        Payload::ClaimConfirmed(ClaimConfirmed { screen_id: "screen1".to_string() })
    );

    for session in 1..=3 {
        let snapshots: Vec<_> = payloads_for(&driver, &actions, session)
            .into_iter()
            .filter_map(|p| match p {
                Payload::StateSnapshot(s) => Some(s),
                _ => None,
            })
            .collect();
        assert_eq!(snapshots.len(), 1, "session {session}");
        assert_eq!(snapshots[0].get("screen1"), Some(&ScreenStatus::occupied_by("Alice")));
    }
}

#[test]
fn busy_and_unknown_reach_requester_only() {
    let mut driver = driver();
    for session in 1..=3 {
        connect(&mut driver, session);
    }
    send(&mut driver, 1, claim("screen1", Some("Alice")), 1);

    let actions = send(&mut driver, 2, claim("screen1", Some("Bob")), 5);
    assert_eq!(payloads_for(&driver, &actions, 2), vec![Payload::ResourceBusy(ResourceBusy {
        screen_id: "screen1".to_string()
    })]);
    assert!(payloads_for(&driver, &actions, 1).is_empty());
    assert!(payloads_for(&driver, &actions, 3).is_empty());

    let actions = send(&mut driver, 3, claim("Z", None), 6);
    assert_eq!(payloads_for(&driver, &actions, 3), vec![Payload::ResourceUnknown]);
    assert_eq!(deliveries(&driver, &actions).len(), 1);
}

#[test]
fn endpoint_claim_gets_busy_reply() {
    let mut driver = driver();
    connect(&mut driver, 1);
    connect(&mut driver, 2);
    send(
        &mut driver,
        1,
        Payload::RegisterEndpoint(RegisterEndpoint { screen_id: "screen1".to_string() }),
        0,
    );

    let actions = send(&mut driver, 1, claim("screen2", Some("Wall")), 12);
    let deliveries = deliveries(&driver, &actions);
    assert_eq!(deliveries.len(), 1);
    let (session_id, reply) = &deliveries[0];
    assert_eq!(*session_id, 1);
    assert_eq!(reply.header.request_id(), 12);
    assert_eq!(
        Payload::from_frame(reply).unwrap(),
        Payload::ResourceBusy(ResourceBusy { screen_id: "screen2".to_string() })
    );
    assert_eq!(driver.snapshot().get("screen2"), Some(&ScreenStatus::free()));
}

#[test]
fn endpoint_disconnect_frees_its_screen() {
    let mut driver = driver();
    for session in 1..=3 {
        connect(&mut driver, session);
    }
    send(
        &mut driver,
        1,
        Payload::RegisterEndpoint(RegisterEndpoint { screen_id: "screen2".to_string() }),
        1,
    );
    send(&mut driver, 2, claim("screen2", Some("Alice")), 2);

    let actions = close(&mut driver, 1);
    let snapshots = payloads_for(&driver, &actions, 3);
    assert_eq!(snapshots.len(), 1);
    let Payload::StateSnapshot(snapshot) = &snapshots[0] else { panic!("expected snapshot") };
    assert_eq!(snapshot.get("screen2"), Some(&ScreenStatus::free()));

    // The former occupant's release is stale and publishes nothing.
    let actions = send(&mut driver, 2, Payload::Release, 3);
    assert!(deliveries(&driver, &actions).is_empty());
}

#[test]
fn undecodable_payload_gets_error_frame() {
    let mut driver = driver();
    connect(&mut driver, 1);

    let garbage = Frame::new(
        {
            let mut header = FrameHeader::new(Opcode::RequestClaim);
            header.set_request_id(9);
            header
        },
        vec![0xFF, 0x00],
    );
    let actions =
        driver.process_event(ServerEvent::FrameReceived { session_id: 1, frame: garbage }).unwrap();

    let deliveries = deliveries(&driver, &actions);
    assert_eq!(deliveries.len(), 1);
    assert_eq!(deliveries[0].1.header.request_id(), 9);
    let Payload::Error(error) = Payload::from_frame(&deliveries[0].1).unwrap() else {
        panic!("expected error frame");
    };
    assert_eq!(error.code, ErrorPayload::INVALID_PAYLOAD);
    assert_eq!(driver.snapshot().occupied_count(), 0);
}

#[test]
fn server_opcodes_from_clients_are_rejected() {
    let mut driver = driver();
    connect(&mut driver, 1);

    let actions = send(&mut driver, 1, Payload::ResourceUnknown, 4);
    let payloads = payloads_for(&driver, &actions, 1);
    assert!(matches!(
        payloads.as_slice(),
        [Payload::Error(ErrorPayload { code: ErrorPayload::UNEXPECTED_OPCODE, .. })]
    ));
}

#[test]
fn frames_from_unknown_sessions_fail() {
    let mut driver = driver();
    let result = driver.process_event(ServerEvent::FrameReceived {
        session_id: 99,
        frame: frame(Payload::Release, 0),
    });
    assert!(matches!(result, Err(DriverError::SessionNotFound(99))));
}

#[test]
fn over_capacity_connection_is_closed() {
    let config = DriverConfig { max_connections: 1, ..DriverConfig::default() };
    let mut driver = ServerDriver::new(SimEnv::with_seed(1), config).unwrap();
    connect(&mut driver, 1);

    let actions = connect(&mut driver, 2);
    assert!(actions.iter().any(|a| matches!(a, ServerAction::CloseConnection { session_id: 2, .. })));
    assert_eq!(driver.connection_count(), 1);

    // The runtime reports the close later; nothing to clean up.
    let closed = close(&mut driver, 2);
    assert!(deliveries(&driver, &closed).is_empty());
}

#[test]
fn room_presence_is_relayed() {
    let mut driver = driver();
    for session in 1..=3 {
        connect(&mut driver, session);
    }
    let join = |room: &str, user: &str| {
        Payload::JoinRoom(JoinRoom { room_id: room.to_string(), user_id: user.to_string() })
    };

    send(&mut driver, 1, join("standup", "alice"), 1);
    let actions = send(&mut driver, 2, join("standup", "bob"), 1);
    assert_eq!(payloads_for(&driver, &actions, 1), vec![Payload::UserConnected(UserPresence {
        room_id: "standup".to_string(),
        user_id: "bob".to_string(),
    })]);
    assert!(payloads_for(&driver, &actions, 2).is_empty());
    assert!(payloads_for(&driver, &actions, 3).is_empty());

    let actions = close(&mut driver, 2);
    assert_eq!(payloads_for(&driver, &actions, 1), vec![Payload::UserDisconnected(UserPresence {
        room_id: "standup".to_string(),
        user_id: "bob".to_string(),
    })]);
    // Rooms never carry the screen snapshot.
    assert!(payloads_for(&driver, &actions, 3).is_empty());
}

#[test]
fn page_routes_follow_configured_screens() {
    let config = DriverConfig { screens: vec!["left".to_string(), "right".to_string()], ..DriverConfig::default() };
    let driver = ServerDriver::new(SimEnv::with_seed(1), config).unwrap();

    assert!(matches!(driver.resolve_page("/screen/left"), Ok(PageRoute::Screen(_))));
    assert_eq!(driver.resolve_page("/screen/screen1").unwrap_err().status(), 404);
}

#[test]
fn invalid_screen_config_is_rejected() {
    let config = DriverConfig { screens: vec![], ..DriverConfig::default() };
    assert!(matches!(
        ServerDriver::new(SimEnv::with_seed(1), config),
        Err(DriverError::Registry(_))
    ));
}

#[test]
fn claim_storm_has_one_winner() {
    for seed in 0..16 {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut driver = driver();
        let mut sessions: Vec<u64> = (1..=8).collect();
        for session in &sessions {
            connect(&mut driver, *session);
        }
        sessions.shuffle(&mut rng);

        let mut confirmed = Vec::new();
        for session in &sessions {
            let actions = send(&mut driver, *session, claim("screen3", None), 0);
            if payloads_for(&driver, &actions, *session)
                .iter()
                .any(|p| matches!(p, Payload::ClaimConfirmed(_)))
            {
                confirmed.push(*session);
            }
        }

        assert_eq!(confirmed, vec![sessions[0]], "seed {seed}");
        assert_eq!(
            driver.coordinator().registry().occupant_of("screen3").map(|o| o.session_id),
            Some(sessions[0])
        );
    }
}

#[derive(Debug, Clone)]
enum Step {
    Connect(u64),
    Close(u64),
    Endpoint(u64, usize),
    Claim(u64, usize),
    Release(u64),
}

fn step_strategy() -> impl Strategy<Value = Step> {
    let session = 1..6u64;
    let screen = 0..5usize;
    prop_oneof![
        2 => session.clone().prop_map(Step::Connect),
        1 => session.clone().prop_map(Step::Close),
        1 => (session.clone(), screen.clone()).prop_map(|(s, i)| Step::Endpoint(s, i)),
        4 => (session.clone(), screen).prop_map(|(s, i)| Step::Claim(s, i)),
        2 => session.prop_map(Step::Release),
    ]
}

fn screen_at(index: usize) -> String {
    // Index 4 is never served.
    format!("screen{}", index + 1)
}

proptest! {
    /// Whatever happens, every live session's latest snapshot is the
    /// driver's current state.
    #[test]
    fn prop_live_sessions_see_current_state(steps in prop::collection::vec(step_strategy(), 1..60)) {
        let mut driver = driver();
        let mut latest: HashMap<u64, ScreensState> = HashMap::new();

        for step in steps {
            let (session_id, event) = match step {
                Step::Connect(id) => (id, ServerEvent::ConnectionAccepted { session_id: id }),
                Step::Close(id) => {
                    (id, ServerEvent::ConnectionClosed { session_id: id, reason: "gone".to_string() })
                },
                Step::Endpoint(id, i) => (id, ServerEvent::FrameReceived {
                    session_id: id,
                    frame: frame(Payload::RegisterEndpoint(RegisterEndpoint { screen_id: screen_at(i) }), 0),
                }),
                Step::Claim(id, i) => (id, ServerEvent::FrameReceived {
                    session_id: id,
                    frame: frame(claim(&screen_at(i), Some("Alice")), 0),
                }),
                Step::Release(id) => (id, ServerEvent::FrameReceived {
                    session_id: id,
                    frame: frame(Payload::Release, 0),
                }),
            };

            let Ok(actions) = driver.process_event(event) else { continue };
            if !driver.has_session(session_id) {
                latest.remove(&session_id);
            }

            for (recipient, frame) in deliveries(&driver, &actions) {
                if let Ok(Payload::StateSnapshot(state)) = Payload::from_frame(&frame) {
                    latest.insert(recipient, state);
                }
            }
        }

        let current = driver.snapshot();
        for (session_id, state) in &latest {
            prop_assert!(driver.has_session(*session_id));
            prop_assert_eq!(state, &current, "session {}", session_id);
        }
    }
}
