//! Fuzz target for the server driver's event loop
//!
//! # Strategy
//!
//! - Connections open and close in arbitrary order, including duplicates and
//!   closes for sessions that never existed
//! - Well-formed requests (endpoint, claim, release, room join) mixed with
//!   raw frames carrying arbitrary opcodes and payload bytes
//! - A small connection limit so over-capacity closes are exercised
//!
//! # Invariants
//!
//! - `process_event` NEVER panics; bad input yields an error or an error frame
//! - Every outbound frame encodes and decodes back into a payload
//! - Standard invariants hold on the coordinator after every event
//! - Closed sessions never appear in the coordinator

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use screenwall_harness::{InvariantRegistry, SimEnv, SystemSnapshot};
use screenwall_proto::{
    Frame, FrameHeader, Payload,
    payloads::{
        room::JoinRoom,
        screen::{RegisterEndpoint, RequestClaim},
    },
};
use screenwall_server::{DriverConfig, ServerAction, ServerDriver, ServerEvent};

const SESSIONS: u64 = 6;
const SCREENS: [&str; 3] = ["screen1", "screen2", "screen3"];

#[derive(Debug, Arbitrary)]
struct Input {
    seed: u64,
    max_connections: u8,
    events: Vec<Event>,
}

#[derive(Debug, Arbitrary)]
enum Event {
    Connect { session: u8 },
    Close { session: u8 },
    RegisterEndpoint { session: u8, screen: u8 },
    Claim { session: u8, screen: u8, name: Option<String> },
    Release { session: u8 },
    JoinRoom { session: u8, room: u8, user: String },
    Raw { session: u8, opcode: u16, request_id: u32, payload: Vec<u8> },
}

fuzz_target!(|input: Input| {
    let config = DriverConfig {
        max_connections: usize::from(input.max_connections % 8),
        screens: SCREENS.map(String::from).to_vec(),
        ..DriverConfig::default()
    };
    let Ok(mut driver) = ServerDriver::new(SimEnv::with_seed(input.seed), config) else {
        return;
    };
    let invariants = InvariantRegistry::standard();

    for (i, event) in input.events.into_iter().take(256).enumerate() {
        let Some(event) = server_event(event) else { continue };
        let Ok(actions) = driver.process_event(event) else { continue };

        let mut closed = Vec::new();
        for action in actions {
            match action {
                ServerAction::SendToSession { frame, .. }
                | ServerAction::SendToSessions { frame, .. }
                | ServerAction::BroadcastToRoom { frame, .. } => check_outbound(&frame),
                ServerAction::CloseConnection { session_id, .. } => closed.push(session_id),
                ServerAction::Log { .. } => {},
            }
        }

        // The runtime reports every close it performs back to the driver.
        for session_id in closed {
            let _ = driver.process_event(ServerEvent::ConnectionClosed {
                session_id,
                reason: "closed by server".to_string(),
            });
            assert!(driver.coordinator().session(session_id).is_none());
        }

        invariants.assert_all(
            &SystemSnapshot::from_coordinator(driver.coordinator()),
            &format!("after event {i}"),
        );
    }
});

fn session_id(session: u8) -> u64 {
    u64::from(session) % SESSIONS + 1
}

fn screen_id(screen: u8) -> String {
    // One index in four names a screen that is not served.
    SCREENS.get(usize::from(screen % 4)).map_or_else(|| "screen9".to_string(), |s| s.to_string())
}

fn request(session: u8, payload: &Payload) -> Option<ServerEvent> {
    let frame = payload.to_frame().ok()?;
    Some(ServerEvent::FrameReceived { session_id: session_id(session), frame })
}

fn server_event(event: Event) -> Option<ServerEvent> {
    match event {
        Event::Connect { session } => {
            Some(ServerEvent::ConnectionAccepted { session_id: session_id(session) })
        },
        Event::Close { session } => Some(ServerEvent::ConnectionClosed {
            session_id: session_id(session),
            reason: "peer closed".to_string(),
        }),
        Event::RegisterEndpoint { session, screen } => request(
            session,
            &Payload::RegisterEndpoint(RegisterEndpoint { screen_id: screen_id(screen) }),
        ),
        Event::Claim { session, screen, name } => request(
            session,
            &Payload::RequestClaim(RequestClaim { screen_id: screen_id(screen), name }),
        ),
        Event::Release { session } => request(session, &Payload::Release),
        Event::JoinRoom { session, room, user } => request(
            session,
            &Payload::JoinRoom(JoinRoom { room_id: format!("room{}", room % 3), user_id: user }),
        ),
        Event::Raw { session, opcode, request_id, mut payload } => {
            payload.truncate(FrameHeader::MAX_PAYLOAD_SIZE as usize);
            let mut bytes = FrameHeader::new(screenwall_proto::Opcode::Release).to_bytes();
            bytes[6..8].copy_from_slice(&opcode.to_be_bytes());
            bytes[8..12].copy_from_slice(&request_id.to_be_bytes());
            bytes[12..16].copy_from_slice(&(payload.len() as u32).to_be_bytes());

            let mut wire = bytes.to_vec();
            wire.extend_from_slice(&payload);
            let frame = Frame::decode(&wire).ok()?;
            Some(ServerEvent::FrameReceived { session_id: session_id(session), frame })
        },
    }
}

fn check_outbound(frame: &Frame) {
    let wire = match frame.to_bytes() {
        Ok(wire) => wire,
        Err(e) => panic!("outbound frame failed to encode: {e}"),
    };
    let decoded = match Frame::decode(&wire) {
        Ok(decoded) => decoded,
        Err(e) => panic!("outbound frame failed to decode: {e}"),
    };
    assert!(Payload::from_frame(&decoded).is_ok(), "outbound payload undecodable");
}
