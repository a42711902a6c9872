//! End-to-end scenarios over the simulated network.
//!
//! Clients coordinate through a shared step counter so each scenario runs in
//! a fixed order regardless of network scheduling.

use std::{
    io,
    sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    },
    time::Duration,
};

use screenwall_harness::{SimClient, SimServer};
use screenwall_proto::{
    Frame, FrameHeader, Opcode, Payload,
    payloads::{
        ErrorPayload,
        room::UserPresence,
        screen::{ClaimConfirmed, ResourceBusy, ScreenStatus, ScreensState},
    },
};
use screenwall_server::DriverConfig;

/// Shared progress marker between simulated clients.
#[derive(Clone, Default)]
struct Steps(Arc<AtomicU32>);

impl Steps {
    fn advance_to(&self, step: u32) {
        self.0.store(step, Ordering::SeqCst);
    }

    async fn reached(&self, step: u32) {
        while self.0.load(Ordering::SeqCst) < step {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }
}

fn two_screen_config() -> DriverConfig {
    DriverConfig { screens: vec!["A".to_string(), "B".to_string()], ..DriverConfig::default() }
}

fn occupied_by(name: &str) -> impl Fn(&ScreensState) -> bool + '_ {
    move |state: &ScreensState| state.get("A") == Some(&ScreenStatus::occupied_by(name))
}

#[test]
fn claim_busy_release_and_endpoint_departure() {
    let mut sim = turmoil::Builder::new().build();

    sim.host("server", || async {
        SimServer::bind_with_config("0.0.0.0:443", two_screen_config()).await?.run().await?;
        Ok(())
    });

    let steps = Steps::default();

    let s = steps.clone();
    sim.client("wall-a", async move {
        let mut wall = SimClient::connect(0, "server:443").await?;
        wall.next_snapshot().await?;
        wall.register_endpoint("A").await?;
        s.advance_to(1);

        wall.wait_for_state(occupied_by("Bob")).await?;
        // Leaving frees screen A.
        Ok(())
    });

    let s = steps.clone();
    sim.client("alice", async move {
        s.reached(1).await;
        let mut alice = SimClient::connect(1, "server:443").await?;
        let welcome = alice.next_snapshot().await?;
        assert_eq!(welcome.get("A"), Some(&ScreenStatus::free()));

        let request = alice.claim("A", Some("Alice")).await?;
        assert_eq!(
            alice.wait_for_reply(request).await?,
            Payload::ClaimConfirmed(ClaimConfirmed { screen_id: "A".to_string() })
        );
        s.advance_to(2);

        s.reached(3).await;
        alice.release().await?;
        alice.wait_for_state(|state| state.get("A") == Some(&ScreenStatus::free())).await?;
        s.advance_to(4);

        s.reached(6).await;
        Ok(())
    });

    let s = steps.clone();
    sim.client("bob", async move {
        let mut bob = SimClient::connect(2, "server:443").await?;
        bob.next_snapshot().await?;

        s.reached(2).await;
        bob.wait_for_state(occupied_by("Alice")).await?;
        let request = bob.claim("A", Some("Bob")).await?;
        assert_eq!(
            bob.wait_for_reply(request).await?,
            Payload::ResourceBusy(ResourceBusy { screen_id: "A".to_string() })
        );

        let request = bob.claim("Z", Some("Bob")).await?;
        assert_eq!(bob.wait_for_reply(request).await?, Payload::ResourceUnknown);
        s.advance_to(3);

        s.reached(4).await;
        bob.wait_for_state(|state| state.get("A") == Some(&ScreenStatus::free())).await?;
        let request = bob.claim("A", Some("Bob")).await?;
        assert!(matches!(bob.wait_for_reply(request).await?, Payload::ClaimConfirmed(_)));
        bob.wait_for_state(occupied_by("Bob")).await?;

        // The wall leaves once it sees Bob; A goes back to free.
        bob.wait_for_state(|state| state.get("A") == Some(&ScreenStatus::free())).await?;
        s.advance_to(5);

        // The stale release changes nothing; the next claim still works.
        bob.release().await?;
        let request = bob.claim("B", None).await?;
        assert!(matches!(bob.wait_for_reply(request).await?, Payload::ClaimConfirmed(_)));
        let state = bob
            .wait_for_state(|state| state.get("B") == Some(&ScreenStatus::occupied_by("Participant")))
            .await?;
        assert_eq!(state.get("A"), Some(&ScreenStatus::free()));
        s.advance_to(6);
        Ok(())
    });

    sim.run().unwrap();
}

#[test]
fn presence_rooms_announce_joins_and_departures() {
    let mut sim = turmoil::Builder::new().build();

    sim.host("server", || async {
        SimServer::bind("0.0.0.0:443").await?.run().await?;
        Ok(())
    });

    let steps = Steps::default();

    let s = steps.clone();
    sim.client("first", async move {
        let mut first = SimClient::connect(1, "server:443").await?;
        first.join_room("standup", "alice").await?;
        // A reply on the same stream proves the join was processed.
        let sync = first.claim("nowhere", None).await?;
        first.wait_for_reply(sync).await?;
        s.advance_to(1);

        let presence = |user: &str| UserPresence {
            room_id: "standup".to_string(),
            user_id: user.to_string(),
        };
        assert_eq!(first.next_notice().await?, Payload::UserConnected(presence("bob")));
        assert_eq!(first.next_notice().await?, Payload::UserDisconnected(presence("bob")));
        Ok(())
    });

    let s = steps.clone();
    sim.client("second", async move {
        s.reached(1).await;
        let mut second = SimClient::connect(2, "server:443").await?;
        second.join_room("standup", "bob").await?;
        let sync = second.claim("nowhere", None).await?;
        second.wait_for_reply(sync).await?;
        Ok(())
    });

    sim.run().unwrap();
}

#[test]
fn malformed_payload_gets_error_reply() {
    let mut sim = turmoil::Builder::new().build();

    sim.host("server", || async {
        SimServer::bind("0.0.0.0:443").await?.run().await?;
        Ok(())
    });

    sim.client("client", async {
        let mut client = SimClient::connect(1, "server:443").await?;
        client.next_snapshot().await?;

        let mut header = FrameHeader::new(Opcode::RequestClaim);
        header.set_request_id(42);
        client.send_frame(&Frame::new(header, vec![0xFF, 0xFF, 0xFF])).await?;

        let Payload::Error(error) = client.wait_for_reply(42).await? else {
            panic!("expected error reply");
        };
        assert_eq!(error.code, ErrorPayload::INVALID_PAYLOAD);

        // The connection stays usable.
        let request = client.claim("screen2", Some("Alice")).await?;
        assert!(matches!(client.wait_for_reply(request).await?, Payload::ClaimConfirmed(_)));
        Ok(())
    });

    sim.run().unwrap();
}

#[test]
fn connections_past_the_limit_are_closed() {
    let mut sim = turmoil::Builder::new().build();

    sim.host("server", || async {
        let config = DriverConfig { max_connections: 1, ..DriverConfig::default() };
        SimServer::bind_with_config("0.0.0.0:443", config).await?.run().await?;
        Ok(())
    });

    let steps = Steps::default();

    let s = steps.clone();
    sim.client("admitted", async move {
        let mut client = SimClient::connect(1, "server:443").await?;
        client.next_snapshot().await?;
        s.advance_to(1);
        s.reached(2).await;
        Ok(())
    });

    let s = steps.clone();
    sim.client("rejected", async move {
        s.reached(1).await;
        let mut client = SimClient::connect(2, "server:443").await?;
        let err = client.next().await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
        s.advance_to(2);
        Ok(())
    });

    sim.run().unwrap();
}
