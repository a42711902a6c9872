//! Simulated client over turmoil TCP.
//!
//! Sends requests with increasing request ids and records every snapshot it
//! receives, so tests can check what each participant actually saw.

use std::{io, time::Duration};

use screenwall_proto::{
    Frame, FrameHeader, Payload,
    payloads::{
        room::JoinRoom,
        screen::{RegisterEndpoint, RequestClaim, ScreensState},
    },
};
use screenwall_server::codec::read_frame;
use tokio::io::AsyncWriteExt;
use turmoil::net::TcpStream;

use crate::invariants::ClientSnapshot;

/// How long a client waits for the next frame before giving up.
pub const READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Frame received by a client, decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Received {
    /// Request id from the header (revision for snapshots)
    pub request_id: u32,
    /// Decoded payload
    pub payload: Payload,
}

/// Client connection to a [`SimServer`](crate::SimServer).
pub struct SimClient {
    id: u64,
    stream: TcpStream,
    next_request_id: u32,
    /// `(revision, state)` for every snapshot received, in order
    snapshots: Vec<(u64, ScreensState)>,
    /// Non-snapshot frames not yet consumed by `wait_for_reply`
    inbox: Vec<Received>,
}

impl SimClient {
    /// Connect to `address` (e.g. `"server:443"`).
    ///
    /// `id` only labels this client in invariant reports.
    pub async fn connect(id: u64, address: &str) -> io::Result<Self> {
        let stream = TcpStream::connect(address).await?;
        Ok(Self { id, stream, next_request_id: 1, snapshots: Vec::new(), inbox: Vec::new() })
    }

    /// Label given at connect time.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Send a request, returning its request id.
    pub async fn send(&mut self, payload: Payload) -> io::Result<u32> {
        let request_id = self.next_request_id;
        self.next_request_id += 1;

        let mut header = FrameHeader::new(payload.opcode());
        header.set_request_id(request_id);
        let frame = payload.into_frame(header).map_err(invalid_data)?;
        self.send_frame(&frame).await?;
        Ok(request_id)
    }

    /// Send a prebuilt frame as is.
    pub async fn send_frame(&mut self, frame: &Frame) -> io::Result<()> {
        let bytes = frame.to_bytes().map_err(invalid_data)?;
        self.stream.write_all(&bytes).await?;
        self.stream.flush().await
    }

    /// Claim `screen_id`, optionally under `name`.
    pub async fn claim(&mut self, screen_id: &str, name: Option<&str>) -> io::Result<u32> {
        self.send(Payload::RequestClaim(RequestClaim {
            screen_id: screen_id.to_string(),
            name: name.map(str::to_string),
        }))
        .await
    }

    /// Register as the display endpoint of `screen_id`.
    pub async fn register_endpoint(&mut self, screen_id: &str) -> io::Result<u32> {
        self.send(Payload::RegisterEndpoint(RegisterEndpoint { screen_id: screen_id.to_string() }))
            .await
    }

    /// Release the occupied screen.
    pub async fn release(&mut self) -> io::Result<u32> {
        self.send(Payload::Release).await
    }

    /// Join a presence room.
    pub async fn join_room(&mut self, room_id: &str, user_id: &str) -> io::Result<u32> {
        self.send(Payload::JoinRoom(JoinRoom {
            room_id: room_id.to_string(),
            user_id: user_id.to_string(),
        }))
        .await
    }

    /// Read the next frame, recording it if it is a snapshot.
    ///
    /// # Errors
    ///
    /// - `UnexpectedEof` if the server closed the connection
    /// - `TimedOut` after [`READ_TIMEOUT`] without a frame
    pub async fn next(&mut self) -> io::Result<Received> {
        let frame = tokio::time::timeout(READ_TIMEOUT, read_frame(&mut self.stream))
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "no frame from server"))?
            .map_err(invalid_data)?
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "server closed"))?;

        let payload = Payload::from_frame(&frame).map_err(invalid_data)?;
        if let Payload::StateSnapshot(state) = &payload {
            self.snapshots.push((u64::from(frame.header.request_id()), state.clone()));
        }

        Ok(Received { request_id: frame.header.request_id(), payload })
    }

    /// Read until the next snapshot arrives and return it.
    pub async fn next_snapshot(&mut self) -> io::Result<ScreensState> {
        loop {
            let received = self.next().await?;
            match received.payload {
                Payload::StateSnapshot(state) => return Ok(state),
                _ => self.inbox.push(received),
            }
        }
    }

    /// Read until the non-snapshot answer to `request_id` arrives.
    pub async fn wait_for_reply(&mut self, request_id: u32) -> io::Result<Payload> {
        if let Some(pos) = self.inbox.iter().position(|r| r.request_id == request_id) {
            return Ok(self.inbox.remove(pos).payload);
        }

        loop {
            let received = self.next().await?;
            match received.payload {
                Payload::StateSnapshot(_) => {},
                payload if received.request_id == request_id => return Ok(payload),
                _ => self.inbox.push(received),
            }
        }
    }

    /// Read until a received snapshot satisfies `predicate`.
    ///
    /// Returns immediately if the latest recorded one already does.
    pub async fn wait_for_state(
        &mut self,
        predicate: impl Fn(&ScreensState) -> bool,
    ) -> io::Result<ScreensState> {
        if let Some(latest) = self.latest_snapshot().filter(|s| predicate(s)) {
            return Ok(latest.clone());
        }

        loop {
            let state = self.next_snapshot().await?;
            if predicate(&state) {
                return Ok(state);
            }
        }
    }

    /// Read until the next non-snapshot frame, whatever its request id.
    pub async fn next_notice(&mut self) -> io::Result<Payload> {
        if !self.inbox.is_empty() {
            return Ok(self.inbox.remove(0).payload);
        }

        loop {
            let received = self.next().await?;
            if !matches!(received.payload, Payload::StateSnapshot(_)) {
                return Ok(received.payload);
            }
        }
    }

    /// Most recent snapshot received.
    pub fn latest_snapshot(&self) -> Option<&ScreensState> {
        self.snapshots.last().map(|(_, state)| state)
    }

    /// Every snapshot received, with its revision.
    pub fn snapshots(&self) -> &[(u64, ScreensState)] {
        &self.snapshots
    }

    /// What this client observed, for invariant checks.
    pub fn observed(&self) -> ClientSnapshot {
        ClientSnapshot::new(self.id).with_history(self.snapshots.iter().cloned())
    }
}

fn invalid_data(e: impl std::error::Error + Send + Sync + 'static) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, e)
}
