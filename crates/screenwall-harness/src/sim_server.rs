//! Simulation server for testing with turmoil.
//!
//! `SimServer` wraps `ServerDriver` with `SimEnv` and turmoil TCP. One task
//! owns the driver and handles every event in arrival order; per-connection
//! reader tasks only decode frames and forward them. Outbound frames are
//! written before the next event is taken, which gives the same global
//! publication order the production runtime gets from its driver lock.

use std::{collections::HashMap, io};

use screenwall_proto::Frame;
use screenwall_server::{
    DriverConfig, LogLevel, ServerAction, ServerDriver, ServerEvent, codec::read_frame,
};
use tokio::{
    io::{AsyncWriteExt, ReadHalf, WriteHalf},
    sync::mpsc,
};
use turmoil::net::{TcpListener, TcpStream};

use crate::SimEnv;

/// Port the simulated server listens on.
pub const SIM_PORT: u16 = 443;

/// Simulation server for testing with turmoil.
pub struct SimServer {
    /// The action-based server driver
    driver: ServerDriver<SimEnv>,
    /// TCP listener for accepting connections
    listener: TcpListener,
    /// Write half per live connection (`session_id` → writer)
    connections: HashMap<u64, WriteHalf<TcpStream>>,
    /// Next connection ID
    next_session_id: u64,
}

impl SimServer {
    /// Create and bind a new simulation server.
    pub async fn bind(address: &str) -> io::Result<Self> {
        Self::bind_with_config(address, DriverConfig::default()).await
    }

    /// Create and bind a new simulation server with custom config.
    pub async fn bind_with_config(address: &str, config: DriverConfig) -> io::Result<Self> {
        let listener = TcpListener::bind(address).await?;
        let driver = ServerDriver::new(SimEnv::new(), config)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;

        Ok(Self { driver, listener, connections: HashMap::new(), next_session_id: 1 })
    }

    /// Serve connections until the listener fails.
    pub async fn run(mut self) -> io::Result<()> {
        let (events_tx, mut events_rx) = mpsc::unbounded_channel();

        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    let (stream, _addr) = accepted?;
                    let session_id = self.next_session_id;
                    self.next_session_id += 1;

                    let (reader, writer) = tokio::io::split(stream);
                    self.connections.insert(session_id, writer);
                    tokio::spawn(forward_frames(session_id, reader, events_tx.clone()));

                    self.handle(ServerEvent::ConnectionAccepted { session_id }).await;
                },
                Some(event) = events_rx.recv() => {
                    self.handle(event).await;
                },
            }
        }
    }

    /// Feed one event to the driver and execute what it returns.
    ///
    /// Driver errors are logged; they never stop the server.
    pub async fn handle(&mut self, event: ServerEvent) {
        let closed = match &event {
            ServerEvent::ConnectionClosed { session_id, .. } => Some(*session_id),
            _ => None,
        };

        match self.driver.process_event(event) {
            Ok(actions) => self.execute_actions(actions).await,
            Err(e) => tracing::warn!("driver rejected event: {}", e),
        }

        if let Some(session_id) = closed {
            self.connections.remove(&session_id);
        }
    }

    /// Execute server actions.
    async fn execute_actions(&mut self, actions: Vec<ServerAction<tokio::time::Instant>>) {
        for action in actions {
            match action {
                ServerAction::SendToSession { session_id, frame } => {
                    self.send_frame(session_id, &frame).await;
                },

                ServerAction::SendToSessions { session_ids, frame } => {
                    for session_id in session_ids {
                        self.send_frame(session_id, &frame).await;
                    }
                },

                ServerAction::BroadcastToRoom { room_id, frame, exclude_session } => {
                    let sessions: Vec<u64> = self
                        .driver
                        .sessions_in_room(&room_id)
                        .filter(|id| Some(*id) != exclude_session)
                        .collect();
                    for session_id in sessions {
                        self.send_frame(session_id, &frame).await;
                    }
                },

                ServerAction::CloseConnection { session_id, reason } => {
                    tracing::debug!(session_id, "closing connection: {}", reason);
                    if let Some(mut writer) = self.connections.remove(&session_id) {
                        // The peer sees EOF; its reader task reports the close.
                        if let Err(e) = writer.shutdown().await {
                            tracing::debug!(session_id, "shutdown failed: {}", e);
                        }
                    }
                },

                ServerAction::Log { level, message, .. } => log(level, &message),
            }
        }
    }

    /// Send a frame to a specific session.
    ///
    /// Write failures mean the peer is gone; its reader task will report the
    /// close.
    async fn send_frame(&mut self, session_id: u64, frame: &Frame) {
        let Some(writer) = self.connections.get_mut(&session_id) else {
            return;
        };

        let bytes = match frame.to_bytes() {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(session_id, "failed to encode frame: {}", e);
                return;
            },
        };

        if let Err(e) = writer.write_all(&bytes).await {
            tracing::debug!(session_id, "write failed: {}", e);
        }
    }

    /// Number of active connections.
    pub fn connection_count(&self) -> usize {
        self.driver.connection_count()
    }

    /// Underlying driver for test assertions.
    pub fn driver(&self) -> &ServerDriver<SimEnv> {
        &self.driver
    }
}

/// Decode frames from one connection and forward them to the server task.
async fn forward_frames(
    session_id: u64,
    mut reader: ReadHalf<TcpStream>,
    events: mpsc::UnboundedSender<ServerEvent>,
) {
    let reason = loop {
        match read_frame(&mut reader).await {
            Ok(Some(frame)) => {
                if events.send(ServerEvent::FrameReceived { session_id, frame }).is_err() {
                    return;
                }
            },
            Ok(None) => break "peer closed".to_string(),
            Err(e) => break format!("read failed: {e}"),
        }
    };

    let _ = events.send(ServerEvent::ConnectionClosed { session_id, reason });
}

fn log(level: LogLevel, message: &str) {
    match level {
        LogLevel::Debug => tracing::debug!("{}", message),
        LogLevel::Info => tracing::info!("{}", message),
        LogLevel::Warn => tracing::warn!("{}", message),
        LogLevel::Error => tracing::error!("{}", message),
    }
}
