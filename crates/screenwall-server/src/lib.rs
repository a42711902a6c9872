//! Screenwall production server.
//!
//! Production server using Quinn for QUIC transport, Tokio for the async
//! runtime, and system time with OS randomness.
//!
//! # Architecture
//!
//! [`ServerDriver`] is sans-IO: it turns [`ServerEvent`]s into
//! [`ServerAction`]s. [`Server`] owns the I/O: it accepts connections, reads
//! frames, and executes actions by pushing encoded frames onto a per-session
//! outbound queue drained by a writer task.
//!
//! Every event is processed and its actions enqueued while holding the
//! driver lock. Queues preserve order, so every connection sees snapshots
//! in the order the coordinator produced them, and a slow peer only delays
//! itself.
//!
//! # Components
//!
//! - [`ServerDriver`]: action-based orchestrator (pure logic, no I/O)
//! - [`Server`]: production runtime that executes driver actions
//! - [`QuinnTransport`]: QUIC transport via Quinn
//! - [`SystemEnv`]: production environment (real time, OS RNG)
//! - [`PageRoute`]: page path resolution against the served screens

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod codec;
mod driver;
mod error;
mod registry;
mod routes;
mod server_error;
mod system_env;
mod transport;

use std::{collections::HashMap, sync::Arc};

use bytes::Bytes;
pub use driver::{LogLevel, ServerAction, ServerConfig as DriverConfig, ServerDriver, ServerEvent};
pub use error::ServerError;
pub use registry::{ConnectionRegistry, RoomMembership};
pub use routes::{PageRoute, RouteError};
use screenwall_core::Environment;
pub use server_error::ServerError as DriverError;
pub use system_env::SystemEnv;
use tokio::sync::{Mutex, RwLock, mpsc};
pub use transport::{QuinnConnection, QuinnTransport};

/// Driver shared by all connection tasks.
type SharedDriver = Arc<Mutex<ServerDriver<SystemEnv>>>;

/// Per-connection I/O handles.
///
/// Lock order: the driver mutex first, then these maps.
struct SharedState {
    /// Session ID → QUIC connection (for closing)
    connections: RwLock<HashMap<u64, QuinnConnection>>,
    /// Session ID → outbound queue drained by that session's writer task
    outbound: RwLock<HashMap<u64, mpsc::UnboundedSender<Bytes>>>,
}

/// Server configuration for the production runtime.
#[derive(Debug, Clone)]
pub struct ServerRuntimeConfig {
    /// Address to bind to (e.g., "0.0.0.0:4433")
    pub bind_address: String,
    /// Path to TLS certificate (PEM format)
    pub cert_path: Option<String>,
    /// Path to TLS private key (PEM format)
    pub key_path: Option<String>,
    /// Driver configuration (limits, screens, placeholder name)
    pub driver: DriverConfig,
}

impl Default for ServerRuntimeConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:4433".to_string(),
            cert_path: None,
            key_path: None,
            driver: DriverConfig::default(),
        }
    }
}

/// Production screenwall server.
///
/// Wraps [`ServerDriver`] with Quinn QUIC transport and system environment.
pub struct Server {
    driver: ServerDriver<SystemEnv>,
    transport: QuinnTransport,
    env: SystemEnv,
}

impl Server {
    /// Validate configuration and bind the QUIC endpoint.
    ///
    /// # Errors
    ///
    /// - `ServerError::Config` for an invalid screen list, address or TLS
    ///   material
    /// - `ServerError::Transport` if the socket cannot be bound
    pub fn bind(config: ServerRuntimeConfig) -> Result<Self, ServerError> {
        let env = SystemEnv::new();
        let driver = ServerDriver::new(env.clone(), config.driver)?;

        let transport = QuinnTransport::bind(
            &config.bind_address,
            config.cert_path.as_deref(),
            config.key_path.as_deref(),
        )?;

        Ok(Self { driver, transport, env })
    }

    /// Run the server, accepting connections and processing frames.
    ///
    /// Runs until the endpoint is closed.
    pub async fn run(self) -> Result<(), ServerError> {
        tracing::info!(
            screens = ?self.driver.config().screens,
            "Server starting on {}",
            self.transport.local_addr()?
        );

        let env = self.env;
        let driver: SharedDriver = Arc::new(Mutex::new(self.driver));
        let shared = Arc::new(SharedState {
            connections: RwLock::new(HashMap::new()),
            outbound: RwLock::new(HashMap::new()),
        });

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let driver = Arc::clone(&driver);
                    let shared = Arc::clone(&shared);
                    let env = env.clone();

                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, driver, shared, env).await {
                            tracing::error!("Connection error: {}", e);
                        }
                    });
                },
                Err(e) => {
                    tracing::warn!("Accept error: {}", e);
                },
            }
        }
    }

    /// Local address the server is bound to.
    pub fn local_addr(&self) -> Result<std::net::SocketAddr, ServerError> {
        self.transport.local_addr()
    }
}

/// Handle a single QUIC connection from handshake to close.
async fn handle_connection(
    conn: QuinnConnection,
    driver: SharedDriver,
    shared: Arc<SharedState>,
    env: SystemEnv,
) -> Result<(), ServerError> {
    let outbound_stream = conn.open_uni().await?;
    let (tx, rx) = mpsc::unbounded_channel();

    // Register the queue before the driver sees the session so the initial
    // snapshot has somewhere to go.
    let session_id = {
        let mut driver = driver.lock().await;
        let session_id = loop {
            let candidate = env.random_u64();
            if !driver.has_session(candidate) {
                break candidate;
            }
        };

        shared.connections.write().await.insert(session_id, conn.clone());
        shared.outbound.write().await.insert(session_id, tx);

        let actions = driver.process_event(ServerEvent::ConnectionAccepted { session_id })?;
        execute_actions(&driver, actions, &shared).await;
        session_id
    };

    tracing::debug!(session_id, remote = %conn.remote_addr(), "New connection");
    let writer = tokio::spawn(write_outbound(session_id, outbound_stream, rx));

    loop {
        match conn.accept_bi().await {
            Ok((send, recv)) => {
                drop(send);
                let driver = Arc::clone(&driver);
                let shared = Arc::clone(&shared);
                let conn = conn.clone();

                tokio::spawn(async move {
                    if let Err(e) = handle_stream(session_id, recv, &driver, &shared).await {
                        tracing::warn!(session_id, "Closing connection: {}", e);
                        conn.close(1, "malformed frame");
                    }
                });
            },
            Err(e) => {
                tracing::debug!(session_id, "Connection closed: {}", e);
                break;
            },
        }
    }

    {
        let mut driver = driver.lock().await;
        shared.connections.write().await.remove(&session_id);

        let actions = driver.process_event(ServerEvent::ConnectionClosed {
            session_id,
            reason: "connection closed".to_string(),
        })?;
        execute_actions(&driver, actions, &shared).await;

        // Dropping the sender lets the writer drain and finish.
        shared.outbound.write().await.remove(&session_id);
    }

    if let Err(e) = writer.await {
        tracing::debug!(session_id, "Writer task failed: {}", e);
    }

    Ok(())
}

/// Read frames from one request stream until it ends.
async fn handle_stream(
    session_id: u64,
    mut recv: quinn::RecvStream,
    driver: &SharedDriver,
    shared: &SharedState,
) -> Result<(), ServerError> {
    while let Some(frame) = codec::read_frame(&mut recv).await? {
        let mut driver = driver.lock().await;
        match driver.process_event(ServerEvent::FrameReceived { session_id, frame }) {
            Ok(actions) => execute_actions(&driver, actions, shared).await,
            Err(e) => tracing::warn!(session_id, "Frame processing error: {}", e),
        }
    }

    Ok(())
}

/// Drain a session's outbound queue onto its QUIC stream.
async fn write_outbound(
    session_id: u64,
    mut stream: quinn::SendStream,
    mut rx: mpsc::UnboundedReceiver<Bytes>,
) {
    while let Some(bytes) = rx.recv().await {
        if let Err(e) = stream.write_all(&bytes).await {
            tracing::debug!(session_id, "Outbound write failed: {}", e);
            return;
        }
    }

    if let Err(e) = stream.finish() {
        tracing::debug!(session_id, "Outbound finish failed: {}", e);
    }
}

/// Execute driver actions.
///
/// Must be called with the driver lock held.
async fn execute_actions(
    driver: &ServerDriver<SystemEnv>,
    actions: Vec<ServerAction<<SystemEnv as Environment>::Instant>>,
    shared: &SharedState,
) {
    for action in actions {
        match action {
            ServerAction::SendToSession { session_id, frame } => {
                let Some(bytes) = encode(&frame) else { continue };
                enqueue(shared, &[session_id], &bytes).await;
            },

            ServerAction::SendToSessions { session_ids, frame } => {
                let Some(bytes) = encode(&frame) else { continue };
                enqueue(shared, &session_ids, &bytes).await;
            },

            ServerAction::BroadcastToRoom { room_id, frame, exclude_session } => {
                let Some(bytes) = encode(&frame) else { continue };
                let sessions: Vec<u64> = driver
                    .sessions_in_room(&room_id)
                    .filter(|id| Some(*id) != exclude_session)
                    .collect();
                enqueue(shared, &sessions, &bytes).await;
            },

            ServerAction::CloseConnection { session_id, reason } => {
                tracing::info!(session_id, "Closing connection: {}", reason);
                if let Some(conn) = shared.connections.write().await.remove(&session_id) {
                    conn.close(0, &reason);
                }
            },

            ServerAction::Log { level, message, .. } => match level {
                LogLevel::Debug => tracing::debug!("{}", message),
                LogLevel::Info => tracing::info!("{}", message),
                LogLevel::Warn => tracing::warn!("{}", message),
                LogLevel::Error => tracing::error!("{}", message),
            },
        }
    }
}

fn encode(frame: &screenwall_proto::Frame) -> Option<Bytes> {
    match frame.to_bytes() {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            tracing::error!("Failed to encode frame: {}", e);
            None
        },
    }
}

async fn enqueue(shared: &SharedState, session_ids: &[u64], bytes: &Bytes) {
    let outbound = shared.outbound.read().await;
    for session_id in session_ids {
        match outbound.get(session_id) {
            Some(tx) => {
                if tx.send(bytes.clone()).is_err() {
                    tracing::debug!(session_id, "Outbound queue closed");
                }
            },
            None => tracing::debug!(session_id, "No outbound queue for session"),
        }
    }
}
