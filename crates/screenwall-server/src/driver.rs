//! Server driver.
//!
//! Ties together the allocation coordinator (screens, sessions, snapshot
//! fan-out) and the connection registry (presence rooms). Decodes inbound
//! frames, feeds the coordinator and turns its decisions into frames for the
//! runtime to deliver.

use screenwall_core::{
    AllocationAction, Coordinator, CoordinatorConfig, Environment, Reply, ScreenRegistry,
};
use screenwall_proto::{
    Frame, FrameHeader, Opcode, Payload, ProtocolError,
    payloads::{
        ErrorPayload,
        room::{JoinRoom, UserPresence},
        screen::{ClaimConfirmed, ResourceBusy, ScreensState},
    },
};

use crate::{
    registry::ConnectionRegistry,
    routes::{PageRoute, RouteError},
    server_error::ServerError,
};

/// Driver configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Maximum concurrent connections
    pub max_connections: usize,
    /// Screen ids served, fixed for the life of the process
    pub screens: Vec<String>,
    /// Name shown for claimants that did not give one
    pub placeholder_name: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_connections: 10_000,
            screens: ScreenRegistry::DEFAULT_SCREENS.map(String::from).to_vec(),
            placeholder_name: CoordinatorConfig::DEFAULT_PLACEHOLDER_NAME.to_string(),
        }
    }
}

/// Events that the server driver processes.
///
/// These are produced by the external runtime (simulation or production).
#[derive(Debug, Clone)]
pub enum ServerEvent {
    /// A new connection was accepted
    ConnectionAccepted {
        /// Unique connection ID assigned by the runtime
        session_id: u64,
    },

    /// A frame was received from a connection
    FrameReceived {
        /// Connection that sent the frame
        session_id: u64,
        /// The received frame
        frame: Frame,
    },

    /// A connection was closed (by peer or error)
    ConnectionClosed {
        /// Connection that was closed
        session_id: u64,
        /// Reason for closure
        reason: String,
    },
}

/// Actions that the server driver produces.
///
/// These are executed by runtime-specific code (production or simulation),
/// in order. Executing them while still holding the driver is what gives
/// every connection the same publication order.
#[derive(Debug, Clone)]
pub enum ServerAction<I> {
    /// Send a frame to a specific session
    SendToSession {
        /// Target session ID
        session_id: u64,
        /// Frame to send
        frame: Frame,
    },

    /// Send the same frame to several sessions
    SendToSessions {
        /// Target session IDs
        session_ids: Vec<u64>,
        /// Frame to send
        frame: Frame,
    },

    /// Send a frame to every member of a room
    BroadcastToRoom {
        /// Target room
        room_id: String,
        /// Frame to broadcast
        frame: Frame,
        /// Optional session to exclude from broadcast
        exclude_session: Option<u64>,
    },

    /// Close a connection
    CloseConnection {
        /// Session to close
        session_id: u64,
        /// Reason for closure
        reason: String,
    },

    /// Log a message
    Log {
        /// Log level
        level: LogLevel,
        /// Message to log
        message: String,
        /// When the event occurred
        timestamp: I,
    },
}

/// Log levels for server actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug information
    Debug,
    /// Informational message
    Info,
    /// Warning
    Warn,
    /// Error
    Error,
}

/// Action-based server driver.
pub struct ServerDriver<E>
where
    E: Environment,
{
    /// Screens, sessions and snapshot fan-out
    coordinator: Coordinator,
    /// Live sessions and room memberships
    registry: ConnectionRegistry,
    /// Environment (time, RNG)
    env: E,
    /// Server configuration
    config: ServerConfig,
}

impl<E> ServerDriver<E>
where
    E: Environment,
{
    /// Create a new server driver.
    ///
    /// # Errors
    ///
    /// - `ServerError::Registry` if the configured screen list is empty,
    ///   has duplicates or contains an invalid id
    pub fn new(env: E, config: ServerConfig) -> Result<Self, ServerError> {
        let screens = ScreenRegistry::new(config.screens.iter().cloned())?;
        let coordinator = Coordinator::new(screens, CoordinatorConfig {
            placeholder_name: config.placeholder_name.clone(),
        });

        Ok(Self { coordinator, registry: ConnectionRegistry::new(), env, config })
    }

    /// Process a server event and return actions to execute.
    ///
    /// This is the main entry point for the server driver.
    pub fn process_event(
        &mut self,
        event: ServerEvent,
    ) -> Result<Vec<ServerAction<E::Instant>>, ServerError> {
        match event {
            ServerEvent::ConnectionAccepted { session_id } => {
                self.handle_connection_accepted(session_id)
            },
            ServerEvent::FrameReceived { session_id, frame } => {
                self.handle_frame_received(session_id, &frame)
            },
            ServerEvent::ConnectionClosed { session_id, reason } => {
                self.handle_connection_closed(session_id, &reason)
            },
        }
    }

    fn handle_connection_accepted(
        &mut self,
        session_id: u64,
    ) -> Result<Vec<ServerAction<E::Instant>>, ServerError> {
        let now = self.env.now();

        if self.registry.session_count() >= self.config.max_connections {
            return Ok(vec![
                ServerAction::CloseConnection {
                    session_id,
                    reason: "max connections exceeded".to_string(),
                },
                ServerAction::Log {
                    level: LogLevel::Warn,
                    message: format!("rejected session {session_id}: max connections exceeded"),
                    timestamp: now,
                },
            ]);
        }

        if !self.registry.register_session(session_id) {
            return Err(ServerError::SessionAlreadyExists(session_id));
        }

        let allocation = self.coordinator.connect(session_id)?;

        let mut actions = vec![ServerAction::Log {
            level: LogLevel::Debug,
            message: format!("session {session_id} connected"),
            timestamp: now,
        }];
        actions.extend(self.convert_allocation_actions(allocation, 0));
        Ok(actions)
    }

    fn handle_frame_received(
        &mut self,
        session_id: u64,
        frame: &Frame,
    ) -> Result<Vec<ServerAction<E::Instant>>, ServerError> {
        if !self.registry.has_session(session_id) {
            return Err(ServerError::SessionNotFound(session_id));
        }

        let request_id = frame.header.request_id();
        let payload = match Payload::from_frame(frame) {
            Ok(payload) => payload,
            Err(ProtocolError::UnknownOpcode(opcode)) => {
                return Ok(self.error_response(
                    session_id,
                    request_id,
                    ErrorPayload::unexpected_opcode(opcode),
                ));
            },
            Err(e) => {
                return Ok(self.error_response(
                    session_id,
                    request_id,
                    ErrorPayload::invalid_payload(e.to_string()),
                ));
            },
        };

        let allocation = match payload {
            Payload::RegisterEndpoint(req) => {
                self.coordinator.register_endpoint(session_id, &req.screen_id)?
            },
            Payload::RequestClaim(req) => {
                self.coordinator.request_claim(session_id, &req.screen_id, req.name.as_deref())?
            },
            Payload::Release => self.coordinator.release(session_id)?,
            Payload::JoinRoom(req) => return Ok(self.handle_join_room(session_id, req)),
            other => {
                return Ok(self.error_response(
                    session_id,
                    request_id,
                    ErrorPayload::unexpected_opcode(other.opcode().to_u16()),
                ));
            },
        };

        Ok(self.convert_allocation_actions(allocation, request_id))
    }

    fn handle_join_room(&mut self, session_id: u64, req: JoinRoom) -> Vec<ServerAction<E::Instant>> {
        let now = self.env.now();
        self.registry.join_room(session_id, &req.room_id, &req.user_id);

        let message = format!(
            "session {session_id} joined room {:?} as {:?}",
            req.room_id, req.user_id
        );
        let presence = UserPresence { room_id: req.room_id.clone(), user_id: req.user_id };

        let mut actions = vec![ServerAction::Log { level: LogLevel::Debug, message, timestamp: now }];
        match Payload::UserConnected(presence).to_frame() {
            Ok(frame) => actions.push(ServerAction::BroadcastToRoom {
                room_id: req.room_id,
                frame,
                exclude_session: Some(session_id),
            }),
            Err(e) => actions.push(self.encode_failure(&e)),
        }
        actions
    }

    fn handle_connection_closed(
        &mut self,
        session_id: u64,
        reason: &str,
    ) -> Result<Vec<ServerAction<E::Instant>>, ServerError> {
        let now = self.env.now();

        // Connections rejected at capacity were never registered.
        let Some(memberships) = self.registry.unregister_session(session_id) else {
            return Ok(Vec::new());
        };

        let allocation = self.coordinator.disconnect(session_id)?;

        let mut actions = vec![ServerAction::Log {
            level: LogLevel::Info,
            message: format!(
                "session {session_id} closed: {reason}, was in {} rooms",
                memberships.len()
            ),
            timestamp: now,
        }];
        actions.extend(self.convert_allocation_actions(allocation, 0));

        for membership in memberships {
            let presence =
                UserPresence { room_id: membership.room_id.clone(), user_id: membership.user_id };
            match Payload::UserDisconnected(presence).to_frame() {
                Ok(frame) => actions.push(ServerAction::BroadcastToRoom {
                    room_id: membership.room_id,
                    frame,
                    exclude_session: None,
                }),
                Err(e) => actions.push(self.encode_failure(&e)),
            }
        }

        Ok(actions)
    }

    /// Turn coordinator decisions into deliveries and log lines.
    ///
    /// Replies echo `request_id`; snapshots carry the publication revision
    /// in the request id field instead.
    fn convert_allocation_actions(
        &self,
        allocation: Vec<AllocationAction>,
        request_id: u32,
    ) -> Vec<ServerAction<E::Instant>> {
        let now = self.env.now();
        let mut actions = Vec::with_capacity(allocation.len());

        for action in allocation {
            match action {
                AllocationAction::Reply { session_id, reply } => {
                    let payload = match reply {
                        Reply::ClaimConfirmed(screen) => {
                            Payload::ClaimConfirmed(ClaimConfirmed { screen_id: screen.to_string() })
                        },
                        Reply::ResourceBusy(screen) => {
                            Payload::ResourceBusy(ResourceBusy { screen_id: screen.to_string() })
                        },
                        Reply::ResourceUnknown => Payload::ResourceUnknown,
                    };

                    let mut header = FrameHeader::new(payload.opcode());
                    header.set_request_id(request_id);
                    match payload.into_frame(header) {
                        Ok(frame) => actions.push(ServerAction::SendToSession { session_id, frame }),
                        Err(e) => actions.push(self.encode_failure(&e)),
                    }
                },

                AllocationAction::Publish(publication) => {
                    if publication.recipients.is_empty() {
                        continue;
                    }

                    let mut header = FrameHeader::new(Opcode::StateSnapshot);
                    // Revision wraps in the 32-bit header field.
                    header.set_request_id(publication.revision as u32);
                    let snapshot = ScreensState::clone(&publication.snapshot);
                    match Payload::StateSnapshot(snapshot).into_frame(header) {
                        Ok(frame) => actions.push(ServerAction::SendToSessions {
                            session_ids: publication.recipients,
                            frame,
                        }),
                        Err(e) => actions.push(self.encode_failure(&e)),
                    }
                },

                AllocationAction::Claimed { screen, session_id, name } => {
                    actions.push(ServerAction::Log {
                        level: LogLevel::Info,
                        message: format!("session {session_id} claimed {screen} as {name:?}"),
                        timestamp: now,
                    });
                },

                AllocationAction::Freed { screen, occupant, cause } => {
                    actions.push(ServerAction::Log {
                        level: LogLevel::Info,
                        message: format!(
                            "{screen} freed ({cause:?}), was held by session {}",
                            occupant.session_id
                        ),
                        timestamp: now,
                    });
                },

                AllocationAction::EndpointRegistered { screen, session_id } => {
                    actions.push(ServerAction::Log {
                        level: LogLevel::Info,
                        message: format!("session {session_id} is the endpoint for {screen}"),
                        timestamp: now,
                    });
                },

                AllocationAction::Refused { session_id, reason } => {
                    actions.push(ServerAction::Log {
                        level: LogLevel::Warn,
                        message: format!("refused claim from session {session_id}: {reason}"),
                        timestamp: now,
                    });
                },

                AllocationAction::Ignored { session_id, reason } => {
                    actions.push(ServerAction::Log {
                        level: LogLevel::Debug,
                        message: format!("ignored request from session {session_id}: {reason}"),
                        timestamp: now,
                    });
                },
            }
        }

        actions
    }

    fn error_response(
        &self,
        session_id: u64,
        request_id: u32,
        error: ErrorPayload,
    ) -> Vec<ServerAction<E::Instant>> {
        let now = self.env.now();
        let message = format!("rejected frame from session {session_id}: {}", error.message);

        let mut header = FrameHeader::new(Opcode::Error);
        header.set_request_id(request_id);
        match Payload::Error(error).into_frame(header) {
            Ok(frame) => vec![ServerAction::SendToSession { session_id, frame }, ServerAction::Log {
                level: LogLevel::Warn,
                message,
                timestamp: now,
            }],
            Err(e) => vec![self.encode_failure(&e)],
        }
    }

    fn encode_failure(&self, error: &ProtocolError) -> ServerAction<E::Instant> {
        ServerAction::Log {
            level: LogLevel::Error,
            message: format!("failed to encode outbound frame: {error}"),
            timestamp: self.env.now(),
        }
    }

    /// Resolve a page path against the served screens.
    ///
    /// # Errors
    ///
    /// - `RouteError::NotFound` if the path names no page
    pub fn resolve_page(&self, path: &str) -> Result<PageRoute, RouteError> {
        PageRoute::resolve(path, self.coordinator.registry())
    }

    /// All sessions in a room.
    pub fn sessions_in_room(&self, room_id: &str) -> impl Iterator<Item = u64> + '_ {
        self.registry.sessions_in_room(room_id)
    }

    /// Check if a session is connected.
    pub fn has_session(&self, session_id: u64) -> bool {
        self.registry.has_session(session_id)
    }

    /// Number of active connections.
    pub fn connection_count(&self) -> usize {
        self.registry.session_count()
    }

    /// Current public snapshot.
    pub fn snapshot(&self) -> ScreensState {
        self.coordinator.snapshot()
    }

    /// Allocation state for inspection.
    pub fn coordinator(&self) -> &Coordinator {
        &self.coordinator
    }

    /// Connection and room state for inspection.
    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Configuration in use.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}
