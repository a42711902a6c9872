//! Model world - the reference occupancy rules.
//!
//! A deliberately naive rendition of the allocation rules: a vector of
//! screens and a vector of clients, no maps, no actions. It's the oracle
//! against which the real coordinator is verified.

use super::operation::{
    ClientId, MODEL_SCREENS, ModelName, ModelScreen, Operation, OperationError, OperationResult,
    screen_index,
};

/// Label published for claimants without a usable name.
pub const PLACEHOLDER_NAME: &str = "Participant";

/// What a connected client is to the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelRole {
    /// Connected, nothing claimed
    Unassigned,
    /// Display endpoint of a screen (index into [`MODEL_SCREENS`])
    Endpoint(usize),
    /// Last successful claim (index into [`MODEL_SCREENS`])
    Claimant(usize),
}

/// Observable state for oracle comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservableState {
    /// Per screen: occupant client and published name.
    pub occupants: Vec<Option<(ClientId, String)>>,
    /// Per client: role, `None` while disconnected.
    pub roles: Vec<Option<ModelRole>>,
    /// Number of state changes published so far.
    pub revision: u64,
}

/// Model world - the reference implementation.
#[derive(Debug, Clone)]
pub struct ModelWorld {
    /// Role per client, `None` while disconnected.
    clients: Vec<Option<ModelRole>>,
    /// Occupant per screen.
    screens: Vec<Option<(ClientId, String)>>,
    /// Publications so far.
    revision: u64,
}

impl ModelWorld {
    /// Create a new model world with the given number of clients, all
    /// disconnected.
    pub fn new(num_clients: usize) -> Self {
        Self {
            clients: vec![None; num_clients],
            screens: vec![None; MODEL_SCREENS.len()],
            revision: 0,
        }
    }

    /// Number of clients in the world.
    pub fn num_clients(&self) -> usize {
        self.clients.len()
    }

    /// Whether `client_id` is connected.
    pub fn is_connected(&self, client_id: ClientId) -> bool {
        self.clients.get(usize::from(client_id)).is_some_and(Option::is_some)
    }

    /// Apply an operation and return the result.
    ///
    /// The result should match the real implementation's result.
    pub fn apply(&mut self, op: &Operation) -> OperationResult {
        let client_id = op.client_id();
        let Some(&slot) = self.clients.get(usize::from(client_id)) else {
            return OperationResult::Error(OperationError::InvalidClient);
        };

        match (op, slot) {
            (Operation::Connect { .. }, Some(_)) => {
                OperationResult::Error(OperationError::AlreadyConnected)
            },
            (Operation::Connect { .. }, None) => {
                self.clients[usize::from(client_id)] = Some(ModelRole::Unassigned);
                OperationResult::Ok
            },
            (_, None) => OperationResult::Error(OperationError::NotConnected),
            (Operation::Disconnect { .. }, Some(role)) => self.apply_disconnect(client_id, role),
            (Operation::RegisterEndpoint { screen, .. }, Some(role)) => {
                self.apply_register_endpoint(client_id, role, *screen)
            },
            (Operation::Claim { screen, name, .. }, Some(role)) => {
                self.apply_claim(client_id, role, *screen, *name)
            },
            (Operation::Release { .. }, Some(role)) => self.apply_release(client_id, role),
        }
    }

    /// Extract observable state for comparison.
    pub fn observable_state(&self) -> ObservableState {
        ObservableState {
            occupants: self.screens.clone(),
            roles: self.clients.clone(),
            revision: self.revision,
        }
    }

    fn apply_disconnect(&mut self, client_id: ClientId, role: ModelRole) -> OperationResult {
        match role {
            ModelRole::Claimant(screen) => {
                self.free_if_held(screen, client_id);
            },
            ModelRole::Endpoint(screen) => {
                if self.screens[screen].take().is_some() {
                    self.revision += 1;
                }
            },
            ModelRole::Unassigned => {},
        }

        self.clients[usize::from(client_id)] = None;
        OperationResult::Ok
    }

    fn apply_register_endpoint(
        &mut self,
        client_id: ClientId,
        role: ModelRole,
        screen: ModelScreen,
    ) -> OperationResult {
        let Some(screen) = screen_index(screen) else {
            return OperationResult::Ignored;
        };

        if let ModelRole::Claimant(held) = role {
            self.free_if_held(held, client_id);
        }

        self.clients[usize::from(client_id)] = Some(ModelRole::Endpoint(screen));
        OperationResult::Ok
    }

    fn apply_claim(
        &mut self,
        client_id: ClientId,
        role: ModelRole,
        screen: ModelScreen,
        name: Option<ModelName>,
    ) -> OperationResult {
        let Some(screen) = screen_index(screen) else {
            return OperationResult::Unknown;
        };

        // Endpoints never claim; they always hear busy.
        if matches!(role, ModelRole::Endpoint(_)) || self.screens[screen].is_some() {
            return OperationResult::Busy;
        }

        // Moving frees the old screen in the same publication.
        if let ModelRole::Claimant(held) = role {
            if self.screens[held].as_ref().is_some_and(|(holder, _)| *holder == client_id) {
                self.screens[held] = None;
            }
        }

        self.screens[screen] = Some((client_id, display_name(name)));
        self.clients[usize::from(client_id)] = Some(ModelRole::Claimant(screen));
        self.revision += 1;
        OperationResult::Confirmed
    }

    fn apply_release(&mut self, client_id: ClientId, role: ModelRole) -> OperationResult {
        let ModelRole::Claimant(screen) = role else {
            return OperationResult::Ignored;
        };

        if !self.free_if_held(screen, client_id) {
            return OperationResult::Ignored;
        }

        self.clients[usize::from(client_id)] = Some(ModelRole::Unassigned);
        OperationResult::Ok
    }

    /// Free `screen` if `client_id` holds it, publishing the change.
    fn free_if_held(&mut self, screen: usize, client_id: ClientId) -> bool {
        if self.screens[screen].as_ref().is_some_and(|(holder, _)| *holder == client_id) {
            self.screens[screen] = None;
            self.revision += 1;
            true
        } else {
            false
        }
    }
}

fn display_name(name: Option<ModelName>) -> String {
    match name {
        None | Some(ModelName::Blank) => PLACEHOLDER_NAME.to_string(),
        Some(name) => name.as_str().to_string(),
    }
}
