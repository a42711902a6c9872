//! Deterministic simulation harness for screenwall testing.
//!
//! Turmoil-based server and client plus a seeded [`Environment`] for
//! deterministic, reproducible runs.
//!
//! # Model-Based Testing
//!
//! The `model` module provides a reference implementation of the occupancy
//! rules. Operations are applied to both the model and the real coordinator,
//! and their observable states are compared.
//!
//! # Invariant Testing
//!
//! The `invariants` module checks properties that must hold on every
//! execution path: occupants are live claimants, and every client sees one
//! ordered stream of agreeing snapshots. Use [`InvariantRegistry::standard()`]
//! for all of them.
//!
//! [`Environment`]: screenwall_core::Environment

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod invariants;
pub mod model;
pub mod sim_client;
pub mod sim_env;
pub mod sim_server;

pub use invariants::{
    ClientSnapshot, ConvergedViews, Invariant, InvariantRegistry, InvariantResult,
    OccupantIsClaimant, RevisionMonotonicity, ServerSnapshot, SingleScreenPerClaimant,
    SystemSnapshot, Violation,
};
pub use model::{
    ClientId, ModelName, ModelRole, ModelScreen, ModelWorld, ObservableState, Operation,
    OperationError, OperationResult,
};
pub use sim_client::{Received, SimClient};
pub use sim_env::SimEnv;
pub use sim_server::{SIM_PORT, SimServer};
