//! Reference model for model-based testing.
//!
//! [`ModelWorld`] applies the occupancy rules with the plainest possible
//! state. Tests apply the same [`Operation`] sequence to the model and to the
//! real coordinator and require identical results and [`ObservableState`].

mod operation;
mod world;

pub use operation::{
    ClientId, MODEL_SCREENS, ModelName, ModelScreen, Operation, OperationError, OperationResult,
    UNKNOWN_SCREEN, screen_index, screen_name,
};
pub use world::{ModelRole, ModelWorld, ObservableState, PLACEHOLDER_NAME};
