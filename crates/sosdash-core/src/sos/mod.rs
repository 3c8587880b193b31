//! The signed-in user's own SOS alert.

mod state_machine;

pub use state_machine::{SelfAlertState, SelfAlertStateMachine};
