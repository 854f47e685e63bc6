//! Participant Module
//!
//! The controller-side participant: the leadership state model, the
//! registry of sessions it holds while leading, and the election listener
//! it attaches to those sessions.

mod registry;
mod election;
mod state_model;

pub use registry::{SessionRegistry, SessionSummary};
pub use election::{DistControllerElection, DistControllerElectionFactory};
pub use state_model::{LeadershipStateMachine, DECLARED_TRANSITIONS};
