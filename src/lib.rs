//! WolfController - Distributed Cluster Controller Participant
//!
//! The participant side of cluster controller leadership. An external
//! coordination service tells each participant which state every
//! controller instance should be in; this crate runs the transitions,
//! opening a coordination session and joining the controller election
//! when a controller becomes LEADER, and releasing both when it steps down
//! or when a transition fails.
//!
//! # Architecture
//!
//! - [`transition`]: validated transition tables and the dispatcher that
//!   serializes transitions per resource and drives rollback on failure
//! - [`participant`]: the leadership state model and its session registry
//! - [`session`]: coordination backend interfaces and an in-memory backend
//! - [`state`]: controller states, transition messages and their context
//! - [`api`]: HTTP endpoints for transition delivery and diagnostics

pub mod config;
pub mod error;
pub mod state;
pub mod session;
pub mod participant;
pub mod transition;
pub mod api;

pub use config::ControllerConfig;
pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::ControllerConfig;
    pub use crate::error::{Error, Result};
    pub use crate::state::{ControllerState, ResourceKey, TransitionContext, TransitionMessage};
    pub use crate::session::{Session, SessionFactory, ElectionListener, ElectionListenerFactory};
    pub use crate::participant::{LeadershipStateMachine, SessionRegistry};
    pub use crate::transition::{StateModel, TransitionDispatcher};
}
