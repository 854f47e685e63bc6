//! State Module
//!
//! Controller states, the transition messages that move a controller
//! between them, and the per-message context handed from a transition
//! handler to whatever later tears its work down.

mod model;
mod message;
mod context;

pub use model::ControllerState;
pub use message::{ResourceKey, TransitionMessage};
pub use context::TransitionContext;
