//! Transition Dispatch
//!
//! A state model publishes the transitions it supports together with a
//! handler for each. The dispatcher tracks every resource's current state,
//! runs the matching handler for each incoming message and hands failures
//! to the model's rollback.

mod table;
mod dispatcher;

pub use table::{TransitionHandler, TransitionTable, TransitionTableBuilder};
pub use dispatcher::{DispatcherConfig, ParticipantState, TransitionDispatcher, TransitionOutcome};

use crate::error::{Error, Result};
use crate::state::{TransitionContext, TransitionMessage};

/// A participant state model driven by a [`TransitionDispatcher`]
#[async_trait::async_trait]
pub trait StateModel: Send + Sync + Sized + 'static {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Build and validate the model's transition table
    fn transition_table() -> Result<TransitionTable<Self>>;

    /// Undo whatever a failed handler left behind.
    ///
    /// Must not fail: anything that goes wrong here is logged and absorbed.
    async fn rollback_on_error(
        &self,
        message: &TransitionMessage,
        context: &mut TransitionContext,
        error: &Error,
    );
}
