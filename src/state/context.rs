//! Transition Context
//!
//! Scoped to one transition message. The leadership handler records the
//! controller handle of the election listener it attached here, and the
//! rollback path reads it back to detach the listener before disconnecting.

use crate::session::ControllerHandle;

use super::TransitionMessage;

/// Per-message handoff between a transition handler and its rollback
#[derive(Debug, Clone)]
pub struct TransitionContext {
    cluster_name: String,
    controller_name: String,
    controller: Option<ControllerHandle>,
}

impl TransitionContext {
    /// Create an empty context for a message
    pub fn new(message: &TransitionMessage) -> Self {
        Self {
            cluster_name: message.cluster_name.clone(),
            controller_name: message.controller_name.clone(),
            controller: None,
        }
    }

    pub fn cluster_name(&self) -> &str {
        &self.cluster_name
    }

    pub fn controller_name(&self) -> &str {
        &self.controller_name
    }

    /// Record the controller handle of an attached election listener
    pub fn set_controller(&mut self, handle: ControllerHandle) {
        self.controller = Some(handle);
    }

    /// The recorded controller handle, if any
    pub fn controller(&self) -> Option<&ControllerHandle> {
        self.controller.as_ref()
    }

    /// Take the recorded controller handle, leaving the context empty
    pub fn take_controller(&mut self) -> Option<ControllerHandle> {
        self.controller.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ControllerState;

    #[test]
    fn test_controller_handoff() {
        let msg = TransitionMessage::new(
            "clusterA",
            "ctrl1",
            ControllerState::Standby,
            ControllerState::Leader,
        );
        let mut ctx = TransitionContext::new(&msg);
        assert_eq!(ctx.cluster_name(), "clusterA");
        assert_eq!(ctx.controller_name(), "ctrl1");
        assert!(ctx.controller().is_none());

        let handle = ControllerHandle::new("clusterA", "ctrl1");
        ctx.set_controller(handle.clone());
        assert_eq!(ctx.controller(), Some(&handle));

        assert_eq!(ctx.take_controller(), Some(handle));
        assert!(ctx.take_controller().is_none());
    }
}
