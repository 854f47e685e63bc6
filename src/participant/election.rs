//! Controller Election Listener
//!
//! The listener a leading participant attaches to its session. It records
//! what the session tells it so the owning controller can see whether it is
//! still registered as a candidate. Choosing the winner is left to the
//! coordination backend.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crate::session::{
    ControllerChange, ControllerHandle, ElectionBinding, ElectionListener, ElectionListenerFactory,
};

/// Election listener for one cluster's controller
pub struct DistControllerElection {
    controller: ControllerHandle,
    attached: AtomicBool,
    changes_seen: AtomicU64,
}

impl DistControllerElection {
    pub fn new(cluster_name: &str, controller_name: &str) -> Self {
        Self {
            controller: ControllerHandle::new(cluster_name, controller_name),
            attached: AtomicBool::new(false),
            changes_seen: AtomicU64::new(0),
        }
    }

    /// Whether the listener is currently registered on a live session
    pub fn is_attached(&self) -> bool {
        self.attached.load(Ordering::SeqCst)
    }

    /// Number of notifications received
    pub fn changes_seen(&self) -> u64 {
        self.changes_seen.load(Ordering::SeqCst)
    }
}

impl ElectionListener for DistControllerElection {
    fn controller(&self) -> &ControllerHandle {
        &self.controller
    }

    fn on_change(&self, change: ControllerChange) {
        self.changes_seen.fetch_add(1, Ordering::SeqCst);
        match change {
            ControllerChange::Attached { session_id } => {
                self.attached.store(true, Ordering::SeqCst);
                tracing::info!(
                    "{} registered as controller candidate for cluster {} (session {})",
                    self.controller.controller_name,
                    self.controller.cluster_name,
                    session_id
                );
            }
            ControllerChange::Detached { session_id }
            | ControllerChange::SessionClosed { session_id } => {
                self.attached.store(false, Ordering::SeqCst);
                tracing::info!(
                    "{} no longer a controller candidate for cluster {} (session {})",
                    self.controller.controller_name,
                    self.controller.cluster_name,
                    session_id
                );
            }
        }
    }
}

/// Creates a [`DistControllerElection`] per leadership acquisition
#[derive(Debug, Default, Clone, Copy)]
pub struct DistControllerElectionFactory;

impl ElectionListenerFactory for DistControllerElectionFactory {
    fn create(&self, cluster_name: &str, controller_name: &str) -> ElectionBinding {
        let election = Arc::new(DistControllerElection::new(cluster_name, controller_name));
        let controller = election.controller().clone();
        ElectionBinding {
            listener: election,
            controller,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_tracks_attachment() {
        let election = DistControllerElection::new("clusterA", "ctrl1");
        let session_id = Uuid::new_v4();
        assert!(!election.is_attached());

        election.on_change(ControllerChange::Attached { session_id });
        assert!(election.is_attached());

        election.on_change(ControllerChange::SessionClosed { session_id });
        assert!(!election.is_attached());
        assert_eq!(election.changes_seen(), 2);
    }

    #[test]
    fn test_factory_binding_shares_handle() {
        let binding = DistControllerElectionFactory.create("clusterA", "ctrl1");
        assert_eq!(binding.listener.controller(), &binding.controller);
        assert_eq!(binding.controller.cluster_name, "clusterA");

        let other = DistControllerElectionFactory.create("clusterA", "ctrl1");
        assert_ne!(other.controller.listener_id, binding.controller.listener_id);
    }
}
