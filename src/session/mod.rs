//! Coordination Sessions
//!
//! Interfaces to the coordination backend: live sessions, the factory that
//! opens them, and the election listeners that get attached to them.
//! The backend itself lives outside this crate; [`MemoryCoordinator`] is an
//! in-process implementation for local runs and tests.

mod memory;

use std::sync::Arc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;

pub use memory::{CoordinatorStats, MemoryCoordinator, MemorySession};

/// Handle to the controller object produced by an election listener.
///
/// Stored in the transition context and passed back to the session to
/// detach the listener it identifies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ControllerHandle {
    /// Identifier of the listener registration
    pub listener_id: Uuid,
    pub cluster_name: String,
    pub controller_name: String,
}

impl ControllerHandle {
    /// Create a handle with a fresh listener id
    pub fn new(cluster_name: impl Into<String>, controller_name: impl Into<String>) -> Self {
        Self {
            listener_id: Uuid::new_v4(),
            cluster_name: cluster_name.into(),
            controller_name: controller_name.into(),
        }
    }
}

/// Notification delivered by a session to its listeners
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControllerChange {
    /// Listener was registered on the session
    Attached { session_id: Uuid },
    /// Listener was removed from the session
    Detached { session_id: Uuid },
    /// Session was disconnected while the listener was attached
    SessionClosed { session_id: Uuid },
}

/// A listener that takes part in electing the active controller
pub trait ElectionListener: Send + Sync {
    /// Handle identifying this listener's controller object
    fn controller(&self) -> &ControllerHandle;

    /// Called by the session on registration changes
    fn on_change(&self, change: ControllerChange);
}

/// A freshly created election listener and its controller handle
pub struct ElectionBinding {
    pub listener: Arc<dyn ElectionListener>,
    pub controller: ControllerHandle,
}

/// Creates election listeners for a cluster
pub trait ElectionListenerFactory: Send + Sync {
    fn create(&self, cluster_name: &str, controller_name: &str) -> ElectionBinding;
}

/// A live connection to the coordination backend for one controller/cluster pair.
///
/// Calling `disconnect` twice is not supported; callers must make sure a
/// session is disconnected at most once.
#[async_trait::async_trait]
pub trait Session: Send + Sync {
    /// Session identifier
    fn id(&self) -> Uuid;

    fn cluster_name(&self) -> &str;

    fn controller_name(&self) -> &str;

    /// When the session was opened
    fn connected_at(&self) -> chrono::DateTime<chrono::Utc>;

    /// Register an election listener
    async fn add_listener(&self, listener: Arc<dyn ElectionListener>) -> Result<()>;

    /// Remove a previously registered listener
    async fn remove_listener(&self, controller: &ControllerHandle) -> Result<()>;

    /// Close the session
    async fn disconnect(&self) -> Result<()>;
}

/// Opens sessions against the coordination backend
#[async_trait::async_trait]
pub trait SessionFactory: Send + Sync {
    async fn create_session(
        &self,
        cluster_name: &str,
        controller_name: &str,
        backend_address: &str,
    ) -> Result<Arc<dyn Session>>;
}
