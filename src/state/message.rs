//! Transition Messages

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ControllerState;

/// Identifies one controller instance for one cluster.
///
/// Controller names are only unique within a cluster.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceKey {
    pub cluster_name: String,
    pub controller_name: String,
}

impl ResourceKey {
    pub fn new(cluster_name: impl Into<String>, controller_name: impl Into<String>) -> Self {
        Self {
            cluster_name: cluster_name.into(),
            controller_name: controller_name.into(),
        }
    }
}

impl std::fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.cluster_name, self.controller_name)
    }
}

/// A request to move a controller from one state to another
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionMessage {
    /// Message identifier
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    /// Cluster the controller manages
    pub cluster_name: String,
    /// Controller instance the message targets
    pub controller_name: String,
    /// State the sender believes the controller is in
    pub from: ControllerState,
    /// Requested state
    pub to: ControllerState,
    /// When the message was created
    #[serde(default = "chrono::Utc::now")]
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl TransitionMessage {
    /// Create a new transition message
    pub fn new(
        cluster_name: impl Into<String>,
        controller_name: impl Into<String>,
        from: ControllerState,
        to: ControllerState,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            cluster_name: cluster_name.into(),
            controller_name: controller_name.into(),
            from,
            to,
            created_at: chrono::Utc::now(),
        }
    }

    /// The resource this message targets
    pub fn resource(&self) -> ResourceKey {
        ResourceKey::new(self.cluster_name.clone(), self.controller_name.clone())
    }
}
