//! Controller States

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::Error;

/// Lifecycle state of one controller instance for one cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControllerState {
    /// Not participating (initial state)
    Offline,
    /// Participating, not holding a session
    Standby,
    /// Holding a live session and registered in the election
    Leader,
    /// Removed from the cluster
    Dropped,
}

impl ControllerState {
    /// All states, in declaration order
    pub const ALL: [ControllerState; 4] = [
        ControllerState::Offline,
        ControllerState::Standby,
        ControllerState::Leader,
        ControllerState::Dropped,
    ];

    /// Wire name of the state
    pub fn as_str(&self) -> &'static str {
        match self {
            ControllerState::Offline => "OFFLINE",
            ControllerState::Standby => "STANDBY",
            ControllerState::Leader => "LEADER",
            ControllerState::Dropped => "DROPPED",
        }
    }
}

impl std::fmt::Display for ControllerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ControllerState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_uppercase();
        ControllerState::ALL
            .into_iter()
            .find(|state| state.as_str() == name)
            .ok_or(Error::UnknownState(name))
    }
}
