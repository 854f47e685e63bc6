//! WolfController Error Types

use thiserror::Error;

use crate::state::ControllerState;

/// Result type alias for WolfController operations
pub type Result<T> = std::result::Result<T, Error>;

/// WolfController error types
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    // Session errors
    #[error("Failed to acquire session for {controller} in cluster {cluster}: {reason}")]
    SessionAcquisition {
        cluster: String,
        controller: String,
        reason: String,
    },

    #[error("Failed to register election listener for {controller} in cluster {cluster}: {reason}")]
    ListenerRegistration {
        cluster: String,
        controller: String,
        reason: String,
    },

    #[error("Session already registered for controller {0}")]
    SessionAlreadyRegistered(String),

    #[error("Disconnect failed for session {session}: {reason}")]
    Disconnect { session: String, reason: String },

    // State machine errors
    #[error("Unknown state: {0}")]
    UnknownState(String),

    #[error("No handler for transition {from} -> {to}")]
    InvalidTransition {
        from: ControllerState,
        to: ControllerState,
    },

    #[error("Declared transition {from} -> {to} has no handler")]
    MissingHandler {
        from: ControllerState,
        to: ControllerState,
    },

    #[error("Handler registered for undeclared transition {from} -> {to}")]
    UndeclaredTransition {
        from: ControllerState,
        to: ControllerState,
    },

    #[error("State mismatch for {resource}: expected {expected}, current is {current}")]
    StateMismatch {
        resource: String,
        expected: ControllerState,
        current: ControllerState,
    },

    #[error("Transition {from} -> {to} failed for {resource}: {source}")]
    TransitionFailed {
        resource: String,
        from: ControllerState,
        to: ControllerState,
        #[source]
        source: Box<Error>,
    },

    // Network errors
    #[error("Network error: {0}")]
    Network(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Internal errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Shutdown in progress")]
    ShuttingDown,
}

impl Error {
    /// Check if this error is a recoverable transition error that should
    /// drive a rollback (session acquisition or listener registration)
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::SessionAcquisition { .. }
            | Error::ListenerRegistration { .. }
            | Error::SessionAlreadyRegistered(_) => true,
            Error::TransitionFailed { source, .. } => source.is_recoverable(),
            _ => false,
        }
    }

    /// Check if the dispatcher rejected the message before running a handler
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Error::InvalidTransition { .. } | Error::StateMismatch { .. } | Error::ShuttingDown
        )
    }

    /// Check if a handler ran and failed
    pub fn is_transition_failure(&self) -> bool {
        matches!(self, Error::TransitionFailed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let acquisition = Error::SessionAcquisition {
            cluster: "clusterA".to_string(),
            controller: "ctrl1".to_string(),
            reason: "connection refused".to_string(),
        };
        assert!(acquisition.is_recoverable());
        assert!(!acquisition.is_rejection());

        let failed = Error::TransitionFailed {
            resource: "clusterA/ctrl1".to_string(),
            from: ControllerState::Standby,
            to: ControllerState::Leader,
            source: Box::new(acquisition),
        };
        assert!(failed.is_recoverable());
        assert!(failed.is_transition_failure());

        let mismatch = Error::StateMismatch {
            resource: "clusterA/ctrl1".to_string(),
            expected: ControllerState::Leader,
            current: ControllerState::Offline,
        };
        assert!(mismatch.is_rejection());
        assert!(!mismatch.is_recoverable());

        let disconnect = Error::Disconnect {
            session: "s-1".to_string(),
            reason: "already closed".to_string(),
        };
        assert!(!disconnect.is_recoverable());
    }
}
