//! HTTP API Server
//!
//! REST API for delivering transition messages and inspecting the
//! participant's sessions and resource states.

use std::sync::Arc;
use axum::{
    extract::{State, Json},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use crate::config::ApiConfig;
use crate::participant::{LeadershipStateMachine, SessionSummary};
use crate::state::TransitionMessage;
use crate::transition::{ParticipantState, StateModel, TransitionDispatcher};
use crate::error::{Error, Result};

/// Shared application state
pub struct AppState {
    /// Participant ID
    pub node_id: String,
    /// Dispatcher driving the leadership state model
    pub dispatcher: Arc<TransitionDispatcher<LeadershipStateMachine>>,
    /// When the API started
    pub started_at: chrono::DateTime<chrono::Utc>,
}

/// HTTP API server
pub struct HttpServer {
    config: ApiConfig,
    state: Arc<AppState>,
}

impl HttpServer {
    /// Create a new HTTP server
    pub fn new(
        config: ApiConfig,
        node_id: String,
        dispatcher: Arc<TransitionDispatcher<LeadershipStateMachine>>,
    ) -> Self {
        let state = Arc::new(AppState {
            node_id,
            dispatcher,
            started_at: chrono::Utc::now(),
        });

        Self { config, state }
    }

    /// Get the state for sharing with other components
    pub fn state(&self) -> Arc<AppState> {
        Arc::clone(&self.state)
    }

    /// Create the router
    fn create_router(state: Arc<AppState>) -> Router {
        Router::new()
            .route("/health", get(handle_health))
            .route("/status", get(handle_status))
            .route("/controllers", get(handle_controllers))
            .route("/participants", get(handle_participants))
            .route("/transitions", post(handle_transition))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Start the HTTP server
    pub async fn start(&self) -> Result<()> {
        if !self.config.enabled {
            tracing::info!("HTTP API disabled");
            return Ok(());
        }

        let listener = tokio::net::TcpListener::bind(&self.config.bind_address).await?;
        tracing::info!("HTTP API listening on {}", self.config.bind_address);
        self.serve(listener).await
    }

    /// Serve on an already bound listener
    pub async fn serve(&self, listener: tokio::net::TcpListener) -> Result<()> {
        let app = Self::create_router(Arc::clone(&self.state));
        axum::serve(listener, app)
            .await
            .map_err(|e| Error::Network(format!("HTTP server error: {}", e)))?;

        Ok(())
    }
}

// ============ Response Types ============

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub node_id: String,
}

/// Status response
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub node_id: String,
    pub state_model: String,
    pub backend_address: String,
    pub leading_controllers: usize,
    pub tracked_resources: usize,
    pub accepting_transitions: bool,
    pub uptime_seconds: u64,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

// ============ Handlers ============

async fn handle_health(
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    Json(HealthResponse {
        healthy: !state.dispatcher.is_closed(),
        node_id: state.node_id.clone(),
    })
}

async fn handle_status(
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let model = state.dispatcher.model();
    let uptime = chrono::Utc::now() - state.started_at;

    Json(StatusResponse {
        node_id: state.node_id.clone(),
        state_model: model.name().to_string(),
        backend_address: model.backend_address().to_string(),
        leading_controllers: model.registry().len(),
        tracked_resources: state.dispatcher.states().len(),
        accepting_transitions: !state.dispatcher.is_closed(),
        uptime_seconds: uptime.num_seconds().max(0) as u64,
    })
}

async fn handle_controllers(
    State(state): State<Arc<AppState>>,
) -> Json<Vec<SessionSummary>> {
    Json(state.dispatcher.model().controllers())
}

async fn handle_participants(
    State(state): State<Arc<AppState>>,
) -> Json<Vec<ParticipantState>> {
    Json(state.dispatcher.states())
}

async fn handle_transition(
    State(state): State<Arc<AppState>>,
    Json(message): Json<TransitionMessage>,
) -> Response {
    tracing::debug!(
        "Received {} -> {} for {}",
        message.from,
        message.to,
        message.resource()
    );

    match state.dispatcher.dispatch(message).await {
        Ok(outcome) => Json(outcome).into_response(),
        Err(e) => error_response(&e),
    }
}

fn error_response(error: &Error) -> Response {
    let status = match error {
        Error::ShuttingDown => StatusCode::SERVICE_UNAVAILABLE,
        e if e.is_rejection() => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let code = match error {
        Error::StateMismatch { .. } => "STATE_MISMATCH",
        Error::InvalidTransition { .. } => "INVALID_TRANSITION",
        Error::ShuttingDown => "SHUTTING_DOWN",
        e if e.is_transition_failure() => "TRANSITION_FAILED",
        _ => "INTERNAL_ERROR",
    };

    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
            code: code.to_string(),
        }),
    ).into_response()
}
