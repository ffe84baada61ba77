//! HTTP API for driving tutoring sessions.
//!
//! # Endpoints
//!
//! - `POST /api/sessions` - Start a session, returns its id and opening events
//! - `POST /api/sessions/:id/messages` - Submit a learner message, returns the turn outcome
//! - `GET /api/sessions/:id` - Get a session summary
//! - `DELETE /api/sessions/:id` - End a session and release it
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tutor_engine::{create_router, AppState, Config, Curriculum};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::default();
//! let curriculum = Arc::new(Curriculum::load(&config.curriculum)?);
//! let router = create_router(AppState::new(config, curriculum));
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, router).await?;
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{debug, info};

use crate::{
    Config, Curriculum, SessionSummary, TurnOrchestrator, TurnOutcome, TutorError, TutorEvent,
    TutorMode, TutorSession,
};

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for creating a session.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    /// Overrides the configured tutor mode for this session.
    #[serde(default)]
    pub tutor_mode: Option<TutorMode>,
}

/// Response body for a created session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionResponse {
    /// Id to use in subsequent requests.
    pub session_id: String,
    /// Opening events: greeting, main question, first guiding question.
    pub events: Vec<TutorEvent>,
}

/// Request body for submitting a learner message.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageRequest {
    /// The learner's message.
    pub text: String,
}

/// Error response body returned on failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Description of the error.
    pub error: String,
}

// ============================================================================
// Application State
// ============================================================================

type SessionMap = HashMap<String, Arc<Mutex<TutorSession>>>;

/// Shared application state for the HTTP server.
///
/// Each session sits behind its own lock, so requests for one session are
/// serialized while different sessions proceed independently.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Tutor configuration.
    pub config: Config,
    /// The exercise every session works through.
    pub curriculum: Arc<Curriculum>,
    /// Runs turns for all sessions.
    pub orchestrator: TurnOrchestrator,
    /// Live sessions by id.
    pub sessions: Arc<Mutex<SessionMap>>,
}

impl AppState {
    /// Creates state with an orchestrator built from `config`.
    #[must_use]
    pub fn new(config: Config, curriculum: Arc<Curriculum>) -> Self {
        let orchestrator = TurnOrchestrator::from_config(&config);
        Self::with_orchestrator(config, curriculum, orchestrator)
    }

    /// Creates state with an explicit orchestrator.
    #[must_use]
    pub fn with_orchestrator(
        config: Config,
        curriculum: Arc<Curriculum>,
        orchestrator: TurnOrchestrator,
    ) -> Self {
        Self {
            config,
            curriculum,
            orchestrator,
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    async fn session(&self, id: &str) -> Result<Arc<Mutex<TutorSession>>, ApiError> {
        self.sessions
            .lock()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(TutorError::session_not_found(id).to_string()))
    }
}

// ============================================================================
// API Error Type
// ============================================================================

/// Internal error type for API handlers.
#[derive(Debug)]
enum ApiError {
    /// No such session.
    NotFound(String),
    /// The request was well-formed JSON but not acceptable.
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}

// ============================================================================
// Router Setup
// ============================================================================

/// Creates the HTTP router with all API endpoints.
///
/// Routes live under `/api`, with CORS and request tracing layers.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/sessions", post(handle_create_session))
        .route(
            "/sessions/:id",
            get(handle_session_summary).delete(handle_delete_session),
        )
        .route("/sessions/:id/messages", post(handle_message));

    Router::new()
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(Arc::new(state))
}

// ============================================================================
// Handlers
// ============================================================================

/// Handler for `POST /api/sessions`.
async fn handle_create_session(
    State(state): State<Arc<AppState>>,
    body: Option<Json<CreateSessionRequest>>,
) -> (StatusCode, Json<CreateSessionResponse>) {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let tutor_mode = request.tutor_mode.unwrap_or(state.config.tutor_mode);

    let mut session = TutorSession::new(
        Arc::clone(&state.curriculum),
        tutor_mode,
        state.config.budget,
    );
    let events = state.orchestrator.opening(&mut session);
    let session_id = session.id().to_string();

    state
        .sessions
        .lock()
        .await
        .insert(session_id.clone(), Arc::new(Mutex::new(session)));
    info!(session_id = %session_id, mode = %tutor_mode, "Session started");

    (
        StatusCode::CREATED,
        Json(CreateSessionResponse { session_id, events }),
    )
}

/// Handler for `POST /api/sessions/:id/messages`.
async fn handle_message(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<MessageRequest>,
) -> Result<Json<TurnOutcome>, ApiError> {
    if request.text.trim().is_empty() {
        return Err(ApiError::BadRequest("text must not be empty".to_string()));
    }

    let session = state.session(&id).await?;
    let mut session = session.lock().await;
    debug!(session_id = %id, len = request.text.len(), "Received learner message");

    let outcome = state
        .orchestrator
        .handle_input(&mut session, &request.text)
        .await;
    Ok(Json(outcome))
}

/// Handler for `GET /api/sessions/:id`.
async fn handle_session_summary(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SessionSummary>, ApiError> {
    let session = state.session(&id).await?;
    let summary = session.lock().await.summary();
    Ok(Json(summary))
}

/// Handler for `DELETE /api/sessions/:id`.
async fn handle_delete_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let removed = state.sessions.lock().await.remove(&id);
    if removed.is_none() {
        return Err(ApiError::NotFound(
            TutorError::session_not_found(&id).to_string(),
        ));
    }

    info!(session_id = %id, "Session deleted");
    Ok(StatusCode::NO_CONTENT)
}
