//! HTTP JSON API for the chat widget.
//!
//! Routes:
//! - `GET    /health`
//! - `POST   /api/sessions?<query_param>=<tenant>` — open a session
//! - `GET    /api/sessions/:id` — transcript
//! - `POST   /api/sessions/:id/messages` — send `{"text": ...}`, get `{"reply": ...}`
//! - `DELETE /api/sessions/:id` — end the session

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use uuid::Uuid;

use crate::persona::WelcomeBanner;
use crate::providers::{Message, ProviderError};
use crate::session::{Concierge, SessionError, SessionStore, StoreError};
use crate::tenants::ResolveError;

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
    concierge: Arc<Concierge>,
    store: Arc<SessionStore>,
    query_param: Arc<str>,
}

impl AppState {
    /// Create handler state. `query_param` names the tenant query parameter.
    pub fn new(concierge: Arc<Concierge>, store: Arc<SessionStore>, query_param: &str) -> Self {
        Self {
            concierge,
            store,
            query_param: Arc::from(query_param),
        }
    }

    /// The live session store.
    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// Body returned when a session opens.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionCreated {
    /// New session id.
    pub session_id: Uuid,
    /// Tenant the session is bound to.
    pub tenant_id: String,
    /// Whether the tenant was requested or defaulted.
    pub tenant_source: String,
    /// Widget texts.
    pub welcome: WelcomeBanner,
}

/// Transcript of a live session.
#[derive(Debug, Serialize, Deserialize)]
pub struct Transcript {
    /// Session id.
    pub session_id: Uuid,
    /// Tenant the session is bound to.
    pub tenant_id: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Completed turns, oldest first.
    pub turns: Vec<Message>,
}

/// Guest message body.
#[derive(Debug, Serialize, Deserialize)]
pub struct SendMessage {
    /// Message text, forwarded verbatim.
    pub text: String,
}

/// Concierge reply body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReplyBody {
    /// Reply text, unmodified.
    pub reply: String,
}

/// Error body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Guest-visible message.
    pub error: String,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Handler failures mapped to HTTP statuses.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Unknown tenant identifier.
    #[error(transparent)]
    Tenant(#[from] ResolveError),
    /// No live session with this id.
    #[error("session {0} not found")]
    SessionNotFound(Uuid),
    /// Session limit reached.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Request body is not a valid message.
    #[error("invalid message body: {}", .0.body_text())]
    Body(#[from] JsonRejection),
    /// Message rejected or model call failed.
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Tenant(_) | Self::SessionNotFound(_) => StatusCode::NOT_FOUND,
            Self::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Body(_) | Self::Session(SessionError::EmptyMessage) => StatusCode::BAD_REQUEST,
            Self::Session(SessionError::Provider(ProviderError::Timeout(_))) => {
                StatusCode::GATEWAY_TIMEOUT
            }
            Self::Session(SessionError::Provider(_)) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            error: format!("Error: {self}"),
        };
        (status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/sessions", post(create_session))
        .route(
            "/api/sessions/:id",
            get(get_transcript).delete(close_session),
        )
        .route("/api/sessions/:id/messages", post(send_message))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve the API on `listener` until `shutdown` resolves.
///
/// # Errors
///
/// Returns an error if the server fails while accepting connections.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    info!(%addr, "concierge API listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    info!("concierge API stopped");
    Ok(())
}

async fn health() -> &'static str {
    "ok"
}

async fn create_session(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<(StatusCode, Json<SessionCreated>), ApiError> {
    let requested = params.get(state.query_param.as_ref()).map(String::as_str);
    let session = state.concierge.open_session(requested)?;

    let body = SessionCreated {
        session_id: session.id(),
        tenant_id: session.context().tenant.id.clone(),
        tenant_source: session.context().source.to_string(),
        welcome: session.welcome().clone(),
    };
    state.store.insert(session).await?;

    Ok((StatusCode::CREATED, Json(body)))
}

async fn get_transcript(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Transcript>, ApiError> {
    let handle = state
        .store
        .get(id)
        .await
        .ok_or(ApiError::SessionNotFound(id))?;
    let mut session = handle.lock().await;
    session.touch();

    Ok(Json(Transcript {
        session_id: session.id(),
        tenant_id: session.context().tenant.id.clone(),
        created_at: session.context().created_at,
        turns: session.turns().to_vec(),
    }))
}

async fn send_message(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Result<Json<SendMessage>, JsonRejection>,
) -> Result<Json<ReplyBody>, ApiError> {
    let Json(body) = body?;
    let handle = state
        .store
        .get(id)
        .await
        .ok_or(ApiError::SessionNotFound(id))?;
    let mut session = handle.lock().await;
    // Evicted or closed while waiting for the lock.
    if !state.store.contains(id).await {
        return Err(ApiError::SessionNotFound(id));
    }

    match state.concierge.send_message(&mut session, &body.text).await {
        Ok(reply) => Ok(Json(ReplyBody { reply: reply.text })),
        Err(e) => {
            warn!(session_id = %id, error = %e, "message not answered");
            Err(e.into())
        }
    }
}

async fn close_session(State(state): State<AppState>, Path(id): Path<Uuid>) -> StatusCode {
    if state.store.remove(id).await {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}
