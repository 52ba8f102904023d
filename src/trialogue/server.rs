//! HTTP surface over the [`Orchestrator`].
//!
//! | Method | Path | Body |
//! |--------|------|------|
//! | `GET` | `/` | |
//! | `POST` | `/api/chat` | `{message, ai, conversation_id?}` |
//! | `GET`, `DELETE` | `/api/conversation/{id}` | |
//! | `GET` | `/api/conversation/{id}/summary` | |
//! | `GET`, `PUT` | `/api/conversation/{id}/snapshot` | snapshot JSON on `PUT` |
//! | `POST` | `/api/conversation/{id}/save` | |
//! | `POST` | `/api/conversation/{id}/load` | |
//! | `GET` | `/api/health` | |
//!
//! Errors are returned as `{"error": "..."}` with the status given by
//! [`OrchestratorError`]'s mapping. A failed backend call is not an error: it comes back as a
//! normal chat response with `backend_error: true`.

use crate::agent_router::{CLAUDE_AGENT, DEEPSEEK_AGENT};
use crate::config::TrialogueConfig;
use crate::orchestrator::{Orchestrator, OrchestratorError};
use crate::snapshot::{ConversationSnapshot, SnapshotStore};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

const DEFAULT_CONVERSATION_ID: &str = "default";

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub snapshots: SnapshotStore,
}

impl AppState {
    pub fn new(orchestrator: Arc<Orchestrator>, snapshots: SnapshotStore) -> Self {
        AppState {
            orchestrator,
            snapshots,
        }
    }

    pub fn from_config(config: &TrialogueConfig) -> Self {
        Self::new(
            Arc::new(Orchestrator::from_config(config)),
            SnapshotStore::new(config.snapshot_dir.clone()),
        )
    }

    fn key_set(&self, agent_name: &str) -> bool {
        self.orchestrator
            .router()
            .route(agent_name)
            .map(|profile| profile.client.has_credentials())
            .unwrap_or(false)
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub ai: String,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

impl OrchestratorError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            OrchestratorError::UnknownAgent(_) | OrchestratorError::MalformedSnapshot(_) => {
                StatusCode::BAD_REQUEST
            }
            OrchestratorError::SnapshotNotFound(_) => StatusCode::NOT_FOUND,
            OrchestratorError::SnapshotIo(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for OrchestratorError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(json!({"error": self.to_string()}))).into_response()
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/api/chat", post(chat))
        .route(
            "/api/conversation/{id}",
            get(get_conversation).delete(delete_conversation),
        )
        .route("/api/conversation/{id}/summary", get(conversation_summary))
        .route(
            "/api/conversation/{id}/snapshot",
            get(get_snapshot).put(put_snapshot),
        )
        .route("/api/conversation/{id}/save", post(save_conversation))
        .route("/api/conversation/{id}/load", post(load_conversation))
        .route("/api/health", get(health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind `config.bind_addr` and serve until the process is stopped.
///
/// When a conversation TTL is configured, a background task evicts idle conversations.
pub async fn serve(config: TrialogueConfig) -> Result<(), Box<dyn Error + Send + Sync>> {
    let state = AppState::from_config(&config);
    if let Some(ttl) = config.conversation_ttl {
        spawn_idle_sweeper(state.orchestrator.clone(), ttl);
    }

    let listener = TcpListener::bind(config.bind_addr).await?;
    log::info!(
        "server::serve(...): listening on {} (agents: {})",
        listener.local_addr()?,
        state.orchestrator.router().names().join(", ")
    );
    axum::serve(listener, router(state)).await?;
    Ok(())
}

fn spawn_idle_sweeper(orchestrator: Arc<Orchestrator>, ttl: Duration) {
    let period = (ttl / 4).clamp(Duration::from_secs(1), Duration::from_secs(60));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            orchestrator.evict_idle_conversations();
        }
    });
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "app": "trialogue",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
    }))
}

async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<serde_json::Value>, OrchestratorError> {
    let conv_id = request
        .conversation_id
        .unwrap_or_else(|| DEFAULT_CONVERSATION_ID.to_string());
    let turn = state
        .orchestrator
        .chat(&conv_id, &request.message, &request.ai)
        .await?;

    Ok(Json(json!({
        "response": turn.content,
        "speaker": turn.display_name,
        "conversation_id": turn.conversation_id,
        "backend_error": turn.failure.is_some(),
    })))
}

async fn get_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<serde_json::Value> {
    Json(json!({
        "conversation_id": id,
        "messages": state.orchestrator.history(&id),
    }))
}

async fn delete_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<serde_json::Value> {
    state.orchestrator.delete_conversation(&id).await;
    Json(json!({"status": "cleared", "conversation_id": id}))
}

async fn conversation_summary(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<serde_json::Value> {
    let summary = state.orchestrator.summary(&id);
    Json(json!({"conversation_id": id, "summary": summary}))
}

async fn get_snapshot(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<ConversationSnapshot> {
    Json(state.orchestrator.snapshot(&id))
}

async fn put_snapshot(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: String,
) -> Result<Json<serde_json::Value>, OrchestratorError> {
    let snapshot = ConversationSnapshot::from_json(&body)?;
    restore_checked(&state, &id, snapshot).await
}

async fn save_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, OrchestratorError> {
    let snapshot = state.orchestrator.snapshot(&id);
    let path = state.snapshots.save(&snapshot)?;
    Ok(Json(json!({
        "status": "saved",
        "conversation_id": id,
        "path": path.display().to_string(),
        "messages": snapshot.messages.len(),
    })))
}

async fn load_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, OrchestratorError> {
    let snapshot = state.snapshots.load(&id)?;
    restore_checked(&state, &id, snapshot).await
}

async fn restore_checked(
    state: &AppState,
    id: &str,
    snapshot: ConversationSnapshot,
) -> Result<Json<serde_json::Value>, OrchestratorError> {
    if snapshot.conversation_id != id {
        return Err(OrchestratorError::MalformedSnapshot(format!(
            "snapshot is for conversation {:?}, not {:?}",
            snapshot.conversation_id, id
        )));
    }
    let restored = state.orchestrator.restore(snapshot).await?;
    Ok(Json(json!({
        "status": "restored",
        "conversation_id": id,
        "messages": restored,
    })))
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "anthropic_key_set": state.key_set(CLAUDE_AGENT),
        "deepseek_key_set": state.key_set(DEEPSEEK_AGENT),
        "active_conversations": state.orchestrator.conversation_count(),
        "agents": state.orchestrator.router().names(),
    }))
}
