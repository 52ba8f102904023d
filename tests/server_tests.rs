#![cfg(feature = "server")]

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;
use trialogue::agent_router::{AgentProfile, AgentRouter};
use trialogue::client_wrapper::{
    BackendFailure, BackendFailureKind, ClientWrapper, Completion, Message,
};
use trialogue::server::{router, AppState};
use trialogue::{ConversationStore, Orchestrator, SnapshotStore};

struct MockClient {
    name: String,
    fail: bool,
}

#[async_trait]
impl ClientWrapper for MockClient {
    async fn send_message(
        &self,
        messages: &[Message],
        _system_prompt: &str,
    ) -> Result<Completion, BackendFailure> {
        if self.fail {
            return Err(BackendFailure::new(
                &self.name,
                BackendFailureKind::Transport,
                "connection reset",
            ));
        }
        Ok(Completion {
            content: format!("{} saw {} messages", self.name, messages.len()),
            usage: None,
        })
    }

    fn model_name(&self) -> &str {
        &self.name
    }
}

fn app(snapshot_dir: &TempDir, deepseek_fails: bool) -> Router {
    let mut agents = AgentRouter::new();
    agents.register(AgentProfile::claude(Arc::new(MockClient {
        name: "mock-claude".to_string(),
        fail: false,
    })));
    agents.register(AgentProfile::deepseek(Arc::new(MockClient {
        name: "mock-deepseek".to_string(),
        fail: deepseek_fails,
    })));
    let orchestrator = Orchestrator::new(Arc::new(ConversationStore::new()), agents);
    router(AppState::new(
        Arc::new(orchestrator),
        SnapshotStore::new(snapshot_dir.path()),
    ))
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<String>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body.map(Body::from).unwrap_or_else(Body::empty))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn chat(app: &Router, message: &str, ai: &str, conversation_id: &str) -> (StatusCode, Value) {
    let body = json!({"message": message, "ai": ai, "conversation_id": conversation_id});
    call(app, Method::POST, "/api/chat", Some(body.to_string())).await
}

#[tokio::test]
async fn test_root_reports_running() {
    let dir = TempDir::new().unwrap();
    let (status, body) = call(&app(&dir, false), Method::GET, "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "running");
}

#[tokio::test]
async fn test_chat_then_read_history() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir, false);

    let (status, body) = chat(&app, "Hi everyone!", "claude", "c1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["speaker"], "Claude");
    assert_eq!(body["response"], "mock-claude saw 1 messages");
    assert_eq!(body["conversation_id"], "c1");
    assert_eq!(body["backend_error"], false);

    let (_, body) = chat(&app, "And you?", "deepseek", "c1").await;
    assert_eq!(body["response"], "mock-deepseek saw 3 messages");

    let (status, body) = call(&app, Method::GET, "/api/conversation/c1", None).await;
    assert_eq!(status, StatusCode::OK);
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 4);
    assert_eq!(messages[0]["speaker"], "human");
    assert_eq!(messages[0]["role"], "user");
    assert_eq!(messages[1]["speaker"], "claude");
    assert_eq!(messages[3]["role"], "assistant");
}

#[tokio::test]
async fn test_chat_defaults_conversation_id() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir, false);

    let body = json!({"message": "hello", "ai": "claude"});
    let (status, body) = call(&app, Method::POST, "/api/chat", Some(body.to_string())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["conversation_id"], "default");
}

#[tokio::test]
async fn test_unknown_agent_is_bad_request() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir, false);

    let (status, body) = chat(&app, "hello", "gpt", "c1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("gpt"));

    let (_, body) = call(&app, Method::GET, "/api/conversation/c1", None).await;
    assert!(body["messages"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_backend_failure_is_a_normal_response() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir, true);

    let (status, body) = chat(&app, "hello", "deepseek", "c1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["backend_error"], true);
    assert!(body["response"]
        .as_str()
        .unwrap()
        .starts_with("Error: Unable to get response from DeepSeek."));
}

#[tokio::test]
async fn test_delete_and_summary() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir, false);
    chat(&app, "hello", "claude", "c1").await;

    let (_, body) = call(&app, Method::GET, "/api/conversation/c1/summary", None).await;
    let summary = body["summary"].as_str().unwrap();
    assert!(summary.starts_with("Conversation ID: c1\nTotal messages: 2\n\n1. [human] hello..."));

    let (status, body) = call(&app, Method::DELETE, "/api/conversation/c1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "cleared", "conversation_id": "c1"}));

    let (_, body) = call(&app, Method::GET, "/api/conversation/c1", None).await;
    assert!(body["messages"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_snapshot_put_validates() {
    let dir = TempDir::new().unwrap();
    let source = app(&dir, false);
    chat(&source, "hello", "claude", "c1").await;

    let (status, snapshot) = call(&source, Method::GET, "/api/conversation/c1/snapshot", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(snapshot["conversation_id"], "c1");
    assert_eq!(snapshot["messages"].as_array().unwrap().len(), 2);

    let target = app(&dir, false);
    let (status, _) = call(
        &target,
        Method::PUT,
        "/api/conversation/other/snapshot",
        Some(snapshot.to_string()),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(
        &target,
        Method::PUT,
        "/api/conversation/c1/snapshot",
        Some("{\"conversation_id\": ".to_string()),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = call(
        &target,
        Method::PUT,
        "/api/conversation/c1/snapshot",
        Some(snapshot.to_string()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "restored");
    assert_eq!(body["messages"], 2);
}

#[tokio::test]
async fn test_save_and_load_files() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir, false);
    chat(&app, "remember this", "claude", "c1").await;

    let (status, body) = call(&app, Method::POST, "/api/conversation/c1/save", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "saved");
    assert!(dir.path().join("c1.json").exists());

    call(&app, Method::DELETE, "/api/conversation/c1", None).await;

    let (status, body) = call(&app, Method::POST, "/api/conversation/c1/load", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["messages"], 2);

    let (_, body) = call(&app, Method::GET, "/api/conversation/c1", None).await;
    assert_eq!(body["messages"][0]["content"], "remember this");

    let (status, body) = call(&app, Method::POST, "/api/conversation/nope/load", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_health_reports_state() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir, false);
    chat(&app, "hello", "claude", "c1").await;
    chat(&app, "hello", "deepseek", "c2").await;

    let (status, body) = call(&app, Method::GET, "/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["anthropic_key_set"], true);
    assert_eq!(body["deepseek_key_set"], true);
    assert_eq!(body["active_conversations"], 2);
    assert_eq!(body["agents"], json!(["claude", "deepseek"]));
}
