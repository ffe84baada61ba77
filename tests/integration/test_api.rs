//! Integration tests for the HTTP session API.
//!
//! These tests start a real server on a free port and talk to it over HTTP,
//! with a scripted generation backend behind the orchestrator.

use std::net::TcpListener;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tutor_engine::{
    create_router, AppState, Config, CreateSessionResponse, Curriculum, GenerationBackend,
    GenerationGateway, ScriptedBackend, ScriptedReply, SessionSummary, TurnOrchestrator,
    TurnOutcome, TutorMode,
};

/// Helper to find an available port for testing.
fn find_available_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .expect("Failed to bind to port")
        .local_addr()
        .expect("Failed to get local addr")
        .port()
}

/// Builds server state over the sample exercise with a scripted backend.
fn test_state(replies: Vec<Value>) -> AppState {
    let fixture = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures/sample-exercise");
    let config = Config::load_from_dir(&fixture).expect("Failed to load fixture config");
    let curriculum =
        Curriculum::load(fixture.join(&config.curriculum)).expect("Failed to load exercise");

    let backend: Arc<dyn GenerationBackend> = Arc::new(ScriptedBackend::with_replies(
        "scripted",
        replies.into_iter().map(ScriptedReply::Value),
    ));
    let gateway = GenerationGateway::new(vec![backend], config.generation.timeout());
    let orchestrator = TurnOrchestrator::new(gateway, config.history_window);

    AppState::with_orchestrator(config, Arc::new(curriculum), orchestrator)
}

/// Spawns the test server and returns its base URL.
async fn spawn_test_server(state: AppState) -> (String, tokio::task::JoinHandle<()>) {
    let port = find_available_port();
    let addr = format!("127.0.0.1:{port}");
    let base_url = format!("http://{addr}/api");

    let router = create_router(state);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind");

    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("Server failed");
    });

    // Give the server a moment to start
    tokio::time::sleep(Duration::from_millis(50)).await;

    (base_url, handle)
}

async fn create_session(
    client: &reqwest::Client,
    base_url: &str,
    body: Value,
) -> CreateSessionResponse {
    let response = client
        .post(format!("{base_url}/sessions"))
        .json(&body)
        .send()
        .await
        .expect("Failed to create session");
    assert_eq!(response.status(), reqwest::StatusCode::CREATED);
    response.json().await.expect("Failed to parse session")
}

async fn send_message(
    client: &reqwest::Client,
    base_url: &str,
    session_id: &str,
    text: &str,
) -> TurnOutcome {
    let response = client
        .post(format!("{base_url}/sessions/{session_id}/messages"))
        .json(&json!({ "text": text }))
        .send()
        .await
        .expect("Failed to send message");
    assert!(response.status().is_success());
    response.json().await.expect("Failed to parse outcome")
}

// ============================================================================
// Session Lifecycle
// ============================================================================

#[tokio::test]
async fn test_session_round_trip_over_http() {
    let state = test_state(vec![
        json!({"main_question_answered": true, "guiding_question_answered": false}),
        json!({"feedback": "Right, the measurements are dependent."}),
    ]);
    let (base_url, _handle) = spawn_test_server(state).await;
    let client = reqwest::Client::new();

    let created = create_session(&client, &base_url, json!({"tutorMode": "SOCRATIC"})).await;
    assert_eq!(created.events.len(), 3);
    assert!(created.events[1]
        .text()
        .contains("repeated-measures ANOVA more appropriate"));

    let outcome = send_message(
        &client,
        &base_url,
        &created.session_id,
        "Each participant is measured three times",
    )
    .await;
    assert!(!outcome.finished);
    assert_eq!(
        outcome.events[0].text(),
        "Right, the measurements are dependent."
    );

    let summary: SessionSummary = client
        .get(format!("{base_url}/sessions/{}", created.session_id))
        .send()
        .await
        .expect("Failed to fetch summary")
        .json()
        .await
        .expect("Failed to parse summary");

    assert_eq!(summary.session_id, created.session_id);
    assert_eq!(summary.tutor_mode, TutorMode::Socratic);
    assert_eq!(summary.current_checkpoint, 2);
    assert_eq!(summary.total_checkpoints, 2);
    assert_eq!(summary.total_interactions, 1);
    assert!(!summary.exercise_complete);
}

#[tokio::test]
async fn test_sessions_are_independent() {
    let (base_url, _handle) = spawn_test_server(test_state(Vec::new())).await;
    let client = reqwest::Client::new();

    let first = create_session(&client, &base_url, json!({})).await;
    let second = create_session(&client, &base_url, json!({})).await;
    assert_ne!(first.session_id, second.session_id);

    let outcome = send_message(&client, &base_url, &first.session_id, "/goto 2").await;
    assert_eq!(outcome.events[0].text(), "Jumping to checkpoint 2.");

    let summary: Value = client
        .get(format!("{base_url}/sessions/{}", second.session_id))
        .send()
        .await
        .expect("Failed to fetch summary")
        .json()
        .await
        .expect("Failed to parse summary");
    assert_eq!(summary["current_checkpoint"], 1);
    assert_eq!(summary["tutor_mode"], "instructional");
}

#[tokio::test]
async fn test_unknown_session_returns_not_found() {
    let (base_url, _handle) = spawn_test_server(test_state(Vec::new())).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{base_url}/sessions/missing/messages"))
        .json(&json!({"text": "hello"}))
        .send()
        .await
        .expect("Failed to send message");

    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
    let body: Value = response.json().await.expect("Failed to parse error");
    assert!(body["error"].as_str().is_some_and(|e| e.contains("missing")));
}

#[tokio::test]
async fn test_deleted_session_is_gone() {
    let (base_url, _handle) = spawn_test_server(test_state(Vec::new())).await;
    let client = reqwest::Client::new();

    let created = create_session(&client, &base_url, json!({})).await;
    let url = format!("{base_url}/sessions/{}", created.session_id);

    let response = client.delete(&url).send().await.expect("Failed to delete");
    assert_eq!(response.status(), reqwest::StatusCode::NO_CONTENT);

    let response = client.get(&url).send().await.expect("Failed to fetch summary");
    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
}
