//! End-to-end integration tests for the simbridge harness.
//!
//! These tests load the fixture objectives document, spawn a real HTTP
//! server, and drive it over the wire the way a simulation would: raw
//! colon-delimited status messages in, rendered progress views out.

use std::net::TcpListener;
use std::path::PathBuf;
use std::time::Duration;

use simbridge_cmi::{keys, CmiDataModel};
use simbridge_harness::{
    create_router, flatten_ids, objectives, AppState, HarnessConfig, HarnessSession,
    MessageResponse, SimulationStatus,
};

/// Path to the integration test fixtures.
fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
}

/// Helper to find an available port for testing.
fn find_available_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .expect("Failed to bind to port")
        .local_addr()
        .expect("Failed to get local addr")
        .port()
}

/// Loads the fixture objective tree from disk.
async fn fixture_objectives() -> Vec<simbridge_harness::ObjectiveNode> {
    let path = fixture_path().join("objectives.xml");
    objectives::load(path.to_str().expect("non-UTF8 path"), Duration::from_secs(5))
        .await
        .expect("Failed to load fixture objectives")
}

/// Spawns the test server and returns its base URL.
async fn spawn_test_server(state: AppState) -> (String, tokio::task::JoinHandle<()>) {
    let port = find_available_port();
    let addr = format!("127.0.0.1:{port}");
    let base_url = format!("http://{addr}");

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

/// Posts a raw status message and returns the parsed response.
async fn post_message(client: &reqwest::Client, base_url: &str, message: &str) -> MessageResponse {
    let response = client
        .post(format!("{base_url}/api/message"))
        .header("content-type", "text/plain")
        .body(message.to_string())
        .send()
        .await
        .expect("Failed to send message");

    assert!(response.status().is_success());
    response
        .json()
        .await
        .expect("Failed to parse message response")
}

/// Fetches a text endpoint.
async fn get_text(client: &reqwest::Client, base_url: &str, path: &str) -> String {
    let response = client
        .get(format!("{base_url}{path}"))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
    response.text().await.expect("Failed to read body")
}

// ============================================================================
// Fixture Tests
// ============================================================================

/// Tests that the fixture objectives document loads and flattens in
/// document order.
#[tokio::test]
async fn test_fixture_objectives_load() {
    let tree = fixture_objectives().await;

    assert_eq!(tree.len(), 3, "Expected three top-level objectives");
    assert_eq!(tree[0].id, "obj1");
    assert_eq!(tree[0].name, "Start the engine");
    assert_eq!(tree[0].children.len(), 2);

    let ids = flatten_ids(&tree);
    assert_eq!(ids, vec!["obj1", "obj1a", "obj1b", "obj2", "obj3"]);
}

/// Tests that the fixture config loads successfully.
#[test]
fn test_fixture_config_loads() {
    let config_path = fixture_path().join("harness.json");
    let config = HarnessConfig::load_from_file(&config_path).expect("Failed to load config");

    assert_eq!(config.objectives_source, "fixtures/objectives.xml");
    assert_eq!(config.fetch_timeout_seconds, 10);
    assert_eq!(config.event_buffer_capacity, 50);
    assert!(!config.source_is_url());
}

// ============================================================================
// Full Run Tests
// ============================================================================

/// Drives a complete simulation run over HTTP and verifies every view.
#[tokio::test]
async fn test_full_simulation_run() {
    let tree = fixture_objectives().await;
    let state = AppState::new(HarnessConfig::default(), tree);
    let (base_url, _handle) = spawn_test_server(state.clone()).await;
    let client = reqwest::Client::new();

    // Start the run
    let response = post_message(&client, &base_url, "sim:SIMULATION:RUNNING").await;
    assert!(response.acknowledged);
    assert_eq!(response.action, "simulation_started");

    // Complete two objectives and score one of them
    let response =
        post_message(&client, &base_url, "sim:OBJECTIVE_COMPLETION:COMPLETE:obj1a").await;
    assert_eq!(response.action, "objective_completed");

    let response = post_message(&client, &base_url, "sim:OBJECTIVE_COMPLETION:COMPLETE:obj2").await;
    assert_eq!(response.action, "objective_completed");

    let response = post_message(&client, &base_url, "sim:OBJECTIVE_SCORE:0.75:obj2").await;
    assert_eq!(response.action, "objective_scored");

    // Stop normally
    let response = post_message(&client, &base_url, "sim:SIMULATION:STOPPED_NORMAL").await;
    assert_eq!(response.action, "simulation_stopped");

    // Checklist: completed objectives are checked, others are not
    let checklist = get_text(&client, &base_url, "/api/objectives").await;
    assert!(checklist.contains(r#"id="obj1a" checked"#));
    assert!(checklist.contains(r#"id="obj2" checked"#));
    assert!(!checklist.contains(r#"id="obj1" checked"#));
    assert!(!checklist.contains(r#"id="obj3" checked"#));

    // Results: passed status and the recorded score, placeholder elsewhere
    let results = get_text(&client, &base_url, "/api/results").await;
    assert!(results.contains("<td>Fuel pumps on</td><td>passed</td><td>not set</td>"));
    assert!(results.contains("<td>Taxi to the runway</td><td>passed</td><td>0.75</td>"));
    assert!(results.contains("<td>Take off</td><td>unknown</td><td>not set</td>"));

    // Log: every message verbatim, in arrival order
    let log = get_text(&client, &base_url, "/api/log").await;
    assert_eq!(
        log,
        "sim:SIMULATION:RUNNING\n\
         sim:OBJECTIVE_COMPLETION:COMPLETE:obj1a\n\
         sim:OBJECTIVE_COMPLETION:COMPLETE:obj2\n\
         sim:OBJECTIVE_SCORE:0.75:obj2\n\
         sim:SIMULATION:STOPPED_NORMAL"
    );

    // Session: stopped normally with both completions recorded
    let body = get_text(&client, &base_url, "/api/session").await;
    let session: HarnessSession = serde_json::from_str(&body).expect("Failed to parse session");
    assert_eq!(session.status, SimulationStatus::StoppedNormal);
    assert_eq!(session.completed_ids(), vec!["obj1a", "obj2"]);

    // The data store carries the same outcome under the verbatim CMI keys
    let store = state.store.lock().await;
    assert_eq!(store.get(keys::OBJECTIVE_COUNT), "5");
    assert_eq!(store.get(&keys::objective_id(3)), "obj2");
    assert_eq!(store.get(&keys::success_status(3)), "passed");
    assert_eq!(store.get(&keys::scaled_score(3)), "0.75");
    assert_eq!(store.get(&keys::success_status(4)), "");
}

/// Tests that a second RUNNING message resets the log and completions.
#[tokio::test]
async fn test_running_starts_a_fresh_run() {
    let tree = fixture_objectives().await;
    let state = AppState::new(HarnessConfig::default(), tree);
    let (base_url, _handle) = spawn_test_server(state).await;
    let client = reqwest::Client::new();

    post_message(&client, &base_url, "sim:SIMULATION:RUNNING").await;
    post_message(&client, &base_url, "sim:OBJECTIVE_COMPLETION:COMPLETE:obj1a").await;
    post_message(&client, &base_url, "sim:SIMULATION:RUNNING").await;

    // The new run starts with the message that started it
    let log = get_text(&client, &base_url, "/api/log").await;
    assert_eq!(log, "sim:SIMULATION:RUNNING");

    let checklist = get_text(&client, &base_url, "/api/objectives").await;
    assert!(!checklist.contains(" checked"));
}

/// Tests that an abnormal stop is reflected in the session.
#[tokio::test]
async fn test_abnormal_stop() {
    let tree = fixture_objectives().await;
    let state = AppState::new(HarnessConfig::default(), tree);
    let (base_url, _handle) = spawn_test_server(state).await;
    let client = reqwest::Client::new();

    post_message(&client, &base_url, "sim:SIMULATION:RUNNING").await;
    let response = post_message(&client, &base_url, "sim:SIMULATION:STOPPED_ABNORMAL").await;
    assert_eq!(response.action, "simulation_stopped");

    let body = get_text(&client, &base_url, "/api/session").await;
    let session: HarnessSession = serde_json::from_str(&body).expect("Failed to parse session");
    assert_eq!(session.status, SimulationStatus::StoppedAbnormal);
}

// ============================================================================
// Message Edge Case Tests
// ============================================================================

/// Tests that an ERROR sender wins over the message type.
#[tokio::test]
async fn test_error_sender_takes_precedence() {
    let tree = fixture_objectives().await;
    let state = AppState::new(HarnessConfig::default(), tree);
    let (base_url, _handle) = spawn_test_server(state).await;
    let client = reqwest::Client::new();

    let response = post_message(
        &client,
        &base_url,
        "ERROR:OBJECTIVE_COMPLETION:COMPLETE:obj1a",
    )
    .await;
    assert_eq!(response.action, "error_reported");

    // The completion payload was not applied
    let checklist = get_text(&client, &base_url, "/api/objectives").await;
    assert!(!checklist.contains(" checked"));

    let body = get_text(&client, &base_url, "/api/session").await;
    let session: HarnessSession = serde_json::from_str(&body).expect("Failed to parse session");
    assert_eq!(session.status, SimulationStatus::Error);
}

/// Tests that a completion for an unknown objective is acknowledged,
/// logged, and otherwise a no-op.
#[tokio::test]
async fn test_unknown_objective_is_logged_but_ignored() {
    let tree = fixture_objectives().await;
    let state = AppState::new(HarnessConfig::default(), tree);
    let (base_url, _handle) = spawn_test_server(state).await;
    let client = reqwest::Client::new();

    let response = post_message(
        &client,
        &base_url,
        "sim:OBJECTIVE_COMPLETION:COMPLETE:no_such_objective",
    )
    .await;
    assert!(response.acknowledged);
    assert_eq!(response.action, "ignored");

    let log = get_text(&client, &base_url, "/api/log").await;
    assert_eq!(log, "sim:OBJECTIVE_COMPLETION:COMPLETE:no_such_objective");

    let results = get_text(&client, &base_url, "/api/results").await;
    assert!(!results.contains("passed"));
}

/// Tests that a non-numeric or out-of-range score is ignored.
#[tokio::test]
async fn test_invalid_scores_are_ignored() {
    let tree = fixture_objectives().await;
    let state = AppState::new(HarnessConfig::default(), tree);
    let (base_url, _handle) = spawn_test_server(state).await;
    let client = reqwest::Client::new();

    let response = post_message(&client, &base_url, "sim:OBJECTIVE_SCORE:high:obj2").await;
    assert_eq!(response.action, "ignored");

    let response = post_message(&client, &base_url, "sim:OBJECTIVE_SCORE:1.5:obj2").await;
    assert_eq!(response.action, "ignored");

    let results = get_text(&client, &base_url, "/api/results").await;
    assert!(results.contains("<td>Taxi to the runway</td><td>unknown</td><td>not set</td>"));
}

/// Tests that a message with fewer than four fields is still handled;
/// missing fields read as empty.
#[tokio::test]
async fn test_short_message_is_logged() {
    let tree = fixture_objectives().await;
    let state = AppState::new(HarnessConfig::default(), tree);
    let (base_url, _handle) = spawn_test_server(state).await;
    let client = reqwest::Client::new();

    let response = post_message(&client, &base_url, "sim:SIMULATION").await;
    assert_eq!(response.action, "ignored");

    let log = get_text(&client, &base_url, "/api/log").await;
    assert_eq!(log, "sim:SIMULATION");
}

// ============================================================================
// Empty Tree Tests
// ============================================================================

/// Tests that a harness with no objectives still logs messages and
/// renders empty views.
#[tokio::test]
async fn test_empty_tree_still_logs() {
    let state = AppState::new(HarnessConfig::default(), Vec::new());
    let (base_url, _handle) = spawn_test_server(state).await;
    let client = reqwest::Client::new();

    post_message(&client, &base_url, "sim:SIMULATION:RUNNING").await;
    let response = post_message(&client, &base_url, "sim:OBJECTIVE_COMPLETION:COMPLETE:obj1").await;
    assert_eq!(response.action, "ignored");

    let log = get_text(&client, &base_url, "/api/log").await;
    assert_eq!(
        log,
        "sim:SIMULATION:RUNNING\nsim:OBJECTIVE_COMPLETION:COMPLETE:obj1"
    );

    let checklist = get_text(&client, &base_url, "/api/objectives").await;
    assert_eq!(checklist, "<table class=\"objective-checklist\">\n</table>\n");
}
