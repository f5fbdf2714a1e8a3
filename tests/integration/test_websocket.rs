//! Integration tests for WebSocket real-time event streaming.
//!
//! These tests validate the WebSocket server functionality including
//! connection handling, event broadcasting, and concurrent client support.

use std::net::TcpListener;
use std::time::Duration;

use futures::SinkExt;
use futures::StreamExt;
use simbridge_harness::{
    create_router, AppState, HarnessConfig, HarnessEvent, ObjectiveNode, SimulationStatus,
};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tungstenite::Message;

/// Helper to find an available port for testing.
fn find_available_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .expect("Failed to bind to port")
        .local_addr()
        .expect("Failed to get local addr")
        .port()
}

/// Helper type for WebSocket client
type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Objective tree used throughout the WebSocket tests.
fn sample_objectives() -> Vec<ObjectiveNode> {
    vec![
        ObjectiveNode {
            id: "obj1".to_string(),
            name: "Start the engine".to_string(),
            children: Vec::new(),
        },
        ObjectiveNode {
            id: "obj2".to_string(),
            name: "Taxi to the runway".to_string(),
            children: Vec::new(),
        },
    ]
}

/// Spawns the test server and returns the WebSocket URL.
async fn spawn_test_server(state: AppState) -> (String, tokio::task::JoinHandle<()>) {
    let port = find_available_port();
    let addr = format!("127.0.0.1:{port}");
    let ws_url = format!("ws://{addr}/ws");

    let router = create_router(state);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind");

    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("Server failed");
    });

    // Give the server a moment to start
    tokio::time::sleep(Duration::from_millis(50)).await;

    (ws_url, handle)
}

/// Connects a WebSocket client to the given URL.
async fn connect_client(url: &str) -> WsClient {
    let (ws_stream, _) = connect_async(url)
        .await
        .expect("Failed to connect to WebSocket");
    ws_stream
}

/// Receives the next text message from the WebSocket and parses it as
/// a `HarnessEvent`. Automatically handles ping frames by responding
/// with pong.
async fn receive_event(client: &mut WsClient) -> HarnessEvent {
    loop {
        let msg = timeout(Duration::from_secs(5), client.next())
            .await
            .expect("Timeout waiting for message")
            .expect("Stream ended")
            .expect("WebSocket error");

        match msg {
            Message::Text(text) => {
                return serde_json::from_str(&text).expect("Failed to parse event");
            }
            Message::Ping(data) => {
                // Respond to ping and continue waiting for text message
                client
                    .send(Message::Pong(data))
                    .await
                    .expect("Failed to send pong");
            }
            Message::Pong(_) => {
                // Ignore pong messages, continue waiting
            }
            other => panic!("Expected text message, got: {other:?}"),
        }
    }
}

// ============================================================================
// Connection Tests
// ============================================================================

/// Tests that a WebSocket client receives a connected event on connection.
#[tokio::test]
async fn test_client_receives_connected_event_on_connect() {
    let state = AppState::new(HarnessConfig::default(), sample_objectives());
    let (ws_url, _handle) = spawn_test_server(state).await;

    let mut client = connect_client(&ws_url).await;
    let event = receive_event(&mut client).await;

    assert!(
        matches!(event, HarnessEvent::Connected(_)),
        "Expected Connected event, got: {event:?}"
    );

    if let HarnessEvent::Connected(payload) = event {
        assert_eq!(payload.session.status, SimulationStatus::Idle);
        assert!(payload.session.completed_ids().is_empty());
    }
}

/// Tests that the connected event contains the current session state.
#[tokio::test]
async fn test_connected_event_contains_current_session() {
    let state = AppState::new(HarnessConfig::default(), sample_objectives());

    // Simulate a run already in progress
    {
        let mut session = state.session.lock().await;
        session.reset_run();
        session.mark_completed("obj1");
    }

    let (ws_url, _handle) = spawn_test_server(state).await;

    let mut client = connect_client(&ws_url).await;
    let event = receive_event(&mut client).await;

    if let HarnessEvent::Connected(payload) = event {
        assert_eq!(payload.session.status, SimulationStatus::Running);
        assert_eq!(payload.session.completed_ids(), vec!["obj1"]);
    } else {
        panic!("Expected Connected event");
    }
}

// ============================================================================
// Multiple Client Tests
// ============================================================================

/// Tests that multiple clients can connect concurrently.
#[tokio::test]
async fn test_multiple_clients_can_connect() {
    let state = AppState::new(HarnessConfig::default(), sample_objectives());
    let (ws_url, _handle) = spawn_test_server(state).await;

    let mut client1 = connect_client(&ws_url).await;
    let mut client2 = connect_client(&ws_url).await;
    let mut client3 = connect_client(&ws_url).await;

    // All clients should receive connected events
    let event1 = receive_event(&mut client1).await;
    let event2 = receive_event(&mut client2).await;
    let event3 = receive_event(&mut client3).await;

    assert!(matches!(event1, HarnessEvent::Connected(_)));
    assert!(matches!(event2, HarnessEvent::Connected(_)));
    assert!(matches!(event3, HarnessEvent::Connected(_)));
}

// ============================================================================
// Event Broadcast Tests
// ============================================================================

/// Tests that events are broadcast to all connected clients.
#[tokio::test]
async fn test_events_broadcast_to_all_clients() {
    let state = AppState::new(HarnessConfig::default(), sample_objectives());
    let broadcaster = state.broadcaster.clone();
    let (ws_url, _handle) = spawn_test_server(state).await;

    let mut client1 = connect_client(&ws_url).await;
    let mut client2 = connect_client(&ws_url).await;

    // Consume connected events
    receive_event(&mut client1).await;
    receive_event(&mut client2).await;

    // Broadcast an event
    broadcaster.send(HarnessEvent::objective_completed("obj1"));

    // Both clients should receive it
    let event1 = receive_event(&mut client1).await;
    let event2 = receive_event(&mut client2).await;

    assert!(matches!(event1, HarnessEvent::ObjectiveCompleted(_)));
    assert!(matches!(event2, HarnessEvent::ObjectiveCompleted(_)));

    if let HarnessEvent::ObjectiveCompleted(payload) = event1 {
        assert_eq!(payload.id, "obj1");
    }
}

/// Tests that objective score events are broadcast.
#[tokio::test]
async fn test_objective_scored_event_broadcast() {
    let state = AppState::new(HarnessConfig::default(), sample_objectives());
    let broadcaster = state.broadcaster.clone();
    let (ws_url, _handle) = spawn_test_server(state).await;

    let mut client = connect_client(&ws_url).await;
    receive_event(&mut client).await; // Consume connected event

    broadcaster.send(HarnessEvent::objective_scored("obj2", 0.75));

    let event = receive_event(&mut client).await;

    if let HarnessEvent::ObjectiveScored(payload) = event {
        assert_eq!(payload.id, "obj2");
        assert!((payload.score - 0.75).abs() < f64::EPSILON);
    } else {
        panic!("Expected ObjectiveScored event, got: {event:?}");
    }
}

/// Tests that simulation stop events are broadcast.
#[tokio::test]
async fn test_simulation_stopped_event_broadcast() {
    let state = AppState::new(HarnessConfig::default(), sample_objectives());
    let broadcaster = state.broadcaster.clone();
    let (ws_url, _handle) = spawn_test_server(state).await;

    let mut client = connect_client(&ws_url).await;
    receive_event(&mut client).await; // Consume connected event

    broadcaster.send(HarnessEvent::simulation_stopped(true));

    let event = receive_event(&mut client).await;

    if let HarnessEvent::SimulationStopped(payload) = event {
        assert!(payload.abnormal);
    } else {
        panic!("Expected SimulationStopped event, got: {event:?}");
    }
}

/// Tests that error events are broadcast.
#[tokio::test]
async fn test_error_event_broadcast() {
    let state = AppState::new(HarnessConfig::default(), sample_objectives());
    let broadcaster = state.broadcaster.clone();
    let (ws_url, _handle) = spawn_test_server(state).await;

    let mut client = connect_client(&ws_url).await;
    receive_event(&mut client).await; // Consume connected event

    broadcaster.send(HarnessEvent::error("ERROR:SIMULATION:FAULT"));

    let event = receive_event(&mut client).await;

    if let HarnessEvent::Error(payload) = event {
        assert_eq!(payload.message, "ERROR:SIMULATION:FAULT");
    } else {
        panic!("Expected Error event, got: {event:?}");
    }
}

// ============================================================================
// API Integration Tests
// ============================================================================

/// Tests that posting a status message triggers WebSocket events.
#[tokio::test]
async fn test_api_triggers_websocket_events() {
    let state = AppState::new(HarnessConfig::default(), sample_objectives());
    let (ws_url, _handle) = spawn_test_server(state).await;

    let mut client = connect_client(&ws_url).await;
    receive_event(&mut client).await; // Consume connected event

    // Post a completion over HTTP
    let http_url = ws_url.replace("ws://", "http://").replace("/ws", "");
    let client_http = reqwest::Client::new();

    let response = client_http
        .post(format!("{http_url}/api/message"))
        .header("content-type", "text/plain")
        .body("sim:OBJECTIVE_COMPLETION:COMPLETE:obj1")
        .send()
        .await
        .expect("Failed to send HTTP request");

    assert!(response.status().is_success());

    // Every message produces a message_received event first
    let event = receive_event(&mut client).await;
    if let HarnessEvent::MessageReceived(payload) = event {
        assert_eq!(payload.message.sender, "sim");
        assert_eq!(payload.message.objective_id, "obj1");
    } else {
        panic!("Expected MessageReceived event, got: {event:?}");
    }

    // Followed by the dispatch outcome
    let event = receive_event(&mut client).await;
    assert!(
        matches!(event, HarnessEvent::ObjectiveCompleted(_)),
        "Expected ObjectiveCompleted event, got: {event:?}"
    );
}

/// Tests that an ignored message produces only a message_received event.
#[tokio::test]
async fn test_ignored_message_produces_single_event() {
    let state = AppState::new(HarnessConfig::default(), sample_objectives());
    let (ws_url, _handle) = spawn_test_server(state).await;

    let mut client = connect_client(&ws_url).await;
    receive_event(&mut client).await; // Consume connected event

    let http_url = ws_url.replace("ws://", "http://").replace("/ws", "");
    let client_http = reqwest::Client::new();

    // An unrecognized message, then a lifecycle message
    for body in ["sim:WEATHER:SUNNY", "sim:SIMULATION:RUNNING"] {
        client_http
            .post(format!("{http_url}/api/message"))
            .header("content-type", "text/plain")
            .body(body)
            .send()
            .await
            .expect("Failed to send HTTP request");
    }

    // First message: message_received only, no follow-up
    let event = receive_event(&mut client).await;
    assert!(matches!(event, HarnessEvent::MessageReceived(_)));

    // Second message: message_received then simulation_started
    let event = receive_event(&mut client).await;
    assert!(matches!(event, HarnessEvent::MessageReceived(_)));

    let event = receive_event(&mut client).await;
    assert!(
        matches!(event, HarnessEvent::SimulationStarted),
        "Expected SimulationStarted event, got: {event:?}"
    );
}

// ============================================================================
// Disconnection Tests
// ============================================================================

/// Tests that client can cleanly disconnect.
#[tokio::test]
async fn test_client_can_disconnect() {
    let state = AppState::new(HarnessConfig::default(), sample_objectives());
    let (ws_url, _handle) = spawn_test_server(state).await;

    let mut client = connect_client(&ws_url).await;
    receive_event(&mut client).await; // Consume connected event

    // Send close frame
    client
        .close(None)
        .await
        .expect("Failed to close connection");
}

/// Tests that server continues after client disconnects.
#[tokio::test]
async fn test_server_continues_after_client_disconnect() {
    let state = AppState::new(HarnessConfig::default(), sample_objectives());
    let broadcaster = state.broadcaster.clone();
    let (ws_url, _handle) = spawn_test_server(state).await;

    // Connect and disconnect first client
    let mut client1 = connect_client(&ws_url).await;
    receive_event(&mut client1).await;
    client1.close(None).await.ok();
    drop(client1);

    // Give server time to process disconnect
    tokio::time::sleep(Duration::from_millis(50)).await;

    // Connect second client - should work fine
    let mut client2 = connect_client(&ws_url).await;
    let event = receive_event(&mut client2).await;
    assert!(matches!(event, HarnessEvent::Connected(_)));

    // Broadcasting should still work
    broadcaster.send(HarnessEvent::objective_completed("obj2"));
    let event = receive_event(&mut client2).await;
    assert!(matches!(event, HarnessEvent::ObjectiveCompleted(_)));
}
