//! WebSocket event types and broadcasting for real-time progress observation.
//!
//! This module provides WebSocket-based event streaming for observing the
//! harness as status messages arrive. Events are broadcast to all connected
//! clients as the dispatcher updates session and data store state.
//!
//! # Event Types
//!
//! - `connected` - Sent when a client connects, includes current session
//! - `message_received` - A status message arrived and was logged
//! - `simulation_started` - A new simulation run began
//! - `simulation_stopped` - The simulation stopped (normal or abnormal)
//! - `objective_completed` - An objective was reported complete
//! - `objective_scored` - An objective received a scaled score
//! - `error` - The simulation reported an error
//!
//! # Example
//!
//! ```no_run
//! use simbridge_harness::websocket::{EventBroadcaster, HarnessEvent};
//!
//! # async fn example() {
//! let broadcaster = EventBroadcaster::new(100);
//! let mut receiver = broadcaster.subscribe();
//!
//! broadcaster.send(HarnessEvent::objective_completed("obj1"));
//!
//! if let Ok(event) = receiver.recv().await {
//!     println!("Received: {:?}", event);
//! }
//! # }
//! ```

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::message::{DispatchAction, DispatchSummary, StatusMessage};
use crate::session::HarnessSession;

// ============================================================================
// Event Payloads
// ============================================================================

/// Payload for the `connected` event.
///
/// Sent immediately when a WebSocket client connects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectedPayload {
    /// The current harness session.
    pub session: HarnessSession,
}

/// Payload for the `message_received` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageReceivedPayload {
    /// The parsed message fields.
    pub message: StatusMessage,
}

/// Payload for the `simulation_stopped` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationStoppedPayload {
    /// `true` for an abnormal stop.
    pub abnormal: bool,
}

/// Payload for the `objective_completed` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectiveCompletedPayload {
    /// The completed objective id.
    pub id: String,
}

/// Payload for the `objective_scored` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectiveScoredPayload {
    /// The scored objective id.
    pub id: String,
    /// The recorded scaled score.
    pub score: f64,
}

/// Payload for the `error` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// The raw message that reported the error.
    pub message: String,
}

// ============================================================================
// Event Enum
// ============================================================================

/// WebSocket event types for harness observation.
///
/// All events are serialized as JSON objects with "event" and "payload" fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "snake_case")]
pub enum HarnessEvent {
    /// Sent when a client connects.
    Connected(ConnectedPayload),
    /// Sent for every received status message.
    MessageReceived(MessageReceivedPayload),
    /// Sent when a new simulation run starts.
    SimulationStarted,
    /// Sent when the simulation stops.
    SimulationStopped(SimulationStoppedPayload),
    /// Sent when an objective is reported complete.
    ObjectiveCompleted(ObjectiveCompletedPayload),
    /// Sent when an objective receives a score.
    ObjectiveScored(ObjectiveScoredPayload),
    /// Sent when the simulation reports an error.
    Error(ErrorPayload),
}

impl HarnessEvent {
    /// Creates a `Connected` event with the current session.
    #[must_use]
    pub const fn connected(session: HarnessSession) -> Self {
        Self::Connected(ConnectedPayload { session })
    }

    /// Creates a `MessageReceived` event.
    #[must_use]
    pub const fn message_received(message: StatusMessage) -> Self {
        Self::MessageReceived(MessageReceivedPayload { message })
    }

    /// Creates a `SimulationStopped` event.
    #[must_use]
    pub const fn simulation_stopped(abnormal: bool) -> Self {
        Self::SimulationStopped(SimulationStoppedPayload { abnormal })
    }

    /// Creates an `ObjectiveCompleted` event.
    #[must_use]
    pub fn objective_completed(id: impl Into<String>) -> Self {
        Self::ObjectiveCompleted(ObjectiveCompletedPayload { id: id.into() })
    }

    /// Creates an `ObjectiveScored` event.
    #[must_use]
    pub fn objective_scored(id: impl Into<String>, score: f64) -> Self {
        Self::ObjectiveScored(ObjectiveScoredPayload {
            id: id.into(),
            score,
        })
    }

    /// Creates an `Error` event carrying the raw error message.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(ErrorPayload {
            message: message.into(),
        })
    }

    /// Returns the event name as a string.
    #[must_use]
    pub const fn event_name(&self) -> &'static str {
        match self {
            Self::Connected(_) => "connected",
            Self::MessageReceived(_) => "message_received",
            Self::SimulationStarted => "simulation_started",
            Self::SimulationStopped(_) => "simulation_stopped",
            Self::ObjectiveCompleted(_) => "objective_completed",
            Self::ObjectiveScored(_) => "objective_scored",
            Self::Error(_) => "error",
        }
    }

    /// Builds the follow-up event for a dispatch outcome, if the outcome
    /// warrants one beyond `message_received`.
    #[must_use]
    pub fn from_dispatch(summary: &DispatchSummary, raw: &str) -> Option<Self> {
        match &summary.action {
            DispatchAction::ErrorReported => Some(Self::error(raw)),
            DispatchAction::SimulationStarted => Some(Self::SimulationStarted),
            DispatchAction::SimulationStopped { abnormal } => {
                Some(Self::simulation_stopped(*abnormal))
            }
            DispatchAction::ObjectiveCompleted { id } => Some(Self::objective_completed(id)),
            DispatchAction::ObjectiveScored { id, score } => {
                Some(Self::objective_scored(id, *score))
            }
            DispatchAction::Ignored => None,
        }
    }
}

// ============================================================================
// Event Broadcaster
// ============================================================================

/// Broadcasts harness events to all connected WebSocket clients.
///
/// Uses a tokio broadcast channel for pub-sub event distribution.
/// Events are not persisted for disconnected clients.
#[derive(Debug, Clone)]
pub struct EventBroadcaster {
    sender: broadcast::Sender<HarnessEvent>,
}

impl EventBroadcaster {
    /// Creates a new `EventBroadcaster` with the specified buffer capacity.
    ///
    /// The buffer determines how many events can be queued per subscriber
    /// before old events are dropped.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Creates a new subscriber for receiving events.
    ///
    /// Each subscriber maintains its own buffer. If a subscriber falls behind,
    /// it will receive a `Lagged` error and miss some events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<HarnessEvent> {
        self.sender.subscribe()
    }

    /// Broadcasts an event to all connected subscribers.
    ///
    /// Returns the number of active receivers that will receive the event.
    /// A return value of 0 means no clients are currently connected.
    pub fn send(&self, event: HarnessEvent) -> usize {
        // send() returns Err only if there are no receivers, which is fine
        self.sender.send(event).unwrap_or(0)
    }

    /// Returns the number of active subscribers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new(100)
    }
}

// ============================================================================
// WebSocket Handler
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::api::AppState;

/// WebSocket upgrade handler.
///
/// Called when a client connects to `/ws`. Upgrades the HTTP connection
/// to a WebSocket and spawns a handler task.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    info!("New WebSocket connection request");
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Maximum number of missed pong responses before disconnecting.
const MAX_MISSED_PONGS: u8 = 3;

/// Heartbeat ping interval.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Handles a single WebSocket connection.
///
/// - Sends `connected` event with the current session immediately
/// - Subscribes to the event broadcaster
/// - Forwards all events to the client
/// - Sends heartbeat pings every 30 seconds
/// - Closes connection after 3 missed pongs
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    let current_session = {
        let session = state.session.lock().await;
        session.clone()
    };

    let connected_event = HarnessEvent::connected(current_session);
    let connected_json = match serde_json::to_string(&connected_event) {
        Ok(json) => json,
        Err(e) => {
            warn!("Failed to serialize connected event: {}", e);
            return;
        }
    };

    if sender.send(Message::Text(connected_json)).await.is_err() {
        debug!("Client disconnected before receiving connected event");
        return;
    }

    info!("WebSocket client connected, sent initial session");

    let mut event_receiver = state.broadcaster.subscribe();

    let mut heartbeat_interval = interval(HEARTBEAT_INTERVAL);
    let mut missed_pongs = 0u8;

    loop {
        tokio::select! {
            // Handle incoming messages (primarily pong responses)
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Pong(_))) => {
                        missed_pongs = 0;
                        debug!("Received pong from client");
                    }
                    Some(Ok(Message::Close(_))) => {
                        info!("Client requested close");
                        break;
                    }
                    Some(Ok(Message::Text(_))) => {
                        // Clients don't send text messages; ignore
                        debug!("Ignoring text message from client");
                    }
                    Some(Ok(Message::Binary(_))) => {
                        // Clients don't send binary messages; ignore
                        debug!("Ignoring binary message from client");
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            debug!("Failed to send pong, client disconnected");
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        debug!("WebSocket error: {}", e);
                        break;
                    }
                    None => {
                        debug!("WebSocket stream ended");
                        break;
                    }
                }
            }

            // Forward broadcast events to client
            event = event_receiver.recv() => {
                match event {
                    Ok(harness_event) => {
                        let json = match serde_json::to_string(&harness_event) {
                            Ok(j) => j,
                            Err(e) => {
                                warn!("Failed to serialize event: {}", e);
                                continue;
                            }
                        };

                        if sender.send(Message::Text(json)).await.is_err() {
                            debug!("Failed to send event, client disconnected");
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        // Client fell behind; warn but continue
                        warn!("Client lagged, missed {} events", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        info!("Broadcaster closed");
                        break;
                    }
                }
            }

            // Send heartbeat ping
            _ = heartbeat_interval.tick() => {
                if sender.send(Message::Ping(vec![])).await.is_err() {
                    debug!("Failed to send ping, client disconnected");
                    break;
                }
                missed_pongs += 1;
                if missed_pongs >= MAX_MISSED_PONGS {
                    info!("Client missed {} pongs, closing connection", MAX_MISSED_PONGS);
                    break;
                }
            }
        }
    }

    info!("WebSocket client disconnected");
}

// ============================================================================
// Tests
// ============================================================================
