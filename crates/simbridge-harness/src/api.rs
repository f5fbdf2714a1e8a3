//! HTTP API endpoints for the harness.
//!
//! This module provides the HTTP surface the simulation and observers use:
//! the simulation posts raw status messages, and observers fetch rendered
//! progress views or subscribe to the WebSocket event stream.
//!
//! # Endpoints
//!
//! - `POST /api/message` - Submit a raw status message (plain text body)
//! - `GET /api/objectives` - Objective checklist rendered as HTML
//! - `GET /api/results` - Per-objective results rendered as HTML
//! - `GET /api/log` - The raw message log for the current run
//! - `GET /api/session` - Current session state as JSON
//! - `GET /ws` - WebSocket event stream
//!
//! # Example
//!
//! ```no_run
//! use simbridge_harness::{create_router, AppState, HarnessConfig};
//!
//! # async fn example() {
//! let state = AppState::new(HarnessConfig::default(), Vec::new());
//!
//! let router = create_router(state);
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
//! axum::serve(listener, router).await.unwrap();
//! # }
//! ```

use std::sync::Arc;

use axum::{
    extract::State,
    response::Html,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

use simbridge_cmi::{bridge, InMemoryCmi};
use simbridge_render::{ChecklistRenderer, Objective, ObjectiveResult, ResultsRenderer, StatusSnapshot};

use crate::config::HarnessConfig;
use crate::message::{self, DispatchSummary};
use crate::objectives::{flatten_ids, ObjectiveNode};
use crate::session::HarnessSession;
use crate::websocket::{ws_handler, EventBroadcaster, HarnessEvent};

// ============================================================================
// Request/Response Types
// ============================================================================

/// Response body for the message endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    /// Always `true`: messages are never rejected, only ignored.
    pub acknowledged: bool,

    /// What the dispatch did, as a short name (e.g. `objective_completed`).
    pub action: String,
}

// ============================================================================
// Application State
// ============================================================================

/// Shared application state for the HTTP server.
///
/// The objective tree is immutable after startup; the session and the data
/// store are wrapped for thread-safe mutation across handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Configuration for the harness.
    pub config: HarnessConfig,
    /// The loaded objective tree, fixed for the process lifetime.
    pub objectives: Arc<Vec<ObjectiveNode>>,
    /// Current harness session.
    pub session: Arc<Mutex<HarnessSession>>,
    /// The CMI data store, seeded from the objective tree.
    pub store: Arc<Mutex<InMemoryCmi>>,
    /// Broadcaster feeding WebSocket clients.
    pub broadcaster: EventBroadcaster,
}

impl AppState {
    /// Creates a new `AppState` over the given objective tree.
    ///
    /// The data store is seeded with one record per objective id, in document
    /// order. Duplicate ids keep their first record; later duplicates are
    /// dropped from the seed so index resolution stays unambiguous.
    #[must_use]
    pub fn new(config: HarnessConfig, objectives: Vec<ObjectiveNode>) -> Self {
        let mut seen = std::collections::BTreeSet::new();
        let ids: Vec<String> = flatten_ids(&objectives)
            .into_iter()
            .filter(|id| seen.insert(id.clone()))
            .collect();

        // Infallible after dedup: seeding only errors on duplicate ids.
        let store = InMemoryCmi::seeded(&ids).unwrap_or_default();

        let broadcaster = EventBroadcaster::new(config.event_buffer_capacity);
        Self {
            config,
            objectives: Arc::new(objectives),
            session: Arc::new(Mutex::new(HarnessSession::new())),
            store: Arc::new(Mutex::new(store)),
            broadcaster,
        }
    }
}

// ============================================================================
// Router Setup
// ============================================================================

/// Creates the HTTP router with all API endpoints.
///
/// # Arguments
///
/// * `state` - The shared application state
///
/// # Returns
///
/// An axum `Router` configured with:
/// - All API routes under `/api` plus the `/ws` upgrade route
/// - CORS middleware for development
/// - Tracing middleware for request logging
pub fn create_router(state: AppState) -> Router {
    // Configure CORS for development (allow all origins)
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/message", post(handle_message))
        .route("/objectives", get(handle_objectives))
        .route("/results", get(handle_results))
        .route("/log", get(handle_log))
        .route("/session", get(handle_session));

    Router::new()
        .nest("/api", api_routes)
        .route("/ws", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(Arc::new(state))
}

// ============================================================================
// Handlers
// ============================================================================

/// Handler for `POST /api/message`.
///
/// Accepts the raw colon-delimited message as the request body, dispatches
/// it, and broadcasts the resulting events. Always acknowledges: messages
/// that match no rule are logged and reported as `ignored`.
async fn handle_message(State(state): State<Arc<AppState>>, body: String) -> Json<MessageResponse> {
    info!(message = %body, "Received status message");

    let summary: DispatchSummary = {
        let mut session = state.session.lock().await;
        let mut store = state.store.lock().await;
        message::dispatch(&body, &mut session, &mut *store)
    };

    state
        .broadcaster
        .send(HarnessEvent::message_received(summary.message.clone()));
    if let Some(event) = HarnessEvent::from_dispatch(&summary, &body) {
        state.broadcaster.send(event);
    }

    Json(MessageResponse {
        acknowledged: true,
        action: summary.action.name().to_string(),
    })
}

/// Handler for `GET /api/objectives`.
///
/// Renders the objective checklist against the current session.
async fn handle_objectives(State(state): State<Arc<AppState>>) -> Html<String> {
    let snapshot = snapshot_state(&state).await;
    let tree = render_tree(&state.objectives);
    Html(ChecklistRenderer::new(&tree, &snapshot).render())
}

/// Handler for `GET /api/results`.
///
/// Renders the per-objective results table against the current data store.
async fn handle_results(State(state): State<Arc<AppState>>) -> Html<String> {
    let snapshot = snapshot_state(&state).await;
    let tree = render_tree(&state.objectives);
    Html(ResultsRenderer::new(&tree, &snapshot).render())
}

/// Handler for `GET /api/log`.
///
/// Returns the raw message log for the current run, one message per line.
async fn handle_log(State(state): State<Arc<AppState>>) -> String {
    let session = state.session.lock().await;
    session.log_text()
}

/// Handler for `GET /api/session`.
///
/// Returns the current session state.
async fn handle_session(State(state): State<Arc<AppState>>) -> Json<HarnessSession> {
    let session = state.session.lock().await;
    Json(session.clone())
}

// ============================================================================
// Rendering Glue
// ============================================================================

/// Converts the loaded objective tree into the renderer's input type.
fn render_tree(objectives: &[ObjectiveNode]) -> Vec<Objective> {
    objectives
        .iter()
        .map(|node| {
            Objective::with_children(
                node.id.clone(),
                node.name.clone(),
                render_tree(&node.children),
            )
        })
        .collect()
}

/// Builds a rendering snapshot from the current session and data store.
async fn snapshot_state(state: &AppState) -> StatusSnapshot {
    let session = state.session.lock().await;
    let store = state.store.lock().await;

    let mut snapshot = StatusSnapshot::new();
    for id in flatten_ids(&state.objectives) {
        if session.is_completed(&id) {
            snapshot.mark_completed(&id);
        }
        if let Some(status) = bridge::status_of(&*store, &id) {
            snapshot.set_result(
                &id,
                ObjectiveResult {
                    success_status: status.success_status.as_str().to_string(),
                    scaled_score: status.scaled_score,
                },
            );
        }
    }
    snapshot
}

// ============================================================================
// Tests
// ============================================================================
