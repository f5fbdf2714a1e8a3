//! Simbridge Harness
//!
//! Loads the objective tree, dispatches simulation status messages into the
//! session and CMI data store, and serves the HTTP API and WebSocket events.

pub mod api;
pub mod config;
pub mod error;
pub mod message;
pub mod objectives;
pub mod session;
pub mod websocket;

pub use api::{create_router, AppState, MessageResponse};
pub use config::HarnessConfig;
pub use error::{HarnessError, Result};
pub use message::{dispatch, DispatchAction, DispatchSummary, StatusMessage};
pub use objectives::{flatten_ids, ObjectiveNode};
pub use session::{HarnessSession, LogEntry, SimulationStatus};
pub use websocket::{EventBroadcaster, HarnessEvent};
