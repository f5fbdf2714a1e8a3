//! Harness session state.
//!
//! Tracks the state of one harness run: the current simulation status, which
//! objectives have been reported complete, and a verbatim log of every status
//! message received. A new simulation run resets completions and the log;
//! the session itself lives for the lifetime of the process.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Lifecycle state of the simulation, as reported by status messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimulationStatus {
    /// No simulation message received yet.
    #[default]
    Idle,
    /// The simulation reported it is running.
    Running,
    /// The simulation stopped normally.
    StoppedNormal,
    /// The simulation stopped abnormally.
    StoppedAbnormal,
    /// An error-sender message was received.
    Error,
}

impl std::fmt::Display for SimulationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::StoppedNormal => "stopped_normal",
            Self::StoppedAbnormal => "stopped_abnormal",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// One received status message with the time it arrived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// Arrival time.
    pub timestamp: DateTime<Utc>,

    /// The raw message text, verbatim.
    pub message: String,
}

/// State of one harness run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HarnessSession {
    /// Current simulation lifecycle status.
    pub status: SimulationStatus,

    /// Ids of objectives reported complete in the current run.
    completed: BTreeSet<String>,

    /// Every message received in the current run, in arrival order.
    log: Vec<LogEntry>,

    /// When the session was created.
    pub started_at: DateTime<Utc>,

    /// When the session last changed.
    pub updated_at: DateTime<Utc>,
}

impl Default for HarnessSession {
    fn default() -> Self {
        Self::new()
    }
}

impl HarnessSession {
    /// Creates a fresh idle session.
    #[must_use]
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            status: SimulationStatus::Idle,
            completed: BTreeSet::new(),
            log: Vec::new(),
            started_at: now,
            updated_at: now,
        }
    }

    /// Starts a new simulation run: status becomes `Running` and the
    /// completion set and message log are cleared.
    pub fn reset_run(&mut self) {
        self.status = SimulationStatus::Running;
        self.completed.clear();
        self.log.clear();
        self.touch();
    }

    /// Sets the simulation status.
    pub fn set_status(&mut self, status: SimulationStatus) {
        self.status = status;
        self.touch();
    }

    /// Marks an objective id as completed in this run.
    pub fn mark_completed(&mut self, id: impl Into<String>) {
        self.completed.insert(id.into());
        self.touch();
    }

    /// Returns `true` if the id was reported complete in this run.
    #[must_use]
    pub fn is_completed(&self, id: &str) -> bool {
        self.completed.contains(id)
    }

    /// Ids reported complete in this run, in sorted order.
    #[must_use]
    pub fn completed_ids(&self) -> Vec<String> {
        self.completed.iter().cloned().collect()
    }

    /// Appends a received message to the log, verbatim, timestamped now.
    pub fn append_log(&mut self, message: impl Into<String>) {
        self.log.push(LogEntry {
            timestamp: Utc::now(),
            message: message.into(),
        });
        self.touch();
    }

    /// The message log for this run, in arrival order.
    #[must_use]
    pub fn log(&self) -> &[LogEntry] {
        &self.log
    }

    /// The raw log messages joined with newlines.
    #[must_use]
    pub fn log_text(&self) -> String {
        self.log
            .iter()
            .map(|entry| entry.message.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Bumps the last-updated timestamp.
    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
