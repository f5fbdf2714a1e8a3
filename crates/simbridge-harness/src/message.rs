//! Status message parsing and dispatch.
//!
//! The simulation reports progress over a colon-delimited wire format:
//!
//! ```text
//! sender:type:value:objective_id
//! ```
//!
//! Messages split on `:` into at most four fields; missing trailing fields
//! read as empty strings and any extra fields are discarded. Every received
//! message is appended verbatim to the session log, and a dispatch table
//! routes recognized sender/type/value combinations into session and data
//! store updates. Unrecognized or unresolvable messages are logged and
//! otherwise ignored, never failing the dispatch.

use tracing::{info, warn};

use simbridge_cmi::{bridge, CmiDataModel, SuccessStatus};

use crate::session::{HarnessSession, SimulationStatus};

// ============================================================================
// Wire Vocabulary
// ============================================================================

/// Sender field value marking an error report.
pub const SENDER_ERROR: &str = "ERROR";

/// Type field value for simulation lifecycle messages.
pub const TYPE_SIMULATION: &str = "SIMULATION";

/// Type field value for objective completion messages.
pub const TYPE_OBJECTIVE_COMPLETION: &str = "OBJECTIVE_COMPLETION";

/// Type field value for objective score messages.
pub const TYPE_OBJECTIVE_SCORE: &str = "OBJECTIVE_SCORE";

/// Value field marking the simulation as running.
pub const VALUE_RUNNING: &str = "RUNNING";

/// Value field marking a normal simulation stop.
pub const VALUE_STOPPED_NORMAL: &str = "STOPPED_NORMAL";

/// Value field marking an abnormal simulation stop.
pub const VALUE_STOPPED_ABNORMAL: &str = "STOPPED_ABNORMAL";

/// Value field marking an objective as complete.
pub const VALUE_COMPLETE: &str = "COMPLETE";

// ============================================================================
// StatusMessage
// ============================================================================

/// A status message decomposed into its four wire fields.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusMessage {
    /// Who sent the message.
    pub sender: String,

    /// What kind of message this is.
    pub kind: String,

    /// The message value.
    pub value: String,

    /// The objective the message refers to, empty for lifecycle messages.
    pub objective_id: String,
}

impl StatusMessage {
    /// Parses a raw message into its four fields.
    ///
    /// Splits on `:`; missing trailing fields become empty strings and
    /// fields past the fourth are discarded. Parsing never fails.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let mut fields = raw.split(':');
        let mut next = || fields.next().unwrap_or_default().to_string();

        Self {
            sender: next(),
            kind: next(),
            value: next(),
            objective_id: next(),
        }
    }
}

// ============================================================================
// Dispatch
// ============================================================================

/// What a dispatched message caused.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchAction {
    /// An error-sender message set the session into the error state.
    ErrorReported,
    /// A new simulation run started; completions and log were reset.
    SimulationStarted,
    /// The simulation stopped.
    SimulationStopped {
        /// `true` for an abnormal stop.
        abnormal: bool,
    },
    /// An objective was marked complete and recorded as passed.
    ObjectiveCompleted {
        /// The completed objective id.
        id: String,
    },
    /// An objective received a scaled score.
    ObjectiveScored {
        /// The scored objective id.
        id: String,
        /// The recorded scaled score.
        score: f64,
    },
    /// The message was logged but caused no state change.
    Ignored,
}

impl DispatchAction {
    /// Returns the action as a short wire-friendly name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::ErrorReported => "error_reported",
            Self::SimulationStarted => "simulation_started",
            Self::SimulationStopped { .. } => "simulation_stopped",
            Self::ObjectiveCompleted { .. } => "objective_completed",
            Self::ObjectiveScored { .. } => "objective_scored",
            Self::Ignored => "ignored",
        }
    }
}

/// Summary of one dispatched message.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchSummary {
    /// The parsed message fields.
    pub message: StatusMessage,

    /// What the dispatch did.
    pub action: DispatchAction,
}

/// Parses a raw status message and applies it to the session and data store.
///
/// Every message is appended to the session log verbatim, including ones
/// that match no dispatch rule. An `ERROR` sender takes precedence over the
/// type field and suppresses all other handling. A `RUNNING` lifecycle
/// message clears the previous run's completions and log before its own
/// entry is appended, so the log for a run always starts with the message
/// that started it.
///
/// Update failures against the data store (unknown objective id, score out
/// of range, unparseable score text) are logged and skipped; dispatch itself
/// never fails.
pub fn dispatch(
    raw: &str,
    session: &mut HarnessSession,
    store: &mut impl CmiDataModel,
) -> DispatchSummary {
    let message = StatusMessage::parse(raw);

    let action = if message.sender == SENDER_ERROR {
        warn!(message = %raw, "error reported by simulation");
        session.set_status(SimulationStatus::Error);
        DispatchAction::ErrorReported
    } else {
        match (message.kind.as_str(), message.value.as_str()) {
            (TYPE_SIMULATION, VALUE_RUNNING) => {
                info!("simulation started; resetting run state");
                session.reset_run();
                DispatchAction::SimulationStarted
            }
            (TYPE_SIMULATION, VALUE_STOPPED_NORMAL) => {
                info!("simulation stopped normally");
                session.set_status(SimulationStatus::StoppedNormal);
                DispatchAction::SimulationStopped { abnormal: false }
            }
            (TYPE_SIMULATION, VALUE_STOPPED_ABNORMAL) => {
                warn!("simulation stopped abnormally");
                session.set_status(SimulationStatus::StoppedAbnormal);
                DispatchAction::SimulationStopped { abnormal: true }
            }
            (TYPE_OBJECTIVE_COMPLETION, VALUE_COMPLETE) => {
                complete_objective(&message.objective_id, session, store)
            }
            (TYPE_OBJECTIVE_SCORE, _) => score_objective(&message, store),
            _ => {
                warn!(message = %raw, "unrecognized message; logged and ignored");
                DispatchAction::Ignored
            }
        }
    };

    session.append_log(raw);

    DispatchSummary { message, action }
}

/// Marks an objective complete in the session and records `passed` in the
/// data store. Both updates are skipped if the id cannot be resolved, so the
/// checklist and the store never disagree.
fn complete_objective(
    id: &str,
    session: &mut HarnessSession,
    store: &mut impl CmiDataModel,
) -> DispatchAction {
    match bridge::set_success_status(store, id, SuccessStatus::Passed) {
        Ok(()) => {
            session.mark_completed(id);
            info!(objective_id = %id, "objective completed");
            DispatchAction::ObjectiveCompleted { id: id.to_string() }
        }
        Err(e) => {
            warn!(objective_id = %id, error = %e, "completion skipped");
            DispatchAction::Ignored
        }
    }
}

/// Records a scaled score for an objective. Unparseable score text and
/// out-of-range or unresolvable updates are skipped.
fn score_objective(message: &StatusMessage, store: &mut impl CmiDataModel) -> DispatchAction {
    let Ok(score) = message.value.parse::<f64>() else {
        warn!(
            objective_id = %message.objective_id,
            value = %message.value,
            "score skipped: value is not numeric"
        );
        return DispatchAction::Ignored;
    };

    match bridge::set_scaled_score(store, &message.objective_id, score) {
        Ok(()) => {
            info!(objective_id = %message.objective_id, score, "objective scored");
            DispatchAction::ObjectiveScored {
                id: message.objective_id.clone(),
                score,
            }
        }
        Err(e) => {
            warn!(objective_id = %message.objective_id, error = %e, "score skipped");
            DispatchAction::Ignored
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
