//! Objective-addressed operations over a [`CmiDataModel`].
//!
//! The CMI store addresses objective records by integer index, while the
//! harness (and the wire protocol) address them by id. Every operation here
//! therefore starts with [`find_index`]: a fresh linear scan over
//! `cmi.objectives._count` records comparing each `cmi.objectives.<i>.id`.
//! Nothing is cached between calls, so mutations made by other writers are
//! always observed.

use tracing::{debug, warn};

use crate::{keys, CmiDataModel, CmiError, ObjectiveStatus, Result, SuccessStatus, UNINITIALIZED};

/// Resolves an objective id to its store index, scanning the whole store.
///
/// Returns `None` if no record carries the id. O(n) in the objective count;
/// acceptable at the objective counts SCORM content carries in practice.
#[must_use]
pub fn find_index(store: &impl CmiDataModel, id: &str) -> Option<usize> {
    let count = objective_count(store);
    (0..count).find(|&index| store.get(&keys::objective_id(index)) == id)
}

/// Reads `cmi.objectives._count`, treating an unparseable value as zero.
#[must_use]
pub fn objective_count(store: &impl CmiDataModel) -> usize {
    store.get(keys::OBJECTIVE_COUNT).parse().unwrap_or(0)
}

/// Records a success status for the objective with the given id.
///
/// # Errors
///
/// Returns `CmiError::UnknownObjective` if the id cannot be resolved; no
/// record is mutated in that case.
pub fn set_success_status(
    store: &mut impl CmiDataModel,
    id: &str,
    status: SuccessStatus,
) -> Result<()> {
    let Some(index) = find_index(store, id) else {
        warn!(objective_id = %id, "success status update skipped: unknown objective");
        return Err(CmiError::UnknownObjective { id: id.to_string() });
    };

    store.set(&keys::success_status(index), status.as_str());
    debug!(objective_id = %id, index, status = %status, "success status recorded");
    Ok(())
}

/// Records a scaled score for the objective with the given id.
///
/// # Errors
///
/// Returns `CmiError::ScoreOutOfRange` if `score` falls outside [-1, 1],
/// or `CmiError::UnknownObjective` if the id cannot be resolved. No record
/// is mutated on either failure.
pub fn set_scaled_score(store: &mut impl CmiDataModel, id: &str, score: f64) -> Result<()> {
    if !(-1.0..=1.0).contains(&score) {
        warn!(objective_id = %id, score, "score update skipped: outside [-1, 1]");
        return Err(CmiError::ScoreOutOfRange { value: score });
    }

    let Some(index) = find_index(store, id) else {
        warn!(objective_id = %id, "score update skipped: unknown objective");
        return Err(CmiError::UnknownObjective { id: id.to_string() });
    };

    store.set(&keys::scaled_score(index), &score.to_string());
    debug!(objective_id = %id, index, score, "scaled score recorded");
    Ok(())
}

/// Reads back the tracked status of the objective with the given id.
///
/// Returns `None` if the id cannot be resolved. Uninitialized status keys
/// read as the vocabulary defaults (`unknown`, no score); a score value the
/// store holds but cannot be parsed as a number is treated as unset.
#[must_use]
pub fn status_of(store: &impl CmiDataModel, id: &str) -> Option<ObjectiveStatus> {
    let index = find_index(store, id)?;

    let success_status = SuccessStatus::from_store_value(&store.get(&keys::success_status(index)));

    let raw_score = store.get(&keys::scaled_score(index));
    let scaled_score = if raw_score == UNINITIALIZED {
        None
    } else {
        raw_score.parse().ok()
    };

    Some(ObjectiveStatus {
        success_status,
        scaled_score,
    })
}

// ============================================================================
// Tests
// ============================================================================
