//! SCORM CMI data model bridge for simbridge.
//!
//! This crate provides a thin typed facade over the LMS runtime data store:
//! the flat, string-keyed CMI data model (`cmi.objectives.*`). The store
//! itself is external and pre-initialized; during development it is simulated
//! by [`InMemoryCmi`].
//!
//! # Types
//!
//! - [`CmiDataModel`] - get/set access to the flat key-value store
//! - [`InMemoryCmi`] - simulated store seeded from the objective list
//! - [`SuccessStatus`] - per-objective success vocabulary (unknown/passed/failed)
//! - [`ObjectiveStatus`] - success status plus optional scaled score
//! - [`keys`] - the verbatim dotted-path key convention
//!
//! # Operations
//!
//! The [`bridge`] module performs all objective-addressed reads and writes.
//! Objectives are addressed by id at the API surface but by integer index in
//! the store, so every operation first resolves the id with a linear scan
//! over `cmi.objectives._count` entries.

pub mod bridge;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during CMI bridge operations.
///
/// Per the harness contract these are degrade-not-fail conditions: callers
/// log them and skip the update rather than aborting message handling.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CmiError {
    /// The objective id could not be resolved to a store index.
    #[error("objective id '{id}' is not present in the data model")]
    UnknownObjective {
        /// The unresolved objective id.
        id: String,
    },

    /// A scaled score outside the SCORM range was rejected.
    #[error("scaled score {value} is outside the valid range [-1, 1]")]
    ScoreOutOfRange {
        /// The rejected score value.
        value: f64,
    },

    /// The same objective id appeared twice while seeding the store.
    #[error("duplicate objective id '{id}' while seeding the data model")]
    DuplicateObjective {
        /// The duplicated objective id.
        id: String,
    },
}

/// A specialized `Result` type for CMI bridge operations.
pub type Result<T> = std::result::Result<T, CmiError>;

// ============================================================================
// Key Convention
// ============================================================================

/// The verbatim SCORM CMI dotted-path key convention.
///
/// These key shapes are an external, pre-existing contract
/// (`cmi.objectives.*`) and must be preserved exactly for interoperability
/// with a real LMS runtime.
pub mod keys {
    /// Key holding the total number of objective records.
    pub const OBJECTIVE_COUNT: &str = "cmi.objectives._count";

    /// Key for the id of the objective record at `index`.
    #[must_use]
    pub fn objective_id(index: usize) -> String {
        format!("cmi.objectives.{index}.id")
    }

    /// Key for the success status of the objective record at `index`.
    #[must_use]
    pub fn success_status(index: usize) -> String {
        format!("cmi.objectives.{index}.success_status")
    }

    /// Key for the scaled score of the objective record at `index`.
    #[must_use]
    pub fn scaled_score(index: usize) -> String {
        format!("cmi.objectives.{index}.score.scaled")
    }
}

/// The sentinel returned for keys that have never been written.
pub const UNINITIALIZED: &str = "";

// ============================================================================
// SuccessStatus
// ============================================================================

/// SCORM success-status vocabulary for a single objective.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuccessStatus {
    /// No judgement recorded yet (the vocabulary default).
    #[default]
    Unknown,
    /// The objective was achieved.
    Passed,
    /// The objective was attempted and failed.
    Failed,
}

impl SuccessStatus {
    /// Returns the status as its CMI vocabulary string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Passed => "passed",
            Self::Failed => "failed",
        }
    }

    /// Parses a CMI vocabulary string, treating anything unrecognized
    /// (including the uninitialized sentinel) as `Unknown`.
    #[must_use]
    pub fn from_store_value(value: &str) -> Self {
        match value {
            "passed" => Self::Passed,
            "failed" => Self::Failed,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for SuccessStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// ObjectiveStatus
// ============================================================================

/// The tracked state of a single objective, read back from the store.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectiveStatus {
    /// Recorded success status.
    pub success_status: SuccessStatus,

    /// Scaled score in [-1, 1], or `None` when never set.
    pub scaled_score: Option<f64>,
}

impl Default for ObjectiveStatus {
    fn default() -> Self {
        Self {
            success_status: SuccessStatus::Unknown,
            scaled_score: None,
        }
    }
}

// ============================================================================
// CmiDataModel
// ============================================================================

/// Flat string-keyed access to the CMI data model.
///
/// Keys follow the dotted-path convention in [`keys`]. Reads of absent keys
/// return [`UNINITIALIZED`] rather than an error, matching the LMS runtime's
/// sentinel behavior.
pub trait CmiDataModel {
    /// Reads the value for `key`, or [`UNINITIALIZED`] if it was never set.
    fn get(&self, key: &str) -> String;

    /// Writes `value` under `key`, overwriting any previous value.
    fn set(&mut self, key: &str, value: &str);
}

// ============================================================================
// InMemoryCmi
// ============================================================================

/// Simulated CMI store backed by a `HashMap`.
///
/// A real deployment would speak to the LMS runtime API instead; the
/// harness seeds this store from the loaded objective tree so that index
/// resolution and status updates behave exactly as they would against a
/// pre-initialized `cmi.objectives` collection.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCmi {
    values: HashMap<String, String>,
}

impl InMemoryCmi {
    /// Creates an empty store with `cmi.objectives._count` set to zero.
    #[must_use]
    pub fn new() -> Self {
        let mut store = Self {
            values: HashMap::new(),
        };
        store.set(keys::OBJECTIVE_COUNT, "0");
        store
    }

    /// Creates a store pre-initialized with one record per objective id.
    ///
    /// Each record gets its `id` key set and its status keys left
    /// uninitialized, mirroring an LMS that has registered the objectives
    /// from the course manifest but recorded no learner progress.
    ///
    /// # Errors
    ///
    /// Returns `CmiError::DuplicateObjective` if the same id appears twice.
    pub fn seeded<I, S>(ids: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut store = Self::new();
        let mut count = 0_usize;

        for id in ids {
            let id = id.as_ref();
            if bridge::find_index(&store, id).is_some() {
                return Err(CmiError::DuplicateObjective { id: id.to_string() });
            }
            store.set(&keys::objective_id(count), id);
            count += 1;
            store.set(keys::OBJECTIVE_COUNT, &count.to_string());
        }

        Ok(store)
    }

    /// Returns the number of keys that have been written.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if no keys have been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl CmiDataModel for InMemoryCmi {
    fn get(&self, key: &str) -> String {
        self.values
            .get(key)
            .cloned()
            .unwrap_or_else(|| UNINITIALIZED.to_string())
    }

    fn set(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
    }
}

// ============================================================================
// Tests
// ============================================================================
