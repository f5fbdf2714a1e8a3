//! Objective tree HTML rendering for simbridge.
//!
//! This crate turns a hierarchical objective list into table-based HTML
//! markup. Two renderers are provided:
//!
//! - [`ChecklistRenderer`] - one checkbox per objective, checked when the
//!   status snapshot marks the objective completed
//! - [`ResultsRenderer`] - one row per objective with its success status and
//!   scaled score
//!
//! Both renderers are pure functions of their inputs: rendering the same
//! tree and snapshot twice produces byte-identical output, and nothing is
//! mutated. Nesting depth is threaded through the recursion as an explicit
//! parameter; indentation stops growing at [`MAX_NESTING_DEPTH`] and the
//! content column span never drops below one.
//!
//! The input types here are deliberately independent of the harness crates
//! (local copies rather than cross-crate dependencies), so the renderer can
//! be exercised and snapshot-tested in isolation.
//!
//! # Example
//!
//! ```rust
//! use simbridge_render::{ChecklistRenderer, Objective, StatusSnapshot};
//!
//! let tree = vec![Objective::new("obj1", "Start the engine")];
//! let mut snapshot = StatusSnapshot::new();
//! snapshot.mark_completed("obj1");
//!
//! let html = ChecklistRenderer::new(&tree, &snapshot).render();
//! assert!(html.contains(r#"id="obj1" checked"#));
//! ```

mod checklist;
mod results;

pub use checklist::ChecklistRenderer;
pub use results::ResultsRenderer;

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Maximum nesting depth that still increases indentation.
///
/// Nodes deeper than this render at the same indent as their ancestors at
/// this depth; the original pages let the column span go non-positive past
/// this point, which is treated here as a defect and clamped instead.
pub const MAX_NESTING_DEPTH: usize = 5;

/// Total layout columns: one indent column per nesting level plus content.
pub(crate) const TABLE_COLUMNS: usize = MAX_NESTING_DEPTH + 1;

// ============================================================================
// Input Types
// ============================================================================

/// A single objective with its nested children, in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Objective {
    /// Unique objective id; becomes the checkbox element id.
    pub id: String,

    /// Display label.
    pub name: String,

    /// Child objectives, rendered one level deeper.
    #[serde(default)]
    pub children: Vec<Objective>,
}

impl Objective {
    /// Creates a leaf objective.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            children: Vec::new(),
        }
    }

    /// Creates an objective with the given children.
    #[must_use]
    pub fn with_children(
        id: impl Into<String>,
        name: impl Into<String>,
        children: Vec<Self>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            children,
        }
    }

    /// Total number of nodes in this subtree, including `self`.
    #[must_use]
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(Self::node_count).sum::<usize>()
    }
}

/// Per-objective result values for the results renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectiveResult {
    /// Success status vocabulary string (`unknown`, `passed`, `failed`).
    pub success_status: String,

    /// Scaled score in [-1, 1], or `None` when never recorded.
    pub scaled_score: Option<f64>,
}

impl Default for ObjectiveResult {
    fn default() -> Self {
        Self {
            success_status: "unknown".to_string(),
            scaled_score: None,
        }
    }
}

/// Immutable view of objective progress at one point in time.
///
/// Built by the caller from its session and data store; the renderers only
/// read it. Ordered collections keep rendering deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    completed: BTreeSet<String>,
    results: BTreeMap<String, ObjectiveResult>,
}

impl StatusSnapshot {
    /// Creates an empty snapshot: nothing completed, no results recorded.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks an objective id as completed (checkbox checked).
    pub fn mark_completed(&mut self, id: impl Into<String>) {
        self.completed.insert(id.into());
    }

    /// Returns `true` if the id has been marked completed.
    #[must_use]
    pub fn is_completed(&self, id: &str) -> bool {
        self.completed.contains(id)
    }

    /// Records result values for an objective id.
    pub fn set_result(&mut self, id: impl Into<String>, result: ObjectiveResult) {
        self.results.insert(id.into(), result);
    }

    /// Returns the recorded result for an id, if any.
    #[must_use]
    pub fn result_of(&self, id: &str) -> Option<&ObjectiveResult> {
        self.results.get(id)
    }
}

// ============================================================================
// Shared Layout Helpers
// ============================================================================

/// Indent column count for a node at `depth`, capped at the maximum.
pub(crate) fn indent_for(depth: usize) -> usize {
    depth.min(MAX_NESTING_DEPTH)
}

/// Content column span for a node at `depth`, clamped to at least one.
pub(crate) fn span_for(depth: usize) -> usize {
    TABLE_COLUMNS.saturating_sub(indent_for(depth)).max(1)
}

/// Escapes text for use in HTML content and attribute values.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut result = String::with_capacity(text.len());

    for ch in text.chars() {
        match ch {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#39;"),
            _ => result.push(ch),
        }
    }

    result
}

// ============================================================================
// Tests
// ============================================================================
