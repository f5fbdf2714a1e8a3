//! Results-table rendering of the objective tree.
//!
//! Same tree walk and indentation scheme as the checklist, but each row
//! carries the objective's success status and scaled score instead of a
//! checkbox. Objectives with no recorded result fall back to the vocabulary
//! default status and a `not set` score placeholder.

use std::fmt::Write;

use crate::{escape_html, indent_for, span_for, Objective, ObjectiveResult, StatusSnapshot};

/// Placeholder rendered when no scaled score has been recorded.
const SCORE_UNSET: &str = "not set";

/// Renders the objective tree as a per-objective results table.
///
/// Like [`ChecklistRenderer`](crate::ChecklistRenderer), rendering is a pure
/// function of the inputs and safe to repeat.
pub struct ResultsRenderer<'a> {
    objectives: &'a [Objective],
    snapshot: &'a StatusSnapshot,
}

impl<'a> ResultsRenderer<'a> {
    /// Creates a renderer over the given root objectives and snapshot.
    #[must_use]
    pub const fn new(objectives: &'a [Objective], snapshot: &'a StatusSnapshot) -> Self {
        Self {
            objectives,
            snapshot,
        }
    }

    /// Renders the complete results table, header row included.
    #[must_use]
    pub fn render(&self) -> String {
        let mut output = String::new();

        let _ = writeln!(output, r#"<table class="objective-results">"#);
        let _ = writeln!(
            output,
            r#"<tr><th colspan="{span}">Objective</th><th>Status</th><th>Score</th></tr>"#,
            span = span_for(0),
        );
        for objective in self.objectives {
            self.write_node(&mut output, objective, 0);
        }
        let _ = writeln!(output, "</table>");

        output
    }

    /// Writes one objective row, then its children one level deeper.
    fn write_node(&self, output: &mut String, objective: &Objective, depth: usize) {
        let default = ObjectiveResult::default();
        let result = self.snapshot.result_of(&objective.id).unwrap_or(&default);

        let score = result
            .scaled_score
            .map_or_else(|| SCORE_UNSET.to_string(), |score| format!("{score}"));

        let _ = write!(output, "<tr>");
        for _ in 0..indent_for(depth) {
            let _ = write!(output, "<td></td>");
        }
        let _ = writeln!(
            output,
            r#"<td colspan="{span}">{name}</td><td>{status}</td><td>{score}</td></tr>"#,
            span = span_for(depth),
            name = escape_html(&objective.name),
            status = escape_html(&result.success_status),
        );

        for child in &objective.children {
            self.write_node(output, child, depth + 1);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
