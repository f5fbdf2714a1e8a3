//! Checkbox-list rendering of the objective tree.
//!
//! Each objective becomes a table row holding a single checkbox whose
//! element id equals the objective id. Top-level objectives render full
//! width; each nesting level adds one empty indent cell and shrinks the
//! content span, up to [`MAX_NESTING_DEPTH`](crate::MAX_NESTING_DEPTH).

use std::fmt::Write;

use crate::{escape_html, indent_for, span_for, Objective, StatusSnapshot};

/// Renders the objective tree as a checkbox list.
///
/// Borrows its inputs; [`render`](Self::render) can be called repeatedly
/// and always produces identical output for identical inputs.
pub struct ChecklistRenderer<'a> {
    objectives: &'a [Objective],
    snapshot: &'a StatusSnapshot,
}

impl<'a> ChecklistRenderer<'a> {
    /// Creates a renderer over the given root objectives and snapshot.
    #[must_use]
    pub const fn new(objectives: &'a [Objective], snapshot: &'a StatusSnapshot) -> Self {
        Self {
            objectives,
            snapshot,
        }
    }

    /// Renders the complete checklist table.
    ///
    /// Recurses depth-first, pre-order, over children in document order.
    #[must_use]
    pub fn render(&self) -> String {
        let mut output = String::new();

        let _ = writeln!(output, r#"<table class="objective-checklist">"#);
        for objective in self.objectives {
            self.write_node(&mut output, objective, 0);
        }
        let _ = writeln!(output, "</table>");

        output
    }

    /// Writes one objective row, then its children one level deeper.
    fn write_node(&self, output: &mut String, objective: &Objective, depth: usize) {
        let id = escape_html(&objective.id);
        let name = escape_html(&objective.name);
        let checked = if self.snapshot.is_completed(&objective.id) {
            " checked"
        } else {
            ""
        };

        let _ = write!(output, "<tr>");
        for _ in 0..indent_for(depth) {
            let _ = write!(output, "<td></td>");
        }
        let _ = writeln!(
            output,
            r#"<td colspan="{span}"><input type="checkbox" id="{id}"{checked}><label for="{id}">{name}</label></td></tr>"#,
            span = span_for(depth),
        );

        for child in &objective.children {
            self.write_node(output, child, depth + 1);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
