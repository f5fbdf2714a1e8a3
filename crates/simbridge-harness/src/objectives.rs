//! Objective tree loading and parsing.
//!
//! The objective tree is described by an XML document in which each
//! `<objective>` element carries an `id` and a `name` attribute and may nest
//! further `<objective>` elements to any depth. The document can live on the
//! local filesystem or behind an HTTP(S) URL.
//!
//! Parsing is permissive: missing `id` or `name` attributes become empty
//! strings, and elements other than `objective` are skipped while their
//! objective descendants are still collected.

use std::time::Duration;

use tracing::{debug, info};

use crate::error::{HarnessError, Result};

/// A single node of the loaded objective tree.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ObjectiveNode {
    /// Objective id as found in the document, empty if absent.
    pub id: String,

    /// Display name as found in the document, empty if absent.
    pub name: String,

    /// Nested objectives in document order.
    #[serde(default)]
    pub children: Vec<ObjectiveNode>,
}

impl ObjectiveNode {
    /// Appends every id in this subtree to `ids`, pre-order.
    fn collect_ids(&self, ids: &mut Vec<String>) {
        ids.push(self.id.clone());
        for child in &self.children {
            child.collect_ids(ids);
        }
    }
}

/// Flattens an objective forest into its ids, pre-order, document order.
///
/// Used to seed the data store with one record per objective.
#[must_use]
pub fn flatten_ids(objectives: &[ObjectiveNode]) -> Vec<String> {
    let mut ids = Vec::new();
    for objective in objectives {
        objective.collect_ids(&mut ids);
    }
    ids
}

/// Loads the objective tree from a file path or HTTP(S) URL.
///
/// URLs are fetched with the given timeout; anything else is read from the
/// local filesystem.
///
/// # Errors
///
/// Returns `ObjectivesNotFound` for a missing file, `ObjectivesFetchError`
/// for HTTP failures (including non-success status codes), and
/// `ObjectivesParseError` for malformed XML.
pub async fn load(source: &str, fetch_timeout: Duration) -> Result<Vec<ObjectiveNode>> {
    let document = if source.starts_with("http://") || source.starts_with("https://") {
        fetch_document(source, fetch_timeout).await?
    } else {
        read_document(source)?
    };

    let objectives = parse_document(&document, source)?;
    info!(
        source = %source,
        objective_count = flatten_ids(&objectives).len(),
        "objective tree loaded"
    );
    Ok(objectives)
}

/// Reads the objectives document from the local filesystem.
fn read_document(path: &str) -> Result<String> {
    match std::fs::read_to_string(path) {
        Ok(contents) => Ok(contents),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(HarnessError::objectives_not_found(path))
        }
        Err(e) => Err(e.into()),
    }
}

/// Fetches the objectives document over HTTP.
async fn fetch_document(url: &str, timeout: Duration) -> Result<String> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| HarnessError::objectives_fetch(url, e.to_string()))?;

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| HarnessError::objectives_fetch(url, e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(HarnessError::objectives_fetch(
            url,
            format!("server returned status {status}"),
        ));
    }

    response
        .text()
        .await
        .map_err(|e| HarnessError::objectives_fetch(url, e.to_string()))
}

/// Parses an objectives XML document into a forest of [`ObjectiveNode`]s.
///
/// Root objectives are `objective` elements whose nearest element ancestor is
/// not itself an `objective`; the document's root element name is otherwise
/// irrelevant.
///
/// # Errors
///
/// Returns `ObjectivesParseError` if the document is not well-formed XML.
pub fn parse_document(document: &str, source_name: &str) -> Result<Vec<ObjectiveNode>> {
    let doc = roxmltree::Document::parse(document)
        .map_err(|e| HarnessError::objectives_parse(source_name, e.to_string()))?;

    let mut roots = Vec::new();
    collect_objectives(doc.root_element(), &mut roots);
    debug!(source = %source_name, roots = roots.len(), "objectives document parsed");
    Ok(roots)
}

/// Collects objective subtrees under `node`, descending through non-objective
/// elements until an `objective` is found.
fn collect_objectives(node: roxmltree::Node<'_, '_>, out: &mut Vec<ObjectiveNode>) {
    if node.is_element() && node.tag_name().name() == "objective" {
        out.push(build_node(node));
        return;
    }

    for child in node.children().filter(roxmltree::Node::is_element) {
        collect_objectives(child, out);
    }
}

/// Builds an [`ObjectiveNode`] from an `objective` element and its subtree.
fn build_node(node: roxmltree::Node<'_, '_>) -> ObjectiveNode {
    let mut children = Vec::new();
    for child in node.children().filter(roxmltree::Node::is_element) {
        collect_objectives(child, &mut children);
    }

    ObjectiveNode {
        id: node.attribute("id").unwrap_or_default().to_string(),
        name: node.attribute("name").unwrap_or_default().to_string(),
        children,
    }
}
