//! Scenario resolution and per-geometry entry lookup.
//!
//! Used directly by in-process stores; SQL-backed stores express the same
//! rule in their `WHERE` clause.

use study_explorer_metrics_models::{MetricFieldPath, ScenarioDocuments, ScenarioRef};
use study_explorer_search_models::Candidate;

/// Resolves a geometry's documents against `scenario` and reads `path`.
///
/// Returns `None` when the geometry has no document for exactly
/// `scenario`; there is no fallback from a named scenario to the baseline.
/// A resolved document without an entry at `path` still yields a
/// candidate, with `entry: None`.
#[must_use]
pub fn resolve_candidate(
    id: &str,
    documents: &ScenarioDocuments,
    scenario: &ScenarioRef,
    path: &MetricFieldPath,
) -> Option<Candidate> {
    let document = documents.get(scenario)?;

    Some(Candidate {
        id: id.to_string(),
        entry: document.get(path).cloned(),
    })
}
