//! Value extraction and grouped aggregation over a candidate set.

use std::collections::BTreeMap;

use study_explorer_search_models::{AggregateSummary, Candidate, FeatureShading};

/// Grouping key: `(units, description)`. `None` is a key of its own and
/// sorts before any label.
type GroupKey = (Option<String>, Option<String>);

/// A candidate reduced to the fields aggregation needs.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedValue {
    /// Geometry key.
    pub id: String,
    /// Numeric value, `None` if missing or non-numeric.
    pub value: Option<f64>,
    /// Entry description.
    pub description: Option<String>,
    /// Entry units.
    pub units: Option<String>,
}

/// Reads value, description and units out of a candidate's entry.
#[must_use]
pub fn extract(candidate: Candidate) -> ExtractedValue {
    let Candidate { id, entry } = candidate;
    match entry {
        Some(entry) => ExtractedValue {
            id,
            value: entry.numeric_value(),
            description: entry.description,
            units: entry.units,
        },
        None => ExtractedValue {
            id,
            value: None,
            description: None,
            units: None,
        },
    }
}

/// Groups candidates by `(units, description)` and summarizes every group.
///
/// Groups are returned best first: total descending, then units and
/// description ascending. Features inside a group are ordered by
/// geometry key.
#[must_use]
pub fn group_summaries(candidates: Vec<Candidate>) -> Vec<AggregateSummary> {
    let mut groups: BTreeMap<GroupKey, Vec<FeatureShading>> = BTreeMap::new();

    for extracted in candidates.into_iter().map(extract) {
        groups
            .entry((extracted.units, extracted.description))
            .or_default()
            .push(FeatureShading {
                id: extracted.id,
                shading: extracted.value,
            });
    }

    // BTreeMap iteration is already key-ascending, so a stable sort on
    // total alone keeps the secondary order.
    let mut summaries: Vec<AggregateSummary> = groups
        .into_iter()
        .map(|((units, description), features)| summarize_group(units, description, features))
        .collect();
    summaries.sort_by(|a, b| b.total.total_cmp(&a.total));

    summaries
}

/// Returns the single best group, or `None` for an empty candidate set.
#[must_use]
pub fn top_summary(candidates: Vec<Candidate>) -> Option<AggregateSummary> {
    group_summaries(candidates).into_iter().next()
}

fn summarize_group(
    units: Option<String>,
    description: Option<String>,
    mut features: Vec<FeatureShading>,
) -> AggregateSummary {
    features.sort_by(|a, b| a.id.cmp(&b.id));

    let coalesced = features.iter().map(|f| f.shading.unwrap_or(0.0));
    let total: f64 = coalesced.clone().sum();
    let max = coalesced.max_by(f64::total_cmp).unwrap_or(0.0);

    #[allow(clippy::cast_precision_loss)]
    let average = if features.is_empty() {
        0.0
    } else {
        total / features.len() as f64
    };

    AggregateSummary {
        total,
        average,
        max,
        units,
        description,
        features,
    }
}
