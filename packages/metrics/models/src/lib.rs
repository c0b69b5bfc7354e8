#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Scenario references, metric field paths, and per-geometry metric
//! documents.
//!
//! Every geometry in a study carries one metric document per scenario it
//! has values for (plus at most one baseline document). A document maps
//! a [`MetricFieldPath`] (`category.usage.source`) to a [`MetricEntry`].
//! These types are shared by the search engine, the stores that feed it,
//! and the HTTP layer.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Request slug that selects the baseline scenario.
pub const BASELINE_SLUG: &str = "baseline";

/// Which scenario a query (or a stored document) refers to.
///
/// Storage represents the baseline as a null scenario column; this type
/// makes that explicit so nothing downstream has to remember the
/// convention.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ScenarioRef {
    /// The no-intervention scenario.
    Baseline,
    /// A named policy alternative, identified by its slug.
    Named(String),
}

impl ScenarioRef {
    /// Maps a nullable storage column to a scenario reference.
    #[must_use]
    pub fn from_column(slug: Option<String>) -> Self {
        slug.map_or(Self::Baseline, Self::Named)
    }

    /// The slug stored in the scenario column (`None` for baseline).
    #[must_use]
    pub fn column_value(&self) -> Option<&str> {
        match self {
            Self::Baseline => None,
            Self::Named(slug) => Some(slug),
        }
    }

    /// The slug as used in request paths.
    #[must_use]
    pub fn as_slug(&self) -> &str {
        match self {
            Self::Baseline => BASELINE_SLUG,
            Self::Named(slug) => slug,
        }
    }

    #[must_use]
    pub const fn is_baseline(&self) -> bool {
        matches!(self, Self::Baseline)
    }
}

impl fmt::Display for ScenarioRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_slug())
    }
}

/// Error returned when a scenario slug cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("scenario slug must not be empty")]
pub struct EmptyScenarioError;

impl FromStr for ScenarioRef {
    type Err = EmptyScenarioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" => Err(EmptyScenarioError),
            BASELINE_SLUG => Ok(Self::Baseline),
            other => Ok(Self::Named(other.to_string())),
        }
    }
}

/// Errors produced while parsing a `category.usage.source` path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetricPathError {
    /// The path did not have exactly three dot-separated segments.
    #[error("metric path '{path}' must have exactly three segments (category.usage.source)")]
    SegmentCount {
        /// The offending input.
        path: String,
    },

    /// The category segment was empty.
    #[error("metric path '{path}' has an empty category")]
    EmptyCategory {
        /// The offending input.
        path: String,
    },
}

/// Typed key into a [`MetricDocument`].
///
/// `usage` and `source` are `None` when the segment is empty, which
/// addresses the unfiltered aggregate entry along that axis.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MetricFieldPath {
    /// Metric category (e.g. `energy`).
    pub category: String,
    /// Usage filter, `None` for all usages.
    pub usage: Option<String>,
    /// Source filter, `None` for all sources.
    pub source: Option<String>,
}

impl MetricFieldPath {
    #[must_use]
    pub fn new(
        category: impl Into<String>,
        usage: Option<impl Into<String>>,
        source: Option<impl Into<String>>,
    ) -> Self {
        Self {
            category: category.into(),
            usage: usage.map(Into::into).filter(|s: &String| !s.is_empty()),
            source: source.map(Into::into).filter(|s: &String| !s.is_empty()),
        }
    }

    /// Path addressing the aggregate entry of a category.
    #[must_use]
    pub fn category(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            usage: None,
            source: None,
        }
    }
}

impl fmt::Display for MetricFieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}",
            self.category,
            self.usage.as_deref().unwrap_or_default(),
            self.source.as_deref().unwrap_or_default()
        )
    }
}

impl FromStr for MetricFieldPath {
    type Err = MetricPathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let segments: Vec<&str> = s.split('.').collect();
        let [category, usage, source] = segments.as_slice() else {
            return Err(MetricPathError::SegmentCount {
                path: s.to_string(),
            });
        };

        if category.is_empty() {
            return Err(MetricPathError::EmptyCategory {
                path: s.to_string(),
            });
        }

        Ok(Self::new(*category, Some(*usage), Some(*source)))
    }
}

impl TryFrom<String> for MetricFieldPath {
    type Error = MetricPathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MetricFieldPath> for String {
    fn from(path: MetricFieldPath) -> Self {
        path.to_string()
    }
}

/// A single metric value addressed by a [`MetricFieldPath`].
///
/// `value` is kept as raw JSON because ingested workbooks are not
/// consistent about numeric typing; see [`MetricEntry::numeric_value`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricEntry {
    /// Raw value as stored.
    #[serde(default)]
    pub value: Option<serde_json::Value>,
    /// Human-readable description of the metric.
    #[serde(default)]
    pub description: Option<String>,
    /// Unit label (e.g. `kWh/yr`).
    #[serde(default)]
    pub units: Option<String>,
}

impl MetricEntry {
    #[must_use]
    pub fn new(value: Option<f64>, description: &str, units: &str) -> Self {
        Self {
            value: value.map(serde_json::Value::from),
            description: Some(description.to_string()),
            units: Some(units.to_string()),
        }
    }

    /// Coerces the stored value to a finite number.
    ///
    /// Numbers and numeric strings convert; null, booleans, containers,
    /// non-numeric strings and non-finite values yield `None`.
    #[must_use]
    pub fn numeric_value(&self) -> Option<f64> {
        let value = match self.value.as_ref()? {
            serde_json::Value::Number(n) => n.as_f64()?,
            serde_json::Value::String(s) => s.trim().parse::<f64>().ok()?,
            _ => return None,
        };
        value.is_finite().then_some(value)
    }
}

/// A geometry's metric values for one scenario.
pub type MetricDocument = BTreeMap<MetricFieldPath, MetricEntry>;

/// Renders a JSON field the way `PostgreSQL`'s `->>` does: strings as-is,
/// null as `None`, anything else as its JSON text.
fn json_text(value: Option<&serde_json::Value>) -> Option<String> {
    match value? {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

impl MetricEntry {
    /// Reads an entry from stored JSON without rejecting odd shapes.
    ///
    /// Non-object entries yield an empty entry; `description` and `units`
    /// are coerced to text.
    #[must_use]
    pub fn from_json(entry: &serde_json::Value) -> Self {
        let Some(fields) = entry.as_object() else {
            return Self::default();
        };

        Self {
            value: fields.get("value").cloned(),
            description: json_text(fields.get("description")),
            units: json_text(fields.get("units")),
        }
    }
}

/// Parses a stored metric document.
///
/// Keys that are not `category.usage.source` paths can never be requested
/// and are skipped; a document that is not a JSON object has no entries.
///
/// # Errors
///
/// Returns [`serde_json::Error`] only if `json` is not valid JSON.
pub fn parse_document(json: &str) -> Result<MetricDocument, serde_json::Error> {
    let serde_json::Value::Object(entries) = serde_json::from_str(json)? else {
        return Ok(MetricDocument::new());
    };

    Ok(entries
        .iter()
        .filter_map(|(key, entry)| {
            let path = key.parse::<MetricFieldPath>().ok()?;
            Some((path, MetricEntry::from_json(entry)))
        })
        .collect())
}

/// All metric documents attached to a single geometry.
///
/// Holds at most one baseline document and at most one document per
/// named scenario.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScenarioDocuments {
    baseline: Option<MetricDocument>,
    named: BTreeMap<String, MetricDocument>,
}

impl ScenarioDocuments {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches a document for `scenario`.
    ///
    /// Returns `false` (leaving the existing document in place) if one is
    /// already present for that scenario.
    pub fn insert(&mut self, scenario: ScenarioRef, document: MetricDocument) -> bool {
        match scenario {
            ScenarioRef::Baseline => {
                if self.baseline.is_some() {
                    return false;
                }
                self.baseline = Some(document);
            }
            ScenarioRef::Named(slug) => {
                if self.named.contains_key(&slug) {
                    return false;
                }
                self.named.insert(slug, document);
            }
        }
        true
    }

    /// The document stored for exactly `scenario`, if any.
    #[must_use]
    pub fn get(&self, scenario: &ScenarioRef) -> Option<&MetricDocument> {
        match scenario {
            ScenarioRef::Baseline => self.baseline.as_ref(),
            ScenarioRef::Named(slug) => self.named.get(slug),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.baseline.is_none() && self.named.is_empty()
    }
}
