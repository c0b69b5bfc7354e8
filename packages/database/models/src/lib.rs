#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Study, theme, scenario, and metrics metadata row types.
//!
//! These types represent the shapes of data as written by the workbook
//! ingestion tool and read back by the explorer. They are distinct from
//! the API response types in `study_explorer_server_models`.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// A study row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyRow {
    /// URL slug, primary key.
    pub slug: String,
    /// Display name.
    pub name: String,
    /// Short description.
    pub description: Option<String>,
    /// Hero image path or URL.
    pub image_src: Option<String>,
    /// Study scale (e.g. `building`, `parcel`).
    pub scale: Option<String>,
}

/// A theme row (a group of metrics within a study, e.g. "Energy").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeRow {
    /// Theme slug, unique within the study.
    pub slug: String,
    /// Display name.
    pub name: String,
}

/// A named scenario row. The baseline is implicit and never stored here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioRow {
    /// Scenario slug, unique within the study.
    pub slug: String,
    /// Display name.
    pub name: String,
    /// What the scenario changes.
    pub description: Option<String>,
    /// How the scenario values were derived.
    pub methodology: Option<String>,
}

/// Link between a theme and one of its scenarios.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeScenarioRow {
    /// Owning theme.
    pub theme_slug: String,
    /// The scenario.
    pub scenario: ScenarioRow,
}

/// One `category`/`usage`/`source` combination declared for a theme.
///
/// Empty or `all` selectors are stored as `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsMetadataRow {
    /// Owning theme.
    pub theme_slug: String,
    /// Scenario the combination applies to, `None` for baseline.
    pub scenario_slug: Option<String>,
    /// Metric category.
    pub category: Option<String>,
    /// Usage selector.
    pub usage: Option<String>,
    /// Source selector.
    pub source: Option<String>,
}

/// Distinct selector values available for a theme.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricOptions {
    /// Sorted distinct categories.
    pub categories: BTreeSet<String>,
    /// Sorted distinct usages.
    pub usages: BTreeSet<String>,
    /// Sorted distinct sources.
    pub sources: BTreeSet<String>,
}

/// A theme with its scenarios and metric selector options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeDetail {
    /// The theme.
    pub theme: ThemeRow,
    /// Named scenarios attached to the theme.
    pub scenarios: Vec<ScenarioRow>,
    /// Selector values from metrics metadata.
    pub options: MetricOptions,
}

/// A study with everything the explore page needs to initialise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyDetail {
    /// The study.
    pub study: StudyRow,
    /// Themes in display order.
    pub themes: Vec<ThemeDetail>,
}
