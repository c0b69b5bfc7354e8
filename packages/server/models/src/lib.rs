#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the study explorer server.
//!
//! These types are serialized to JSON for the REST API. They are separate
//! from the database row types and the engine's summary type so the wire
//! contract the map client depends on can evolve independently.

use serde::{Deserialize, Serialize};
use study_explorer_database_models::{MetricOptions, ScenarioRow, StudyDetail, StudyRow};
use study_explorer_metrics_models::BASELINE_SLUG;
use study_explorer_search_models::{AggregateSummary, FeatureShading};

/// Description shown for the implicit baseline scenario.
pub const BASELINE_DESCRIPTION: &str = "The baseline values where no scenario has been applied yet.";

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiHealth {
    /// Whether the server is healthy.
    pub healthy: bool,
    /// Server version.
    pub version: String,
}

/// Error body returned with non-2xx responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    /// Human-readable message.
    pub error: String,
}

impl ApiError {
    #[must_use]
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Query parameters for the search endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchQueryParams {
    /// Percent-encoded `lon lat,lon lat,...` ring, or `null` for no AOI.
    pub coordinates: Option<String>,
}

/// One feature of a search result row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiFeatureObject {
    /// Geometry key.
    pub id: String,
    /// The feature's metric value, `null` when missing or non-numeric.
    pub shading: Option<f64>,
}

impl From<FeatureShading> for ApiFeatureObject {
    fn from(feature: FeatureShading) -> Self {
        Self {
            id: feature.id,
            shading: feature.shading,
        }
    }
}

/// The aggregate for one `(units, description)` group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiSearchRow {
    /// Sum of the feature values, missing values counting as zero.
    pub data_total: f64,
    /// `data_total` divided by the number of features.
    pub data_avg: f64,
    /// Largest feature value, missing values counting as zero.
    pub data_max: f64,
    /// Units of the group.
    pub data_unit: Option<String>,
    /// Description of the group.
    pub data_description: Option<String>,
    /// Per-feature values for shading the map.
    pub feature_objects: Vec<ApiFeatureObject>,
}

impl From<AggregateSummary> for ApiSearchRow {
    fn from(summary: AggregateSummary) -> Self {
        Self {
            data_total: summary.total,
            data_avg: summary.average,
            data_max: summary.max,
            data_unit: summary.units,
            data_description: summary.description,
            feature_objects: summary
                .features
                .into_iter()
                .map(ApiFeatureObject::from)
                .collect(),
        }
    }
}

/// Search endpoint response. `search` holds zero or one row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    /// The top group, if any geometry matched.
    pub search: Vec<ApiSearchRow>,
}

impl From<Option<AggregateSummary>> for SearchResponse {
    fn from(summary: Option<AggregateSummary>) -> Self {
        Self {
            search: summary.into_iter().map(ApiSearchRow::from).collect(),
        }
    }
}

/// A study as listed on the landing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiStudySummary {
    /// URL slug.
    pub slug: String,
    /// Display name.
    pub name: String,
    /// Short description.
    pub description: Option<String>,
    /// Hero image path or URL.
    pub image_src: Option<String>,
    /// Study scale.
    pub scale: Option<String>,
}

impl From<StudyRow> for ApiStudySummary {
    fn from(row: StudyRow) -> Self {
        Self {
            slug: row.slug,
            name: row.name,
            description: row.description,
            image_src: row.image_src,
            scale: row.scale,
        }
    }
}

/// A scenario selectable within a theme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiScenario {
    /// Scenario slug; `baseline` for the implicit baseline.
    pub slug: String,
    /// Display name.
    pub name: String,
    /// What the scenario changes.
    pub description: Option<String>,
    /// How the scenario values were derived.
    pub methodology: Option<String>,
}

impl ApiScenario {
    /// The implicit baseline scenario every theme offers.
    #[must_use]
    pub fn baseline() -> Self {
        Self {
            slug: BASELINE_SLUG.to_string(),
            name: "Baseline".to_string(),
            description: Some(BASELINE_DESCRIPTION.to_string()),
            methodology: None,
        }
    }
}

impl From<ScenarioRow> for ApiScenario {
    fn from(row: ScenarioRow) -> Self {
        Self {
            slug: row.slug,
            name: row.name,
            description: row.description,
            methodology: row.methodology,
        }
    }
}

/// Metric selector values for a theme.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiMetricOptions {
    /// Sorted distinct categories.
    pub categories: Vec<String>,
    /// Sorted distinct usages.
    pub usages: Vec<String>,
    /// Sorted distinct sources.
    pub sources: Vec<String>,
}

impl From<MetricOptions> for ApiMetricOptions {
    fn from(options: MetricOptions) -> Self {
        Self {
            categories: options.categories.into_iter().collect(),
            usages: options.usages.into_iter().collect(),
            sources: options.sources.into_iter().collect(),
        }
    }
}

/// A theme with its scenarios, baseline first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiTheme {
    /// Theme slug.
    pub slug: String,
    /// Display name.
    pub name: String,
    /// Scenarios, starting with the baseline.
    pub scenarios: Vec<ApiScenario>,
    /// Metric selector values.
    pub options: ApiMetricOptions,
}

/// A study with everything the explore page needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiStudy {
    /// The study itself.
    #[serde(flatten)]
    pub study: ApiStudySummary,
    /// Themes in display order.
    pub themes: Vec<ApiTheme>,
}

impl From<StudyDetail> for ApiStudy {
    fn from(detail: StudyDetail) -> Self {
        let themes = detail
            .themes
            .into_iter()
            .map(|theme| ApiTheme {
                slug: theme.theme.slug,
                name: theme.theme.name,
                scenarios: std::iter::once(ApiScenario::baseline())
                    .chain(
                        theme
                            .scenarios
                            .into_iter()
                            .filter(|s| s.slug != BASELINE_SLUG)
                            .map(ApiScenario::from),
                    )
                    .collect(),
                options: theme.options.into(),
            })
            .collect();

        Self {
            study: detail.study.into(),
            themes,
        }
    }
}

/// Formats a number compactly with a `K`/`M`/`B`/`T` suffix.
///
/// Values below one thousand are printed as-is; larger values are scaled
/// and printed with `decimals` fractional digits.
#[must_use]
pub fn format_large_number(number: f64, decimals: usize) -> String {
    const STEPS: [(f64, &str); 3] = [(1e6, "K"), (1e9, "M"), (1e12, "B")];

    if number < 1000.0 {
        return number.to_string();
    }

    let mut divisor = 1000.0;
    for (limit, suffix) in STEPS {
        if number < limit {
            return format!("{:.decimals$}{suffix}", number / divisor);
        }
        divisor *= 1000.0;
    }

    format!("{:.decimals$}T", number / 1e12)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use study_explorer_database_models::{ThemeDetail, ThemeRow};

    use super::*;

    fn summary() -> AggregateSummary {
        AggregateSummary {
            total: 30.0,
            average: 10.0,
            max: 20.0,
            units: Some("kWh".to_string()),
            description: None,
            features: vec![
                FeatureShading {
                    id: "1".to_string(),
                    shading: Some(10.0),
                },
                FeatureShading {
                    id: "3".to_string(),
                    shading: None,
                },
            ],
        }
    }

    #[test]
    fn search_response_wire_shape() {
        let response = SearchResponse::from(Some(summary()));
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["search"].as_array().unwrap().len(), 1);
        let row = &json["search"][0];
        assert_eq!(row["data_total"], 30.0);
        assert_eq!(row["data_avg"], 10.0);
        assert_eq!(row["data_max"], 20.0);
        assert_eq!(row["data_unit"], "kWh");
        assert!(row["data_description"].is_null());
        assert_eq!(row["feature_objects"][0]["id"], "1");
        assert_eq!(row["feature_objects"][0]["shading"], 10.0);
        assert!(row["feature_objects"][1]["shading"].is_null());
    }

    #[test]
    fn empty_search_is_empty_array() {
        let json = serde_json::to_value(SearchResponse::from(None)).unwrap();
        assert_eq!(json, serde_json::json!({ "search": [] }));
    }

    #[test]
    fn study_puts_baseline_first() {
        let detail = StudyDetail {
            study: StudyRow {
                slug: "solarcity".to_string(),
                name: "Solar City".to_string(),
                description: None,
                image_src: Some("/img/solar.png".to_string()),
                scale: None,
            },
            themes: vec![ThemeDetail {
                theme: ThemeRow {
                    slug: "energy".to_string(),
                    name: "Energy".to_string(),
                },
                scenarios: vec![ScenarioRow {
                    slug: "retrofit".to_string(),
                    name: "Retrofit".to_string(),
                    description: None,
                    methodology: None,
                }],
                options: MetricOptions {
                    categories: BTreeSet::from(["energy".to_string()]),
                    usages: BTreeSet::new(),
                    sources: BTreeSet::from(["solar".to_string(), "grid".to_string()]),
                },
            }],
        };

        let study = ApiStudy::from(detail);
        let theme = &study.themes[0];
        assert_eq!(theme.scenarios[0], ApiScenario::baseline());
        assert_eq!(theme.scenarios[1].slug, "retrofit");
        assert_eq!(theme.options.sources, ["grid", "solar"]);

        let json = serde_json::to_value(&study).unwrap();
        assert_eq!(json["slug"], "solarcity");
        assert_eq!(json["imageSrc"], "/img/solar.png");
        assert_eq!(
            json["themes"][0]["scenarios"][0]["description"],
            BASELINE_DESCRIPTION
        );
    }

    #[test]
    fn formats_large_numbers() {
        assert_eq!(format_large_number(30.0, 2), "30");
        assert_eq!(format_large_number(12.5, 2), "12.5");
        assert_eq!(format_large_number(1500.0, 2), "1.50K");
        assert_eq!(format_large_number(2_500_000.0, 2), "2.50M");
        assert_eq!(format_large_number(7_000_000_000.0, 1), "7.0B");
        assert_eq!(format_large_number(3.2e12, 0), "3T");
    }
}
