#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Request, candidate, and aggregate result types for the spatial search
//! engine.
//!
//! These are independent of both the HTTP wire format (see
//! `study_explorer_server_models`) and any particular store.

use serde::{Deserialize, Serialize};
use study_explorer_metrics_models::{MetricEntry, MetricFieldPath, ScenarioRef};

/// A WGS84 coordinate in longitude/latitude order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Longitude in degrees.
    pub lon: f64,
    /// Latitude in degrees.
    pub lat: f64,
}

impl Coordinate {
    #[must_use]
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

/// Area of interest for a search.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Aoi {
    /// No spatial filter: every geometry in scope.
    #[default]
    All,
    /// A closed polygon ring (first coordinate repeated last).
    Ring(Vec<Coordinate>),
}

impl Aoi {
    #[must_use]
    pub const fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }
}

/// A fully parsed search request.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    /// Study whose geometries are searched.
    pub study_slug: String,
    /// Scenario whose documents supply the values.
    pub scenario: ScenarioRef,
    /// Which entry to read from each document.
    pub path: MetricFieldPath,
    /// Optional spatial filter.
    pub aoi: Aoi,
}

/// A geometry that survived scenario resolution and spatial filtering.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Geometry key (feature id on the map).
    pub id: String,
    /// The entry at the requested path, `None` if the resolved document
    /// has no entry there.
    pub entry: Option<MetricEntry>,
}

/// Per-feature value used to shade the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureShading {
    /// Geometry key.
    pub id: String,
    /// Extracted value, `None` when missing or non-numeric.
    pub shading: Option<f64>,
}

impl FeatureShading {
    /// Shading as a percentage of `max`, as used for relative color ramps.
    ///
    /// `None` when the feature has no value or `max` is zero.
    #[must_use]
    pub fn relative_percentage(&self, max: f64) -> Option<f64> {
        let shading = self.shading?;
        if max.abs() < f64::EPSILON {
            return None;
        }
        Some(shading / max * 100.0)
    }
}

/// Aggregate statistics for one `(units, description)` group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateSummary {
    /// Sum of values (missing counted as zero).
    pub total: f64,
    /// Mean of values (missing counted as zero).
    pub average: f64,
    /// Largest value (missing counted as zero).
    pub max: f64,
    /// Unit label shared by the group.
    pub units: Option<String>,
    /// Description shared by the group.
    pub description: Option<String>,
    /// Features in the group, ordered by geometry key.
    pub features: Vec<FeatureShading>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_percentage_of_max() {
        let feature = FeatureShading {
            id: "b-1".to_string(),
            shading: Some(5.0),
        };
        assert_eq!(feature.relative_percentage(20.0), Some(25.0));
        assert_eq!(feature.relative_percentage(0.0), None);

        let empty = FeatureShading {
            id: "b-2".to_string(),
            shading: None,
        };
        assert_eq!(empty.relative_percentage(20.0), None);
    }

    #[test]
    fn default_aoi_is_all() {
        assert!(Aoi::default().is_all());
        assert!(!Aoi::Ring(vec![Coordinate::new(0.0, 0.0)]).is_all());
    }
}
