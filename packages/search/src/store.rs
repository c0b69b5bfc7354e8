//! The boundary between the engine and whatever holds the geometries.

use async_trait::async_trait;
use geo::Polygon;
use study_explorer_metrics_models::{MetricFieldPath, ScenarioRef};
use study_explorer_search_models::Candidate;
use thiserror::Error;

/// Errors a [`GeometryStore`] may return.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached or the query failed to execute.
    #[error("Store unavailable: {message}")]
    Unavailable {
        /// Description of what went wrong.
        message: String,
    },

    /// A row came back in a shape the store could not convert.
    #[error("Conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },
}

/// What a store must filter by when producing candidates.
#[derive(Debug, Clone, Copy)]
pub struct CandidateScope<'a> {
    /// Owning study.
    pub study_slug: &'a str,
    /// Scenario whose document each geometry must have.
    pub scenario: &'a ScenarioRef,
    /// Entry to read from the resolved document.
    pub path: &'a MetricFieldPath,
    /// EPSG:4326 polygon to intersect with, `None` for no spatial filter.
    pub aoi: Option<&'a Polygon<f64>>,
}

/// A read-only source of candidate geometries.
///
/// Implementations apply scenario resolution (a geometry without a
/// document for exactly `scope.scenario` is left out) and, when
/// `scope.aoi` is set, an intersects test performed in EPSG:3857. They do
/// not aggregate.
#[async_trait]
pub trait GeometryStore: Send + Sync {
    /// Returns the candidate set for `scope`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the underlying store fails.
    async fn candidates(&self, scope: &CandidateScope<'_>) -> Result<Vec<Candidate>, StoreError>;
}
