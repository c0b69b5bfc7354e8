#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Scenario-aware spatial aggregation engine for study metrics.
//!
//! Given a study, a scenario, a `category.usage.source` metric path and an
//! optional area of interest, the engine asks a [`GeometryStore`] for the
//! candidate geometries (scenario-resolved and spatially filtered), reads
//! the addressed metric entry from each, groups by `(units, description)`
//! and returns the summary of the group with the highest total.
//!
//! The engine holds no state; every call is an independent read and the
//! store round-trip runs under a timeout. Dropping the returned future
//! cancels the request.

pub mod aggregate;
pub mod aoi;
pub mod resolve;
pub mod store;

use std::time::Duration;

use study_explorer_metrics_models::{EmptyScenarioError, MetricPathError, ScenarioRef};
use study_explorer_search_models::{AggregateSummary, SearchRequest};
use thiserror::Error;

pub use aoi::AoiError;
pub use store::{CandidateScope, GeometryStore, StoreError};

/// Default upper bound on a single store round-trip.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors that can occur while running a search.
#[derive(Debug, Error)]
pub enum SearchError {
    /// The area of interest could not be decoded.
    #[error("Invalid AOI: {0}")]
    InvalidAoi(#[from] AoiError),

    /// The metric path was malformed.
    #[error("Invalid metric path: {0}")]
    InvalidMetricPath(#[from] MetricPathError),

    /// Another request parameter was malformed.
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Description of what went wrong.
        message: String,
    },

    /// The store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The store did not answer within the configured timeout.
    #[error("Store did not respond within {timeout:?}")]
    Timeout {
        /// The timeout that elapsed.
        timeout: Duration,
    },
}

impl SearchError {
    /// Whether the error was caused by the caller's input rather than by
    /// the store.
    #[must_use]
    pub const fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            Self::InvalidAoi(_) | Self::InvalidMetricPath(_) | Self::InvalidRequest { .. }
        )
    }
}

impl From<EmptyScenarioError> for SearchError {
    fn from(e: EmptyScenarioError) -> Self {
        Self::InvalidRequest {
            message: e.to_string(),
        }
    }
}

/// Engine settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchConfig {
    /// Upper bound on a single store round-trip.
    pub timeout: Duration,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl SearchConfig {
    /// Reads `SEARCH_TIMEOUT_SECS`, falling back to [`DEFAULT_TIMEOUT`].
    #[must_use]
    pub fn from_env() -> Self {
        let timeout = std::env::var("SEARCH_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map_or(DEFAULT_TIMEOUT, Duration::from_secs);
        Self { timeout }
    }
}

/// Parses raw request parameters as they arrive from the map client.
///
/// # Errors
///
/// Returns [`SearchError`] if the study slug is empty, the scenario slug
/// is empty, the metric path is malformed, or the AOI cannot be decoded.
pub fn parse_request(
    study_slug: &str,
    scenario_slug: &str,
    metrics_field: &str,
    coordinates: Option<&str>,
) -> Result<SearchRequest, SearchError> {
    if study_slug.is_empty() {
        return Err(SearchError::InvalidRequest {
            message: "study slug must not be empty".to_string(),
        });
    }

    Ok(SearchRequest {
        study_slug: study_slug.to_string(),
        scenario: scenario_slug.parse::<ScenarioRef>()?,
        path: metrics_field.parse()?,
        aoi: aoi::decode_aoi(coordinates)?,
    })
}

/// Runs a search and returns the top `(units, description)` group.
///
/// `Ok(None)` means no geometry matched; that is "no data", not an error.
///
/// # Errors
///
/// Returns [`SearchError::Store`] if the store fails and
/// [`SearchError::Timeout`] if it does not answer in time.
pub async fn search(
    store: &dyn GeometryStore,
    request: &SearchRequest,
    config: &SearchConfig,
) -> Result<Option<AggregateSummary>, SearchError> {
    let polygon = aoi::to_polygon(&request.aoi);
    let scope = CandidateScope {
        study_slug: &request.study_slug,
        scenario: &request.scenario,
        path: &request.path,
        aoi: polygon.as_ref(),
    };

    let candidates = tokio::time::timeout(config.timeout, store.candidates(&scope))
        .await
        .map_err(|_| SearchError::Timeout {
            timeout: config.timeout,
        })??;

    log::debug!(
        "search study={} scenario={} path={} aoi={}: {} candidates",
        request.study_slug,
        request.scenario,
        request.path,
        if request.aoi.is_all() { "all" } else { "polygon" },
        candidates.len()
    );

    Ok(aggregate::top_summary(candidates))
}
