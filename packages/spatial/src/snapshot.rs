//! Loads a [`SpatialIndex`] from a `DuckDB` snapshot file.
//!
//! The snapshot holds two tables:
//!
//! ```text
//! geometries(study_slug VARCHAR, key VARCHAR, geometry_geojson VARCHAR)
//! scenario_metrics(study_slug VARCHAR, geometry_key VARCHAR,
//!                  scenario_slug VARCHAR NULL, data JSON)
//! ```
//!
//! A null `scenario_slug` marks the baseline document. Document keys
//! that are not metric paths are ignored; only a document that is not
//! valid JSON is skipped.

use std::path::Path;

use study_explorer_metrics_models::{MetricDocument, ScenarioRef, parse_document};
use thiserror::Error;

use crate::{SpatialIndex, SpatialIndexBuilder, parse_geojson_to_multipolygon};

/// Errors that can occur while loading a snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// `DuckDB` failed to open the file or run a query.
    #[error("DuckDB error: {0}")]
    Duckdb(#[from] duckdb::Error),
}

impl SpatialIndex {
    /// Opens the snapshot at `path` read-only and loads it.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError`] if the file cannot be opened or queried.
    pub fn open(path: &Path) -> Result<Self, SnapshotError> {
        let conn = duckdb::Connection::open_with_flags(
            path,
            duckdb::Config::default().access_mode(duckdb::AccessMode::ReadOnly)?,
        )?;
        Self::load(&conn)
    }

    /// Loads geometries and metric documents and builds the index.
    ///
    /// Rows with unparseable geometry `GeoJSON` or document text that is
    /// not JSON are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError`] if the queries fail.
    pub fn load(conn: &duckdb::Connection) -> Result<Self, SnapshotError> {
        let mut builder = Self::builder();

        let geometries = load_geometries(conn, &mut builder)?;
        log::info!("Loaded {geometries} geometries from snapshot");

        let documents = load_documents(conn, &mut builder)?;
        log::info!("Loaded {documents} metric documents from snapshot");

        Ok(builder.build())
    }
}

fn load_geometries(
    conn: &duckdb::Connection,
    builder: &mut SpatialIndexBuilder,
) -> Result<usize, SnapshotError> {
    let mut stmt = conn.prepare(
        "SELECT study_slug, key, geometry_geojson FROM geometries \
         WHERE geometry_geojson IS NOT NULL ORDER BY study_slug, key",
    )?;
    let mut rows = stmt.query([])?;
    let mut loaded = 0;

    while let Some(row) = rows.next()? {
        let study_slug: String = row.get(0)?;
        let key: String = row.get(1)?;
        let geojson_str: String = row.get(2)?;

        let Some(geometry) = parse_geojson_to_multipolygon(&geojson_str) else {
            log::warn!("Failed to parse GeoJSON for geometry {key} in study {study_slug}");
            continue;
        };

        if builder.add_geometry(&study_slug, &key, geometry) {
            loaded += 1;
        }
    }

    Ok(loaded)
}

fn load_documents(
    conn: &duckdb::Connection,
    builder: &mut SpatialIndexBuilder,
) -> Result<usize, SnapshotError> {
    let mut stmt = conn.prepare(
        "SELECT study_slug, geometry_key, scenario_slug, CAST(data AS VARCHAR) AS data \
         FROM scenario_metrics ORDER BY study_slug, geometry_key",
    )?;
    let mut rows = stmt.query([])?;
    let mut loaded = 0;

    while let Some(row) = rows.next()? {
        let study_slug: String = row.get(0)?;
        let key: String = row.get(1)?;
        let scenario = ScenarioRef::from_column(row.get::<_, Option<String>>(2)?);
        let data: Option<String> = row.get(3)?;

        let document = match data.as_deref().map(parse_document) {
            Some(Ok(document)) => document,
            Some(Err(e)) => {
                log::warn!("Invalid {scenario} metric document for {key} in {study_slug}: {e}");
                continue;
            }
            None => MetricDocument::new(),
        };

        if builder.add_document(&study_slug, &key, scenario, document) {
            loaded += 1;
        }
    }

    Ok(loaded)
}
