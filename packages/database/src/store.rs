//! `PostGIS`-backed [`GeometryStore`].
//!
//! Scenario resolution and the intersects test run inside Postgres; the
//! engine receives one row per candidate geometry with the addressed
//! metric entry already pulled out of the `JSONB` document.

use std::sync::Arc;

use async_trait::async_trait;
use moosicbox_json_utils::database::ToValue as _;
use study_explorer_metrics_models::{MetricEntry, ScenarioRef};
use study_explorer_search::{CandidateScope, GeometryStore, StoreError};
use study_explorer_search_models::Candidate;
use switchy_database::{Database, DatabaseValue};

/// Geometry store over the `geometries` and `scenario_metrics` tables.
pub struct PostgisStore {
    db: Arc<dyn Database>,
}

impl PostgisStore {
    #[must_use]
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }
}

/// Builds the candidate query and its parameters for `scope`.
///
/// `$1` is the study slug and `$2` the metric path; the scenario slug and
/// the AOI (as `GeoJSON`) follow only when needed.
///
/// # Errors
///
/// Returns [`StoreError::Conversion`] if the AOI cannot be serialized.
pub fn build_candidate_query(
    scope: &CandidateScope<'_>,
) -> Result<(String, Vec<DatabaseValue>), StoreError> {
    let mut frags = vec!["g.study_slug = $1".to_string()];
    let mut params = vec![
        DatabaseValue::String(scope.study_slug.to_string()),
        DatabaseValue::String(scope.path.to_string()),
    ];
    let mut idx = 3;

    match scope.scenario {
        ScenarioRef::Baseline => frags.push("m.scenario_slug IS NULL".to_string()),
        ScenarioRef::Named(slug) => {
            frags.push(format!("m.scenario_slug = ${idx}"));
            params.push(DatabaseValue::String(slug.clone()));
            idx += 1;
        }
    }

    if let Some(aoi) = scope.aoi {
        let geometry = geojson::Geometry::new(geojson::Value::from(aoi));
        let aoi_json = serde_json::to_string(&geometry).map_err(|e| StoreError::Conversion {
            message: format!("Failed to serialize AOI: {e}"),
        })?;

        // The bounding-box test in 4326 lets the GiST index prune; the
        // exact test runs in Web Mercator.
        let aoi_geom = format!("ST_SetSRID(ST_GeomFromGeoJSON(${idx}), 4326)");
        frags.push(format!("g.geom && {aoi_geom}"));
        frags.push(format!(
            "ST_Intersects(ST_Transform(g.geom, 3857), ST_Transform({aoi_geom}, 3857))"
        ));
        params.push(DatabaseValue::String(aoi_json));
    }

    let sql = format!(
        "SELECT
             g.key AS id,
             CASE WHEN m.data -> $2::text IS NULL THEN 0 ELSE 1 END AS has_entry,
             m.data -> $2::text ->> 'value' AS data_value,
             m.data -> $2::text ->> 'description' AS data_description,
             m.data -> $2::text ->> 'units' AS data_unit
         FROM geometries g
         JOIN scenario_metrics m
             ON m.study_slug = g.study_slug AND m.geometry_key = g.key
         WHERE {}
         ORDER BY g.key",
        frags.join(" AND ")
    );

    Ok((sql, params))
}

fn conversion<E: std::fmt::Display>(column: &'static str) -> impl Fn(E) -> StoreError {
    move |e| StoreError::Conversion {
        message: format!("Failed to parse column {column}: {e}"),
    }
}

/// Builds a candidate from the decoded columns of one result row.
///
/// `has_entry` is zero when the resolved document has no entry at the
/// requested path. The value arrives as text (`->>`) and is coerced later.
fn candidate_from_columns(
    id: String,
    has_entry: i32,
    value: Option<String>,
    description: Option<String>,
    units: Option<String>,
) -> Candidate {
    let entry = (has_entry != 0).then(|| MetricEntry {
        value: value.map(serde_json::Value::String),
        description,
        units,
    });

    Candidate { id, entry }
}

fn row_to_candidate(row: &switchy_database::Row) -> Result<Candidate, StoreError> {
    Ok(candidate_from_columns(
        row.to_value("id").map_err(conversion("id"))?,
        row.to_value("has_entry").map_err(conversion("has_entry"))?,
        row.to_value("data_value").map_err(conversion("data_value"))?,
        row.to_value("data_description")
            .map_err(conversion("data_description"))?,
        row.to_value("data_unit").map_err(conversion("data_unit"))?,
    ))
}

#[async_trait]
impl GeometryStore for PostgisStore {
    async fn candidates(&self, scope: &CandidateScope<'_>) -> Result<Vec<Candidate>, StoreError> {
        let (sql, params) = build_candidate_query(scope)?;

        let rows = self
            .db
            .query_raw_params(&sql, &params)
            .await
            .map_err(|e| {
                log::error!("Candidate query failed for study {}: {e}", scope.study_slug);
                StoreError::Unavailable {
                    message: e.to_string(),
                }
            })?;

        rows.iter().map(row_to_candidate).collect()
    }
}

#[cfg(test)]
mod tests {
    use geo::polygon;
    use study_explorer_metrics_models::MetricFieldPath;

    use super::*;

    fn as_string(value: &DatabaseValue) -> Option<&str> {
        match value {
            DatabaseValue::String(s) => Some(s),
            _ => None,
        }
    }

    #[test]
    fn baseline_without_aoi() {
        let path = MetricFieldPath::category("energy");
        let scope = CandidateScope {
            study_slug: "solarcity",
            scenario: &ScenarioRef::Baseline,
            path: &path,
            aoi: None,
        };

        let (sql, params) = build_candidate_query(&scope).unwrap();

        assert!(sql.contains("m.scenario_slug IS NULL"));
        assert!(!sql.contains("ST_Intersects"));
        assert!(!sql.contains("$3"));
        assert_eq!(params.len(), 2);
        assert_eq!(as_string(&params[0]), Some("solarcity"));
        assert_eq!(as_string(&params[1]), Some("energy.."));
    }

    #[test]
    fn named_scenario_with_aoi_binds_everything() {
        let path = MetricFieldPath::new("energy", Some("residential"), Some("grid"));
        let scenario = ScenarioRef::Named("retrofit".to_string());
        let aoi = polygon![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 1.0, y: 1.0),
            (x: 0.0, y: 0.0),
        ];
        let scope = CandidateScope {
            study_slug: "solarcity",
            scenario: &scenario,
            path: &path,
            aoi: Some(&aoi),
        };

        let (sql, params) = build_candidate_query(&scope).unwrap();

        assert!(sql.contains("m.scenario_slug = $3"));
        assert!(sql.contains("ST_GeomFromGeoJSON($4)"));
        assert!(sql.contains("ST_Transform(g.geom, 3857)"));
        assert_eq!(params.len(), 4);
        assert_eq!(as_string(&params[1]), Some("energy.residential.grid"));
        assert_eq!(as_string(&params[2]), Some("retrofit"));

        let aoi_json: serde_json::Value =
            serde_json::from_str(as_string(&params[3]).unwrap()).unwrap();
        assert_eq!(aoi_json["type"], "Polygon");
        assert_eq!(aoi_json["coordinates"][0].as_array().unwrap().len(), 4);
    }

    #[test]
    fn missing_entry_decodes_to_empty_candidate() {
        let candidate = candidate_from_columns("b-1".to_string(), 0, None, None, None);
        assert_eq!(candidate.id, "b-1");
        assert!(candidate.entry.is_none());
    }

    #[test]
    fn text_value_is_coerced_later() {
        let candidate = candidate_from_columns(
            "b-2".to_string(),
            1,
            Some("12.5".to_string()),
            Some("Annual energy use".to_string()),
            None,
        );

        let entry = candidate.entry.unwrap();
        assert_eq!(entry.numeric_value(), Some(12.5));
        assert_eq!(entry.description.as_deref(), Some("Annual energy use"));
        assert_eq!(entry.units, None);
    }

    #[test]
    fn conversion_failures_name_the_column() {
        let err = conversion::<&str>("has_entry")("expected integer");
        assert!(matches!(
            &err,
            StoreError::Conversion { message } if message.contains("has_entry")
        ));
    }

    #[test]
    fn user_text_never_reaches_sql() {
        let path = MetricFieldPath::category("energy'; DROP TABLE geometries; --");
        let scenario = ScenarioRef::Named("x' OR '1'='1".to_string());
        let scope = CandidateScope {
            study_slug: "solarcity' --",
            scenario: &scenario,
            path: &path,
            aoi: None,
        };

        let (sql, _) = build_candidate_query(&scope).unwrap();
        assert!(!sql.contains("DROP"));
        assert!(!sql.contains("'1'='1"));
        assert!(!sql.contains("solarcity"));
    }
}
