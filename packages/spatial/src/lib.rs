#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! In-memory spatial index over study geometries.
//!
//! Geometries are projected to Web Mercator once, at build time, and
//! stored per study in an R-tree together with their scenario metric
//! documents. [`SpatialIndex`] implements
//! [`GeometryStore`](study_explorer_search::GeometryStore), so it can serve
//! searches without a database, either built programmatically or loaded
//! from a `DuckDB` snapshot (see [`snapshot`]).

pub mod projection;
pub mod snapshot;

use std::collections::BTreeMap;

use async_trait::async_trait;
use geo::{BoundingRect, Intersects, MultiPolygon, Polygon};
use geojson::GeoJson;
use rstar::{AABB, RTree, RTreeObject};
use study_explorer_metrics_models::{MetricDocument, ScenarioDocuments, ScenarioRef};
use study_explorer_search::resolve::resolve_candidate;
use study_explorer_search::{CandidateScope, GeometryStore, StoreError};
use study_explorer_search_models::Candidate;

pub use snapshot::SnapshotError;

/// A study geometry stored in the R-tree with its documents.
struct GeometryEntry {
    key: String,
    envelope: AABB<[f64; 2]>,
    /// Footprint in EPSG:3857.
    projected: MultiPolygon<f64>,
    documents: ScenarioDocuments,
}

impl RTreeObject for GeometryEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Per-study R-tree indexes over projected geometries.
pub struct SpatialIndex {
    studies: BTreeMap<String, RTree<GeometryEntry>>,
}

impl SpatialIndex {
    #[must_use]
    pub fn builder() -> SpatialIndexBuilder {
        SpatialIndexBuilder::default()
    }

    /// Number of geometries indexed for `study_slug`.
    #[must_use]
    pub fn geometry_count(&self, study_slug: &str) -> usize {
        self.studies.get(study_slug).map_or(0, RTree::size)
    }

    /// Slugs of all indexed studies.
    pub fn studies(&self) -> impl Iterator<Item = &str> {
        self.studies.keys().map(String::as_str)
    }

    fn matching_entries<'a>(
        tree: &'a RTree<GeometryEntry>,
        aoi: Option<&Polygon<f64>>,
    ) -> Vec<&'a GeometryEntry> {
        let Some(aoi) = aoi else {
            return tree.iter().collect();
        };

        let projected = projection::project_polygon(aoi);
        let Some(query_env) = polygon_envelope(&projected) else {
            return Vec::new();
        };

        tree.locate_in_envelope_intersecting(&query_env)
            .filter(|entry| entry.projected.intersects(&projected))
            .collect()
    }
}

#[async_trait]
impl GeometryStore for SpatialIndex {
    async fn candidates(&self, scope: &CandidateScope<'_>) -> Result<Vec<Candidate>, StoreError> {
        let Some(tree) = self.studies.get(scope.study_slug) else {
            return Ok(Vec::new());
        };

        let mut candidates: Vec<Candidate> = Self::matching_entries(tree, scope.aoi)
            .into_iter()
            .filter_map(|entry| {
                resolve_candidate(&entry.key, &entry.documents, scope.scenario, scope.path)
            })
            .collect();
        candidates.sort_by(|a, b| a.id.cmp(&b.id));

        Ok(candidates)
    }
}

/// Collects geometries and documents before projecting and bulk-loading
/// them into a [`SpatialIndex`].
#[derive(Default)]
pub struct SpatialIndexBuilder {
    studies: BTreeMap<String, BTreeMap<String, (MultiPolygon<f64>, ScenarioDocuments)>>,
}

impl SpatialIndexBuilder {
    /// Adds a geometry in EPSG:4326.
    ///
    /// Returns `false` and keeps the existing geometry if `key` is already
    /// present in `study_slug`.
    pub fn add_geometry(
        &mut self,
        study_slug: &str,
        key: &str,
        geometry: MultiPolygon<f64>,
    ) -> bool {
        let study = self.studies.entry(study_slug.to_string()).or_default();
        if study.contains_key(key) {
            log::warn!("Duplicate geometry key {key} in study {study_slug}, keeping the first");
            return false;
        }
        study.insert(key.to_string(), (geometry, ScenarioDocuments::new()));
        true
    }

    /// Attaches a metric document to a previously added geometry.
    ///
    /// Returns `false` if the geometry is unknown or already has a
    /// document for `scenario`.
    pub fn add_document(
        &mut self,
        study_slug: &str,
        key: &str,
        scenario: ScenarioRef,
        document: MetricDocument,
    ) -> bool {
        let Some((_, documents)) = self
            .studies
            .get_mut(study_slug)
            .and_then(|study| study.get_mut(key))
        else {
            log::warn!("Metric document for unknown geometry {key} in study {study_slug}");
            return false;
        };

        if !documents.insert(scenario.clone(), document) {
            log::warn!(
                "Duplicate {scenario} document for geometry {key} in study {study_slug}, keeping the first"
            );
            return false;
        }
        true
    }

    /// Projects every geometry and builds the per-study R-trees.
    #[must_use]
    pub fn build(self) -> SpatialIndex {
        let studies = self
            .studies
            .into_iter()
            .map(|(study_slug, geometries)| {
                let entries: Vec<GeometryEntry> = geometries
                    .into_iter()
                    .filter_map(|(key, (geometry, documents))| {
                        let projected = projection::project_multi_polygon(&geometry);
                        let Some(envelope) = compute_envelope(&projected) else {
                            log::warn!("Skipping empty geometry {key} in study {study_slug}");
                            return None;
                        };
                        Some(GeometryEntry {
                            key,
                            envelope,
                            projected,
                            documents,
                        })
                    })
                    .collect();
                log::info!(
                    "Indexed {} geometries for study {study_slug}",
                    entries.len()
                );
                (study_slug, RTree::bulk_load(entries))
            })
            .collect();

        SpatialIndex { studies }
    }
}

/// Parse a `GeoJSON` string into a [`MultiPolygon`].
/// Handles both `Polygon` and `MultiPolygon` geometry types.
#[must_use]
pub fn parse_geojson_to_multipolygon(geojson_str: &str) -> Option<MultiPolygon<f64>> {
    let geojson: GeoJson = geojson_str.parse().ok()?;
    let geometry = match geojson {
        GeoJson::Geometry(geom) => geom,
        GeoJson::Feature(feature) => feature.geometry?,
        GeoJson::FeatureCollection(_) => return None,
    };
    let geo_geom: geo::Geometry<f64> = geometry.try_into().ok()?;
    match geo_geom {
        geo::Geometry::MultiPolygon(mp) => Some(mp),
        geo::Geometry::Polygon(p) => Some(MultiPolygon(vec![p])),
        _ => None,
    }
}

/// Compute the bounding box envelope for a [`MultiPolygon`].
fn compute_envelope(mp: &MultiPolygon<f64>) -> Option<AABB<[f64; 2]>> {
    mp.bounding_rect()
        .map(|rect| AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]))
}

fn polygon_envelope(polygon: &Polygon<f64>) -> Option<AABB<[f64; 2]>> {
    polygon
        .bounding_rect()
        .map(|rect| AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]))
}

#[cfg(test)]
mod tests {
    use geo::{LineString, polygon};
    use study_explorer_metrics_models::{MetricEntry, MetricFieldPath};
    use study_explorer_search::{SearchConfig, aoi, parse_request, search};
    use study_explorer_search_models::Aoi;

    use super::*;

    /// A 0.001° square building footprint with its south-west corner at
    /// (`lon`, `lat`).
    fn footprint(lon: f64, lat: f64) -> MultiPolygon<f64> {
        let d = 0.001;
        MultiPolygon(vec![polygon![
            (x: lon, y: lat),
            (x: lon + d, y: lat),
            (x: lon + d, y: lat + d),
            (x: lon, y: lat + d),
            (x: lon, y: lat),
        ]])
    }

    fn energy(value: Option<f64>) -> MetricDocument {
        MetricDocument::from([(
            MetricFieldPath::category("energy"),
            MetricEntry::new(value, "Annual energy use", "kWh"),
        )])
    }

    /// Three buildings along a street in San Francisco; only building 2
    /// has a retrofit scenario document.
    fn solarcity() -> SpatialIndex {
        let mut builder = SpatialIndex::builder();
        for (key, lon, value) in [
            ("1", -122.420, Some(10.0)),
            ("2", -122.410, Some(20.0)),
            ("3", -122.400, None),
        ] {
            assert!(builder.add_geometry("solarcity", key, footprint(lon, 37.77)));
            assert!(builder.add_document("solarcity", key, ScenarioRef::Baseline, energy(value)));
        }
        assert!(builder.add_document(
            "solarcity",
            "2",
            ScenarioRef::Named("retrofit".to_string()),
            energy(Some(50.0)),
        ));
        builder.build()
    }

    fn west_half() -> Aoi {
        let ring: LineString<f64> = vec![
            (-122.425, 37.765),
            (-122.4095, 37.765),
            (-122.4095, 37.775),
            (-122.425, 37.775),
            (-122.425, 37.765),
        ]
        .into();
        aoi::from_polygon(&Polygon::new(ring, vec![])).unwrap()
    }

    async fn ids(index: &SpatialIndex, scenario: &str, aoi: Option<&str>) -> Vec<String> {
        let request = parse_request("solarcity", scenario, "energy..", aoi).unwrap();
        search(index, &request, &SearchConfig::default())
            .await
            .unwrap()
            .map(|s| s.features.into_iter().map(|f| f.id).collect())
            .unwrap_or_default()
    }

    #[test]
    fn rejects_duplicates() {
        let mut builder = SpatialIndex::builder();
        assert!(builder.add_geometry("s", "a", footprint(0.0, 0.0)));
        assert!(!builder.add_geometry("s", "a", footprint(1.0, 1.0)));
        assert!(builder.add_geometry("other", "a", footprint(0.0, 0.0)));
        assert!(!builder.add_document("s", "missing", ScenarioRef::Baseline, energy(None)));
        assert!(builder.add_document("s", "a", ScenarioRef::Baseline, energy(None)));
        assert!(!builder.add_document("s", "a", ScenarioRef::Baseline, energy(None)));

        let index = builder.build();
        assert_eq!(index.geometry_count("s"), 1);
        assert_eq!(index.studies().collect::<Vec<_>>(), ["other", "s"]);
    }

    #[tokio::test]
    async fn all_features_without_aoi() {
        let index = solarcity();
        assert_eq!(ids(&index, "baseline", Some("null")).await, ["1", "2", "3"]);
        assert_eq!(ids(&index, "retrofit", None).await, ["2"]);
    }

    #[tokio::test]
    async fn aoi_intersection_is_a_subset() {
        let index = solarcity();
        let encoded = aoi::encode_aoi(&west_half());

        let within = ids(&index, "baseline", Some(&encoded)).await;
        assert_eq!(within, ["1", "2"]);

        let all = ids(&index, "baseline", None).await;
        assert!(within.iter().all(|id| all.contains(id)));
    }

    #[tokio::test]
    async fn touching_boundary_counts_as_intersecting() {
        // The AOI's east edge runs exactly along building 2's west edge
        let ring = format!(
            "{} {},{} {},{} {},{} {},{} {}",
            -122.425, 37.765, -122.410, 37.765, -122.410, 37.775, -122.425, 37.775, -122.425,
            37.765
        );
        assert_eq!(ids(&solarcity(), "baseline", Some(&ring)).await, ["1", "2"]);
    }

    #[tokio::test]
    async fn unknown_study_is_empty() {
        let index = solarcity();
        let request = parse_request("elsewhere", "baseline", "energy..", None).unwrap();
        assert!(search(&index, &request, &SearchConfig::default())
            .await
            .unwrap()
            .is_none());
    }

    #[test]
    fn parses_polygon_and_feature_geojson() {
        let polygon = r#"{"type":"Polygon","coordinates":[[[0,0],[1,0],[1,1],[0,0]]]}"#;
        assert_eq!(parse_geojson_to_multipolygon(polygon).unwrap().0.len(), 1);

        let feature = format!(r#"{{"type":"Feature","properties":{{}},"geometry":{polygon}}}"#);
        assert!(parse_geojson_to_multipolygon(&feature).is_some());

        let point = r#"{"type":"Point","coordinates":[0,0]}"#;
        assert!(parse_geojson_to_multipolygon(point).is_none());
        assert!(parse_geojson_to_multipolygon("not json").is_none());
    }
}
