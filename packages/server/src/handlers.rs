//! HTTP handler functions for the study explorer API.

use actix_web::{HttpResponse, web};
use study_explorer_database::queries;
use study_explorer_search::{SearchError, parse_request};
use study_explorer_server_models::{
    ApiError, ApiHealth, ApiStudy, ApiStudySummary, SearchQueryParams, SearchResponse,
};

use crate::{AppState, SearchState};

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /api/studies`
///
/// Lists all studies.
pub async fn studies(state: web::Data<AppState>) -> HttpResponse {
    match queries::list_studies(state.db.as_ref()).await {
        Ok(rows) => {
            let studies: Vec<ApiStudySummary> =
                rows.into_iter().map(ApiStudySummary::from).collect();
            HttpResponse::Ok().json(studies)
        }
        Err(e) => {
            log::error!("Failed to query studies: {e}");
            HttpResponse::InternalServerError().json(ApiError::new("Failed to query studies"))
        }
    }
}

/// `GET /api/studies/{slug}`
///
/// Returns a study with its themes, scenarios, and metric options.
pub async fn study(state: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    let slug = path.into_inner();

    match queries::get_study_detail(state.db.as_ref(), &slug).await {
        Ok(Some(detail)) => HttpResponse::Ok().json(ApiStudy::from(detail)),
        Ok(None) => HttpResponse::NotFound().json(ApiError::new(format!("Unknown study '{slug}'"))),
        Err(e) => {
            log::error!("Failed to query study {slug}: {e}");
            HttpResponse::InternalServerError().json(ApiError::new("Failed to query study"))
        }
    }
}

/// `GET /api/search/{study_slug}/{scenario_slug}/{metrics_field}`
///
/// Aggregates the addressed metric over the study's geometries under the
/// given scenario, optionally restricted to the `coordinates` ring.
pub async fn search(
    state: web::Data<SearchState>,
    path: web::Path<(String, String, String)>,
    params: web::Query<SearchQueryParams>,
) -> HttpResponse {
    let (study_slug, scenario_slug, metrics_field) = path.into_inner();

    let request = match parse_request(
        &study_slug,
        &scenario_slug,
        &metrics_field,
        params.coordinates.as_deref(),
    ) {
        Ok(request) => request,
        Err(e) => {
            log::debug!("Rejected search {study_slug}/{scenario_slug}/{metrics_field}: {e}");
            return HttpResponse::BadRequest().json(ApiError::new(e.to_string()));
        }
    };

    match study_explorer_search::search(state.store.as_ref(), &request, &state.config).await {
        Ok(summary) => HttpResponse::Ok().json(SearchResponse::from(summary)),
        Err(e @ SearchError::Timeout { .. }) => {
            log::error!("Search {study_slug}/{scenario_slug}/{metrics_field} timed out: {e}");
            HttpResponse::GatewayTimeout().json(ApiError::new(e.to_string()))
        }
        Err(e) => {
            log::error!("Search {study_slug}/{scenario_slug}/{metrics_field} failed: {e}");
            HttpResponse::InternalServerError().json(ApiError::new("Failed to run search"))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use actix_web::{App, http::StatusCode, test};
    use async_trait::async_trait;
    use geo::{MultiPolygon, polygon};
    use study_explorer_metrics_models::{MetricDocument, MetricEntry, MetricFieldPath, ScenarioRef};
    use study_explorer_search::{CandidateScope, GeometryStore, SearchConfig, StoreError};
    use study_explorer_search_models::Candidate;
    use study_explorer_spatial::SpatialIndex;

    use super::*;
    use crate::configure_api;

    struct SlowStore;

    #[async_trait]
    impl GeometryStore for SlowStore {
        async fn candidates(&self, _: &CandidateScope<'_>) -> Result<Vec<Candidate>, StoreError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(Vec::new())
        }
    }

    struct BrokenStore;

    #[async_trait]
    impl GeometryStore for BrokenStore {
        async fn candidates(&self, _: &CandidateScope<'_>) -> Result<Vec<Candidate>, StoreError> {
            Err(StoreError::Unavailable {
                message: "connection reset".to_string(),
            })
        }
    }

    fn square(x: f64) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![polygon![
            (x: x, y: 0.0),
            (x: x + 0.5, y: 0.0),
            (x: x + 0.5, y: 0.5),
            (x: x, y: 0.5),
            (x: x, y: 0.0),
        ]])
    }

    fn energy(value: f64) -> MetricDocument {
        MetricDocument::from([(
            MetricFieldPath::category("energy"),
            MetricEntry::new(Some(value), "Annual energy use", "kWh"),
        )])
    }

    fn solarcity() -> SpatialIndex {
        let mut builder = SpatialIndex::builder();
        for (key, x, value) in [("1", 0.0, 10.0), ("2", 1.0, 20.0)] {
            builder.add_geometry("solarcity", key, square(x));
            builder.add_document("solarcity", key, ScenarioRef::Baseline, energy(value));
        }
        builder.add_document(
            "solarcity",
            "2",
            ScenarioRef::Named("retrofit".to_string()),
            energy(50.0),
        );
        builder.build()
    }

    fn search_state(store: Arc<dyn GeometryStore>, timeout: Duration) -> web::Data<SearchState> {
        web::Data::new(SearchState {
            store,
            config: SearchConfig { timeout },
        })
    }

    #[actix_web::test]
    async fn health_reports_version() {
        let app = test::init_service(App::new().configure(configure_api)).await;
        let req = test::TestRequest::get().uri("/api/health").to_request();
        let body: ApiHealth = test::call_and_read_body_json(&app, req).await;
        assert!(body.healthy);
        assert_eq!(body.version, env!("CARGO_PKG_VERSION"));
    }

    #[actix_web::test]
    async fn search_all_features() {
        let app = test::init_service(
            App::new()
                .app_data(search_state(Arc::new(solarcity()), Duration::from_secs(5)))
                .configure(configure_api),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/search/solarcity/baseline/energy..?coordinates=null")
            .to_request();
        let body: SearchResponse = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body.search.len(), 1);
        let row = &body.search[0];
        assert!((row.data_total - 30.0).abs() < f64::EPSILON);
        assert!((row.data_avg - 15.0).abs() < f64::EPSILON);
        assert!((row.data_max - 20.0).abs() < f64::EPSILON);
        assert_eq!(row.data_unit.as_deref(), Some("kWh"));
        assert_eq!(
            row.feature_objects.iter().map(|f| f.id.as_str()).collect::<Vec<_>>(),
            ["1", "2"]
        );
    }

    #[actix_web::test]
    async fn search_within_encoded_aoi() {
        let app = test::init_service(
            App::new()
                .app_data(search_state(Arc::new(solarcity()), Duration::from_secs(5)))
                .configure(configure_api),
        )
        .await;

        // Ring around the second square only.
        let coordinates = "0.9%201%2C1.6%201%2C1.6%20-0.1%2C0.9%20-0.1%2C0.9%201";
        let req = test::TestRequest::get()
            .uri(&format!(
                "/api/search/solarcity/retrofit/energy..?coordinates={coordinates}"
            ))
            .to_request();
        let body: SearchResponse = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body.search.len(), 1);
        assert_eq!(body.search[0].feature_objects.len(), 1);
        assert!((body.search[0].data_total - 50.0).abs() < f64::EPSILON);
    }

    #[actix_web::test]
    async fn unknown_study_is_empty() {
        let app = test::init_service(
            App::new()
                .app_data(search_state(Arc::new(solarcity()), Duration::from_secs(5)))
                .configure(configure_api),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/search/nowhere/baseline/energy..")
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body, serde_json::json!({ "search": [] }));
    }

    #[actix_web::test]
    async fn malformed_input_is_bad_request() {
        let app = test::init_service(
            App::new()
                .app_data(search_state(Arc::new(solarcity()), Duration::from_secs(5)))
                .configure(configure_api),
        )
        .await;

        for uri in [
            "/api/search/solarcity/baseline/energy",
            "/api/search/solarcity/baseline/energy..?coordinates=",
            "/api/search/solarcity/baseline/energy..?coordinates=0%200%2C1%201",
            "/api/search/solarcity/baseline/energy..?coordinates=abc",
        ] {
            let req = test::TestRequest::get().uri(uri).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{uri}");
            let body: ApiError = test::read_body_json(resp).await;
            assert!(!body.error.is_empty());
        }
    }

    #[actix_web::test]
    async fn slow_store_is_gateway_timeout() {
        let app = test::init_service(
            App::new()
                .app_data(search_state(Arc::new(SlowStore), Duration::from_millis(10)))
                .configure(configure_api),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/search/solarcity/baseline/energy..")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[actix_web::test]
    async fn store_failure_is_internal_error() {
        let app = test::init_service(
            App::new()
                .app_data(search_state(Arc::new(BrokenStore), Duration::from_secs(5)))
                .configure(configure_api),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/search/solarcity/baseline/energy..")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: ApiError = test::read_body_json(resp).await;
        assert_eq!(body, ApiError::new("Failed to run search"));
    }
}
