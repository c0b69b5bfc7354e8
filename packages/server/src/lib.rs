#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the study explorer.
//!
//! Serves the scenario search endpoint the map client calls whenever the
//! study, scenario, metric, or drawn area changes, the study metadata the
//! explore page initialises from, and the static front-end. Study
//! metadata always comes from `PostGIS`; searches go to the backend chosen
//! by `SEARCH_BACKEND`: `PostGIS` itself, or an in-memory R-tree loaded
//! once from a `DuckDB` snapshot.

mod handlers;
pub mod interactive;

use std::path::PathBuf;
use std::sync::Arc;

use actix_cors::Cors;
use actix_files::Files;
use actix_web::{App, HttpServer, middleware, web};
use strum_macros::{AsRefStr, Display, EnumString};
use study_explorer_database::{DbError, PostgisStore, db, run_migrations};
use study_explorer_search::{GeometryStore, SearchConfig};
use study_explorer_spatial::{SnapshotError, SpatialIndex};
use switchy_database::Database;
use thiserror::Error;

/// Default location of the search snapshot.
pub const DEFAULT_SNAPSHOT_PATH: &str = "data/generated/search.duckdb";

/// Errors that can occur while starting the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Binding or running the HTTP server failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Connecting to the database failed.
    #[error("Failed to connect to database: {message}")]
    Connect {
        /// Connection error message.
        message: String,
    },

    /// Running migrations failed.
    #[error(transparent)]
    Database(#[from] DbError),

    /// Loading the search snapshot failed.
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    /// An environment variable held an unusable value.
    #[error("Invalid configuration: {message}")]
    Config {
        /// Description of what went wrong.
        message: String,
    },
}

/// Where search candidates come from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum SearchBackend {
    /// Spatial SQL against the `PostGIS` database.
    #[default]
    Postgis,
    /// In-memory R-tree loaded from a `DuckDB` snapshot.
    Snapshot,
}

impl SearchBackend {
    /// Reads `SEARCH_BACKEND`, defaulting to [`SearchBackend::Postgis`].
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Config`] if the variable names an unknown
    /// backend.
    pub fn from_env() -> Result<Self, ServerError> {
        std::env::var("SEARCH_BACKEND").map_or(Ok(Self::default()), |value| {
            value
                .trim()
                .to_lowercase()
                .parse()
                .map_err(|_| ServerError::Config {
                    message: format!("Unknown SEARCH_BACKEND '{value}' (expected postgis or snapshot)"),
                })
        })
    }
}

/// Shared application state for metadata endpoints.
pub struct AppState {
    /// `PostGIS` database connection.
    pub db: Arc<dyn Database>,
}

/// Shared state for the search endpoint.
pub struct SearchState {
    /// Candidate source.
    pub store: Arc<dyn GeometryStore>,
    /// Engine settings.
    pub config: SearchConfig,
}

/// Registers the `/api` routes.
pub fn configure_api(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .route("/studies", web::get().to(handlers::studies))
            .route("/studies/{slug}", web::get().to(handlers::study))
            .route(
                "/search/{study_slug}/{scenario_slug}/{metrics_field}",
                web::get().to(handlers::search),
            ),
    );
}

fn build_search_store(
    backend: SearchBackend,
    db: &Arc<dyn Database>,
) -> Result<Arc<dyn GeometryStore>, ServerError> {
    match backend {
        SearchBackend::Postgis => Ok(Arc::new(PostgisStore::new(Arc::clone(db)))),
        SearchBackend::Snapshot => {
            let path = std::env::var("SNAPSHOT_PATH")
                .map_or_else(|_| PathBuf::from(DEFAULT_SNAPSHOT_PATH), PathBuf::from);
            log::info!("Loading search snapshot from {}...", path.display());
            let index = SpatialIndex::open(&path)?;
            for study in index.studies() {
                log::info!(
                    "Snapshot study {study}: {} geometries",
                    index.geometry_count(study)
                );
            }
            Ok(Arc::new(index))
        }
    }
}

/// Starts the study explorer API server.
///
/// Connects to the `PostGIS` database, runs migrations, builds the search
/// store for the configured backend, and starts the Actix-Web HTTP
/// server. The caller provides the async runtime (e.g. via
/// `#[actix_web::main]`).
///
/// # Errors
///
/// Returns [`ServerError`] if the database connection, migrations, or
/// snapshot load fail, if the configuration is invalid, or if the HTTP
/// server fails to bind or encounters a runtime error.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> Result<(), ServerError> {
    let config = SearchConfig::from_env();
    let backend = SearchBackend::from_env()?;

    log::info!("Connecting to database...");
    let db_conn = db::connect_from_env(config.timeout)
        .await
        .map_err(|e| ServerError::Connect {
            message: e.to_string(),
        })?;

    log::info!("Running migrations...");
    run_migrations(db_conn.as_ref()).await?;

    let db: Arc<dyn Database> = Arc::from(db_conn);

    log::info!(
        "Search backend: {backend} (timeout {}s)",
        config.timeout.as_secs()
    );
    let store = build_search_store(backend, &db)?;

    let state = web::Data::new(AppState { db });
    let search_state = web::Data::new(SearchState { store, config });

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .app_data(search_state.clone())
            .configure(configure_api)
            // Serve frontend static files (production)
            .service(Files::new("/", "app/dist").index_file("index.html"))
    })
    .bind((bind_addr, port))?
    .run()
    .await?;

    Ok(())
}
