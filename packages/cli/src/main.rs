#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command line for the study explorer.
//!
//! ```text
//! study_explorer search --study solarcity --scenario baseline --metric energy..
//! study_explorer search ... --aoi-file aoi.geojson --snapshot data/generated/search.duckdb
//! study_explorer encode-aoi --aoi-file aoi.geojson
//! study_explorer serve
//! ```
//!
//! Running with no subcommand starts the server in interactive mode.

mod report;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use study_explorer_database::{PostgisStore, db};
use study_explorer_search::{GeometryStore, SearchConfig, aoi, parse_request, search};
use study_explorer_spatial::{SpatialIndex, parse_geojson_to_multipolygon};
use switchy_database::Database;

#[derive(Parser)]
#[command(
    name = "study_explorer",
    about = "Query scenario metrics and run the study explorer server"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate a metric over a study's geometries
    Search {
        /// Study slug
        #[arg(long)]
        study: String,
        /// Scenario slug, or `baseline`
        #[arg(long, default_value = "baseline")]
        scenario: String,
        /// Metric path as `category.usage.source` (usage and source may be empty)
        #[arg(long)]
        metric: String,
        /// Encoded AOI as sent by the map client
        #[arg(long, conflicts_with = "aoi_file")]
        coordinates: Option<String>,
        /// `GeoJSON` file holding a single polygon to use as the AOI
        #[arg(long)]
        aoi_file: Option<PathBuf>,
        /// Search a `DuckDB` snapshot instead of `PostGIS`
        #[arg(long)]
        snapshot: Option<PathBuf>,
        /// Print the raw JSON response
        #[arg(long)]
        json: bool,
    },
    /// Print the encoded `coordinates` parameter for a `GeoJSON` polygon
    EncodeAoi {
        /// `GeoJSON` file holding a single polygon
        #[arg(long)]
        aoi_file: PathBuf,
    },
    /// Start the API server
    Serve,
}

/// Reads a `GeoJSON` polygon file and returns its wire encoding.
fn encoded_aoi_from_file(path: &Path) -> Result<String, Box<dyn std::error::Error>> {
    let contents = std::fs::read_to_string(path)?;
    let multi = parse_geojson_to_multipolygon(&contents)
        .ok_or_else(|| format!("{} is not a GeoJSON Polygon", path.display()))?;

    let [polygon] = multi.0.as_slice() else {
        return Err(format!(
            "{} holds {} polygons, expected exactly one",
            path.display(),
            multi.0.len()
        )
        .into());
    };

    Ok(aoi::encode_aoi(&aoi::from_polygon(polygon)?))
}

async fn open_store(
    snapshot: Option<&Path>,
    config: &SearchConfig,
) -> Result<Arc<dyn GeometryStore>, Box<dyn std::error::Error>> {
    if let Some(path) = snapshot {
        log::info!("Loading snapshot {}", path.display());
        return Ok(Arc::new(SpatialIndex::open(path)?));
    }

    let db: Arc<dyn Database> = Arc::from(db::connect_from_env(config.timeout).await?);
    Ok(Arc::new(PostgisStore::new(db)))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init_custom_env("RUST_LOG");
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        // The server uses actix-web's runtime, so we need to run it
        // in a blocking task to avoid nesting tokio runtimes.
        tokio::task::spawn_blocking(|| {
            actix_web::rt::System::new().block_on(study_explorer_server::interactive::run())
        })
        .await??;
        return Ok(());
    };

    match command {
        Commands::Search {
            study,
            scenario,
            metric,
            coordinates,
            aoi_file,
            snapshot,
            json,
        } => {
            let coordinates = match aoi_file {
                Some(path) => Some(encoded_aoi_from_file(&path)?),
                None => coordinates,
            };

            let request = parse_request(&study, &scenario, &metric, coordinates.as_deref())?;
            let config = SearchConfig::from_env();
            let store = open_store(snapshot.as_deref(), &config).await?;

            let summary = search(store.as_ref(), &request, &config).await?;

            if json {
                let response = study_explorer_server_models::SearchResponse::from(summary);
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                print!("{}", report::format_summary(&request, summary.as_ref()));
            }
        }
        Commands::EncodeAoi { aoi_file } => {
            println!("{}", encoded_aoi_from_file(&aoi_file)?);
        }
        Commands::Serve => {
            tokio::task::spawn_blocking(|| {
                actix_web::rt::System::new().block_on(study_explorer_server::run_server())
            })
            .await??;
        }
    }

    Ok(())
}
