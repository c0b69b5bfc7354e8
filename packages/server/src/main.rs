#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Study explorer API server binary.
//!
//! Configuration comes from the environment: `DATABASE_URL`, `BIND_ADDR`,
//! `PORT`, `SEARCH_BACKEND`, `SNAPSHOT_PATH`, and `SEARCH_TIMEOUT_SECS`.

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    study_explorer_server::run_server().await?;

    Ok(())
}
