//! Interactive mode for the server.
//!
//! Prompts for the bind address, port, and search backend before starting
//! the server.

use dialoguer::{Confirm, Input, Select};

use crate::{SearchBackend, ServerError};

/// Runs the server in interactive mode, prompting for configuration.
///
/// Asks for a bind address, port, and search backend, sets the
/// corresponding environment variables (`BIND_ADDR`, `PORT`,
/// `SEARCH_BACKEND`, `SNAPSHOT_PATH`), and delegates to
/// [`super::run_server`].
///
/// # Errors
///
/// Returns [`ServerError`] if the underlying server fails to start.
#[allow(clippy::future_not_send)]
pub async fn run() -> Result<(), ServerError> {
    println!("Study Explorer Server");
    println!();

    let bind_addr: String = Input::new()
        .with_prompt("Bind address")
        .default("127.0.0.1".to_string())
        .interact_text()
        .unwrap_or_else(|_| "127.0.0.1".to_string());

    let port_str: String = Input::new()
        .with_prompt("Port")
        .default("8080".to_string())
        .interact_text()
        .unwrap_or_else(|_| "8080".to_string());

    let backends = [SearchBackend::Postgis, SearchBackend::Snapshot];
    let labels = ["PostGIS (spatial SQL)", "Snapshot (in-memory R-tree)"];
    let backend = Select::new()
        .with_prompt("Search backend")
        .items(&labels)
        .default(0)
        .interact()
        .map_or(SearchBackend::Postgis, |idx| backends[idx]);

    let snapshot_path = if backend == SearchBackend::Snapshot {
        Some(
            Input::<String>::new()
                .with_prompt("Snapshot path")
                .default(super::DEFAULT_SNAPSHOT_PATH.to_string())
                .interact_text()
                .unwrap_or_else(|_| super::DEFAULT_SNAPSHOT_PATH.to_string()),
        )
    } else {
        None
    };

    // SAFETY: We are single-threaded at this point (before server starts) and
    // these variables are only read once during server initialisation.
    unsafe {
        std::env::set_var("BIND_ADDR", &bind_addr);
        std::env::set_var("PORT", &port_str);
        std::env::set_var("SEARCH_BACKEND", backend.as_ref());
        if let Some(path) = &snapshot_path {
            std::env::set_var("SNAPSHOT_PATH", path);
        }
    }

    if !Confirm::new()
        .with_prompt(format!(
            "Start server on {bind_addr}:{port_str} with the {backend} backend?"
        ))
        .default(true)
        .interact()
        .unwrap_or(true)
    {
        println!("Cancelled.");
        return Ok(());
    }

    super::run_server().await
}
