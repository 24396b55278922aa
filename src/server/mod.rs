//! hilltop-server: HTTP API for the campus companion.
//!
//! Serves a REST API for friend location sharing, tracking codes, SOS
//! dispatch, and commute planning, persisting state in SQLite.

pub mod config;
pub mod handlers;
pub mod router;
pub mod state;
pub mod utils;

use std::sync::Arc;

use clap::Parser;

use crate::events::LogSink;
use crate::storage::Storage;

use config::{Cli, Config};
use state::{AppState, SharedState};

/// Entry point: parse CLI, open storage, start server.
pub async fn run() {
    let cli = Cli::parse();
    let config = Config::from_cli_and_env(cli);

    crate::logging::init();

    crate::hlog!("hilltop-server starting");
    crate::hlog!("  data directory: {}", config.data_dir.display());

    if let Err(e) = std::fs::create_dir_all(&config.data_dir) {
        eprintln!(
            "failed to create data directory {}: {}",
            config.data_dir.display(),
            e
        );
        std::process::exit(1);
    }

    let db_path = config.data_dir.join("hilltop.db");
    let storage = Storage::open(&db_path).expect("failed to open database");
    crate::hlog!("  database: {}", db_path.display());

    let state: SharedState = Arc::new(tokio::sync::Mutex::new(AppState {
        storage,
        events: Arc::new(LogSink),
    }));

    let app = router::build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("failed to bind");
    crate::hlog!("hilltop-server listening on http://{}", config.bind_addr);

    axum::serve(listener, app).await.expect("server error");
}
