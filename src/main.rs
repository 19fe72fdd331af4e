//! visgate orchestrator — entry point.
//!
//! Reads configuration from `VISGATE_*` / `RUNPOD_*` environment variables
//! and starts the axum-based HTTP service. See [`visgate::config::Config`]
//! for the full variable list.

use tracing_subscriber::EnvFilter;
use visgate::{server, AppState, Config};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("visgate=info".parse().unwrap()))
        .json()
        .init();

    let config = Config::from_env();
    tracing::info!(port = config.port, "visgate configuration loaded");

    let state = AppState::new(config);

    if let Err(e) = server::serve(state).await {
        tracing::error!(error = %e, "visgate server error");
        std::process::exit(1);
    }
}
