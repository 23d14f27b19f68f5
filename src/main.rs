use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use routewatch::api::{self, AppState};
use routewatch::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 1. Load configuration
    let config = Config::from_env()?;
    info!(
        threshold_m = config.default_threshold_m,
        penalty_s = config.default_penalty_s,
        proximity = ?config.proximity,
        parallel = config.parallel,
        "configuration loaded"
    );

    // 2. Setup Router
    let shared_state = Arc::new(AppState::from_config(&config));
    let app = api::router(shared_state);

    // 3. Serve
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %config.bind_addr, "RouteWatch scoring API listening");
    axum::serve(listener, app).await?;

    Ok(())
}
