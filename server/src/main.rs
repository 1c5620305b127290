mod config;
mod error;
mod routes;
mod services;
mod state;

use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env before the filter reads RUST_LOG.
    let dotenv = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Ok(path) = dotenv {
        tracing::info!(path = %path.display(), "loaded .env");
    }

    let config = config::RelayConfig::from_env()?;
    let port = config.port;
    if let Some(dir) = &config.public_dir {
        tracing::info!(dir = %dir.display(), "serving static client");
    }
    tracing::info!(
        oplog_max = config.limits.oplog_max_entries,
        redo_max = config.limits.redo_max_depth,
        queue = config.client_queue_capacity,
        "relay limits"
    );

    let state = state::AppState::new(config);
    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;

    tracing::info!(%port, "sketchroom listening");
    axum::serve(listener, app).await?;
    Ok(())
}
