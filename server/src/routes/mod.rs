//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! This module binds the websocket relay endpoint and the liveness probe
//! under a single Axum router. When a client bundle directory is configured
//! it is served as static files at `/`.

pub mod ws;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Relay routes plus optional static client serving.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let public_dir = state.config.public_dir.clone();
    let router = Router::new()
        .route("/ws", get(ws::handle_ws))
        .route("/healthz", get(healthz))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    match public_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir).append_index_html_on_directories(true)),
        None => router,
    }
}

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    rooms: usize,
    users: usize,
}

async fn healthz(State(state): State<AppState>) -> Json<Health> {
    let stats = state.registry.stats().await;
    Json(Health { status: "ok", rooms: stats.rooms, users: stats.users })
}
