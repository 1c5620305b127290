//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! It holds the room registry and the relay configuration. All room state
//! lives in memory for the lifetime of the process; nothing is persisted.

use std::sync::Arc;

use crate::config::RelayConfig;
use crate::services::registry::RoomRegistry;

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; all inner fields are Arc-wrapped.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<RoomRegistry>,
    pub config: Arc<RelayConfig>,
}

impl AppState {
    #[must_use]
    pub fn new(config: RelayConfig) -> Self {
        let registry = Arc::new(RoomRegistry::new(config.limits));
        Self { registry, config: Arc::new(config) }
    }
}

#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
