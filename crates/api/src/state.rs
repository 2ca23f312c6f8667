use std::sync::Arc;

use pilelog_engine::Engine;
use pilelog_store::Store;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState<S>>`.
///
/// Cheaply cloneable: everything sits behind an `Arc`.
pub struct AppState<S: Store> {
    /// Backing store, used directly only by the health check.
    pub store: Arc<S>,
    /// Sync, workflow, and hold-point services.
    pub engine: Arc<Engine<S>>,
    pub config: Arc<ServerConfig>,
}

// Manual impl: a derive would require `S: Clone`.
impl<S: Store> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            engine: Arc::clone(&self.engine),
            config: Arc::clone(&self.config),
        }
    }
}
