use axum::routing::{get, post};
use axum::Router;

use pilelog_store::Store;

use crate::handlers::sync;
use crate::state::AppState;

/// Sync protocol routes, nested under `/sync`.
///
/// ```text
/// POST   /push      push
/// GET    /pull      pull
/// GET    /status    status
/// ```
pub fn router<S: Store>() -> Router<AppState<S>> {
    Router::new()
        .route("/push", post(sync::push::<S>))
        .route("/pull", get(sync::pull::<S>))
        .route("/status", get(sync::status::<S>))
}
