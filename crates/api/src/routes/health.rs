use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use pilelog_store::Store;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    /// `ok`, or `degraded` when the store does not answer.
    pub status: &'static str,
    pub version: &'static str,
    pub db_healthy: bool,
}

/// GET /health
async fn health<S: Store>(State(state): State<AppState<S>>) -> Json<HealthResponse> {
    let db_healthy = state
        .store
        .ping()
        .await
        .inspect_err(|e| tracing::warn!(error = %e, "Store ping failed"))
        .is_ok();

    Json(HealthResponse {
        status: if db_healthy { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        db_healthy,
    })
}

pub fn router<S: Store>() -> Router<AppState<S>> {
    Router::new().route("/health", get(health::<S>))
}
