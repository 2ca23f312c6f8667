pub mod activity;
pub mod health;
pub mod hold_point;
pub mod sync;

use axum::Router;

use pilelog_store::Store;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /sync/push                         push offline changes
/// /sync/pull                         changes since a version
/// /sync/status                       current version, pending count
///
/// /activities                        create
/// /activities/{id}                   get, patch, delete
/// /activities/{id}/submit            submit
/// /activities/{id}/approve           approve
/// /activities/{id}/reject            reject
/// /activities/{id}/hold-points       list, create-3
///
/// /hold-points/{id}/sign             sign off
/// /hold-points/{id}/reject           reject
/// ```
pub fn api_routes<S: Store>() -> Router<AppState<S>> {
    Router::new()
        .nest("/sync", sync::router())
        .nest("/activities", activity::router())
        .nest("/hold-points", hold_point::router())
}
