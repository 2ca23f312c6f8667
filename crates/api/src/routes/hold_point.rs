use axum::routing::post;
use axum::Router;

use pilelog_store::Store;

use crate::handlers::hold_point;
use crate::state::AppState;

/// Hold-point decision routes, nested under `/hold-points`.
///
/// ```text
/// POST   /{id}/sign      sign_hold_point
/// POST   /{id}/reject    reject_hold_point
/// ```
pub fn router<S: Store>() -> Router<AppState<S>> {
    Router::new()
        .route("/{id}/sign", post(hold_point::sign_hold_point::<S>))
        .route("/{id}/reject", post(hold_point::reject_hold_point::<S>))
}
