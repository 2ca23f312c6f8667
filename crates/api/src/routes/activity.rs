use axum::routing::{get, post};
use axum::Router;

use pilelog_store::Store;

use crate::handlers::{activity, hold_point};
use crate::state::AppState;

/// Activity routes, nested under `/activities`.
///
/// ```text
/// POST   /                     create_activity
/// GET    /{id}                 get_activity
/// PATCH  /{id}                 update_activity
/// DELETE /{id}                 delete_activity
/// POST   /{id}/submit          submit_activity
/// POST   /{id}/approve         approve_activity
/// POST   /{id}/reject          reject_activity
/// GET    /{id}/hold-points     list_hold_points
/// POST   /{id}/hold-points     create_hold_points
/// ```
pub fn router<S: Store>() -> Router<AppState<S>> {
    Router::new()
        .route("/", post(activity::create_activity::<S>))
        .route(
            "/{id}",
            get(activity::get_activity::<S>)
                .patch(activity::update_activity::<S>)
                .delete(activity::delete_activity::<S>),
        )
        .route("/{id}/submit", post(activity::submit_activity::<S>))
        .route("/{id}/approve", post(activity::approve_activity::<S>))
        .route("/{id}/reject", post(activity::reject_activity::<S>))
        .route(
            "/{id}/hold-points",
            get(hold_point::list_hold_points::<S>).post(hold_point::create_hold_points::<S>),
        )
}
