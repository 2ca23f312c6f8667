//! Handlers for hold-point inspection sign-offs.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use pilelog_core::hold_point::SignOff;
use pilelog_core::types::DbId;
use pilelog_store::Store;

use crate::error::AppResult;
use crate::handlers::activity::RejectRequest;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/activities/{id}/hold-points
pub async fn list_hold_points<S: Store>(
    _auth: AuthUser,
    State(state): State<AppState<S>>,
    Path(activity_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let hold_points = state.engine.hold_points.list(&activity_id).await?;
    Ok(Json(DataResponse { data: hold_points }))
}

/// POST /api/v1/activities/{id}/hold-points
///
/// Idempotent: 201 when the three stages were created, 200 when they
/// already existed.
pub async fn create_hold_points<S: Store>(
    auth: AuthUser,
    State(state): State<AppState<S>>,
    Path(activity_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let (hold_points, created) = state
        .engine
        .hold_points
        .create_for_activity(&auth.actor(), &activity_id)
        .await?;
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(DataResponse { data: hold_points })))
}

/// POST /api/v1/hold-points/{id}/sign
pub async fn sign_hold_point<S: Store>(
    auth: AuthUser,
    State(state): State<AppState<S>>,
    Path(id): Path<DbId>,
    Json(input): Json<SignOff>,
) -> AppResult<impl IntoResponse> {
    let hold_point = state.engine.hold_points.sign(&auth.actor(), id, input).await?;
    Ok(Json(DataResponse { data: hold_point }))
}

/// POST /api/v1/hold-points/{id}/reject
pub async fn reject_hold_point<S: Store>(
    auth: AuthUser,
    State(state): State<AppState<S>>,
    Path(id): Path<DbId>,
    Json(input): Json<RejectRequest>,
) -> AppResult<impl IntoResponse> {
    let hold_point = state
        .engine
        .hold_points
        .reject(&auth.actor(), id, &input.notes)
        .await?;
    Ok(Json(DataResponse { data: hold_point }))
}
