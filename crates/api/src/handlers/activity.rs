//! Handlers for interactive activity operations and approval transitions.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::Value;

use pilelog_core::patch::CreateActivity;
use pilelog_engine::EditActivity;
use pilelog_store::Store;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for the reject endpoints.
#[derive(Debug, Deserialize)]
pub struct RejectRequest {
    pub notes: String,
}

/// POST /api/v1/activities
///
/// Returns 201 for a new activity, 200 when `clientChangeId` matched one
/// created earlier.
pub async fn create_activity<S: Store>(
    auth: AuthUser,
    State(state): State<AppState<S>>,
    Json(body): Json<Value>,
) -> AppResult<impl IntoResponse> {
    let input = CreateActivity::from_payload(&body)?;
    let outcome = state.engine.activities.create(&auth.actor(), input).await?;
    let status = if outcome.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(DataResponse { data: outcome.activity })))
}

/// GET /api/v1/activities/{id}
pub async fn get_activity<S: Store>(
    _auth: AuthUser,
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let activity = state.engine.activities.get(&id).await?;
    Ok(Json(DataResponse { data: activity }))
}

/// PATCH /api/v1/activities/{id}
///
/// Creator-only edit. Accepts an optional `expectedVersion`.
pub async fn update_activity<S: Store>(
    auth: AuthUser,
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> AppResult<impl IntoResponse> {
    let edit = EditActivity::from_payload(&body)?;
    let activity = state.engine.activities.edit(&auth.actor(), &id, edit).await?;
    Ok(Json(DataResponse { data: activity }))
}

/// DELETE /api/v1/activities/{id}
pub async fn delete_activity<S: Store>(
    auth: AuthUser,
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    state.engine.activities.delete(&auth.actor(), &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/activities/{id}/submit
pub async fn submit_activity<S: Store>(
    auth: AuthUser,
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let activity = state.engine.activities.submit(&auth.actor(), &id).await?;
    Ok(Json(DataResponse { data: activity }))
}

/// POST /api/v1/activities/{id}/approve
pub async fn approve_activity<S: Store>(
    auth: AuthUser,
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let activity = state.engine.activities.approve(&auth.actor(), &id).await?;
    Ok(Json(DataResponse { data: activity }))
}

/// POST /api/v1/activities/{id}/reject
pub async fn reject_activity<S: Store>(
    auth: AuthUser,
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
    Json(input): Json<RejectRequest>,
) -> AppResult<impl IntoResponse> {
    let activity = state
        .engine
        .activities
        .reject(&auth.actor(), &id, &input.notes)
        .await?;
    Ok(Json(DataResponse { data: activity }))
}
