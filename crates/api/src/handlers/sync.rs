//! Handlers for the device sync protocol.
//!
//! Responses are the protocol documents themselves, not `{ "data": ... }`
//! envelopes, so devices can parse them without unwrapping.

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use pilelog_engine::{PullResult, PushResult, SyncStatus};
use pilelog_store::Store;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

/// Request body for `POST /sync/push`. Elements are decoded one at a time
/// by the engine so a bad change does not reject the whole batch.
#[derive(Debug, Deserialize)]
pub struct PushRequest {
    pub changes: Vec<serde_json::Value>,
}

/// Query parameters shared by pull and status.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SinceParams {
    pub since_version: Option<i64>,
}

impl SinceParams {
    fn since(&self) -> AppResult<i64> {
        match self.since_version {
            Some(v) if v < 0 => Err(AppError::BadRequest(
                "sinceVersion must not be negative".into(),
            )),
            Some(v) => Ok(v),
            None => Ok(0),
        }
    }
}

/// POST /api/v1/sync/push
///
/// Apply a batch of offline changes. Per-change failures are reported in
/// `errors`; only an oversized batch or a missing capability fails the call.
pub async fn push<S: Store>(
    auth: AuthUser,
    State(state): State<AppState<S>>,
    Json(input): Json<PushRequest>,
) -> AppResult<Json<PushResult>> {
    let result = state.engine.sync.push_documents(&auth.actor(), input.changes).await?;
    Ok(Json(result))
}

/// GET /api/v1/sync/pull?sinceVersion=N
pub async fn pull<S: Store>(
    auth: AuthUser,
    State(state): State<AppState<S>>,
    Query(params): Query<SinceParams>,
) -> AppResult<Json<PullResult>> {
    let since = params.since()?;
    let result = state.engine.sync.pull(&auth.actor(), since).await?;
    Ok(Json(result))
}

/// GET /api/v1/sync/status?sinceVersion=N
///
/// `pendingForUser` counts what a pull from `sinceVersion` (default 0)
/// would return.
pub async fn status<S: Store>(
    auth: AuthUser,
    State(state): State<AppState<S>>,
    Query(params): Query<SinceParams>,
) -> AppResult<Json<SyncStatus>> {
    let since = params.since()?;
    let result = state.engine.sync.status(&auth.actor(), since).await?;
    Ok(Json(result))
}
