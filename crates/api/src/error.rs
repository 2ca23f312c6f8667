//! HTTP error mapping.
//!
//! Every failure leaves the server as `{"error": <message>, "code": <CODE>}`.
//! Internal details are logged here and replaced with a generic message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use pilelog_core::error::CoreError;
use pilelog_store::StoreError;

const INTERNAL_MESSAGE: &str = "An internal error occurred";

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Malformed request outside the engine's validation, e.g. a bad query
    /// parameter.
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Core(err.into())
    }
}

fn classify(err: &CoreError) -> (StatusCode, &'static str) {
    match err {
        CoreError::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        CoreError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
        CoreError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
        CoreError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
        CoreError::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
        CoreError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::Core(CoreError::Internal(detail)) | AppError::InternalError(detail) => {
                tracing::error!(error = %detail, "Request failed with an internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    INTERNAL_MESSAGE.to_string(),
                )
            }
            AppError::Core(err) => {
                let (status, code) = classify(&err);
                let message = match err {
                    CoreError::NotFound { entity, id } => format!("{entity} with id {id} not found"),
                    CoreError::Validation(msg)
                    | CoreError::Conflict(msg)
                    | CoreError::Unauthorized(msg)
                    | CoreError::Forbidden(msg)
                    | CoreError::Internal(msg) => msg,
                };
                (status, code, message)
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
        };

        (status, Json(json!({"error": message, "code": code}))).into_response()
    }
}
