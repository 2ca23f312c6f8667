//! Shared response envelope for resource endpoints.
//!
//! Activity and hold-point responses use a `{ "data": ... }` envelope. The
//! sync endpoints return their protocol documents unwrapped.

use serde::Serialize;

/// Standard `{ "data": T }` response envelope.
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}
