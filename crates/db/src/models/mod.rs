//! Row structs and DTOs.
//!
//! Each submodule contains a `FromRow` struct matching the database row and,
//! where the engine consumes it, a conversion into the matching
//! `pilelog_store` record.

pub mod activity;
pub mod change_log;
pub mod hold_point;
pub mod inventory;
pub mod notification;
pub mod user;

use pilelog_core::error::CoreError;
use pilelog_store::StoreError;

/// A stored value failed to parse back into its domain type.
pub(crate) fn corrupt(table: &str, err: CoreError) -> StoreError {
    StoreError::Backend(format!("corrupt {table} row: {err}"))
}
