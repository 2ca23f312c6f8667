use pilelog_core::error::CoreError;

/// All errors that can be returned by a [`Store`](crate::Store) implementation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No live record with the given id.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Optimistic concurrency conflict: the stored version moved on.
    #[error("concurrent update on {entity} {id}: expected version {expected}")]
    VersionConflict {
        entity: &'static str,
        id: String,
        expected: i64,
    },

    /// A unique key already exists.
    #[error("duplicate {0}")]
    Duplicate(String),

    /// A backend-specific failure (connection, serialization, ...).
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => CoreError::NotFound { entity, id },
            e @ StoreError::VersionConflict { .. } => CoreError::Conflict(e.to_string()),
            e @ StoreError::Duplicate(_) => CoreError::Conflict(e.to_string()),
            StoreError::Backend(msg) => CoreError::Internal(msg),
        }
    }
}
