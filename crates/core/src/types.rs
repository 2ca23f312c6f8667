/// Server-assigned primary keys (users, sites, hold points, materials) are
/// PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// Client-generated entity ids (activities created offline) are opaque text.
pub type EntityId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
