use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// Row of `<namespace>.schema_migrations`; written once, never updated.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MigrationRecord {
    pub version: String,
    pub description: String,
    pub applied_at: DateTime<Utc>,
}
