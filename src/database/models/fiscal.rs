use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Row};
use uuid::Uuid;

use super::decode_text;
use crate::types::{DocumentType, FiscalEnvironment};

/// Per-branch fiscal configuration. The `*_next_number` counters only move
/// through the allocator.
#[derive(Debug, Clone, Serialize)]
pub struct FiscalConfig {
    pub id: Uuid,
    pub branch_id: Uuid,
    pub environment: FiscalEnvironment,
    pub nfe_series: i32,
    pub nfe_next_number: i64,
    pub nfce_series: i32,
    pub nfce_next_number: i64,
    pub contingency: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for FiscalConfig {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(FiscalConfig {
            id: row.try_get("id")?,
            branch_id: row.try_get("branch_id")?,
            environment: decode_text(row, "environment")?,
            nfe_series: row.try_get("nfe_series")?,
            nfe_next_number: row.try_get("nfe_next_number")?,
            nfce_series: row.try_get("nfce_series")?,
            nfce_next_number: row.try_get("nfce_next_number")?,
            contingency: row.try_get("contingency")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewFiscalConfig {
    #[serde(default = "default_environment")]
    pub environment: FiscalEnvironment,
    #[serde(default = "default_series")]
    pub nfe_series: i32,
    #[serde(default = "default_first_number")]
    pub nfe_first_number: i64,
    #[serde(default = "default_series")]
    pub nfce_series: i32,
    #[serde(default = "default_first_number")]
    pub nfce_first_number: i64,
}

impl Default for NewFiscalConfig {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            nfe_series: default_series(),
            nfe_first_number: default_first_number(),
            nfce_series: default_series(),
            nfce_first_number: default_first_number(),
        }
    }
}

fn default_environment() -> FiscalEnvironment {
    FiscalEnvironment::Homologation
}

fn default_series() -> i32 {
    1
}

fn default_first_number() -> i64 {
    1
}

/// One issued number plus the configuration it was issued under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FiscalAllocation {
    pub branch_id: Uuid,
    pub document_type: DocumentType,
    pub series: i32,
    pub number: i64,
    pub environment: FiscalEnvironment,
    pub contingency: bool,
}
