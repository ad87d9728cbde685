pub mod branch;
pub mod fiscal;
pub mod migration;
pub mod tenant;
pub mod user;

pub use branch::{Branch, NewBranch};
pub use fiscal::{FiscalAllocation, FiscalConfig, NewFiscalConfig};
pub use migration::MigrationRecord;
pub use tenant::{NewTenant, Tenant, TenantUpdate};
pub use user::{NewAdmin, User};

use sqlx::postgres::PgRow;
use sqlx::Row;
use std::str::FromStr;

/// Decode a TEXT column into one of the string-backed enums in `crate::types`.
pub(crate) fn decode_text<T>(row: &PgRow, column: &str) -> Result<T, sqlx::Error>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.try_get(column)?;
    raw.parse::<T>().map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}
