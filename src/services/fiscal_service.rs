//! Fiscal configuration per branch and the invoice number allocator.
//!
//! Numbers are handed out by a single `UPDATE ... RETURNING` that increments
//! the counter and yields the prior value, inside a transaction scoped to the
//! tenant namespace. Row locking serialises callers on the same branch and
//! document type; other branches and the other document type never contend.

use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use crate::database::context::TenantContext;
use crate::database::executor::TenantExecutor;
use crate::database::manager::DatabaseError;
use crate::database::models::{FiscalAllocation, FiscalConfig, NewFiscalConfig};
use crate::services::error::{with_timeout, TenancyError};
use crate::types::{DocumentType, FiscalEnvironment};

const CONFIG_COLUMNS: &str = "id, branch_id, environment, nfe_series, nfe_next_number, \
     nfce_series, nfce_next_number, contingency, created_at, updated_at";

const BRANCH_CONSTRAINT: &str = "fiscal_configs_branch_id_key";

/// Counter and series columns for a document type. Fixed strings only.
fn counter_columns(document_type: DocumentType) -> (&'static str, &'static str) {
    match document_type {
        DocumentType::Nfe => ("nfe_next_number", "nfe_series"),
        DocumentType::Nfce => ("nfce_next_number", "nfce_series"),
    }
}

#[derive(Clone)]
pub struct FiscalSequenceAllocator {
    executor: TenantExecutor,
    timeout: Duration,
}

impl FiscalSequenceAllocator {
    pub fn new(executor: TenantExecutor, timeout: Duration) -> Self {
        Self { executor, timeout }
    }

    /// Next invoice number for the branch and document type.
    pub async fn allocate_next(
        &self,
        ctx: &TenantContext,
        branch_id: Uuid,
        document_type: DocumentType,
    ) -> Result<i64, TenancyError> {
        Ok(self.allocate(ctx, branch_id, document_type).await?.number)
    }

    /// Allocate a number and report the series, environment and contingency
    /// flag it was issued under, read by the same statement.
    pub async fn allocate(
        &self,
        ctx: &TenantContext,
        branch_id: Uuid,
        document_type: DocumentType,
    ) -> Result<FiscalAllocation, TenancyError> {
        let (counter, series) = counter_columns(document_type);
        let sql = TenantExecutor::qualify(
            ctx,
            &format!(
                "UPDATE {{schema}}.fiscal_configs
                 SET {counter} = {counter} + 1, updated_at = now()
                 WHERE branch_id = $1
                 RETURNING {counter} - 1 AS number, {series} AS series, environment, contingency"
            ),
        );

        with_timeout("fiscal allocation", self.timeout, async {
            let mut tx = self.executor.begin(ctx).await?;
            let row: Option<(i64, i32, String, bool)> = sqlx::query_as(&sql)
                .bind(branch_id)
                .fetch_optional(&mut *tx)
                .await?;

            // Dropping the transaction without commit rolls it back.
            let Some((number, series, environment, contingency)) = row else {
                return Err(TenancyError::FiscalConfigNotFound {
                    branch_id,
                    document_type: Some(document_type),
                });
            };
            let environment = environment.parse::<FiscalEnvironment>().map_err(|e| {
                DatabaseError::Sqlx(sqlx::Error::ColumnDecode {
                    index: "environment".to_string(),
                    source: Box::new(e),
                })
            })?;

            tx.commit().await?;
            debug!(
                "Allocated {} number {} (series {}) for branch {} in {}",
                document_type,
                number,
                series,
                branch_id,
                ctx.namespace()
            );

            Ok(FiscalAllocation {
                branch_id,
                document_type,
                series,
                number,
                environment,
                contingency,
            })
        })
        .await
    }

    /// Create the single configuration row for a branch.
    pub async fn create_config(
        &self,
        ctx: &TenantContext,
        branch_id: Uuid,
        new: NewFiscalConfig,
    ) -> Result<FiscalConfig, TenancyError> {
        if new.nfe_first_number < 1 || new.nfce_first_number < 1 {
            return Err(TenancyError::InvalidInput("first numbers must be at least 1".to_string()));
        }
        if new.nfe_series < 0 || new.nfce_series < 0 {
            return Err(TenancyError::InvalidInput("series must not be negative".to_string()));
        }

        let config = with_timeout("fiscal configuration", self.timeout, async {
            let mut tx = self.executor.begin(ctx).await?;
            let branch: Option<Uuid> = sqlx::query_scalar(&TenantExecutor::qualify(
                ctx,
                "SELECT id FROM {schema}.branches WHERE id = $1",
            ))
            .bind(branch_id)
            .fetch_optional(&mut *tx)
            .await?;
            if branch.is_none() {
                return Err(TenancyError::BranchNotFound(branch_id));
            }

            let inserted = sqlx::query_as::<_, FiscalConfig>(&TenantExecutor::qualify(
                ctx,
                &format!(
                    "INSERT INTO {{schema}}.fiscal_configs
                         (branch_id, environment, nfe_series, nfe_next_number, nfce_series, nfce_next_number)
                     VALUES ($1, $2, $3, $4, $5, $6)
                     RETURNING {CONFIG_COLUMNS}"
                ),
            ))
            .bind(branch_id)
            .bind(new.environment.as_str())
            .bind(new.nfe_series)
            .bind(new.nfe_first_number)
            .bind(new.nfce_series)
            .bind(new.nfce_first_number)
            .fetch_one(&mut *tx)
            .await
            .map_err(DatabaseError::from);

            let config = match inserted {
                Ok(config) => config,
                Err(e) if e.is_unique_violation(Some(BRANCH_CONSTRAINT)) => {
                    return Err(TenancyError::FiscalConfigExists(branch_id));
                }
                Err(e) => return Err(e.into()),
            };
            tx.commit().await?;
            Ok(config)
        })
        .await?;

        info!("Created fiscal configuration for branch {} in {}", branch_id, ctx.namespace());
        Ok(config)
    }

    pub async fn get_config(&self, ctx: &TenantContext, branch_id: Uuid) -> Result<FiscalConfig, TenancyError> {
        with_timeout("fiscal configuration lookup", self.timeout, async {
            let mut conn = self.executor.acquire(ctx).await?;
            sqlx::query_as::<_, FiscalConfig>(&TenantExecutor::qualify(
                ctx,
                &format!("SELECT {CONFIG_COLUMNS} FROM {{schema}}.fiscal_configs WHERE branch_id = $1"),
            ))
            .bind(branch_id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or(TenancyError::FiscalConfigNotFound {
                branch_id,
                document_type: None,
            })
        })
        .await
    }

    /// Switch contingency mode. Counters are untouched.
    pub async fn set_contingency(
        &self,
        ctx: &TenantContext,
        branch_id: Uuid,
        contingency: bool,
    ) -> Result<FiscalConfig, TenancyError> {
        let config = self
            .update_flag(ctx, branch_id, "contingency = $2", contingency)
            .await?;
        info!("Branch {} contingency={}", branch_id, contingency);
        Ok(config)
    }

    /// Switch between production and homologation. Counters are untouched.
    pub async fn set_environment(
        &self,
        ctx: &TenantContext,
        branch_id: Uuid,
        environment: FiscalEnvironment,
    ) -> Result<FiscalConfig, TenancyError> {
        self.update_flag(ctx, branch_id, "environment = $2", environment.as_str())
            .await
    }

    async fn update_flag<T>(
        &self,
        ctx: &TenantContext,
        branch_id: Uuid,
        assignment: &'static str,
        value: T,
    ) -> Result<FiscalConfig, TenancyError>
    where
        T: for<'q> sqlx::Encode<'q, sqlx::Postgres> + sqlx::Type<sqlx::Postgres> + Send,
    {
        with_timeout("fiscal configuration update", self.timeout, async {
            let mut conn = self.executor.acquire(ctx).await?;
            sqlx::query_as::<_, FiscalConfig>(&TenantExecutor::qualify(
                ctx,
                &format!(
                    "UPDATE {{schema}}.fiscal_configs SET {assignment}, updated_at = now()
                     WHERE branch_id = $1
                     RETURNING {CONFIG_COLUMNS}"
                ),
            ))
            .bind(branch_id)
            .bind(value)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or(TenancyError::FiscalConfigNotFound {
                branch_id,
                document_type: None,
            })
        })
        .await
    }
}
