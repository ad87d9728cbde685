use std::time::Duration;
use tracing::info;
use uuid::Uuid;

use crate::database::context::TenantContext;
use crate::database::executor::TenantExecutor;
use crate::database::models::{Branch, NewBranch};
use crate::services::error::{with_timeout, TenancyError};
use crate::services::registry::TenantRegistry;

const BRANCH_COLUMNS: &str = "id, name, document, is_main, is_active, created_at, updated_at";

#[derive(Clone)]
pub struct BranchService {
    executor: TenantExecutor,
    registry: TenantRegistry,
    timeout: Duration,
}

impl BranchService {
    pub fn new(executor: TenantExecutor, registry: TenantRegistry, timeout: Duration) -> Self {
        Self {
            executor,
            registry,
            timeout,
        }
    }

    /// Create a branch if the tenant is below its quota. The first branch of
    /// a tenant is flagged main.
    pub async fn create(&self, ctx: &TenantContext, new: NewBranch) -> Result<Branch, TenancyError> {
        let name = new.name.trim().to_string();
        if name.is_empty() {
            return Err(TenancyError::InvalidInput("branch name is required".to_string()));
        }

        with_timeout("branch creation", self.timeout, async {
            let tenant = self
                .registry
                .get(ctx.tenant_id())
                .await?
                .ok_or_else(|| TenancyError::TenantNotFound(ctx.tenant_id().to_string()))?;

            let mut tx = self.executor.begin(ctx).await?;

            // Concurrent creations must see each other's rows before counting.
            sqlx::query(&TenantExecutor::qualify(
                ctx,
                "LOCK TABLE {schema}.branches IN SHARE ROW EXCLUSIVE MODE",
            ))
            .execute(&mut *tx)
            .await?;

            let (count, has_main): (i64, bool) = sqlx::query_as(&TenantExecutor::qualify(
                ctx,
                "SELECT COUNT(*), COALESCE(bool_or(is_main), false) FROM {schema}.branches",
            ))
            .fetch_one(&mut *tx)
            .await?;

            if count >= i64::from(tenant.max_branches) {
                return Err(TenancyError::QuotaExceeded {
                    max_branches: tenant.max_branches,
                });
            }

            let branch = sqlx::query_as::<_, Branch>(&TenantExecutor::qualify(
                ctx,
                &format!(
                    "INSERT INTO {{schema}}.branches (name, document, is_main)
                     VALUES ($1, $2, $3)
                     RETURNING {BRANCH_COLUMNS}"
                ),
            ))
            .bind(&name)
            .bind(new.document.as_deref().map(str::trim))
            .bind(!has_main)
            .fetch_one(&mut *tx)
            .await?;

            tx.commit().await?;
            info!(
                "Created branch {} for tenant {} (main: {})",
                branch.id,
                ctx.tenant_id(),
                branch.is_main
            );
            Ok(branch)
        })
        .await
    }

    pub async fn list(&self, ctx: &TenantContext) -> Result<Vec<Branch>, TenancyError> {
        with_timeout("branch listing", self.timeout, async {
            let mut conn = self.executor.acquire(ctx).await?;
            let branches = sqlx::query_as::<_, Branch>(&TenantExecutor::qualify(
                ctx,
                &format!("SELECT {BRANCH_COLUMNS} FROM {{schema}}.branches ORDER BY is_main DESC, created_at"),
            ))
            .fetch_all(&mut *conn)
            .await?;
            Ok(branches)
        })
        .await
    }

    pub async fn get(&self, ctx: &TenantContext, id: Uuid) -> Result<Branch, TenancyError> {
        with_timeout("branch lookup", self.timeout, async {
            let mut conn = self.executor.acquire(ctx).await?;
            sqlx::query_as::<_, Branch>(&TenantExecutor::qualify(
                ctx,
                &format!("SELECT {BRANCH_COLUMNS} FROM {{schema}}.branches WHERE id = $1"),
            ))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or(TenancyError::BranchNotFound(id))
        })
        .await
    }

    pub async fn count(&self, ctx: &TenantContext) -> Result<i64, TenancyError> {
        with_timeout("branch count", self.timeout, async {
            let mut conn = self.executor.acquire(ctx).await?;
            let count: i64 = sqlx::query_scalar(&TenantExecutor::qualify(
                ctx,
                "SELECT COUNT(*) FROM {schema}.branches",
            ))
            .fetch_one(&mut *conn)
            .await?;
            Ok(count)
        })
        .await
    }

    /// Toggle a branch's active flag.
    pub async fn set_active(&self, ctx: &TenantContext, id: Uuid, active: bool) -> Result<Branch, TenancyError> {
        let branch = with_timeout("branch update", self.timeout, async {
            let mut conn = self.executor.acquire(ctx).await?;
            sqlx::query_as::<_, Branch>(&TenantExecutor::qualify(
                ctx,
                &format!(
                    "UPDATE {{schema}}.branches SET is_active = $2, updated_at = now()
                     WHERE id = $1
                     RETURNING {BRANCH_COLUMNS}"
                ),
            ))
            .bind(id)
            .bind(active)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or(TenancyError::BranchNotFound(id))
        })
        .await?;

        info!("Branch {} of tenant {} active={}", id, ctx.tenant_id(), active);
        Ok(branch)
    }

    /// Move the main flag to `id`.
    pub async fn set_main(&self, ctx: &TenantContext, id: Uuid) -> Result<Branch, TenancyError> {
        with_timeout("branch update", self.timeout, async {
            let mut tx = self.executor.begin(ctx).await?;

            let locked: Option<Uuid> = sqlx::query_scalar(&TenantExecutor::qualify(
                ctx,
                "SELECT id FROM {schema}.branches WHERE id = $1 FOR UPDATE",
            ))
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
            if locked.is_none() {
                return Err(TenancyError::BranchNotFound(id));
            }

            // Clear first so the partial unique index never sees two mains.
            sqlx::query(&TenantExecutor::qualify(
                ctx,
                "UPDATE {schema}.branches SET is_main = false, updated_at = now() WHERE is_main AND id <> $1",
            ))
            .bind(id)
            .execute(&mut *tx)
            .await?;

            let branch = sqlx::query_as::<_, Branch>(&TenantExecutor::qualify(
                ctx,
                &format!(
                    "UPDATE {{schema}}.branches SET is_main = true, updated_at = now()
                     WHERE id = $1
                     RETURNING {BRANCH_COLUMNS}"
                ),
            ))
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

            tx.commit().await?;
            Ok(branch)
        })
        .await
    }
}
