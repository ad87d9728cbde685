//! Tenant-scoped statement execution over the shared pool.
//!
//! `search_path` is connection-local state and pooled connections are reused
//! across requests, so every acquisition sets it again before handing the
//! connection out. Nothing here trusts the scope a previous borrower left.

use sqlx::pool::PoolConnection;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use std::ops::{Deref, DerefMut};
use tracing::debug;

use crate::database::context::{Scope, TenantContext};
use crate::database::manager::DatabaseError;

/// Placeholder replaced by the quoted namespace in [`TenantExecutor::qualify`].
pub const SCHEMA_PLACEHOLDER: &str = "{schema}";

#[derive(Clone)]
pub struct TenantExecutor {
    pool: PgPool,
}

/// A pooled connection whose `search_path` was set for one scope.
/// Returned to the pool on drop.
pub struct ScopedConnection {
    conn: PoolConnection<Postgres>,
}

impl Deref for ScopedConnection {
    type Target = PgConnection;

    fn deref(&self) -> &Self::Target {
        &self.conn
    }
}

impl DerefMut for ScopedConnection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.conn
    }
}

impl TenantExecutor {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Acquire a connection and pin its session `search_path` to the scope.
    pub async fn acquire<'a>(
        &self,
        scope: impl Into<Scope<'a>>,
    ) -> Result<ScopedConnection, DatabaseError> {
        let namespace = scope.into().namespace();
        let mut conn = self.pool.acquire().await?;

        sqlx::query(&format!("SET search_path TO {}", namespace.quoted()))
            .execute(&mut *conn)
            .await?;
        debug!("Bound pooled connection to namespace {}", namespace);

        Ok(ScopedConnection { conn })
    }

    /// Begin a transaction whose `search_path` is pinned with `SET LOCAL`,
    /// so the setting ends with the transaction.
    pub async fn begin<'a>(
        &self,
        scope: impl Into<Scope<'a>>,
    ) -> Result<Transaction<'static, Postgres>, DatabaseError> {
        let namespace = scope.into().namespace();
        let mut tx = self.pool.begin().await?;

        sqlx::query(&format!("SET LOCAL search_path TO {}", namespace.quoted()))
            .execute(&mut *tx)
            .await?;
        debug!("Opened transaction in namespace {}", namespace);

        Ok(tx)
    }

    /// Substitute `{schema}` with the tenant's quoted namespace.
    pub fn qualify(ctx: &TenantContext, sql: &str) -> String {
        sql.replace(SCHEMA_PLACEHOLDER, &ctx.namespace().quoted())
    }

    /// Effective `search_path` of a connection.
    pub async fn current_search_path(conn: &mut PgConnection) -> Result<String, DatabaseError> {
        let path: String = sqlx::query_scalar("SELECT current_setting('search_path')")
            .fetch_one(conn)
            .await?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Namespace;
    use uuid::Uuid;

    #[test]
    fn qualify_substitutes_every_placeholder() {
        let id = Uuid::new_v4();
        let ctx = TenantContext::new(id, Namespace::for_tenant(&id));
        let sql = TenantExecutor::qualify(
            &ctx,
            "SELECT b.id FROM {schema}.branches b JOIN {schema}.fiscal_configs f ON f.branch_id = b.id",
        );
        let quoted = ctx.namespace().quoted();
        assert_eq!(sql.matches(&quoted).count(), 2);
        assert!(!sql.contains(SCHEMA_PLACEHOLDER));
    }

    #[test]
    fn scope_falls_back_to_shared() {
        assert!(Scope::from(None).namespace().is_shared());
        let id = Uuid::new_v4();
        let ctx = TenantContext::new(id, Namespace::for_tenant(&id));
        assert_eq!(Scope::from(Some(&ctx)).namespace(), *ctx.namespace());
    }
}
