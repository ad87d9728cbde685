//! Durable tenant records in the shared `public` schema.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::{Tenant, TenantUpdate};
use crate::database::namespace::Namespace;
use crate::services::error::TenancyError;
use crate::types::{PlanType, TenantStatus};

/// Lookup used by the resolver; the registry is the production implementation.
#[async_trait]
pub trait TenantDirectory: Send + Sync {
    async fn find_tenant(&self, id: Uuid) -> Result<Option<Tenant>, TenancyError>;
}

const TENANT_COLUMNS: &str =
    "id, name, document, status, namespace, plan, max_branches, created_at, updated_at";

const DOCUMENT_CONSTRAINT: &str = "tenants_document_key";

#[derive(Clone)]
pub struct TenantRegistry {
    pool: PgPool,
}

impl TenantRegistry {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the shared tables if they are missing.
    pub async fn ensure_schema(&self) -> Result<(), DatabaseError> {
        let statements = [
            r#"CREATE TABLE IF NOT EXISTS public.tenants (
                id            UUID PRIMARY KEY,
                name          TEXT NOT NULL,
                document      TEXT NOT NULL,
                status        TEXT NOT NULL DEFAULT 'active'
                              CHECK (status IN ('active', 'inactive', 'blocked')),
                namespace     TEXT NOT NULL UNIQUE,
                plan          TEXT NOT NULL DEFAULT 'basic'
                              CHECK (plan IN ('basic', 'professional', 'enterprise')),
                max_branches  INTEGER NOT NULL DEFAULT 1 CHECK (max_branches > 0),
                created_at    TIMESTAMPTZ NOT NULL DEFAULT now(),
                updated_at    TIMESTAMPTZ NOT NULL DEFAULT now(),
                CONSTRAINT tenants_document_key UNIQUE (document)
            )"#,
            r#"CREATE TABLE IF NOT EXISTS public.retired_namespaces (
                namespace   TEXT PRIMARY KEY,
                tenant_id   UUID NOT NULL,
                retired_at  TIMESTAMPTZ NOT NULL DEFAULT now()
            )"#,
        ];

        let mut tx = self.pool.begin().await?;
        // Concurrent first boots would race on CREATE TABLE IF NOT EXISTS.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext('erp_tenancy.registry'))")
            .execute(&mut *tx)
            .await?;
        for statement in statements {
            sqlx::query(statement).execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn insert(
        &self,
        id: Uuid,
        name: &str,
        document: &str,
        namespace: &Namespace,
        plan: PlanType,
        max_branches: i32,
    ) -> Result<Tenant, TenancyError> {
        let result = sqlx::query_as::<_, Tenant>(&format!(
            "INSERT INTO public.tenants (id, name, document, status, namespace, plan, max_branches)
             VALUES ($1, $2, $3, 'active', $4, $5, $6)
             RETURNING {TENANT_COLUMNS}"
        ))
        .bind(id)
        .bind(name)
        .bind(document)
        .bind(namespace.as_str())
        .bind(plan.as_str())
        .bind(max_branches)
        .fetch_one(&self.pool)
        .await;

        match result.map_err(DatabaseError::from) {
            Ok(tenant) => Ok(tenant),
            Err(e) if e.is_unique_violation(Some(DOCUMENT_CONSTRAINT)) => {
                Err(TenancyError::DuplicateTenant(document.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Tenant>, TenancyError> {
        let tenant = sqlx::query_as::<_, Tenant>(&format!(
            "SELECT {TENANT_COLUMNS} FROM public.tenants WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(tenant)
    }

    pub async fn get_by_document(&self, document: &str) -> Result<Option<Tenant>, TenancyError> {
        let tenant = sqlx::query_as::<_, Tenant>(&format!(
            "SELECT {TENANT_COLUMNS} FROM public.tenants WHERE document = $1"
        ))
        .bind(document)
        .fetch_optional(&self.pool)
        .await?;
        Ok(tenant)
    }

    pub async fn list(&self, status: Option<TenantStatus>) -> Result<Vec<Tenant>, TenancyError> {
        let tenants = sqlx::query_as::<_, Tenant>(&format!(
            "SELECT {TENANT_COLUMNS} FROM public.tenants
             WHERE ($1::text IS NULL OR status = $1)
             ORDER BY created_at, id"
        ))
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await?;
        Ok(tenants)
    }

    pub async fn update(&self, id: Uuid, update: &TenantUpdate) -> Result<Tenant, TenancyError> {
        sqlx::query_as::<_, Tenant>(&format!(
            "UPDATE public.tenants
             SET name = COALESCE($2, name),
                 plan = COALESCE($3, plan),
                 max_branches = COALESCE($4, max_branches),
                 updated_at = now()
             WHERE id = $1
             RETURNING {TENANT_COLUMNS}"
        ))
        .bind(id)
        .bind(update.name.as_deref())
        .bind(update.plan.map(|p| p.as_str()))
        .bind(update.max_branches)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| TenancyError::TenantNotFound(id.to_string()))
    }

    pub async fn set_status(&self, id: Uuid, status: TenantStatus) -> Result<Tenant, TenancyError> {
        let tenant = sqlx::query_as::<_, Tenant>(&format!(
            "UPDATE public.tenants SET status = $2, updated_at = now()
             WHERE id = $1
             RETURNING {TENANT_COLUMNS}"
        ))
        .bind(id)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| TenancyError::TenantNotFound(id.to_string()))?;

        info!("Tenant {} is now {}", id, status);
        Ok(tenant)
    }

    /// Remove the registry row and retire its namespace name in one
    /// transaction. The namespace itself is left in place.
    pub async fn delete(&self, id: Uuid) -> Result<Option<Namespace>, TenancyError> {
        let mut tx = self.pool.begin().await?;
        let namespace: Option<String> =
            sqlx::query_scalar("DELETE FROM public.tenants WHERE id = $1 RETURNING namespace")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some(namespace) = namespace else {
            return Ok(None);
        };
        sqlx::query(
            "INSERT INTO public.retired_namespaces (namespace, tenant_id)
             VALUES ($1, $2) ON CONFLICT (namespace) DO NOTHING",
        )
        .bind(&namespace)
        .bind(id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        info!("Removed tenant {} from registry; namespace {} retained", id, namespace);
        Ok(Some(Namespace::parse(&namespace)?))
    }

    /// Whether a namespace name was ever assigned, live or retired.
    pub async fn namespace_assigned(&self, namespace: &Namespace) -> Result<bool, TenancyError> {
        let assigned: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM public.tenants WHERE namespace = $1)
                 OR EXISTS (SELECT 1 FROM public.retired_namespaces WHERE namespace = $1)",
        )
        .bind(namespace.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(assigned)
    }
}

#[async_trait]
impl TenantDirectory for TenantRegistry {
    async fn find_tenant(&self, id: Uuid) -> Result<Option<Tenant>, TenancyError> {
        self.get(id).await
    }
}
