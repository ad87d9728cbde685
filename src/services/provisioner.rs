//! Creates tenant namespaces and replays the migration catalog into them.
//!
//! Provisioning is re-runnable: each catalog entry commits together with its
//! `schema_migrations` row, so a second call skips what is recorded and a
//! call after a failure resumes at the first unrecorded version.

use serde::Serialize;
use sha2::{Digest, Sha256};
use sqlx::{PgConnection, PgPool};
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::database::manager::DatabaseError;
use crate::database::migrations::{validate_catalog, CatalogError, Migration, MIGRATIONS_TABLE, TENANT_CATALOG};
use crate::database::models::MigrationRecord;
use crate::database::namespace::{is_sql_identifier, Namespace};

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("Failed to prepare namespace {namespace}: {source}")]
    Namespace {
        namespace: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Migration {version} failed: {source}")]
    MigrationFailed {
        version: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Provisioning timed out{}", at_version(.version))]
    Timeout { version: Option<String> },

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("Invalid service role: {0}")]
    InvalidRole(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl ProvisionError {
    pub fn version(&self) -> Option<&str> {
        match self {
            ProvisionError::MigrationFailed { version, .. } => Some(version),
            ProvisionError::Timeout { version } => version.as_deref(),
            _ => None,
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            ProvisionError::Timeout { .. } => true,
            ProvisionError::Namespace { source, .. } | ProvisionError::MigrationFailed { source, .. } => {
                matches!(source, sqlx::Error::PoolTimedOut | sqlx::Error::Io(_))
            }
            ProvisionError::Database(e) => e.is_transient(),
            ProvisionError::Catalog(_) | ProvisionError::InvalidRole(_) => false,
        }
    }
}

fn at_version(version: &Option<String>) -> String {
    version.as_deref().map(|v| format!(" at migration {v}")).unwrap_or_default()
}

/// Outcome of one provisioning run.
#[derive(Debug, Clone, Serialize)]
pub struct ProvisionReport {
    pub tenant_id: Uuid,
    pub namespace: Namespace,
    pub applied: Vec<String>,
    pub skipped: usize,
}

pub struct SchemaProvisioner {
    pool: PgPool,
    catalog: &'static [Migration],
    service_role: Option<String>,
    migration_timeout: Duration,
}

impl SchemaProvisioner {
    /// Fails when the catalog is misordered or the role is not a plain identifier.
    pub fn new(
        pool: PgPool,
        catalog: &'static [Migration],
        service_role: Option<String>,
        migration_timeout: Duration,
    ) -> Result<Self, ProvisionError> {
        validate_catalog(catalog)?;
        if let Some(role) = service_role.as_deref() {
            if !is_sql_identifier(role) {
                return Err(ProvisionError::InvalidRole(role.to_string()));
            }
        }
        Ok(Self {
            pool,
            catalog,
            service_role,
            migration_timeout,
        })
    }

    pub fn from_config(pool: PgPool, config: &AppConfig) -> Result<Self, ProvisionError> {
        Self::new(
            pool,
            TENANT_CATALOG,
            config.database.service_role.clone(),
            config.tenancy.migration_timeout(),
        )
    }

    /// Create `namespace` if needed, grant the service role, and apply every
    /// unrecorded catalog version in order. Stops at the first failure.
    pub async fn provision(
        &self,
        tenant_id: Uuid,
        namespace: &Namespace,
        deadline: Instant,
    ) -> Result<ProvisionReport, ProvisionError> {
        info!("Provisioning namespace {} for tenant {}", namespace, tenant_id);

        match tokio::time::timeout_at(deadline, self.prepare_namespace(namespace)).await {
            Ok(result) => result?,
            Err(_) => return Err(ProvisionError::Timeout { version: None }),
        }

        let mut report = ProvisionReport {
            tenant_id,
            namespace: namespace.clone(),
            applied: Vec::new(),
            skipped: 0,
        };

        for migration in self.catalog {
            let limit = deadline.min(Instant::now() + self.migration_timeout);
            match tokio::time::timeout_at(limit, self.apply(namespace, migration)).await {
                Ok(Ok(true)) => report.applied.push(migration.version.to_string()),
                Ok(Ok(false)) => report.skipped += 1,
                Ok(Err(e)) => {
                    warn!("Migration {} failed in {}: {}", migration.version, namespace, e);
                    return Err(e);
                }
                // Dropping the in-flight future drops its transaction, which rolls back.
                Err(_) => {
                    warn!("Migration {} timed out in {}", migration.version, namespace);
                    return Err(ProvisionError::Timeout {
                        version: Some(migration.version.to_string()),
                    });
                }
            }
        }

        info!(
            "Provisioned {}: {} applied, {} already present",
            namespace,
            report.applied.len(),
            report.skipped
        );
        Ok(report)
    }

    async fn prepare_namespace(&self, namespace: &Namespace) -> Result<(), ProvisionError> {
        let wrap = |source| ProvisionError::Namespace {
            namespace: namespace.to_string(),
            source,
        };
        let schema = namespace.quoted();
        let grantee = match self.service_role.as_deref() {
            Some(role) => crate::database::manager::quote_identifier(role),
            None => "CURRENT_USER".to_string(),
        };

        let mut tx = self.pool.begin().await.map_err(wrap)?;
        lock_namespace(&mut tx, namespace).await.map_err(wrap)?;

        let mut statements = vec![
            format!("CREATE SCHEMA IF NOT EXISTS {schema}"),
            format!("GRANT ALL ON SCHEMA {schema} TO {grantee}"),
        ];
        if self.service_role.is_some() {
            statements.push(format!(
                "ALTER DEFAULT PRIVILEGES IN SCHEMA {schema} GRANT ALL ON TABLES TO {grantee}"
            ));
            statements.push(format!(
                "ALTER DEFAULT PRIVILEGES IN SCHEMA {schema} GRANT ALL ON SEQUENCES TO {grantee}"
            ));
        }
        statements.push(format!(
            "CREATE TABLE IF NOT EXISTS {schema}.{MIGRATIONS_TABLE} (
                version     TEXT PRIMARY KEY,
                description TEXT NOT NULL DEFAULT '',
                applied_at  TIMESTAMPTZ NOT NULL DEFAULT now()
            )"
        ));

        for statement in &statements {
            sqlx::query(statement).execute(&mut *tx).await.map_err(wrap)?;
        }
        tx.commit().await.map_err(wrap)?;

        debug!("Namespace {} ready", namespace);
        Ok(())
    }

    /// Apply one migration unless already recorded. Returns whether it ran.
    async fn apply(&self, namespace: &Namespace, migration: &Migration) -> Result<bool, ProvisionError> {
        let fail = |source| ProvisionError::MigrationFailed {
            version: migration.version.to_string(),
            source,
        };
        let table = format!("{}.{}", namespace.quoted(), MIGRATIONS_TABLE);

        let mut tx = self.pool.begin().await.map_err(fail)?;
        lock_namespace(&mut tx, namespace).await.map_err(fail)?;

        let applied: bool = sqlx::query_scalar(&format!(
            "SELECT EXISTS (SELECT 1 FROM {table} WHERE version = $1)"
        ))
        .bind(migration.version)
        .fetch_one(&mut *tx)
        .await
        .map_err(fail)?;
        if applied {
            return Ok(false);
        }

        sqlx::query(&format!("SET LOCAL search_path TO {}", namespace.quoted()))
            .execute(&mut *tx)
            .await
            .map_err(fail)?;

        // Scripts may hold several statements; a bare &str runs through the simple query protocol.
        sqlx::Executor::execute(&mut *tx, migration.sql).await.map_err(fail)?;

        sqlx::query(&format!("INSERT INTO {table} (version, description) VALUES ($1, $2)"))
            .bind(migration.version)
            .bind(migration.description)
            .execute(&mut *tx)
            .await
            .map_err(fail)?;

        tx.commit().await.map_err(fail)?;
        info!("Applied migration {} ({}) to {}", migration.version, migration.description, namespace);
        Ok(true)
    }

    /// Migration records present in `namespace`, in version order.
    pub async fn applied_migrations(&self, namespace: &Namespace) -> Result<Vec<MigrationRecord>, DatabaseError> {
        let rows = sqlx::query_as::<_, MigrationRecord>(&format!(
            "SELECT version, description, applied_at FROM {}.{} ORDER BY version",
            namespace.quoted(),
            MIGRATIONS_TABLE
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Catalog versions not yet recorded in `namespace`.
    pub async fn pending_versions(&self, namespace: &Namespace) -> Result<Vec<&'static str>, DatabaseError> {
        let applied = self.applied_migrations(namespace).await?;
        Ok(self
            .catalog
            .iter()
            .map(|m| m.version)
            .filter(|v| !applied.iter().any(|r| r.version == *v))
            .collect())
    }

    /// Whether a schema with this name exists in the database.
    pub async fn namespace_exists(&self, namespace: &Namespace) -> Result<bool, DatabaseError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM pg_namespace WHERE nspname = $1)")
            .bind(namespace.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }
}

/// Advisory lock key for a namespace: first 8 bytes of its SHA-256 digest.
pub fn namespace_lock_key(namespace: &Namespace) -> i64 {
    let digest = Sha256::digest(namespace.as_str().as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    i64::from_be_bytes(bytes)
}

/// Serialise provisioning of one namespace until the transaction ends.
async fn lock_namespace(conn: &mut PgConnection, namespace: &Namespace) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(namespace_lock_key(namespace))
        .execute(conn)
        .await?;
    Ok(())
}
