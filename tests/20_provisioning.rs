mod common;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use erp_tenancy::database::{Migration, Namespace, TENANT_CATALOG};
use erp_tenancy::services::{ProvisionError, SchemaProvisioner, TenancyError, TenantRegistry, TenantService};
use tokio::time::Instant;
use uuid::Uuid;

/// Version 0003 reads a table the test creates between runs.
static GATED_CATALOG: &[Migration] = &[
    Migration { version: "0001", description: "a", sql: "CREATE TABLE a (id INT)" },
    Migration { version: "0002", description: "b", sql: "CREATE TABLE b (id INT)" },
    Migration {
        version: "0003",
        description: "gated",
        sql: "CREATE TABLE c AS SELECT * FROM provision_gate",
    },
    Migration { version: "0004", description: "d", sql: "CREATE TABLE d (id INT); CREATE INDEX d_id ON d (id)" },
    Migration { version: "0005", description: "e", sql: "CREATE TABLE e (id INT)" },
];

static SLOW_CATALOG: &[Migration] = &[
    Migration { version: "0001", description: "a", sql: "CREATE TABLE a (id INT)" },
    Migration { version: "0002", description: "slow", sql: "SELECT pg_sleep(3)" },
];

fn deadline() -> Instant {
    Instant::now() + Duration::from_secs(60)
}

fn fresh_namespace() -> (Uuid, Namespace) {
    let id = Uuid::new_v4();
    (id, Namespace::for_tenant(&id))
}

#[tokio::test]
async fn create_tenant_provisions_catalog_once() -> Result<()> {
    let Some(pool) = common::test_pool(5).await? else { return Ok(()) };
    let state = common::test_state(&pool)?;

    let tenant = state.tenants.create_tenant(common::new_tenant("Loja Centro", 1)).await?;
    let provisioner = state.tenants.provisioner();
    assert!(provisioner.namespace_exists(&tenant.namespace).await?);
    assert!(provisioner.pending_versions(&tenant.namespace).await?.is_empty());

    let again = state.tenants.reprovision(tenant.id).await?;
    assert!(again.applied.is_empty());
    assert_eq!(again.skipped, TENANT_CATALOG.len());

    let max_per_version: i64 = sqlx::query_scalar(&format!(
        "SELECT MAX(n) FROM (SELECT COUNT(*) AS n FROM {}.schema_migrations GROUP BY version) counts",
        tenant.namespace.quoted()
    ))
    .fetch_one(&pool)
    .await?;
    assert_eq!(max_per_version, 1);

    common::cleanup(&pool, &[&tenant]).await
}

#[tokio::test]
async fn failed_migration_resumes_where_it_stopped() -> Result<()> {
    let Some(pool) = common::test_pool(5).await? else { return Ok(()) };
    let provisioner = SchemaProvisioner::new(pool.clone(), GATED_CATALOG, None, Duration::from_secs(30))?;
    let (id, namespace) = fresh_namespace();

    let err = provisioner.provision(id, &namespace, deadline()).await.unwrap_err();
    assert!(matches!(err, ProvisionError::MigrationFailed { .. }));
    assert_eq!(err.version(), Some("0003"));

    let applied: Vec<String> = provisioner
        .applied_migrations(&namespace)
        .await?
        .into_iter()
        .map(|r| r.version)
        .collect();
    assert_eq!(applied, ["0001", "0002"]);

    sqlx::query(&format!("CREATE TABLE {}.provision_gate (id INT)", namespace.quoted()))
        .execute(&pool)
        .await?;

    let report = provisioner.provision(id, &namespace, deadline()).await?;
    assert_eq!(report.applied, ["0003", "0004", "0005"]);
    assert_eq!(report.skipped, 2);

    common::drop_namespace(&pool, &namespace).await
}

#[tokio::test]
async fn migration_timeout_rolls_back_and_names_version() -> Result<()> {
    let Some(pool) = common::test_pool(5).await? else { return Ok(()) };
    let provisioner = SchemaProvisioner::new(pool.clone(), SLOW_CATALOG, None, Duration::from_millis(500))?;
    let (id, namespace) = fresh_namespace();

    let err = provisioner.provision(id, &namespace, deadline()).await.unwrap_err();
    assert!(matches!(err, ProvisionError::Timeout { .. }));
    assert_eq!(err.version(), Some("0002"));
    assert!(err.is_retryable());

    assert_eq!(provisioner.pending_versions(&namespace).await?, ["0002"]);

    common::drop_namespace(&pool, &namespace).await
}

#[tokio::test]
async fn concurrent_provisioning_applies_each_version_once() -> Result<()> {
    let Some(pool) = common::test_pool(6).await? else { return Ok(()) };
    let provisioner = Arc::new(SchemaProvisioner::new(
        pool.clone(),
        TENANT_CATALOG,
        None,
        Duration::from_secs(30),
    )?);
    let (id, namespace) = fresh_namespace();

    let (a, b) = tokio::join!(
        provisioner.provision(id, &namespace, deadline()),
        provisioner.provision(id, &namespace, deadline()),
    );
    let (a, b) = (a?, b?);
    assert_eq!(a.applied.len() + b.applied.len(), TENANT_CATALOG.len());
    assert!(provisioner.pending_versions(&namespace).await?.is_empty());

    common::drop_namespace(&pool, &namespace).await
}

#[tokio::test]
async fn provisioning_failure_removes_registry_row() -> Result<()> {
    let Some(pool) = common::test_pool(5).await? else { return Ok(()) };
    let registry = TenantRegistry::new(pool.clone());
    let provisioner = SchemaProvisioner::new(pool.clone(), GATED_CATALOG, None, Duration::from_secs(30))?;
    let service = TenantService::new(
        registry.clone(),
        Arc::new(provisioner),
        Duration::from_secs(60),
        Duration::from_secs(30),
        1,
    );

    let new = common::new_tenant("Loja Falha", 1);
    let document = new.document.clone();
    let err = service.create_tenant(new).await.unwrap_err();
    assert!(matches!(err, TenancyError::Provisioning(_)));
    assert_eq!(err.failed_version(), Some("0003"));

    assert!(registry.get_by_document(&document).await?.is_none());

    // The namespace keeps the tables of 0001 and 0002 and its name is retired.
    let namespace: String = sqlx::query_scalar(
        "SELECT namespace FROM public.retired_namespaces
         WHERE to_regclass(quote_ident(namespace) || '.b') IS NOT NULL
         ORDER BY retired_at DESC LIMIT 1",
    )
    .fetch_one(&pool)
    .await?;
    let namespace = Namespace::parse(&namespace)?;
    assert!(registry.namespace_assigned(&namespace).await?);

    common::drop_namespace(&pool, &namespace).await
}

#[tokio::test]
async fn duplicate_document_is_rejected() -> Result<()> {
    let Some(pool) = common::test_pool(5).await? else { return Ok(()) };
    let state = common::test_state(&pool)?;

    let first = common::new_tenant("Loja Um", 1);
    let mut second = common::new_tenant("Loja Dois", 1);
    second.document = first.document.clone();

    let tenant = state.tenants.create_tenant(first).await?;
    let err = state.tenants.create_tenant(second).await.unwrap_err();
    assert!(matches!(err, TenancyError::DuplicateTenant(_)));

    common::cleanup(&pool, &[&tenant]).await
}

#[tokio::test]
async fn deleted_namespace_is_never_reassigned() -> Result<()> {
    let Some(pool) = common::test_pool(5).await? else { return Ok(()) };
    let state = common::test_state(&pool)?;

    let tenant = state.tenants.create_tenant(common::new_tenant("Loja Antiga", 1)).await?;
    let namespace = state.tenants.delete(tenant.id).await?;
    assert_eq!(namespace, tenant.namespace);

    assert!(state.tenants.registry().namespace_assigned(&namespace).await?);
    assert!(state.tenants.provisioner().namespace_exists(&namespace).await?);

    common::drop_namespace(&pool, &namespace).await
}
