#![allow(dead_code)]

use std::process::{Child, Command, Stdio};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use erp_tenancy::config::AppConfig;
use erp_tenancy::database::models::{NewTenant, Tenant};
use erp_tenancy::database::Namespace;
use erp_tenancy::services::TenantRegistry;
use erp_tenancy::state::AppState;
use erp_tenancy::types::PlanType;
use reqwest::StatusCode;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

static SERVER: OnceLock<TestServer> = OnceLock::new();

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    child: Child,
}

impl TestServer {
    fn spawn() -> Result<Self> {
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let mut cmd = Command::new(env!("CARGO_BIN_EXE_erp-tenancy"));
        cmd.env("ERP_API_PORT", port.to_string())
            .env("API_ENABLE_REQUEST_LOGGING", "false")
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        // Inherit environment so the server sees DATABASE_URL when one is configured
        let child = cmd.spawn().context("failed to spawn server binary")?;

        Ok(Self { port, base_url, child })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            let url = format!("{}/health", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                // Ready once routing works, with or without a database
                if resp.status() == StatusCode::OK || resp.status() == StatusCode::SERVICE_UNAVAILABLE {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }
}

pub async fn ensure_server() -> Result<&'static TestServer> {
    let server = SERVER.get_or_init(|| TestServer::spawn().expect("failed to spawn server binary"));
    server.wait_ready(Duration::from_secs(15)).await?;
    Ok(server)
}

/// Pool against `DATABASE_URL`, or `None` (test skipped) when it is unset.
pub async fn test_pool(max_connections: u32) -> Result<Option<PgPool>> {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set; skipping database test");
        return Ok(None);
    };
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(10))
        .connect(&url)
        .await
        .context("connecting to DATABASE_URL")?;
    TenantRegistry::new(pool.clone()).ensure_schema().await?;
    Ok(Some(pool))
}

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::from_env();
    config.database.service_role = None;
    config.tenancy.header_name = "tenant-id".to_string();
    config.tenancy.provision_timeout_secs = 60;
    config.tenancy.migration_timeout_secs = 30;
    config.tenancy.operation_timeout_secs = 30;
    config.tenancy.default_max_branches = 1;
    config
}

pub fn test_state(pool: &PgPool) -> Result<AppState> {
    AppState::build(pool.clone(), &test_config())
}

/// Fourteen-digit document number unique to this run.
pub fn unique_document() -> String {
    format!("{:014}", uuid::Uuid::new_v4().as_u128() % 100_000_000_000_000)
}

pub fn new_tenant(name: &str, max_branches: i32) -> NewTenant {
    NewTenant {
        name: name.to_string(),
        document: unique_document(),
        plan: PlanType::Basic,
        max_branches: Some(max_branches),
    }
}

/// Drop the registry rows and namespaces a test created.
pub async fn cleanup(pool: &PgPool, tenants: &[&Tenant]) -> Result<()> {
    for tenant in tenants {
        sqlx::query("DELETE FROM public.tenants WHERE id = $1")
            .bind(tenant.id)
            .execute(pool)
            .await?;
        drop_namespace(pool, &tenant.namespace).await?;
    }
    Ok(())
}

pub async fn drop_namespace(pool: &PgPool, namespace: &Namespace) -> Result<()> {
    sqlx::query(&format!("DROP SCHEMA IF EXISTS {} CASCADE", namespace.quoted()))
        .execute(pool)
        .await?;
    Ok(())
}
