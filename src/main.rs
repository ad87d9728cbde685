use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use erp_tenancy::config::config;
use erp_tenancy::database::DatabaseManager;
use erp_tenancy::handlers;
use erp_tenancy::is_production;
use erp_tenancy::services::TenantRegistry;
use erp_tenancy::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, TENANCY_*, etc.
    let _ = dotenvy::dotenv();

    let config = config();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    info!("Starting ERP tenancy API in {:?} mode", config.environment);

    let pool = DatabaseManager::connect_lazy(&config.database).context("database configuration")?;
    // Catalog and role problems are fatal; storage being down is not.
    let state = AppState::build(pool.clone(), config)?;

    match TenantRegistry::new(pool).ensure_schema().await {
        Ok(()) => info!("Tenant registry ready"),
        Err(e) if is_production!() => return Err(e).context("tenant registry setup"),
        Err(e) => warn!("Tenant registry setup deferred, database unavailable: {}", e),
    }

    let app = handlers::router(state, config.api.enable_request_logging);

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    info!("ERP tenancy API listening on http://{}", bind_addr);

    axum::serve(listener, app).await.context("server")?;
    Ok(())
}
