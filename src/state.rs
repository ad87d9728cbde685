use anyhow::Context;
use axum::http::HeaderName;
use sqlx::PgPool;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::database::executor::TenantExecutor;
use crate::middleware::tenant::TenantBinder;
use crate::services::{
    AdminBootstrap, BranchService, FiscalSequenceAllocator, SchemaProvisioner, TenantRegistry,
    TenantResolver, TenantService,
};

/// Services shared by every handler, all backed by one pool.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub tenants: TenantService,
    pub branches: BranchService,
    pub fiscal: FiscalSequenceAllocator,
    pub bootstrap: AdminBootstrap,
    pub binder: TenantBinder,
}

impl AppState {
    /// Wire the services. Fails on an invalid migration catalog, service
    /// role or tenant header name.
    pub fn build(pool: PgPool, config: &AppConfig) -> anyhow::Result<Self> {
        let tenancy = &config.tenancy;
        let registry = TenantRegistry::new(pool.clone());
        let executor = TenantExecutor::new(pool.clone());
        let provisioner = SchemaProvisioner::from_config(pool.clone(), config)
            .context("invalid tenant migration setup")?;

        let header = HeaderName::from_bytes(tenancy.header_name.to_ascii_lowercase().as_bytes())
            .with_context(|| format!("invalid tenant header name {:?}", tenancy.header_name))?;
        let resolver = TenantResolver::new(Arc::new(registry.clone()), tenancy.resolve_timeout());

        Ok(Self {
            tenants: TenantService::new(
                registry.clone(),
                Arc::new(provisioner),
                tenancy.provision_timeout(),
                tenancy.operation_timeout(),
                tenancy.default_max_branches,
            ),
            branches: BranchService::new(executor.clone(), registry.clone(), tenancy.operation_timeout()),
            fiscal: FiscalSequenceAllocator::new(executor.clone(), tenancy.operation_timeout()),
            bootstrap: AdminBootstrap::new(executor, registry, tenancy.operation_timeout()),
            binder: TenantBinder::new(resolver, header),
            pool,
        })
    }
}
