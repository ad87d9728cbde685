use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::database::context::TenantContext;
use crate::services::error::{with_timeout, TenancyError};
use crate::services::registry::TenantDirectory;

/// Operations that run without an established tenant. Everything else must
/// resolve one first.
pub const PUBLIC_OPERATIONS: &[&str] = &["/health", "/tenants/register", "/bootstrap/admin"];

pub fn is_public_operation(path: &str) -> bool {
    let path = path.trim_end_matches('/');
    let path = if path.is_empty() { "/" } else { path };
    PUBLIC_OPERATIONS.contains(&path)
}

/// Turns a raw tenant identifier into a validated [`TenantContext`].
#[derive(Clone)]
pub struct TenantResolver {
    directory: Arc<dyn TenantDirectory>,
    timeout: Duration,
}

impl TenantResolver {
    pub fn new(directory: Arc<dyn TenantDirectory>, timeout: Duration) -> Self {
        Self { directory, timeout }
    }

    pub async fn resolve(&self, raw: Option<&str>) -> Result<TenantContext, TenancyError> {
        let raw = raw.map(str::trim).filter(|s| !s.is_empty());
        let Some(raw) = raw else {
            return Err(TenancyError::TenantNotSpecified);
        };

        // Not a UUID means no such tenant.
        let Ok(tenant_id) = Uuid::parse_str(raw) else {
            warn!("Rejected malformed tenant identifier");
            return Err(TenancyError::TenantNotFound(raw.to_string()));
        };

        let tenant = with_timeout("tenant resolution", self.timeout, async {
            self.directory.find_tenant(tenant_id).await
        })
        .await?
        .ok_or_else(|| {
            warn!("Tenant {} not found", tenant_id);
            TenancyError::TenantNotFound(tenant_id.to_string())
        })?;

        if !tenant.is_active() {
            warn!("Tenant {} rejected: status {}", tenant_id, tenant.status);
            return Err(TenancyError::TenantNotActive {
                tenant_id,
                status: tenant.status,
            });
        }

        debug!("Resolved tenant {} to namespace {}", tenant_id, tenant.namespace);
        Ok(tenant.context())
    }
}
