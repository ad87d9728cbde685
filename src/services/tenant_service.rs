use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::database::models::{NewTenant, Tenant, TenantUpdate};
use crate::database::namespace::Namespace;
use crate::services::error::{with_timeout, TenancyError};
use crate::services::provisioner::{ProvisionReport, SchemaProvisioner};
use crate::services::registry::TenantRegistry;
use crate::types::TenantStatus;

/// Fresh ids drawn before giving up on finding an unused namespace.
const NAMESPACE_ATTEMPTS: usize = 5;

/// Tenant lifecycle: registration with provisioning, status transitions,
/// updates and removal from the registry.
#[derive(Clone)]
pub struct TenantService {
    registry: TenantRegistry,
    provisioner: Arc<SchemaProvisioner>,
    provision_timeout: Duration,
    timeout: Duration,
    default_max_branches: i32,
}

impl TenantService {
    pub fn new(
        registry: TenantRegistry,
        provisioner: Arc<SchemaProvisioner>,
        provision_timeout: Duration,
        timeout: Duration,
        default_max_branches: i32,
    ) -> Self {
        Self {
            registry,
            provisioner,
            provision_timeout,
            timeout,
            default_max_branches,
        }
    }

    pub fn registry(&self) -> &TenantRegistry {
        &self.registry
    }

    pub fn provisioner(&self) -> &SchemaProvisioner {
        &self.provisioner
    }

    /// Register a tenant and provision its namespace.
    ///
    /// If provisioning fails the registry row is deleted again; the namespace
    /// and whatever migrations committed in it are left for manual cleanup.
    pub async fn create_tenant(&self, new: NewTenant) -> Result<Tenant, TenancyError> {
        let name = new.name.trim();
        let document = normalize_document(&new.document);
        validate_name(name)?;
        if document.is_empty() {
            return Err(TenancyError::InvalidInput("document is required".to_string()));
        }
        let max_branches = new.max_branches.unwrap_or(self.default_max_branches);
        validate_max_branches(max_branches)?;

        let (tenant, namespace) = with_timeout("tenant registration", self.timeout, async {
            if self.registry.get_by_document(&document).await?.is_some() {
                return Err(TenancyError::DuplicateTenant(document.clone()));
            }

            let (id, namespace) = self.allocate_namespace().await?;
            let tenant = self
                .registry
                .insert(id, name, &document, &namespace, new.plan, max_branches)
                .await?;
            Ok((tenant, namespace))
        })
        .await?;
        let id = tenant.id;
        info!("Registered tenant {} ({}) with namespace {}", tenant.id, tenant.name, namespace);

        let deadline = Instant::now() + self.provision_timeout;
        if let Err(e) = self.provisioner.provision(id, &namespace, deadline).await {
            warn!("Provisioning tenant {} failed, removing registry row: {}", id, e);
            if let Err(cleanup) = with_timeout("tenant compensation", self.timeout, self.registry.delete(id)).await {
                error!("Compensating delete of tenant {} failed: {}", id, cleanup);
            }
            return Err(e.into());
        }

        Ok(tenant)
    }

    /// Re-run the catalog for an existing tenant. No compensation on failure.
    pub async fn reprovision(&self, id: Uuid) -> Result<ProvisionReport, TenancyError> {
        let tenant = with_timeout("tenant lookup", self.timeout, self.require(id)).await?;
        let deadline = Instant::now() + self.provision_timeout;
        let report = self.provisioner.provision(tenant.id, &tenant.namespace, deadline).await?;
        Ok(report)
    }

    pub async fn get(&self, id: Uuid) -> Result<Tenant, TenancyError> {
        with_timeout("tenant lookup", self.timeout, self.require(id)).await
    }

    pub async fn get_by_document(&self, document: &str) -> Result<Tenant, TenancyError> {
        let document = normalize_document(document);
        with_timeout("tenant lookup", self.timeout, async {
            self.registry
                .get_by_document(&document)
                .await?
                .ok_or_else(|| TenancyError::TenantNotFound(document.clone()))
        })
        .await
    }

    pub async fn list(&self, status: Option<TenantStatus>) -> Result<Vec<Tenant>, TenancyError> {
        with_timeout("tenant listing", self.timeout, self.registry.list(status)).await
    }

    pub async fn update(&self, id: Uuid, mut update: TenantUpdate) -> Result<Tenant, TenancyError> {
        if let Some(name) = update.name.as_mut() {
            *name = name.trim().to_string();
            validate_name(name)?;
        }
        if let Some(max) = update.max_branches {
            validate_max_branches(max)?;
        }
        with_timeout("tenant update", self.timeout, async {
            if update.is_empty() {
                return self.require(id).await;
            }
            self.registry.update(id, &update).await
        })
        .await
    }

    pub async fn activate(&self, id: Uuid) -> Result<Tenant, TenancyError> {
        self.set_status(id, TenantStatus::Active).await
    }

    pub async fn deactivate(&self, id: Uuid) -> Result<Tenant, TenancyError> {
        self.set_status(id, TenantStatus::Inactive).await
    }

    pub async fn block(&self, id: Uuid) -> Result<Tenant, TenancyError> {
        self.set_status(id, TenantStatus::Blocked).await
    }

    /// Remove the registry row. Returns the namespace that was left behind.
    pub async fn delete(&self, id: Uuid) -> Result<Namespace, TenancyError> {
        with_timeout("tenant deletion", self.timeout, async {
            self.registry
                .delete(id)
                .await?
                .ok_or_else(|| TenancyError::TenantNotFound(id.to_string()))
        })
        .await
    }

    async fn set_status(&self, id: Uuid, status: TenantStatus) -> Result<Tenant, TenancyError> {
        with_timeout("tenant status change", self.timeout, self.registry.set_status(id, status)).await
    }

    async fn require(&self, id: Uuid) -> Result<Tenant, TenancyError> {
        self.registry
            .get(id)
            .await?
            .ok_or_else(|| TenancyError::TenantNotFound(id.to_string()))
    }

    /// Draw tenant ids until the derived namespace was never assigned and
    /// does not already exist as a schema.
    async fn allocate_namespace(&self) -> Result<(Uuid, Namespace), TenancyError> {
        for _ in 0..NAMESPACE_ATTEMPTS {
            let id = Uuid::new_v4();
            let namespace = Namespace::for_tenant(&id);
            if self.registry.namespace_assigned(&namespace).await? {
                continue;
            }
            if self.provisioner.namespace_exists(&namespace).await? {
                continue;
            }
            return Ok((id, namespace));
        }
        Err(TenancyError::NamespaceExhausted {
            attempts: NAMESPACE_ATTEMPTS,
        })
    }
}

/// Keep only the digits of a CNPJ/CPF-style document number.
pub fn normalize_document(raw: &str) -> String {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        raw.trim().to_string()
    } else {
        digits
    }
}

fn validate_name(name: &str) -> Result<(), TenancyError> {
    if name.len() < 2 {
        return Err(TenancyError::InvalidInput("tenant name must be at least 2 characters".to_string()));
    }
    if name.len() > 200 {
        return Err(TenancyError::InvalidInput("tenant name must be at most 200 characters".to_string()));
    }
    Ok(())
}

fn validate_max_branches(max: i32) -> Result<(), TenancyError> {
    if max < 1 {
        return Err(TenancyError::InvalidInput("max_branches must be at least 1".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_formatted_documents() {
        assert_eq!(normalize_document("12.345.678/0001-90"), "12345678000190");
        assert_eq!(normalize_document(" 12345678000190 "), "12345678000190");
        assert_eq!(normalize_document("  "), "");
    }

    #[test]
    fn validates_inputs() {
        assert!(validate_name("Lo").is_ok());
        assert!(matches!(validate_name("L"), Err(TenancyError::InvalidInput(_))));
        assert!(validate_max_branches(1).is_ok());
        assert!(matches!(validate_max_branches(0), Err(TenancyError::InvalidInput(_))));
    }
}
