use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::services::provisioner::ProvisionError;
use crate::types::{DocumentType, TenantStatus};

#[derive(Debug, Error)]
pub enum TenancyError {
    #[error("Tenant not specified")]
    TenantNotSpecified,

    #[error("Tenant not found: {0}")]
    TenantNotFound(String),

    #[error("Tenant {tenant_id} is not active (status: {status})")]
    TenantNotActive { tenant_id: Uuid, status: TenantStatus },

    #[error("Tenant already registered for document {0}")]
    DuplicateTenant(String),

    #[error("Branch quota exceeded: tenant allows at most {max_branches} branches")]
    QuotaExceeded { max_branches: i32 },

    #[error("Branch not found: {0}")]
    BranchNotFound(Uuid),

    #[error("Fiscal configuration not found for branch {branch_id} ({document_type:?})")]
    FiscalConfigNotFound {
        branch_id: Uuid,
        document_type: Option<DocumentType>,
    },

    #[error("Fiscal configuration already exists for branch {0}")]
    FiscalConfigExists(Uuid),

    #[error("Tenant {0} already has users; admin bootstrap is closed")]
    AdminAlreadyBootstrapped(Uuid),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("No unused tenant namespace found after {attempts} attempts")]
    NamespaceExhausted { attempts: usize },

    #[error("Provisioning failed: {0}")]
    Provisioning(#[from] ProvisionError),

    #[error("{operation} timed out after {after:?}")]
    Timeout { operation: &'static str, after: Duration },

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl TenancyError {
    /// Transient failures worth retrying. Identifier-policy and catalog
    /// violations are invariant breaks and never retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            TenancyError::Timeout { .. } => true,
            TenancyError::Database(e) => e.is_transient(),
            TenancyError::Provisioning(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Migration version that failed, when provisioning is the cause.
    pub fn failed_version(&self) -> Option<&str> {
        match self {
            TenancyError::Provisioning(e) => e.version(),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for TenancyError {
    fn from(err: sqlx::Error) -> Self {
        TenancyError::Database(DatabaseError::Sqlx(err))
    }
}

/// Run `fut` under `after`, mapping expiry to [`TenancyError::Timeout`].
pub async fn with_timeout<T, F>(
    operation: &'static str,
    after: Duration,
    fut: F,
) -> Result<T, TenancyError>
where
    F: std::future::Future<Output = Result<T, TenancyError>>,
{
    match tokio::time::timeout(after, fut).await {
        Ok(result) => result,
        Err(_) => Err(TenancyError::Timeout { operation, after }),
    }
}
