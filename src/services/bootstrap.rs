use std::time::Duration;
use tracing::{info, warn};

use crate::database::executor::TenantExecutor;
use crate::database::manager::DatabaseError;
use crate::database::models::{NewAdmin, User};
use crate::services::error::{with_timeout, TenancyError};
use crate::services::registry::TenantRegistry;

const USER_COLUMNS: &str =
    "id, name, email, password_hash, role, branch_id, is_active, created_at, updated_at";

/// First admin account of a freshly registered tenant. Runs without a bound
/// tenant, so the tenant is looked up here and must be active.
#[derive(Clone)]
pub struct AdminBootstrap {
    executor: TenantExecutor,
    registry: TenantRegistry,
    timeout: Duration,
}

impl AdminBootstrap {
    pub fn new(executor: TenantExecutor, registry: TenantRegistry, timeout: Duration) -> Self {
        Self {
            executor,
            registry,
            timeout,
        }
    }

    pub async fn bootstrap_admin(&self, new: NewAdmin) -> Result<User, TenancyError> {
        let name = new.name.trim();
        let email = new.email.trim().to_lowercase();
        if name.is_empty() {
            return Err(TenancyError::InvalidInput("name is required".to_string()));
        }
        if !email.contains('@') {
            return Err(TenancyError::InvalidInput("email is invalid".to_string()));
        }
        if new.password_hash.is_empty() {
            return Err(TenancyError::InvalidInput("password_hash is required".to_string()));
        }

        with_timeout("admin bootstrap", self.timeout, async {
            let tenant = self
                .registry
                .get(new.tenant_id)
                .await?
                .ok_or_else(|| TenancyError::TenantNotFound(new.tenant_id.to_string()))?;
            if !tenant.is_active() {
                return Err(TenancyError::TenantNotActive {
                    tenant_id: tenant.id,
                    status: tenant.status,
                });
            }

            let ctx = tenant.context();
            let mut tx = self.executor.begin(&ctx).await?;

            // Two racing bootstraps must not both see an empty table.
            sqlx::query(&TenantExecutor::qualify(
                &ctx,
                "LOCK TABLE {schema}.users IN SHARE ROW EXCLUSIVE MODE",
            ))
            .execute(&mut *tx)
            .await?;

            let has_users: bool = sqlx::query_scalar(&TenantExecutor::qualify(
                &ctx,
                "SELECT EXISTS (SELECT 1 FROM {schema}.users)",
            ))
            .fetch_one(&mut *tx)
            .await?;
            if has_users {
                warn!("Rejected admin bootstrap for tenant {}: users exist", tenant.id);
                return Err(TenancyError::AdminAlreadyBootstrapped(tenant.id));
            }

            let user = sqlx::query_as::<_, User>(&TenantExecutor::qualify(
                &ctx,
                &format!(
                    "INSERT INTO {{schema}}.users (name, email, password_hash, role)
                     VALUES ($1, $2, $3, 'admin')
                     RETURNING {USER_COLUMNS}"
                ),
            ))
            .bind(name)
            .bind(&email)
            .bind(&new.password_hash)
            .fetch_one(&mut *tx)
            .await
            .map_err(DatabaseError::from)?;

            tx.commit().await?;
            info!("Bootstrapped admin {} for tenant {}", user.id, tenant.id);
            Ok(user)
        })
        .await
    }
}
