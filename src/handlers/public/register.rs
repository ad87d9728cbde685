// handlers/public/register.rs - POST /tenants/register handler

use axum::{extract::State, Json};

use crate::database::models::{NewTenant, Tenant};
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

/// Tenant self-registration. Provisions the namespace before answering;
/// a provisioning failure leaves no registry row behind.
///
/// ```json
/// { "name": "Loja Centro", "document": "12.345.678/0001-90", "plan": "basic", "max_branches": 3 }
/// ```
pub async fn tenant_register(
    State(state): State<AppState>,
    Json(new): Json<NewTenant>,
) -> ApiResult<Tenant> {
    let tenant = state.tenants.create_tenant(new).await?;
    Ok(ApiResponse::created(tenant))
}
