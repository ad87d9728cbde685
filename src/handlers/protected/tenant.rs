// handlers/protected/tenant.rs - GET /api/tenant handler

use axum::{extract::State, Extension};

use crate::database::context::TenantContext;
use crate::database::models::Tenant;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

/// Registry record of the tenant bound to this request.
pub async fn tenant_current(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
) -> ApiResult<Tenant> {
    let tenant = state.tenants.get(ctx.tenant_id()).await?;
    Ok(ApiResponse::success(tenant))
}
