// handlers/protected/fiscal.rs - /api/branches/:id/fiscal handlers

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::database::context::TenantContext;
use crate::database::models::{FiscalAllocation, FiscalConfig, NewFiscalConfig};
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;
use crate::types::{DocumentType, FiscalEnvironment};

#[derive(Debug, Deserialize)]
pub struct AllocateBody {
    pub document_type: DocumentType,
}

#[derive(Debug, Deserialize)]
pub struct ContingencyBody {
    pub contingency: bool,
}

#[derive(Debug, Deserialize)]
pub struct EnvironmentBody {
    pub environment: FiscalEnvironment,
}

/// POST /api/branches/:id/fiscal - at most one configuration per branch
pub async fn fiscal_create(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path(branch_id): Path<Uuid>,
    Json(new): Json<NewFiscalConfig>,
) -> ApiResult<FiscalConfig> {
    let config = state.fiscal.create_config(&ctx, branch_id, new).await?;
    Ok(ApiResponse::created(config))
}

/// GET /api/branches/:id/fiscal
pub async fn fiscal_get(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path(branch_id): Path<Uuid>,
) -> ApiResult<FiscalConfig> {
    Ok(ApiResponse::success(state.fiscal.get_config(&ctx, branch_id).await?))
}

/// POST /api/branches/:id/fiscal/allocate
///
/// ```json
/// { "document_type": "nfce" }
/// ```
pub async fn fiscal_allocate(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path(branch_id): Path<Uuid>,
    Json(body): Json<AllocateBody>,
) -> ApiResult<FiscalAllocation> {
    let allocation = state.fiscal.allocate(&ctx, branch_id, body.document_type).await?;
    Ok(ApiResponse::success(allocation))
}

/// PUT /api/branches/:id/fiscal/contingency
pub async fn fiscal_set_contingency(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path(branch_id): Path<Uuid>,
    Json(body): Json<ContingencyBody>,
) -> ApiResult<FiscalConfig> {
    let config = state
        .fiscal
        .set_contingency(&ctx, branch_id, body.contingency)
        .await?;
    Ok(ApiResponse::success(config))
}

/// PUT /api/branches/:id/fiscal/environment
pub async fn fiscal_set_environment(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path(branch_id): Path<Uuid>,
    Json(body): Json<EnvironmentBody>,
) -> ApiResult<FiscalConfig> {
    let config = state
        .fiscal
        .set_environment(&ctx, branch_id, body.environment)
        .await?;
    Ok(ApiResponse::success(config))
}
