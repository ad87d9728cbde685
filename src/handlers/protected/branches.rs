// handlers/protected/branches.rs - /api/branches handlers

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::database::context::TenantContext;
use crate::database::models::{Branch, NewBranch};
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ActiveBody {
    pub active: bool,
}

/// GET /api/branches
pub async fn branch_list(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
) -> ApiResult<Vec<Branch>> {
    Ok(ApiResponse::success(state.branches.list(&ctx).await?))
}

/// POST /api/branches - fails with 422 once the tenant's branch quota is used up
pub async fn branch_create(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Json(new): Json<NewBranch>,
) -> ApiResult<Branch> {
    let branch = state.branches.create(&ctx, new).await?;
    Ok(ApiResponse::created(branch))
}

/// GET /api/branches/:id
pub async fn branch_get(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Branch> {
    Ok(ApiResponse::success(state.branches.get(&ctx, id).await?))
}

/// PUT /api/branches/:id/active
pub async fn branch_set_active(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<Uuid>,
    Json(body): Json<ActiveBody>,
) -> ApiResult<Branch> {
    let branch = state.branches.set_active(&ctx, id, body.active).await?;
    Ok(ApiResponse::success(branch))
}

/// PUT /api/branches/:id/main
pub async fn branch_set_main(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Branch> {
    Ok(ApiResponse::success(state.branches.set_main(&ctx, id).await?))
}
