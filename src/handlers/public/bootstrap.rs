// handlers/public/bootstrap.rs - POST /bootstrap/admin handler

use axum::{extract::State, Json};

use crate::database::models::{NewAdmin, User};
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

/// Create the first admin of a tenant. Closed once the tenant has any user.
pub async fn admin_bootstrap(
    State(state): State<AppState>,
    Json(new): Json<NewAdmin>,
) -> ApiResult<User> {
    let user = state.bootstrap.bootstrap_admin(new).await?;
    Ok(ApiResponse::created(user))
}
