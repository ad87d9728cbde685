// handlers/mod.rs - route table
//
// Public (allow-listed, no tenant) → Protected (/api/*, tenant bound by middleware)
pub mod protected;
pub mod public;

use axum::{
    http::Uri,
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::error::ApiError;
use crate::middleware::bind_tenant;
use crate::state::AppState;

pub fn router(state: AppState, request_logging: bool) -> Router {
    // route_layer: unmatched paths reach the fallback without tenant binding
    let protected = protected_routes().route_layer(from_fn_with_state(state.binder.clone(), bind_tenant));

    let app = Router::new()
        .merge(public_routes())
        .merge(protected)
        .fallback(route_not_found)
        .with_state(state);

    if request_logging {
        app.layer(TraceLayer::new_for_http())
    } else {
        app
    }
}

async fn route_not_found(uri: Uri) -> ApiError {
    ApiError::not_found(format!("No route for {}", uri.path()))
}

fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(public::health))
        .route("/tenants/register", post(public::tenant_register))
        .route("/bootstrap/admin", post(public::admin_bootstrap))
}

fn protected_routes() -> Router<AppState> {
    use protected::*;

    Router::new()
        .route("/api/tenant", get(tenant_current))
        .route("/api/branches", get(branch_list).post(branch_create))
        .route("/api/branches/:id", get(branch_get))
        .route("/api/branches/:id/active", put(branch_set_active))
        .route("/api/branches/:id/main", put(branch_set_main))
        .route("/api/branches/:id/fiscal", get(fiscal_get).post(fiscal_create))
        .route("/api/branches/:id/fiscal/allocate", post(fiscal_allocate))
        .route("/api/branches/:id/fiscal/contingency", put(fiscal_set_contingency))
        .route("/api/branches/:id/fiscal/environment", put(fiscal_set_environment))
}
