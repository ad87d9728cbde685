use axum::{
    extract::{Request, State},
    http::HeaderName,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::database::context::TenantContext;
use crate::error::ApiError;
use crate::services::resolver::{is_public_operation, TenantResolver};

/// Tenant identifier asserted by an upstream authentication layer. Takes
/// precedence over the request header.
#[derive(Clone, Debug)]
pub struct TenantClaim(pub String);

/// State for [`bind_tenant`]: the resolver plus the header it reads.
#[derive(Clone)]
pub struct TenantBinder {
    resolver: Arc<TenantResolver>,
    header: HeaderName,
}

impl TenantBinder {
    pub fn new(resolver: TenantResolver, header: HeaderName) -> Self {
        Self {
            resolver: Arc::new(resolver),
            header,
        }
    }

    pub fn resolver(&self) -> &TenantResolver {
        &self.resolver
    }

    fn identifier<'r>(&self, request: &'r Request) -> Option<&'r str> {
        if let Some(TenantClaim(claim)) = request.extensions().get::<TenantClaim>() {
            return Some(claim.as_str());
        }
        request
            .headers()
            .get(&self.header)
            .and_then(|value| value.to_str().ok())
    }
}

/// Resolve the caller's tenant and insert its [`TenantContext`] into the
/// request extensions. Allow-listed operations pass through unbound.
pub async fn bind_tenant(
    State(binder): State<TenantBinder>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if is_public_operation(request.uri().path()) {
        return Ok(next.run(request).await);
    }

    let raw = binder.identifier(&request).map(str::to_owned);
    let ctx: TenantContext = binder.resolver.resolve(raw.as_deref()).await?;
    request.extensions_mut().insert(ctx);

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::resolver::tests::{tenant, MemoryDirectory};
    use crate::types::TenantStatus;
    use axum::{body::Body, http::StatusCode, routing::get, Extension, Router};
    use std::time::Duration;
    use tower::ServiceExt;

    async fn namespace(Extension(ctx): Extension<TenantContext>) -> String {
        ctx.namespace().to_string()
    }

    fn app(directory: MemoryDirectory) -> Router {
        let resolver = TenantResolver::new(Arc::new(directory), Duration::from_millis(200));
        let binder = TenantBinder::new(resolver, HeaderName::from_static("tenant-id"));
        Router::new()
            .route("/health", get(|| async { "ok" }))
            .route("/api/tenant", get(namespace))
            .layer(axum::middleware::from_fn_with_state(binder, bind_tenant))
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn binds_context_from_header() {
        let t = tenant(TenantStatus::Active);
        let response = app(MemoryDirectory::with([t.clone()]))
            .oneshot(
                Request::builder()
                    .uri("/api/tenant")
                    .header("tenant-id", t.id.to_string())
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, t.namespace.to_string());
    }

    #[tokio::test]
    async fn claim_wins_over_header() {
        let claimed = tenant(TenantStatus::Active);
        let other = tenant(TenantStatus::Active);
        let mut request = Request::builder()
            .uri("/api/tenant")
            .header("tenant-id", other.id.to_string())
            .body(Body::empty())
            .unwrap();
        request
            .extensions_mut()
            .insert(TenantClaim(claimed.id.to_string()));

        let response = app(MemoryDirectory::with([claimed.clone(), other]))
            .oneshot(request)
            .await
            .unwrap();
        assert_eq!(body_text(response).await, claimed.namespace.to_string());
    }

    #[tokio::test]
    async fn rejections_map_to_statuses() {
        let blocked = tenant(TenantStatus::Blocked);
        let router = app(MemoryDirectory::with([blocked.clone()]));

        let cases = [
            (None, StatusCode::BAD_REQUEST),
            (Some(uuid::Uuid::new_v4().to_string()), StatusCode::NOT_FOUND),
            (Some(blocked.id.to_string()), StatusCode::FORBIDDEN),
        ];
        for (header, expected) in cases {
            let mut builder = Request::builder().uri("/api/tenant");
            if let Some(value) = header {
                builder = builder.header("tenant-id", value);
            }
            let response = router
                .clone()
                .oneshot(builder.body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), expected);
        }
    }

    #[tokio::test]
    async fn public_operations_skip_resolution() {
        let response = app(MemoryDirectory::default())
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
