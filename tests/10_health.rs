mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::Value;

#[tokio::test]
async fn health_reports_database_state() -> Result<()> {
    let server = common::ensure_server().await?;
    let resp = reqwest::get(format!("{}/health", server.base_url)).await?;

    let status = resp.status();
    assert!(
        status == StatusCode::OK || status == StatusCode::SERVICE_UNAVAILABLE,
        "unexpected status {status}"
    );
    let body: Value = resp.json().await?;
    assert_eq!(body["success"], status == StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn tenant_routes_require_tenant_header() -> Result<()> {
    let server = common::ensure_server().await?;
    let resp = reqwest::get(format!("{}/api/branches", server.base_url)).await?;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await?;
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "TENANT_NOT_SPECIFIED");
    Ok(())
}

#[tokio::test]
async fn malformed_tenant_id_is_not_found() -> Result<()> {
    let server = common::ensure_server().await?;
    let resp = reqwest::Client::new()
        .get(format!("{}/api/tenant", server.base_url))
        .header("tenant-id", "public; DROP SCHEMA x")
        .send()
        .await?;

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = resp.json().await?;
    assert_eq!(body["code"], "NOT_FOUND");
    Ok(())
}

#[tokio::test]
async fn unknown_route_is_not_found() -> Result<()> {
    let server = common::ensure_server().await?;
    for path in ["/no/such/route", "/api/no-such-resource"] {
        let resp = reqwest::get(format!("{}{}", server.base_url, path)).await?;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{path}");
        let body: Value = resp.json().await?;
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "NOT_FOUND");
    }
    Ok(())
}
