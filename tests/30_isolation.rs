mod common;

use anyhow::Result;
use erp_tenancy::database::models::NewBranch;
use erp_tenancy::database::{Scope, TenantExecutor};
use erp_tenancy::services::TenancyError;
use sqlx::PgConnection;

fn branch(name: &str) -> NewBranch {
    NewBranch {
        name: name.to_string(),
        document: None,
    }
}

async fn branch_names(conn: &mut PgConnection) -> Result<Vec<String>> {
    // Unqualified on purpose: visibility comes from search_path alone.
    Ok(sqlx::query_scalar("SELECT name FROM branches ORDER BY name")
        .fetch_all(conn)
        .await?)
}

async fn backend_pid(conn: &mut PgConnection) -> Result<i32> {
    Ok(sqlx::query_scalar("SELECT pg_backend_pid()").fetch_one(conn).await?)
}

fn path_is(path: &str, expected: &str) -> bool {
    path.trim().trim_matches('"') == expected
}

#[tokio::test]
async fn one_pooled_connection_never_leaks_between_tenants() -> Result<()> {
    // A single connection forces every acquisition below to reuse it.
    let Some(pool) = common::test_pool(1).await? else { return Ok(()) };
    let state = common::test_state(&pool)?;
    let executor = TenantExecutor::new(pool.clone());

    let a = state.tenants.create_tenant(common::new_tenant("Loja A", 1)).await?;
    let b = state.tenants.create_tenant(common::new_tenant("Loja B", 1)).await?;
    let (ctx_a, ctx_b) = (a.context(), b.context());
    state.branches.create(&ctx_a, branch("Matriz A")).await?;
    state.branches.create(&ctx_b, branch("Matriz B")).await?;

    let pid = {
        let mut conn = executor.acquire(&ctx_a).await?;
        assert_eq!(branch_names(&mut conn).await?, ["Matriz A"]);
        backend_pid(&mut conn).await?
    };
    {
        let mut conn = executor.acquire(&ctx_b).await?;
        assert_eq!(backend_pid(&mut conn).await?, pid);
        assert_eq!(branch_names(&mut conn).await?, ["Matriz B"]);
    }

    // Leave tenant A's scope on the raw connection, then hand it to B.
    {
        let mut raw = pool.acquire().await?;
        sqlx::query(&format!("SET search_path TO {}", a.namespace.quoted()))
            .execute(&mut *raw)
            .await?;
    }
    {
        let mut conn = executor.acquire(&ctx_b).await?;
        let path = TenantExecutor::current_search_path(&mut conn).await?;
        assert!(path_is(&path, b.namespace.as_str()), "search_path was {path}");
        assert_eq!(branch_names(&mut conn).await?, ["Matriz B"]);
    }

    common::cleanup(&pool, &[&a, &b]).await
}

#[tokio::test]
async fn transaction_scope_ends_with_transaction() -> Result<()> {
    let Some(pool) = common::test_pool(1).await? else { return Ok(()) };
    let state = common::test_state(&pool)?;
    let executor = TenantExecutor::new(pool.clone());

    let tenant = state.tenants.create_tenant(common::new_tenant("Loja Tx", 1)).await?;
    let ctx = tenant.context();

    {
        let mut conn = executor.acquire(Scope::Shared).await?;
        let path = TenantExecutor::current_search_path(&mut conn).await?;
        assert!(path_is(&path, "public"), "search_path was {path}");
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tenants WHERE id = $1")
            .bind(tenant.id)
            .fetch_one(&mut *conn)
            .await?;
        assert_eq!(count, 1);
    }

    let mut tx = executor.begin(&ctx).await?;
    let path = TenantExecutor::current_search_path(&mut tx).await?;
    assert!(path_is(&path, tenant.namespace.as_str()), "search_path was {path}");
    tx.commit().await?;

    let mut raw = pool.acquire().await?;
    let path = TenantExecutor::current_search_path(&mut raw).await?;
    assert!(path_is(&path, "public"), "search_path was {path}");
    drop(raw);

    common::cleanup(&pool, &[&tenant]).await
}

#[tokio::test]
async fn rows_of_one_tenant_are_not_found_from_another() -> Result<()> {
    let Some(pool) = common::test_pool(5).await? else { return Ok(()) };
    let state = common::test_state(&pool)?;

    let a = state.tenants.create_tenant(common::new_tenant("Loja A", 1)).await?;
    let b = state.tenants.create_tenant(common::new_tenant("Loja B", 1)).await?;
    let branch_a = state.branches.create(&a.context(), branch("Matriz A")).await?;

    let err = state.branches.get(&b.context(), branch_a.id).await.unwrap_err();
    assert!(matches!(err, TenancyError::BranchNotFound(id) if id == branch_a.id));
    assert_eq!(state.branches.count(&b.context()).await?, 0);

    common::cleanup(&pool, &[&a, &b]).await
}
