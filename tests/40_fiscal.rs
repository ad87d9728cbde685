mod common;

use anyhow::Result;
use erp_tenancy::database::models::{NewBranch, NewFiscalConfig};
use erp_tenancy::services::TenancyError;
use erp_tenancy::types::{DocumentType, FiscalEnvironment};
use futures::future::join_all;

fn branch(name: &str) -> NewBranch {
    NewBranch {
        name: name.to_string(),
        document: None,
    }
}

#[tokio::test]
async fn concurrent_allocations_are_distinct_and_consecutive() -> Result<()> {
    let Some(pool) = common::test_pool(8).await? else { return Ok(()) };
    let state = common::test_state(&pool)?;

    let tenant = state.tenants.create_tenant(common::new_tenant("Loja Fiscal", 1)).await?;
    let ctx = tenant.context();
    let main = state.branches.create(&ctx, branch("Matriz")).await?;
    state
        .fiscal
        .create_config(
            &ctx,
            main.id,
            NewFiscalConfig {
                nfce_first_number: 100,
                ..NewFiscalConfig::default()
            },
        )
        .await?;

    const CALLS: i64 = 25;
    let results = join_all((0..CALLS).map(|_| state.fiscal.allocate_next(&ctx, main.id, DocumentType::Nfce))).await;
    let mut numbers = results.into_iter().collect::<Result<Vec<i64>, _>>()?;
    numbers.sort_unstable();
    assert_eq!(numbers, (100..100 + CALLS).collect::<Vec<_>>());

    let config = state.fiscal.get_config(&ctx, main.id).await?;
    assert_eq!(config.nfce_next_number, 100 + CALLS);
    // The other document type has its own counter.
    assert_eq!(config.nfe_next_number, 1);
    assert_eq!(state.fiscal.allocate_next(&ctx, main.id, DocumentType::Nfe).await?, 1);

    common::cleanup(&pool, &[&tenant]).await
}

#[tokio::test]
async fn allocation_reports_contingency_and_environment() -> Result<()> {
    let Some(pool) = common::test_pool(5).await? else { return Ok(()) };
    let state = common::test_state(&pool)?;

    let tenant = state.tenants.create_tenant(common::new_tenant("Loja Offline", 1)).await?;
    let ctx = tenant.context();
    let main = state.branches.create(&ctx, branch("Matriz")).await?;
    state.fiscal.create_config(&ctx, main.id, NewFiscalConfig::default()).await?;

    let first = state.fiscal.allocate(&ctx, main.id, DocumentType::Nfe).await?;
    assert!(!first.contingency);
    assert_eq!(first.environment, FiscalEnvironment::Homologation);

    state.fiscal.set_contingency(&ctx, main.id, true).await?;
    let config = state
        .fiscal
        .set_environment(&ctx, main.id, FiscalEnvironment::Production)
        .await?;
    assert!(config.contingency);
    assert_eq!(config.nfe_next_number, first.number + 1);

    let second = state.fiscal.allocate(&ctx, main.id, DocumentType::Nfe).await?;
    assert!(second.contingency);
    assert_eq!(second.environment, FiscalEnvironment::Production);
    assert_eq!(second.number, first.number + 1);

    common::cleanup(&pool, &[&tenant]).await
}

#[tokio::test]
async fn configuration_rules() -> Result<()> {
    let Some(pool) = common::test_pool(5).await? else { return Ok(()) };
    let state = common::test_state(&pool)?;

    let tenant = state.tenants.create_tenant(common::new_tenant("Loja Config", 1)).await?;
    let ctx = tenant.context();
    let main = state.branches.create(&ctx, branch("Matriz")).await?;

    let missing = uuid::Uuid::new_v4();
    let err = state
        .fiscal
        .create_config(&ctx, missing, NewFiscalConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, TenancyError::BranchNotFound(_)));

    let zero = NewFiscalConfig {
        nfe_first_number: 0,
        ..NewFiscalConfig::default()
    };
    let err = state.fiscal.create_config(&ctx, main.id, zero).await.unwrap_err();
    assert!(matches!(err, TenancyError::InvalidInput(_)));

    state.fiscal.create_config(&ctx, main.id, NewFiscalConfig::default()).await?;
    let err = state
        .fiscal
        .create_config(&ctx, main.id, NewFiscalConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, TenancyError::FiscalConfigExists(id) if id == main.id));

    common::cleanup(&pool, &[&tenant]).await
}
