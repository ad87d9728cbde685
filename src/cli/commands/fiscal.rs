use anyhow::Context;
use clap::Subcommand;
use uuid::Uuid;

use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::state::AppState;
use crate::types::DocumentType;

#[derive(Subcommand)]
pub enum FiscalCommands {
    #[command(about = "Allocate the next invoice number for a branch")]
    Allocate {
        #[arg(help = "Tenant ID")]
        tenant: Uuid,
        #[arg(help = "Branch ID")]
        branch: Uuid,
        #[arg(help = "nfe | nfce (or model 55 | 65)")]
        document_type: DocumentType,
    },

    #[command(about = "Show a branch's fiscal configuration")]
    Show {
        #[arg(help = "Tenant ID")]
        tenant: Uuid,
        #[arg(help = "Branch ID")]
        branch: Uuid,
    },
}

pub async fn handle(cmd: FiscalCommands, state: &AppState, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        FiscalCommands::Allocate {
            tenant,
            branch,
            document_type,
        } => {
            let ctx = state
                .binder
                .resolver()
                .resolve(Some(&tenant.to_string()))
                .await
                .context("resolving tenant")?;
            let allocation = state.fiscal.allocate(&ctx, branch, document_type).await?;
            output_success(
                &output_format,
                &format!(
                    "{} series {} number {}{}",
                    allocation.document_type,
                    allocation.series,
                    allocation.number,
                    if allocation.contingency { " (contingency)" } else { "" }
                ),
                Some(serde_json::to_value(&allocation)?),
            )
        }
        FiscalCommands::Show { tenant, branch } => {
            let ctx = state
                .binder
                .resolver()
                .resolve(Some(&tenant.to_string()))
                .await
                .context("resolving tenant")?;
            let config = state.fiscal.get_config(&ctx, branch).await?;
            match output_format {
                OutputFormat::Json => output_json(&config),
                OutputFormat::Text => {
                    println!("Branch:       {}", config.branch_id);
                    println!("Environment:  {}", config.environment);
                    println!("NF-e:         series {} next {}", config.nfe_series, config.nfe_next_number);
                    println!("NFC-e:        series {} next {}", config.nfce_series, config.nfce_next_number);
                    println!("Contingency:  {}", config.contingency);
                    Ok(())
                }
            }
        }
    }
}
