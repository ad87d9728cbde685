use clap::Subcommand;
use futures::stream::{self, StreamExt};
use serde_json::json;
use uuid::Uuid;

use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::state::AppState;

#[derive(Subcommand)]
pub enum MigrateCommands {
    #[command(about = "Apply pending catalog versions to one tenant")]
    Tenant {
        #[arg(help = "Tenant ID")]
        id: Uuid,
    },

    #[command(about = "Apply pending catalog versions to every registered tenant")]
    All {
        #[arg(long, default_value_t = 4, help = "Tenants provisioned at once")]
        concurrency: usize,
    },

    #[command(about = "Show applied and pending versions for a tenant")]
    Status {
        #[arg(help = "Tenant ID")]
        id: Uuid,
    },
}

pub async fn handle(cmd: MigrateCommands, state: &AppState, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        MigrateCommands::Tenant { id } => {
            let report = state.tenants.reprovision(id).await?;
            output_success(
                &output_format,
                &format!(
                    "Namespace {}: {} applied, {} already present",
                    report.namespace,
                    report.applied.len(),
                    report.skipped
                ),
                Some(serde_json::to_value(&report)?),
            )
        }
        MigrateCommands::All { concurrency } => {
            let tenants = state.tenants.list(None).await?;
            if tenants.is_empty() {
                return output_empty_collection(&output_format, "tenants", "No tenants registered");
            }

            let service = state.tenants.clone();
            let results: Vec<_> = stream::iter(tenants)
                .map(|tenant| {
                    let service = service.clone();
                    async move { (tenant.id, service.reprovision(tenant.id).await) }
                })
                .buffer_unordered(concurrency.max(1))
                .collect()
                .await;

            let mut failed = 0usize;
            let mut rows = Vec::with_capacity(results.len());
            for (id, result) in results {
                match result {
                    Ok(report) => {
                        if let OutputFormat::Text = output_format {
                            println!("✓ {} {} applied={:?}", id, report.namespace, report.applied);
                        }
                        rows.push(json!({ "tenant_id": id, "success": true, "report": report }));
                    }
                    Err(e) => {
                        failed += 1;
                        if let OutputFormat::Text = output_format {
                            println!("✗ {} {}", id, e);
                        }
                        rows.push(json!({
                            "tenant_id": id,
                            "success": false,
                            "error": e.to_string(),
                            "version": e.failed_version(),
                        }));
                    }
                }
            }

            if let OutputFormat::Json = output_format {
                output_json(&json!({ "results": rows }))?;
            }
            if failed > 0 {
                anyhow::bail!("{failed} tenant(s) failed to migrate");
            }
            Ok(())
        }
        MigrateCommands::Status { id } => {
            let tenant = state.tenants.get(id).await?;
            let provisioner = state.tenants.provisioner();
            let applied = provisioner.applied_migrations(&tenant.namespace).await?;
            let pending = provisioner.pending_versions(&tenant.namespace).await?;

            match output_format {
                OutputFormat::Json => output_json(&json!({
                    "tenant_id": tenant.id,
                    "namespace": tenant.namespace,
                    "applied": applied,
                    "pending": pending,
                })),
                OutputFormat::Text => {
                    println!("Namespace {}", tenant.namespace);
                    for record in &applied {
                        println!(
                            "  {} {:<28} {}",
                            record.version,
                            record.description,
                            record.applied_at.format("%Y-%m-%d %H:%M")
                        );
                    }
                    if pending.is_empty() {
                        println!("  up to date");
                    } else {
                        println!("  pending: {}", pending.join(", "));
                    }
                    Ok(())
                }
            }
        }
    }
}
