use anyhow::Context;
use clap::Subcommand;
use serde_json::json;
use uuid::Uuid;

use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::database::models::{NewTenant, Tenant, TenantUpdate};
use crate::state::AppState;
use crate::types::{PlanType, TenantStatus};

#[derive(Subcommand)]
pub enum TenantCommands {
    #[command(about = "Register a tenant and provision its namespace")]
    Create {
        #[arg(help = "Tenant display name")]
        name: String,
        #[arg(help = "Legal document number (CNPJ)")]
        document: String,
        #[arg(long, default_value = "basic", help = "basic | professional | enterprise")]
        plan: PlanType,
        #[arg(long, help = "Branch quota (defaults to TENANCY_DEFAULT_MAX_BRANCHES)")]
        max_branches: Option<i32>,
    },

    #[command(about = "List tenants")]
    List {
        #[arg(long, help = "Only tenants with this status")]
        status: Option<TenantStatus>,
    },

    #[command(about = "Show tenant information")]
    Show {
        #[arg(help = "Tenant ID or document number")]
        tenant: String,
    },

    #[command(about = "Change name, plan or branch quota")]
    Update {
        #[arg(help = "Tenant ID or document number")]
        tenant: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        plan: Option<PlanType>,
        #[arg(long)]
        max_branches: Option<i32>,
    },

    #[command(about = "Allow the tenant to resolve again")]
    Activate {
        #[arg(help = "Tenant ID or document number")]
        tenant: String,
    },

    #[command(about = "Stop resolving the tenant")]
    Deactivate {
        #[arg(help = "Tenant ID or document number")]
        tenant: String,
    },

    #[command(about = "Block the tenant")]
    Block {
        #[arg(help = "Tenant ID or document number")]
        tenant: String,
    },

    #[command(about = "Remove the tenant from the registry; its namespace is kept")]
    Delete {
        #[arg(help = "Tenant ID or document number")]
        tenant: String,
    },
}

pub async fn handle(cmd: TenantCommands, state: &AppState, output_format: OutputFormat) -> anyhow::Result<()> {
    let service = &state.tenants;

    match cmd {
        TenantCommands::Create {
            name,
            document,
            plan,
            max_branches,
        } => {
            let tenant = service
                .create_tenant(NewTenant {
                    name,
                    document,
                    plan,
                    max_branches,
                })
                .await?;
            output_tenant(&output_format, &format!("Tenant '{}' created", tenant.name), &tenant)
        }
        TenantCommands::List { status } => {
            let tenants = service.list(status).await?;
            if tenants.is_empty() {
                return output_empty_collection(&output_format, "tenants", "No tenants registered");
            }

            match output_format {
                OutputFormat::Json => output_json(&json!({ "tenants": tenants })),
                OutputFormat::Text => {
                    println!(
                        "{:<38} {:<25} {:<16} {:<9} {:<13} {}",
                        "ID", "NAME", "DOCUMENT", "STATUS", "PLAN", "NAMESPACE"
                    );
                    println!("{}", "-".repeat(120));
                    for t in &tenants {
                        println!(
                            "{:<38} {:<25} {:<16} {:<9} {:<13} {}",
                            t.id, t.name, t.document, t.status, t.plan, t.namespace
                        );
                    }
                    Ok(())
                }
            }
        }
        TenantCommands::Show { tenant } => {
            let tenant = lookup(state, &tenant).await?;
            match output_format {
                OutputFormat::Json => output_json(&tenant),
                OutputFormat::Text => {
                    println!("ID:           {}", tenant.id);
                    println!("Name:         {}", tenant.name);
                    println!("Document:     {}", tenant.document);
                    println!("Status:       {}", tenant.status);
                    println!("Plan:         {}", tenant.plan);
                    println!("Max branches: {}", tenant.max_branches);
                    println!("Namespace:    {}", tenant.namespace);
                    println!("Created:      {}", tenant.created_at.format("%Y-%m-%d %H:%M"));
                    Ok(())
                }
            }
        }
        TenantCommands::Update {
            tenant,
            name,
            plan,
            max_branches,
        } => {
            let id = lookup(state, &tenant).await?.id;
            let tenant = service
                .update(
                    id,
                    TenantUpdate {
                        name,
                        plan,
                        max_branches,
                    },
                )
                .await?;
            output_tenant(&output_format, &format!("Tenant '{}' updated", tenant.name), &tenant)
        }
        TenantCommands::Activate { tenant } => {
            let id = lookup(state, &tenant).await?.id;
            let tenant = service.activate(id).await?;
            output_tenant(&output_format, &format!("Tenant '{}' activated", tenant.name), &tenant)
        }
        TenantCommands::Deactivate { tenant } => {
            let id = lookup(state, &tenant).await?.id;
            let tenant = service.deactivate(id).await?;
            output_tenant(&output_format, &format!("Tenant '{}' deactivated", tenant.name), &tenant)
        }
        TenantCommands::Block { tenant } => {
            let id = lookup(state, &tenant).await?.id;
            let tenant = service.block(id).await?;
            output_tenant(&output_format, &format!("Tenant '{}' blocked", tenant.name), &tenant)
        }
        TenantCommands::Delete { tenant } => {
            let tenant = lookup(state, &tenant).await?;
            let namespace = service.delete(tenant.id).await?;
            output_success(
                &output_format,
                &format!(
                    "Tenant '{}' removed from registry; namespace {} retained",
                    tenant.name, namespace
                ),
                Some(json!({ "id": tenant.id, "namespace": namespace })),
            )
        }
    }
}

/// Accept either a tenant id or a document number.
async fn lookup(state: &AppState, key: &str) -> anyhow::Result<Tenant> {
    let tenant = match Uuid::parse_str(key.trim()) {
        Ok(id) => state.tenants.get(id).await,
        Err(_) => state.tenants.get_by_document(key).await,
    };
    tenant.with_context(|| format!("looking up tenant '{key}'"))
}

fn output_tenant(output_format: &OutputFormat, message: &str, tenant: &Tenant) -> anyhow::Result<()> {
    output_success(output_format, message, Some(serde_json::to_value(tenant)?))?;
    if let OutputFormat::Text = output_format {
        println!("  id={} namespace={} status={}", tenant.id, tenant.namespace, tenant.status);
    }
    Ok(())
}
