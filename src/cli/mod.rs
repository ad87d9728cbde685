pub mod commands;
pub mod utils;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::config::config;
use crate::database::DatabaseManager;
use crate::services::TenantRegistry;
use crate::state::AppState;

#[derive(Parser)]
#[command(name = "erp-admin")]
#[command(about = "Operator CLI for ERP tenant management")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Tenant registration and lifecycle")]
    Tenant {
        #[command(subcommand)]
        cmd: commands::tenant::TenantCommands,
    },

    #[command(about = "Apply the migration catalog to tenant namespaces")]
    Migrate {
        #[command(subcommand)]
        cmd: commands::migrate::MigrateCommands,
    },

    #[command(about = "Fiscal numbering")]
    Fiscal {
        #[command(subcommand)]
        cmd: commands::fiscal::FiscalCommands,
    },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

/// Pool, registry tables and services for one CLI invocation.
async fn connect() -> anyhow::Result<AppState> {
    let config = config();
    let pool = DatabaseManager::connect_lazy(&config.database).context("database configuration")?;
    TenantRegistry::new(pool.clone())
        .ensure_schema()
        .await
        .context("tenant registry setup")?;
    AppState::build(pool, config)
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let state = connect().await?;

    match cli.command {
        Commands::Tenant { cmd } => commands::tenant::handle(cmd, &state, output_format).await,
        Commands::Migrate { cmd } => commands::migrate::handle(cmd, &state, output_format).await,
        Commands::Fiscal { cmd } => commands::fiscal::handle(cmd, &state, output_format).await,
    }
}
