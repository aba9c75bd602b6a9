//! Cross-Sell Risk CLI
//!
//! A command-line tool for checking the risk inference service and
//! submitting customer records for scoring.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{ArgGroup, Parser, Subcommand};
use commands::{health, predict};
use std::path::PathBuf;

/// Cross-Sell Risk CLI
#[derive(Parser)]
#[command(name = "riskctl")]
#[command(author, version, about = "CLI for the Cross-Sell Risk inference service", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via RISK_API_URL env var)
    #[arg(long, env = "RISK_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show service status and expected features
    Health,

    /// Score a customer record
    #[command(group(ArgGroup::new("input").args(["field", "file"])))]
    Predict {
        /// Feature value as NAME=VALUE (repeatable)
        #[arg(long, short = 'F', value_name = "NAME=VALUE")]
        field: Vec<String>,

        /// JSON file holding a record or an array of records
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = config::Config::load()?;
    let api_url = config.resolve_api_url(cli.api_url);

    // Initialize client
    let client = client::ApiClient::new(&api_url)?;

    // Execute command
    match cli.command {
        Commands::Health => {
            health::show_health(&client, cli.format).await?;
        }
        Commands::Predict { field, file } => {
            let source = match (&file, field.is_empty()) {
                (Some(path), _) => predict::PayloadSource::File(path),
                (None, false) => predict::PayloadSource::Fields(&field),
                (None, true) => predict::PayloadSource::Stdin,
            };
            predict::predict(&client, source, cli.format).await?;
        }
    }

    Ok(())
}
