//! Service health and feature contract

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;

use crate::client::{ApiClient, HealthResponse};
use crate::output::{color_status, print_json, OutputFormat};

/// Row for the expected-features table
#[derive(Tabled)]
struct FeatureRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Feature")]
    name: String,
}

/// Show service status and the feature names it expects
pub async fn show_health(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let health: HealthResponse = client.get("health").await?;

    match format {
        OutputFormat::Json => print_json(&health)?,
        OutputFormat::Table => {
            println!("{}", "Service Health".bold());
            println!("{}", "=".repeat(40));
            println!("Server: {}", client.base_url().as_str().cyan());
            println!("Status: {}", color_status(&health.status));
            println!();

            let rows: Vec<FeatureRow> = health
                .features_expected
                .iter()
                .enumerate()
                .map(|(i, name)| FeatureRow {
                    index: i + 1,
                    name: name.clone(),
                })
                .collect();

            let table = tabled::Table::new(rows)
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", table);
            println!("\nTotal: {} features", health.features_expected.len());
        }
    }

    Ok(())
}
