//! Submit a record for scoring

use anyhow::{bail, Context, Result};
use colored::Colorize;
use serde_json::{Map, Value};
use std::io::Read;
use std::path::Path;
use tabled::Tabled;

use crate::client::{ApiClient, PredictResponse};
use crate::output::{
    color_label, format_probability, print_info, print_json, print_success, OutputFormat,
};

/// Row for the prediction table
#[derive(Tabled)]
struct PredictionRow {
    #[tabled(rename = "Prediction")]
    prediction: String,
    #[tabled(rename = "Probability")]
    probability: String,
    #[tabled(rename = "Features Used")]
    features: usize,
}

/// Where the request payload comes from
pub enum PayloadSource<'a> {
    Fields(&'a [String]),
    File(&'a Path),
    Stdin,
}

/// Score one record (or a batch; the service answers for the first row)
pub async fn predict(
    client: &ApiClient,
    source: PayloadSource<'_>,
    format: OutputFormat,
) -> Result<()> {
    let payload = build_payload(source)?;
    if let Value::Array(items) = &payload {
        if items.len() > 1 {
            print_info(&format!(
                "Submitting {} records; only the first is scored",
                items.len()
            ));
        }
    }

    let result: PredictResponse = client.post("predict", &payload).await?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            let row = PredictionRow {
                prediction: color_label(&result.prediction),
                probability: format_probability(result.probability),
                features: result.used_features.len(),
            };
            let table = tabled::Table::new([row])
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", table);

            if result.prediction == "YES" {
                print_success("Customer is a cross-sell candidate");
            } else {
                println!("{}", "Customer is not a cross-sell candidate".dimmed());
            }
        }
    }

    Ok(())
}

fn build_payload(source: PayloadSource<'_>) -> Result<Value> {
    match source {
        PayloadSource::Fields(fields) => fields_to_record(fields),
        PayloadSource::File(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            parse_document(&content)
        }
        PayloadSource::Stdin => {
            let mut content = String::new();
            std::io::stdin()
                .read_to_string(&mut content)
                .context("Failed to read stdin")?;
            parse_document(&content)
        }
    }
}

fn parse_document(content: &str) -> Result<Value> {
    serde_json::from_str(content).context("Input is not valid JSON")
}

/// Build a record from `NAME=VALUE` pairs.
///
/// Values that parse as JSON (numbers, booleans) keep their type, anything
/// else is sent as a string and left to the service to coerce.
pub fn fields_to_record(fields: &[String]) -> Result<Value> {
    let mut record = Map::new();
    for field in fields {
        let Some((name, raw)) = field.split_once('=') else {
            bail!("Invalid field '{}', expected NAME=VALUE", field);
        };
        let name = name.trim();
        if name.is_empty() {
            bail!("Invalid field '{}', name is empty", field);
        }

        let value = serde_json::from_str::<Value>(raw.trim())
            .unwrap_or_else(|_| Value::String(raw.to_string()));
        record.insert(name.to_string(), value);
    }
    Ok(Value::Object(record))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_fields_keep_numeric_types() {
        let record = fields_to_record(&fields(&["Age_log=3.2", "Previously_Insured=0"])).unwrap();
        assert_eq!(record, json!({"Age_log": 3.2, "Previously_Insured": 0}));
    }

    #[test]
    fn test_non_numeric_field_sent_as_string() {
        let record = fields_to_record(&fields(&["Age_log=abc"])).unwrap();
        assert_eq!(record, json!({"Age_log": "abc"}));
    }

    #[test]
    fn test_later_field_wins() {
        let record = fields_to_record(&fields(&["Vintage=1", "Vintage=2"])).unwrap();
        assert_eq!(record, json!({"Vintage": 2}));
    }

    #[test]
    fn test_malformed_field_rejected() {
        assert!(fields_to_record(&fields(&["Vintage"])).is_err());
        assert!(fields_to_record(&fields(&["=3"])).is_err());
    }

    #[test]
    fn test_file_payload_parsed() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("batch.json");
        std::fs::write(&path, r#"[{"Age_log": 3.1}, {"Age_log": 2.0}]"#).unwrap();

        let payload = build_payload(PayloadSource::File(&path)).unwrap();
        assert_eq!(payload.as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn test_invalid_file_payload_is_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{\"Age_log\": ").unwrap();

        assert!(build_payload(PayloadSource::File(&path)).is_err());
    }
}
