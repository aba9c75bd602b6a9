//! Server configuration

use anyhow::{Context, Result};
use inference_lib::ArtifactPaths;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable naming an optional config file
pub const CONFIG_FILE_ENV: &str = "RISK_CONFIG_FILE";

/// Config file looked up (without extension) when none is named
const DEFAULT_CONFIG_NAME: &str = "risk-server";

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Instance name attached to structured log events
    #[serde(default = "default_instance_name")]
    pub instance_name: String,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory holding the exported model artifacts
    #[serde(default = "default_artifacts_dir")]
    pub artifacts_dir: PathBuf,

    /// Optional feature-name list; overrides the built-in schema when present
    #[serde(default = "default_feature_names_file")]
    pub feature_names_file: String,

    #[serde(default = "default_scaler_file")]
    pub scaler_file: String,

    /// `.onnx` graph, or `.json` logistic export
    #[serde(default = "default_model_file")]
    pub model_file: String,

    #[serde(default = "default_calibration_features_file")]
    pub calibration_features_file: String,

    #[serde(default = "default_calibration_labels_file")]
    pub calibration_labels_file: String,
}

fn default_instance_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "risk-server".to_string())
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_artifacts_dir() -> PathBuf {
    PathBuf::from("artifacts")
}

fn default_feature_names_file() -> String {
    "feature_names.json".to_string()
}

fn default_scaler_file() -> String {
    "scaler.json".to_string()
}

fn default_model_file() -> String {
    "model.onnx".to_string()
}

fn default_calibration_features_file() -> String {
    "calibration_features.json".to_string()
}

fn default_calibration_labels_file() -> String {
    "calibration_labels.json".to_string()
}

impl ServerConfig {
    /// Load configuration from the optional config file and `RISK_*` environment
    pub fn load() -> Result<Self> {
        let file = std::env::var(CONFIG_FILE_ENV).ok().map(PathBuf::from);
        Self::from_sources(file.as_deref())
    }

    /// Defaults, then `file` (if any), then environment variables
    pub fn from_sources(file: Option<&Path>) -> Result<Self> {
        let file_source = match file {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name(DEFAULT_CONFIG_NAME).required(false),
        };

        let config = config::Config::builder()
            .add_source(file_source)
            .add_source(config::Environment::with_prefix("RISK"))
            .build()
            .context("Failed to read configuration")?;

        config
            .try_deserialize()
            .context("Invalid configuration")
    }

    /// Resolve artifact file names against the artifacts directory
    pub fn artifact_paths(&self) -> ArtifactPaths {
        let dir = &self.artifacts_dir;
        ArtifactPaths {
            feature_names: dir.join(&self.feature_names_file),
            scaler: dir.join(&self.scaler_file),
            model: dir.join(&self.model_file),
            calibration_features: dir.join(&self.calibration_features_file),
            calibration_labels: dir.join(&self.calibration_labels_file),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_values_override_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("server.toml");
        std::fs::write(
            &path,
            "port = 9090\nartifacts_dir = \"/srv/model\"\nmodel_file = \"model.json\"\n",
        )
        .unwrap();

        let config = ServerConfig::from_sources(Some(&path)).unwrap();
        assert_eq!(config.port, 9090);
        assert_eq!(config.host, "0.0.0.0");

        let paths = config.artifact_paths();
        assert_eq!(paths.model, PathBuf::from("/srv/model/model.json"));
        assert_eq!(paths.scaler, PathBuf::from("/srv/model/scaler.json"));
    }

    #[test]
    fn test_missing_named_file_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.toml");
        assert!(ServerConfig::from_sources(Some(&path)).is_err());
    }

    #[test]
    fn test_default_paths_match_library_layout() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.toml");
        std::fs::write(&path, "").unwrap();

        let config = ServerConfig::from_sources(Some(&path)).unwrap();
        assert_eq!(config.bind_addr(), format!("0.0.0.0:{}", config.port));
        assert_eq!(
            config.artifact_paths(),
            ArtifactPaths::in_dir(&config.artifacts_dir)
        );
    }
}
