//! Feature schema: the fixed, ordered list of fields the model expects
//!
//! The schema is resolved once at startup with explicit precedence: a
//! feature-names file written by the export step wins; otherwise the
//! versioned built-in default is used.

use crate::error::{ArtifactError, ArtifactKind};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};

/// Version tag of [`DEFAULT_FEATURES`]
pub const DEFAULT_FEATURES_VERSION: &str = "v1";

/// Built-in feature list matching the `v1` training export
pub const DEFAULT_FEATURES: [&str; 11] = [
    "Gender_Male",
    "Gender_Female",
    "Age_log",
    "Driving_License",
    "Region_Code_Encoding",
    "Previously_Insured",
    "Vehicle_Age_Encoding",
    "Vehicle_Damage_Encoding",
    "Annual_Premium",
    "Policy_Sales_Channel_Encoding",
    "Vintage",
];

/// One-hot gender flag columns
pub const MALE_FLAG: &str = "Gender_Male";
pub const FEMALE_FLAG: &str = "Gender_Female";

/// Where the active schema came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaOrigin {
    File(String),
    BuiltIn(&'static str),
    Inline,
}

impl std::fmt::Display for SchemaOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchemaOrigin::File(path) => write!(f, "file:{}", path),
            SchemaOrigin::BuiltIn(version) => write!(f, "built-in:{}", version),
            SchemaOrigin::Inline => f.write_str("inline"),
        }
    }
}

/// Column positions of the gender one-hot pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenderFlags {
    pub male: usize,
    pub female: usize,
}

/// Ordered, non-empty, duplicate-free feature names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSchema {
    names: Vec<String>,
    origin: SchemaOrigin,
    gender_flags: Option<GenderFlags>,
}

impl Default for FeatureSchema {
    fn default() -> Self {
        Self::built_in()
    }
}

impl FeatureSchema {
    /// The versioned built-in schema
    pub fn built_in() -> Self {
        let names = DEFAULT_FEATURES.iter().map(|s| s.to_string()).collect();
        Self::with_origin(names, SchemaOrigin::BuiltIn(DEFAULT_FEATURES_VERSION))
            .expect("built-in feature list is valid")
    }

    /// Build a schema from explicit names, validating the invariants
    pub fn new(names: Vec<String>) -> Result<Self, ArtifactError> {
        Self::with_origin(names, SchemaOrigin::Inline)
    }

    fn with_origin(names: Vec<String>, origin: SchemaOrigin) -> Result<Self, ArtifactError> {
        if names.is_empty() {
            return Err(ArtifactError::InvalidSchema(
                "feature list is empty".to_string(),
            ));
        }

        let mut seen = HashSet::with_capacity(names.len());
        for name in &names {
            if !seen.insert(name.as_str()) {
                return Err(ArtifactError::InvalidSchema(format!(
                    "duplicate feature name '{}'",
                    name
                )));
            }
        }

        let position = |flag: &str| names.iter().position(|n| n == flag);
        let gender_flags = match (position(MALE_FLAG), position(FEMALE_FLAG)) {
            (Some(male), Some(female)) => Some(GenderFlags { male, female }),
            _ => None,
        };

        Ok(Self {
            names,
            origin,
            gender_flags,
        })
    }

    /// Load the schema from `path` when it exists, else fall back to the built-in list
    pub fn resolve(path: &Path) -> Result<Self, ArtifactError> {
        if !path.exists() {
            debug!(path = %path.display(), "No feature names file, using built-in schema");
            let schema = Self::built_in();
            info!(origin = %schema.origin, features = schema.len(), "Feature schema resolved");
            return Ok(schema);
        }

        let content = std::fs::read_to_string(path)?;
        let names: Vec<String> = serde_json::from_str(&content)
            .map_err(|e| ArtifactError::invalid(ArtifactKind::FeatureNames, path, e))?;

        let schema = Self::with_origin(names, SchemaOrigin::File(path.display().to_string()))?;
        info!(origin = %schema.origin, features = schema.len(), "Feature schema resolved");
        Ok(schema)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn origin(&self) -> &SchemaOrigin {
        &self.origin
    }

    /// Positions of both gender flags, if the schema carries the pair
    pub fn gender_flags(&self) -> Option<GenderFlags> {
        self.gender_flags
    }
}
