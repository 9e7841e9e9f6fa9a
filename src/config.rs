//! Configuration System
//!
//! Layered configuration for the staging engine and CLI: property prefix,
//! validation policy, and logging. Sources merge in a fixed order (see
//! [`ConfigLoader`]) and the result is validated as a whole.

use crate::error::ApiError;
use crate::logging::LoggingConfig;
use crate::types::DEFAULT_PROPERTY_PREFIX;
use crate::validation::ValidationPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QStageConfig {
    #[serde(default)]
    pub properties: PropertiesConfig,

    #[serde(default)]
    pub validation: ValidationPolicy,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// How scheduler property keys are named
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertiesConfig {
    /// Prefix shared by every scheduler property key, including the trailing dot
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

fn default_prefix() -> String {
    DEFAULT_PROPERTY_PREFIX.to_string()
}

impl Default for PropertiesConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
        }
    }
}

impl PropertiesConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.prefix.is_empty() {
            return Err("Property prefix cannot be empty".to_string());
        }
        if !self.prefix.ends_with('.') {
            return Err(format!(
                "Property prefix '{}' must end with '.'",
                self.prefix
            ));
        }
        Ok(())
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigIssue {
    Properties(String),
    Validation(String),
    Logging(String),
}

impl std::fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigIssue::Properties(msg) => write!(f, "Properties: {}", msg),
            ConfigIssue::Validation(msg) => write!(f, "Validation: {}", msg),
            ConfigIssue::Logging(msg) => write!(f, "Logging: {}", msg),
        }
    }
}

impl std::error::Error for ConfigIssue {}

impl QStageConfig {
    /// Validate the entire configuration, reporting every problem.
    pub fn validate(&self) -> Result<(), Vec<ConfigIssue>> {
        let mut errors = Vec::new();
        if let Err(e) = self.properties.validate() {
            errors.push(ConfigIssue::Properties(e));
        }
        if let Err(e) = self.validation.validate() {
            errors.push(ConfigIssue::Validation(e));
        }
        if let Err(e) = self.logging.validate() {
            errors.push(ConfigIssue::Logging(e));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Load for a workspace and validate, folding problems into one error.
    pub fn load_validated(workspace_root: &Path) -> Result<Self, ApiError> {
        let config = ConfigLoader::load(workspace_root)?;
        config.ensure_valid()?;
        Ok(config)
    }

    pub fn ensure_valid(&self) -> Result<(), ApiError> {
        self.validate().map_err(|errors| {
            let error_msgs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            ApiError::ConfigError(format!(
                "Configuration validation failed:\n{}",
                error_msgs.join("\n")
            ))
        })
    }
}
