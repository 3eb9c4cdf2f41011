//! Configuration System
//!
//! Layered node configuration: built-in defaults, a user-level file, workspace files and
//! `PATCHCHAIN__*` environment variables, validated before use.

use crate::error::ApiError;
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;
pub use sources::environment::ENV_PREFIX;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Data and working-temp locations
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_data_path() -> PathBuf {
    PathBuf::from("data")
}

fn default_temp_data_path() -> PathBuf {
    PathBuf::from("data/_temp")
}

/// Storage configuration
///
/// Together these directories are the only places the node may delete from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root of persisted resource data (relative paths resolve against the workspace)
    #[serde(default = "default_data_path")]
    pub data_path: PathBuf,

    /// Root of working directories used while fetching and combining
    #[serde(default = "default_temp_data_path")]
    pub temp_data_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_path: default_data_path(),
            temp_data_path: default_temp_data_path(),
        }
    }
}

impl StorageConfig {
    /// Resolve relative storage paths against `workspace_root`.
    pub fn resolve(&self, workspace_root: &Path) -> StorageConfig {
        StorageConfig {
            data_path: workspace_root.join(&self.data_path),
            temp_data_path: workspace_root.join(&self.temp_data_path),
        }
    }

    /// Validate storage configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.data_path.as_os_str().is_empty() {
            return Err("Data path cannot be empty".to_string());
        }
        if self.temp_data_path.as_os_str().is_empty() {
            return Err("Temp data path cannot be empty".to_string());
        }
        Ok(())
    }
}

/// Configuration validation errors
#[derive(Debug, Clone)]
pub enum ValidationError {
    Storage(String),
    Logging(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Storage(msg) => write!(f, "Storage: {}", msg),
            ValidationError::Logging(msg) => write!(f, "Logging: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl NodeConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(e) = self.storage.validate() {
            errors.push(ValidationError::Storage(e));
        }
        if let Err(e) = self.logging.validate() {
            errors.push(ValidationError::Logging(e));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Load, validate and resolve the configuration for a workspace
    ///
    /// An explicit `config_file` replaces the global and workspace files.
    pub fn load_for(workspace_root: &Path, config_file: Option<&Path>) -> Result<Self, ApiError> {
        let mut config = match config_file {
            Some(path) => ConfigLoader::load_from_file(path)?,
            None => ConfigLoader::load(workspace_root)?,
        };

        config.validate().map_err(|errors| {
            let error_msgs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            ApiError::ConfigError(format!(
                "Configuration validation failed:\n{}",
                error_msgs.join("\n")
            ))
        })?;

        config.storage = config.storage.resolve(workspace_root);
        Ok(config)
    }
}
