//! ConfigLoader facade delegating to merge service.

use super::merge::service::MergeService;
use super::NodeConfig;
use config::ConfigError;
use std::path::{Path, PathBuf};

/// Configuration loader facade.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Path of the user-level config file, if a home directory is known
    pub fn global_config_path() -> Option<PathBuf> {
        super::sources::global_file::global_config_path()
    }

    /// Load configuration from files and environment.
    pub fn load(workspace_root: &Path) -> Result<NodeConfig, ConfigError> {
        MergeService::load(workspace_root)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> Result<NodeConfig, ConfigError> {
        MergeService::load_from_file(path)
    }
}
