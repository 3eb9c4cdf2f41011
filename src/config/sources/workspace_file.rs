//! Workspace config file source: config/config.toml and config/{env}.toml

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::ConfigError;
use config::File;
use std::path::Path;
use tracing::debug;

/// Selects the environment-specific overlay, e.g. `PATCHCHAIN_ENV=production`
pub const ENV_SELECTOR: &str = "PATCHCHAIN_ENV";
const DEFAULT_ENV: &str = "development";

/// Layer the workspace's base file, then the overlay for the active environment.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
    workspace_root: &Path,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let config_dir = workspace_root.join("config");
    let env_name = std::env::var(ENV_SELECTOR)
        .ok()
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| DEFAULT_ENV.to_string());

    let layers = [
        config_dir.join("config.toml"),
        config_dir.join(format!("{}.toml", env_name)),
    ];

    Ok(layers
        .iter()
        .filter(|path| path.is_file())
        .fold(builder, |builder, path| {
            debug!(config_path = %path.display(), "Layering workspace configuration");
            builder.add_source(File::from(path.as_path()).required(false))
        }))
}
