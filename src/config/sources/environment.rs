//! Environment variable source: PATCHCHAIN_* prefix with __ separator

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::ConfigError;
use config::Environment;

/// Prefix of configuration environment variables, e.g. `PATCHCHAIN__STORAGE__DATA_PATH`.
pub const ENV_PREFIX: &str = "PATCHCHAIN";

/// Add environment variable overlay to builder.
/// Uses PATCHCHAIN prefix and __ as separator for nested keys.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    );
    Ok(builder)
}
