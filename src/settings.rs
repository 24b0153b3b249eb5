//! Layered settings: board defaults, then the TOML file, then `S32SIM__*`
//! environment variables.
//!
//! `S32SIM__SIMULATION__DURATION_MS=2000` sets `simulation.duration_ms`.

use std::collections::HashMap;
use std::path::Path;

use config::{Config, Environment, File, FileFormat};
use thiserror::Error;

use s32sim_shared::config::{ConfigError, SimConfig};

pub const ENV_PREFIX: &str = "S32SIM";
const ENV_SEPARATOR: &str = "__";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Settings error: {0}")]
    Source(#[from] config::ConfigError),
    #[error(transparent)]
    Invalid(#[from] ConfigError),
}

/// Load and validate the configuration from `path` (optional) and the
/// process environment.
pub fn load_settings(path: Option<&Path>) -> Result<SimConfig, SettingsError> {
    load_settings_with_env(path, None)
}

/// As [`load_settings`], reading overrides from `env` instead of the
/// process environment when given.
pub fn load_settings_with_env(
    path: Option<&Path>,
    env: Option<HashMap<String, String>>,
) -> Result<SimConfig, SettingsError> {
    let mut builder = Config::builder();
    if let Some(path) = path {
        tracing::info!("Loading configuration from: {}", path.display());
        builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
    }
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator(ENV_SEPARATOR)
            .separator(ENV_SEPARATOR)
            .try_parsing(true)
            .source(env),
    );

    let settings = builder.build().map_err(|e| {
        tracing::error!("Failed to load settings: {}", e);
        e
    })?;
    let config: SimConfig = settings.try_deserialize()?;
    config.validate()?;
    Ok(config)
}
