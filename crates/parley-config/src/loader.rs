//! Configuration loader with layered sources.

use crate::AppConfig;
use config::{Config, ConfigError, Environment, File};
use parley_core::ParleyError;
use std::path::Path;
use tracing::{debug, info};

/// Loads configuration from layered sources.
///
/// Sources are applied in order, later sources overriding earlier ones:
/// 1. `config/default.toml`
/// 2. `config/{environment}.toml`
/// 3. `config/local.toml` (not committed to version control)
/// 4. Environment variables with the `PARLEY_` prefix and `__` nesting,
///    e.g. `PARLEY_DATABASE__HOST` or `PARLEY_CACHE__TTL_SECS`.
///
/// A `.env` file in the working directory is honored before any source
/// is read.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads configuration from the default location (`./config`).
    pub fn from_default_location() -> Result<AppConfig, ParleyError> {
        Self::load("./config")
    }

    /// Loads configuration from the specified directory.
    pub fn load(config_dir: &str) -> Result<AppConfig, ParleyError> {
        if let Err(e) = dotenvy::dotenv() {
            debug!("No .env file found or error loading it: {}", e);
        }

        let environment =
            std::env::var("PARLEY_ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        info!("Loading configuration for environment: {}", environment);

        let mut builder = Config::builder();

        let default_path = format!("{}/default.toml", config_dir);
        if Path::new(&default_path).exists() {
            debug!("Loading default config from: {}", default_path);
            builder = builder.add_source(File::with_name(&default_path).required(false));
        }

        let env_path = format!("{}/{}.toml", config_dir, environment);
        if Path::new(&env_path).exists() {
            debug!("Loading environment config from: {}", env_path);
            builder = builder.add_source(File::with_name(&env_path).required(false));
        }

        let local_path = format!("{}/local.toml", config_dir);
        if Path::new(&local_path).exists() {
            debug!("Loading local config from: {}", local_path);
            builder = builder.add_source(File::with_name(&local_path).required(false));
        }

        builder = builder.add_source(
            Environment::with_prefix("PARLEY")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().map_err(config_error_to_parley_error)?;

        let app_config: AppConfig = config
            .try_deserialize()
            .map_err(config_error_to_parley_error)?;

        Self::validate_config(&app_config)?;

        Ok(app_config)
    }

    /// Validates the configuration.
    fn validate_config(config: &AppConfig) -> Result<(), ParleyError> {
        if config.database.host.is_empty() {
            return Err(ParleyError::Configuration(
                "Database host is required".to_string(),
            ));
        }
        if config.database.name.is_empty() {
            return Err(ParleyError::Configuration(
                "Database name is required".to_string(),
            ));
        }
        Ok(())
    }
}

fn config_error_to_parley_error(err: ConfigError) -> ParleyError {
    ParleyError::Configuration(err.to_string())
}
