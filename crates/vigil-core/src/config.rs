//! Configuration loading
//!
//! Configuration types are plain serde structs with defaults. Loading follows
//! one order everywhere: defaults, then the TOML file (if present), then
//! prefixed environment variables, then validation.

use crate::{Result, VigilError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

/// Core trait for Vigil configuration types
pub trait ConfigLoad: Clone + Default + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Environment prefix, e.g. `VIGIL_`
    const ENV_PREFIX: &'static str;

    /// Set a configuration value from a string key in dot notation
    fn set_from_string(&mut self, key: &str, value: &str) -> Result<()>;

    /// Validate the configuration
    fn validate(&self) -> Result<()>;

    /// Load configuration from a TOML file
    fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            VigilError::internal(format!(
                "Failed to read config file {}: {e}",
                path.display()
            ))
        })?;
        toml::from_str(&content).map_err(|e| {
            VigilError::invalid(format!(
                "Failed to parse config file {}: {e}",
                path.display()
            ))
        })
    }

    /// Load from `path` when it exists, otherwise start from defaults
    fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Apply `PREFIX_KEY` variables; `__` separates nested keys
    fn merge_with_vars<I>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            if let Some(stripped) = key.strip_prefix(Self::ENV_PREFIX) {
                let config_key = stripped.to_lowercase().replace("__", ".");
                self.set_from_string(&config_key, &value)?;
            }
        }
        Ok(())
    }

    /// Apply overrides from the process environment
    fn merge_with_env(&mut self) -> Result<()> {
        self.merge_with_vars(std::env::vars())
    }

    /// Full load: defaults, file, environment, validation
    fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load_or_default(path)?,
            None => Self::default(),
        };
        config.merge_with_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Render as pretty TOML
    fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| VigilError::serialization(format!("Failed to serialize config: {e}")))
    }
}

/// Parse a config value, naming the key in the error
pub fn parse_value<T>(key: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| VigilError::invalid(format!("Invalid value for {key}: {e}")))
}
