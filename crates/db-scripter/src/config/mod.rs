//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;

use crate::error::{Result, ScriptError};
use std::path::{Path, PathBuf};

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Self::load_unvalidated(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a YAML file without validating it, so callers can apply
    /// overrides first and call [`Config::validate`] afterwards.
    pub fn load_unvalidated<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&content)?)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }

    /// Path of the flat script produced from the JSON bundle.
    pub fn pretty_path(&self) -> PathBuf {
        crate::pretty::pretty_path(&self.output.path)
    }
}

impl SourceConfig {
    /// Build a tiberius config from the connection string, with the access
    /// token as authentication when one is set.
    pub fn tiberius_config(&self) -> Result<tiberius::Config> {
        let mut config = tiberius::Config::from_ado_string(&self.connection_string)
            .map_err(|e| ScriptError::Config(format!("invalid connection string: {}", e)))?;

        if let Some(token) = &self.access_token {
            config.authentication(tiberius::AuthMethod::aad_token(token));
        }

        Ok(config)
    }
}
