//! Configuration validation.

use super::Config;
use crate::error::{Result, ScriptError};

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    if config.source.connection_string.trim().is_empty() {
        return Err(ScriptError::Config(
            "source.connection_string is required".into(),
        ));
    }
    if config.source.database.trim().is_empty() {
        return Err(ScriptError::Config("source.database is required".into()));
    }
    if config.source.is_local && config.source.access_token.is_some() {
        return Err(ScriptError::Config(
            "source.access_token is only supported for remote connections".into(),
        ));
    }
    if config.output.path.as_os_str().is_empty() {
        return Err(ScriptError::Config("output.path is required".into()));
    }

    // Parse errors surface here instead of at connect time
    config.source.tiberius_config()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{OutputConfig, SourceConfig};
    use std::path::PathBuf;

    fn valid_config() -> Config {
        Config {
            source: SourceConfig {
                connection_string:
                    "Server=tcp:localhost,1433;User Id=sa;Password=password".to_string(),
                is_local: false,
                database: "Billing".to_string(),
                access_token: None,
            },
            output: OutputConfig {
                path: PathBuf::from("db.json"),
            },
        }
    }

    #[test]
    fn test_valid_config() {
        let config = valid_config();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_missing_connection_string() {
        let mut config = valid_config();
        config.source.connection_string = "  ".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_missing_database() {
        let mut config = valid_config();
        config.source.database = "".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_empty_output_path() {
        let mut config = valid_config();
        config.output.path = PathBuf::new();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_access_token_rejected_in_local_mode() {
        let mut config = valid_config();
        config.source.is_local = true;
        config.source.access_token = Some("eyJ0eXAi".to_string());
        assert!(validate(&config).is_err());

        config.source.is_local = false;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_source_config_debug_redacts_secrets() {
        let mut config = valid_config();
        config.source.connection_string =
            "Server=tcp:localhost,1433;User Id=sa;Password=super_secret_password_123".to_string();
        config.source.access_token = Some("token_value_456".to_string());
        let debug_output = format!("{:?}", config.source);
        assert!(
            debug_output.contains("[REDACTED]"),
            "Debug output should contain [REDACTED]"
        );
        assert!(
            !debug_output.contains("super_secret_password_123"),
            "Debug output should not contain actual password value"
        );
        assert!(
            !debug_output.contains("token_value_456"),
            "Debug output should not contain the access token"
        );
    }
}
