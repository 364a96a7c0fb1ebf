//! Error types for the scripting library.

use thiserror::Error;

/// Main error type for scripting operations.
#[derive(Error, Debug)]
pub enum ScriptError {
    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Connection, login or query error reported by the server
    #[error("Database connection error: {0}")]
    Connection(#[from] tiberius::error::Error),

    /// The named database does not exist on the server
    #[error("Database '{0}' not found on server")]
    DatabaseNotFound(String),

    /// The scripting engine could not resolve an object
    #[error("Cannot script {0}: object not found")]
    ObjectNotFound(String),

    /// Enumeration or scripting failed for a specific object
    #[error("Catalog error for {object}: {message}")]
    Catalog { object: String, message: String },

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Process exit code for configuration errors.
pub const EXIT_CONFIG_ERROR: u8 = 1;
/// Process exit code for connection errors.
pub const EXIT_CONNECTION_ERROR: u8 = 2;
/// Process exit code for enumeration and scripting errors.
pub const EXIT_CATALOG_ERROR: u8 = 3;
/// Process exit code for malformed script bundles.
pub const EXIT_PARSE_ERROR: u8 = 4;
/// Process exit code for file system errors.
pub const EXIT_IO_ERROR: u8 = 7;

impl ScriptError {
    /// Create a Catalog error
    pub fn catalog(object: impl Into<String>, message: impl Into<String>) -> Self {
        ScriptError::Catalog {
            object: object.into(),
            message: message.into(),
        }
    }

    /// Exit code the CLI reports for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            ScriptError::Config(_) | ScriptError::Yaml(_) => EXIT_CONFIG_ERROR,
            ScriptError::Connection(_) => EXIT_CONNECTION_ERROR,
            ScriptError::DatabaseNotFound(_)
            | ScriptError::ObjectNotFound(_)
            | ScriptError::Catalog { .. } => EXIT_CATALOG_ERROR,
            ScriptError::Json(_) => EXIT_PARSE_ERROR,
            ScriptError::Io(_) => EXIT_IO_ERROR,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for scripting operations.
pub type Result<T> = std::result::Result<T, ScriptError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(ScriptError::Config("x".into()).exit_code(), EXIT_CONFIG_ERROR);
        assert_eq!(
            ScriptError::DatabaseNotFound("Billing".into()).exit_code(),
            EXIT_CATALOG_ERROR
        );
        assert_eq!(
            ScriptError::catalog("[db].[dbo].[t]", "permission denied").exit_code(),
            EXIT_CATALOG_ERROR
        );
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        assert_eq!(ScriptError::from(io).exit_code(), EXIT_IO_ERROR);
    }

    #[test]
    fn test_json_error_maps_to_parse_exit_code() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert_eq!(ScriptError::from(err).exit_code(), EXIT_PARSE_ERROR);
    }

    #[test]
    fn test_format_detailed_includes_cause() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = ScriptError::from(io);
        let detailed = err.format_detailed();
        assert!(detailed.starts_with("Error: IO error: denied"));
    }
}
