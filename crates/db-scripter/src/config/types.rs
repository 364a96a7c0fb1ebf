//! Configuration type definitions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server connection and database selection.
    pub source: SourceConfig,

    /// Where the script bundle is written.
    #[serde(default)]
    pub output: OutputConfig,
}

/// Server connection configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// ADO-style connection string, e.g.
    /// `Server=tcp:host,1433;User Id=sa;Password=...;TrustServerCertificate=true`.
    pub connection_string: String,

    /// Connect to a local named instance instead of a remote server (default: false).
    #[serde(default)]
    pub is_local: bool,

    /// Database whose objects are scripted. May be left empty when the
    /// command line supplies it.
    #[serde(default)]
    pub database: String,

    /// Bearer token for directory authentication against a remote server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

impl fmt::Debug for SourceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceConfig")
            .field("connection_string", &redact_connection_string(&self.connection_string))
            .field("is_local", &self.is_local)
            .field("database", &self.database)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// Output file configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Path of the JSON bundle; the flat script lands next to it with a
    /// `.pretty` suffix.
    #[serde(default = "default_output_path")]
    pub path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output_path(),
        }
    }
}

/// Replace the value of every password key in an ADO connection string.
pub fn redact_connection_string(conn: &str) -> String {
    conn.split(';')
        .map(|part| match part.split_once('=') {
            Some((key, _)) if is_secret_key(key) => format!("{}=[REDACTED]", key),
            _ => part.to_string(),
        })
        .collect::<Vec<_>>()
        .join(";")
}

fn is_secret_key(key: &str) -> bool {
    matches!(
        key.trim().to_lowercase().as_str(),
        "password" | "pwd" | "access token"
    )
}

fn default_output_path() -> PathBuf {
    PathBuf::from("db.json")
}
