//! # db-scripter
//!
//! Script the schema of a SQL Server database into a JSON bundle and a flat
//! SQL file.
//!
//! The extraction stage connects to a server, enumerates user tables,
//! functions, stored procedures and sequences, and generates their DDL:
//!
//! - **Tables** are scripted together with the tables they reference
//! - **Functions, procedures and sequences** are scripted on their own
//! - **Session-setting lines** (`SET ...`) are dropped from the output
//!
//! The reformat stage reads the bundle back and concatenates every entry into
//! `<bundle>.pretty`.
//!
//! ## Example
//!
//! ```rust,no_run
//! use db_scripter::{orchestrator, Config};
//!
//! #[tokio::main]
//! async fn main() -> db_scripter::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let summary = orchestrator::run(&config).await?;
//!     println!("Scripted {} tables", summary.tables);
//!     Ok(())
//! }
//! ```

pub mod bundle;
pub mod catalog;
pub mod config;
pub mod connector;
pub mod enumerate;
pub mod error;
pub mod orchestrator;
pub mod pretty;
pub mod scripter;

// Re-exports for convenient access
pub use bundle::ScriptBundle;
pub use catalog::{MssqlCatalog, ObjectId, ObjectKind, SchemaCatalog};
pub use config::{Config, OutputConfig, SourceConfig};
pub use connector::{connect, ServerSession};
pub use enumerate::{SchemaEnumerator, MIGRATION_HISTORY_TABLE};
pub use error::{Result, ScriptError};
pub use orchestrator::{ExtractionSummary, Extractor, HealthCheckResult};
pub use pretty::write_pretty;
pub use scripter::{Scripter, ScriptingOptions};
