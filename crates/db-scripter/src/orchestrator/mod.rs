//! Extraction workflow: connect, enumerate, script, serialize, reformat.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

use crate::bundle::ScriptBundle;
use crate::catalog::{MssqlCatalog, ObjectId, SchemaCatalog};
use crate::config::Config;
use crate::connector;
use crate::enumerate::{self, SchemaEnumerator};
use crate::error::{Result, ScriptError};
use crate::pretty;
use crate::scripter::{Scripter, ScriptingOptions};

/// Builds a [`ScriptBundle`] for one database.
pub struct Extractor {
    database: String,
}

/// Result of an extraction run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionSummary {
    /// Database that was scripted.
    pub database: String,

    /// Server product version.
    pub server_version: String,

    /// When scripting started.
    pub generated_at: DateTime<Local>,

    /// Script entries per category.
    pub tables: usize,
    pub functions: usize,
    pub stored_procedures: usize,
    pub sequences: usize,

    /// JSON bundle written.
    pub json_path: PathBuf,

    /// Flat script written, when the reformat stage ran.
    pub pretty_path: Option<PathBuf>,

    /// Total duration in seconds.
    pub duration_seconds: f64,
}

impl ExtractionSummary {
    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Result of a connectivity check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub connected: bool,
    pub latency_ms: u64,
    pub server_version: Option<String>,
    pub database: String,
    pub database_found: bool,
    pub error: Option<String>,
}

impl HealthCheckResult {
    pub fn healthy(&self) -> bool {
        self.connected && self.database_found
    }
}

/// Header line logged before scripting starts.
pub fn header(server_version: &str, generated_at: &DateTime<Local>) -> String {
    format!(
        "--Server Version:{} Generated:{}",
        server_version,
        generated_at.format("%Y-%m-%d %H:%M:%S")
    )
}

impl Extractor {
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
        }
    }

    /// Enumerate and script every category.
    ///
    /// Tables are scripted with [`ScriptingOptions::for_tables`]; functions,
    /// stored procedures and sequences with [`ScriptingOptions::for_modules`].
    pub async fn extract<C: SchemaCatalog + ?Sized>(&self, catalog: &mut C) -> Result<ScriptBundle> {
        let table_options = ScriptingOptions::for_tables();
        let module_options = ScriptingOptions::for_modules();

        let ids = SchemaEnumerator::new(&mut *catalog, &self.database)
            .tables()
            .await?;
        let tables = self.script(catalog, &ids, &table_options).await?;

        let ids = SchemaEnumerator::new(&mut *catalog, &self.database)
            .functions()
            .await?;
        let functions = self.script(catalog, &ids, &module_options).await?;

        let ids = SchemaEnumerator::new(&mut *catalog, &self.database)
            .stored_procedures()
            .await?;
        let stored_procedures = self.script(catalog, &ids, &module_options).await?;

        let ids = SchemaEnumerator::new(&mut *catalog, &self.database)
            .sequences()
            .await?;
        let sequences = self.script(catalog, &ids, &module_options).await?;

        Ok(ScriptBundle {
            tables,
            functions,
            stored_procedures,
            sequences,
        })
    }

    /// Extract into memory, then write the bundle to `path`.
    ///
    /// The file is only created once every category scripted successfully.
    pub async fn extract_to<C: SchemaCatalog + ?Sized>(
        &self,
        catalog: &mut C,
        path: &Path,
    ) -> Result<ScriptBundle> {
        let bundle = self.extract(catalog).await?;
        bundle.save(path).await?;
        info!("Saved script bundle to {:?}", path);
        Ok(bundle)
    }

    async fn script<C: SchemaCatalog + ?Sized>(
        &self,
        catalog: &mut C,
        ids: &[ObjectId],
        options: &ScriptingOptions,
    ) -> Result<Vec<String>> {
        Scripter::new(catalog)
            .excluding(enumerate::is_migration_history)
            .script(ids, options)
            .await
    }
}

/// Await `close` on every path, then return `result`. A failure from
/// `result` takes precedence over one from `close`.
async fn release<T, F>(result: Result<T>, close: F) -> Result<T>
where
    F: Future<Output = Result<()>>,
{
    let closed = close.await;
    match result {
        Ok(value) => closed.map(|()| value),
        Err(e) => {
            if let Err(close_err) = closed {
                warn!("Failed to close server session: {}", close_err);
            }
            Err(e)
        }
    }
}

/// Connect to the configured server and confirm the database exists.
async fn open_catalog(config: &Config) -> Result<(MssqlCatalog, String)> {
    let mut session = connector::connect(&config.source).await?;
    let found = session.has_database(&config.source.database).await;
    match found {
        Ok(true) => {}
        Ok(false) => {
            let missing = Err(ScriptError::DatabaseNotFound(config.source.database.clone()));
            return release(missing, session.close()).await;
        }
        Err(e) => return release(Err(e), session.close()).await,
    }

    let mut catalog = MssqlCatalog::new(session);
    match catalog.server_version().await {
        Ok(version) => Ok((catalog, version)),
        Err(e) => release(Err(e), catalog.close()).await,
    }
}

/// Run the extraction stage against the configured server and write the JSON bundle.
pub async fn extract(config: &Config) -> Result<ExtractionSummary> {
    let start = Instant::now();
    let (mut catalog, server_version) = open_catalog(config).await?;

    let generated_at = Local::now();
    info!("{}", header(&server_version, &generated_at));

    let extractor = Extractor::new(&config.source.database);
    let extracted = extractor.extract(&mut catalog).await;
    let bundle = release(extracted, catalog.close()).await?;

    bundle.save(&config.output.path).await?;
    info!(
        "Scripted {} entries from '{}' into {:?}",
        bundle.len(),
        config.source.database,
        config.output.path
    );

    Ok(ExtractionSummary {
        database: config.source.database.clone(),
        server_version,
        generated_at,
        tables: bundle.tables.len(),
        functions: bundle.functions.len(),
        stored_procedures: bundle.stored_procedures.len(),
        sequences: bundle.sequences.len(),
        json_path: config.output.path.clone(),
        pretty_path: None,
        duration_seconds: start.elapsed().as_secs_f64(),
    })
}

/// Run both stages: extract to JSON, then reformat into `<json>.pretty`.
pub async fn run(config: &Config) -> Result<ExtractionSummary> {
    let start = Instant::now();
    let mut summary = extract(config).await?;
    summary.pretty_path = Some(pretty::write_pretty(&config.output.path).await?);
    summary.duration_seconds = start.elapsed().as_secs_f64();
    Ok(summary)
}

/// Test connectivity and database presence without scripting anything.
pub async fn health_check(config: &Config) -> HealthCheckResult {
    let start = Instant::now();
    let mut result = HealthCheckResult {
        connected: false,
        latency_ms: 0,
        server_version: None,
        database: config.source.database.clone(),
        database_found: false,
        error: None,
    };

    let mut session = match connector::connect(&config.source).await {
        Ok(session) => session,
        Err(e) => {
            result.error = Some(e.to_string());
            return result;
        }
    };
    result.connected = true;
    result.latency_ms = start.elapsed().as_millis() as u64;

    let lookup = async {
        let version = session.server_version().await?;
        let found = session.has_database(&config.source.database).await?;
        Ok::<_, ScriptError>((version, found))
    };
    match lookup.await {
        Ok((version, found)) => {
            result.server_version = Some(version);
            result.database_found = found;
        }
        Err(e) => result.error = Some(e.to_string()),
    }

    if let Err(e) = session.close().await {
        result.error.get_or_insert(e.to_string());
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::memory::InMemoryCatalog;
    use crate::catalog::ObjectKind;
    use crate::enumerate::MIGRATION_HISTORY_TABLE;
    use chrono::TimeZone;

    fn id(name: &str, kind: ObjectKind) -> ObjectId {
        ObjectId::new("Billing", "dbo", name, kind)
    }

    fn billing() -> InMemoryCatalog {
        let mut catalog = InMemoryCatalog::new("Billing");
        catalog.add_object(
            id("Invoices", ObjectKind::Table),
            false,
            vec![
                "SET ANSI_NULLS ON\nGO\n",
                "SET QUOTED_IDENTIFIER ON\nGO\n",
                "CREATE TABLE [dbo].[Invoices]([Id] [int] NOT NULL)\nGO\n",
            ],
        );
        catalog.add_object(
            id(MIGRATION_HISTORY_TABLE, ObjectKind::Table),
            false,
            vec!["CREATE TABLE [dbo].[AppliedMigrationScript]([Id] [int] NOT NULL)\nGO\n"],
        );
        catalog
    }

    #[test]
    fn test_header_format() {
        let at = Local.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
        assert_eq!(
            header("16.0.1000.6", &at),
            "--Server Version:16.0.1000.6 Generated:2024-03-01 09:30:00"
        );
    }

    #[tokio::test]
    async fn test_invoices_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let json = dir.path().join("db.json");
        let mut catalog = billing();

        let bundle = Extractor::new("Billing")
            .extract_to(&mut catalog, &json)
            .await
            .unwrap();
        assert_eq!(
            bundle.tables,
            vec!["CREATE TABLE [dbo].[Invoices]([Id] [int] NOT NULL)\nGO\n"]
        );
        assert!(bundle.functions.is_empty());
        assert!(bundle.stored_procedures.is_empty());
        assert!(bundle.sequences.is_empty());

        let pretty = pretty::write_pretty(&json).await.unwrap();
        let text = std::fs::read_to_string(pretty).unwrap();
        assert_eq!(text, "CREATE TABLE [dbo].[Invoices]([Id] [int] NOT NULL)\nGO\n");
        assert!(!text.contains(MIGRATION_HISTORY_TABLE));
    }

    #[tokio::test]
    async fn test_empty_database() {
        let dir = tempfile::tempdir().unwrap();
        let json = dir.path().join("db.json");
        let mut catalog = InMemoryCatalog::new("Billing");

        let bundle = Extractor::new("Billing")
            .extract_to(&mut catalog, &json)
            .await
            .unwrap();
        assert!(bundle.is_empty());

        let pretty = pretty::write_pretty(&json).await.unwrap();
        assert!(std::fs::read(pretty).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_categories_use_their_own_dependency_scope() {
        let mut catalog = billing();
        catalog.add_object(id("Customers", ObjectKind::Table), false, vec!["CREATE TABLE Customers"]);
        catalog.add_dependency(id("Invoices", ObjectKind::Table), id("Customers", ObjectKind::Table));
        catalog.add_object(id("GetTotal", ObjectKind::Function), false, vec!["CREATE FUNCTION GetTotal"]);
        catalog.add_dependency(id("GetTotal", ObjectKind::Function), id("Invoices", ObjectKind::Table));
        catalog.add_object(
            id("PostInvoice", ObjectKind::StoredProcedure),
            false,
            vec!["CREATE PROCEDURE PostInvoice"],
        );
        catalog.add_dependency(
            id("PostInvoice", ObjectKind::StoredProcedure),
            id("GetTotal", ObjectKind::Function),
        );
        catalog.add_object(
            id("InvoiceNumbers", ObjectKind::Sequence),
            false,
            vec!["CREATE SEQUENCE InvoiceNumbers"],
        );

        let bundle = Extractor::new("Billing").extract(&mut catalog).await.unwrap();

        // Customers is enumerated after Invoices (registration order) but is
        // pulled in ahead of it and not repeated.
        assert_eq!(
            bundle.tables,
            vec![
                "CREATE TABLE Customers",
                "CREATE TABLE [dbo].[Invoices]([Id] [int] NOT NULL)\nGO\n",
            ]
        );
        assert_eq!(bundle.functions, vec!["CREATE FUNCTION GetTotal"]);
        assert_eq!(bundle.stored_procedures, vec!["CREATE PROCEDURE PostInvoice"]);
        assert_eq!(bundle.sequences, vec!["CREATE SEQUENCE InvoiceNumbers"]);
    }

    #[tokio::test]
    async fn test_scripting_failure_writes_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let json = dir.path().join("db.json");
        let mut catalog = billing();
        catalog.add_object(
            id("PostInvoice", ObjectKind::StoredProcedure),
            false,
            vec!["CREATE PROCEDURE PostInvoice"],
        );
        catalog.deny(id("PostInvoice", ObjectKind::StoredProcedure));

        let err = Extractor::new("Billing")
            .extract_to(&mut catalog, &json)
            .await
            .unwrap_err();
        assert!(matches!(err, ScriptError::Catalog { .. }));
        assert!(!json.exists());
    }

    #[tokio::test]
    async fn test_migration_history_not_pulled_in_as_dependency() {
        let mut catalog = billing();
        catalog.add_dependency(
            id("Invoices", ObjectKind::Table),
            id(MIGRATION_HISTORY_TABLE, ObjectKind::Table),
        );

        let bundle = Extractor::new("Billing").extract(&mut catalog).await.unwrap();
        assert_eq!(
            bundle.tables,
            vec!["CREATE TABLE [dbo].[Invoices]([Id] [int] NOT NULL)\nGO\n"]
        );
        assert!(!bundle.tables.iter().any(|t| t.contains(MIGRATION_HISTORY_TABLE)));
    }

    #[tokio::test]
    async fn test_unknown_database_fails() {
        let mut catalog = billing();
        let err = Extractor::new("Payroll").extract(&mut catalog).await.unwrap_err();
        assert!(matches!(err, ScriptError::DatabaseNotFound(db) if db == "Payroll"));
    }

    #[tokio::test]
    async fn test_release_closes_on_success_and_failure() {
        let closed = std::cell::Cell::new(0);
        let counter = &closed;
        let close = move || async move {
            counter.set(counter.get() + 1);
            Ok(())
        };

        assert_eq!(release(Ok(7), close()).await.unwrap(), 7);
        let err = release::<(), _>(Err(ScriptError::ObjectNotFound("x".into())), close())
            .await
            .unwrap_err();
        assert!(matches!(err, ScriptError::ObjectNotFound(_)));
        assert_eq!(closed.get(), 2);
    }

    #[tokio::test]
    async fn test_release_keeps_first_error() {
        let close = async { Err(ScriptError::Config("logout failed".into())) };
        let err = release::<(), _>(Err(ScriptError::DatabaseNotFound("Billing".into())), close)
            .await
            .unwrap_err();
        assert!(matches!(err, ScriptError::DatabaseNotFound(_)));

        let close = async { Err(ScriptError::Config("logout failed".into())) };
        let err = release(Ok(1), close).await.unwrap_err();
        assert!(matches!(err, ScriptError::Config(_)));
    }

    #[test]
    fn test_health_check_result_healthy() {
        let mut result = HealthCheckResult {
            connected: true,
            latency_ms: 12,
            server_version: Some("16.0".to_string()),
            database: "Billing".to_string(),
            database_found: true,
            error: None,
        };
        assert!(result.healthy());
        result.database_found = false;
        assert!(!result.healthy());
    }
}
