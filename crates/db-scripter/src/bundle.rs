//! Script bundle and its JSON encoding.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::debug;

use crate::catalog::ObjectKind;
use crate::error::Result;

/// Generated script entries grouped by category.
///
/// Serialized as
/// `{ "Tables": [..], "Functions": [..], "StoredProcedures": [..], "Sequences": [..] }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ScriptBundle {
    pub tables: Vec<String>,
    pub functions: Vec<String>,
    pub stored_procedures: Vec<String>,
    pub sequences: Vec<String>,
}

impl ScriptBundle {
    /// Entries of one category.
    pub fn category(&self, kind: ObjectKind) -> &[String] {
        match kind {
            ObjectKind::Table => &self.tables,
            ObjectKind::Function => &self.functions,
            ObjectKind::StoredProcedure => &self.stored_procedures,
            ObjectKind::Sequence => &self.sequences,
        }
    }

    /// All entries in bundle order: tables, functions, stored procedures, sequences.
    pub fn entries(&self) -> impl Iterator<Item = &String> {
        ObjectKind::ALL
            .into_iter()
            .flat_map(move |kind| self.category(kind).iter())
    }

    /// Total number of entries across categories.
    pub fn len(&self) -> usize {
        ObjectKind::ALL
            .iter()
            .map(|kind| self.category(*kind).len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Encode as indented JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write indented JSON to `writer` and flush it.
    pub async fn write_json<W: AsyncWrite + Unpin>(&self, writer: &mut W) -> Result<()> {
        let json = self.to_json()?;
        writer.write_all(json.as_bytes()).await?;
        writer.flush().await?;
        Ok(())
    }

    /// Create (or truncate) `path` and write the bundle to it.
    pub async fn save(&self, path: &Path) -> Result<()> {
        let mut file = tokio::fs::File::create(path).await?;
        self.write_json(&mut file).await?;
        file.sync_all().await?;
        debug!("Wrote {} script entries to {:?}", self.len(), path);
        Ok(())
    }

    /// Read a bundle back from a JSON file.
    pub async fn load(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
