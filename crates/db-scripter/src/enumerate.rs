//! List the in-scope objects of a database per category.

use tracing::info;

use crate::catalog::{CatalogObject, ObjectId, ObjectKind, SchemaCatalog};
use crate::error::Result;

/// Migration-history table that is never scripted.
pub const MIGRATION_HISTORY_TABLE: &str = "AppliedMigrationScript";

/// True for the migration-history table (exact, case-sensitive name).
pub fn is_migration_history(id: &ObjectId) -> bool {
    id.kind == ObjectKind::Table && id.name == MIGRATION_HISTORY_TABLE
}

/// Lists objects through a [`SchemaCatalog`] and applies the category filters.
///
/// Order is whatever the catalog yields; nothing is re-sorted here.
pub struct SchemaEnumerator<'a, C: SchemaCatalog + ?Sized> {
    catalog: &'a mut C,
    database: &'a str,
}

impl<'a, C: SchemaCatalog + ?Sized> SchemaEnumerator<'a, C> {
    pub fn new(catalog: &'a mut C, database: &'a str) -> Self {
        Self { catalog, database }
    }

    /// User tables, minus the migration-history table (exact name match).
    pub async fn tables(&mut self) -> Result<Vec<ObjectId>> {
        self.list(ObjectKind::Table, |o| {
            !o.is_system_object && !is_migration_history(&o.id)
        })
        .await
    }

    /// User-defined functions.
    pub async fn functions(&mut self) -> Result<Vec<ObjectId>> {
        self.list(ObjectKind::Function, |o| !o.is_system_object).await
    }

    /// User stored procedures.
    pub async fn stored_procedures(&mut self) -> Result<Vec<ObjectId>> {
        self.list(ObjectKind::StoredProcedure, |o| !o.is_system_object)
            .await
    }

    /// All sequences.
    pub async fn sequences(&mut self) -> Result<Vec<ObjectId>> {
        self.list(ObjectKind::Sequence, |_| true).await
    }

    async fn list(
        &mut self,
        kind: ObjectKind,
        keep: impl Fn(&CatalogObject) -> bool,
    ) -> Result<Vec<ObjectId>> {
        let objects = self.catalog.list_objects(self.database, kind).await?;
        let total = objects.len();
        let ids: Vec<ObjectId> = objects
            .into_iter()
            .filter(|o| keep(o))
            .map(|o| o.id)
            .collect();

        info!(
            "Found {} {} in '{}' ({} filtered out)",
            ids.len(),
            kind.label(),
            self.database,
            total - ids.len()
        );
        Ok(ids)
    }
}
