//! In-memory catalog used by unit tests.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};

use super::{CatalogObject, ObjectId, ObjectKind, SchemaCatalog};
use crate::error::{Result, ScriptError};
use crate::scripter::ScriptingOptions;

/// Catalog with canned objects and script entries.
pub(crate) struct InMemoryCatalog {
    database: String,
    objects: Vec<CatalogObject>,
    scripts: HashMap<ObjectId, Vec<String>>,
    dependencies: HashMap<ObjectId, Vec<ObjectId>>,
    denied: HashSet<ObjectId>,
    dependency_lookups: usize,
}

impl InMemoryCatalog {
    pub(crate) fn new(database: &str) -> Self {
        Self {
            database: database.to_string(),
            objects: Vec::new(),
            scripts: HashMap::new(),
            dependencies: HashMap::new(),
            denied: HashSet::new(),
            dependency_lookups: 0,
        }
    }

    /// Register an object in enumeration order with its script entries.
    pub(crate) fn add_object(&mut self, id: ObjectId, is_system_object: bool, entries: Vec<&str>) {
        self.scripts
            .insert(id.clone(), entries.into_iter().map(String::from).collect());
        self.objects.push(CatalogObject {
            id,
            is_system_object,
        });
    }

    pub(crate) fn add_dependency(&mut self, id: ObjectId, depends_on: ObjectId) {
        self.dependencies.entry(id).or_default().push(depends_on);
    }

    /// Make scripting `id` fail as if permission were denied.
    pub(crate) fn deny(&mut self, id: ObjectId) {
        self.denied.insert(id);
    }

    pub(crate) fn dependency_lookups(&self) -> usize {
        self.dependency_lookups
    }
}

#[async_trait]
impl SchemaCatalog for InMemoryCatalog {
    async fn server_version(&mut self) -> Result<String> {
        Ok("16.0.1000.6".to_string())
    }

    async fn list_objects(
        &mut self,
        database: &str,
        kind: ObjectKind,
    ) -> Result<Vec<CatalogObject>> {
        if database != self.database {
            return Err(ScriptError::DatabaseNotFound(database.to_string()));
        }
        Ok(self
            .objects
            .iter()
            .filter(|o| o.id.kind == kind)
            .cloned()
            .collect())
    }

    async fn dependencies(&mut self, id: &ObjectId) -> Result<Vec<ObjectId>> {
        self.dependency_lookups += 1;
        Ok(self.dependencies.get(id).cloned().unwrap_or_default())
    }

    async fn script_object(
        &mut self,
        id: &ObjectId,
        _options: &ScriptingOptions,
    ) -> Result<Vec<String>> {
        if self.denied.contains(id) {
            return Err(ScriptError::catalog(id.to_string(), "permission denied"));
        }
        self.scripts
            .get(id)
            .cloned()
            .ok_or_else(|| ScriptError::ObjectNotFound(id.to_string()))
    }
}
