//! Turn object identifiers into filtered script entries.

pub mod ddl;
mod options;

pub use options::ScriptingOptions;

use std::collections::HashSet;
use tracing::debug;

use crate::catalog::{ObjectId, SchemaCatalog};
use crate::error::Result;

/// Scripts lists of objects through a [`SchemaCatalog`].
pub struct Scripter<'a, C: SchemaCatalog + ?Sized> {
    catalog: &'a mut C,
    exclude: Option<fn(&ObjectId) -> bool>,
}

impl<'a, C: SchemaCatalog + ?Sized> Scripter<'a, C> {
    pub fn new(catalog: &'a mut C) -> Self {
        Self {
            catalog,
            exclude: None,
        }
    }

    /// Never script objects matching `exclude`, including ones reached
    /// only as dependencies.
    pub fn excluding(mut self, exclude: fn(&ObjectId) -> bool) -> Self {
        self.exclude = Some(exclude);
        self
    }

    fn is_excluded(&self, id: &ObjectId) -> bool {
        self.exclude.map_or(false, |exclude| exclude(id))
    }

    /// Script `ids` with `options` and return the kept entries in order.
    ///
    /// With `with_dependencies` the referenced objects are scripted first,
    /// each object exactly once.
    pub async fn script(
        &mut self,
        ids: &[ObjectId],
        options: &ScriptingOptions,
    ) -> Result<Vec<String>> {
        let ordered = if options.with_dependencies {
            self.resolve_dependencies(ids).await?
        } else {
            ids.to_vec()
        };

        let ordered: Vec<ObjectId> = ordered
            .into_iter()
            .filter(|id| !self.is_excluded(id))
            .collect();

        let mut result = Vec::new();
        for id in &ordered {
            let entries = self.catalog.script_object(id, options).await?;
            let before = result.len();
            result.extend(entries.into_iter().filter(|e| keep_entry(e)));
            debug!("Scripted {} ({} entries)", id, result.len() - before);
        }

        Ok(result)
    }

    /// Expand `ids` into dependency order: every object follows the objects
    /// it references. Reference cycles are broken at the first revisit.
    async fn resolve_dependencies(&mut self, ids: &[ObjectId]) -> Result<Vec<ObjectId>> {
        let mut ordered = Vec::new();
        let mut done: HashSet<ObjectId> = HashSet::new();
        let mut in_progress: HashSet<ObjectId> = HashSet::new();

        for root in ids {
            if done.contains(root) {
                continue;
            }
            // Iterative post-order walk; the bool marks an expanded node.
            let mut stack = vec![(root.clone(), false)];
            while let Some((id, expanded)) = stack.pop() {
                if expanded {
                    in_progress.remove(&id);
                    if done.insert(id.clone()) {
                        ordered.push(id);
                    }
                    continue;
                }
                if done.contains(&id) || in_progress.contains(&id) {
                    continue;
                }
                in_progress.insert(id.clone());
                stack.push((id.clone(), true));

                let deps = self.catalog.dependencies(&id).await?;
                for dep in deps.into_iter().rev() {
                    if self.is_excluded(&dep) {
                        debug!("Skipping excluded dependency {}", dep);
                        continue;
                    }
                    if !done.contains(&dep) && !in_progress.contains(&dep) {
                        stack.push((dep, false));
                    }
                }
            }
        }

        if ordered.len() > ids.len() {
            debug!(
                "Dependency expansion added {} objects",
                ordered.len() - ids.len()
            );
        }
        Ok(ordered)
    }
}

/// Entries that are empty or start with `SET` are session noise.
pub fn keep_entry(entry: &str) -> bool {
    !entry.is_empty() && !entry.starts_with("SET")
}
