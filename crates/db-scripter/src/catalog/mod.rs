//! Schema catalog contract.
//!
//! [`SchemaCatalog`] is the seam between the deterministic bundle logic and the
//! database server. [`MssqlCatalog`] backs it with a live SQL Server session;
//! tests use an in-memory double.

#[cfg(test)]
pub(crate) mod memory;
mod mssql;
mod types;

pub use mssql::MssqlCatalog;
pub use types::*;

use async_trait::async_trait;

use crate::error::Result;
use crate::scripter::ScriptingOptions;

/// Enumerate and script schema objects.
///
/// Calls are issued strictly one after another; implementations may hold a
/// single connection and need no internal synchronization.
#[async_trait]
pub trait SchemaCatalog: Send {
    /// Version string of the connected server.
    async fn server_version(&mut self) -> Result<String>;

    /// List objects of one category in `database`, in catalog order.
    ///
    /// System objects are included and flagged; filtering is up to the caller.
    async fn list_objects(&mut self, database: &str, kind: ObjectKind)
        -> Result<Vec<CatalogObject>>;

    /// Objects that `id` directly references and that must exist before it.
    async fn dependencies(&mut self, id: &ObjectId) -> Result<Vec<ObjectId>>;

    /// Generate the script entries for a single object.
    ///
    /// Dependency expansion is not performed here; see
    /// [`Scripter`](crate::scripter::Scripter).
    async fn script_object(
        &mut self,
        id: &ObjectId,
        options: &ScriptingOptions,
    ) -> Result<Vec<String>>;
}
