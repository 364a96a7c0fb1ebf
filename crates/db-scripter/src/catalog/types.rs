//! Schema object identifiers and metadata.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of a scriptable schema object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Table,
    Function,
    StoredProcedure,
    Sequence,
}

impl ObjectKind {
    /// All categories in bundle order.
    pub const ALL: [ObjectKind; 4] = [
        ObjectKind::Table,
        ObjectKind::Function,
        ObjectKind::StoredProcedure,
        ObjectKind::Sequence,
    ];

    /// Human-readable plural label used in log lines.
    pub fn label(&self) -> &'static str {
        match self {
            ObjectKind::Table => "tables",
            ObjectKind::Function => "functions",
            ObjectKind::StoredProcedure => "stored procedures",
            ObjectKind::Sequence => "sequences",
        }
    }
}

/// Fully qualified identifier of a schema object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectId {
    /// Database name.
    pub database: String,

    /// Schema name.
    pub schema: String,

    /// Object name.
    pub name: String,

    /// Object category.
    pub kind: ObjectKind,
}

impl ObjectId {
    pub fn new(
        database: impl Into<String>,
        schema: impl Into<String>,
        name: impl Into<String>,
        kind: ObjectKind,
    ) -> Self {
        Self {
            database: database.into(),
            schema: schema.into(),
            name: name.into(),
            kind,
        }
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}",
            quote_ident(&self.database),
            quote_ident(&self.schema),
            quote_ident(&self.name)
        )
    }
}

/// An enumerated catalog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogObject {
    pub id: ObjectId,

    /// Shipped with the engine rather than created by a user.
    pub is_system_object: bool,
}

/// Quote a SQL Server identifier with brackets.
pub fn quote_ident(name: &str) -> String {
    format!("[{}]", name.replace(']', "]]"))
}

/// Table metadata read from the catalog.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableDef {
    /// Schema name.
    pub schema: String,

    /// Table name.
    pub name: String,

    /// Owning principal, when different from the schema owner.
    pub owner: Option<String>,

    /// Column definitions in ordinal order.
    pub columns: Vec<Column>,

    /// Primary key constraint, if any.
    pub primary_key: Option<KeyConstraint>,

    /// Unique constraints.
    pub unique_constraints: Vec<KeyConstraint>,

    /// Indexes that do not back a key constraint.
    pub indexes: Vec<Index>,

    /// Foreign key constraints.
    pub foreign_keys: Vec<ForeignKey>,

    /// Check constraints.
    pub check_constraints: Vec<CheckConstraint>,

    /// Default constraints.
    pub default_constraints: Vec<DefaultConstraint>,

    /// DML triggers defined on the table.
    pub triggers: Vec<ModuleDef>,
}

impl TableDef {
    /// Get the fully qualified table name.
    pub fn full_name(&self) -> String {
        format!("{}.{}", quote_ident(&self.schema), quote_ident(&self.name))
    }
}

/// Column metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Column {
    /// Column name.
    pub name: String,

    /// Data type (e.g., "int", "nvarchar", "datetime2").
    pub data_type: String,

    /// Maximum length in bytes for string/binary types (-1 for max).
    pub max_length: i32,

    /// Numeric precision.
    pub precision: i32,

    /// Numeric scale.
    pub scale: i32,

    /// Whether the column allows NULL.
    pub is_nullable: bool,

    /// Identity seed and increment, for identity columns.
    pub identity: Option<(i64, i64)>,

    /// Expression of a computed column.
    pub computed_definition: Option<String>,

    /// Collation name for character columns.
    pub collation: Option<String>,
}

/// Primary key or unique constraint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeyConstraint {
    /// Constraint name.
    pub name: String,

    /// Key column names in key order.
    pub columns: Vec<String>,

    /// Whether the backing index is clustered.
    pub is_clustered: bool,
}

/// Index metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Index {
    /// Index name.
    pub name: String,

    /// Indexed column names.
    pub columns: Vec<String>,

    /// Whether the index is unique.
    pub is_unique: bool,

    /// Whether the index is clustered.
    pub is_clustered: bool,

    /// Included columns (non-key).
    pub include_cols: Vec<String>,

    /// Filter predicate of a filtered index.
    pub filter: Option<String>,
}

/// Foreign key metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForeignKey {
    /// Constraint name.
    pub name: String,

    /// Source column names.
    pub columns: Vec<String>,

    /// Referenced schema name.
    pub ref_schema: String,

    /// Referenced table name.
    pub ref_table: String,

    /// Referenced column names.
    pub ref_columns: Vec<String>,

    /// ON DELETE action as reported by the catalog (e.g. "NO_ACTION").
    pub on_delete: String,

    /// ON UPDATE action as reported by the catalog.
    pub on_update: String,
}

/// Check constraint metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckConstraint {
    /// Constraint name.
    pub name: String,

    /// Constraint definition (SQL expression).
    pub definition: String,
}

/// Default constraint metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DefaultConstraint {
    /// Constraint name.
    pub name: String,

    /// Column the default applies to.
    pub column: String,

    /// Default expression.
    pub definition: String,
}

/// A programmable object stored as a module definition
/// (function, procedure, trigger).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModuleDef {
    /// Schema name.
    pub schema: String,

    /// Object name.
    pub name: String,

    /// CREATE statement as stored by the server.
    pub definition: String,

    /// Whether the module was created with ANSI_NULLS on.
    pub uses_ansi_nulls: bool,

    /// Whether the module was created with QUOTED_IDENTIFIER on.
    pub uses_quoted_identifier: bool,
}

/// Sequence metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SequenceDef {
    /// Schema name.
    pub schema: String,

    /// Sequence name.
    pub name: String,

    /// Value type (e.g. "bigint").
    pub data_type: String,

    pub start_value: String,
    pub increment: String,
    pub minimum_value: String,
    pub maximum_value: String,
    pub is_cycling: bool,

    /// Cache size; `None` when the sequence uses NO CACHE.
    pub cache_size: Option<i32>,
}
