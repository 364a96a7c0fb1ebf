//! Scripting option profiles.

use serde::{Deserialize, Serialize};

/// Controls which clauses and related objects appear in generated scripts.
///
/// Values are immutable once built; the table and module profiles are two
/// separate values rather than one object toggled between stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptingOptions {
    /// Script engine-shipped objects.
    pub allow_system_objects: bool,

    /// Emit ownership (ALTER AUTHORIZATION) statements.
    pub script_owner: bool,

    /// Strip COLLATE clauses from column definitions.
    pub no_collation: bool,

    /// Wrap CREATE statements in existence guards.
    pub include_if_not_exists: bool,

    /// Emit DROP statements instead of CREATE statements.
    pub script_drops: bool,

    /// Script referenced objects ahead of the requested ones.
    pub with_dependencies: bool,

    /// Script indexes.
    pub indexes: bool,

    /// Script DML triggers.
    pub triggers: bool,

    /// Script foreign key constraints.
    pub dri_foreign_keys: bool,

    /// Script primary key, unique, check and default constraints.
    pub dri_all_constraints: bool,

    /// Terminate every script entry with a `GO` batch separator.
    pub batch_terminator: bool,
}

impl ScriptingOptions {
    /// Profile for tables: dependencies are pulled in transitively.
    pub const fn for_tables() -> Self {
        Self {
            with_dependencies: true,
            ..Self::base()
        }
    }

    /// Profile for functions, stored procedures and sequences: only the
    /// requested objects are scripted.
    pub const fn for_modules() -> Self {
        Self {
            with_dependencies: false,
            ..Self::base()
        }
    }

    const fn base() -> Self {
        Self {
            allow_system_objects: false,
            script_owner: false,
            no_collation: true,
            include_if_not_exists: false,
            script_drops: false,
            with_dependencies: false,
            indexes: true,
            triggers: true,
            dri_foreign_keys: true,
            dri_all_constraints: true,
            batch_terminator: true,
        }
    }
}
