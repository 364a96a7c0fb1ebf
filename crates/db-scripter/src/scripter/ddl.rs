//! T-SQL text generation from catalog metadata.
//!
//! Every function returns the script entries for one object, in the order a
//! server would need to execute them. Session-setting entries (`SET ...`) are
//! emitted the way the server's own scripter emits them; the
//! [`Scripter`](super::Scripter) line filter drops them afterwards.

use super::ScriptingOptions;
use crate::catalog::{
    quote_ident, CheckConstraint, Column, DefaultConstraint, ForeignKey, Index, KeyConstraint,
    ModuleDef, SequenceDef, TableDef,
};

/// Batch separator appended to each entry when `batch_terminator` is set.
pub const BATCH_TERMINATOR: &str = "\nGO\n";

/// Script a table with its keys, indexes, constraints and triggers.
pub fn table_script(table: &TableDef, options: &ScriptingOptions) -> Vec<String> {
    let full_name = table.full_name();

    if options.script_drops {
        let drop = format!("DROP TABLE {}", full_name);
        let drop = if options.include_if_not_exists {
            format!(
                "IF OBJECT_ID(N'{}', 'U') IS NOT NULL\n{}",
                escape_literal(&full_name),
                drop
            )
        } else {
            drop
        };
        return vec![terminate(drop, options)];
    }

    let mut entries = vec![
        terminate("SET ANSI_NULLS ON".to_string(), options),
        terminate("SET QUOTED_IDENTIFIER ON".to_string(), options),
    ];

    let mut body: Vec<String> = table
        .columns
        .iter()
        .map(|c| column_definition(c, options))
        .collect();

    if options.dri_all_constraints {
        if let Some(pk) = &table.primary_key {
            body.push(key_constraint(pk, "PRIMARY KEY"));
        }
        for uq in &table.unique_constraints {
            body.push(key_constraint(uq, "UNIQUE"));
        }
    }

    let create = format!("CREATE TABLE {}(\n\t{}\n)", full_name, body.join(",\n\t"));
    let create = if options.include_if_not_exists {
        format!(
            "IF NOT EXISTS (SELECT * FROM sys.objects WHERE object_id = OBJECT_ID(N'{}') AND type in (N'U'))\nBEGIN\n{}\nEND",
            escape_literal(&full_name),
            create
        )
    } else {
        create
    };
    entries.push(terminate(create, options));

    if options.script_owner {
        if let Some(owner) = &table.owner {
            entries.push(terminate(
                format!("ALTER AUTHORIZATION ON {} TO {}", full_name, quote_ident(owner)),
                options,
            ));
        }
    }

    if options.indexes {
        for idx in &table.indexes {
            entries.push(terminate(index_statement(&full_name, idx), options));
        }
    }

    if options.dri_all_constraints {
        for df in &table.default_constraints {
            entries.push(terminate(default_statement(&full_name, df), options));
        }
    }

    if options.dri_foreign_keys {
        for fk in &table.foreign_keys {
            entries.push(terminate(foreign_key_statement(&full_name, fk), options));
        }
    }

    if options.dri_all_constraints {
        for chk in &table.check_constraints {
            entries.push(terminate(check_statement(&full_name, chk), options));
        }
    }

    if options.triggers {
        for trigger in &table.triggers {
            entries.extend(module_script("TRIGGER", trigger, options));
        }
    }

    entries
}

/// Script a function, procedure or trigger from its stored definition.
///
/// `keyword` is the object keyword used in DROP statements
/// (`FUNCTION`, `PROCEDURE`, `TRIGGER`).
pub fn module_script(keyword: &str, module: &ModuleDef, options: &ScriptingOptions) -> Vec<String> {
    let full_name = format!("{}.{}", quote_ident(&module.schema), quote_ident(&module.name));

    if options.script_drops {
        let drop = format!("DROP {} {}", keyword, full_name);
        let drop = if options.include_if_not_exists {
            format!(
                "IF OBJECT_ID(N'{}') IS NOT NULL\n{}",
                escape_literal(&full_name),
                drop
            )
        } else {
            drop
        };
        return vec![terminate(drop, options)];
    }

    let definition = module.definition.trim_end().to_string();
    let create = if options.include_if_not_exists {
        format!(
            "IF NOT EXISTS (SELECT * FROM sys.objects WHERE object_id = OBJECT_ID(N'{}'))\nBEGIN\nEXEC dbo.sp_executesql @statement = N'{}'\nEND",
            escape_literal(&full_name),
            escape_literal(&definition)
        )
    } else {
        definition
    };

    vec![
        terminate(format!("SET ANSI_NULLS {}", on_off(module.uses_ansi_nulls)), options),
        terminate(
            format!("SET QUOTED_IDENTIFIER {}", on_off(module.uses_quoted_identifier)),
            options,
        ),
        terminate(create, options),
    ]
}

/// Script a sequence.
pub fn sequence_script(seq: &SequenceDef, options: &ScriptingOptions) -> Vec<String> {
    let full_name = format!("{}.{}", quote_ident(&seq.schema), quote_ident(&seq.name));

    if options.script_drops {
        return vec![terminate(format!("DROP SEQUENCE {}", full_name), options)];
    }

    let cache = match seq.cache_size {
        Some(size) if size > 0 => format!("CACHE  {}", size),
        Some(_) => "CACHE ".to_string(),
        None => "NO CACHE ".to_string(),
    };

    let create = format!(
        "CREATE SEQUENCE {} \n AS {}\n START WITH {}\n INCREMENT BY {}\n MINVALUE {}\n MAXVALUE {}\n {}\n {}",
        full_name,
        quote_ident(&seq.data_type),
        seq.start_value,
        seq.increment,
        seq.minimum_value,
        seq.maximum_value,
        if seq.is_cycling { "CYCLE" } else { "NO CYCLE" },
        cache
    );
    let create = if options.include_if_not_exists {
        format!(
            "IF NOT EXISTS (SELECT * FROM sys.sequences WHERE object_id = OBJECT_ID(N'{}'))\nBEGIN\n{}\nEND",
            escape_literal(&full_name),
            create
        )
    } else {
        create
    };

    vec![terminate(create, options)]
}

/// Render one column of a CREATE TABLE body.
pub fn column_definition(col: &Column, options: &ScriptingOptions) -> String {
    if let Some(expr) = &col.computed_definition {
        return format!("{} AS {}", quote_ident(&col.name), expr);
    }

    let mut def = format!(
        "{} {}",
        quote_ident(&col.name),
        format_type(&col.data_type, col.max_length, col.precision, col.scale)
    );

    if !options.no_collation {
        if let Some(collation) = &col.collation {
            def.push_str(&format!(" COLLATE {}", collation));
        }
    }

    if let Some((seed, increment)) = col.identity {
        def.push_str(&format!(" IDENTITY({},{})", seed, increment));
    }

    def.push_str(if col.is_nullable { " NULL" } else { " NOT NULL" });
    def
}

/// Format a SQL Server type with proper length/precision.
pub fn format_type(data_type: &str, max_length: i32, precision: i32, scale: i32) -> String {
    let lower = data_type.to_lowercase();
    let quoted = quote_ident(data_type);
    match lower.as_str() {
        "float" => {
            if precision > 0 && precision != 53 {
                format!("{}({})", quoted, precision)
            } else {
                quoted
            }
        }

        "decimal" | "numeric" => format!("{}({}, {})", quoted, precision, scale),

        "datetime2" | "time" | "datetimeoffset" => format!("{}({})", quoted, scale),

        "char" | "varchar" | "nchar" | "nvarchar" => {
            if max_length == -1 {
                format!("{}(max)", quoted)
            } else {
                // max_length is in bytes; n-types store two bytes per character
                let len = if lower.starts_with('n') {
                    max_length / 2
                } else {
                    max_length
                };
                format!("{}({})", quoted, len)
            }
        }

        "binary" | "varbinary" => {
            if max_length == -1 {
                format!("{}(max)", quoted)
            } else {
                format!("{}({})", quoted, max_length)
            }
        }

        _ => quoted,
    }
}

fn key_constraint(key: &KeyConstraint, kind: &str) -> String {
    let cols: Vec<String> = key
        .columns
        .iter()
        .map(|c| format!("\t{} ASC", quote_ident(c)))
        .collect();
    format!(
        "CONSTRAINT {} {} {} \n(\n{}\n)",
        quote_ident(&key.name),
        kind,
        if key.is_clustered { "CLUSTERED" } else { "NONCLUSTERED" },
        cols.join(",\n")
    )
}

fn index_statement(table: &str, idx: &Index) -> String {
    let cols: Vec<String> = idx
        .columns
        .iter()
        .map(|c| format!("\t{} ASC", quote_ident(c)))
        .collect();

    let mut sql = format!(
        "CREATE {}{}INDEX {} ON {}\n(\n{}\n)",
        if idx.is_unique { "UNIQUE " } else { "" },
        if idx.is_clustered { "CLUSTERED " } else { "NONCLUSTERED " },
        quote_ident(&idx.name),
        table,
        cols.join(",\n")
    );

    if !idx.include_cols.is_empty() {
        let include: Vec<String> = idx.include_cols.iter().map(|c| quote_ident(c)).collect();
        sql.push_str(&format!("\nINCLUDE({})", include.join(",")));
    }

    if let Some(filter) = &idx.filter {
        sql.push_str(&format!("\nWHERE {}", filter));
    }

    sql
}

fn default_statement(table: &str, df: &DefaultConstraint) -> String {
    format!(
        "ALTER TABLE {} ADD CONSTRAINT {} DEFAULT {} FOR {}",
        table,
        quote_ident(&df.name),
        df.definition,
        quote_ident(&df.column)
    )
}

fn foreign_key_statement(table: &str, fk: &ForeignKey) -> String {
    let fk_cols: Vec<String> = fk.columns.iter().map(|c| quote_ident(c)).collect();
    let ref_cols: Vec<String> = fk.ref_columns.iter().map(|c| quote_ident(c)).collect();

    let mut sql = format!(
        "ALTER TABLE {} WITH CHECK ADD CONSTRAINT {} FOREIGN KEY({})\nREFERENCES {}.{} ({})",
        table,
        quote_ident(&fk.name),
        fk_cols.join(", "),
        quote_ident(&fk.ref_schema),
        quote_ident(&fk.ref_table),
        ref_cols.join(", ")
    );

    for (clause, action) in [("DELETE", &fk.on_delete), ("UPDATE", &fk.on_update)] {
        if !action.is_empty() && action != "NO_ACTION" {
            sql.push_str(&format!("\nON {} {}", clause, action.replace('_', " ")));
        }
    }

    sql
}

fn check_statement(table: &str, chk: &CheckConstraint) -> String {
    format!(
        "ALTER TABLE {} WITH CHECK ADD CONSTRAINT {} CHECK ({})",
        table,
        quote_ident(&chk.name),
        strip_outer_parens(&chk.definition)
    )
}

/// The catalog stores check definitions wrapped in one pair of parentheses.
fn strip_outer_parens(definition: &str) -> &str {
    let trimmed = definition.trim();
    if trimmed.starts_with('(') && trimmed.ends_with(')') && balanced(&trimmed[1..trimmed.len() - 1]) {
        &trimmed[1..trimmed.len() - 1]
    } else {
        trimmed
    }
}

fn balanced(s: &str) -> bool {
    let mut depth = 0i32;
    for ch in s.chars() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "ON"
    } else {
        "OFF"
    }
}

fn escape_literal(s: &str) -> String {
    s.replace('\'', "''")
}

fn terminate(entry: String, options: &ScriptingOptions) -> String {
    if options.batch_terminator {
        entry + BATCH_TERMINATOR
    } else {
        entry
    }
}
