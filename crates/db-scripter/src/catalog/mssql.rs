//! SQL Server catalog backed by a live session.

use async_trait::async_trait;
use tiberius::{Row, ToSql};
use tracing::debug;

use super::{
    quote_ident, CatalogObject, CheckConstraint, Column, DefaultConstraint, ForeignKey, Index,
    KeyConstraint, ModuleDef, ObjectId, ObjectKind, SchemaCatalog, SequenceDef, TableDef,
};
use crate::connector::ServerSession;
use crate::error::{Result, ScriptError};
use crate::scripter::{ddl, ScriptingOptions};

/// Reads catalog views of one server through `<db>.sys.*` three-part names.
pub struct MssqlCatalog {
    session: ServerSession,
}

impl MssqlCatalog {
    pub fn new(session: ServerSession) -> Self {
        Self { session }
    }

    /// Access the underlying session.
    pub fn session_mut(&mut self) -> &mut ServerSession {
        &mut self.session
    }

    /// Release the catalog and close its session.
    pub async fn close(self) -> Result<()> {
        self.session.close().await
    }

    /// Run a parameterized catalog query, attributing failures to `object`.
    async fn fetch(
        &mut self,
        sql: &str,
        params: &[&dyn ToSql],
        object: &str,
    ) -> Result<Vec<Row>> {
        let client = self.session.client_mut();
        let stream = client
            .query(sql, params)
            .await
            .map_err(|e| ScriptError::catalog(object, e.to_string()))?;
        stream
            .into_first_result()
            .await
            .map_err(|e| ScriptError::catalog(object, e.to_string()))
    }

    /// Resolve an object to its object_id and owner, or fail with `ObjectNotFound`.
    async fn resolve(&mut self, id: &ObjectId) -> Result<(i32, Option<String>)> {
        let db = quote_ident(&id.database);
        let query = format!(
            r#"
            SELECT o.object_id, dp.name
            FROM {db}.sys.objects o
            JOIN {db}.sys.schemas s ON o.schema_id = s.schema_id
            LEFT JOIN {db}.sys.database_principals dp ON dp.principal_id = o.principal_id
            WHERE s.name = @P1 AND o.name = @P2 AND o.type IN ({types})
            "#,
            db = db,
            types = type_codes(id.kind)
        );

        let rows = self
            .fetch(&query, &[&id.schema.as_str(), &id.name.as_str()], &id.to_string())
            .await?;
        let row = rows
            .first()
            .ok_or_else(|| ScriptError::ObjectNotFound(id.to_string()))?;
        let object_id = row
            .get::<i32, _>(0)
            .ok_or_else(|| ScriptError::ObjectNotFound(id.to_string()))?;
        Ok((object_id, opt_text(row, 1)))
    }

    /// Load the full table definition used for scripting.
    async fn load_table(&mut self, id: &ObjectId) -> Result<TableDef> {
        let (object_id, owner) = self.resolve(id).await?;
        let mut table = TableDef {
            schema: id.schema.clone(),
            name: id.name.clone(),
            owner,
            ..Default::default()
        };

        self.load_columns(id, object_id, &mut table).await?;
        self.load_key_constraints(id, object_id, &mut table).await?;
        self.load_indexes(id, object_id, &mut table).await?;
        self.load_foreign_keys(id, object_id, &mut table).await?;
        self.load_check_constraints(id, object_id, &mut table).await?;
        self.load_default_constraints(id, object_id, &mut table).await?;
        self.load_triggers(id, object_id, &mut table).await?;

        debug!(
            "Loaded {}: {} columns, {} indexes, {} foreign keys, {} triggers",
            id,
            table.columns.len(),
            table.indexes.len(),
            table.foreign_keys.len(),
            table.triggers.len()
        );
        Ok(table)
    }

    async fn load_columns(&mut self, id: &ObjectId, object_id: i32, table: &mut TableDef) -> Result<()> {
        let db = quote_ident(&id.database);
        let query = format!(
            r#"
            SELECT
                c.name,
                ty.name,
                CAST(c.max_length AS INT),
                CAST(c.precision AS INT),
                CAST(c.scale AS INT),
                c.is_nullable,
                c.collation_name,
                CAST(ic.seed_value AS BIGINT),
                CAST(ic.increment_value AS BIGINT),
                cc.definition
            FROM {db}.sys.columns c
            JOIN {db}.sys.types ty ON c.user_type_id = ty.user_type_id
            LEFT JOIN {db}.sys.identity_columns ic
                ON ic.object_id = c.object_id AND ic.column_id = c.column_id
            LEFT JOIN {db}.sys.computed_columns cc
                ON cc.object_id = c.object_id AND cc.column_id = c.column_id
            WHERE c.object_id = @P1
            ORDER BY c.column_id
            "#,
            db = db
        );

        let rows = self.fetch(&query, &[&object_id], &id.to_string()).await?;
        for row in rows {
            let identity = match (row.get::<i64, _>(7), row.get::<i64, _>(8)) {
                (Some(seed), Some(increment)) => Some((seed, increment)),
                _ => None,
            };
            table.columns.push(Column {
                name: text(&row, 0),
                data_type: text(&row, 1),
                max_length: row.get::<i32, _>(2).unwrap_or(0),
                precision: row.get::<i32, _>(3).unwrap_or(0),
                scale: row.get::<i32, _>(4).unwrap_or(0),
                is_nullable: row.get::<bool, _>(5).unwrap_or(true),
                collation: opt_text(&row, 6),
                identity,
                computed_definition: opt_text(&row, 9),
            });
        }
        Ok(())
    }

    async fn load_key_constraints(
        &mut self,
        id: &ObjectId,
        object_id: i32,
        table: &mut TableDef,
    ) -> Result<()> {
        let db = quote_ident(&id.database);
        let query = format!(
            r#"
            SELECT
                kc.name,
                kc.type,
                i.type_desc,
                STUFF((
                    SELECT ',' + c.name
                    FROM {db}.sys.index_columns ic
                    JOIN {db}.sys.columns c ON ic.object_id = c.object_id AND ic.column_id = c.column_id
                    WHERE ic.object_id = i.object_id AND ic.index_id = i.index_id AND ic.is_included_column = 0
                    ORDER BY ic.key_ordinal
                    FOR XML PATH('')
                ), 1, 1, '') AS columns
            FROM {db}.sys.key_constraints kc
            JOIN {db}.sys.indexes i
                ON i.object_id = kc.parent_object_id AND i.index_id = kc.unique_index_id
            WHERE kc.parent_object_id = @P1
            ORDER BY kc.name
            "#,
            db = db
        );

        let rows = self.fetch(&query, &[&object_id], &id.to_string()).await?;
        for row in rows {
            let key = KeyConstraint {
                name: text(&row, 0),
                is_clustered: text(&row, 2) == "CLUSTERED",
                columns: split_list(&text(&row, 3)),
            };
            if text(&row, 1).trim() == "PK" {
                table.primary_key = Some(key);
            } else {
                table.unique_constraints.push(key);
            }
        }
        Ok(())
    }

    async fn load_indexes(&mut self, id: &ObjectId, object_id: i32, table: &mut TableDef) -> Result<()> {
        let db = quote_ident(&id.database);
        let query = format!(
            r#"
            SELECT
                i.name AS index_name,
                i.is_unique,
                i.type_desc,
                STUFF((
                    SELECT ',' + c2.name
                    FROM {db}.sys.index_columns ic2
                    JOIN {db}.sys.columns c2 ON ic2.object_id = c2.object_id AND ic2.column_id = c2.column_id
                    WHERE ic2.object_id = i.object_id AND ic2.index_id = i.index_id AND ic2.is_included_column = 0
                    ORDER BY ic2.key_ordinal
                    FOR XML PATH('')
                ), 1, 1, '') AS columns,
                ISNULL(STUFF((
                    SELECT ',' + c2.name
                    FROM {db}.sys.index_columns ic2
                    JOIN {db}.sys.columns c2 ON ic2.object_id = c2.object_id AND ic2.column_id = c2.column_id
                    WHERE ic2.object_id = i.object_id AND ic2.index_id = i.index_id AND ic2.is_included_column = 1
                    ORDER BY ic2.index_column_id
                    FOR XML PATH('')
                ), 1, 1, ''), '') AS include_columns,
                i.filter_definition
            FROM {db}.sys.indexes i
            WHERE i.object_id = @P1
              AND i.is_primary_key = 0
              AND i.is_unique_constraint = 0
              AND i.is_hypothetical = 0
              AND i.type IN (1, 2)
            ORDER BY i.name
            "#,
            db = db
        );

        let rows = self.fetch(&query, &[&object_id], &id.to_string()).await?;
        for row in rows {
            table.indexes.push(Index {
                name: text(&row, 0),
                is_unique: row.get::<bool, _>(1).unwrap_or(false),
                is_clustered: text(&row, 2) == "CLUSTERED",
                columns: split_list(&text(&row, 3)),
                include_cols: split_list(&text(&row, 4)),
                filter: opt_text(&row, 5),
            });
        }
        Ok(())
    }

    async fn load_foreign_keys(
        &mut self,
        id: &ObjectId,
        object_id: i32,
        table: &mut TableDef,
    ) -> Result<()> {
        let db = quote_ident(&id.database);
        let query = format!(
            r#"
            SELECT
                fk.name AS fk_name,
                STUFF((
                    SELECT ',' + pc2.name
                    FROM {db}.sys.foreign_key_columns fkc2
                    JOIN {db}.sys.columns pc2 ON fkc2.parent_object_id = pc2.object_id AND fkc2.parent_column_id = pc2.column_id
                    WHERE fkc2.constraint_object_id = fk.object_id
                    ORDER BY fkc2.constraint_column_id
                    FOR XML PATH('')
                ), 1, 1, '') AS parent_columns,
                rs.name AS ref_schema,
                rt.name AS ref_table,
                STUFF((
                    SELECT ',' + rc2.name
                    FROM {db}.sys.foreign_key_columns fkc2
                    JOIN {db}.sys.columns rc2 ON fkc2.referenced_object_id = rc2.object_id AND fkc2.referenced_column_id = rc2.column_id
                    WHERE fkc2.constraint_object_id = fk.object_id
                    ORDER BY fkc2.constraint_column_id
                    FOR XML PATH('')
                ), 1, 1, '') AS ref_columns,
                fk.delete_referential_action_desc,
                fk.update_referential_action_desc
            FROM {db}.sys.foreign_keys fk
            JOIN {db}.sys.tables rt ON fk.referenced_object_id = rt.object_id
            JOIN {db}.sys.schemas rs ON rt.schema_id = rs.schema_id
            WHERE fk.parent_object_id = @P1
            ORDER BY fk.name
            "#,
            db = db
        );

        let rows = self.fetch(&query, &[&object_id], &id.to_string()).await?;
        for row in rows {
            table.foreign_keys.push(ForeignKey {
                name: text(&row, 0),
                columns: split_list(&text(&row, 1)),
                ref_schema: text(&row, 2),
                ref_table: text(&row, 3),
                ref_columns: split_list(&text(&row, 4)),
                on_delete: text(&row, 5),
                on_update: text(&row, 6),
            });
        }
        Ok(())
    }

    async fn load_check_constraints(
        &mut self,
        id: &ObjectId,
        object_id: i32,
        table: &mut TableDef,
    ) -> Result<()> {
        let db = quote_ident(&id.database);
        let query = format!(
            r#"
            SELECT cc.name, cc.definition
            FROM {db}.sys.check_constraints cc
            WHERE cc.parent_object_id = @P1
            ORDER BY cc.name
            "#,
            db = db
        );

        let rows = self.fetch(&query, &[&object_id], &id.to_string()).await?;
        for row in rows {
            table.check_constraints.push(CheckConstraint {
                name: text(&row, 0),
                definition: text(&row, 1),
            });
        }
        Ok(())
    }

    async fn load_default_constraints(
        &mut self,
        id: &ObjectId,
        object_id: i32,
        table: &mut TableDef,
    ) -> Result<()> {
        let db = quote_ident(&id.database);
        let query = format!(
            r#"
            SELECT dc.name, c.name, dc.definition
            FROM {db}.sys.default_constraints dc
            JOIN {db}.sys.columns c
                ON c.object_id = dc.parent_object_id AND c.column_id = dc.parent_column_id
            WHERE dc.parent_object_id = @P1
            ORDER BY c.column_id
            "#,
            db = db
        );

        let rows = self.fetch(&query, &[&object_id], &id.to_string()).await?;
        for row in rows {
            table.default_constraints.push(DefaultConstraint {
                name: text(&row, 0),
                column: text(&row, 1),
                definition: text(&row, 2),
            });
        }
        Ok(())
    }

    async fn load_triggers(&mut self, id: &ObjectId, object_id: i32, table: &mut TableDef) -> Result<()> {
        let db = quote_ident(&id.database);
        let query = format!(
            r#"
            SELECT tr.name, m.definition, m.uses_ansi_nulls, m.uses_quoted_identifier
            FROM {db}.sys.triggers tr
            JOIN {db}.sys.sql_modules m ON m.object_id = tr.object_id
            WHERE tr.parent_id = @P1
            ORDER BY tr.name
            "#,
            db = db
        );

        let rows = self.fetch(&query, &[&object_id], &id.to_string()).await?;
        for row in rows {
            let name = text(&row, 0);
            let definition = opt_text(&row, 1).ok_or_else(|| {
                ScriptError::catalog(
                    format!("{} trigger {}", id, quote_ident(&name)),
                    "definition is encrypted or not visible",
                )
            })?;
            table.triggers.push(ModuleDef {
                schema: id.schema.clone(),
                name,
                definition,
                uses_ansi_nulls: row.get::<bool, _>(2).unwrap_or(true),
                uses_quoted_identifier: row.get::<bool, _>(3).unwrap_or(true),
            });
        }
        Ok(())
    }

    /// Load the stored definition of a function or procedure.
    async fn load_module(&mut self, id: &ObjectId) -> Result<ModuleDef> {
        let (object_id, _) = self.resolve(id).await?;
        let db = quote_ident(&id.database);
        let query = format!(
            r#"
            SELECT m.definition, m.uses_ansi_nulls, m.uses_quoted_identifier
            FROM {db}.sys.sql_modules m
            WHERE m.object_id = @P1
            "#,
            db = db
        );

        let rows = self.fetch(&query, &[&object_id], &id.to_string()).await?;
        let row = rows
            .first()
            .ok_or_else(|| ScriptError::catalog(id.to_string(), "no module definition"))?;
        let definition = opt_text(row, 0).ok_or_else(|| {
            ScriptError::catalog(id.to_string(), "definition is encrypted or not visible")
        })?;

        Ok(ModuleDef {
            schema: id.schema.clone(),
            name: id.name.clone(),
            definition,
            uses_ansi_nulls: row.get::<bool, _>(1).unwrap_or(true),
            uses_quoted_identifier: row.get::<bool, _>(2).unwrap_or(true),
        })
    }

    async fn load_sequence(&mut self, id: &ObjectId) -> Result<SequenceDef> {
        let db = quote_ident(&id.database);
        let query = format!(
            r#"
            SELECT
                ty.name,
                CAST(sq.start_value AS NVARCHAR(64)),
                CAST(sq.increment AS NVARCHAR(64)),
                CAST(sq.minimum_value AS NVARCHAR(64)),
                CAST(sq.maximum_value AS NVARCHAR(64)),
                sq.is_cycling,
                sq.is_cached,
                sq.cache_size
            FROM {db}.sys.sequences sq
            JOIN {db}.sys.schemas s ON sq.schema_id = s.schema_id
            JOIN {db}.sys.types ty ON sq.user_type_id = ty.user_type_id
            WHERE s.name = @P1 AND sq.name = @P2
            "#,
            db = db
        );

        let rows = self
            .fetch(&query, &[&id.schema.as_str(), &id.name.as_str()], &id.to_string())
            .await?;
        let row = rows
            .first()
            .ok_or_else(|| ScriptError::ObjectNotFound(id.to_string()))?;

        let cache_size = if row.get::<bool, _>(6).unwrap_or(true) {
            Some(row.get::<i32, _>(7).unwrap_or(0))
        } else {
            None
        };

        Ok(SequenceDef {
            schema: id.schema.clone(),
            name: id.name.clone(),
            data_type: text(row, 0),
            start_value: text(row, 1),
            increment: text(row, 2),
            minimum_value: text(row, 3),
            maximum_value: text(row, 4),
            is_cycling: row.get::<bool, _>(5).unwrap_or(false),
            cache_size,
        })
    }
}

#[async_trait]
impl SchemaCatalog for MssqlCatalog {
    async fn server_version(&mut self) -> Result<String> {
        self.session.server_version().await
    }

    async fn list_objects(
        &mut self,
        database: &str,
        kind: ObjectKind,
    ) -> Result<Vec<CatalogObject>> {
        let db = quote_ident(database);
        // SSMS-created support objects (sysdiagrams and friends) count as system objects
        let query = format!(
            r#"
            SELECT
                s.name,
                o.name,
                CAST(CASE
                    WHEN o.is_ms_shipped = 1 THEN 1
                    WHEN EXISTS (
                        SELECT 1 FROM {db}.sys.extended_properties ep
                        WHERE ep.class = 1 AND ep.major_id = o.object_id AND ep.minor_id = 0
                          AND ep.name = N'microsoft_database_tools_support'
                    ) THEN 1
                    ELSE 0
                END AS BIT)
            FROM {db}.sys.objects o
            JOIN {db}.sys.schemas s ON o.schema_id = s.schema_id
            WHERE o.type IN ({types})
            ORDER BY s.name, o.name
            "#,
            db = db,
            types = type_codes(kind)
        );

        let rows = self.fetch(&query, &[], &db).await?;
        let objects = rows
            .iter()
            .map(|row| CatalogObject {
                id: ObjectId::new(database, text(row, 0), text(row, 1), kind),
                is_system_object: row.get::<bool, _>(2).unwrap_or(false),
            })
            .collect();
        Ok(objects)
    }

    async fn dependencies(&mut self, id: &ObjectId) -> Result<Vec<ObjectId>> {
        let (object_id, _) = self.resolve(id).await?;
        let db = quote_ident(&id.database);

        // Foreign key targets plus objects referenced from expressions
        // (computed columns, defaults, module bodies).
        let query = format!(
            r#"
            SELECT rs.name, ro.name, ro.type
            FROM {db}.sys.foreign_keys fk
            JOIN {db}.sys.objects ro ON fk.referenced_object_id = ro.object_id
            JOIN {db}.sys.schemas rs ON ro.schema_id = rs.schema_id
            WHERE fk.parent_object_id = @P1 AND fk.referenced_object_id <> @P1
              AND ro.is_ms_shipped = 0
            UNION
            SELECT rs.name, ro.name, ro.type
            FROM {db}.sys.sql_expression_dependencies d
            JOIN {db}.sys.objects ro ON d.referenced_id = ro.object_id
            JOIN {db}.sys.schemas rs ON ro.schema_id = rs.schema_id
            WHERE d.referencing_id = @P1 AND d.referenced_id <> @P1
              AND ro.is_ms_shipped = 0
            ORDER BY 1, 2
            "#,
            db = db
        );

        let rows = self.fetch(&query, &[&object_id], &id.to_string()).await?;
        let deps = rows
            .iter()
            .filter_map(|row| {
                let kind = kind_from_type_code(&text(row, 2))?;
                Some(ObjectId::new(&id.database, text(row, 0), text(row, 1), kind))
            })
            .collect::<Vec<_>>();

        debug!("{} references {} scriptable objects", id, deps.len());
        Ok(deps)
    }

    async fn script_object(
        &mut self,
        id: &ObjectId,
        options: &ScriptingOptions,
    ) -> Result<Vec<String>> {
        match id.kind {
            ObjectKind::Table => {
                let table = self.load_table(id).await?;
                Ok(ddl::table_script(&table, options))
            }
            ObjectKind::Function => {
                let module = self.load_module(id).await?;
                Ok(ddl::module_script("FUNCTION", &module, options))
            }
            ObjectKind::StoredProcedure => {
                let module = self.load_module(id).await?;
                Ok(ddl::module_script("PROCEDURE", &module, options))
            }
            ObjectKind::Sequence => {
                let seq = self.load_sequence(id).await?;
                Ok(ddl::sequence_script(&seq, options))
            }
        }
    }
}

/// `sys.objects.type` codes per category, formatted for an IN list.
fn type_codes(kind: ObjectKind) -> &'static str {
    match kind {
        ObjectKind::Table => "'U'",
        ObjectKind::Function => "'FN', 'IF', 'TF', 'FS', 'FT'",
        ObjectKind::StoredProcedure => "'P', 'PC'",
        ObjectKind::Sequence => "'SO'",
    }
}

fn kind_from_type_code(code: &str) -> Option<ObjectKind> {
    match code.trim() {
        "U" => Some(ObjectKind::Table),
        "FN" | "IF" | "TF" | "FS" | "FT" => Some(ObjectKind::Function),
        "P" | "PC" => Some(ObjectKind::StoredProcedure),
        "SO" => Some(ObjectKind::Sequence),
        _ => None,
    }
}

fn text(row: &Row, idx: usize) -> String {
    row.get::<&str, _>(idx).unwrap_or_default().to_string()
}

fn opt_text(row: &Row, idx: usize) -> Option<String> {
    row.get::<&str, _>(idx).map(String::from)
}

fn split_list(s: &str) -> Vec<String> {
    s.split(',')
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
