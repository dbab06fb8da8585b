//! Migration plans and their execution.
//!
//! A plan is pure data: the declarative list of DDL operations derived from
//! a validated schema. It is serialized as the migration artifact and
//! interpreted against the live database by [`SchemaExecutor`]. Nothing
//! here loads or evaluates generated code.

use crate::error::{ForgeError, Result};
use crate::schema::{IndexKind, PrimaryKeyKind, RelationKind, ValidatedSchema};
use rusqlite::{Connection, params};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

/// One declarative DDL operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DdlOp {
    PrimaryKey {
        name: String,
        kind: PrimaryKeyKind,
    },
    Column {
        name: String,
        /// Logical column type ("string", "integer", "decimal", ...).
        column_type: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        length: Option<String>,
        #[serde(default)]
        nullable: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default: Option<String>,
        #[serde(default)]
        unsigned: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        index: Option<IndexKind>,
    },
    /// `created_at` / `updated_at` pair.
    Timestamps,
    /// Nullable `deleted_at`.
    SoftDeletes,
    /// `added_by` / `updated_by` pair.
    UserTracking,
    ForeignKey {
        column: String,
        references_table: String,
    },
}

/// Join table for a many-to-many association.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PivotTablePlan {
    pub table: String,
    pub left_key: String,
    pub right_key: String,
    #[serde(default)]
    pub extra_columns: Vec<PivotColumnPlan>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PivotColumnPlan {
    pub name: String,
    pub column_type: String,
}

/// The full migration for one module: its table plus any pivot tables.
/// Serialized verbatim as the migration artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationPlan {
    pub table: String,
    pub operations: Vec<DdlOp>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pivot_tables: Vec<PivotTablePlan>,
}

impl MigrationPlan {
    /// Derive the plan from a validated schema. `target_tables` maps
    /// module id to table name for association targets.
    pub fn from_schema(
        schema: &ValidatedSchema,
        target_tables: &HashMap<i64, String>,
    ) -> Result<Self> {
        let mut operations = vec![DdlOp::PrimaryKey {
            name: schema.primary_key_name.clone(),
            kind: schema.primary_key_type,
        }];

        for column in &schema.columns {
            operations.push(DdlOp::Column {
                name: column.name.clone(),
                column_type: column.column_type.clone(),
                length: column.length.clone(),
                nullable: column.nullable,
                default: column.default.clone(),
                unsigned: column.unsigned,
                index: column.index,
            });
        }

        let mut pivot_tables = Vec::new();
        for rel in &schema.relationships {
            let target_table = target_tables.get(&rel.module).ok_or_else(|| {
                ForgeError::Structural(format!(
                    "relationship targets unknown module {}",
                    rel.module
                ))
            })?;
            match rel.kind {
                RelationKind::BelongsTo => {
                    let column = rel
                        .foreign_key
                        .clone()
                        .unwrap_or_else(|| default_foreign_key(target_table));
                    operations.push(DdlOp::Column {
                        name: column.clone(),
                        column_type: "bigInteger".to_string(),
                        length: None,
                        nullable: true,
                        default: None,
                        unsigned: true,
                        index: Some(IndexKind::Index),
                    });
                    operations.push(DdlOp::ForeignKey {
                        column,
                        references_table: target_table.clone(),
                    });
                }
                RelationKind::BelongsToMany => {
                    // pivot_table presence is enforced at validation time
                    let table = rel.pivot_table.clone().ok_or_else(|| {
                        ForgeError::Structural("belongsToMany without pivot_table".into())
                    })?;
                    pivot_tables.push(PivotTablePlan {
                        table,
                        left_key: default_foreign_key(&schema.table_name),
                        right_key: default_foreign_key(target_table),
                        extra_columns: rel
                            .pivot_columns
                            .iter()
                            .map(|c| PivotColumnPlan {
                                name: c.name.clone(),
                                column_type: c.column_type.clone(),
                            })
                            .collect(),
                    });
                }
                RelationKind::HasOne | RelationKind::HasMany => {
                    // The foreign key lives on the other table.
                }
            }
        }

        if schema.user_tracking {
            operations.push(DdlOp::UserTracking);
        }
        if schema.timestamps {
            operations.push(DdlOp::Timestamps);
        }
        if schema.soft_deletes {
            operations.push(DdlOp::SoftDeletes);
        }

        Ok(Self {
            table: schema.table_name.clone(),
            operations,
            pivot_tables,
        })
    }

    /// The CREATE TABLE statement plus any index statements, in execution
    /// order.
    pub fn statements(&self) -> Vec<String> {
        let mut defs: Vec<String> = Vec::new();
        let mut constraints: Vec<String> = Vec::new();
        let mut indexes: Vec<String> = Vec::new();

        for op in &self.operations {
            match op {
                DdlOp::PrimaryKey { name, kind } => {
                    let def = match kind {
                        PrimaryKeyKind::Increments | PrimaryKeyKind::BigIncrements => {
                            format!("\"{name}\" INTEGER PRIMARY KEY AUTOINCREMENT")
                        }
                        PrimaryKeyKind::Uuid => format!("\"{name}\" TEXT PRIMARY KEY"),
                    };
                    defs.push(def);
                }
                DdlOp::Column {
                    name,
                    column_type,
                    nullable,
                    default,
                    index,
                    ..
                } => {
                    let mut def = format!("\"{name}\" {}", storage_type(column_type));
                    if !nullable {
                        def.push_str(" NOT NULL");
                    }
                    if let Some(value) = default {
                        def.push_str(&format!(" DEFAULT {}", sql_literal(value)));
                    }
                    defs.push(def);
                    match index {
                        Some(IndexKind::Unique) => indexes.push(format!(
                            "CREATE UNIQUE INDEX \"{0}_{1}_unique\" ON \"{0}\" (\"{1}\")",
                            self.table, name
                        )),
                        Some(IndexKind::Index) => indexes.push(format!(
                            "CREATE INDEX \"{0}_{1}_index\" ON \"{0}\" (\"{1}\")",
                            self.table, name
                        )),
                        Some(IndexKind::Primary) | None => {}
                    }
                }
                DdlOp::Timestamps => {
                    defs.push("\"created_at\" TEXT".to_string());
                    defs.push("\"updated_at\" TEXT".to_string());
                }
                DdlOp::SoftDeletes => {
                    defs.push("\"deleted_at\" TEXT".to_string());
                }
                DdlOp::UserTracking => {
                    defs.push("\"added_by\" INTEGER".to_string());
                    defs.push("\"updated_by\" INTEGER".to_string());
                }
                DdlOp::ForeignKey {
                    column,
                    references_table,
                } => {
                    constraints.push(format!(
                        "FOREIGN KEY (\"{column}\") REFERENCES \"{references_table}\" (\"id\")"
                    ));
                }
            }
        }

        defs.extend(constraints);
        let mut statements = vec![format!(
            "CREATE TABLE \"{}\" (\n    {}\n)",
            self.table,
            defs.join(",\n    ")
        )];
        statements.extend(indexes);

        for pivot in &self.pivot_tables {
            let mut defs = vec![
                "\"id\" INTEGER PRIMARY KEY AUTOINCREMENT".to_string(),
                format!("\"{}\" INTEGER NOT NULL", pivot.left_key),
                format!("\"{}\" INTEGER NOT NULL", pivot.right_key),
            ];
            for column in &pivot.extra_columns {
                defs.push(format!(
                    "\"{}\" {}",
                    column.name,
                    storage_type(&column.column_type)
                ));
            }
            statements.push(format!(
                "CREATE TABLE \"{}\" (\n    {}\n)",
                pivot.table,
                defs.join(",\n    ")
            ));
        }

        statements
    }
}

fn default_foreign_key(table: &str) -> String {
    format!("{}_id", crate::paths::singular(table))
}

/// Logical column type to SQLite storage class.
fn storage_type(column_type: &str) -> &'static str {
    match column_type {
        "integer" | "bigInteger" | "tinyInteger" | "smallInteger" | "mediumInteger"
        | "boolean" => "INTEGER",
        "decimal" | "float" | "double" => "REAL",
        "binary" => "BLOB",
        // string, char, text, longText, mediumText, enum, json, uuid,
        // date, dateTime, time, timestamp and everything else
        _ => "TEXT",
    }
}

fn sql_literal(value: &str) -> String {
    if value.parse::<f64>().is_ok() {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', "''"))
    }
}

/// Interprets migration plans against a live connection.
pub struct SchemaExecutor<'a> {
    conn: &'a Connection,
}

impl<'a> SchemaExecutor<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Execute the plan. A pre-existing table surfaces as
    /// [`ForgeError::TableExists`] so callers can report the collision
    /// instead of a raw driver error.
    pub fn apply(&self, plan: &MigrationPlan) -> Result<()> {
        if self.table_exists(&plan.table)? {
            return Err(ForgeError::TableExists(plan.table.clone()));
        }
        for statement in plan.statements() {
            self.conn
                .execute_batch(&statement)
                .map_err(|e| classify_db_error(e, &plan.table))?;
        }
        info!(table = %plan.table, "migration applied");
        Ok(())
    }

    pub fn table_exists(&self, table: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![table],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Drop the table if present. Returns whether a table was dropped, so
    /// destruction reports only list tables that actually existed.
    pub fn drop_table(&self, table: &str) -> Result<bool> {
        if !self.table_exists(table)? {
            debug!(table, "table absent, nothing to drop");
            return Ok(false);
        }
        self.conn
            .execute_batch(&format!("DROP TABLE \"{table}\""))?;
        Ok(true)
    }
}

fn classify_db_error(err: rusqlite::Error, table: &str) -> ForgeError {
    if err.to_string().contains("already exists") {
        ForgeError::TableExists(table.to_string())
    } else {
        ForgeError::Db(err)
    }
}
