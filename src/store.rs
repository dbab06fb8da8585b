//! Metadata persistence: the `modules`, `module_translations` and
//! `role_permissions` tables, plus transaction control for batch drivers.
//!
//! Generated module tables live in the same database; their DDL is executed
//! by [`crate::ddl::SchemaExecutor`], never here.

use crate::error::Result;
use crate::schema::{ModuleSchema, ValidatedSchema};
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::Path;
use tracing::debug;

const METADATA_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS modules (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    name            TEXT NOT NULL,
    group_id        INTEGER NOT NULL,
    parent_id       INTEGER REFERENCES modules(id),
    type            INTEGER NOT NULL DEFAULT 1,
    module_type     INTEGER NOT NULL DEFAULT 1,
    description     TEXT,
    show_in_menu    INTEGER NOT NULL DEFAULT 1,
    url             TEXT NOT NULL,
    icon            TEXT NOT NULL,
    slug            TEXT NOT NULL,
    sort_order      INTEGER NOT NULL DEFAULT 0,
    table_name      TEXT NOT NULL,
    readable        INTEGER NOT NULL DEFAULT 1,
    writable        INTEGER NOT NULL DEFAULT 1,
    editable        INTEGER NOT NULL DEFAULT 1,
    deletable       INTEGER NOT NULL DEFAULT 1,
    created_at      TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at      TEXT NOT NULL DEFAULT (datetime('now')),
    deleted_at      TEXT
);

CREATE TABLE IF NOT EXISTS module_translations (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    module_id       INTEGER NOT NULL REFERENCES modules(id),
    locale          TEXT NOT NULL,
    singular_name   TEXT NOT NULL,
    plural_name     TEXT NOT NULL,
    UNIQUE (module_id, locale)
);

CREATE TABLE IF NOT EXISTS role_permissions (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    role_id         INTEGER NOT NULL,
    module_id       INTEGER NOT NULL REFERENCES modules(id),
    can_read        INTEGER NOT NULL DEFAULT 0,
    can_write       INTEGER NOT NULL DEFAULT 0,
    can_edit        INTEGER NOT NULL DEFAULT 0,
    can_delete      INTEGER NOT NULL DEFAULT 0,
    UNIQUE (role_id, module_id)
);
"#;

/// A persisted module row.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ModuleRecord {
    pub id: i64,
    pub name: String,
    pub group_id: i64,
    pub parent_id: Option<i64>,
    pub module_kind: i64,
    pub module_type: i64,
    pub url: String,
    pub slug: String,
    pub table_name: String,
}

impl ModuleRecord {
    fn from_row(row: &Row) -> std::result::Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            group_id: row.get("group_id")?,
            parent_id: row.get("parent_id")?,
            module_kind: row.get("type")?,
            module_type: row.get("module_type")?,
            url: row.get("url")?,
            slug: row.get("slug")?,
            table_name: row.get("table_name")?,
        })
    }
}

pub struct MetadataStore {
    conn: Connection,
}

impl MetadataStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(METADATA_SCHEMA)?;
        Ok(())
    }

    /// The underlying connection, for DDL execution against generated
    /// tables. Statements run here participate in any open transaction.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    // === Transaction control (batch drivers only) ===

    pub fn begin(&self) -> Result<()> {
        self.conn.execute_batch("BEGIN IMMEDIATE")?;
        Ok(())
    }

    pub fn commit(&self) -> Result<()> {
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    pub fn rollback(&self) -> Result<()> {
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }

    // === Uniqueness probes (non-deleted modules only) ===

    pub fn name_taken(&self, name: &str) -> Result<bool> {
        self.taken("name", name)
    }

    pub fn url_taken(&self, url: &str) -> Result<bool> {
        self.taken("url", url)
    }

    pub fn slug_taken(&self, slug: &str) -> Result<bool> {
        self.taken("slug", slug)
    }

    fn taken(&self, column: &str, value: &str) -> Result<bool> {
        let sql =
            format!("SELECT COUNT(*) FROM modules WHERE {column} = ?1 AND deleted_at IS NULL");
        let count: i64 = self.conn.query_row(&sql, params![value], |row| row.get(0))?;
        Ok(count > 0)
    }

    pub fn module_exists(&self, id: i64) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM modules WHERE id = ?1 AND deleted_at IS NULL",
            params![id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    // === Writes ===

    /// Persist the module row, its translations and (optionally) a full
    /// permission grant for one role. One transaction; the returned id is
    /// final only once the caller's surrounding work also succeeds.
    pub fn create_module(
        &self,
        schema: &ValidatedSchema,
        seed_role: Option<i64>,
    ) -> Result<i64> {
        let tx = self.conn.unchecked_transaction()?;
        let id = insert_module(&tx, schema)?;
        for (locale, translation) in &schema.translations {
            tx.execute(
                "INSERT INTO module_translations (module_id, locale, singular_name, plural_name)
                 VALUES (?1, ?2, ?3, ?4)",
                params![id, locale, translation.singular_name, translation.plural_name],
            )?;
        }
        if let Some(role_id) = seed_role {
            tx.execute(
                "INSERT INTO role_permissions (role_id, module_id, can_read, can_write, can_edit, can_delete)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    role_id,
                    id,
                    schema.readable,
                    schema.writable,
                    schema.editable,
                    schema.deletable
                ],
            )?;
        }
        tx.commit()?;
        debug!(module_id = id, name = %schema.name, "module metadata persisted");
        Ok(id)
    }

    /// Compensating delete for a module whose migration failed after the
    /// metadata transaction already committed.
    pub fn delete_module_metadata(&self, id: i64) -> Result<()> {
        self.conn.execute(
            "DELETE FROM role_permissions WHERE module_id = ?1",
            params![id],
        )?;
        self.conn.execute(
            "DELETE FROM module_translations WHERE module_id = ?1",
            params![id],
        )?;
        self.conn
            .execute("DELETE FROM modules WHERE id = ?1", params![id])?;
        Ok(())
    }

    // === Reads ===

    pub fn get_module_by_name(&self, name: &str) -> Result<Option<ModuleRecord>> {
        let record = self
            .conn
            .query_row(
                "SELECT * FROM modules WHERE name = ?1 AND deleted_at IS NULL",
                params![name],
                ModuleRecord::from_row,
            )
            .optional()?;
        Ok(record)
    }

    pub fn get_module(&self, id: i64) -> Result<Option<ModuleRecord>> {
        let record = self
            .conn
            .query_row(
                "SELECT * FROM modules WHERE id = ?1 AND deleted_at IS NULL",
                params![id],
                ModuleRecord::from_row,
            )
            .optional()?;
        Ok(record)
    }

    pub fn children_of(&self, id: i64) -> Result<Vec<ModuleRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT * FROM modules WHERE parent_id = ?1 AND deleted_at IS NULL ORDER BY id",
        )?;
        let rows = stmt.query_map(params![id], ModuleRecord::from_row)?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    pub fn root_modules(&self) -> Result<Vec<ModuleRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT * FROM modules WHERE parent_id IS NULL AND deleted_at IS NULL ORDER BY id",
        )?;
        let rows = stmt.query_map([], ModuleRecord::from_row)?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    // === Destruction primitives ===
    // Plain connection statements so they participate in an outer
    // transaction when one is open.

    /// Returns the number of permission rows removed.
    pub fn delete_permissions(&self, module_id: i64) -> Result<usize> {
        let n = self.conn.execute(
            "DELETE FROM role_permissions WHERE module_id = ?1",
            params![module_id],
        )?;
        Ok(n)
    }

    pub fn delete_translations(&self, module_id: i64) -> Result<usize> {
        let n = self.conn.execute(
            "DELETE FROM module_translations WHERE module_id = ?1",
            params![module_id],
        )?;
        Ok(n)
    }

    pub fn hard_delete_module(&self, module_id: i64) -> Result<()> {
        self.conn
            .execute("DELETE FROM modules WHERE id = ?1", params![module_id])?;
        Ok(())
    }
}

fn insert_module(
    conn: &Connection,
    schema: &ModuleSchema,
) -> std::result::Result<i64, rusqlite::Error> {
    conn.execute(
        "INSERT INTO modules
            (name, group_id, parent_id, type, module_type, description, show_in_menu,
             url, icon, slug, sort_order, table_name,
             readable, writable, editable, deletable)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
        params![
            schema.name,
            schema.group_id,
            schema.parent_id,
            schema.module_kind,
            schema.module_type,
            schema.description,
            schema.show_in_menu,
            schema.url,
            schema.icon,
            schema.slug,
            schema.sort_order,
            schema.table_name,
            schema.readable,
            schema.writable,
            schema.editable,
            schema.deletable
        ],
    )?;
    Ok(conn.last_insert_rowid())
}
