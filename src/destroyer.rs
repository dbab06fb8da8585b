//! Module destruction: the inverse ledger walk.
//!
//! Destruction never throws at the surface. [`ModuleDestroyer::destroy`]
//! always returns a [`DestructionReport`]; whatever was removed before a
//! failure stays listed in `deleted_items` so the operator can see exactly
//! how far teardown got. The workspace-wide [`ModuleDestroyer::refresh`]
//! runs in two phases: dropped tables and deleted files are permanent the
//! moment they happen, so those go first, and only then do the metadata
//! rows for the whole batch ride a single transaction.

use crate::config::EngineConfig;
use crate::ddl::SchemaExecutor;
use crate::error::{ForgeError, Result};
use crate::paths::{ArtifactPaths, ModuleNames};
use crate::routes::{RemoveOutcome, RouteLedger};
use crate::store::{MetadataStore, ModuleRecord};
use crate::translations::TranslationCache;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};
use walkdir::WalkDir;

/// The outcome of one destroy call, cascade included.
#[derive(Debug, Serialize)]
pub struct DestructionReport {
    pub success: bool,
    pub deleted_items: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub has_children: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<String>,
}

impl DestructionReport {
    fn refused(children: Vec<String>) -> Self {
        Self {
            success: false,
            deleted_items: Vec::new(),
            error: Some("Module has child modules".to_string()),
            has_children: true,
            children,
        }
    }

    fn failed(error: String, deleted_items: Vec<String>) -> Self {
        Self {
            success: false,
            deleted_items,
            error: Some(error),
            has_children: false,
            children: Vec::new(),
        }
    }

    fn succeeded(deleted_items: Vec<String>) -> Self {
        Self {
            success: true,
            deleted_items,
            error: None,
            has_children: false,
            children: Vec::new(),
        }
    }
}

pub struct ModuleDestroyer<'a> {
    store: &'a MetadataStore,
    paths: ArtifactPaths,
    locales: Vec<String>,
    cache: &'a TranslationCache,
}

impl<'a> ModuleDestroyer<'a> {
    pub fn new(
        config: &EngineConfig,
        store: &'a MetadataStore,
        cache: &'a TranslationCache,
    ) -> Self {
        Self {
            store,
            paths: ArtifactPaths::new(config),
            locales: config.locales.clone(),
            cache,
        }
    }

    /// Tear down a module by name. Without `cascade`, a module with
    /// children is refused before anything is touched.
    pub fn destroy(&self, module_name: &str, cascade: bool) -> DestructionReport {
        let mut deleted = Vec::new();
        match self.run(module_name, cascade, &mut deleted) {
            Ok(Some(report)) => report,
            Ok(None) => DestructionReport::succeeded(deleted),
            Err(ForgeError::HasChildren { children, .. }) => {
                DestructionReport::refused(children)
            }
            Err(e) => {
                warn!(module = module_name, error = %e, "module destruction failed");
                DestructionReport::failed(e.to_string(), deleted)
            }
        }
    }

    fn run(
        &self,
        module_name: &str,
        cascade: bool,
        deleted: &mut Vec<String>,
    ) -> Result<Option<DestructionReport>> {
        let Some(record) = self.store.get_module_by_name(module_name)? else {
            return Ok(Some(DestructionReport::failed(
                format!("Module not found: {module_name}"),
                Vec::new(),
            )));
        };

        let children = self.store.children_of(record.id)?;
        if !children.is_empty() && !cascade {
            return Err(ForgeError::HasChildren {
                module: record.name,
                children: children.into_iter().map(|c| c.name).collect(),
            });
        }

        self.destroy_tree(&record, deleted)?;
        Ok(None)
    }

    /// Tear down every module in the workspace, children before parents,
    /// one report per root. Table drops and file deletes run first and are
    /// permanent whatever happens next; the metadata rows for the whole
    /// batch are then deleted inside one transaction. A failure therefore
    /// leaves every row in place while the drops already done stay done.
    pub fn refresh(&self) -> Result<Vec<DestructionReport>> {
        let mut batches = Vec::new();
        for root in self.store.root_modules()? {
            let mut order = Vec::new();
            self.collect_subtree(&root, &mut order)?;
            batches.push((order, Vec::new()));
        }

        for (order, items) in &mut batches {
            for record in order.iter() {
                if let Err(e) = self.teardown_artifacts(record, items) {
                    return Err(refresh_abort(&record.name, &e));
                }
            }
        }

        self.store.begin()?;
        for (order, items) in &mut batches {
            for record in order.iter() {
                let rows = self
                    .delete_permission_rows(record, items)
                    .and_then(|()| self.delete_module_rows(record, items));
                if let Err(e) = rows {
                    self.store.rollback()?;
                    return Err(refresh_abort(&record.name, &e));
                }
            }
        }
        self.store.commit()?;

        Ok(batches
            .into_iter()
            .map(|(_, items)| DestructionReport::succeeded(items))
            .collect())
    }

    fn collect_subtree(&self, record: &ModuleRecord, order: &mut Vec<ModuleRecord>) -> Result<()> {
        for child in self.store.children_of(record.id)? {
            self.collect_subtree(&child, order)?;
        }
        order.push(record.clone());
        Ok(())
    }

    /// Depth-first: grandchildren before children before the module.
    fn destroy_tree(&self, record: &ModuleRecord, deleted: &mut Vec<String>) -> Result<()> {
        for child in self.store.children_of(record.id)? {
            self.destroy_tree(&child, deleted)?;
        }
        self.destroy_components(record, deleted)
    }

    fn destroy_components(&self, record: &ModuleRecord, deleted: &mut Vec<String>) -> Result<()> {
        self.delete_permission_rows(record, deleted)?;
        self.teardown_artifacts(record, deleted)?;
        self.delete_module_rows(record, deleted)?;

        info!(module = %record.name, "module destroyed");
        Ok(())
    }

    fn delete_permission_rows(&self, record: &ModuleRecord, deleted: &mut Vec<String>) -> Result<()> {
        self.store.delete_permissions(record.id)?;
        deleted.push(format!("Role permissions for module: {}", record.name));
        Ok(())
    }

    /// The irreversible part of teardown: table, files, routes,
    /// translation files. No metadata row is touched here.
    fn teardown_artifacts(&self, record: &ModuleRecord, deleted: &mut Vec<String>) -> Result<()> {
        let names = ModuleNames::derive(&record.name);
        let table = if record.table_name.is_empty() {
            names.fallback_table()
        } else {
            record.table_name.clone()
        };

        // Database table (absent table is not an error)
        if SchemaExecutor::new(self.store.connection()).drop_table(&table)? {
            deleted.push(format!("Database table: {table}"));
        }

        self.delete_generated_files(&names, &table, deleted)?;

        if self.remove_routes(&names)? {
            deleted.push(format!("Routes for module: {}", record.name));
        }

        if self.delete_translation_files(&names)? {
            deleted.push(format!("Translation files for module: {}", record.name));
        }
        self.cache.invalidate_module(&names.studly);

        Ok(())
    }

    /// Metadata rows, module record last.
    fn delete_module_rows(&self, record: &ModuleRecord, deleted: &mut Vec<String>) -> Result<()> {
        self.store.delete_translations(record.id)?;
        self.store.hard_delete_module(record.id)?;
        deleted.push(format!("Module record: {}", record.name));
        Ok(())
    }

    fn delete_generated_files(
        &self,
        names: &ModuleNames,
        table: &str,
        deleted: &mut Vec<String>,
    ) -> Result<()> {
        let files = [
            self.paths.model(names),
            self.paths.controller(names),
            self.paths.request(names),
            self.paths.resource(names),
            self.paths.service(names),
            self.paths.form_component(names),
        ];
        for path in files {
            if path.exists() {
                fs::remove_file(&path)?;
                deleted.push(format!("File: {}", basename(&path)));
            }
        }

        let view_dir = self.paths.view_dir(names);
        if view_dir.exists() {
            fs::remove_dir_all(&view_dir)?;
            deleted.push(format!("Directory: {}", basename(&view_dir)));
        }

        // Migration artifacts carry a timestamp prefix, so sweep the
        // directory for the table's stem.
        let stem = ArtifactPaths::migration_stem(table);
        let migrations = self.paths.migrations_dir();
        if migrations.exists() {
            for entry in WalkDir::new(&migrations).max_depth(1) {
                let entry = entry.map_err(|e| {
                    std::io::Error::other(format!("migration sweep failed: {e}"))
                })?;
                if !entry.file_type().is_file() {
                    continue;
                }
                let file_name = entry.file_name().to_string_lossy();
                if file_name.contains(&stem) {
                    fs::remove_file(entry.path())?;
                    deleted.push(format!("File: {file_name}"));
                }
            }
        }

        Ok(())
    }

    fn remove_routes(&self, names: &ModuleNames) -> Result<bool> {
        let routes_file = self.paths.routes_file();
        if !routes_file.exists() {
            return Ok(false);
        }
        let mut ledger = match RouteLedger::load(&routes_file) {
            Ok(ledger) => ledger,
            Err(e) => {
                // A hand-mangled routes file should not block teardown of
                // everything else.
                warn!(error = %e, "skipping route removal");
                return Ok(false);
            }
        };
        match ledger.remove_block(&names.camel) {
            RemoveOutcome::Removed => {
                ledger.save()?;
                Ok(true)
            }
            RemoveOutcome::NotFound => Ok(false),
        }
    }

    fn delete_translation_files(&self, names: &ModuleNames) -> Result<bool> {
        let mut any = false;
        for locale in &self.locales {
            let dir = self.paths.translation_dir(locale, names);
            if dir.exists() {
                fs::remove_dir_all(&dir)?;
                any = true;
            }
        }
        Ok(any)
    }
}

fn refresh_abort(module: &str, cause: &ForgeError) -> ForgeError {
    ForgeError::Structural(format!("refresh aborted at module '{module}': {cause}"))
}

fn basename(path: &PathBuf) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
