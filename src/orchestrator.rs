//! The generation pipeline and the batch drivers.
//!
//! Generation is strictly ordered: validate, synthesize files, commit
//! metadata rows, apply the migration, register routes. Nothing touches
//! the filesystem before validation passes. A failure after the metadata
//! commit triggers a compensating row delete and surfaces as a partial
//! failure naming the step that broke.

use crate::config::EngineConfig;
use crate::ddl::SchemaExecutor;
use crate::destroyer::{DestructionReport, ModuleDestroyer};
use crate::error::{ForgeError, GenerationStep, Result};
use crate::paths::{ArtifactPaths, ModuleNames};
use crate::routes::{self, RouteLedger};
use crate::schema::{ModuleSchema, SchemaValidator, StepReport, ValidationStep};
use crate::store::MetadataStore;
use crate::synth::{Artifact, Synthesizer};
use crate::translations::TranslationCache;
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{error, info, warn};

/// What one successful generation produced.
#[derive(Debug, Serialize)]
pub struct GenerationReport {
    pub module_id: i64,
    pub module: String,
    pub table: String,
    pub artifacts: Vec<Artifact>,
    pub migration: PathBuf,
    pub route_block: String,
}

pub struct Orchestrator {
    config: EngineConfig,
    store: MetadataStore,
    cache: TranslationCache,
}

impl Orchestrator {
    pub fn new(config: EngineConfig) -> Result<Self> {
        let store = MetadataStore::open(&config.database)?;
        Ok(Self {
            config,
            store,
            cache: TranslationCache::new(),
        })
    }

    /// In-memory metadata database; used by tests and embedders that
    /// manage their own persistence.
    pub fn ephemeral(config: EngineConfig) -> Result<Self> {
        Ok(Self {
            config,
            store: MetadataStore::open_in_memory()?,
            cache: TranslationCache::new(),
        })
    }

    pub fn store(&self) -> &MetadataStore {
        &self.store
    }

    /// Run a single validation step, as the wizard UI does.
    pub fn validate_step(
        &self,
        step: ValidationStep,
        schema: &mut ModuleSchema,
    ) -> Result<StepReport> {
        SchemaValidator::new(&self.store, &self.config.locales).validate_step(step, schema)
    }

    /// Generate a module end to end.
    pub fn generate(
        &self,
        schema: ModuleSchema,
        seed_role: Option<i64>,
    ) -> Result<GenerationReport> {
        let module_name = schema.name.clone();

        let schema = SchemaValidator::new(&self.store, &self.config.locales)
            .validate_all(schema)?;
        let names = ModuleNames::derive(&schema.name);
        info!(module = %schema.name, table = %schema.table_name, "generating module");

        // Route preconditions come before any filesystem or row mutation:
        // a missing or mangled scaffold and a duplicate block are both
        // cheaper to surface now than after artifacts land on disk.
        let mut ledger = self.load_ledger()?;
        if ledger.contains(&names.camel) {
            return Err(ForgeError::Collision {
                what: "route block",
                name: names.camel,
            });
        }

        let target_tables = self.target_tables(&schema)?;

        let synthesizer = Synthesizer::new(&self.config, &self.cache);
        let output = synthesizer
            .synthesize(&schema, &target_tables)
            .map_err(|e| e.into_partial(&module_name, GenerationStep::Synthesis))?;

        let module_id = self
            .store
            .create_module(&schema, seed_role)
            .map_err(|e| e.into_partial(&module_name, GenerationStep::MetadataCommit))?;

        if let Err(e) = SchemaExecutor::new(self.store.connection()).apply(&output.plan) {
            // The metadata transaction already committed; undo it so the
            // failed module does not squat on its name and slug.
            error!(module = %module_name, error = %e, "migration failed, removing metadata rows");
            if let Err(cleanup) = self.store.delete_module_metadata(module_id) {
                warn!(module = %module_name, error = %cleanup, "compensating metadata delete failed");
            }
            return Err(e.into_partial(&module_name, GenerationStep::MigrationExecution));
        }

        ledger
            .insert_block(&names.camel, routes::route_block_body(&names))
            .and_then(|()| ledger.save())
            .map_err(|e| e.into_partial(&module_name, GenerationStep::RouteInsertion))?;

        info!(module = %module_name, module_id, "module generated");
        Ok(GenerationReport {
            module_id,
            module: module_name,
            table: schema.table_name.clone(),
            artifacts: output.artifacts,
            migration: output.migration_path,
            route_block: names.camel,
        })
    }

    fn target_tables(&self, schema: &crate::schema::ValidatedSchema) -> Result<HashMap<i64, String>> {
        let mut map = HashMap::new();
        for rel in &schema.relationships {
            // target existence was checked during validation
            if let Some(target) = self.store.get_module(rel.module)? {
                map.insert(rel.module, target.table_name);
            }
        }
        Ok(map)
    }

    /// The scaffold is created only by an explicit `init-routes`; absence
    /// here means the workspace was never set up.
    fn load_ledger(&self) -> Result<RouteLedger> {
        let routes_file = ArtifactPaths::new(&self.config).routes_file();
        if !routes_file.exists() {
            return Err(ForgeError::Structural(format!(
                "{}: routes file missing, run init-routes first",
                routes_file.display()
            )));
        }
        RouteLedger::load(&routes_file)
    }

    /// Create the routes scaffold if missing. Returns whether a file was
    /// created.
    pub fn init_routes(&self) -> Result<bool> {
        RouteLedger::init(&ArtifactPaths::new(&self.config).routes_file())
    }

    pub fn destroy(&self, module_name: &str, cascade: bool) -> DestructionReport {
        ModuleDestroyer::new(&self.config, &self.store, &self.cache).destroy(module_name, cascade)
    }

    /// Tear down every module, cascading through children. Irreversible
    /// effects (table drops, file deletes) run first; the metadata rows
    /// for the whole batch then ride one transaction, so a failure leaves
    /// every row in place while finished drops stay gone.
    pub fn refresh_all(&self) -> Result<Vec<DestructionReport>> {
        let reports = ModuleDestroyer::new(&self.config, &self.store, &self.cache).refresh()?;
        info!(modules = reports.len(), "workspace refreshed");
        Ok(reports)
    }
}
