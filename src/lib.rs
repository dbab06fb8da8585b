pub mod config;
pub mod ddl;
pub mod destroyer;
pub mod error;
pub mod logging;
pub mod orchestrator;
pub mod paths;
pub mod routes;
pub mod schema;
pub mod store;
pub mod synth;
#[doc(hidden)]
pub mod testing;
pub mod translations;

pub use config::{CliArgs, EngineConfig};
pub use ddl::{MigrationPlan, SchemaExecutor};
pub use destroyer::{DestructionReport, ModuleDestroyer};
pub use error::{ErrorCategory, ForgeError, GenerationStep, Result};
pub use logging::{LogFormat, LoggingConfig, init_logging};
pub use orchestrator::{GenerationReport, Orchestrator};
pub use paths::{ArtifactKind, ArtifactPaths, ModuleNames};
pub use routes::RouteLedger;
pub use schema::{ModuleSchema, SchemaValidator, StepReport, ValidatedSchema, ValidationStep};
pub use store::{MetadataStore, ModuleRecord};
pub use translations::TranslationCache;
