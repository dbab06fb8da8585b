//! Error taxonomy for the scaffolding engine.
//!
//! Four families of failure, mirrored in the variants below:
//! - validation errors: user-correctable, field-scoped, returned as data
//! - collision errors: a name/table/route block already exists, so callers
//!   can offer a rename instead of a stack trace
//! - structural errors: the shared routes file lost its scaffold; these halt
//!   the whole subsystem, not just the current module
//! - partial failures: something broke after files or rows were already
//!   mutated; nothing is auto-rolled-back for filesystem or DDL effects

use crate::schema::validate::StepReport;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ForgeError>;

/// The step of a generation run at which a failure occurred. Carried in
/// partial-failure errors so callers see exactly where things stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum GenerationStep {
    Validation,
    Synthesis,
    MetadataCommit,
    MigrationExecution,
    RouteInsertion,
}

#[derive(Debug, Error)]
pub enum ForgeError {
    /// A validation step rejected the schema. Field-scoped details live in
    /// the report; this is never raised mid-generation.
    #[error("schema validation failed: {0}")]
    Validation(StepReport),

    /// Something named is already taken (module name, url, slug, route
    /// block). Distinct from generic failure so the caller can rename.
    #[error("{what} '{name}' already exists")]
    Collision { what: &'static str, name: String },

    /// The target table exists in the live database. Backend-specific
    /// detection, see `ddl::classify_db_error`.
    #[error("table '{0}' already exists")]
    TableExists(String),

    /// The shared routes file is missing its generated-routes scaffold.
    /// Configuration-integrity problem; halts the subsystem.
    #[error("routes file integrity error: {0}")]
    Structural(String),

    /// Destruction was requested without cascade for a module that has
    /// children. Nothing was mutated.
    #[error("module '{module}' has {} child module(s)", children.len())]
    HasChildren {
        module: String,
        children: Vec<String>,
    },

    /// A step failed after earlier steps already took effect. Completed
    /// file writes, table drops and row mutations stay in place.
    #[error("{step} failed for module '{module}': {source}")]
    Partial {
        module: String,
        step: GenerationStep,
        #[source]
        source: Box<ForgeError>,
    },

    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("template rendering failed: {0}")]
    Template(#[from] tera::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ForgeError {
    /// Wrap an error as a partial failure at `step` for `module`, unless it
    /// already is one (the innermost step is the interesting one).
    pub fn into_partial(self, module: &str, step: GenerationStep) -> Self {
        match self {
            err @ ForgeError::Partial { .. } => err,
            other => ForgeError::Partial {
                module: module.to_string(),
                step,
                source: Box::new(other),
            },
        }
    }

    /// Coarse category used in logs and reports.
    pub fn category(&self) -> ErrorCategory {
        match self {
            ForgeError::Validation(_) => ErrorCategory::Validation,
            ForgeError::Collision { .. } | ForgeError::TableExists(_) => ErrorCategory::Collision,
            ForgeError::Structural(_) => ErrorCategory::Structural,
            ForgeError::Partial { .. } => ErrorCategory::PartialFailure,
            ForgeError::HasChildren { .. } => ErrorCategory::Precondition,
            ForgeError::Db(_) | ForgeError::Template(_) | ForgeError::Io(_) | ForgeError::Json(_) => {
                ErrorCategory::Internal
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Validation,
    Collision,
    Structural,
    PartialFailure,
    Precondition,
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCategory::Validation => "validation",
            ErrorCategory::Collision => "collision",
            ErrorCategory::Structural => "structural",
            ErrorCategory::PartialFailure => "partial_failure",
            ErrorCategory::Precondition => "precondition",
            ErrorCategory::Internal => "internal",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::validate::ValidationStep;

    #[test]
    fn partial_wrapping_keeps_innermost_step() {
        let inner = ForgeError::TableExists("widgets".into())
            .into_partial("Widget", GenerationStep::MigrationExecution);
        let rewrapped = inner.into_partial("Widget", GenerationStep::RouteInsertion);
        match rewrapped {
            ForgeError::Partial { step, .. } => {
                assert_eq!(step, GenerationStep::MigrationExecution)
            }
            other => panic!("expected partial, got {other:?}"),
        }
    }

    #[test]
    fn categories() {
        let mut report = StepReport::new(ValidationStep::BasicInfo);
        report.push("name", "required");
        assert_eq!(
            ForgeError::Validation(report).category(),
            ErrorCategory::Validation
        );
        assert_eq!(
            ForgeError::TableExists("a".into()).category(),
            ErrorCategory::Collision
        );
        assert_eq!(
            ForgeError::Structural("no scaffold".into()).category(),
            ErrorCategory::Structural
        );
    }
}
