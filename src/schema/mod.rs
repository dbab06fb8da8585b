//! Declarative module schemas and their validation.

pub mod model;
pub mod validate;

pub use model::{
    CastKind, ColumnSpec, FieldOption, FieldSpec, FieldTranslation, FieldType, IndexKind,
    ModuleSchema, ModuleTranslationSpec, PivotColumn, PrimaryKeyKind, RelationKind,
    RelationshipSpec,
};
pub use validate::{FieldError, SchemaValidator, StepReport, ValidatedSchema, ValidationStep};
