//! Five-step schema validation.
//!
//! Each step is independently invokable (the admin UI drives them as wizard
//! pages) and returns field-scoped errors as data. Steps share no mutable
//! state; only a schema that passed all five may reach the orchestrator.

use crate::error::{ForgeError, Result};
use crate::schema::model::{ModuleSchema, RelationKind};
use crate::store::MetadataStore;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::ops::Deref;
use tracing::info;

/// Column, table and field names: lowercase identifier, digits and
/// underscores after the first character.
static IDENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z][a-z0-9_]*$").unwrap());

const MAX_NAME: usize = 50;
const MAX_LABEL: usize = 100;
const MAX_DESCRIPTION: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ValidationStep {
    BasicInfo,
    DatabaseStructure,
    FormFields,
    Translations,
    Permissions,
}

impl ValidationStep {
    pub const ALL: [ValidationStep; 5] = [
        ValidationStep::BasicInfo,
        ValidationStep::DatabaseStructure,
        ValidationStep::FormFields,
        ValidationStep::Translations,
        ValidationStep::Permissions,
    ];

    /// Wizard step number, 1-based.
    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(ValidationStep::BasicInfo),
            2 => Some(ValidationStep::DatabaseStructure),
            3 => Some(ValidationStep::FormFields),
            4 => Some(ValidationStep::Translations),
            5 => Some(ValidationStep::Permissions),
            _ => None,
        }
    }
}

/// One field-scoped validation failure.
#[derive(Debug, Clone, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Outcome of one validation step: either clean or a list of field errors.
#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub step: ValidationStep,
    pub errors: Vec<FieldError>,
}

impl StepReport {
    pub fn new(step: ValidationStep) -> Self {
        Self {
            step,
            errors: Vec::new(),
        }
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

impl fmt::Display for StepReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "step {} with {} error(s)", self.step, self.errors.len())?;
        for err in &self.errors {
            write!(f, "; {}: {}", err.field, err.message)?;
        }
        Ok(())
    }
}

/// A schema that passed all five steps. The only type the orchestrator
/// accepts, so unvalidated input cannot reach generation by construction.
#[derive(Debug, Clone)]
pub struct ValidatedSchema(ModuleSchema);

impl ValidatedSchema {
    pub fn into_inner(self) -> ModuleSchema {
        self.0
    }
}

impl Deref for ValidatedSchema {
    type Target = ModuleSchema;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

pub struct SchemaValidator<'a> {
    store: &'a MetadataStore,
    locales: &'a [String],
}

impl<'a> SchemaValidator<'a> {
    pub fn new(store: &'a MetadataStore, locales: &'a [String]) -> Self {
        Self { store, locales }
    }

    /// Run one step. The form-fields step may mutate the schema to apply
    /// the title-field default; every other step is read-only.
    pub fn validate_step(
        &self,
        step: ValidationStep,
        schema: &mut ModuleSchema,
    ) -> Result<StepReport> {
        match step {
            ValidationStep::BasicInfo => self.validate_basic_info(schema),
            ValidationStep::DatabaseStructure => self.validate_database_structure(schema),
            ValidationStep::FormFields => Ok(self.validate_form_fields(schema)),
            ValidationStep::Translations => Ok(self.validate_translations(schema)),
            ValidationStep::Permissions => Ok(self.validate_permissions(schema)),
        }
    }

    /// Run all five steps in order; the first failing step aborts with a
    /// validation error carrying its report.
    pub fn validate_all(&self, mut schema: ModuleSchema) -> Result<ValidatedSchema> {
        for step in ValidationStep::ALL {
            let report = self.validate_step(step, &mut schema)?;
            if !report.is_valid() {
                return Err(ForgeError::Validation(report));
            }
        }
        Ok(ValidatedSchema(schema))
    }

    fn validate_basic_info(&self, schema: &ModuleSchema) -> Result<StepReport> {
        let mut report = StepReport::new(ValidationStep::BasicInfo);

        require_len(&mut report, "name", &schema.name, MAX_NAME);
        require_len(&mut report, "url", &schema.url, MAX_NAME);
        require_len(&mut report, "icon", &schema.icon, MAX_NAME);
        require_len(&mut report, "slug", &schema.slug, MAX_NAME);

        if let Some(description) = &schema.description {
            if description.chars().count() > MAX_DESCRIPTION {
                report.push("description", format!("must be at most {MAX_DESCRIPTION} characters"));
            }
        }
        if schema.group_id < 1 {
            report.push("group_id", "is required");
        }
        if !(1..=2).contains(&schema.module_kind) {
            report.push("type", "must be 1 or 2");
        }
        if !(1..=2).contains(&schema.module_type) {
            report.push("module_type", "must be 1 or 2");
        }
        if schema.sort_order < 0 {
            report.push("sort_order", "must be zero or positive");
        }
        if let Some(parent_id) = schema.parent_id {
            if !self.store.module_exists(parent_id)? {
                report.push("parent_id", format!("module {parent_id} does not exist"));
            }
        }

        // Uniqueness among non-deleted modules.
        if !schema.name.is_empty() && self.store.name_taken(&schema.name)? {
            report.push("name", "has already been taken");
        }
        if !schema.url.is_empty() && self.store.url_taken(&schema.url)? {
            report.push("url", "has already been taken");
        }
        if !schema.slug.is_empty() && self.store.slug_taken(&schema.slug)? {
            report.push("slug", "has already been taken");
        }

        Ok(report)
    }

    fn validate_database_structure(&self, schema: &ModuleSchema) -> Result<StepReport> {
        let mut report = StepReport::new(ValidationStep::DatabaseStructure);

        require_identifier(&mut report, "table_name", &schema.table_name);
        if !schema.primary_key_name.is_empty() && !IDENT_RE.is_match(&schema.primary_key_name) {
            report.push("primary_key_name", "must match ^[a-z][a-z0-9_]*$");
        }

        if schema.columns.is_empty() {
            report.push("columns", "at least one column is required");
        }
        for (i, column) in schema.columns.iter().enumerate() {
            require_identifier(&mut report, format!("columns.{i}.name"), &column.name);
            if column.column_type.trim().is_empty() {
                report.push(format!("columns.{i}.type"), "is required");
            }
        }

        for (i, rel) in schema.relationships.iter().enumerate() {
            if !self.store.module_exists(rel.module)? {
                report.push(
                    format!("relationships.{i}.module"),
                    format!("module {} does not exist", rel.module),
                );
            }
            if rel.kind == RelationKind::BelongsToMany
                && rel.pivot_table.as_deref().unwrap_or("").is_empty()
            {
                report.push(
                    format!("relationships.{i}.pivot_table"),
                    "is required for belongsToMany",
                );
            }
        }

        Ok(report)
    }

    fn validate_form_fields(&self, schema: &mut ModuleSchema) -> StepReport {
        let mut report = StepReport::new(ValidationStep::FormFields);

        if schema.fields.is_empty() {
            report.push("fields", "at least one field is required");
            return report;
        }

        for (i, field) in schema.fields.iter().enumerate() {
            require_len(&mut report, format!("fields.{i}.name"), &field.name, MAX_NAME);
            require_len(&mut report, format!("fields.{i}.label"), &field.label, MAX_LABEL);
            if let Some(placeholder) = &field.placeholder {
                if placeholder.chars().count() > MAX_LABEL {
                    report.push(
                        format!("fields.{i}.placeholder"),
                        format!("must be at most {MAX_LABEL} characters"),
                    );
                }
            }
        }

        // The title field is a default, never an override: promote the
        // first field only when no field claims the marker, and reject
        // competing claims outright.
        let claimants: Vec<usize> = schema
            .fields
            .iter()
            .enumerate()
            .filter(|(_, f)| f.is_title)
            .map(|(i, _)| i)
            .collect();
        match claimants.len() {
            0 => {
                let first = &mut schema.fields[0];
                first.is_title = true;
                first.show_in_table = true;
                first.searchable = true;
                first.sortable = true;
                info!(field = %first.name, "no field claimed is_title; defaulting to the first field");
            }
            1 => {}
            _ => {
                let names: Vec<&str> = claimants
                    .iter()
                    .map(|&i| schema.fields[i].name.as_str())
                    .collect();
                report.push(
                    "fields",
                    format!("exactly one field may set is_title, found: {}", names.join(", ")),
                );
            }
        }

        report
    }

    fn validate_translations(&self, schema: &ModuleSchema) -> StepReport {
        let mut report = StepReport::new(ValidationStep::Translations);

        for locale in self.locales {
            let Some(translation) = schema.translations.get(locale) else {
                report.push(format!("translations.{locale}"), "is required");
                continue;
            };
            if translation.singular_name.trim().is_empty() {
                report.push(format!("translations.{locale}.singular_name"), "is required");
            }
            if translation.plural_name.trim().is_empty() {
                report.push(format!("translations.{locale}.plural_name"), "is required");
            }
            for field in &schema.fields {
                match translation.fields.get(&field.name) {
                    None => report.push(
                        format!("translations.{locale}.fields.{}", field.name),
                        "label is required",
                    ),
                    Some(t) if t.label.trim().is_empty() => report.push(
                        format!("translations.{locale}.fields.{}.label", field.name),
                        "is required",
                    ),
                    Some(t) => {
                        if t.label.chars().count() > MAX_NAME {
                            report.push(
                                format!("translations.{locale}.fields.{}.label", field.name),
                                format!("must be at most {MAX_NAME} characters"),
                            );
                        }
                    }
                }
            }
        }

        report
    }

    fn validate_permissions(&self, schema: &ModuleSchema) -> StepReport {
        let mut report = StepReport::new(ValidationStep::Permissions);
        // Capability flags are typed booleans; the only sanity check left
        // is that a deletable module is also readable in the admin UI.
        if schema.deletable && !schema.readable {
            report.push("deletable", "a deletable module must also be readable");
        }
        report
    }
}

fn require_len(report: &mut StepReport, field: impl Into<String>, value: &str, max: usize) {
    let field = field.into();
    if value.trim().is_empty() {
        report.push(field, "is required");
    } else if value.chars().count() > max {
        report.push(field, format!("must be at most {max} characters"));
    }
}

fn require_identifier(report: &mut StepReport, field: impl Into<String>, value: &str) {
    let field = field.into();
    if value.trim().is_empty() {
        report.push(field, "is required");
    } else if value.chars().count() > MAX_NAME {
        report.push(field, format!("must be at most {MAX_NAME} characters"));
    } else if !IDENT_RE.is_match(value) {
        report.push(field, "must match ^[a-z][a-z0-9_]*$");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MetadataStore;
    use crate::testing::sample_schema;

    fn store() -> MetadataStore {
        MetadataStore::open_in_memory().unwrap()
    }

    #[test]
    fn steps_are_independently_invokable() {
        let store = store();
        let locales = vec!["en".to_string()];
        let validator = SchemaValidator::new(&store, &locales);
        let mut schema = sample_schema("Widget");

        // Running the translations step alone works and touches nothing.
        let before = serde_json::to_value(&schema).unwrap();
        let report = validator
            .validate_step(ValidationStep::Translations, &mut schema)
            .unwrap();
        assert!(report.is_valid());
        assert_eq!(before, serde_json::to_value(&schema).unwrap());
    }

    #[test]
    fn bad_column_name_is_field_scoped() {
        let store = store();
        let locales = vec!["en".to_string()];
        let validator = SchemaValidator::new(&store, &locales);
        let mut schema = sample_schema("Widget");
        schema.columns[0].name = "Title-1".into();

        let report = validator
            .validate_step(ValidationStep::DatabaseStructure, &mut schema)
            .unwrap();
        assert!(!report.is_valid());
        assert_eq!(report.errors[0].field, "columns.0.name");
    }

    #[test]
    fn missing_locale_fails_translations_step() {
        let store = store();
        let locales = vec!["en".to_string(), "de".to_string()];
        let validator = SchemaValidator::new(&store, &locales);
        let mut schema = sample_schema("Widget");

        let report = validator
            .validate_step(ValidationStep::Translations, &mut schema)
            .unwrap();
        assert!(!report.is_valid());
        assert!(report.errors.iter().any(|e| e.field == "translations.de"));
    }

    #[test]
    fn title_default_applies_only_when_unclaimed() {
        let store = store();
        let locales = vec!["en".to_string()];
        let validator = SchemaValidator::new(&store, &locales);

        let mut schema = sample_schema("Widget");
        schema.fields[0].is_title = false;
        let report = validator
            .validate_step(ValidationStep::FormFields, &mut schema)
            .unwrap();
        assert!(report.is_valid());
        assert!(schema.fields[0].is_title);
        assert!(schema.fields[0].searchable);

        // An explicit claim elsewhere is left alone.
        let mut schema = sample_schema("Widget");
        schema.fields[0].is_title = false;
        schema.fields.push(schema.fields[0].clone());
        schema.fields[1].name = "code".into();
        schema.fields[1].is_title = true;
        validator
            .validate_step(ValidationStep::FormFields, &mut schema)
            .unwrap();
        assert!(!schema.fields[0].is_title);
        assert!(schema.fields[1].is_title);
    }

    #[test]
    fn duplicate_title_claims_are_rejected() {
        let store = store();
        let locales = vec!["en".to_string()];
        let validator = SchemaValidator::new(&store, &locales);
        let mut schema = sample_schema("Widget");
        schema.fields.push(schema.fields[0].clone());
        schema.fields[1].name = "code".into();
        schema.fields[1].is_title = true;
        schema.fields[0].is_title = true;

        let report = validator
            .validate_step(ValidationStep::FormFields, &mut schema)
            .unwrap();
        assert!(!report.is_valid());
        assert!(report.errors[0].message.contains("title"));
        assert!(report.errors[0].message.contains("code"));
    }
}
