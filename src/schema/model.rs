//! The declarative description of a module: pure data, no behavior beyond
//! the total field-type-to-cast mapping. Validation lives in
//! [`super::validate`].

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Raw nested structure submitted for generation. Deserialized from YAML or
/// JSON; only a [`super::ValidatedSchema`] may reach the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleSchema {
    pub name: String,
    pub group_id: i64,
    #[serde(default)]
    pub parent_id: Option<i64>,
    #[serde(rename = "type", default = "default_one")]
    pub module_kind: i64,
    #[serde(default = "default_one")]
    pub module_type: i64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub show_in_menu: bool,
    pub url: String,
    pub icon: String,
    pub slug: String,
    #[serde(default)]
    pub sort_order: i64,

    pub table_name: String,
    #[serde(default = "default_true")]
    pub timestamps: bool,
    #[serde(default)]
    pub soft_deletes: bool,
    #[serde(default)]
    pub user_tracking: bool,
    #[serde(default)]
    pub primary_key_type: PrimaryKeyKind,
    #[serde(default = "default_pk_name")]
    pub primary_key_name: String,

    pub columns: Vec<ColumnSpec>,
    pub fields: Vec<FieldSpec>,
    #[serde(default)]
    pub relationships: Vec<RelationshipSpec>,
    /// locale -> translation spec; every configured locale must be present.
    pub translations: IndexMap<String, ModuleTranslationSpec>,

    #[serde(default)]
    pub readable: bool,
    #[serde(default)]
    pub writable: bool,
    #[serde(default)]
    pub editable: bool,
    #[serde(default)]
    pub deletable: bool,
}

fn default_one() -> i64 {
    1
}

fn default_true() -> bool {
    true
}

fn default_pk_name() -> String {
    "id".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleTranslationSpec {
    pub singular_name: String,
    pub plural_name: String,
    /// field name -> label/placeholder pair for the generated bundles.
    #[serde(default)]
    pub fields: IndexMap<String, FieldTranslation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldTranslation {
    pub label: String,
    #[serde(default)]
    pub placeholder: Option<String>,
}

/// One database column to create. Generation-time only; never persisted
/// beyond the emitted migration plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: String,
    /// Length, or "precision,scale" for decimal types.
    #[serde(default)]
    pub length: Option<String>,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub unsigned: bool,
    #[serde(default)]
    pub index: Option<IndexKind>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum IndexKind {
    Index,
    Unique,
    Primary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PrimaryKeyKind {
    Increments,
    #[default]
    BigIncrements,
    Uuid,
}

/// One form/display field. The closed input-type set drives the cast
/// mapping, the request rules, and the view markup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub label: String,
    #[serde(default)]
    pub placeholder: Option<String>,
    /// Options for choice types (select, multiselect, radio).
    #[serde(default)]
    pub options: Vec<FieldOption>,
    #[serde(default)]
    pub frontend_validation: Vec<String>,
    #[serde(default)]
    pub frontend_params: BTreeMap<String, String>,
    #[serde(default)]
    pub backend_validation: Vec<String>,
    #[serde(default)]
    pub backend_params: BTreeMap<String, String>,
    #[serde(default = "default_true")]
    pub show_in_table: bool,
    #[serde(default)]
    pub searchable: bool,
    #[serde(default)]
    pub sortable: bool,
    /// Marks the field used as the row's primary label. At most one per
    /// module; defaulted onto the first field when nobody claims it.
    #[serde(default)]
    pub is_title: bool,
}

impl FieldSpec {
    pub fn is_required(&self) -> bool {
        self.frontend_validation.iter().any(|r| r == "required")
            || self.backend_validation.iter().any(|r| r == "required")
    }

    /// Whether the first option's value parses as a number. Decides the
    /// radio cast (integer vs string).
    pub fn first_option_is_numeric(&self) -> bool {
        self.options
            .first()
            .map(|o| o.value.parse::<f64>().is_ok())
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldOption {
    pub value: String,
    pub label: String,
}

/// Known input types. Unrecognized strings fail deserialization up front
/// rather than surfacing as half-generated artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumIter)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FieldType {
    Text,
    Email,
    Number,
    Password,
    Select,
    Multiselect,
    Radio,
    Checkbox,
    Date,
    Time,
    Datetime,
    File,
    Textarea,
    Color,
    Range,
}

/// Model attribute cast derived from the input type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CastKind {
    Collection,
    Boolean,
    Integer,
    String,
    Date,
    Datetime,
    Hashed,
}

impl FieldSpec {
    /// Total mapping from input type to attribute cast. `None` means
    /// pass-through (no cast entry emitted).
    pub fn cast(&self) -> Option<CastKind> {
        match self.field_type {
            FieldType::Multiselect => Some(CastKind::Collection),
            FieldType::Checkbox => Some(CastKind::Boolean),
            FieldType::Radio => {
                if self.first_option_is_numeric() {
                    Some(CastKind::Integer)
                } else {
                    Some(CastKind::String)
                }
            }
            FieldType::Date => Some(CastKind::Date),
            FieldType::Datetime => Some(CastKind::Datetime),
            FieldType::Password => Some(CastKind::Hashed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum RelationKind {
    HasOne,
    HasMany,
    BelongsTo,
    BelongsToMany,
}

/// One association to another module. `belongs_to` additionally contributes
/// a foreign-key column + constraint to the migration plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationshipSpec {
    #[serde(rename = "type")]
    pub kind: RelationKind,
    /// Target module id.
    pub module: i64,
    #[serde(default)]
    pub foreign_key: Option<String>,
    #[serde(default)]
    pub local_key: Option<String>,
    #[serde(default)]
    pub pivot_table: Option<String>,
    #[serde(default)]
    pub pivot_columns: Vec<PivotColumn>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PivotColumn {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    fn field(ftype: FieldType, options: Vec<FieldOption>) -> FieldSpec {
        FieldSpec {
            name: "f".into(),
            field_type: ftype,
            label: "F".into(),
            placeholder: None,
            options,
            frontend_validation: vec![],
            frontend_params: BTreeMap::new(),
            backend_validation: vec![],
            backend_params: BTreeMap::new(),
            show_in_table: true,
            searchable: false,
            sortable: false,
            is_title: false,
        }
    }

    fn opt(value: &str) -> FieldOption {
        FieldOption {
            value: value.into(),
            label: value.to_uppercase(),
        }
    }

    #[test]
    fn cast_mapping_is_total_and_deterministic() {
        for ftype in FieldType::iter() {
            // Every member of the closed set maps without panicking; the
            // result for the same input never changes.
            let a = field(ftype, vec![]).cast();
            let b = field(ftype, vec![]).cast();
            assert_eq!(a, b);
        }
        assert_eq!(field(FieldType::Checkbox, vec![]).cast(), Some(CastKind::Boolean));
        assert_eq!(field(FieldType::Date, vec![]).cast(), Some(CastKind::Date));
        assert_eq!(
            field(FieldType::Multiselect, vec![]).cast(),
            Some(CastKind::Collection)
        );
        assert_eq!(field(FieldType::Text, vec![]).cast(), None);
        assert_eq!(field(FieldType::Textarea, vec![]).cast(), None);
    }

    #[test]
    fn radio_cast_follows_first_option_value() {
        assert_eq!(
            field(FieldType::Radio, vec![opt("1"), opt("2")]).cast(),
            Some(CastKind::Integer)
        );
        assert_eq!(
            field(FieldType::Radio, vec![opt("draft"), opt("live")]).cast(),
            Some(CastKind::String)
        );
        // No options at all: stored values are strings.
        assert_eq!(field(FieldType::Radio, vec![]).cast(), Some(CastKind::String));
    }

    #[test]
    fn schema_deserializes_from_json_with_renamed_keys() {
        let raw = serde_json::json!({
            "name": "Widget",
            "group_id": 1,
            "type": 2,
            "url": "widgets",
            "icon": "box",
            "slug": "widgets",
            "table_name": "widgets",
            "columns": [{"name": "title", "type": "string"}],
            "fields": [{"name": "title", "type": "text", "label": "Title", "is_title": true}],
            "translations": {
                "en": {"singular_name": "Widget", "plural_name": "Widgets"}
            }
        });
        let schema: ModuleSchema = serde_json::from_value(raw).unwrap();
        assert_eq!(schema.module_kind, 2);
        assert_eq!(schema.module_type, 1);
        assert_eq!(schema.primary_key_name, "id");
        assert!(schema.timestamps);
        assert_eq!(schema.fields[0].field_type, FieldType::Text);
        assert!(schema.fields[0].show_in_table);
    }
}
