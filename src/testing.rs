//! Shared fixtures for the unit and integration tests.

use crate::schema::{
    ColumnSpec, FieldSpec, FieldTranslation, FieldType, ModuleSchema, ModuleTranslationSpec,
};
use indexmap::IndexMap;
use std::collections::BTreeMap;

/// A minimal, fully valid schema: one text column/field pair named
/// `title`, English translations, default permissions.
pub fn sample_schema(name: &str) -> ModuleSchema {
    let snake = heck::ToSnakeCase::to_snake_case(name);
    let mut fields = IndexMap::new();
    fields.insert(
        "title".to_string(),
        FieldTranslation {
            label: "Title".to_string(),
            placeholder: Some("Enter Title".to_string()),
        },
    );
    let mut translations = IndexMap::new();
    translations.insert(
        "en".to_string(),
        ModuleTranslationSpec {
            singular_name: name.to_string(),
            plural_name: format!("{name}s"),
            fields,
        },
    );

    ModuleSchema {
        name: name.to_string(),
        group_id: 1,
        parent_id: None,
        module_kind: 1,
        module_type: 1,
        description: None,
        show_in_menu: true,
        url: snake.replace('_', "-"),
        icon: "fa-cube".to_string(),
        slug: snake.replace('_', "-"),
        sort_order: 0,
        table_name: format!("{snake}s"),
        timestamps: true,
        soft_deletes: true,
        user_tracking: false,
        primary_key_type: Default::default(),
        primary_key_name: "id".to_string(),
        columns: vec![ColumnSpec {
            name: "title".to_string(),
            column_type: "string".to_string(),
            length: Some("191".to_string()),
            nullable: false,
            default: None,
            unsigned: false,
            index: None,
        }],
        fields: vec![FieldSpec {
            name: "title".to_string(),
            field_type: FieldType::Text,
            label: "Title".to_string(),
            placeholder: Some("Enter Title".to_string()),
            options: Vec::new(),
            frontend_validation: vec!["required".to_string()],
            frontend_params: BTreeMap::new(),
            backend_validation: vec!["required".to_string()],
            backend_params: BTreeMap::new(),
            show_in_table: true,
            searchable: true,
            sortable: true,
            is_title: true,
        }],
        relationships: Vec::new(),
        translations,
        readable: true,
        writable: true,
        editable: true,
        deletable: true,
    }
}
