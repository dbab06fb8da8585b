//! Per-locale translation bundles for generated modules.
//!
//! A bundle is a nested PHP array rendered in `var_export` style:
//! page/card titles, table headers, field labels and placeholders, button
//! captions, and success/error/validation messages. Rendered bundles are
//! memoized in [`TranslationCache`]; destruction invalidates all locales
//! of a module at once.

use crate::schema::{FieldSpec, ModuleTranslationSpec, ValidatedSchema};
use heck::ToTitleCase;
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// A PHP value as far as bundles need: strings and string-keyed arrays.
#[derive(Debug, Clone, PartialEq)]
pub enum PhpValue {
    Str(String),
    Array(IndexMap<String, PhpValue>),
}

impl PhpValue {
    fn s(value: impl Into<String>) -> Self {
        PhpValue::Str(value.into())
    }
}

/// Build the bundle for one locale of a module.
pub fn bundle_for(schema: &ValidatedSchema, translation: &ModuleTranslationSpec) -> PhpValue {
    let mut root = IndexMap::new();
    root.insert("page_card_title".into(), PhpValue::s(":plural_name"));

    let mut headers = IndexMap::new();
    for (name, field) in &translation.fields {
        headers.insert(name.clone(), PhpValue::s(field.label.clone()));
    }
    headers.insert("created_at".into(), PhpValue::s("Created At"));
    headers.insert("actions".into(), PhpValue::s("Actions"));
    root.insert("table_headers".into(), PhpValue::Array(headers));

    let mut modal = IndexMap::new();
    modal.insert("add".into(), PhpValue::s("Add New :singular_name"));
    modal.insert("edit".into(), PhpValue::s("Edit :singular_name"));
    root.insert("modal_card_title".into(), PhpValue::Array(modal));

    let mut fields = IndexMap::new();
    for (name, field) in &translation.fields {
        let mut entry = IndexMap::new();
        entry.insert("label".into(), PhpValue::s(field.label.clone()));
        let placeholder = field
            .placeholder
            .clone()
            .unwrap_or_else(|| format!("Enter {}", field.label.to_title_case()));
        entry.insert("placeholder".into(), PhpValue::s(placeholder));
        fields.insert(name.clone(), PhpValue::Array(entry));
    }
    root.insert("fields".into(), PhpValue::Array(fields));

    let mut buttons = IndexMap::new();
    buttons.insert("submit".into(), PhpValue::s("Submit"));
    buttons.insert("update".into(), PhpValue::s("Update"));
    buttons.insert("close".into(), PhpValue::s("Close"));
    root.insert("buttons".into(), PhpValue::Array(buttons));

    let mut success = IndexMap::new();
    for verb in ["created", "updated", "archived", "deleted", "restored"] {
        success.insert(
            verb.into(),
            PhpValue::s(format!(":singular_name {verb} successfully")),
        );
    }
    let mut errors = IndexMap::new();
    for verb in ["create", "update", "delete", "restore"] {
        errors.insert(
            format!("{verb}_failed"),
            PhpValue::s(format!("Failed to {verb} :singular_name")),
        );
    }
    let mut messages = IndexMap::new();
    messages.insert("success".into(), PhpValue::Array(success));
    messages.insert("errors".into(), PhpValue::Array(errors));
    root.insert("messages".into(), PhpValue::Array(messages));

    root.insert(
        "validation".into(),
        PhpValue::Array(validation_messages(&schema.fields, translation)),
    );

    PhpValue::Array(root)
}

/// `{field}.{rule}` keyed messages for the module's backend rules, using
/// the locale's field label.
fn validation_messages(
    fields: &[FieldSpec],
    translation: &ModuleTranslationSpec,
) -> IndexMap<String, PhpValue> {
    let mut messages = IndexMap::new();
    for field in fields {
        let label = translation
            .fields
            .get(&field.name)
            .map(|t| t.label.as_str())
            .unwrap_or(&field.label)
            .to_title_case();
        for rule in &field.backend_validation {
            // "max:50" -> "max"
            let rule = rule.split(':').next().unwrap_or(rule);
            let message = match rule {
                "required" => format!("The {label} field is required."),
                "max" => format!("The {label} field must not be greater than :max."),
                _ => format!("The {label} field is invalid."),
            };
            messages.insert(format!("{}.{rule}", field.name), PhpValue::s(message));
        }
    }
    messages
}

/// Render a bundle as a PHP language file, `var_export` formatting.
pub fn render_bundle(bundle: &PhpValue) -> String {
    let mut out = String::from("<?php\n\nreturn ");
    render_value(bundle, 0, &mut out);
    out.push_str(";\n");
    out
}

fn render_value(value: &PhpValue, depth: usize, out: &mut String) {
    match value {
        PhpValue::Str(s) => {
            out.push('\'');
            out.push_str(&s.replace('\\', "\\\\").replace('\'', "\\'"));
            out.push('\'');
        }
        PhpValue::Array(entries) => {
            let pad = "  ".repeat(depth);
            out.push_str("array (\n");
            for (key, entry) in entries {
                out.push_str(&pad);
                out.push_str("  '");
                out.push_str(&key.replace('\\', "\\\\").replace('\'', "\\'"));
                out.push_str("' => ");
                if matches!(entry, PhpValue::Array(_)) {
                    out.push('\n');
                    out.push_str(&pad);
                    out.push_str("  ");
                }
                render_value(entry, depth + 1, out);
                out.push_str(",\n");
            }
            out.push_str(&pad);
            out.push(')');
        }
    }
}

/// Rendered-bundle memo, keyed by locale and module name.
#[derive(Default)]
pub struct TranslationCache {
    inner: RwLock<HashMap<(String, String), Arc<String>>>,
}

impl TranslationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, locale: &str, module: &str) -> Option<Arc<String>> {
        self.inner
            .read()
            .get(&(locale.to_string(), module.to_string()))
            .cloned()
    }

    pub fn put(&self, locale: &str, module: &str, rendered: String) -> Arc<String> {
        let rendered = Arc::new(rendered);
        self.inner
            .write()
            .insert((locale.to_string(), module.to_string()), rendered.clone());
        rendered
    }

    /// Drop every locale of a module. Returns the number of entries
    /// removed.
    pub fn invalidate_module(&self, module: &str) -> usize {
        let mut inner = self.inner.write();
        let before = inner.len();
        inner.retain(|(_, m), _| m != module);
        let removed = before - inner.len();
        if removed > 0 {
            debug!(module, removed, "translation cache invalidated");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaValidator;
    use crate::store::MetadataStore;
    use crate::testing::sample_schema;

    fn validated(name: &str) -> ValidatedSchema {
        let store = MetadataStore::open_in_memory().unwrap();
        let locales = vec!["en".to_string()];
        SchemaValidator::new(&store, &locales)
            .validate_all(sample_schema(name))
            .unwrap()
    }

    #[test]
    fn bundle_has_all_sections_in_order() {
        let schema = validated("Widget");
        let translation = schema.translations.get("en").unwrap().clone();
        let PhpValue::Array(root) = bundle_for(&schema, &translation) else {
            panic!("bundle root must be an array");
        };
        let keys: Vec<&str> = root.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            [
                "page_card_title",
                "table_headers",
                "modal_card_title",
                "fields",
                "buttons",
                "messages",
                "validation"
            ]
        );
    }

    #[test]
    fn rendered_bundle_is_a_php_return() {
        let schema = validated("Widget");
        let translation = schema.translations.get("en").unwrap().clone();
        let rendered = render_bundle(&bundle_for(&schema, &translation));

        assert!(rendered.starts_with("<?php\n\nreturn array (\n"));
        assert!(rendered.ends_with(";\n"));
        assert!(rendered.contains("'page_card_title' => ':plural_name',"));
        assert!(rendered.contains("'title.required' => 'The Title field is required.',"));
    }

    #[test]
    fn missing_placeholder_gets_the_enter_default() {
        let schema = validated("Widget");
        let mut translation = schema.translations.get("en").unwrap().clone();
        translation.fields.get_mut("title").unwrap().placeholder = None;

        let rendered = render_bundle(&bundle_for(&schema, &translation));
        assert!(rendered.contains("'placeholder' => 'Enter Title',"));
    }

    #[test]
    fn quotes_in_labels_are_escaped() {
        let schema = validated("Widget");
        let mut translation = schema.translations.get("en").unwrap().clone();
        translation.fields.get_mut("title").unwrap().label = "Owner's Name".to_string();

        let rendered = render_bundle(&bundle_for(&schema, &translation));
        assert!(rendered.contains("'Owner\\'s Name'"));
    }

    #[test]
    fn cache_invalidation_drops_every_locale_of_a_module() {
        let cache = TranslationCache::new();
        cache.put("en", "widget", "en-bundle".into());
        cache.put("de", "widget", "de-bundle".into());
        cache.put("en", "gadget", "other".into());

        assert_eq!(cache.invalidate_module("widget"), 2);
        assert!(cache.get("en", "widget").is_none());
        assert!(cache.get("de", "widget").is_none());
        assert_eq!(cache.get("en", "gadget").unwrap().as_str(), "other");
        assert_eq!(cache.invalidate_module("widget"), 0);
    }
}
