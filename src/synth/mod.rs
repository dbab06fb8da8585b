//! Artifact synthesis: renders and writes every file a module owns.
//!
//! Order matters for diagnosability, not correctness: the migration plan
//! first, then class files, then views and translation bundles. All writes
//! are atomic (temp file in the target directory, then rename), so a crash
//! never leaves a half-written artifact.

pub mod templates;
pub mod views;

use crate::config::EngineConfig;
use crate::ddl::MigrationPlan;
use crate::error::{ForgeError, Result};
use crate::paths::{ArtifactKind, ArtifactPaths, ModuleNames};
use crate::schema::{FieldSpec, FieldType, RelationKind, ValidatedSchema};
use crate::translations::{self, TranslationCache};
use heck::{ToLowerCamelCase, ToUpperCamelCase};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tera::Context;
use tracing::{debug, info};

/// One written file, tagged with what it is.
#[derive(Debug, serde::Serialize)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub path: PathBuf,
}

/// Everything generation produced on disk, plus the plan still to apply.
#[derive(Debug)]
pub struct SynthesisOutput {
    pub artifacts: Vec<Artifact>,
    pub plan: MigrationPlan,
    pub migration_path: PathBuf,
}

pub struct Synthesizer<'a> {
    paths: ArtifactPaths,
    locales: Vec<String>,
    cache: &'a TranslationCache,
}

impl<'a> Synthesizer<'a> {
    pub fn new(config: &EngineConfig, cache: &'a TranslationCache) -> Self {
        Self {
            paths: ArtifactPaths::new(config),
            locales: config.locales.clone(),
            cache,
        }
    }

    /// Render and write every artifact for the module. `target_tables`
    /// maps association-target module ids to their table names.
    pub fn synthesize(
        &self,
        schema: &ValidatedSchema,
        target_tables: &HashMap<i64, String>,
    ) -> Result<SynthesisOutput> {
        let names = ModuleNames::derive(&schema.name);
        let accessors = accessors_for(&schema.fields);
        let mut artifacts = Vec::new();

        let plan = MigrationPlan::from_schema(schema, target_tables)?;
        let timestamp = chrono::Utc::now().format("%Y_%m_%d_%H%M%S").to_string();
        let migration_path = self.paths.migration_artifact(&plan.table, &timestamp);
        write_atomic(&migration_path, &serde_json::to_string_pretty(&plan)?)?;
        artifacts.push(Artifact {
            kind: ArtifactKind::Migration,
            path: migration_path.clone(),
        });

        let model = templates::render(
            "model.php",
            &model_context(schema, &names, &accessors, target_tables),
        )?;
        artifacts.push(self.write(ArtifactKind::Model, self.paths.model(&names), &model)?);

        let request = templates::render("request.php", &request_context(schema, &names))?;
        artifacts.push(self.write(ArtifactKind::Request, self.paths.request(&names), &request)?);

        let service = templates::render("service.php", &service_context(schema, &names))?;
        artifacts.push(self.write(ArtifactKind::Service, self.paths.service(&names), &service)?);

        let controller = templates::render(
            "controller.php",
            &controller_context(schema, &names, target_tables),
        )?;
        artifacts.push(self.write(
            ArtifactKind::Controller,
            self.paths.controller(&names),
            &controller,
        )?);

        let resource = templates::render("resource.php", &resource_context(schema, &names))?;
        artifacts.push(self.write(
            ArtifactKind::Resource,
            self.paths.resource(&names),
            &resource,
        )?);

        artifacts.push(self.write(
            ArtifactKind::IndexView,
            self.paths.index_view(&names),
            &views::index_view(schema, &names),
        )?);
        artifacts.push(self.write(
            ArtifactKind::FormView,
            self.paths.form_view(&names),
            &views::form_view(schema, &names),
        )?);

        let component = templates::render("form_component.php", &component_context(&names))?;
        artifacts.push(self.write(
            ArtifactKind::FormComponent,
            self.paths.form_component(&names),
            &component,
        )?);

        for locale in &self.locales {
            let Some(translation) = schema.translations.get(locale) else {
                // validation guarantees presence for configured locales
                continue;
            };
            let rendered =
                translations::render_bundle(&translations::bundle_for(schema, translation));
            let path = self.paths.translation_bundle(locale, &names);
            write_atomic(&path, &rendered)?;
            self.cache.put(locale, &names.studly, rendered);
            artifacts.push(Artifact {
                kind: ArtifactKind::TranslationBundle,
                path,
            });
        }

        info!(
            module = %schema.name,
            artifacts = artifacts.len(),
            "module artifacts synthesized"
        );
        Ok(SynthesisOutput {
            artifacts,
            plan,
            migration_path,
        })
    }

    fn write(&self, kind: ArtifactKind, path: PathBuf, content: &str) -> Result<Artifact> {
        write_atomic(&path, content)?;
        debug!(kind = %kind, path = %path.display(), "artifact written");
        Ok(Artifact { kind, path })
    }
}

fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| ForgeError::Structural(format!("{}: no parent directory", path.display())))?;
    std::fs::create_dir_all(parent)?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(content.as_bytes())?;
    tmp.persist(path).map_err(|e| ForgeError::Io(e.error))?;
    Ok(())
}

/// Model accessor snippets derived from the fields: label maps plus
/// `get{Field}LabelAttribute` methods for choice and checkbox types.
/// Built once and passed along, never accumulated behind the caller's
/// back.
#[derive(Debug, Default)]
pub struct AccessorSet {
    pub snippets: Vec<String>,
}

pub fn accessors_for(fields: &[FieldSpec]) -> AccessorSet {
    let mut snippets = Vec::new();
    for field in fields {
        if !field.show_in_table {
            continue;
        }
        let name = &field.name;
        let camel = name.to_lower_camel_case().to_upper_camel_case();
        match field.field_type {
            FieldType::Radio | FieldType::Select if !field.options.is_empty() => {
                snippets.push(label_map(field));
                snippets.push(format!(
                    "\n    public function get{camel}LabelAttribute()\n    {{\n        return $this->{name}Labels[$this->{name}] ?? 'Unknown';\n    }}"
                ));
            }
            FieldType::Multiselect if !field.options.is_empty() => {
                snippets.push(label_map(field));
                snippets.push(format!(
                    "\n    public function get{camel}LabelAttribute()\n    {{\n        $values = $this->{name};\n        if (is_string($values)) {{\n            $values = json_decode($values, true);\n        }}\n        if (!is_array($values)) return '';\n\n        $labels = [];\n        foreach ($values as $value) {{\n            $labels[] = $this->{name}Labels[$value] ?? 'Unknown';\n        }}\n        return implode(', ', $labels);\n    }}"
                ));
            }
            FieldType::Checkbox => {
                snippets.push(format!(
                    "\n    public function get{camel}LabelAttribute()\n    {{\n        return $this->{name} ? 'Yes' : 'No';\n    }}"
                ));
            }
            _ => {}
        }
    }
    AccessorSet { snippets }
}

fn label_map(field: &FieldSpec) -> String {
    let entries: Vec<String> = field
        .options
        .iter()
        .map(|o| format!("        '{}' => '{}'", o.value, o.label.replace('\'', "\\'")))
        .collect();
    format!(
        "\n    protected ${}Labels = [\n{}\n    ];",
        field.name,
        entries.join(",\n")
    )
}

fn model_context(
    schema: &ValidatedSchema,
    names: &ModuleNames,
    accessors: &AccessorSet,
    target_tables: &HashMap<i64, String>,
) -> Context {
    let mut traits = Vec::new();
    if schema.soft_deletes {
        traits.push("use SoftDeletes;".to_string());
    }
    if !schema.translations.is_empty() {
        traits.push("use \\App\\Traits\\HasTranslations;".to_string());
    }
    traits.extend(accessors.snippets.iter().cloned());

    let mut fillable: Vec<String> = schema
        .columns
        .iter()
        .map(|c| format!("'{}'", c.name))
        .collect();
    if schema.user_tracking {
        fillable.push("'added_by'".to_string());
        fillable.push("'updated_by'".to_string());
    }

    let casts: Vec<String> = schema
        .fields
        .iter()
        .filter_map(|f| f.cast().map(|c| format!("'{}' => '{c}'", f.name)))
        .collect();
    let casts = if casts.is_empty() {
        String::new()
    } else {
        format!(
            "protected $casts = [\n        {},\n    ];",
            casts.join(",\n        ")
        )
    };

    let relationships = relationship_methods(schema, target_tables);

    let translatable = schema
        .translations
        .values()
        .next()
        .map(|t| {
            let fields: Vec<String> = t.fields.keys().map(|k| format!("'{k}'")).collect();
            format!(
                "\n    public $translatable = [\n        {},\n    ];",
                fields.join(",\n        ")
            )
        })
        .unwrap_or_default();

    let mut context = Context::new();
    context.insert("namespace", "App\\Models");
    context.insert("class", &names.studly);
    context.insert("traits", &traits.join("\n    "));
    context.insert("table", &schema.table_name);
    context.insert("fillable", &fillable.join(",\n        "));
    context.insert("casts", &casts);
    context.insert("relationships", &relationships);
    context.insert("translations", &translatable);
    context
}

fn relationship_methods(
    schema: &ValidatedSchema,
    target_tables: &HashMap<i64, String>,
) -> String {
    if schema.relationships.is_empty() {
        return String::new();
    }
    let mut methods = Vec::new();
    for rel in &schema.relationships {
        let Some(table) = target_tables.get(&rel.module) else {
            continue;
        };
        let target = model_name_from_table(table);
        let method = target.to_lower_camel_case();
        let mut args = format!("{target}::class");
        if rel.kind == RelationKind::BelongsToMany {
            args.push_str(&format!(
                ", '{}'",
                rel.pivot_table.as_deref().unwrap_or_default()
            ));
        }
        if let Some(fk) = &rel.foreign_key {
            args.push_str(&format!(", '{fk}'"));
        }
        if let Some(lk) = &rel.local_key {
            args.push_str(&format!(", '{lk}'"));
        }
        let body = match rel.kind {
            RelationKind::HasOne => format!(
                "public function {method}()\n    {{\n        return $this->hasOne({args});\n    }}"
            ),
            RelationKind::HasMany => format!(
                "public function {method}s()\n    {{\n        return $this->hasMany({args});\n    }}"
            ),
            RelationKind::BelongsTo => format!(
                "public function {method}()\n    {{\n        return $this->belongsTo({args});\n    }}"
            ),
            RelationKind::BelongsToMany => {
                let pivot = if rel.pivot_columns.is_empty() {
                    String::new()
                } else {
                    let names: Vec<String> = rel
                        .pivot_columns
                        .iter()
                        .map(|c| format!("'{}'", c.name))
                        .collect();
                    format!("->withPivot({})", names.join(", "))
                };
                format!(
                    "public function {method}s()\n    {{\n        return $this->belongsToMany({args}){pivot};\n    }}"
                )
            }
        };
        methods.push(body);
    }
    if methods.is_empty() {
        String::new()
    } else {
        format!("\n    {}", methods.join("\n\n    "))
    }
}

fn model_name_from_table(table: &str) -> String {
    crate::paths::singular(table).to_upper_camel_case()
}

fn request_context(schema: &ValidatedSchema, names: &ModuleNames) -> Context {
    let mut rules: Vec<(String, String)> = Vec::new();
    let mut attributes: Vec<(String, String)> = Vec::new();
    let mut messages: Vec<(String, String)> = Vec::new();

    rules.push((
        "id".into(),
        format!("sometimes|required|exists:{},id", schema.table_name),
    ));
    messages.push(("id.required".into(), "The :attribute field is required".into()));
    messages.push(("id.exists".into(), "The selected :attribute is invalid".into()));

    for field in &schema.fields {
        attributes.push((field.name.clone(), field.label.clone()));
        let mut field_rules = Vec::new();

        match field.field_type {
            FieldType::Multiselect => field_rules.push("array".to_string()),
            FieldType::Radio if !field.options.is_empty() => {
                let values: Vec<&str> = field.options.iter().map(|o| o.value.as_str()).collect();
                field_rules.push(format!("in:{}", values.join(",")));
            }
            _ => {}
        }

        for rule in &field.backend_validation {
            match rule.as_str() {
                "required" => {
                    field_rules.push("required".into());
                    messages.push((
                        format!("{}.required", field.name),
                        "The :attribute field is required".into(),
                    ));
                }
                "string" => {
                    field_rules.push("string".into());
                    messages.push((
                        format!("{}.string", field.name),
                        "The :attribute must be a string".into(),
                    ));
                }
                "max" => {
                    let max = field
                        .backend_params
                        .get("max")
                        .map(String::as_str)
                        .unwrap_or("255");
                    field_rules.push(format!("max:{max}"));
                    messages.push((
                        format!("{}.max", field.name),
                        format!("The :attribute may not be greater than {max} characters"),
                    ));
                }
                "integer" => {
                    field_rules.push("integer".into());
                    messages.push((
                        format!("{}.integer", field.name),
                        "The :attribute must be an integer".into(),
                    ));
                }
                "boolean" => {
                    field_rules.push("boolean".into());
                    messages.push((
                        format!("{}.boolean", field.name),
                        "The :attribute field must be true or false".into(),
                    ));
                }
                "unique" => {
                    field_rules.push(format!("unique:{},{}", schema.table_name, field.name));
                    messages.push((
                        format!("{}.unique", field.name),
                        "The :attribute has already been taken".into(),
                    ));
                }
                other => field_rules.push(other.to_string()),
            }
        }

        if !field_rules.iter().any(|r| r == "required") {
            field_rules.push("nullable".into());
        }
        rules.push((field.name.clone(), field_rules.join("|")));
    }

    let prepare: Vec<String> = schema
        .fields
        .iter()
        .filter(|f| f.field_type == FieldType::Checkbox)
        .map(|f| format!("            '{0}' => $this->boolean('{0}'),", f.name))
        .collect();
    let prepare_for_validation = if prepare.is_empty() {
        String::new()
    } else {
        format!(
            "    protected function prepareForValidation()\n    {{\n        $this->merge([\n{}\n        ]);\n    }}\n\n",
            prepare.join("\n")
        )
    };

    let mut context = Context::new();
    context.insert("namespace", "App\\Http\\Requests");
    context.insert("class", &format!("{}Request", names.studly));
    context.insert("rules", &format_php_pairs(&rules));
    context.insert("attributes", &format_php_pairs(&attributes));
    context.insert("messages", &format_php_pairs(&messages));
    context.insert("prepare_for_validation", &prepare_for_validation);
    context
}

fn format_php_pairs(pairs: &[(String, String)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("            '{k}' => '{}'", v.replace('\'', "\\'")))
        .collect::<Vec<_>>()
        .join(",\n")
}

fn controller_context(
    schema: &ValidatedSchema,
    names: &ModuleNames,
    target_tables: &HashMap<i64, String>,
) -> Context {
    let mut custom = Vec::new();
    for rel in &schema.relationships {
        if rel.kind != RelationKind::BelongsTo {
            continue;
        }
        let Some(table) = target_tables.get(&rel.module) else {
            continue;
        };
        let target = model_name_from_table(table);
        let var = format!("{}s", target.to_lower_camel_case());
        custom.push(format!(
            "public function get{target}s()\n    {{\n        ${var} = $this->moduleService->get{target}List();\n        return ${var} != null\n            ? $this->sendSuccessResponse('Data found', ['{var}' => ${var}])\n            : $this->sendErrorResponse('Data not found', 404);\n    }}"
        ));
    }
    let custom_methods = if custom.is_empty() {
        String::new()
    } else {
        format!("\n\n    {}", custom.join("\n\n    "))
    };

    let mut context = Context::new();
    context.insert("namespace", "App\\Http\\Controllers");
    context.insert("class", &format!("{}Controller", names.studly));
    context.insert("request_class", &format!("{}Request", names.studly));
    context.insert("service_class", &format!("{}Service", names.studly));
    context.insert("module_name", &names.kebab);
    context.insert("view_path", &format!("backend.{}", names.kebab));
    context.insert(
        "lang_key",
        &format!("{0}/{0}", names.studly),
    );
    context.insert("custom_methods", &custom_methods);
    context
}

fn service_context(schema: &ValidatedSchema, names: &ModuleNames) -> Context {
    let mut search: Vec<String> = schema
        .fields
        .iter()
        .filter(|f| f.searchable)
        .map(|f| format!("'{}'", f.name))
        .collect();
    search.push("'created_at'".to_string());

    let mut context = Context::new();
    context.insert("namespace", "App\\Services");
    context.insert("class", &format!("{}Service", names.studly));
    context.insert("model", &names.studly);
    context.insert("dtr_class", &format!("{}DTR", names.studly));
    context.insert("search_columns", &search.join(",\n        "));
    context
}

fn resource_context(schema: &ValidatedSchema, names: &ModuleNames) -> Context {
    let mut lines = vec!["'id' => $this->id,".to_string()];
    for field in &schema.fields {
        if !field.show_in_table {
            continue;
        }
        let name = &field.name;
        let line = match field.field_type {
            FieldType::Radio | FieldType::Select | FieldType::Multiselect
                if !field.options.is_empty() =>
            {
                format!("'{name}' => $this->{name}_label,")
            }
            FieldType::Checkbox => format!("'{name}' => $this->{name}_label,"),
            FieldType::Date => format!("'{name}' => dateFormat($this->{name}) ?? null,"),
            FieldType::Time => format!("'{name}' => timeFormat($this->{name}) ?? null,"),
            FieldType::Datetime => {
                format!("'{name}' => dateTimeFormat($this->{name}) ?? null,")
            }
            FieldType::File => format!("'{name}' => $this->getFileUrl('{name}'),"),
            // Title fields without a label accessor or formatter render
            // as the emphasized row label.
            _ if field.is_title => {
                format!("'{name}' => \"<strong>{{$this->{name}}}</strong>\",")
            }
            _ => format!("'{name}' => $this->{name},"),
        };
        lines.push(line);
    }
    lines.push("'created_at' => dateTimeFormat($this->created_at) ?? null,".to_string());
    lines.push("'action' => getResourceActionButtons(self::$moduleId, $this),".to_string());

    let mut context = Context::new();
    context.insert("namespace", "App\\Http\\Resources");
    context.insert("class", &format!("{}DTR", names.studly));
    context.insert("array_content", &lines.join("\n            "));
    context
}

fn component_context(names: &ModuleNames) -> Context {
    let mut context = Context::new();
    context.insert("namespace", "App\\View\\Components");
    context.insert("class", &format!("{}Form", names.studly));
    context.insert("view_path", &format!("backend.{}", names.kebab));
    context
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::schema::{FieldOption, SchemaValidator};
    use crate::store::MetadataStore;
    use crate::testing::sample_schema;
    use tempfile::TempDir;

    fn validated(mut edit: impl FnMut(&mut crate::schema::ModuleSchema)) -> ValidatedSchema {
        let store = MetadataStore::open_in_memory().unwrap();
        let locales = vec!["en".to_string()];
        let mut schema = sample_schema("Product Item");
        edit(&mut schema);
        SchemaValidator::new(&store, &locales)
            .validate_all(schema)
            .unwrap()
    }

    #[test]
    fn synthesize_writes_the_full_artifact_set() {
        let dir = TempDir::new().unwrap();
        let config = EngineConfig::for_workspace(dir.path());
        let cache = TranslationCache::new();
        let synthesizer = Synthesizer::new(&config, &cache);
        let schema = validated(|_| {});

        let output = synthesizer.synthesize(&schema, &HashMap::new()).unwrap();
        // migration + 5 classes + 2 views + component + 1 locale bundle
        assert_eq!(output.artifacts.len(), 10);
        for artifact in &output.artifacts {
            assert!(
                artifact.path.exists(),
                "missing {} artifact {}",
                artifact.kind,
                artifact.path.display()
            );
        }
        assert!(
            dir.path()
                .join("app/Models/ProductItem.php")
                .exists()
        );
        assert!(
            dir.path()
                .join("resources/views/backend/product-item/form.blade.php")
                .exists()
        );
        assert!(
            dir.path()
                .join("lang/en/ProductItem/ProductItem.php")
                .exists()
        );
        assert!(cache.get("en", "ProductItem").is_some());
    }

    #[test]
    fn model_gets_soft_deletes_casts_and_fillable() {
        let dir = TempDir::new().unwrap();
        let config = EngineConfig::for_workspace(dir.path());
        let cache = TranslationCache::new();
        let synthesizer = Synthesizer::new(&config, &cache);
        let schema = validated(|s| {
            s.fields[0].field_type = FieldType::Checkbox;
        });

        synthesizer.synthesize(&schema, &HashMap::new()).unwrap();
        let model =
            std::fs::read_to_string(dir.path().join("app/Models/ProductItem.php")).unwrap();
        assert!(model.contains("use SoftDeletes;"));
        assert!(model.contains("protected $table = 'product_items';"));
        assert!(model.contains("'title' => 'boolean'"));
        assert!(model.contains("getTitleLabelAttribute"));
    }

    #[test]
    fn radio_accessors_thread_into_model_and_resource() {
        let fields = {
            let mut schema = sample_schema("Widget");
            schema.fields[0].field_type = FieldType::Radio;
            schema.fields[0].options = vec![
                FieldOption {
                    value: "1".into(),
                    label: "Active".into(),
                },
                FieldOption {
                    value: "2".into(),
                    label: "Inactive".into(),
                },
            ];
            schema.fields
        };
        let accessors = accessors_for(&fields);
        assert_eq!(accessors.snippets.len(), 2);
        assert!(accessors.snippets[0].contains("$titleLabels"));
        assert!(accessors.snippets[1].contains("getTitleLabelAttribute"));
    }

    #[test]
    fn title_emphasis_applies_to_any_plain_input_type() {
        let schema = validated(|s| {
            s.fields[0].field_type = FieldType::Email;
        });
        let context = resource_context(&schema, &ModuleNames::derive("Widget"));
        let rows = context.get("array_content").unwrap().as_str().unwrap();
        assert!(rows.contains("'title' => \"<strong>{$this->title}</strong>\","));

        // formatter types keep their rendering even as the title field
        let schema = validated(|s| {
            s.fields[0].field_type = FieldType::Date;
        });
        let context = resource_context(&schema, &ModuleNames::derive("Widget"));
        let rows = context.get("array_content").unwrap().as_str().unwrap();
        assert!(rows.contains("'title' => dateFormat($this->title) ?? null,"));
    }

    #[test]
    fn hidden_fields_get_no_accessors() {
        let fields = {
            let mut schema = sample_schema("Widget");
            schema.fields[0].field_type = FieldType::Checkbox;
            schema.fields[0].show_in_table = false;
            schema.fields
        };
        assert!(accessors_for(&fields).snippets.is_empty());
    }

    #[test]
    fn request_rules_cover_type_and_backend_rules() {
        let schema = validated(|s| {
            s.fields[0].backend_validation = vec!["required".into(), "max".into()];
            s.fields[0]
                .backend_params
                .insert("max".into(), "100".into());
        });
        let context = request_context(&schema, &ModuleNames::derive("Product Item"));
        let rules = context.get("rules").unwrap().as_str().unwrap();
        assert!(rules.contains("'id' => 'sometimes|required|exists:product_items,id'"));
        assert!(rules.contains("'title' => 'required|max:100'"));
    }

    #[test]
    fn optional_field_is_nullable() {
        let schema = validated(|s| {
            s.fields[0].backend_validation = vec!["string".into()];
        });
        let context = request_context(&schema, &ModuleNames::derive("Product Item"));
        let rules = context.get("rules").unwrap().as_str().unwrap();
        assert!(rules.contains("'title' => 'string|nullable'"));
    }
}
