//! Canonical artifact paths.
//!
//! Every generated file's location is a pure function of the module name
//! (plus table name for the migration plan). There is no manifest: the
//! destroyer recomputes the same paths to find what to delete.

use crate::config::EngineConfig;
use heck::{ToKebabCase, ToLowerCamelCase, ToSnakeCase, ToUpperCamelCase};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The closed set of artifact kinds emitted for one module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Migration,
    Model,
    Controller,
    Request,
    Resource,
    Service,
    IndexView,
    FormView,
    FormComponent,
    TranslationBundle,
}

/// Derived name forms for one module, computed once and passed around.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleNames {
    /// Raw name as submitted ("event candidate").
    pub raw: String,
    /// StudlyCase, used for class names and translation directories.
    pub studly: String,
    /// camelCase, used for route block markers.
    pub camel: String,
    /// kebab-case, used for URLs and the view directory.
    pub kebab: String,
    /// snake_case fallback table name (`{snake}s`) when none was recorded.
    pub snake: String,
}

impl ModuleNames {
    pub fn derive(raw: &str) -> Self {
        Self {
            raw: raw.to_string(),
            studly: raw.to_upper_camel_case(),
            camel: raw.to_lower_camel_case(),
            kebab: raw.to_kebab_case(),
            snake: raw.to_snake_case(),
        }
    }

    /// Default table name when the module row carries none.
    pub fn fallback_table(&self) -> String {
        format!("{}s", self.snake)
    }
}

/// Singular form of a table name, covering the plural shapes table names
/// actually take: `categories`, `addresses`, `boxes`, `quizzes`, `books`.
/// Irregular nouns are out of scope; callers can always override via an
/// explicit foreign-key name.
pub(crate) fn singular(table: &str) -> String {
    if let Some(stem) = table.strip_suffix("ies") {
        if !stem.is_empty() {
            return format!("{stem}y");
        }
    }
    if let Some(stem) = table.strip_suffix("zzes") {
        return format!("{stem}z");
    }
    for suffix in ["ses", "xes", "ches", "shes"] {
        if let Some(stem) = table.strip_suffix(suffix) {
            return format!("{stem}{}", &suffix[..suffix.len() - 2]);
        }
    }
    match table.strip_suffix('s') {
        Some(stem) if !stem.ends_with('s') => stem.to_string(),
        _ => table.to_string(),
    }
}

/// Resolves (module, artifact kind) to its canonical filesystem path
/// inside the configured workspace.
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    workspace: PathBuf,
}

impl ArtifactPaths {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            workspace: config.workspace_root.clone(),
        }
    }

    pub fn model(&self, names: &ModuleNames) -> PathBuf {
        self.workspace
            .join("app/Models")
            .join(format!("{}.php", names.studly))
    }

    pub fn controller(&self, names: &ModuleNames) -> PathBuf {
        self.workspace
            .join("app/Http/Controllers")
            .join(format!("{}Controller.php", names.studly))
    }

    pub fn request(&self, names: &ModuleNames) -> PathBuf {
        self.workspace
            .join("app/Http/Requests")
            .join(format!("{}Request.php", names.studly))
    }

    pub fn resource(&self, names: &ModuleNames) -> PathBuf {
        self.workspace
            .join("app/Http/Resources")
            .join(format!("{}DTR.php", names.studly))
    }

    pub fn service(&self, names: &ModuleNames) -> PathBuf {
        self.workspace
            .join("app/Services")
            .join(format!("{}Service.php", names.studly))
    }

    pub fn form_component(&self, names: &ModuleNames) -> PathBuf {
        self.workspace
            .join("app/View/Components")
            .join(format!("{}Form.php", names.studly))
    }

    /// Directory holding the module's index and form views.
    pub fn view_dir(&self, names: &ModuleNames) -> PathBuf {
        self.workspace
            .join("resources/views/backend")
            .join(&names.kebab)
    }

    pub fn index_view(&self, names: &ModuleNames) -> PathBuf {
        self.view_dir(names).join(format!("{}.blade.php", names.kebab))
    }

    pub fn form_view(&self, names: &ModuleNames) -> PathBuf {
        self.view_dir(names).join("form.blade.php")
    }

    /// Per-locale translation directory `lang/{locale}/{Studly}`.
    pub fn translation_dir(&self, locale: &str, names: &ModuleNames) -> PathBuf {
        self.workspace.join("lang").join(locale).join(&names.studly)
    }

    pub fn translation_bundle(&self, locale: &str, names: &ModuleNames) -> PathBuf {
        self.translation_dir(locale, names)
            .join(format!("{}.php", names.studly))
    }

    pub fn migrations_dir(&self) -> PathBuf {
        self.workspace.join("database/migrations")
    }

    /// Timestamped migration-plan artifact for `table`.
    pub fn migration_artifact(&self, table: &str, timestamp: &str) -> PathBuf {
        self.migrations_dir()
            .join(format!("{timestamp}_create_{table}_table.json"))
    }

    /// Stem that identifies any migration artifact for `table`, regardless
    /// of timestamp or extension. Used by the destroyer's sweep.
    pub fn migration_stem(table: &str) -> String {
        format!("_create_{table}_table")
    }

    pub fn routes_file(&self) -> PathBuf {
        self.workspace.join("routes/module-generated.php")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths() -> ArtifactPaths {
        ArtifactPaths {
            workspace: PathBuf::from("/srv/app"),
        }
    }

    #[test]
    fn name_forms() {
        let names = ModuleNames::derive("event candidate");
        assert_eq!(names.studly, "EventCandidate");
        assert_eq!(names.camel, "eventCandidate");
        assert_eq!(names.kebab, "event-candidate");
        assert_eq!(names.fallback_table(), "event_candidates");
    }

    #[test]
    fn table_names_singularize_beyond_a_trailing_s() {
        assert_eq!(singular("books"), "book");
        assert_eq!(singular("categories"), "category");
        assert_eq!(singular("addresses"), "address");
        assert_eq!(singular("boxes"), "box");
        assert_eq!(singular("branches"), "branch");
        assert_eq!(singular("quizzes"), "quiz");
        assert_eq!(singular("staff"), "staff");
    }

    #[test]
    fn paths_are_pure_functions_of_the_name() {
        let names = ModuleNames::derive("Widget");
        let p = paths();
        assert_eq!(p.model(&names), PathBuf::from("/srv/app/app/Models/Widget.php"));
        assert_eq!(
            p.controller(&names),
            PathBuf::from("/srv/app/app/Http/Controllers/WidgetController.php")
        );
        assert_eq!(
            p.index_view(&names),
            PathBuf::from("/srv/app/resources/views/backend/widget/widget.blade.php")
        );
        assert_eq!(
            p.translation_bundle("en", &names),
            PathBuf::from("/srv/app/lang/en/Widget/Widget.php")
        );
        // Same input, same output: the destroyer relies on this.
        assert_eq!(p.model(&names), p.model(&ModuleNames::derive("Widget")));
    }

    #[test]
    fn migration_artifact_naming() {
        let p = paths();
        let path = p.migration_artifact("widgets", "2025_01_10_120000");
        assert!(
            path.ends_with("database/migrations/2025_01_10_120000_create_widgets_table.json")
        );
        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .contains(&ArtifactPaths::migration_stem("widgets")));
    }
}
