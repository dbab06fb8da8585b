//! The generated-routes file as a structured ledger.
//!
//! The PHP routes file is parsed into prologue, an ordered map of named
//! route blocks, and epilogue. All mutation happens on the map; a single
//! serializer writes the file back, so a load/save round trip with no
//! edits is byte-identical and repeated insert/remove cycles never skew
//! the surrounding scaffold.

use crate::error::{ForgeError, Result};
use crate::paths::ModuleNames;
use indexmap::IndexMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const START_MARKER: &str = "// ** Auto Generated Routes Start ** //";
const END_MARKER: &str = "// ** Auto Generated Routes End ** //";
const GROUP_OPEN: &str =
    "Route::middleware(['auth', 'check.module.permission'])->group(function () {";

/// Initial contents for a workspace that has no generated-routes file yet.
pub const SCAFFOLD: &str = "<?php\n\nuse Illuminate\\Support\\Facades\\Route;\n\n// ** Auto Generated Routes Start ** //\nRoute::middleware(['auth', 'check.module.permission'])->group(function () {\n});\n// ** Auto Generated Routes End ** //\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    NotFound,
}

/// Parsed form of `routes/module-generated.php`.
#[derive(Debug)]
pub struct RouteLedger {
    path: PathBuf,
    /// Everything up to and including the middleware group opener.
    prologue: String,
    /// Block name (camelCase module name) -> block body lines, without
    /// the `// name Start` / `// name End` markers.
    blocks: IndexMap<String, Vec<String>>,
    /// Everything from the group closer onward.
    epilogue: String,
}

impl RouteLedger {
    /// Write the scaffold if the file does not exist yet. Returns whether
    /// a file was created.
    pub fn init(path: &Path) -> Result<bool> {
        if path.exists() {
            debug!(path = %path.display(), "routes file already present");
            return Ok(false);
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, SCAFFOLD)?;
        info!(path = %path.display(), "routes scaffold created");
        Ok(true)
    }

    /// Parse the file. A missing scaffold (no markers, no middleware
    /// group) is a structural error: the file was edited out from under
    /// the engine and guessing an insertion point would corrupt it.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(path.to_path_buf(), &content)
    }

    fn parse(path: PathBuf, content: &str) -> Result<Self> {
        if !content.contains(START_MARKER) || !content.contains(END_MARKER) {
            return Err(ForgeError::Structural(format!(
                "{}: auto-generated route markers missing",
                path.display()
            )));
        }

        let mut lines = content.lines();
        let mut prologue_lines: Vec<&str> = Vec::new();
        let mut found_group = false;
        for line in lines.by_ref() {
            prologue_lines.push(line);
            if line.trim_start().starts_with(GROUP_OPEN) {
                found_group = true;
                break;
            }
        }
        if !found_group {
            return Err(ForgeError::Structural(format!(
                "{}: middleware group opener missing",
                path.display()
            )));
        }

        let mut blocks: IndexMap<String, Vec<String>> = IndexMap::new();
        let mut epilogue_lines: Vec<&str> = Vec::new();
        let mut current_name: Option<String> = None;
        let mut current_body: Vec<String> = Vec::new();
        for line in lines {
            let trimmed = line.trim();
            if let Some(name) = current_name.as_deref() {
                if trimmed == format!("// {name} End") {
                    blocks.insert(
                        current_name.take().unwrap(),
                        std::mem::take(&mut current_body),
                    );
                } else {
                    current_body.push(line.to_string());
                }
            } else if let Some(name) = trimmed
                .strip_prefix("// ")
                .and_then(|rest| rest.strip_suffix(" Start"))
            {
                current_name = Some(name.to_string());
                current_body.clear();
            } else if trimmed.is_empty() && epilogue_lines.is_empty() {
                // blank separator between blocks
            } else {
                epilogue_lines.push(line);
            }
        }
        if let Some(name) = current_name {
            return Err(ForgeError::Structural(format!(
                "{}: unterminated route block '{name}'",
                path.display()
            )));
        }

        Ok(Self {
            path,
            prologue: prologue_lines.join("\n"),
            blocks,
            epilogue: epilogue_lines.join("\n"),
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.blocks.contains_key(name)
    }

    pub fn block_names(&self) -> impl Iterator<Item = &str> {
        self.blocks.keys().map(String::as_str)
    }

    /// Register a module's routes. The name is the camelCase module name;
    /// a duplicate is a collision, never a silent overwrite.
    pub fn insert_block(&mut self, name: &str, body: Vec<String>) -> Result<()> {
        if self.blocks.contains_key(name) {
            return Err(ForgeError::Collision {
                what: "route block",
                name: name.to_string(),
            });
        }
        self.blocks.insert(name.to_string(), body);
        Ok(())
    }

    pub fn remove_block(&mut self, name: &str) -> RemoveOutcome {
        if self.blocks.shift_remove(name).is_some() {
            RemoveOutcome::Removed
        } else {
            RemoveOutcome::NotFound
        }
    }

    /// Serialize back to disk. The only writer of the routes file.
    pub fn save(&self) -> Result<()> {
        fs::write(&self.path, self.render())?;
        Ok(())
    }

    fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&self.prologue);
        out.push('\n');
        for (name, body) in &self.blocks {
            out.push('\n');
            out.push_str(&format!("        // {name} Start\n"));
            for line in body {
                out.push_str(line);
                out.push('\n');
            }
            out.push_str(&format!("        // {name} End\n"));
        }
        out.push_str(&self.epilogue);
        out.push('\n');
        out
    }
}

/// The eight admin endpoints every generated module gets.
pub fn route_block_body(names: &ModuleNames) -> Vec<String> {
    let kebab = &names.kebab;
    let controller = format!("App\\Http\\Controllers\\{}Controller", names.studly);
    vec![
        format!("        Route::get('/{kebab}/list', [{controller}::class, 'index'])->name('all-{kebab}');"),
        format!("        Route::get('/{kebab}/get', [{controller}::class, 'getAll'])->name('all-{kebab}-records');"),
        format!("        Route::post('/{kebab}/save', [{controller}::class, 'store'])->name('save-{kebab}');"),
        format!("        Route::post('{kebab}/getSingle', [{controller}::class, 'getSingle'])->name('get-single-{kebab}');"),
        format!("        Route::post('{kebab}/update', [{controller}::class, 'update'])->name('update-{kebab}');"),
        format!("        Route::post('{kebab}/delete', [{controller}::class, 'delete'])->name('delete-{kebab}');"),
        format!("        Route::get('{kebab}/archived-{kebab}-records', [{controller}::class, 'getArchivedItems'])->name('archived-{kebab}-records');"),
        format!("        Route::post('{kebab}/restore-{kebab}', [{controller}::class, 'restoreModule'])->name('restore-{kebab}');"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn scaffold_file(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("module-generated.php");
        RouteLedger::init(&path).unwrap();
        path
    }

    #[test]
    fn init_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("module-generated.php");
        assert!(RouteLedger::init(&path).unwrap());
        assert!(!RouteLedger::init(&path).unwrap());
    }

    #[test]
    fn untouched_round_trip_is_byte_identical() {
        let dir = TempDir::new().unwrap();
        let path = scaffold_file(&dir);

        let before = fs::read_to_string(&path).unwrap();
        let ledger = RouteLedger::load(&path).unwrap();
        ledger.save().unwrap();
        assert_eq!(before, fs::read_to_string(&path).unwrap());
    }

    #[test]
    fn insert_then_remove_restores_the_scaffold() {
        let dir = TempDir::new().unwrap();
        let path = scaffold_file(&dir);
        let before = fs::read_to_string(&path).unwrap();
        let names = ModuleNames::derive("Product Item");

        let mut ledger = RouteLedger::load(&path).unwrap();
        ledger
            .insert_block(&names.camel, route_block_body(&names))
            .unwrap();
        ledger.save().unwrap();
        assert_ne!(before, fs::read_to_string(&path).unwrap());

        let mut ledger = RouteLedger::load(&path).unwrap();
        assert!(ledger.contains("productItem"));
        assert_eq!(ledger.remove_block("productItem"), RemoveOutcome::Removed);
        ledger.save().unwrap();
        assert_eq!(before, fs::read_to_string(&path).unwrap());
    }

    #[test]
    fn duplicate_insert_is_a_collision() {
        let dir = TempDir::new().unwrap();
        let path = scaffold_file(&dir);
        let names = ModuleNames::derive("Product");

        let mut ledger = RouteLedger::load(&path).unwrap();
        ledger
            .insert_block(&names.camel, route_block_body(&names))
            .unwrap();
        let err = ledger
            .insert_block(&names.camel, route_block_body(&names))
            .unwrap_err();
        assert!(matches!(err, ForgeError::Collision { what: "route block", .. }));
    }

    #[test]
    fn removing_an_unknown_block_is_reported_not_fatal() {
        let dir = TempDir::new().unwrap();
        let path = scaffold_file(&dir);

        let mut ledger = RouteLedger::load(&path).unwrap();
        assert_eq!(ledger.remove_block("ghost"), RemoveOutcome::NotFound);
    }

    #[test]
    fn sibling_blocks_survive_a_removal() {
        let dir = TempDir::new().unwrap();
        let path = scaffold_file(&dir);
        let a = ModuleNames::derive("Alpha");
        let b = ModuleNames::derive("Beta");

        let mut ledger = RouteLedger::load(&path).unwrap();
        ledger.insert_block(&a.camel, route_block_body(&a)).unwrap();
        ledger.insert_block(&b.camel, route_block_body(&b)).unwrap();
        ledger.save().unwrap();

        let mut ledger = RouteLedger::load(&path).unwrap();
        ledger.remove_block("alpha");
        ledger.save().unwrap();

        let ledger = RouteLedger::load(&path).unwrap();
        assert!(!ledger.contains("alpha"));
        assert!(ledger.contains("beta"));
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("all-beta-records"));
        assert!(!content.contains("alpha"));
    }

    #[test]
    fn tampered_file_without_markers_is_structural() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("module-generated.php");
        fs::write(&path, "<?php\n// hand edited\n").unwrap();

        let err = RouteLedger::load(&path).unwrap_err();
        assert!(matches!(err, ForgeError::Structural(_)));
    }
}
