use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_LOCALES: &[&str] = &["en"];
const DEFAULT_DATABASE: &str = "database/forge.sqlite";

/// Resolved engine configuration: CLI arguments layered over an optional
/// YAML/JSON config file, with defaults filling the gaps.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Root of the application the engine scaffolds into.
    pub workspace_root: PathBuf,
    /// SQLite database holding module metadata and the generated tables.
    pub database: PathBuf,
    /// Locales every module must be translated into.
    pub locales: Vec<String>,
}

impl EngineConfig {
    pub fn from_args(args: CliArgs) -> Result<Self> {
        let CliArgs {
            config,
            workspace_root: cli_workspace_root,
            database: cli_database,
            locales: cli_locales,
        } = args;

        let file_config = if let Some(path) = config.as_ref() {
            load_config_file(path)?
        } else {
            PartialConfig::default()
        };

        let workspace_root = cli_workspace_root
            .or(file_config.workspace_root)
            .unwrap_or_else(|| PathBuf::from("."));

        let database = cli_database
            .or(file_config.database)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE));
        let database = if database.is_absolute() {
            database
        } else {
            workspace_root.join(database)
        };

        let mut locales = cli_locales
            .or(file_config.locales)
            .unwrap_or_else(|| DEFAULT_LOCALES.iter().map(|l| (*l).to_string()).collect())
            .into_iter()
            .map(|l| l.trim().to_ascii_lowercase())
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>();
        locales.dedup();

        anyhow::ensure!(!locales.is_empty(), "at least one locale must be configured");

        Ok(Self {
            workspace_root,
            database,
            locales,
        })
    }

    /// Build a config rooted at `workspace_root` with defaults, used by the
    /// integration tests and embedders.
    pub fn for_workspace(workspace_root: impl Into<PathBuf>) -> Self {
        let workspace_root = workspace_root.into();
        let database = workspace_root.join(DEFAULT_DATABASE);
        Self {
            workspace_root,
            database,
            locales: DEFAULT_LOCALES.iter().map(|l| (*l).to_string()).collect(),
        }
    }

    pub fn ensure_workspace_root(&self) -> Result<()> {
        anyhow::ensure!(
            self.workspace_root.exists(),
            "workspace root {:?} does not exist",
            self.workspace_root
        );
        anyhow::ensure!(
            self.workspace_root.is_dir(),
            "workspace root {:?} is not a directory",
            self.workspace_root
        );
        Ok(())
    }
}

#[derive(Parser, Debug, Default, Clone)]
pub struct CliArgs {
    #[arg(
        long,
        value_name = "FILE",
        help = "Path to a configuration file (YAML or JSON)",
        global = true
    )]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        env = "MODULE_FORGE_WORKSPACE",
        value_name = "DIR",
        help = "Root of the application to scaffold into",
        global = true
    )]
    pub workspace_root: Option<PathBuf>,

    #[arg(
        long,
        env = "MODULE_FORGE_DATABASE",
        value_name = "FILE",
        help = "SQLite database path (relative paths resolve under the workspace root)",
        global = true
    )]
    pub database: Option<PathBuf>,

    #[arg(
        long,
        env = "MODULE_FORGE_LOCALES",
        value_name = "LOCALE",
        value_delimiter = ',',
        help = "Comma-separated list of locales every module must provide",
        global = true
    )]
    pub locales: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct PartialConfig {
    workspace_root: Option<PathBuf>,
    database: Option<PathBuf>,
    locales: Option<Vec<String>>,
}

fn load_config_file(path: &Path) -> Result<PartialConfig> {
    if !path.exists() {
        anyhow::bail!("config file {:?} does not exist", path);
    }
    let contents =
        fs::read_to_string(path).with_context(|| format!("failed to read config file {path:?}"))?;
    let ext = path
        .extension()
        .and_then(|os| os.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let parsed = match ext.as_str() {
        "yaml" | "yml" => serde_yaml::from_str(&contents)
            .with_context(|| format!("failed to parse YAML config {path:?}"))?,
        "json" => serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse JSON config {path:?}"))?,
        other => anyhow::bail!("unsupported config extension: {other}"),
    };
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_resolve_under_workspace() {
        let config = EngineConfig::from_args(CliArgs {
            workspace_root: Some(PathBuf::from("/srv/app")),
            ..CliArgs::default()
        })
        .unwrap();
        assert_eq!(config.database, PathBuf::from("/srv/app/database/forge.sqlite"));
        assert_eq!(config.locales, vec!["en".to_string()]);
    }

    #[test]
    fn locales_are_normalized() {
        let config = EngineConfig::from_args(CliArgs {
            locales: Some(vec!["EN".into(), " fr ".into(), "".into()]),
            ..CliArgs::default()
        })
        .unwrap();
        assert_eq!(config.locales, vec!["en".to_string(), "fr".to_string()]);
    }
}
