use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use module_forge::{
    CliArgs, EngineConfig, LoggingConfig, ModuleSchema, Orchestrator, ValidationStep, init_logging,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(
    name = "module-forge",
    about = "Generate and destroy vertical admin modules",
    version
)]
struct Cli {
    #[command(flatten)]
    globals: CliArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate a schema and generate every artifact for the module.
    Generate {
        /// Module schema file (YAML or JSON).
        #[arg(long, value_name = "FILE")]
        schema: PathBuf,
        /// Role id to seed full permissions for.
        #[arg(long, value_name = "ROLE_ID")]
        seed_role: Option<i64>,
    },
    /// Remove a module and everything it generated.
    Destroy {
        /// Module name as recorded at generation time.
        module: String,
        /// Also destroy child modules, depth first.
        #[arg(long)]
        cascade: bool,
    },
    /// Destroy every module in the workspace, cascading through children.
    Refresh {
        /// Required confirmation; refresh tears down every module.
        #[arg(long)]
        all: bool,
    },
    /// Run schema validation without generating anything.
    Validate {
        /// Module schema file (YAML or JSON).
        #[arg(long, value_name = "FILE")]
        schema: PathBuf,
        /// Single wizard step (1-5); all steps when omitted.
        #[arg(long, value_name = "N")]
        step: Option<u8>,
    },
    /// Create the generated-routes scaffold if it does not exist.
    InitRoutes,
}

fn main() -> anyhow::Result<ExitCode> {
    init_logging(&LoggingConfig::default())?;

    let cli = Cli::parse();
    let config = EngineConfig::from_args(cli.globals)?;
    config.ensure_workspace_root()?;
    let orchestrator = Orchestrator::new(config)?;

    match cli.command {
        Command::Generate { schema, seed_role } => {
            let schema = load_schema(&schema)?;
            let report = orchestrator.generate(schema, seed_role).inspect_err(|e| {
                tracing::error!(category = %e.category(), "generation failed");
            })?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Destroy { module, cascade } => {
            let report = orchestrator.destroy(&module, cascade);
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(if report.success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::Refresh { all } => {
            if !all {
                bail!("refresh tears down every module; pass --all to confirm");
            }
            let reports = orchestrator.refresh_all()?;
            println!("{}", serde_json::to_string_pretty(&reports)?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Validate { schema, step } => {
            let mut schema = load_schema(&schema)?;
            let steps: Vec<ValidationStep> = match step {
                Some(n) => {
                    let step = ValidationStep::from_number(n)
                        .with_context(|| format!("no validation step numbered {n}"))?;
                    vec![step]
                }
                None => ValidationStep::ALL.to_vec(),
            };

            let mut valid = true;
            for step in steps {
                let report = orchestrator.validate_step(step, &mut schema)?;
                valid &= report.is_valid();
                println!("{report}");
            }
            Ok(if valid {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::InitRoutes => {
            let created = orchestrator.init_routes()?;
            if created {
                println!("routes scaffold created");
            } else {
                println!("routes scaffold already present");
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn load_schema(path: &Path) -> anyhow::Result<ModuleSchema> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read schema file {path:?}"))?;
    let ext = path
        .extension()
        .and_then(|os| os.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    let schema = match ext.as_str() {
        "yaml" | "yml" => serde_yaml::from_str(&contents)
            .with_context(|| format!("failed to parse YAML schema {path:?}"))?,
        "json" => serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse JSON schema {path:?}"))?,
        other => bail!("unsupported schema extension: {other}"),
    };
    Ok(schema)
}
