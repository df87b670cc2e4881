use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use polity_common::{logging::init_logging, Configuration, Environment};
use polity_governance::GovernanceSettings;

mod scenario;

use scenario::Scenario;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level (overridden by RUST_LOG)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Also write daily-rolling logs to this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a scenario file against an in-memory engine
    Simulate {
        /// Scenario YAML file
        #[arg(long)]
        scenario: PathBuf,
        /// Write the final engine state to this JSON file
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },
    /// Validate a governance settings file and print its class hash
    Validate {
        /// Settings YAML file
        #[arg(long)]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let env = Environment {
        log_level: cli.log_level.clone(),
        log_dir: cli.log_dir.clone(),
    };
    env.validate()?;
    init_logging(&env.log_level, env.log_dir.as_deref(), "polity-cli")
        .context("failed to initialise logging")?;

    match &cli.command {
        Commands::Simulate { scenario, snapshot } => {
            let loaded = Scenario::from_file(scenario)
                .with_context(|| format!("failed to load scenario {}", scenario.display()))?;
            info!("Running scenario {} with {} steps", scenario.display(), loaded.steps.len());

            let run = scenario::run(loaded).await?;
            for outcome in &run.outcomes {
                println!("{}", serde_json::to_string(outcome)?);
            }
            if let Some(path) = snapshot {
                run.manager.save_snapshot(path).await?;
                info!("Snapshot written to {}", path.display());
            }
        }
        Commands::Validate { config } => {
            let config = GovernanceSettings::load(config)
                .with_context(|| format!("invalid settings in {}", config.display()))?;
            println!("{}", config.classes.hash()?);
        }
    }

    Ok(())
}
