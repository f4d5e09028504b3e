//! `databridge` CLI entry-point.
//!
//! Available sub-commands:
//! - `export`   — run one export profile (the scheduled-job entry point).
//! - `serve`    — start the HTTP trigger API.
//! - `check`    — open a session, run a probe query, close it.
//! - `profiles` — list the registered export profiles.

mod logging;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use db::{ConnectionManager, SqlxDriver};
use engine::{AppConfig, ExportOrchestrator, ExportSink, ProfileRegistry, RunOptions};
use tracing::{error, info};

const LOG_PREFIX: &str = "databridge";

#[derive(Parser)]
#[command(
    name = "databridge",
    about = "Export warehouse query results to JSON files and webhooks",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one export profile and exit.
    Export {
        /// Profile name, e.g. `birdeye`.
        profile: String,
        /// Keep only rows for this brand.
        #[arg(long)]
        brand: Option<String>,
        /// JSON file with extra or overriding profiles.
        #[arg(long, env = "EXPORT_PROFILES")]
        profiles: Option<PathBuf>,
    },
    /// Start the HTTP trigger API.
    Serve {
        /// Listen address; defaults to 0.0.0.0:$PORT.
        #[arg(long)]
        bind: Option<SocketAddr>,
        #[arg(long, env = "EXPORT_PROFILES")]
        profiles: Option<PathBuf>,
    },
    /// Verify warehouse credentials with a probe query.
    Check {
        #[arg(long, default_value = "SELECT 1")]
        sql: String,
    },
    /// List registered export profiles.
    Profiles {
        #[arg(long, env = "EXPORT_PROFILES")]
        profiles: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("databridge: {e}");
            return ExitCode::FAILURE;
        }
    };

    let _guard = match logging::init(&config.log.dir, LOG_PREFIX, &config.log.level) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("databridge: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    match run(cli.command, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command, config: AppConfig) -> Result<()> {
    match command {
        Command::Export { profile, brand, profiles } => {
            let registry = load_profiles(profiles.as_deref())?;
            let profile = registry.get(&profile)?;
            let orchestrator = orchestrator()?;

            let report = orchestrator
                .run(profile, &config, &RunOptions { brand_filter: brand })
                .await
                .with_context(|| format!("{} export failed", profile.name))?;

            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Serve { bind, profiles } => {
            let registry = load_profiles(profiles.as_deref())?;
            let addr = bind.unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], config.port)));
            info!("Starting API server on {addr} with {} profiles", registry.len());

            let state = api::AppState::new(orchestrator()?, config, registry);
            api::serve(addr, state).await.context("API server stopped")?;
        }
        Command::Check { sql } => {
            let mut manager = ConnectionManager::new(Arc::new(SqlxDriver::new()), config.connection_config()?);
            info!("Checking {}", manager.config().connection_string());

            manager.open().await?;
            let result = manager.execute(&sql, &[]).await;
            manager.close().await;

            let rows = result?;
            println!("Connection OK: `{sql}` returned {} rows", rows.len());
        }
        Command::Profiles { profiles } => {
            let registry = load_profiles(profiles.as_deref())?;
            for profile in registry.iter() {
                println!(
                    "{:<20} webhook={:<9} output={}",
                    profile.name,
                    profile.webhook,
                    profile.output_path.display()
                );
            }
        }
    }
    Ok(())
}

fn orchestrator() -> Result<ExportOrchestrator> {
    let driver = Arc::new(SqlxDriver::new());
    Ok(ExportOrchestrator::new(driver, ExportSink::new()?))
}

fn load_profiles(path: Option<&std::path::Path>) -> Result<ProfileRegistry> {
    let mut registry = ProfileRegistry::builtin();
    if let Some(path) = path {
        registry.load_file(path)?;
    }
    Ok(registry)
}
