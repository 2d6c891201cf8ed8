//! SiteVault CLI - whole-database backup and restore
//!
//! Usage:
//!   sitevault export [--output <path>]
//!   sitevault import <file> [--continue-on-error] [--atomic]
//!   sitevault serve [--bind <addr>]
//!
//! The database comes from `sitevault.toml` (or `--config` / `SITEVAULT_CONFIG`).

mod config;
mod logging;
mod server;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sitevault_backup::{BackupEngine, ErrorPolicy, ExportOptions, ImportOptions};
use sitevault_drivers::DriverRegistry;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use config::Settings;
use server::{AppState, ImportResponse};

#[derive(Parser)]
#[command(name = "sitevault")]
#[command(about = "SiteVault - snapshot and restore a whole site database")]
#[command(version)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, global = true, env = "SITEVAULT_CONFIG")]
    config: Option<PathBuf>,

    /// Log JSON lines instead of human-readable output
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a snapshot of the configured database to a file
    Export {
        /// Output file (defaults to backup-<date>.json in the current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Restore the configured database from a snapshot file
    Import {
        /// Snapshot file to restore
        file: PathBuf,

        /// Skip tables that fail instead of stopping
        #[arg(long)]
        continue_on_error: bool,

        /// Restore everything in one transaction
        #[arg(long)]
        atomic: bool,
    },

    /// Serve the export/import HTTP endpoints
    Serve {
        /// Address to listen on (overrides `[server] bind`)
        #[arg(short, long)]
        bind: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref()).context("failed to load configuration")?;

    let _log_guard = logging::init(logging::LoggingConfig {
        json: cli.log_json || settings.logging.json,
        log_dir: settings.logging.dir.clone(),
        default_filter: settings
            .logging
            .filter
            .clone()
            .unwrap_or_else(|| logging::LoggingConfig::default().default_filter),
        ..Default::default()
    })?;

    let connection_config = settings
        .database
        .connection_config()
        .context("invalid [database] settings")?;
    let registry = DriverRegistry::with_defaults();
    let driver = registry.for_config(&connection_config)?;
    tracing::info!(
        target_db = %driver.build_connection_string(&connection_config),
        "using database"
    );
    let engine = BackupEngine::new(driver, connection_config);
    let database_name = settings.database.metadata_name()?;

    match cli.command {
        Commands::Export { output } => export(&engine, database_name, output).await,
        Commands::Import {
            file,
            continue_on_error,
            atomic,
        } => {
            let mut options = settings.import.options();
            if continue_on_error {
                options.policy = ErrorPolicy::ContinueOnError;
            }
            options.atomic |= atomic;
            import(&engine, &file, &options).await
        }
        Commands::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| settings.server.bind.clone());
            let state = Arc::new(AppState {
                engine,
                import_options: settings.import.options(),
                database_name,
            });
            server::serve(state, &bind).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn export(
    engine: &BackupEngine,
    database_name: Option<String>,
    output: Option<PathBuf>,
) -> anyhow::Result<ExitCode> {
    let outcome = engine
        .export(ExportOptions {
            database_name,
            timestamp: None,
        })
        .await;

    let path = output.unwrap_or_else(|| PathBuf::from(outcome.artifact.suggested_filename()));
    let bytes = outcome.artifact.to_json_vec()?;
    tokio::fs::write(&path, &bytes)
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;

    let report = &outcome.report;
    println!(
        "{} ({} tables, {} rows)",
        path.display(),
        report.tables.len(),
        report.total_rows()
    );
    if report.synthetic {
        println!(
            "warning: database unavailable ({}); wrote the sample dataset",
            report.fallback_reason.as_deref().unwrap_or("unknown reason")
        );
    }
    let degraded = report.degraded_tables();
    if !degraded.is_empty() {
        println!("warning: rows could not be read for: {}", degraded.join(", "));
    }
    Ok(ExitCode::SUCCESS)
}

async fn import(
    engine: &BackupEngine,
    file: &Path,
    options: &ImportOptions,
) -> anyhow::Result<ExitCode> {
    let payload = tokio::fs::read(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;

    let (_, response) = ImportResponse::from_result(engine.import(&payload, options).await);
    println!("{}", serde_json::to_string_pretty(&response)?);

    Ok(if response.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
