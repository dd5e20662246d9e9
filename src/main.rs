//! Database Backup/Restore Tool
//!
//! Backs up and restores MySQL, PostgreSQL and SQLite databases by piping
//! their native dump and client tools through gzip.

// backupdb/src/main.rs
mod backup;
mod cli;
mod config;
mod engine;
mod errors;
mod pipeline;
mod restore;
mod utils;

use anyhow::{Context, Result};
use clap::Parser;
use std::process::ExitCode;

use backup::{BackupOptions, BackupOutcome};
use cli::{Cli, Commands};
use config::AppConfig;
use engine::RestoreFlags;
use restore::{RestoreOptions, RestoreOutcome};

fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    utils::logging::init_tracing(cli.verbosity);

    match run_app(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("❌ Error: {:?}", e);
            ExitCode::FAILURE
        }
    }
}

/// Returns whether every database was processed without failure.
fn run_app(cli: Cli) -> Result<bool> {
    let app_config = AppConfig::load_from_json(&cli.config, cli.backup_dir)
        .context(format!("Failed to load application configuration from {}", cli.config.display()))?;

    match cli.command {
        Commands::Backup { backup_name, common } => {
            let databases = app_config.select_databases(&common.databases)?;
            let options = BackupOptions {
                backup_dir: app_config.backup_dir.clone(),
                backup_name,
                show_output: common.show_output,
            };
            let report = backup::run_backup_flow(&databases, &options)?;
            let (mut done, mut skipped, mut failed) = (0, 0, 0);
            for (_, outcome) in &report.outcomes {
                match outcome {
                    BackupOutcome::BackedUp(_) => done += 1,
                    BackupOutcome::Skipped(_) => skipped += 1,
                    BackupOutcome::Failed(_) => failed += 1,
                }
            }
            tracing::info!(backed_up = done, skipped, failed, "Backup finished");
            Ok(!report.has_failures())
        }
        Commands::Restore {
            backup_name,
            drop_tables,
            common,
        } => {
            let databases = app_config.select_databases(&common.databases)?;
            let options = RestoreOptions {
                backup_dir: app_config.backup_dir.clone(),
                backup_name,
                flags: RestoreFlags {
                    drop_tables,
                    show_output: common.show_output,
                },
            };
            let report = restore::run_restore_flow(&databases, &options)?;
            let restored = report
                .outcomes
                .iter()
                .filter(|(_, outcome)| matches!(outcome, RestoreOutcome::Restored(_)))
                .count();
            tracing::info!(restored, total = report.outcomes.len(), "Restore finished");
            if report.has_failures() {
                tracing::error!("{} of {} databases failed to restore", report.failures(), report.outcomes.len());
            }
            Ok(!report.has_failures())
        }
    }
}
