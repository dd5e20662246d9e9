// backupdb/src/restore/logic.rs
use std::fmt;
use std::io::Write;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use super::resolver::resolve_backup_file;
use crate::config::DatabaseConfig;
use crate::engine::{Engine, RestoreFlags};
use crate::errors::{AppError, Result};
use crate::pipeline::PipelineRunner;

#[derive(Debug, Clone)]
pub struct RestoreOptions {
    pub backup_dir: PathBuf,
    /// Restore `{db}-{backup_name}.{ext}.gz` instead of the latest backup.
    pub backup_name: Option<String>,
    pub flags: RestoreFlags,
}

/// What happened to one database.
#[derive(Debug)]
pub enum RestoreOutcome {
    Restored(PathBuf),
    Skipped(String),
    Failed(AppError),
}

#[derive(Debug, Default)]
pub struct RestoreReport {
    /// In processing order.
    pub outcomes: Vec<(String, RestoreOutcome)>,
}

impl RestoreReport {
    pub fn failures(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| matches!(outcome, RestoreOutcome::Failed(_)))
            .count()
    }

    pub fn has_failures(&self) -> bool {
        self.failures() > 0
    }

    #[cfg(test)]
    pub fn outcome(&self, db_name: &str) -> Option<&RestoreOutcome> {
        self.outcomes
            .iter()
            .find(|(name, _)| name == db_name)
            .map(|(_, outcome)| outcome)
    }
}

/// One status line for `db_name`.
pub struct StatusLine<'a>(pub &'a str, pub &'a RestoreOutcome);

impl fmt::Display for StatusLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let StatusLine(db_name, outcome) = self;
        match outcome {
            RestoreOutcome::Restored(file) => {
                write!(f, "✓ Restored '{}' from '{}'", db_name, file.display())
            }
            RestoreOutcome::Skipped(reason) => write!(f, "⚠ Skipped '{}': {}", db_name, reason),
            RestoreOutcome::Failed(err) => write!(f, "❌ Failed to restore '{}': {}", db_name, err),
        }
    }
}

/// Restores each database in order, writing one status line per database
/// to `out`.
///
/// Only a missing backup directory aborts the run, before anything is
/// attempted. Every other error is recorded against its database and the
/// next database is processed.
pub fn restore_databases<R, W>(
    databases: &[(String, DatabaseConfig)],
    options: &RestoreOptions,
    runner: &mut R,
    out: &mut W,
) -> Result<RestoreReport>
where
    R: PipelineRunner,
    W: Write,
{
    if !options.backup_dir.is_dir() {
        return Err(AppError::Config(format!(
            "Backup dir '{}' does not exist!",
            options.backup_dir.display()
        )));
    }

    let mut report = RestoreReport::default();
    for (db_name, db_config) in databases {
        info!("Restoring '{}'...", db_name);
        let outcome = restore_database(db_name, db_config, options, runner);
        if let RestoreOutcome::Failed(err) = &outcome {
            warn!(database = %db_name, error = %err, "Restore failed");
        }
        if let Err(e) = writeln!(out, "{}", StatusLine(db_name, &outcome)) {
            warn!(database = %db_name, error = %e, "Could not write status line");
        }
        report.outcomes.push((db_name.clone(), outcome));
    }
    Ok(report)
}

fn restore_database<R: PipelineRunner>(
    db_name: &str,
    db_config: &DatabaseConfig,
    options: &RestoreOptions,
    runner: &mut R,
) -> RestoreOutcome {
    let engine = match Engine::from_id(&db_config.engine) {
        Ok(engine) => engine,
        Err(err) => return RestoreOutcome::Failed(err),
    };
    if let Some(reason) = engine.skip_reason(db_config) {
        return RestoreOutcome::Skipped(reason);
    }

    let mut run = || -> Result<PathBuf> {
        let backup_file = resolve_backup_file(
            &options.backup_dir,
            db_name,
            engine.backup_extension(),
            options.backup_name.as_deref(),
        )?;
        let plan = engine.build_restore(db_config, &backup_file, options.flags)?;
        // The drop-tables pipeline, when present, finishes before the restore starts.
        for pipeline in plan.pipelines() {
            debug!(database = %db_name, pipeline = %pipeline, "Running pipeline");
            runner.run(pipeline)?;
        }
        Ok(backup_file)
    };

    match run() {
        Ok(backup_file) => RestoreOutcome::Restored(backup_file),
        Err(err) => RestoreOutcome::Failed(err),
    }
}
