mod logic;

pub use logic::{BackupOptions, BackupOutcome, BackupReport, backup_databases};

use anyhow::{Context, Result};
use std::io;

use crate::config::DatabaseConfig;
use crate::pipeline::ProcessRunner;

/// Public entry point for the backup process: writes one gzip-compressed
/// dump per database into the backup directory.
pub fn run_backup_flow(
    databases: &[(String, DatabaseConfig)],
    options: &BackupOptions,
) -> Result<BackupReport> {
    let mut stdout = io::stdout().lock();
    backup_databases(databases, options, &mut ProcessRunner, &mut stdout)
        .context("Backup could not be started")
}
