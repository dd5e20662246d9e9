mod logic;
pub(crate) mod resolver;

pub use logic::{RestoreOptions, RestoreOutcome, RestoreReport, restore_databases};

use anyhow::{Context, Result};
use std::io;

use crate::config::DatabaseConfig;
use crate::pipeline::ProcessRunner;

/// Public entry point for the restore process: restores `databases` with
/// real processes and prints one status line per database to stdout.
pub fn run_restore_flow(
    databases: &[(String, DatabaseConfig)],
    options: &RestoreOptions,
) -> Result<RestoreReport> {
    let mut stdout = io::stdout().lock();
    restore_databases(databases, options, &mut ProcessRunner, &mut stdout)
        .context("Restore could not be started")
}
