use std::path::Path;

use super::{RestoreFlags, RestorePlan};
use crate::config::DatabaseConfig;
use crate::errors::Result;
use crate::pipeline::{Pipeline, Stage};

pub(super) fn skip_reason(config: &DatabaseConfig) -> Option<String> {
    match config.name.trim() {
        "" => Some("no database file configured".to_string()),
        ":memory:" => Some("in-memory database has no file to back up".to_string()),
        _ => None,
    }
}

pub(super) fn backup(config: &DatabaseConfig, backup_file: &Path, show_output: bool) -> Result<Pipeline> {
    Ok(Pipeline::new(vec![
        Stage::new("cat").arg(config.name.clone()),
        Stage::new("gzip"),
    ])
    .output_file(backup_file)
    .show_stderr(show_output))
}

/// The database is the file: decompress straight over it.
pub(super) fn restore(config: &DatabaseConfig, backup_file: &Path, flags: RestoreFlags) -> Result<RestorePlan> {
    let restore = Pipeline::new(vec![
        Stage::new("cat").arg(backup_file.display().to_string()),
        Stage::new("gunzip"),
    ])
    .output_file(&config.name)
    .show_stderr(flags.show_output);

    Ok(RestorePlan {
        drop_tables: None,
        restore,
    })
}
