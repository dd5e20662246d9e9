// backupdb/src/backup/logic.rs
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::DatabaseConfig;
use crate::engine::Engine;
use crate::errors::{AppError, Result};
use crate::pipeline::PipelineRunner;
use crate::utils::{backup_file_path, timestamp_label};

#[derive(Debug, Clone)]
pub struct BackupOptions {
    pub backup_dir: PathBuf,
    /// Label for this run's files; a timestamp when unset.
    pub backup_name: Option<String>,
    pub show_output: bool,
}

#[derive(Debug)]
pub enum BackupOutcome {
    BackedUp(PathBuf),
    Skipped(String),
    Failed(AppError),
}

#[derive(Debug, Default)]
pub struct BackupReport {
    pub outcomes: Vec<(String, BackupOutcome)>,
}

impl BackupReport {
    pub fn has_failures(&self) -> bool {
        self.outcomes
            .iter()
            .any(|(_, outcome)| matches!(outcome, BackupOutcome::Failed(_)))
    }

    #[cfg(test)]
    pub fn outcome(&self, db_name: &str) -> Option<&BackupOutcome> {
        self.outcomes
            .iter()
            .find(|(name, _)| name == db_name)
            .map(|(_, outcome)| outcome)
    }
}

/// Backs up each database in order, one status line per database to `out`.
/// All files written in one run share the same label.
pub fn backup_databases<R, W>(
    databases: &[(String, DatabaseConfig)],
    options: &BackupOptions,
    runner: &mut R,
    out: &mut W,
) -> Result<BackupReport>
where
    R: PipelineRunner,
    W: Write,
{
    fs::create_dir_all(&options.backup_dir).map_err(|e| {
        AppError::Config(format!(
            "Failed to create backup dir '{}': {}",
            options.backup_dir.display(),
            e
        ))
    })?;

    let label = options.backup_name.clone().unwrap_or_else(timestamp_label);
    let mut report = BackupReport::default();

    for (db_name, db_config) in databases {
        info!("Backing up '{}'...", db_name);
        let outcome = backup_database(db_name, db_config, &label, options, runner);
        let written = match &outcome {
            BackupOutcome::BackedUp(file) => {
                writeln!(out, "✓ Backed up '{}' to '{}'", db_name, file.display())
            }
            BackupOutcome::Skipped(reason) => writeln!(out, "⚠ Skipped '{}': {}", db_name, reason),
            BackupOutcome::Failed(err) => {
                warn!(database = %db_name, error = %err, "Backup failed");
                writeln!(out, "❌ Failed to back up '{}': {}", db_name, err)
            }
        };
        if let Err(e) = written {
            warn!(database = %db_name, error = %e, "Could not write status line");
        }
        report.outcomes.push((db_name.clone(), outcome));
    }
    Ok(report)
}

/// Sibling of `backup_file` the dump is written to until it completes.
fn partial_path(backup_file: &Path) -> PathBuf {
    let mut name = backup_file.as_os_str().to_os_string();
    name.push(".partial");
    PathBuf::from(name)
}

fn backup_database<R: PipelineRunner>(
    db_name: &str,
    db_config: &DatabaseConfig,
    label: &str,
    options: &BackupOptions,
    runner: &mut R,
) -> BackupOutcome {
    let engine = match Engine::from_id(&db_config.engine) {
        Ok(engine) => engine,
        Err(err) => return BackupOutcome::Failed(err),
    };
    if let Some(reason) = engine.skip_reason(db_config) {
        return BackupOutcome::Skipped(reason);
    }

    let backup_file = backup_file_path(&options.backup_dir, db_name, label, engine.backup_extension());
    let partial = partial_path(&backup_file);
    let pipeline = match engine.build_backup(db_config, &partial, options.show_output) {
        Ok(pipeline) => pipeline,
        Err(err) => return BackupOutcome::Failed(err),
    };

    debug!(database = %db_name, pipeline = %pipeline, "Running pipeline");
    let result = runner
        .run(&pipeline)
        .map_err(AppError::from)
        .and_then(|()| fs::rename(&partial, &backup_file).map_err(AppError::from));
    match result {
        Ok(()) => BackupOutcome::BackedUp(backup_file),
        Err(err) => {
            // An existing backup under the final name is left untouched.
            if partial.exists() {
                if let Err(e) = fs::remove_file(&partial) {
                    warn!(file = %partial.display(), error = %e, "Could not remove partial backup");
                }
            }
            BackupOutcome::Failed(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::RestoreFlags;
    use crate::errors::PipelineError;
    use crate::pipeline::{LastStdout, Pipeline, ProcessRunner};
    use crate::pipeline::testing::RecordingRunner;
    use crate::restore::{RestoreOptions, RestoreOutcome, restore_databases};
    use flate2::read::GzDecoder;
    use std::io::Read;
    use tempfile::tempdir;

    fn sqlite(path: &Path) -> DatabaseConfig {
        DatabaseConfig {
            engine: "django.db.backends.sqlite3".to_string(),
            name: path.display().to_string(),
            ..DatabaseConfig::default()
        }
    }

    #[test]
    fn test_sqlite_backup_with_explicit_name() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let db_file = dir.path().join("db.sqlite3");
        fs::write(&db_file, b"SQLite format 3\0 fixture")?;
        let backup_dir = dir.path().join("backups");
        let options = BackupOptions {
            backup_dir: backup_dir.clone(),
            backup_name: Some("mybackup".to_string()),
            show_output: false,
        };
        let databases = vec![("default".to_string(), sqlite(&db_file))];
        let mut out = Vec::new();

        let report = backup_databases(&databases, &options, &mut ProcessRunner, &mut out)?;

        let expected = backup_dir.join("default-mybackup.sqlite.gz");
        assert!(matches!(report.outcome("default"), Some(BackupOutcome::BackedUp(p)) if *p == expected));
        let mut contents = Vec::new();
        GzDecoder::new(fs::File::open(&expected)?).read_to_end(&mut contents)?;
        assert_eq!(contents, b"SQLite format 3\0 fixture");
        assert!(String::from_utf8(out)?.starts_with("✓ Backed up 'default'"));
        Ok(())
    }

    struct MissingTool;

    impl PipelineRunner for MissingTool {
        fn run(&mut self, pipeline: &Pipeline) -> std::result::Result<(), PipelineError> {
            Err(PipelineError::ExecutableNotFound {
                index: 0,
                program: pipeline.stages[0].program.clone(),
            })
        }
    }

    fn mysql_shop() -> Vec<(String, DatabaseConfig)> {
        vec![(
            "shop".to_string(),
            DatabaseConfig {
                engine: "mysql".to_string(),
                name: "shop".to_string(),
                user: Some("app".to_string()),
                ..DatabaseConfig::default()
            },
        )]
    }

    #[test]
    fn test_missing_tool_keeps_previous_backup() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let options = BackupOptions {
            backup_dir: dir.path().to_path_buf(),
            backup_name: Some("nightly".to_string()),
            show_output: false,
        };
        let previous = dir.path().join("shop-nightly.sql.gz");
        fs::write(&previous, b"yesterday's good dump")?;

        let report = backup_databases(&mysql_shop(), &options, &mut MissingTool, &mut Vec::new())?;

        assert!(matches!(
            report.outcome("shop"),
            Some(BackupOutcome::Failed(AppError::Pipeline(PipelineError::ExecutableNotFound { .. })))
        ));
        assert_eq!(fs::read(&previous)?, b"yesterday's good dump");
        Ok(())
    }

    #[test]
    fn test_failed_stage_keeps_previous_backup() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let options = BackupOptions {
            backup_dir: dir.path().to_path_buf(),
            backup_name: Some("nightly".to_string()),
            show_output: false,
        };
        let previous = dir.path().join("shop-nightly.sql.gz");
        fs::write(&previous, b"yesterday's good dump")?;
        let mut runner = RecordingRunner::failing_on("mysqldump");

        let report = backup_databases(&mysql_shop(), &options, &mut runner, &mut Vec::new())?;

        assert!(matches!(
            report.outcome("shop"),
            Some(BackupOutcome::Failed(AppError::Pipeline(PipelineError::StageFailed { index: 0, .. })))
        ));
        assert_eq!(runner.runs[0].last_stdout, LastStdout::File(partial_path(&previous)));
        assert_eq!(fs::read(&previous)?, b"yesterday's good dump");
        Ok(())
    }

    #[test]
    fn test_failed_dump_removes_its_partial_file() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let backup_dir = dir.path().join("backups");
        let options = BackupOptions {
            backup_dir: backup_dir.clone(),
            backup_name: Some("nightly".to_string()),
            show_output: false,
        };
        fs::create_dir_all(&backup_dir)?;
        let previous = backup_dir.join("default-nightly.sqlite.gz");
        fs::write(&previous, b"yesterday's good dump")?;
        // `cat` fails on the missing file after gzip has created the output.
        let databases = vec![("default".to_string(), sqlite(&dir.path().join("missing.sqlite3")))];

        let report = backup_databases(&databases, &options, &mut ProcessRunner, &mut Vec::new())?;

        assert!(matches!(
            report.outcome("default"),
            Some(BackupOutcome::Failed(AppError::Pipeline(PipelineError::StageFailed { index: 0, .. })))
        ));
        assert!(!partial_path(&previous).exists());
        assert_eq!(fs::read(&previous)?, b"yesterday's good dump");
        Ok(())
    }

    #[test]
    fn test_status_write_errors_do_not_stop_the_run() -> anyhow::Result<()> {
        struct BrokenPipe;

        impl Write for BrokenPipe {
            fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
                Err(std::io::ErrorKind::BrokenPipe.into())
            }

            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let dir = tempdir()?;
        let first = dir.path().join("first.sqlite3");
        let second = dir.path().join("second.sqlite3");
        fs::write(&first, b"1")?;
        fs::write(&second, b"2")?;
        let options = BackupOptions {
            backup_dir: dir.path().join("backups"),
            backup_name: Some("x".to_string()),
            show_output: false,
        };
        let databases = vec![
            ("first".to_string(), sqlite(&first)),
            ("second".to_string(), sqlite(&second)),
        ];

        let report = backup_databases(&databases, &options, &mut ProcessRunner, &mut BrokenPipe)?;

        assert!(matches!(report.outcome("first"), Some(BackupOutcome::BackedUp(_))));
        assert!(matches!(report.outcome("second"), Some(BackupOutcome::BackedUp(_))));
        Ok(())
    }

    #[test]
    fn test_unsupported_engine_does_not_stop_the_run() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let db_file = dir.path().join("db.sqlite3");
        fs::write(&db_file, b"data")?;
        let options = BackupOptions {
            backup_dir: dir.path().to_path_buf(),
            backup_name: Some("x".to_string()),
            show_output: false,
        };
        let databases = vec![
            (
                "legacy".to_string(),
                DatabaseConfig {
                    engine: "oracle".to_string(),
                    ..DatabaseConfig::default()
                },
            ),
            ("default".to_string(), sqlite(&db_file)),
        ];
        let report = backup_databases(&databases, &options, &mut ProcessRunner, &mut Vec::new())?;

        assert!(report.has_failures());
        assert!(matches!(
            report.outcome("legacy"),
            Some(BackupOutcome::Failed(AppError::UnsupportedEngine(_)))
        ));
        assert!(matches!(report.outcome("default"), Some(BackupOutcome::BackedUp(_))));
        Ok(())
    }

    #[test]
    fn test_timestamped_backup_restores_as_latest() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let db_file = dir.path().join("db.sqlite3");
        let original = b"original database bytes".to_vec();
        fs::write(&db_file, &original)?;
        let backup_dir = dir.path().join("backups");
        let databases = vec![("default".to_string(), sqlite(&db_file))];

        let backup = backup_databases(
            &databases,
            &BackupOptions {
                backup_dir: backup_dir.clone(),
                backup_name: None,
                show_output: false,
            },
            &mut ProcessRunner,
            &mut Vec::new(),
        )?;
        assert!(!backup.has_failures());

        fs::write(&db_file, b"changed since the backup")?;

        let restore = restore_databases(
            &databases,
            &RestoreOptions {
                backup_dir,
                backup_name: None,
                flags: RestoreFlags::default(),
            },
            &mut ProcessRunner,
            &mut Vec::new(),
        )?;

        match (backup.outcome("default"), restore.outcome("default")) {
            (Some(BackupOutcome::BackedUp(written)), Some(RestoreOutcome::Restored(read))) => {
                assert_eq!(written, read)
            }
            other => panic!("unexpected outcomes: {:?}", other),
        }
        assert_eq!(fs::read(&db_file)?, original);
        Ok(())
    }
}
