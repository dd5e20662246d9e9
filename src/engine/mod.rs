//! Per-engine backup and restore command builders.
//!
//! Builders are pure: they turn a [`DatabaseConfig`] into [`Pipeline`]s and
//! never touch a process. The only filesystem access is the backup-file
//! existence check every restore goes through first.

mod mysql;
mod postgresql;
mod sqlite;

use std::fmt;
use std::path::Path;

use crate::config::DatabaseConfig;
use crate::errors::{AppError, Result};
use crate::pipeline::Pipeline;

/// Database engines with backup support. The set is closed: adding an
/// engine means adding a variant and its builders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Engine {
    Mysql,
    Postgresql,
    Sqlite,
}

/// Flags that shape a restore.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreFlags {
    /// Drop existing tables in a separate pipeline before restoring.
    pub drop_tables: bool,
    /// Forward tool stderr, and the client's stdout, to ours.
    pub show_output: bool,
}

/// Pipelines for one database restore, in execution order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestorePlan {
    pub drop_tables: Option<Pipeline>,
    pub restore: Pipeline,
}

impl RestorePlan {
    pub fn pipelines(&self) -> impl Iterator<Item = &Pipeline> {
        self.drop_tables.iter().chain(std::iter::once(&self.restore))
    }
}

impl Engine {
    #[cfg(test)]
    pub const ALL: [Engine; 3] = [Engine::Mysql, Engine::Postgresql, Engine::Sqlite];

    /// Maps an engine identifier, short (`postgresql`) or Django-style
    /// (`django.db.backends.postgresql_psycopg2`), onto a supported engine.
    pub fn from_id(id: &str) -> Result<Self> {
        let short = id.trim().rsplit('.').next().unwrap_or_default();
        match short.to_ascii_lowercase().as_str() {
            "mysql" => Ok(Engine::Mysql),
            "postgresql" | "postgresql_psycopg2" | "postgres" | "postgis" => {
                Ok(Engine::Postgresql)
            }
            "sqlite" | "sqlite3" => Ok(Engine::Sqlite),
            _ => Err(AppError::UnsupportedEngine(id.to_string())),
        }
    }

    /// Extension between the label and `.gz` in backup file names.
    pub fn backup_extension(self) -> &'static str {
        match self {
            Engine::Mysql => "sql",
            Engine::Postgresql => "pgsql",
            Engine::Sqlite => "sqlite",
        }
    }

    /// Why this database has nothing to back up or restore, if so.
    pub fn skip_reason(self, config: &DatabaseConfig) -> Option<String> {
        match self {
            Engine::Sqlite => sqlite::skip_reason(config),
            Engine::Mysql | Engine::Postgresql => None,
        }
    }

    /// Pipeline that writes a gzip-compressed dump to `backup_file`.
    pub fn build_backup(
        self,
        config: &DatabaseConfig,
        backup_file: &Path,
        show_output: bool,
    ) -> Result<Pipeline> {
        match self {
            Engine::Mysql => mysql::backup(config, backup_file, show_output),
            Engine::Postgresql => postgresql::backup(config, backup_file, show_output),
            Engine::Sqlite => sqlite::backup(config, backup_file, show_output),
        }
    }

    /// Pipelines that load `backup_file` back into the database. Fails with
    /// [`AppError::MissingBackupFile`] if the file is not on disk.
    pub fn build_restore(
        self,
        config: &DatabaseConfig,
        backup_file: &Path,
        flags: RestoreFlags,
    ) -> Result<RestorePlan> {
        require_backup_exists(backup_file)?;
        match self {
            Engine::Mysql => mysql::restore(config, backup_file, flags),
            Engine::Postgresql => postgresql::restore(config, backup_file, flags),
            Engine::Sqlite => sqlite::restore(config, backup_file, flags),
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Engine::Mysql => "mysql",
            Engine::Postgresql => "postgresql",
            Engine::Sqlite => "sqlite",
        })
    }
}

fn require_backup_exists(backup_file: &Path) -> Result<()> {
    if backup_file.is_file() {
        Ok(())
    } else {
        Err(AppError::MissingBackupFile(backup_file.to_path_buf()))
    }
}

fn require_user(config: &DatabaseConfig) -> Result<&str> {
    config
        .user
        .as_deref()
        .filter(|user| !user.is_empty())
        .ok_or_else(|| AppError::Config(format!("no user configured for database '{}'", config.name)))
}
