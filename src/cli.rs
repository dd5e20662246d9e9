use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Back up and restore the configured databases with their native dump tools
#[derive(Parser, Debug)]
#[command(name = "backupdb")]
#[command(version)]
pub struct Cli {
    /// Path to the JSON configuration file
    #[arg(long, global = true, env = "BACKUPDB_CONFIG", default_value = "config.json")]
    pub config: PathBuf,

    /// Directory holding backup files (overrides `backup_dir` in the config)
    #[arg(long, global = true, env = "BACKUPDB_BACKUP_DIR")]
    pub backup_dir: Option<PathBuf>,

    /// 0 = errors only, 1 = normal, 2 = debug, 3 = trace
    #[arg(
        short,
        long,
        global = true,
        default_value_t = 1,
        value_parser = clap::value_parser!(u8).range(0..=3)
    )]
    pub verbosity: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Dump every configured database into the backup directory
    Backup {
        /// Label for the backup files, e.g. `mybackup` writes
        /// "default-mybackup.pgsql.gz". Defaults to a timestamp.
        #[arg(long)]
        backup_name: Option<String>,

        #[command(flatten)]
        common: CommonArgs,
    },
    /// Restore every configured database from its latest backup
    Restore {
        /// Name of backup to restore from, e.g. `mybackup` restores
        /// "default-mybackup.pgsql.gz". Defaults to the latest backup.
        #[arg(long)]
        backup_name: Option<String>,

        /// Drop all tables before restoring. The dumps already contain drop
        /// statements, so this is rarely needed.
        #[arg(long)]
        drop_tables: bool,

        #[command(flatten)]
        common: CommonArgs,
    },
}

#[derive(Args, Debug)]
pub struct CommonArgs {
    /// Only process this database (repeatable)
    #[arg(long = "database", value_name = "NAME")]
    pub databases: Vec<String>,

    /// Show stderr of the dump and restore tools, and client stdout
    #[arg(long)]
    pub show_output: bool,
}
