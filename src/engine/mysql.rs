use std::path::Path;

use super::{RestoreFlags, RestorePlan, require_user};
use crate::config::DatabaseConfig;
use crate::errors::Result;
use crate::pipeline::{Pipeline, Stage};

/// `--user=U [--password=P] [--host=H] [--port=P] DB`, shared by `mysql`
/// and `mysqldump`.
fn connection_args(config: &DatabaseConfig) -> Result<Vec<String>> {
    let mut args = vec![format!("--user={}", require_user(config)?)];
    if let Some(password) = config.password.as_deref().filter(|p| !p.is_empty()) {
        args.push(format!("--password={}", password));
    }
    if let Some(host) = config.host.as_deref().filter(|h| !h.is_empty()) {
        args.push(format!("--host={}", host));
    }
    if let Some(port) = config.port {
        args.push(format!("--port={}", port));
    }
    args.push(config.name.clone());
    Ok(args)
}

pub(super) fn backup(config: &DatabaseConfig, backup_file: &Path, show_output: bool) -> Result<Pipeline> {
    let args = connection_args(config)?;
    Ok(Pipeline::new(vec![Stage::new("mysqldump").args(args), Stage::new("gzip")])
        .output_file(backup_file)
        .show_stderr(show_output))
}

pub(super) fn restore(config: &DatabaseConfig, backup_file: &Path, flags: RestoreFlags) -> Result<RestorePlan> {
    let args = connection_args(config)?;
    let mysql = Stage::new("mysql").args(args.iter().cloned());

    // DROP statements come from a schema-only dump of the live database.
    let drop_tables = flags.drop_tables.then(|| {
        Pipeline::new(vec![
            Stage::new("mysqldump").arg("--no-data").args(args.iter().cloned()),
            Stage::new("grep").arg("^DROP"),
            mysql.clone(),
        ])
        .show_stderr(flags.show_output)
        .show_last_stdout(flags.show_output)
    });

    let restore = Pipeline::new(vec![
        Stage::new("cat").arg(backup_file.display().to_string()),
        Stage::new("gunzip"),
        mysql,
    ])
    .show_stderr(flags.show_output)
    .show_last_stdout(flags.show_output);

    Ok(RestorePlan { drop_tables, restore })
}
