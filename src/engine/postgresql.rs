use std::collections::BTreeMap;
use std::path::Path;

use super::{RestoreFlags, RestorePlan, require_user};
use crate::config::DatabaseConfig;
use crate::errors::Result;
use crate::pipeline::{Pipeline, Stage};

/// Emits one `DROP TABLE` statement per table in the public schema.
const DROP_TABLES_SQL: &str = "SELECT 'DROP TABLE IF EXISTS \"' || tablename || '\" CASCADE;' FROM pg_tables WHERE schemaname = 'public';";

/// `--username=U [--host=H] [--port=P] [extra...] DB`. The password is never
/// part of argv; see [`password_env`].
fn connection_args(config: &DatabaseConfig, extra: &[String]) -> Result<Vec<String>> {
    let mut args = vec![format!("--username={}", require_user(config)?)];
    if let Some(host) = config.host.as_deref().filter(|h| !h.is_empty()) {
        args.push(format!("--host={}", host));
    }
    if let Some(port) = config.port {
        args.push(format!("--port={}", port));
    }
    args.extend(extra.iter().cloned());
    args.push(config.name.clone());
    Ok(args)
}

fn password_env(config: &DatabaseConfig) -> BTreeMap<String, String> {
    config
        .password
        .iter()
        .filter(|p| !p.is_empty())
        .map(|p| ("PGPASSWORD".to_string(), p.clone()))
        .collect()
}

pub(super) fn backup(config: &DatabaseConfig, backup_file: &Path, show_output: bool) -> Result<Pipeline> {
    let args = connection_args(config, &config.pg_dump_options)?;
    Ok(Pipeline::new(vec![
        Stage::new("pg_dump").arg("--clean").args(args),
        Stage::new("gzip"),
    ])
    .output_file(backup_file)
    .extra_env(password_env(config))
    .show_stderr(show_output))
}

pub(super) fn restore(config: &DatabaseConfig, backup_file: &Path, flags: RestoreFlags) -> Result<RestorePlan> {
    let psql = Stage::new("psql").args(connection_args(config, &[])?);
    let env = password_env(config);

    let drop_tables = flags.drop_tables.then(|| {
        Pipeline::new(vec![
            psql.clone().args(["-t", "-c", DROP_TABLES_SQL]),
            psql.clone(),
        ])
        .extra_env(env.clone())
        .show_stderr(flags.show_output)
        .show_last_stdout(flags.show_output)
    });

    let restore = Pipeline::new(vec![
        Stage::new("cat").arg(backup_file.display().to_string()),
        Stage::new("gunzip"),
        psql,
    ])
    .extra_env(env)
    .show_stderr(flags.show_output)
    .show_last_stdout(flags.show_output);

    Ok(RestorePlan { drop_tables, restore })
}
