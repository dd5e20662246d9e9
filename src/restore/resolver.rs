// backupdb/src/restore/resolver.rs
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::errors::{AppError, Result};
use crate::utils::backup_file_path;

/// Picks the backup file to restore `db_name` from.
///
/// With `backup_name`, the path is built directly and not checked; the
/// restore builder verifies it exists. Without one, the directory is
/// scanned for `{db_name}-*.{extension}.gz` and the most recently modified
/// file wins. Ties on modification time go to the lexicographically last
/// file name.
pub fn resolve_backup_file(
    backup_dir: &Path,
    db_name: &str,
    extension: &str,
    backup_name: Option<&str>,
) -> Result<PathBuf> {
    if let Some(label) = backup_name {
        return Ok(backup_file_path(backup_dir, db_name, label, extension));
    }

    let prefix = format!("{}-", db_name);
    let suffix = format!(".{}.gz", extension);
    let mut latest: Option<(SystemTime, String, PathBuf)> = None;

    for entry in WalkDir::new(backup_dir).min_depth(1).max_depth(1) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(dir = %backup_dir.display(), error = %e, "Skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(file_name) = entry.file_name().to_str() else {
            continue;
        };
        if !file_name.starts_with(&prefix) || !file_name.ends_with(&suffix) {
            continue;
        }
        let modified = match entry.metadata().map(|m| m.modified()) {
            Ok(Ok(modified)) => modified,
            _ => {
                warn!(file = %entry.path().display(), "Could not read modification time");
                continue;
            }
        };

        let candidate = (modified, file_name.to_string(), entry.path().to_path_buf());
        if latest
            .as_ref()
            .is_none_or(|(time, name, _)| (modified, file_name) > (*time, name.as_str()))
        {
            latest = Some(candidate);
        }
    }

    match latest {
        Some((_, _, path)) => {
            debug!(file = %path.display(), "Resolved latest backup");
            Ok(path)
        }
        None => Err(AppError::NoBackupFound {
            dir: backup_dir.to_path_buf(),
            pattern: format!("{}*{}", prefix, suffix),
        }),
    }
}
