pub mod logging;

use chrono::Local;
use std::path::{Path, PathBuf};

/// `{backup_dir}/{db_name}-{label}.{extension}.gz`
pub fn backup_file_path(backup_dir: &Path, db_name: &str, label: &str, extension: &str) -> PathBuf {
    backup_dir.join(format!("{}-{}.{}.gz", db_name, label, extension))
}

/// Label used when a backup is not given an explicit name.
pub fn timestamp_label() -> String {
    Local::now().format("%Y%m%d-%H%M%S").to_string()
}
