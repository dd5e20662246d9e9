use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Restore for '{0}' engine not implemented")]
    UnsupportedEngine(String),

    #[error("Could not find backup files matching '{pattern}' in '{}'", .dir.display())]
    NoBackupFound { dir: PathBuf, pattern: String },

    #[error("Could not find file '{}'", .0.display())]
    MissingBackupFile(PathBuf),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure of one pipeline run. Stage indices are zero-based.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Pipeline has no stages")]
    Empty,

    #[error("Stage {index} ({program}): executable not found in PATH")]
    ExecutableNotFound { index: usize, program: String },

    #[error("Stage {index} ({command}) could not be started: {source}")]
    Spawn {
        index: usize,
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not open output file '{}': {source}", .path.display())]
    OutputFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed waiting on stage {index} ({command}): {source}")]
    Wait {
        index: usize,
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Stage {index} ({command}) {}", describe_exit(.code))]
    StageFailed {
        index: usize,
        command: String,
        code: Option<i32>,
    },
}

fn describe_exit(code: &Option<i32>) -> String {
    match *code {
        Some(code) => format!("exited with status {}", code),
        None => "was terminated by a signal".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
