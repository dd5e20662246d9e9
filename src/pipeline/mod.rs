//! Chains of external processes connected stdout-to-stdin, the way a shell
//! runs `a | b | c`.
//!
//! A [`Pipeline`] is plain data; [`run_pipeline`] spawns it. Orchestrators
//! go through the [`PipelineRunner`] trait so tests can observe which
//! pipelines would run, and in what order, without any database tools.

mod runner;
#[cfg(test)]
pub(crate) mod testing;

pub use runner::run_pipeline;

use crate::errors::PipelineError;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// One process in a pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    pub program: String,
    pub args: Vec<String>,
    /// Applied on top of the pipeline-level `extra_env`.
    pub env: BTreeMap<String, String>,
}

impl Stage {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    #[cfg(test)]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }
}

/// Renders the command line with `--password=` values masked, for logs and
/// error messages.
impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            if arg.starts_with("--password=") {
                f.write_str(" --password=***")?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Where the last stage's standard output goes. Exactly one per run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LastStdout {
    #[default]
    Discard,
    /// Forwarded to this process's own stdout.
    Inherit,
    /// Created or truncated before any stage starts.
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    pub stages: Vec<Stage>,
    /// Forward every stage's stderr to ours instead of discarding it.
    pub show_stderr: bool,
    pub last_stdout: LastStdout,
    /// Added to the inherited environment of every stage.
    pub extra_env: BTreeMap<String, String>,
}

impl Pipeline {
    pub fn new(stages: Vec<Stage>) -> Self {
        Self {
            stages,
            show_stderr: false,
            last_stdout: LastStdout::Discard,
            extra_env: BTreeMap::new(),
        }
    }

    pub fn show_stderr(mut self, show: bool) -> Self {
        self.show_stderr = show;
        self
    }

    /// Forward the last stage's stdout when `show` is set, otherwise discard it.
    pub fn show_last_stdout(mut self, show: bool) -> Self {
        self.last_stdout = if show {
            LastStdout::Inherit
        } else {
            LastStdout::Discard
        };
        self
    }

    pub fn output_file(mut self, path: impl AsRef<Path>) -> Self {
        self.last_stdout = LastStdout::File(path.as_ref().to_path_buf());
        self
    }

    pub fn extra_env(mut self, env: BTreeMap<String, String>) -> Self {
        self.extra_env.extend(env);
        self
    }

    /// Programs in stage order, e.g. `["cat", "gunzip", "psql"]`.
    #[cfg(test)]
    pub fn programs(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.program.as_str()).collect()
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, stage) in self.stages.iter().enumerate() {
            if i > 0 {
                f.write_str(" | ")?;
            }
            write!(f, "{}", stage)?;
        }
        if let LastStdout::File(path) = &self.last_stdout {
            write!(f, " > {}", path.display())?;
        }
        Ok(())
    }
}

/// Executes pipelines on behalf of the orchestrators.
pub trait PipelineRunner {
    fn run(&mut self, pipeline: &Pipeline) -> Result<(), PipelineError>;
}

/// Runs pipelines as real OS processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

impl PipelineRunner for ProcessRunner {
    fn run(&mut self, pipeline: &Pipeline) -> Result<(), PipelineError> {
        run_pipeline(pipeline)
    }
}
