use std::fs::File;
use std::path::PathBuf;
use std::process::{Child, ChildStdout, Command, Stdio};
use tracing::{debug, warn};
use which::which;

use super::{LastStdout, Pipeline};
use crate::errors::PipelineError;

/// Runs every stage of `pipeline` with stage *i*'s stdout feeding stage
/// *i+1*'s stdin through an OS pipe, then waits for all of them.
///
/// Succeeds only if every stage exits with status 0. A failing stage does
/// not cause its siblings to be killed; they see EOF or a broken pipe and
/// exit on their own, as in a shell. When several stages fail, the lowest
/// stage index is reported.
pub fn run_pipeline(pipeline: &Pipeline) -> Result<(), PipelineError> {
    if pipeline.stages.is_empty() {
        return Err(PipelineError::Empty);
    }

    // Resolve up front so a missing tool never leaves half a pipeline running.
    let programs = pipeline
        .stages
        .iter()
        .enumerate()
        .map(|(index, stage)| {
            which(&stage.program).map_err(|_| PipelineError::ExecutableNotFound {
                index,
                program: stage.program.clone(),
            })
        })
        .collect::<Result<Vec<PathBuf>, _>>()?;

    let mut final_stdout = Some(match &pipeline.last_stdout {
        LastStdout::Discard => Stdio::null(),
        LastStdout::Inherit => Stdio::inherit(),
        LastStdout::File(path) => {
            let file = File::create(path).map_err(|source| PipelineError::OutputFile {
                path: path.clone(),
                source,
            })?;
            Stdio::from(file)
        }
    });

    debug!(pipeline = %pipeline, "Starting pipeline");

    let last = pipeline.stages.len() - 1;
    let mut children: Vec<Child> = Vec::with_capacity(pipeline.stages.len());
    let mut upstream: Option<ChildStdout> = None;
    let mut spawn_error = None;

    for (index, (stage, program)) in pipeline.stages.iter().zip(&programs).enumerate() {
        let mut command = Command::new(program);
        command
            .args(&stage.args)
            .envs(&pipeline.extra_env)
            .envs(&stage.env)
            .stdin(upstream.take().map_or_else(Stdio::null, Stdio::from))
            .stderr(if pipeline.show_stderr {
                Stdio::inherit()
            } else {
                Stdio::null()
            })
            .stdout(if index < last {
                Stdio::piped()
            } else {
                final_stdout.take().unwrap_or_else(Stdio::null)
            });

        match command.spawn() {
            Ok(mut child) => {
                upstream = child.stdout.take();
                children.push(child);
            }
            Err(source) => {
                spawn_error = Some(PipelineError::Spawn {
                    index,
                    command: stage.to_string(),
                    source,
                });
                break;
            }
        }
        // `command` drops here, closing our copies of the pipe ends it held.
    }

    // Nothing downstream will read these any more.
    drop(upstream);
    drop(final_stdout);

    let mut failure = None;
    for (index, mut child) in children.into_iter().enumerate() {
        let stage = &pipeline.stages[index];
        match child.wait() {
            Ok(status) => {
                debug!(stage = index, program = %stage.program, code = ?status.code(), "Stage exited");
                if !status.success() && failure.is_none() {
                    failure = Some(PipelineError::StageFailed {
                        index,
                        command: stage.to_string(),
                        code: status.code(),
                    });
                }
            }
            Err(source) => {
                warn!(stage = index, program = %stage.program, error = %source, "Failed to wait on stage");
                if failure.is_none() {
                    failure = Some(PipelineError::Wait {
                        index,
                        command: stage.to_string(),
                        source,
                    });
                }
            }
        }
    }

    match spawn_error.or(failure) {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
