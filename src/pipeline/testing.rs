//! Test double for code that drives a [`PipelineRunner`].

use super::{Pipeline, PipelineRunner};
use crate::errors::PipelineError;

/// Records every pipeline it is asked to run, and fails those that contain
/// the program named in `fail_on` with exit status 1.
#[derive(Debug, Default)]
pub struct RecordingRunner {
    pub runs: Vec<Pipeline>,
    pub fail_on: Option<&'static str>,
}

impl RecordingRunner {
    pub fn failing_on(program: &'static str) -> Self {
        Self {
            runs: Vec::new(),
            fail_on: Some(program),
        }
    }
}

impl PipelineRunner for RecordingRunner {
    fn run(&mut self, pipeline: &Pipeline) -> Result<(), PipelineError> {
        self.runs.push(pipeline.clone());
        let failing = self
            .fail_on
            .and_then(|program| pipeline.programs().iter().position(|p| *p == program));
        match failing {
            Some(index) => Err(PipelineError::StageFailed {
                index,
                command: pipeline.stages[index].to_string(),
                code: Some(1),
            }),
            None => Ok(()),
        }
    }
}
