//! Runs invocations as child processes.

use super::{OutputMode, ToolInvocation, ToolOutput, ToolRunner};
use crate::error::PipelineError;
use std::process::{Command, Stdio};
use tracing::{debug, info};

/// Launches the real program and waits for it to exit.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

impl ToolRunner for ProcessRunner {
    fn run(&self, invocation: &ToolInvocation, mode: OutputMode) -> Result<ToolOutput, PipelineError> {
        info!("$ {}", invocation);

        let mut command = Command::new(&invocation.program);
        command.args(&invocation.args).stdin(Stdio::null());

        let spawn_error = |source| PipelineError::Spawn {
            command: invocation.to_string(),
            source,
        };

        let output = match mode {
            OutputMode::Inherit => {
                let status = command.status().map_err(spawn_error)?;
                ToolOutput {
                    code: status.code(),
                    ..Default::default()
                }
            }
            OutputMode::Capture => {
                let output = command.output().map_err(spawn_error)?;
                ToolOutput {
                    code: output.status.code(),
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                }
            }
        };

        debug!("{:?} exited with {:?}", invocation.subcommand(), output.code);
        Ok(output)
    }
}
