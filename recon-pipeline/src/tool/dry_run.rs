//! Prints invocations instead of running them.

use super::{OutputMode, ToolInvocation, ToolOutput, ToolRunner};
use crate::error::PipelineError;
use tracing::info;

/// Logs each command line and reports success without launching anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunRunner;

impl ToolRunner for DryRunRunner {
    fn run(&self, invocation: &ToolInvocation, _mode: OutputMode) -> Result<ToolOutput, PipelineError> {
        info!("[dry-run] {}", invocation);
        Ok(ToolOutput::success(""))
    }
}
