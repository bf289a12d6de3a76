//! External tool invocation.
//!
//! Every reconstruction step is a separate run of an external program. A
//! [`ToolInvocation`] describes one run; a [`ToolRunner`] executes it. The
//! pipeline only ever talks to the runner trait, so tests and dry runs can
//! swap the process launcher out.

mod dry_run;
mod process;

pub use dry_run::DryRunRunner;
pub use process::ProcessRunner;

use crate::error::PipelineError;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Path, PathBuf};

/// A single command line for an external program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub program: PathBuf,
    pub args: Vec<OsString>,
}

impl ToolInvocation {
    /// Start an invocation of `program subcommand`.
    pub fn new(program: impl Into<PathBuf>, subcommand: &str) -> Self {
        Self {
            program: program.into(),
            args: vec![OsString::from(subcommand)],
        }
    }

    /// Append a bare argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// Append `--name value`.
    pub fn opt(self, name: &str, value: impl AsRef<OsStr>) -> Self {
        self.arg(format!("--{name}")).arg(value)
    }

    /// Append `--name path`.
    pub fn path(self, name: &str, path: &Path) -> Self {
        self.opt(name, path.as_os_str())
    }

    /// Append `--name 1|0`, the form COLMAP expects for boolean options.
    pub fn flag(self, name: &str, value: bool) -> Self {
        self.opt(name, if value { "1" } else { "0" })
    }

    /// Append extra user supplied arguments verbatim.
    pub fn extend<I, S>(mut self, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(extra.into_iter().map(|s| s.as_ref().to_os_string()));
        self
    }

    /// The subcommand (first argument), if any.
    pub fn subcommand(&self) -> Option<&OsStr> {
        self.args.first().map(OsString::as_os_str)
    }

    /// Value following `--name`, if present.
    pub fn value_of(&self, name: &str) -> Option<&OsStr> {
        let key = format!("--{name}");
        self.args
            .iter()
            .position(|a| a.as_os_str() == OsStr::new(&key))
            .and_then(|i| self.args.get(i + 1))
            .map(OsString::as_os_str)
    }
}

impl fmt::Display for ToolInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            let arg = arg.to_string_lossy();
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " \"{arg}\"")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// How the child's standard streams are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Stream straight to the terminal; long stages report progress this way.
    Inherit,
    /// Collect stdout and stderr for parsing.
    Capture,
}

/// Result of a finished tool run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code; `None` when the process was terminated by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    /// A successful run with the given captured stdout.
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failure(code: i32) -> Self {
        Self {
            code: Some(code),
            ..Default::default()
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == Some(0)
    }

    /// Stdout followed by stderr. COLMAP logs through glog, which writes to stderr.
    pub fn combined(&self) -> String {
        let mut text = String::with_capacity(self.stdout.len() + self.stderr.len() + 1);
        text.push_str(&self.stdout);
        if !text.is_empty() && !text.ends_with('\n') {
            text.push('\n');
        }
        text.push_str(&self.stderr);
        text
    }
}

/// Executes tool invocations.
pub trait ToolRunner {
    /// Run the invocation to completion. A non-zero exit is not an error here.
    fn run(&self, invocation: &ToolInvocation, mode: OutputMode) -> Result<ToolOutput, PipelineError>;

    /// Run the invocation and turn a non-zero exit into [`PipelineError::ToolFailed`].
    fn run_checked(&self, invocation: &ToolInvocation, mode: OutputMode) -> Result<ToolOutput, PipelineError> {
        let output = self.run(invocation, mode)?;
        if output.is_success() {
            Ok(output)
        } else {
            tracing::error!("Command failed ({:?}): {}", output.code, invocation);
            Err(PipelineError::ToolFailed {
                command: invocation.to_string(),
                code: output.code,
            })
        }
    }
}

impl<R: ToolRunner + ?Sized> ToolRunner for &R {
    fn run(&self, invocation: &ToolInvocation, mode: OutputMode) -> Result<ToolOutput, PipelineError> {
        (**self).run(invocation, mode)
    }
}

impl<R: ToolRunner + ?Sized> ToolRunner for Box<R> {
    fn run(&self, invocation: &ToolInvocation, mode: OutputMode) -> Result<ToolOutput, PipelineError> {
        (**self).run(invocation, mode)
    }
}
