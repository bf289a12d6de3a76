//! Error type for the command-line front end.

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by `recon` subcommands.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Pipeline(#[from] recon_pipeline::PipelineError),

    #[error(transparent)]
    Data(#[from] recon_data::DataError),

    #[error(transparent)]
    Capture(#[from] recon_capture::CaptureError),

    #[error("File does not exist: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("{0}")]
    Usage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
