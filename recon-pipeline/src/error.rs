//! Error types for pipeline operations.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while sequencing the external tool.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Failed to launch `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with {}", exit_description(.code))]
    ToolFailed { command: String, code: Option<i32> },

    #[error("No sparse model with a registered image count found under {}", .sparse_root.display())]
    NoModel { sparse_root: PathBuf },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Config file error: {0}")]
    ConfigFormat(#[from] serde_json::Error),

    #[error("Unknown stage: {0}")]
    UnknownStage(String),

    #[error("Feature database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Data error: {0}")]
    Data(#[from] recon_data::DataError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn exit_description(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "no exit code (terminated by signal)".to_string(),
    }
}
