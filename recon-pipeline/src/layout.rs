//! Where each stage reads and writes inside a project directory.

use crate::config::PipelineConfig;
use recon_data::DenseModelKind;
use recon_data::dense::DENSE_DIR;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Resolved paths of a reconstruction project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    pub project: PathBuf,
    pub images: PathBuf,
    pub database: PathBuf,
    /// Parent of the numbered sparse models written by the mapper.
    pub sparse: PathBuf,
    /// Undistorted dense workspace.
    pub dense: PathBuf,
}

impl ProjectLayout {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            project: config.project.clone(),
            images: config.image_dir(),
            database: config.database(),
            sparse: config.project.join("sparse"),
            dense: config.project.join(DENSE_DIR),
        }
    }

    pub fn dense_model(&self, kind: DenseModelKind) -> PathBuf {
        kind.path_in_dense(&self.dense)
    }

    pub fn fused(&self) -> PathBuf {
        self.dense_model(DenseModelKind::Fused)
    }

    /// Create the output directories the stages expect to exist.
    pub fn create_dirs(&self) -> std::io::Result<()> {
        for dir in [&self.project, &self.sparse, &self.dense] {
            ensure_dir(dir)?;
        }
        if let Some(parent) = self.database.parent().filter(|p| !p.as_os_str().is_empty()) {
            ensure_dir(parent)?;
        }
        Ok(())
    }
}

fn ensure_dir(dir: &Path) -> std::io::Result<()> {
    if !dir.is_dir() {
        debug!("Creating {}", dir.display());
    }
    fs::create_dir_all(dir)
}
