//! Picking the best sparse model among the mapper's outputs.
//!
//! The mapper can split a scene into several disconnected models
//! (`sparse/0`, `sparse/1`, ...). Dense reconstruction continues from the one
//! that registered the most images.

use crate::analyzer::{ModelStats, analyze_model};
use crate::commands::CommandBuilder;
use crate::error::PipelineError;
use crate::tool::ToolRunner;
use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// A sparse model directory with its analyzed counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelCandidate {
    pub path: PathBuf,
    pub stats: ModelStats,
}

/// Order directory names numerically when both are integers, numeric names first.
fn compare_model_names(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

/// Immediate subdirectories of `sparse_root` in scan order.
///
/// A missing root yields an empty list.
pub fn list_candidate_dirs(sparse_root: &Path) -> Result<Vec<PathBuf>, PipelineError> {
    if !sparse_root.is_dir() {
        warn!("Sparse root {} does not exist", sparse_root.display());
        return Ok(Vec::new());
    }

    let mut dirs: Vec<(String, PathBuf)> = Vec::new();
    for entry in fs::read_dir(sparse_root)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            dirs.push((entry.file_name().to_string_lossy().into_owned(), entry.path()));
        }
    }
    dirs.sort_by(|(a, _), (b, _)| compare_model_names(a, b));
    Ok(dirs.into_iter().map(|(_, path)| path).collect())
}

/// Running-maximum scan over analyzed candidates.
///
/// A candidate replaces the current best only with a strictly greater
/// registered image count, so ties keep the earlier one. Entries without
/// stats are ignored.
pub fn select_best<I>(candidates: I) -> Option<ModelCandidate>
where
    I: IntoIterator<Item = (PathBuf, Option<ModelStats>)>,
{
    let mut best: Option<ModelCandidate> = None;
    for (path, stats) in candidates {
        let Some(stats) = stats else { continue };
        let better = best
            .as_ref()
            .is_none_or(|b| stats.registered_images > b.stats.registered_images);
        if better {
            best = Some(ModelCandidate { path, stats });
        }
    }
    best
}

/// Analyze every model under `sparse_root` and return the best one.
#[tracing::instrument(skip_all, fields(sparse_root = %sparse_root.display()))]
pub fn select_best_model<R: ToolRunner>(
    runner: &R,
    commands: &CommandBuilder<'_>,
    sparse_root: &Path,
) -> Result<ModelCandidate, PipelineError> {
    let dirs = list_candidate_dirs(sparse_root)?;
    info!("Analyzing {} candidate sparse models", dirs.len());

    let mut analyzed = Vec::with_capacity(dirs.len());
    for dir in dirs {
        let stats = analyze_model(runner, commands, &dir)?;
        analyzed.push((dir, stats));
    }

    let best = select_best(analyzed).ok_or_else(|| PipelineError::NoModel {
        sparse_root: sparse_root.to_path_buf(),
    })?;
    info!(
        "Best model: {} ({} registered images, {} points)",
        best.path.display(),
        best.stats.registered_images,
        best.stats.points
    );
    Ok(best)
}
