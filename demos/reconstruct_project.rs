//! Reconstruct a project directory end to end.
//!
//! Expects `<project>/images`. Prints every COLMAP command when the second
//! argument is `--dry-run`.
//!
//! Usage:
//!   cargo run --example reconstruct_project -- <project_dir> [--dry-run]

use recon::data::{DenseModelKind, ply_summary};
use recon::pipeline::{DryRunRunner, Pipeline, PipelineConfig, ProcessRunner, ToolRunner};
use std::error::Error;
use std::path::PathBuf;
use tracing::info;

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let project = args
        .next()
        .map(PathBuf::from)
        .ok_or("Please provide a project directory")?;
    let dry_run = args.next().is_some_and(|a| a == "--dry-run");

    let mut config = PipelineConfig::for_project(&project);
    config.dry_run = dry_run;

    let runner: Box<dyn ToolRunner> = if dry_run {
        Box::new(DryRunRunner)
    } else {
        Box::new(ProcessRunner::new())
    };

    let report = Pipeline::new(config, runner)?.run()?;
    info!("Finished {} stages in {:.1?}", report.stages.len(), report.total_elapsed());

    if !dry_run {
        for kind in DenseModelKind::ALL {
            let path = kind.path_in(&project);
            if path.is_file() {
                let summary = ply_summary(&path)?;
                info!("{}: {} vertices, {} faces", kind, summary.vertex_count, summary.face_count);
            }
        }
    }
    Ok(())
}
