//! Sequential execution of the reconstruction stages.

use crate::commands::CommandBuilder;
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::layout::ProjectLayout;
use crate::select::{ModelCandidate, select_best_model};
use crate::stage::{Stage, StageRange};
use crate::tool::{OutputMode, ToolInvocation, ToolRunner};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// The sparse model dense reconstruction starts from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectedModel {
    /// Chosen by analyzing the mapper outputs.
    Analyzed(ModelCandidate),
    /// Given explicitly by the caller.
    Explicit(PathBuf),
}

impl SelectedModel {
    pub fn path(&self) -> &std::path::Path {
        match self {
            SelectedModel::Analyzed(candidate) => &candidate.path,
            SelectedModel::Explicit(path) => path,
        }
    }
}

/// One executed stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageRecord {
    pub stage: Stage,
    pub elapsed: Duration,
}

/// What a pipeline run did and produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineReport {
    pub stages: Vec<StageRecord>,
    pub model: Option<SelectedModel>,
    /// Dense outputs written by fusion and meshing.
    pub artifacts: Vec<PathBuf>,
}

impl PipelineReport {
    pub fn ran(&self, stage: Stage) -> bool {
        self.stages.iter().any(|r| r.stage == stage)
    }

    pub fn total_elapsed(&self) -> Duration {
        self.stages.iter().map(|r| r.elapsed).sum()
    }
}

/// Runs the external tool stage by stage, stopping at the first failure.
pub struct Pipeline<R: ToolRunner> {
    config: PipelineConfig,
    layout: ProjectLayout,
    runner: R,
    range: StageRange,
    model: Option<PathBuf>,
}

impl<R: ToolRunner> Pipeline<R> {
    /// Validate `config` and prepare a full run.
    pub fn new(config: PipelineConfig, runner: R) -> Result<Self, PipelineError> {
        config.validate()?;
        let layout = ProjectLayout::from_config(&config);
        Ok(Self {
            config,
            layout,
            runner,
            range: StageRange::default(),
            model: None,
        })
    }

    /// Restrict the run to a stage range.
    pub fn with_range(mut self, range: StageRange) -> Self {
        self.range = range;
        self
    }

    /// Use this sparse model instead of selecting one.
    pub fn with_model(mut self, model: impl Into<PathBuf>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn layout(&self) -> &ProjectLayout {
        &self.layout
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    #[tracing::instrument(skip_all, fields(project = %self.layout.project.display()))]
    pub fn run(&self) -> Result<PipelineReport, PipelineError> {
        info!(
            "Running stages {} to {} with {}",
            self.range.from,
            self.range.to,
            self.config.colmap.display()
        );

        if self.config.dry_run {
            info!("[dry-run] skipping directory creation");
        } else {
            self.layout.create_dirs()?;
        }

        let mut report = PipelineReport {
            model: self.model.clone().map(SelectedModel::Explicit),
            ..Default::default()
        };

        for stage in self.range.stages() {
            if stage == Stage::ModelSelection && self.model.is_some() {
                info!("Using given sparse model, skipping selection");
                continue;
            }

            let started = Instant::now();
            info!("Stage {} started", stage);
            self.run_stage(stage, &mut report)?;
            let elapsed = started.elapsed();
            info!("Stage {} finished in {:.1?}", stage, elapsed);
            report.stages.push(StageRecord { stage, elapsed });
        }

        info!(
            "Pipeline finished: {} stages in {:.1?}",
            report.stages.len(),
            report.total_elapsed()
        );
        Ok(report)
    }

    fn run_stage(&self, stage: Stage, report: &mut PipelineReport) -> Result<(), PipelineError> {
        let commands = CommandBuilder::new(&self.config, &self.layout);
        match stage {
            Stage::FeatureExtraction => self.exec(&commands.feature_extractor()),
            Stage::Matching => self.exec(&commands.matcher()),
            Stage::Mapping => self.exec(&commands.mapper()),
            Stage::ModelSelection => {
                report.model = Some(self.select_model(&commands)?);
                Ok(())
            }
            Stage::Undistortion => {
                let model = match &report.model {
                    Some(model) => model.path().to_path_buf(),
                    None => {
                        let model = self.select_model(&commands)?;
                        let path = model.path().to_path_buf();
                        report.model = Some(model);
                        path
                    }
                };
                self.exec(&commands.image_undistorter(&model))
            }
            Stage::Stereo => self.exec(&commands.patch_match_stereo()),
            Stage::Fusion => {
                self.exec(&commands.stereo_fusion())?;
                report.artifacts.push(self.layout.fused());
                Ok(())
            }
            Stage::Meshing => {
                let meshers = commands.meshers();
                if meshers.is_empty() {
                    warn!("Meshing requested but no mesher is enabled");
                }
                for mesher in meshers {
                    self.exec(&mesher)?;
                    if let Some(output) = mesher.value_of("output_path") {
                        report.artifacts.push(PathBuf::from(output));
                    }
                }
                Ok(())
            }
        }
    }

    fn select_model(&self, commands: &CommandBuilder<'_>) -> Result<SelectedModel, PipelineError> {
        if self.config.dry_run {
            let placeholder = self.layout.sparse.join("0");
            info!("[dry-run] assuming sparse model {}", placeholder.display());
            return Ok(SelectedModel::Explicit(placeholder));
        }
        select_best_model(&self.runner, commands, &self.layout.sparse).map(SelectedModel::Analyzed)
    }

    fn exec(&self, invocation: &ToolInvocation) -> Result<(), PipelineError> {
        self.runner.run_checked(invocation, OutputMode::Inherit)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MesherKind;
    use crate::tool::testing::ScriptedRunner;
    use crate::tool::{DryRunRunner, ToolOutput};
    use std::fs;

    fn project() -> (tempfile::TempDir, PipelineConfig) {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("images")).unwrap();
        let config = PipelineConfig::for_project(dir.path());
        (dir, config)
    }

    /// Mapper creates two models; the analyzer reports more images for `1`.
    fn mapping_runner() -> ScriptedRunner {
        ScriptedRunner::new(|inv| {
            let sub = inv.subcommand().unwrap().to_string_lossy().into_owned();
            match sub.as_str() {
                "mapper" => {
                    let out = PathBuf::from(inv.value_of("output_path").unwrap());
                    fs::create_dir_all(out.join("0")).unwrap();
                    fs::create_dir_all(out.join("1")).unwrap();
                    ToolOutput::success("")
                }
                "model_analyzer" => {
                    let path = inv.value_of("path").unwrap().to_string_lossy().into_owned();
                    if path.ends_with('1') {
                        ToolOutput::success("Registered images: 40\nPoints: 9000\n")
                    } else {
                        ToolOutput::success("Registered images: 12\nPoints: 20000\n")
                    }
                }
                _ => ToolOutput::success(""),
            }
        })
    }

    #[test]
    fn test_full_run_order_and_selection() {
        let (dir, config) = project();
        let runner = mapping_runner();
        let pipeline = Pipeline::new(config, &runner).unwrap();

        let report = pipeline.run().unwrap();

        assert_eq!(
            runner.subcommands(),
            [
                "feature_extractor",
                "exhaustive_matcher",
                "mapper",
                "model_analyzer",
                "model_analyzer",
                "image_undistorter",
                "patch_match_stereo",
                "stereo_fusion",
                "poisson_mesher",
                "delaunay_mesher",
            ]
        );

        let model = report.model.as_ref().unwrap();
        assert_eq!(model.path(), dir.path().join("sparse/1"));

        let calls = runner.calls.borrow();
        let undistort = &calls[5];
        assert_eq!(
            undistort.value_of("input_path").map(PathBuf::from),
            Some(dir.path().join("sparse/1"))
        );

        assert_eq!(report.stages.len(), Stage::ALL.len());
        assert_eq!(
            report.artifacts,
            vec![
                dir.path().join("dense/fused.ply"),
                dir.path().join("dense/meshed-poisson.ply"),
                dir.path().join("dense/meshed-delaunay.ply"),
            ]
        );
        assert!(dir.path().join("dense").is_dir());
    }

    #[test]
    fn test_first_failure_aborts() {
        let (_dir, config) = project();
        let runner = ScriptedRunner::new(|inv| {
            if inv.subcommand().is_some_and(|s| s == "exhaustive_matcher") {
                ToolOutput::failure(1)
            } else {
                ToolOutput::success("")
            }
        });

        let err = Pipeline::new(config, &runner).unwrap().run().unwrap_err();
        assert!(matches!(err, PipelineError::ToolFailed { code: Some(1), .. }));
        assert_eq!(runner.subcommands(), ["feature_extractor", "exhaustive_matcher"]);
    }

    #[test]
    fn test_no_model_stops_before_dense() {
        let (_dir, config) = project();
        let runner = ScriptedRunner::succeeding();

        let err = Pipeline::new(config, &runner).unwrap().run().unwrap_err();
        assert!(matches!(err, PipelineError::NoModel { .. }));
        assert!(!runner.subcommands().iter().any(|s| s == "image_undistorter"));
    }

    #[test]
    fn test_dense_only_with_explicit_model() {
        let (dir, mut config) = project();
        config.dense.mesher = MesherKind::Poisson;
        let runner = ScriptedRunner::succeeding();
        let range = StageRange::new(Stage::Undistortion, Stage::Meshing).unwrap();
        let model = dir.path().join("sparse/3");

        let report = Pipeline::new(config, &runner)
            .unwrap()
            .with_range(range)
            .with_model(&model)
            .run()
            .unwrap();

        assert_eq!(
            runner.subcommands(),
            ["image_undistorter", "patch_match_stereo", "stereo_fusion", "poisson_mesher"]
        );
        assert_eq!(report.model, Some(SelectedModel::Explicit(model)));
        assert!(!report.ran(Stage::ModelSelection));
    }

    #[test]
    fn test_dense_only_selects_model() {
        let (dir, config) = project();
        fs::create_dir_all(dir.path().join("sparse/0")).unwrap();
        fs::create_dir_all(dir.path().join("sparse/1")).unwrap();
        let runner = mapping_runner();
        let range = StageRange::new(Stage::Undistortion, Stage::Undistortion).unwrap();

        let report = Pipeline::new(config, &runner).unwrap().with_range(range).run().unwrap();

        assert_eq!(
            runner.subcommands(),
            ["model_analyzer", "model_analyzer", "image_undistorter"]
        );
        assert_eq!(report.model.unwrap().path(), dir.path().join("sparse/1"));
    }

    #[test]
    fn test_sparse_range_stops_after_selection() {
        let (_dir, config) = project();
        let runner = mapping_runner();

        let report = Pipeline::new(config, &runner)
            .unwrap()
            .with_range(StageRange::sparse())
            .run()
            .unwrap();

        assert!(report.ran(Stage::ModelSelection));
        assert!(report.artifacts.is_empty());
        assert_eq!(runner.subcommands().last().map(String::as_str), Some("model_analyzer"));
    }

    #[test]
    fn test_dry_run_touches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = PipelineConfig::for_project(dir.path().join("proj"));
        config.dry_run = true;

        let report = Pipeline::new(config, DryRunRunner).unwrap().run().unwrap();

        assert_eq!(report.stages.len(), Stage::ALL.len());
        assert_eq!(
            report.model.unwrap().path(),
            dir.path().join("proj/sparse/0")
        );
        assert!(!dir.path().join("proj").exists());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig::for_project(dir.path());
        assert!(matches!(
            Pipeline::new(config, ScriptedRunner::succeeding()),
            Err(PipelineError::InvalidConfig(_))
        ));
    }
}
