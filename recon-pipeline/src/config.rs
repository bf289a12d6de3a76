//! Pipeline configuration.
//!
//! Every knob has a default, so a config file only needs the values that
//! differ. Files are JSON; missing fields fall back to [`Default`].

use crate::error::PipelineError;
use crate::stage::Stage;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Which COLMAP matcher pairs up images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatcherKind {
    /// Every image against every other image.
    Exhaustive,
    /// Neighbors in capture order, for video-like sequences.
    Sequential,
}

impl MatcherKind {
    pub fn subcommand(self) -> &'static str {
        match self {
            MatcherKind::Exhaustive => "exhaustive_matcher",
            MatcherKind::Sequential => "sequential_matcher",
        }
    }
}

/// Which depth maps stereo fusion reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FusionInput {
    Geometric,
    Photometric,
}

impl FusionInput {
    pub fn as_str(self) -> &'static str {
        match self {
            FusionInput::Geometric => "geometric",
            FusionInput::Photometric => "photometric",
        }
    }
}

/// Which surface meshers run after fusion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MesherKind {
    None,
    Poisson,
    Delaunay,
    Both,
}

impl MesherKind {
    pub fn poisson(self) -> bool {
        matches!(self, MesherKind::Poisson | MesherKind::Both)
    }

    pub fn delaunay(self) -> bool {
        matches!(self, MesherKind::Delaunay | MesherKind::Both)
    }
}

/// Feature extraction settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    pub camera_model: String,
    pub single_camera: bool,
    /// Cap on SIFT features per image.
    pub max_num_features: u32,
    /// Images are downscaled so the longer side is at most this many pixels.
    pub max_image_size: u32,
    pub use_gpu: bool,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            camera_model: "SIMPLE_RADIAL".to_string(),
            single_camera: true,
            max_num_features: 8192,
            max_image_size: 3200,
            use_gpu: true,
        }
    }
}

/// Feature matching settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    pub matcher: MatcherKind,
    /// Lowe ratio test threshold.
    pub max_ratio: f32,
    pub max_distance: f32,
    pub guided_matching: bool,
    pub use_gpu: bool,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            matcher: MatcherKind::Exhaustive,
            max_ratio: 0.8,
            max_distance: 0.7,
            guided_matching: false,
            use_gpu: true,
        }
    }
}

/// Incremental mapper settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapperConfig {
    pub min_num_matches: u32,
    pub ba_global_max_num_iterations: Option<u32>,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            min_num_matches: 15,
            ba_global_max_num_iterations: None,
        }
    }
}

/// Undistortion, stereo, fusion and meshing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DenseConfig {
    /// Image size cap for undistortion and patch-match stereo.
    pub max_image_size: u32,
    pub geom_consistency: bool,
    pub fusion_input: FusionInput,
    pub mesher: MesherKind,
    /// Directory of per-image depth hints handed to patch-match stereo.
    pub depth_hint_dir: Option<PathBuf>,
    /// Option name under which the depth hint directory is passed.
    pub depth_hint_flag: String,
}

impl Default for DenseConfig {
    fn default() -> Self {
        Self {
            max_image_size: 2000,
            geom_consistency: true,
            fusion_input: FusionInput::Geometric,
            mesher: MesherKind::Both,
            depth_hint_dir: None,
            depth_hint_flag: "PatchMatchStereo.depth_hint_path".to_string(),
        }
    }
}

/// Complete configuration of a reconstruction run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Path to (or name on `PATH` of) the COLMAP executable.
    pub colmap: PathBuf,
    /// Project directory holding the database, sparse and dense outputs.
    pub project: PathBuf,
    /// Input images; defaults to `<project>/images`.
    pub image_dir: Option<PathBuf>,
    /// Feature database; defaults to `<project>/database.db`.
    pub database: Option<PathBuf>,
    pub features: FeatureConfig,
    pub matching: MatchingConfig,
    pub mapper: MapperConfig,
    pub dense: DenseConfig,
    /// Additional arguments appended to a stage's command line.
    pub extra_args: BTreeMap<Stage, Vec<String>>,
    /// Log commands instead of running them.
    pub dry_run: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            colmap: PathBuf::from("colmap"),
            project: PathBuf::from("."),
            image_dir: None,
            database: None,
            features: FeatureConfig::default(),
            matching: MatchingConfig::default(),
            mapper: MapperConfig::default(),
            dense: DenseConfig::default(),
            extra_args: BTreeMap::new(),
            dry_run: false,
        }
    }
}

impl PipelineConfig {
    /// Default configuration rooted at `project`.
    pub fn for_project(project: impl Into<PathBuf>) -> Self {
        Self {
            project: project.into(),
            ..Default::default()
        }
    }

    /// Load a JSON config file.
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        debug!("Loading pipeline config from {}", path.display());
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, PipelineError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn extra_args_for(&self, stage: Stage) -> &[String] {
        self.extra_args.get(&stage).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Check numeric ranges and, unless dry-running, that inputs exist.
    pub fn validate(&self) -> Result<(), PipelineError> {
        let invalid = |msg: String| Err(PipelineError::InvalidConfig(msg));

        if self.features.max_num_features == 0 {
            return invalid("features.max_num_features must be positive".into());
        }
        if self.features.max_image_size == 0 || self.dense.max_image_size == 0 {
            return invalid("max_image_size must be positive".into());
        }
        let ratio = self.matching.max_ratio;
        if !(ratio > 0.0 && ratio <= 1.0) {
            return invalid(format!("matching.max_ratio must be in (0, 1], got {ratio}"));
        }
        if self.matching.max_distance <= 0.0 {
            return invalid("matching.max_distance must be positive".into());
        }
        if self.features.camera_model.trim().is_empty() {
            return invalid("features.camera_model must not be empty".into());
        }

        if self.dry_run {
            return Ok(());
        }

        let images = self.image_dir();
        if !images.is_dir() {
            return invalid(format!("image directory {} does not exist", images.display()));
        }
        if let Some(hints) = &self.dense.depth_hint_dir {
            if !hints.is_dir() {
                return invalid(format!("depth hint directory {} does not exist", hints.display()));
            }
        }
        Ok(())
    }

    pub fn image_dir(&self) -> PathBuf {
        self.image_dir
            .clone()
            .unwrap_or_else(|| self.project.join("images"))
    }

    pub fn database(&self) -> PathBuf {
        self.database
            .clone()
            .unwrap_or_else(|| self.project.join("database.db"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recon.json");
        std::fs::write(
            &path,
            r#"{
                "colmap": "/opt/colmap/bin/colmap",
                "matching": { "matcher": "sequential" },
                "dense": { "mesher": "poisson" },
                "extra_args": { "mapping": ["--Mapper.num_threads", "4"] }
            }"#,
        )
        .unwrap();

        let config = PipelineConfig::load(&path).unwrap();
        assert_eq!(config.colmap, PathBuf::from("/opt/colmap/bin/colmap"));
        assert_eq!(config.matching.matcher, MatcherKind::Sequential);
        assert_eq!(config.matching.max_ratio, 0.8);
        assert_eq!(config.dense.mesher, MesherKind::Poisson);
        assert_eq!(config.features.max_num_features, 8192);
        assert_eq!(config.extra_args_for(Stage::Mapping), ["--Mapper.num_threads", "4"]);
        assert!(config.extra_args_for(Stage::Stereo).is_empty());
    }

    #[test]
    fn test_json_round_trip_of_defaults() {
        let config = PipelineConfig::for_project("/data/scan");
        let json = config.to_json_pretty().unwrap();
        let parsed: PipelineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_unknown_stage_key_rejected() {
        let err = serde_json::from_str::<PipelineConfig>(r#"{ "extra_args": { "bundle": [] } }"#);
        assert!(err.is_err());
    }

    #[test]
    fn test_derived_paths() {
        let config = PipelineConfig::for_project("/data/scan");
        assert_eq!(config.image_dir(), PathBuf::from("/data/scan/images"));
        assert_eq!(config.database(), PathBuf::from("/data/scan/database.db"));
    }

    #[test]
    fn test_validate() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = PipelineConfig::for_project(dir.path());
        assert!(matches!(config.validate(), Err(PipelineError::InvalidConfig(_))));

        std::fs::create_dir(dir.path().join("images")).unwrap();
        config.validate().unwrap();

        config.matching.max_ratio = 1.5;
        assert!(config.validate().is_err());
        config.matching.max_ratio = 0.7;

        config.dense.depth_hint_dir = Some(dir.path().join("depth_hint"));
        assert!(config.validate().is_err());
        config.dry_run = true;
        config.validate().unwrap();
    }

    #[test]
    fn test_mesher_flags() {
        assert!(MesherKind::Both.poisson() && MesherKind::Both.delaunay());
        assert!(!MesherKind::None.poisson() && !MesherKind::None.delaunay());
        assert!(MesherKind::Delaunay.delaunay() && !MesherKind::Delaunay.poisson());
    }
}
