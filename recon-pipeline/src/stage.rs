//! Pipeline stages and their order.

use crate::error::PipelineError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One step of the reconstruction pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    FeatureExtraction,
    Matching,
    Mapping,
    ModelSelection,
    Undistortion,
    Stereo,
    Fusion,
    Meshing,
}

impl Stage {
    pub const ALL: [Stage; 8] = [
        Stage::FeatureExtraction,
        Stage::Matching,
        Stage::Mapping,
        Stage::ModelSelection,
        Stage::Undistortion,
        Stage::Stereo,
        Stage::Fusion,
        Stage::Meshing,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Stage::FeatureExtraction => "feature_extraction",
            Stage::Matching => "matching",
            Stage::Mapping => "mapping",
            Stage::ModelSelection => "model_selection",
            Stage::Undistortion => "undistortion",
            Stage::Stereo => "stereo",
            Stage::Fusion => "fusion",
            Stage::Meshing => "meshing",
        }
    }

    /// Stages that belong to the dense half of the pipeline.
    pub fn is_dense(self) -> bool {
        self >= Stage::Undistortion
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Stage {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        let stage = match normalized.as_str() {
            "feature_extraction" | "features" | "extract" => Stage::FeatureExtraction,
            "matching" | "match" => Stage::Matching,
            "mapping" | "mapper" | "sparse" => Stage::Mapping,
            "model_selection" | "select" => Stage::ModelSelection,
            "undistortion" | "undistort" => Stage::Undistortion,
            "stereo" | "patch_match" => Stage::Stereo,
            "fusion" | "fuse" => Stage::Fusion,
            "meshing" | "mesh" => Stage::Meshing,
            _ => return Err(PipelineError::UnknownStage(s.to_string())),
        };
        Ok(stage)
    }
}

/// Inclusive range of stages to execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageRange {
    pub from: Stage,
    pub to: Stage,
}

impl StageRange {
    pub fn new(from: Stage, to: Stage) -> Result<Self, PipelineError> {
        if from > to {
            return Err(PipelineError::InvalidConfig(format!(
                "stage range starts at {from} but ends at {to}"
            )));
        }
        Ok(Self { from, to })
    }

    /// Only the sparse half: extraction through model selection.
    pub fn sparse() -> Self {
        Self {
            from: Stage::FeatureExtraction,
            to: Stage::ModelSelection,
        }
    }

    pub fn contains(&self, stage: Stage) -> bool {
        self.from <= stage && stage <= self.to
    }

    pub fn stages(&self) -> impl Iterator<Item = Stage> + '_ {
        Stage::ALL.into_iter().filter(|s| self.contains(*s))
    }
}

impl Default for StageRange {
    fn default() -> Self {
        Self {
            from: Stage::FeatureExtraction,
            to: Stage::Meshing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_aliases() {
        assert_eq!("features".parse::<Stage>().unwrap(), Stage::FeatureExtraction);
        assert_eq!("patch-match".parse::<Stage>().unwrap(), Stage::Stereo);
        assert_eq!("Meshing".parse::<Stage>().unwrap(), Stage::Meshing);
        assert!("bundle".parse::<Stage>().is_err());
    }

    #[test]
    fn test_range() {
        let range = StageRange::new(Stage::Undistortion, Stage::Fusion).unwrap();
        let stages: Vec<_> = range.stages().collect();
        assert_eq!(stages, vec![Stage::Undistortion, Stage::Stereo, Stage::Fusion]);
        assert!(!range.contains(Stage::Mapping));

        assert!(StageRange::new(Stage::Meshing, Stage::Mapping).is_err());
        assert_eq!(StageRange::default().stages().count(), Stage::ALL.len());
    }

    #[test]
    fn test_dense_split() {
        assert!(!Stage::ModelSelection.is_dense());
        assert!(Stage::Undistortion.is_dense());
        assert!(StageRange::sparse().stages().all(|s| !s.is_dense()));
    }
}
