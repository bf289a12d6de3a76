//! Layout of the dense workspace produced by undistortion, stereo and meshing.

use crate::error::DataError;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Name of the dense workspace directory inside a project.
pub const DENSE_DIR: &str = "dense";

/// The dense artifacts a full pipeline run leaves behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DenseModelKind {
    /// Fused point cloud from stereo fusion.
    Fused,
    /// Screened Poisson surface.
    Poisson,
    /// Delaunay-based surface.
    Delaunay,
}

impl DenseModelKind {
    pub const ALL: [DenseModelKind; 3] = [Self::Fused, Self::Poisson, Self::Delaunay];

    pub fn file_name(self) -> &'static str {
        match self {
            Self::Fused => "fused.ply",
            Self::Poisson => "meshed-poisson.ply",
            Self::Delaunay => "meshed-delaunay.ply",
        }
    }

    /// Path of this artifact inside a dense workspace directory.
    pub fn path_in_dense(self, dense_dir: &Path) -> PathBuf {
        dense_dir.join(self.file_name())
    }

    /// Path of this artifact inside a project directory.
    pub fn path_in(self, project: &Path) -> PathBuf {
        self.path_in_dense(&project.join(DENSE_DIR))
    }

    /// Whether the artifact is a triangle mesh rather than a point cloud.
    pub fn is_mesh(self) -> bool {
        !matches!(self, Self::Fused)
    }
}

impl FromStr for DenseModelKind {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "f" | "fused" => Ok(Self::Fused),
            "p" | "poisson" => Ok(Self::Poisson),
            "d" | "delaunay" => Ok(Self::Delaunay),
            _ => Err(DataError::UnknownModelKind(s.to_string())),
        }
    }
}

impl fmt::Display for DenseModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Fused => "fused point cloud",
            Self::Poisson => "Poisson mesh",
            Self::Delaunay => "Delaunay mesh",
        };
        f.write_str(name)
    }
}
