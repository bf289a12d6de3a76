//! Recon Data Crate
//!
//! File-level data handling for reconstruction projects: PLY point clouds and
//! meshes, depth hint files, RGB-D back-projection and the layout of the dense
//! workspace produced by COLMAP.
//! This crate never launches external tools; it only reads and writes files.

pub mod dense;
pub mod depth_hint;
mod error;
pub mod ply;
pub mod rgbd;
pub mod types;

pub use dense::DenseModelKind;
pub use depth_hint::{DepthHint, convert_depth_dir};
pub use error::DataError;
pub use ply::{PlySummary, PlyVertex, load_vertices_from_ply, ply_has_faces, ply_summary, write_point_cloud_ply};
pub use rgbd::{BackprojectParams, backproject, backproject_files};
pub use types::{Bounds, Intrinsics, Point};
