//! Recon Pipeline Crate
//!
//! Drives an external COLMAP installation through a complete reconstruction:
//! feature extraction, matching, sparse mapping, selection of the best sparse
//! model, undistortion, patch-match stereo, fusion and meshing. All heavy
//! lifting happens inside COLMAP; this crate builds the command lines, runs
//! them one after another, and stops at the first failure.
//!
//! ## Modules
//!
//! - [`tool`]: running external programs ([`ToolRunner`], [`ProcessRunner`])
//! - [`config`]: JSON-backed [`PipelineConfig`]
//! - [`commands`]: COLMAP command lines per stage
//! - [`analyzer`] / [`select`]: sparse model analysis and best-model choice
//! - [`pipeline`]: stage sequencing
//! - [`database`]: keypoint and match statistics from the feature database
//! - [`download`]: dataset subsets from the Hugging Face hub

pub mod analyzer;
pub mod commands;
pub mod config;
pub mod database;
pub mod download;
mod error;
pub mod layout;
pub mod pipeline;
pub mod select;
pub mod stage;
pub mod tool;

pub use analyzer::{ModelStats, parse_model_stats};
pub use config::PipelineConfig;
pub use database::{DatabaseStats, ImageFeatureStats, read_database_stats};
pub use error::PipelineError;
pub use layout::ProjectLayout;
pub use pipeline::{Pipeline, PipelineReport, SelectedModel};
pub use select::{ModelCandidate, select_best, select_best_model};
pub use stage::{Stage, StageRange};
pub use tool::{DryRunRunner, ProcessRunner, ToolRunner};
