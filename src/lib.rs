//! Recon
//!
//! Orchestration of COLMAP-based 3D reconstruction, plus the dataset utilities
//! around it. The work is split across member crates, re-exported here:
//!
//! - [`data`]: PLY models, depth hints, RGB-D back-projection
//! - [`pipeline`]: external tool sequencing and sparse model selection
//! - [`capture`]: RGB-D dataset capture

pub use recon_capture as capture;
pub use recon_data as data;
pub use recon_pipeline as pipeline;
