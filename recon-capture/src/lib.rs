//! Recon Capture - RGB-D dataset capture
//!
//! This crate fills the dataset layout the reconstruction pipeline consumes
//! (`color/`, `depth/`, `depth_hint/`) from a frame source:
//!
//! - Webcams (via nokhwa, requires `webcam` feature)
//! - Image sequences already on disk
//!
//! ## Example
//!
//! ```ignore
//! use recon_capture::{CaptureMode, CaptureSession, DatasetWriter, Trigger, WebcamCapture, unique_dir};
//!
//! let root = unique_dir("datasets/realsense_capture");
//! let writer = DatasetWriter::create(&root)?;
//! let mut camera = WebcamCapture::new(0)?;
//! let mut session = CaptureSession::new(writer, CaptureMode::automatic_secs(3.0)?, 100);
//! session.run(&mut camera, || Trigger::Idle)?;
//! ```

mod dataset;
mod mask;
mod sequence;
mod session;
mod source;

#[cfg(feature = "webcam")]
mod webcam;

pub use dataset::{DatasetWriter, SavedFrame, clip_depth, unique_dir};
pub use mask::{MaskParams, MaskedFrame, mask_frame, rgb_to_hsv};
pub use sequence::ImageSequence;
pub use session::{CaptureMode, CaptureSession, Trigger};
pub use source::{CaptureError, CaptureSource, DepthImage, FrameData};

#[cfg(feature = "webcam")]
pub use webcam::WebcamCapture;
