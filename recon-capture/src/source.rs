//! Common capture source types and traits.

use image::{ImageBuffer, Luma, RgbImage};
use thiserror::Error;

/// 16-bit depth image in millimeters.
pub type DepthImage = ImageBuffer<Luma<u16>, Vec<u16>>;

/// Errors that can occur during capture.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Failed to open device: {0}")]
    OpenFailed(String),

    #[error("Failed to capture frame: {0}")]
    CaptureFailed(String),

    #[error("Invalid capture interval: {0} seconds")]
    InvalidInterval(f64),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Data error: {0}")]
    Data(#[from] recon_data::DataError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Raw frame data from a capture source.
#[derive(Debug, Clone)]
pub struct FrameData {
    /// RGB image data.
    pub image: RgbImage,
    /// Depth aligned to `image`, when the source measures it.
    pub depth: Option<DepthImage>,
    /// Frame timestamp in seconds (relative to stream start).
    pub timestamp: f64,
    /// Frame number.
    pub frame_number: u64,
}

impl FrameData {
    /// Create a color-only frame.
    pub fn new(image: RgbImage, timestamp: f64, frame_number: u64) -> Self {
        Self {
            image,
            depth: None,
            timestamp,
            frame_number,
        }
    }

    /// Attach a depth image.
    pub fn with_depth(mut self, depth: DepthImage) -> Self {
        self.depth = Some(depth);
        self
    }

    /// Get image dimensions (width, height).
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

/// Trait for capture sources that provide video frames.
pub trait CaptureSource {
    /// Get the next frame from the source. `None` once the source is exhausted.
    fn next_frame(&mut self) -> Result<Option<FrameData>, CaptureError>;

    /// Get the frame rate, if known.
    fn frame_rate(&self) -> Option<f32>;

    /// Get the resolution (width, height).
    fn resolution(&self) -> (u32, u32);

    /// Check if the source is still active.
    fn is_active(&self) -> bool;

    /// Stop capturing.
    fn stop(&mut self);
}
