//! Webcam capture using nokhwa.

use crate::source::{CaptureError, CaptureSource, FrameData};
use image::RgbImage;
use nokhwa::Camera;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Frame rate requested together with an explicit resolution.
const CAPTURE_FPS: u32 = 30;

fn open_failed(e: nokhwa::NokhwaError) -> CaptureError {
    CaptureError::OpenFailed(e.to_string())
}

fn capture_failed(e: nokhwa::NokhwaError) -> CaptureError {
    CaptureError::CaptureFailed(e.to_string())
}

/// Color-only dataset source. Saved frames get no depth and therefore no depth hint.
pub struct WebcamCapture {
    camera: Camera,
    opened_at: Instant,
    frames_read: u64,
    streaming: bool,
    resolution: (u32, u32),
}

impl WebcamCapture {
    /// Open webcam `index` at its highest resolution.
    pub fn new(index: u32) -> Result<Self, CaptureError> {
        info!("Opening webcam {}", index);
        Self::open(index, RequestedFormatType::AbsoluteHighestResolution)
    }

    /// Open webcam `index` at the format closest to `width`x`height` @ 30 fps,
    /// e.g. 1280x720 to line up with an RGB-D capture of the same scene.
    pub fn with_resolution(index: u32, width: u32, height: u32) -> Result<Self, CaptureError> {
        info!("Opening webcam {} at {}x{}", index, width, height);
        let format = CameraFormat::new(Resolution::new(width, height), FrameFormat::MJPEG, CAPTURE_FPS);
        let camera = Self::open(index, RequestedFormatType::Closest(format))?;
        if camera.resolution != (width, height) {
            warn!(
                "Requested {}x{}, device streams {}x{}",
                width, height, camera.resolution.0, camera.resolution.1
            );
        }
        Ok(camera)
    }

    fn open(index: u32, format: RequestedFormatType) -> Result<Self, CaptureError> {
        let mut camera =
            Camera::new(CameraIndex::Index(index), RequestedFormat::new::<RgbFormat>(format)).map_err(open_failed)?;
        camera.open_stream().map_err(open_failed)?;

        let granted = camera.camera_format();
        info!(
            "Webcam {} streaming {}x{} @ {} fps",
            index,
            granted.width(),
            granted.height(),
            granted.frame_rate()
        );

        Ok(Self {
            camera,
            opened_at: Instant::now(),
            frames_read: 0,
            streaming: true,
            resolution: (granted.width(), granted.height()),
        })
    }

    /// Device list as `index: name` lines.
    pub fn list_devices() -> Result<Vec<String>, CaptureError> {
        let devices =
            nokhwa::query(nokhwa::utils::ApiBackend::Auto).map_err(|e| CaptureError::DeviceNotFound(e.to_string()))?;
        Ok(devices
            .into_iter()
            .map(|info| format!("{}: {}", info.index(), info.human_name()))
            .collect())
    }

    /// Read and decode one frame from the open stream.
    fn grab(&mut self) -> Result<RgbImage, CaptureError> {
        let decoded = self
            .camera
            .frame()
            .map_err(capture_failed)?
            .decode_image::<RgbFormat>()
            .map_err(capture_failed)?;
        let (width, height) = decoded.dimensions();
        RgbImage::from_raw(width, height, decoded.into_raw())
            .ok_or_else(|| CaptureError::CaptureFailed(format!("decoded buffer is not {width}x{height} RGB")))
    }
}

impl CaptureSource for WebcamCapture {
    fn next_frame(&mut self) -> Result<Option<FrameData>, CaptureError> {
        if !self.streaming {
            return Ok(None);
        }

        let image = self.grab()?;
        self.frames_read += 1;
        let timestamp = self.opened_at.elapsed().as_secs_f64();
        debug!("Webcam frame {} at {:.3}s", self.frames_read, timestamp);

        Ok(Some(FrameData::new(image, timestamp, self.frames_read)))
    }

    fn frame_rate(&self) -> Option<f32> {
        Some(self.camera.frame_rate() as f32)
    }

    fn resolution(&self) -> (u32, u32) {
        self.resolution
    }

    fn is_active(&self) -> bool {
        self.streaming
    }

    fn stop(&mut self) {
        if !self.streaming {
            return;
        }
        self.streaming = false;
        if let Err(e) = self.camera.stop_stream() {
            warn!("Stopping webcam stream failed: {}", e);
        }
        info!("Webcam stopped after {} frames", self.frames_read);
    }
}

impl Drop for WebcamCapture {
    fn drop(&mut self) {
        self.stop();
    }
}
