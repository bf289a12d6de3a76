//! Capture loop deciding which frames make it into the dataset.

use crate::dataset::{DatasetWriter, SavedFrame};
use crate::source::{CaptureError, CaptureSource};
use std::time::{Duration, Instant};
use tracing::info;

/// When frames are saved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CaptureMode {
    /// Save whenever `interval` has elapsed since the previous save.
    Automatic { interval: Duration },
    /// Save only when the trigger asks for it.
    Manual,
}

impl CaptureMode {
    /// Automatic mode with an interval in seconds. Negative, NaN and
    /// unrepresentable intervals are rejected.
    pub fn automatic_secs(seconds: f64) -> Result<Self, CaptureError> {
        let interval =
            Duration::try_from_secs_f64(seconds).map_err(|_| CaptureError::InvalidInterval(seconds))?;
        Ok(CaptureMode::Automatic { interval })
    }
}

/// Operator input polled once per frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Idle,
    Capture,
    Quit,
}

/// Pulls frames from a source and saves the selected ones.
pub struct CaptureSession {
    writer: DatasetWriter,
    mode: CaptureMode,
    max_images: usize,
    saved: Vec<SavedFrame>,
}

impl CaptureSession {
    pub fn new(writer: DatasetWriter, mode: CaptureMode, max_images: usize) -> Self {
        Self {
            writer,
            mode,
            max_images,
            saved: Vec::new(),
        }
    }

    pub fn writer(&self) -> &DatasetWriter {
        &self.writer
    }

    pub fn saved(&self) -> &[SavedFrame] {
        &self.saved
    }

    /// Capture until `max_images` are saved, the trigger says quit, or the source ends.
    ///
    /// Returns the number of frames saved by this call.
    pub fn run<S, T>(&mut self, source: &mut S, mut trigger: T) -> Result<usize, CaptureError>
    where
        S: CaptureSource + ?Sized,
        T: FnMut() -> Trigger,
    {
        info!(
            "Capturing up to {} images ({:?}) to {}",
            self.max_images,
            self.mode,
            self.writer.root().display()
        );

        let start_count = self.saved.len();
        let mut last_save: Option<Instant> = None;

        while self.saved.len() < self.max_images {
            let action = trigger();
            if action == Trigger::Quit {
                info!("Capture stopped by user");
                break;
            }

            let Some(frame) = source.next_frame()? else {
                info!("Source exhausted");
                break;
            };

            let save = match self.mode {
                CaptureMode::Manual => action == Trigger::Capture,
                CaptureMode::Automatic { interval } => {
                    last_save.is_none_or(|t| t.elapsed() >= interval)
                }
            };
            if !save {
                continue;
            }

            let index = self.saved.len();
            let saved = self.writer.save(index, &frame)?;
            info!("[{}] Saved {}", index, saved.color.display());
            self.saved.push(saved);
            last_save = Some(Instant::now());
        }

        source.stop();
        Ok(self.saved.len() - start_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::FrameData;
    use image::RgbImage;

    /// Yields `remaining` blank frames.
    struct Synthetic {
        remaining: usize,
        produced: u64,
        stopped: bool,
    }

    impl Synthetic {
        fn new(frames: usize) -> Self {
            Self {
                remaining: frames,
                produced: 0,
                stopped: false,
            }
        }
    }

    impl CaptureSource for Synthetic {
        fn next_frame(&mut self) -> Result<Option<FrameData>, CaptureError> {
            if self.remaining == 0 {
                return Ok(None);
            }
            self.remaining -= 1;
            self.produced += 1;
            Ok(Some(FrameData::new(RgbImage::new(2, 2), 0.0, self.produced)))
        }

        fn frame_rate(&self) -> Option<f32> {
            None
        }

        fn resolution(&self) -> (u32, u32) {
            (2, 2)
        }

        fn is_active(&self) -> bool {
            self.remaining > 0
        }

        fn stop(&mut self) {
            self.stopped = true;
        }
    }

    fn session(dir: &std::path::Path, mode: CaptureMode, max: usize) -> CaptureSession {
        CaptureSession::new(DatasetWriter::create(dir).unwrap(), mode, max)
    }

    #[test]
    fn test_automatic_stops_at_max() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session(dir.path(), CaptureMode::automatic_secs(0.0).unwrap(), 3);
        let mut source = Synthetic::new(10);

        let saved = session.run(&mut source, || Trigger::Idle).unwrap();
        assert_eq!(saved, 3);
        assert_eq!(source.produced, 3);
        assert!(source.stopped);
        assert!(dir.path().join("color/color_002.png").is_file());
    }

    #[test]
    fn test_automatic_interval_skips_frames() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session(dir.path(), CaptureMode::automatic_secs(3600.0).unwrap(), 5);
        let mut source = Synthetic::new(4);

        let saved = session.run(&mut source, || Trigger::Idle).unwrap();
        assert_eq!(saved, 1);
        assert_eq!(source.produced, 4);
    }

    #[test]
    fn test_manual_trigger_and_quit() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session(dir.path(), CaptureMode::Manual, 10);
        let mut source = Synthetic::new(10);

        let mut script = vec![Trigger::Idle, Trigger::Capture, Trigger::Idle, Trigger::Capture, Trigger::Quit].into_iter();
        let saved = session
            .run(&mut source, || script.next().unwrap_or(Trigger::Quit))
            .unwrap();

        assert_eq!(saved, 2);
        assert_eq!(source.produced, 4);
        let names: Vec<_> = session
            .saved()
            .iter()
            .map(|s| s.color.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["color_000.png", "color_001.png"]);
    }

    #[test]
    fn test_interval_must_be_representable() {
        assert_eq!(
            CaptureMode::automatic_secs(1.5).unwrap(),
            CaptureMode::Automatic {
                interval: Duration::from_millis(1500)
            }
        );
        for bad in [f64::INFINITY, f64::NAN, -1.0, 1e30] {
            assert!(matches!(
                CaptureMode::automatic_secs(bad),
                Err(CaptureError::InvalidInterval(_))
            ));
        }
    }

    #[test]
    fn test_source_end() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session(dir.path(), CaptureMode::automatic_secs(0.0).unwrap(), 100);
        let mut source = Synthetic::new(2);

        assert_eq!(session.run(&mut source, || Trigger::Idle).unwrap(), 2);
    }
}
