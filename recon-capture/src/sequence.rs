//! Replays color (and optional depth) images from directories as a capture source.

use crate::source::{CaptureError, CaptureSource, FrameData};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

fn sorted_images(dir: &Path) -> Result<Vec<PathBuf>, CaptureError> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Frames read from sorted image files. Depth images pair with color by position.
pub struct ImageSequence {
    color: Vec<PathBuf>,
    depth: Vec<PathBuf>,
    next: usize,
    active: bool,
    resolution: (u32, u32),
}

impl ImageSequence {
    pub fn from_dir(color_dir: &Path, depth_dir: Option<&Path>) -> Result<Self, CaptureError> {
        let color = sorted_images(color_dir)?;
        let depth = match depth_dir {
            Some(dir) => sorted_images(dir)?,
            None => Vec::new(),
        };
        if !depth.is_empty() && depth.len() != color.len() {
            return Err(CaptureError::OpenFailed(format!(
                "{} color images but {} depth images",
                color.len(),
                depth.len()
            )));
        }

        let resolution = match color.first() {
            Some(first) => image::image_dimensions(first)?,
            None => (0, 0),
        };
        info!("Image sequence with {} frames from {}", color.len(), color_dir.display());

        Ok(Self {
            color,
            depth,
            next: 0,
            active: true,
            resolution,
        })
    }

    pub fn len(&self) -> usize {
        self.color.len()
    }

    pub fn is_empty(&self) -> bool {
        self.color.is_empty()
    }
}

impl CaptureSource for ImageSequence {
    fn next_frame(&mut self) -> Result<Option<FrameData>, CaptureError> {
        if !self.active || self.next >= self.color.len() {
            return Ok(None);
        }

        let index = self.next;
        self.next += 1;

        let image = image::open(&self.color[index])?.to_rgb8();
        let mut frame = FrameData::new(image, index as f64, index as u64);
        if let Some(depth_path) = self.depth.get(index) {
            frame = frame.with_depth(image::open(depth_path)?.to_luma16());
        }
        debug!("Read frame {} from {}", index, self.color[index].display());
        Ok(Some(frame))
    }

    fn frame_rate(&self) -> Option<f32> {
        None
    }

    fn resolution(&self) -> (u32, u32) {
        self.resolution
    }

    fn is_active(&self) -> bool {
        self.active && self.next < self.color.len()
    }

    fn stop(&mut self) {
        self.active = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::DepthImage;
    use image::{Luma, RgbImage};

    #[test]
    fn test_replays_pairs_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let color_dir = dir.path().join("color");
        let depth_dir = dir.path().join("depth");
        fs::create_dir_all(&color_dir).unwrap();
        fs::create_dir_all(&depth_dir).unwrap();
        for i in 0..3u16 {
            RgbImage::new(5, 4).save(color_dir.join(format!("color_{i:03}.png"))).unwrap();
            DepthImage::from_pixel(5, 4, Luma([i * 100]))
                .save(depth_dir.join(format!("depth_{i:03}.png")))
                .unwrap();
        }
        fs::write(color_dir.join("readme.txt"), "").unwrap();

        let mut seq = ImageSequence::from_dir(&color_dir, Some(&depth_dir)).unwrap();
        assert_eq!(seq.len(), 3);
        assert_eq!(seq.resolution(), (5, 4));

        let mut depths = Vec::new();
        while let Some(frame) = seq.next_frame().unwrap() {
            depths.push(frame.depth.unwrap().get_pixel(0, 0).0[0]);
        }
        assert_eq!(depths, [0, 100, 200]);
        assert!(!seq.is_active());
    }

    #[test]
    fn test_mismatched_counts_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let color_dir = dir.path().join("color");
        let depth_dir = dir.path().join("depth");
        fs::create_dir_all(&color_dir).unwrap();
        fs::create_dir_all(&depth_dir).unwrap();
        RgbImage::new(2, 2).save(color_dir.join("a.png")).unwrap();
        RgbImage::new(2, 2).save(color_dir.join("b.png")).unwrap();
        DepthImage::new(2, 2).save(depth_dir.join("a.png")).unwrap();

        assert!(ImageSequence::from_dir(&color_dir, Some(&depth_dir)).is_err());
    }
}
