//! Back-projection of a single RGB-D pair into a colored point cloud.

use crate::error::DataError;
use crate::types::{Intrinsics, Point};
use glam::Vec3;
use image::imageops::{self, FilterType};
use image::{ImageBuffer, Luma, RgbImage};
use std::path::Path;
use tracing::{debug, info};

/// Depth conversion settings for back-projection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackprojectParams {
    /// Raw depth units per meter (1000 for millimeter depth images).
    pub depth_scale: f32,
    /// Points farther than this (meters) are dropped.
    pub depth_trunc: f32,
    /// Negate y and z so the cloud is upright in a y-up, -z-forward viewer.
    pub flip_to_viewer: bool,
}

impl BackprojectParams {
    /// Reject settings that would turn depth into NaN or drop every point.
    pub fn validate(&self) -> Result<(), DataError> {
        if !(self.depth_scale.is_finite() && self.depth_scale > 0.0) {
            return Err(DataError::InvalidParameter(format!(
                "depth_scale must be positive, got {}",
                self.depth_scale
            )));
        }
        if self.depth_trunc.is_nan() || self.depth_trunc <= 0.0 {
            return Err(DataError::InvalidParameter(format!(
                "depth_trunc must be positive, got {}",
                self.depth_trunc
            )));
        }
        Ok(())
    }
}

impl Default for BackprojectParams {
    fn default() -> Self {
        Self {
            depth_scale: 1000.0,
            depth_trunc: 3.0,
            flip_to_viewer: true,
        }
    }
}

/// Back-project every valid depth pixel into a colored point.
///
/// The color image is resized to the depth resolution when they differ.
pub fn backproject(
    color: &RgbImage,
    depth: &ImageBuffer<Luma<u16>, Vec<u16>>,
    intrinsics: &Intrinsics,
    params: &BackprojectParams,
) -> Result<Vec<Point>, DataError> {
    params.validate()?;
    let (width, height) = depth.dimensions();

    let resized;
    let color = if color.dimensions() != (width, height) {
        debug!(
            "Resizing color {:?} to depth resolution {}x{}",
            color.dimensions(),
            width,
            height
        );
        resized = imageops::resize(color, width, height, FilterType::Triangle);
        &resized
    } else {
        color
    };

    let mut points = Vec::new();
    for (u, v, raw) in depth.enumerate_pixels() {
        let z = raw.0[0] as f32 / params.depth_scale;
        if z <= 0.0 || z > params.depth_trunc {
            continue;
        }

        let mut position = intrinsics.unproject(u as f32, v as f32, z);
        if params.flip_to_viewer {
            position = Vec3::new(position.x, -position.y, -position.z);
        }

        let [r, g, b] = color.get_pixel(u, v).0;
        let rgb = Vec3::new(r as f32, g as f32, b as f32) / 255.0;
        points.push(Point::new(position, rgb));
    }

    Ok(points)
}

/// Width and height of an image file without decoding its pixels.
pub fn image_dimensions(path: &Path) -> Result<(u32, u32), DataError> {
    Ok(image::image_dimensions(path)?)
}

/// Load a color image and a 16-bit depth image and back-project them.
///
/// Without explicit intrinsics, a centered pinhole model with the default focal
/// length at the depth resolution is used.
#[tracing::instrument(skip_all, fields(color = %color_path.display(), depth = %depth_path.display()))]
pub fn backproject_files(
    color_path: &Path,
    depth_path: &Path,
    intrinsics: Option<Intrinsics>,
    params: &BackprojectParams,
) -> Result<Vec<Point>, DataError> {
    let color = image::open(color_path)?.to_rgb8();
    let depth = image::open(depth_path)?.to_luma16();

    let (w, h) = depth.dimensions();
    let intrinsics = intrinsics.unwrap_or_else(|| Intrinsics::centered(w, h, Intrinsics::DEFAULT_FOCAL));

    let points = backproject(&color, &depth, &intrinsics, params)?;
    info!("Back-projected {} of {} pixels", points.len(), w as usize * h as usize);
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn depth_image(values: &[u16], width: u32, height: u32) -> ImageBuffer<Luma<u16>, Vec<u16>> {
        ImageBuffer::from_raw(width, height, values.to_vec()).unwrap()
    }

    #[test]
    fn test_backproject_geometry() {
        let depth = depth_image(&[0, 1000, 2000, 4000], 2, 2);
        let color = RgbImage::from_pixel(2, 2, Rgb([255, 0, 0]));
        let k = Intrinsics::new(2, 2, 1.0, 1.0, 0.0, 0.0);

        let params = BackprojectParams {
            flip_to_viewer: false,
            ..Default::default()
        };
        let points = backproject(&color, &depth, &k, &params).unwrap();

        // (0,0) has no depth, (1,1) is beyond the 3 m truncation.
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].position, Vec3::new(1.0, 0.0, 1.0));
        assert_eq!(points[1].position, Vec3::new(0.0, 2.0, 2.0));
        assert_eq!(points[0].color, Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_backproject_flips_to_viewer() {
        let depth = depth_image(&[1000], 1, 1);
        let color = RgbImage::from_pixel(1, 1, Rgb([0, 0, 0]));
        let k = Intrinsics::new(1, 1, 1.0, 1.0, 0.0, -1.0);

        let points = backproject(&color, &depth, &k, &BackprojectParams::default()).unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].position, Vec3::new(0.0, -1.0, -1.0));
    }

    #[test]
    fn test_color_resized_to_depth() {
        let depth = depth_image(&[500; 4], 2, 2);
        let color = RgbImage::from_pixel(8, 8, Rgb([0, 255, 0]));
        let k = Intrinsics::centered(2, 2, 1.0);

        let points = backproject(&color, &depth, &k, &BackprojectParams::default()).unwrap();
        assert_eq!(points.len(), 4);
        assert!(points.iter().all(|p| p.color.x < 0.01 && p.color.y > 0.99));
    }

    #[test]
    fn test_zero_depth_scale_rejected() {
        let depth = depth_image(&[0, 1000], 2, 1);
        let color = RgbImage::new(2, 1);
        let k = Intrinsics::centered(2, 1, 1.0);
        let params = BackprojectParams {
            depth_scale: 0.0,
            ..Default::default()
        };

        let err = backproject(&color, &depth, &k, &params).unwrap_err();
        assert!(matches!(err, DataError::InvalidParameter(_)));

        let params = BackprojectParams {
            depth_scale: f32::NAN,
            ..Default::default()
        };
        assert!(backproject(&color, &depth, &k, &params).is_err());
    }

    #[test]
    fn test_backproject_files() {
        let dir = tempfile::tempdir().unwrap();
        let color_path = dir.path().join("color_000.png");
        let depth_path = dir.path().join("depth_000.png");
        RgbImage::from_pixel(4, 4, Rgb([10, 20, 30])).save(&color_path).unwrap();
        depth_image(&[1200; 16], 4, 4).save(&depth_path).unwrap();

        let points = backproject_files(&color_path, &depth_path, None, &BackprojectParams::default()).unwrap();
        assert_eq!(points.len(), 16);
        assert!(points.iter().all(|p| (p.position.z + 1.2).abs() < 1e-6));
    }
}
