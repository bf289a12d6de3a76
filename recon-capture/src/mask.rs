//! Foreground masking for captures of green subjects (plants) close to the camera.

use crate::source::DepthImage;
use image::{Rgb, RgbImage};

/// Which pixels survive masking.
///
/// A pixel is kept when its raw depth is below `depth_threshold` and its HSV
/// color lies inside `[hsv_lower, hsv_upper]` (inclusive). Hue uses the 8-bit
/// 0..180 scale, saturation and value 0..255.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaskParams {
    /// Raw depth units (millimeters).
    pub depth_threshold: u16,
    pub hsv_lower: [u8; 3],
    pub hsv_upper: [u8; 3],
}

impl Default for MaskParams {
    fn default() -> Self {
        Self {
            depth_threshold: 800,
            hsv_lower: [35, 40, 40],
            hsv_upper: [85, 255, 255],
        }
    }
}

impl MaskParams {
    pub fn with_depth_threshold(mut self, threshold: u16) -> Self {
        self.depth_threshold = threshold;
        self
    }

    fn color_in_range(&self, rgb: [u8; 3]) -> bool {
        let hsv = rgb_to_hsv(rgb);
        (0..3).all(|i| self.hsv_lower[i] <= hsv[i] && hsv[i] <= self.hsv_upper[i])
    }

    /// Whether the pixel with color `rgb` and raw depth `depth` is kept.
    ///
    /// Without a depth measurement only the color test applies.
    pub fn keeps(&self, rgb: [u8; 3], depth: Option<u16>) -> bool {
        depth.is_none_or(|d| d < self.depth_threshold) && self.color_in_range(rgb)
    }
}

/// 8-bit HSV with hue halved into 0..180.
pub fn rgb_to_hsv([r, g, b]: [u8; 3]) -> [u8; 3] {
    let (rf, gf, bf) = (r as f32, g as f32, b as f32);
    let max = rf.max(gf).max(bf);
    let min = rf.min(gf).min(bf);
    let diff = max - min;

    let s = if max > 0.0 { 255.0 * diff / max } else { 0.0 };
    let mut h = if diff == 0.0 {
        0.0
    } else if max == rf {
        60.0 * (gf - bf) / diff
    } else if max == gf {
        120.0 + 60.0 * (bf - rf) / diff
    } else {
        240.0 + 60.0 * (rf - gf) / diff
    };
    if h < 0.0 {
        h += 360.0;
    }

    [
        ((h / 2.0).round() as u8).min(179),
        s.round() as u8,
        max as u8,
    ]
}

/// A frame with everything outside the mask blacked out.
#[derive(Debug, Clone)]
pub struct MaskedFrame {
    pub color: RgbImage,
    pub depth: Option<DepthImage>,
    /// Number of kept pixels.
    pub kept: usize,
}

/// Apply `params` to a color image and its aligned depth.
///
/// Depth pixels outside the color image are dropped.
pub fn mask_frame(color: &RgbImage, depth: Option<&DepthImage>, params: &MaskParams) -> MaskedFrame {
    let (width, height) = color.dimensions();
    let depth_at = |x: u32, y: u32| depth.map(|d| d.get_pixel_checked(x, y).map_or(0, |p| p.0[0]));

    let keep: Vec<bool> = color
        .enumerate_pixels()
        .map(|(x, y, px)| params.keeps(px.0, depth_at(x, y)))
        .collect();
    let kept_at = |x: u32, y: u32| x < width && y < height && keep[(y * width + x) as usize];

    let masked_color = RgbImage::from_fn(width, height, |x, y| {
        if kept_at(x, y) { *color.get_pixel(x, y) } else { Rgb([0, 0, 0]) }
    });
    let masked_depth = depth.map(|d| {
        let mut out = d.clone();
        for (x, y, px) in out.enumerate_pixels_mut() {
            if !kept_at(x, y) {
                px.0[0] = 0;
            }
        }
        out
    });

    MaskedFrame {
        color: masked_color,
        depth: masked_depth,
        kept: keep.iter().filter(|&&k| k).count(),
    }
}
