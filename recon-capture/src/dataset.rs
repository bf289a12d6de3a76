//! On-disk dataset layout written during capture.

use crate::mask::{MaskParams, mask_frame};
use crate::source::{CaptureError, DepthImage, FrameData};
use recon_data::DepthHint;
use recon_data::depth_hint::DEFAULT_MAX_RANGE;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// `base` if it does not exist yet, otherwise the first free `base_1`, `base_2`, ...
pub fn unique_dir(base: impl AsRef<Path>) -> PathBuf {
    let base = base.as_ref();
    if !base.exists() {
        return base.to_path_buf();
    }

    let mut i = 1u32;
    loop {
        let mut name = base.as_os_str().to_os_string();
        name.push(format!("_{i}"));
        let candidate = PathBuf::from(name);
        if !candidate.exists() {
            return candidate;
        }
        i += 1;
    }
}

/// Files written for one captured frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedFrame {
    pub index: usize,
    pub color: PathBuf,
    pub depth: Option<PathBuf>,
    pub depth_hint: Option<PathBuf>,
    pub mask_color: Option<PathBuf>,
    pub mask_depth: Option<PathBuf>,
}

/// Copy of `depth` with readings of 0 or beyond `max_range` meters set to 0.
///
/// Uses the same rule as the depth hints so both files agree.
pub fn clip_depth(depth: &DepthImage, max_range: f32) -> DepthImage {
    let mut clipped = depth.clone();
    for px in clipped.pixels_mut() {
        let meters = px.0[0] as f32 / 1000.0;
        if meters <= 0.0 || meters > max_range {
            px.0[0] = 0;
        }
    }
    clipped
}

/// Writes frames as `color/color_NNN.png`, `depth/depth_NNN.png` and
/// `depth_hint/color_NNN.bin` under a dataset root.
///
/// With a mask enabled, the masked copies also go to `mask_color/` and
/// `mask_depth/` under the same names.
#[derive(Debug, Clone)]
pub struct DatasetWriter {
    root: PathBuf,
    max_range: f32,
    mask: Option<MaskParams>,
}

impl DatasetWriter {
    /// Create the dataset directories under `root`.
    pub fn create(root: impl Into<PathBuf>) -> Result<Self, CaptureError> {
        let root = root.into();
        for sub in ["color", "depth", "depth_hint"] {
            fs::create_dir_all(root.join(sub))?;
        }
        info!("Saving dataset to {}", root.display());
        Ok(Self {
            root,
            max_range: DEFAULT_MAX_RANGE,
            mask: None,
        })
    }

    /// Also save masked copies of every frame.
    pub fn with_mask(mut self, params: MaskParams) -> Result<Self, CaptureError> {
        fs::create_dir_all(self.mask_color_dir())?;
        fs::create_dir_all(self.mask_depth_dir())?;
        self.mask = Some(params);
        Ok(self)
    }

    /// Depths beyond `meters` are zeroed in the depth hints.
    pub fn with_max_range(mut self, meters: f32) -> Self {
        self.max_range = meters;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn color_dir(&self) -> PathBuf {
        self.root.join("color")
    }

    pub fn depth_dir(&self) -> PathBuf {
        self.root.join("depth")
    }

    pub fn depth_hint_dir(&self) -> PathBuf {
        self.root.join("depth_hint")
    }

    pub fn mask_color_dir(&self) -> PathBuf {
        self.root.join("mask_color")
    }

    pub fn mask_depth_dir(&self) -> PathBuf {
        self.root.join("mask_depth")
    }

    /// Save `frame` under capture index `index`.
    pub fn save(&self, index: usize, frame: &FrameData) -> Result<SavedFrame, CaptureError> {
        let color = self.color_dir().join(format!("color_{index:03}.png"));
        frame.image.save(&color)?;
        debug!("[{}] Saved color image to {}", index, color.display());

        let clipped = frame.depth.as_ref().map(|d| clip_depth(d, self.max_range));
        let (depth, depth_hint) = match &clipped {
            Some(depth_image) => {
                let depth = self.depth_dir().join(format!("depth_{index:03}.png"));
                depth_image.save(&depth)?;

                let hint_path = self.depth_hint_dir().join(format!("color_{index:03}.bin"));
                DepthHint::from_depth_image(depth_image, self.max_range)?.write_to(&hint_path)?;
                debug!("[{}] Saved depth and depth hint", index);
                (Some(depth), Some(hint_path))
            }
            None => (None, None),
        };

        let (mask_color, mask_depth) = match &self.mask {
            Some(params) => {
                // The depth threshold applies to the raw reading, before clipping.
                let masked = mask_frame(&frame.image, frame.depth.as_ref(), params);
                let color_path = self.mask_color_dir().join(format!("color_{index:03}.png"));
                masked.color.save(&color_path)?;
                let depth_path = match &masked.depth {
                    Some(masked_depth) => {
                        let path = self.mask_depth_dir().join(format!("depth_{index:03}.png"));
                        masked_depth.save(&path)?;
                        Some(path)
                    }
                    None => None,
                };
                debug!("[{}] Saved masked frame ({} pixels kept)", index, masked.kept);
                (Some(color_path), depth_path)
            }
            None => (None, None),
        };

        Ok(SavedFrame {
            index,
            color,
            depth,
            depth_hint,
            mask_color,
            mask_depth,
        })
    }
}
