//! Binary depth hint files consumed by dense stereo.
//!
//! Layout: `u64` width, `u64` height, then `width * height` `f32` depths in
//! meters, row-major, all in little-endian byte order. Pixels without a valid
//! measurement hold 0.

use crate::error::DataError;
use image::ImageBuffer;
use image::Luma;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Depths beyond this range (meters) are treated as invalid by default.
pub const DEFAULT_MAX_RANGE: f32 = 5.0;

/// A dense per-pixel depth prior in meters.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthHint {
    pub width: usize,
    pub height: usize,
    pub data: Vec<f32>,
}

impl DepthHint {
    /// Convert a millimeter depth buffer, zeroing values `<= 0` or beyond `max_range` meters.
    pub fn from_depth_mm(
        width: usize,
        height: usize,
        depth_mm: &[u16],
        max_range: f32,
    ) -> Result<Self, DataError> {
        let expected = width * height;
        if depth_mm.len() != expected {
            return Err(DataError::DepthLength {
                width,
                height,
                expected,
                found: depth_mm.len(),
            });
        }

        let data = depth_mm
            .iter()
            .map(|&mm| {
                let meters = mm as f32 / 1000.0;
                if meters <= 0.0 || meters > max_range { 0.0 } else { meters }
            })
            .collect();

        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Convert a 16-bit depth image (millimeters).
    pub fn from_depth_image(
        depth: &ImageBuffer<Luma<u16>, Vec<u16>>,
        max_range: f32,
    ) -> Result<Self, DataError> {
        let (w, h) = depth.dimensions();
        Self::from_depth_mm(w as usize, h as usize, depth.as_raw(), max_range)
    }

    /// Depth at pixel `(x, y)`.
    pub fn get(&self, x: usize, y: usize) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data.get(y * self.width + x).copied()
    }

    /// Number of pixels holding a valid depth.
    pub fn valid_count(&self) -> usize {
        self.data.iter().filter(|&&d| d > 0.0).count()
    }

    pub fn write_to(&self, path: &Path) -> Result<(), DataError> {
        let mut out = BufWriter::new(File::create(path)?);
        out.write_all(&(self.width as u64).to_le_bytes())?;
        out.write_all(&(self.height as u64).to_le_bytes())?;
        if cfg!(target_endian = "little") {
            out.write_all(bytemuck::cast_slice(&self.data))?;
        } else {
            for d in &self.data {
                out.write_all(&d.to_le_bytes())?;
            }
        }
        out.flush()?;
        debug!("Wrote depth hint {}x{} to {}", self.width, self.height, path.display());
        Ok(())
    }

    pub fn read_from(path: &Path) -> Result<Self, DataError> {
        let mut reader = BufReader::new(File::open(path)?);
        let mut word = [0u8; 8];
        reader.read_exact(&mut word)?;
        let width = u64::from_le_bytes(word);
        reader.read_exact(&mut word)?;
        let height = u64::from_le_bytes(word);

        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        let found = bytes.len() / 4;

        // Header values come from disk; a corrupt one must not overflow.
        let dims = usize::try_from(width).ok().zip(usize::try_from(height).ok());
        let expected = dims.and_then(|(w, h)| w.checked_mul(h));
        let (width, height) = match (dims, expected) {
            (Some(dims), Some(expected)) if bytes.len() % 4 == 0 && found == expected => dims,
            _ => {
                return Err(DataError::DepthHintSize {
                    path: path.to_path_buf(),
                    expected: expected.unwrap_or(usize::MAX),
                    found,
                });
            }
        };

        let data = bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();

        Ok(Self {
            width,
            height,
            data,
        })
    }
}

/// Depth hint file name for a depth image name: `depth_007.png` -> `color_007.bin`.
///
/// Hints are keyed by the color image they accompany, which is what the stereo
/// stage looks them up by.
pub fn hint_file_name(depth_file_name: &str) -> Option<String> {
    let stem = depth_file_name.strip_suffix(".png")?;
    let index = stem.strip_prefix("depth_")?;
    Some(format!("color_{index}.bin"))
}

/// Convert every `depth_*.png` in `depth_dir` into a depth hint under `out_dir`.
///
/// Returns the number of files converted.
#[tracing::instrument(skip_all, fields(depth_dir = %depth_dir.display(), out_dir = %out_dir.display()))]
pub fn convert_depth_dir(depth_dir: &Path, out_dir: &Path, max_range: f32) -> Result<usize, DataError> {
    fs::create_dir_all(out_dir)?;

    let mut inputs: Vec<(PathBuf, String)> = fs::read_dir(depth_dir)?
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let name = entry.file_name().to_str()?.to_string();
            let hint = hint_file_name(&name)?;
            Some((entry.path(), hint))
        })
        .collect();
    inputs.sort();

    for (path, hint_name) in &inputs {
        let depth = image::open(path)?.to_luma16();
        let hint = DepthHint::from_depth_image(&depth, max_range)?;
        hint.write_to(&out_dir.join(hint_name))?;
    }

    info!("Converted {} depth images", inputs.len());
    Ok(inputs.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_depth_mm_filters_range() {
        let hint = DepthHint::from_depth_mm(2, 2, &[0, 1500, 5000, 6000], DEFAULT_MAX_RANGE).unwrap();
        assert_eq!(hint.data, vec![0.0, 1.5, 5.0, 0.0]);
        assert_eq!(hint.valid_count(), 2);
        assert_eq!(hint.get(1, 0), Some(1.5));
        assert_eq!(hint.get(2, 0), None);
    }

    #[test]
    fn test_from_depth_mm_length_mismatch() {
        let err = DepthHint::from_depth_mm(3, 2, &[1, 2, 3], DEFAULT_MAX_RANGE).unwrap_err();
        assert!(matches!(err, DataError::DepthLength { expected: 6, found: 3, .. }));
    }

    #[test]
    fn test_binary_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("color_000.bin");
        let hint = DepthHint {
            width: 3,
            height: 1,
            data: vec![0.25, 0.0, 2.0],
        };
        hint.write_to(&path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(bytes.len(), 16 + 3 * 4);
        assert_eq!(&bytes[0..8], &3u64.to_le_bytes());
        assert_eq!(&bytes[8..16], &1u64.to_le_bytes());
        assert_eq!(&bytes[16..20], &0.25f32.to_le_bytes());

        assert_eq!(DepthHint::read_from(&path).unwrap(), hint);
    }

    #[test]
    fn test_truncated_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.bin");
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&4u64.to_le_bytes());
        bytes.extend_from_slice(&4u64.to_le_bytes());
        bytes.extend_from_slice(&1.0f32.to_le_bytes());
        std::fs::write(&path, bytes).unwrap();

        let err = DepthHint::read_from(&path).unwrap_err();
        assert!(matches!(err, DataError::DepthHintSize { expected: 16, found: 1, .. }));
    }

    #[test]
    fn test_oversized_header_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corrupt.bin");
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&u64::MAX.to_le_bytes());
        bytes.extend_from_slice(&2u64.to_le_bytes());
        std::fs::write(&path, bytes).unwrap();

        let err = DepthHint::read_from(&path).unwrap_err();
        assert!(matches!(err, DataError::DepthHintSize { found: 0, .. }));
    }

    #[test]
    fn test_hint_file_name() {
        assert_eq!(hint_file_name("depth_007.png").as_deref(), Some("color_007.bin"));
        assert_eq!(hint_file_name("color_007.png"), None);
        assert_eq!(hint_file_name("depth_007.jpg"), None);
    }

    #[test]
    fn test_convert_depth_dir() {
        let dir = tempfile::tempdir().unwrap();
        let depth_dir = dir.path().join("depth");
        let out_dir = dir.path().join("depth_hint");
        std::fs::create_dir_all(&depth_dir).unwrap();

        let depth: ImageBuffer<Luma<u16>, Vec<u16>> =
            ImageBuffer::from_fn(4, 2, |x, _| Luma([x as u16 * 1000]));
        depth.save(depth_dir.join("depth_000.png")).unwrap();
        depth.save(depth_dir.join("depth_001.png")).unwrap();
        std::fs::write(depth_dir.join("notes.txt"), "skip me").unwrap();

        let count = convert_depth_dir(&depth_dir, &out_dir, DEFAULT_MAX_RANGE).unwrap();
        assert_eq!(count, 2);

        let hint = DepthHint::read_from(&out_dir.join("color_001.bin")).unwrap();
        assert_eq!((hint.width, hint.height), (4, 2));
        assert_eq!(hint.get(3, 1), Some(3.0));
        assert_eq!(hint.get(0, 0), Some(0.0));
    }
}
