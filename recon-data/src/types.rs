//! Core data types for point clouds and pinhole cameras.

use glam::Vec3;

/// A simple colored point in 3D space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    /// Position in world space.
    pub position: Vec3,
    /// RGB color (0-1 range).
    pub color: Vec3,
}

impl Point {
    /// Create a new point with position and color.
    pub fn new(position: Vec3, color: Vec3) -> Self {
        Self { position, color }
    }

    /// Create a white point at the given position.
    pub fn white(position: Vec3) -> Self {
        Self {
            position,
            color: Vec3::ONE,
        }
    }

    /// Color quantized to 8 bits per channel.
    pub fn color_u8(&self) -> [u8; 3] {
        let c = (self.color.clamp(Vec3::ZERO, Vec3::ONE) * 255.0).round();
        [c.x as u8, c.y as u8, c.z as u8]
    }
}

impl Default for Point {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            color: Vec3::splat(0.8),
        }
    }
}

/// Pinhole camera intrinsics in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intrinsics {
    pub width: u32,
    pub height: u32,
    pub fx: f32,
    pub fy: f32,
    pub cx: f32,
    pub cy: f32,
}

impl Intrinsics {
    /// Focal length used when the capture camera is uncalibrated.
    pub const DEFAULT_FOCAL: f32 = 525.0;

    pub fn new(width: u32, height: u32, fx: f32, fy: f32, cx: f32, cy: f32) -> Self {
        Self {
            width,
            height,
            fx,
            fy,
            cx,
            cy,
        }
    }

    /// Intrinsics with a single focal length and the principal point at the image center.
    pub fn centered(width: u32, height: u32, focal: f32) -> Self {
        Self::new(
            width,
            height,
            focal,
            focal,
            width as f32 / 2.0,
            height as f32 / 2.0,
        )
    }

    /// Camera-space point for pixel `(u, v)` at depth `z`.
    pub fn unproject(&self, u: f32, v: f32, z: f32) -> Vec3 {
        Vec3::new((u - self.cx) * z / self.fx, (v - self.cy) * z / self.fy, z)
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl Bounds {
    /// Bounds of a set of positions, `None` when empty.
    pub fn from_positions<I: IntoIterator<Item = Vec3>>(positions: I) -> Option<Self> {
        let mut iter = positions.into_iter();
        let first = iter.next()?;
        let (min, max) = iter.fold((first, first), |(min, max), p| (min.min(p), max.max(p)));
        Some(Self { min, max })
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn extent(&self) -> Vec3 {
        self.max - self.min
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_creation() {
        let p = Point::new(Vec3::new(1.0, 2.0, 3.0), Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(p.position, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(p.color, Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_color_u8_clamps() {
        let p = Point::new(Vec3::ZERO, Vec3::new(1.5, 0.5, -0.2));
        assert_eq!(p.color_u8(), [255, 128, 0]);
    }

    #[test]
    fn test_centered_intrinsics() {
        let k = Intrinsics::centered(640, 480, Intrinsics::DEFAULT_FOCAL);
        assert_eq!(k.cx, 320.0);
        assert_eq!(k.cy, 240.0);
        assert_eq!(k.fx, 525.0);
    }

    #[test]
    fn test_unproject_principal_point() {
        let k = Intrinsics::centered(640, 480, 500.0);
        let p = k.unproject(320.0, 240.0, 2.0);
        assert_eq!(p, Vec3::new(0.0, 0.0, 2.0));

        let p = k.unproject(820.0, 240.0, 2.0);
        assert!((p.x - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_bounds() {
        assert!(Bounds::from_positions(Vec::<Vec3>::new()).is_none());

        let b = Bounds::from_positions([
            Vec3::new(1.0, -2.0, 0.0),
            Vec3::new(-1.0, 4.0, 3.0),
        ])
        .unwrap();
        assert_eq!(b.min, Vec3::new(-1.0, -2.0, 0.0));
        assert_eq!(b.max, Vec3::new(1.0, 4.0, 3.0));
        assert_eq!(b.center(), Vec3::new(0.0, 1.0, 1.5));
    }
}
