//! PLY vertex data structures

use glam::Vec3;

/// Vertex data extracted from a fused cloud or mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct PlyVertex {
    pub position: Vec3,
    pub color: Vec3,
    /// Per-vertex normal, present in fused clouds.
    pub normal: Option<Vec3>,
}
