//! PLY file loading, summarizing and writing

mod loader;
mod vertex;
mod writer;

pub use loader::{PlySummary, load_vertices_from_ply, ply_has_faces, ply_summary};
pub use vertex::PlyVertex;
pub use writer::write_point_cloud_ply;
