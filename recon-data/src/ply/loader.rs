//! PLY file loading functions

use crate::error::DataError;
use crate::ply::PlyVertex;
use crate::types::Bounds;
use glam::Vec3;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, info, warn};

// Face structure for PLY files. COLMAP meshers name the list `vertex_index`.
#[derive(Deserialize, Debug)]
#[allow(dead_code)]
struct PlyFace {
    #[serde(alias = "vertex_index")]
    vertex_indices: Vec<i32>,
}

// PLY file structure
#[derive(Deserialize, Debug)]
struct PlyFile {
    #[serde(rename = "vertex")]
    vertex: Vec<HashMap<String, JsonValue>>,
    #[serde(default, rename = "face")]
    face: Vec<PlyFace>,
}

/// Vertex/face counts and extent of a PLY model.
#[derive(Debug, Clone, PartialEq)]
pub struct PlySummary {
    pub vertex_count: usize,
    pub face_count: usize,
    pub has_colors: bool,
    pub has_normals: bool,
    pub bounds: Option<Bounds>,
}

fn parse_ply(path: &Path) -> Result<PlyFile, DataError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    serde_ply::from_reader(reader).map_err(|e| {
        warn!("Failed to parse PLY file {}: {}", path.display(), e);
        DataError::Ply(e.to_string())
    })
}

fn get_f32(prop: Option<&JsonValue>) -> Option<f32> {
    prop.and_then(|v| match v {
        JsonValue::Number(n) => n.as_f64().map(|f| f as f32),
        _ => None,
    })
}

fn get_u8(prop: Option<&JsonValue>) -> Option<u8> {
    prop.and_then(|v| match v {
        JsonValue::Number(n) => n
            .as_u64()
            .map(|u| u as u8)
            .or_else(|| n.as_i64().map(|i| i as u8)),
        _ => None,
    })
}

fn convert_vertex(index: usize, vertex: &HashMap<String, JsonValue>) -> Result<PlyVertex, DataError> {
    let coord = |property: &'static str| {
        get_f32(vertex.get(property)).ok_or(DataError::MissingProperty { property, index })
    };
    let position = Vec3::new(coord("x")?, coord("y")?, coord("z")?);

    let color = if let (Some(r), Some(g), Some(b)) = (
        get_u8(vertex.get("red")),
        get_u8(vertex.get("green")),
        get_u8(vertex.get("blue")),
    ) {
        Vec3::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0)
    } else {
        Vec3::splat(0.8)
    };

    let normal = match (
        get_f32(vertex.get("nx")),
        get_f32(vertex.get("ny")),
        get_f32(vertex.get("nz")),
    ) {
        (Some(x), Some(y), Some(z)) => Some(Vec3::new(x, y, z)),
        _ => None,
    };

    Ok(PlyVertex {
        position,
        color,
        normal,
    })
}

/// Load vertices from a PLY file (fused point cloud or mesh).
#[tracing::instrument(skip_all, fields(path = %path.display()))]
pub fn load_vertices_from_ply(path: &Path) -> Result<Vec<PlyVertex>, DataError> {
    debug!("Loading PLY vertices");
    let ply_data = parse_ply(path)?;

    info!(
        "PLY file parsed: {} vertices, {} faces",
        ply_data.vertex.len(),
        ply_data.face.len()
    );

    ply_data
        .vertex
        .iter()
        .enumerate()
        .map(|(i, v)| convert_vertex(i, v))
        .collect()
}

/// Check if a PLY file contains face data.
pub fn ply_has_faces(path: &Path) -> Result<bool, DataError> {
    let ply_data = parse_ply(path)?;
    Ok(!ply_data.face.is_empty())
}

/// Summarize a PLY model: element counts, available attributes and bounds.
#[tracing::instrument(skip_all, fields(path = %path.display()))]
pub fn ply_summary(path: &Path) -> Result<PlySummary, DataError> {
    let ply_data = parse_ply(path)?;

    let vertices = ply_data
        .vertex
        .iter()
        .enumerate()
        .map(|(i, v)| convert_vertex(i, v))
        .collect::<Result<Vec<_>, _>>()?;

    let has_colors = ply_data
        .vertex
        .first()
        .is_some_and(|v| v.contains_key("red"));

    let summary = PlySummary {
        vertex_count: vertices.len(),
        face_count: ply_data.face.len(),
        has_colors,
        has_normals: vertices.first().is_some_and(|v| v.normal.is_some()),
        bounds: Bounds::from_positions(vertices.iter().map(|v| v.position)),
    };
    debug!(?summary, "PLY summary");
    Ok(summary)
}
