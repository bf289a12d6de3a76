//! ASCII PLY output for colored point clouds

use crate::error::DataError;
use crate::types::Point;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

/// Write `points` as an ASCII PLY with float positions and uchar colors.
#[tracing::instrument(skip_all, fields(path = %path.display(), points = points.len()))]
pub fn write_point_cloud_ply(path: &Path, points: &[Point]) -> Result<(), DataError> {
    let mut out = BufWriter::new(File::create(path)?);

    writeln!(out, "ply")?;
    writeln!(out, "format ascii 1.0")?;
    writeln!(out, "element vertex {}", points.len())?;
    for axis in ["x", "y", "z"] {
        writeln!(out, "property float {axis}")?;
    }
    for channel in ["red", "green", "blue"] {
        writeln!(out, "property uchar {channel}")?;
    }
    writeln!(out, "end_header")?;

    for point in points {
        let p = point.position;
        let [r, g, b] = point.color_u8();
        writeln!(out, "{} {} {} {} {} {}", p.x, p.y, p.z, r, g, b)?;
    }
    out.flush()?;

    info!("Wrote {} points", points.len());
    Ok(())
}
