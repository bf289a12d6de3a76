//! Read-only statistics from a COLMAP feature database.
//!
//! Reports, per image, how many keypoints were extracted and how many other
//! images it has matches with. Useful to spot images that will not register
//! before spending time in the mapper.

use crate::error::PipelineError;
use rusqlite::{Connection, OpenFlags};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::{debug, info};

/// Pairs are keyed as `image_id1 * MAX_IMAGE_ID + image_id2` with `image_id1 < image_id2`.
const MAX_IMAGE_ID: i64 = 2_147_483_647;

/// Image ids encoded in a `pair_id`, smaller id first.
pub fn pair_id_to_image_ids(pair_id: i64) -> (i64, i64) {
    let image_id2 = pair_id % MAX_IMAGE_ID;
    let image_id1 = (pair_id - image_id2) / MAX_IMAGE_ID;
    (image_id1, image_id2)
}

/// `pair_id` of two images, independent of argument order.
pub fn image_ids_to_pair_id(a: i64, b: i64) -> i64 {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    lo * MAX_IMAGE_ID + hi
}

/// Feature statistics of one image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFeatureStats {
    pub image_id: i64,
    pub name: String,
    pub keypoints: u64,
    /// Distinct other images sharing at least one raw match.
    pub matched_images: usize,
}

/// Statistics of every image in the database, ordered by image id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatabaseStats {
    pub images: Vec<ImageFeatureStats>,
}

impl DatabaseStats {
    /// Images that matched no other image; the mapper cannot register them.
    pub fn unmatched(&self) -> impl Iterator<Item = &ImageFeatureStats> {
        self.images.iter().filter(|i| i.matched_images == 0)
    }

    pub fn total_keypoints(&self) -> u64 {
        self.images.iter().map(|i| i.keypoints).sum()
    }
}

/// Collect keypoint and matched-image counts from the database at `path`.
#[tracing::instrument(skip_all, fields(database = %path.display()))]
pub fn read_database_stats(path: &Path) -> Result<DatabaseStats, PipelineError> {
    if !path.is_file() {
        return Err(PipelineError::InvalidConfig(format!(
            "feature database {} does not exist",
            path.display()
        )));
    }
    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;

    let mut images: BTreeMap<i64, (String, u64, BTreeSet<i64>)> = BTreeMap::new();
    let mut stmt = conn.prepare("SELECT image_id, name FROM images")?;
    let rows = stmt.query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))?;
    for row in rows {
        let (id, name) = row?;
        images.insert(id, (name, 0, BTreeSet::new()));
    }

    // One keypoint blob per image; `rows` is its keypoint count.
    let mut stmt = conn.prepare("SELECT image_id, rows FROM keypoints")?;
    let rows = stmt.query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)))?;
    for row in rows {
        let (id, count) = row?;
        if let Some(entry) = images.get_mut(&id) {
            entry.1 = count.max(0) as u64;
        }
    }

    let mut stmt = conn.prepare("SELECT pair_id FROM matches WHERE rows > 0")?;
    let rows = stmt.query_map([], |row| row.get::<_, i64>(0))?;
    let mut pairs = 0usize;
    for row in rows {
        let (a, b) = pair_id_to_image_ids(row?);
        if a == b {
            continue;
        }
        pairs += 1;
        if let Some(entry) = images.get_mut(&a) {
            entry.2.insert(b);
        }
        if let Some(entry) = images.get_mut(&b) {
            entry.2.insert(a);
        }
    }
    debug!("{} matched image pairs", pairs);

    let stats = DatabaseStats {
        images: images
            .into_iter()
            .map(|(image_id, (name, keypoints, partners))| ImageFeatureStats {
                image_id,
                name,
                keypoints,
                matched_images: partners.len(),
            })
            .collect(),
    };
    info!(
        "{} images, {} keypoints, {} unmatched",
        stats.images.len(),
        stats.total_keypoints(),
        stats.unmatched().count()
    );
    Ok(stats)
}
