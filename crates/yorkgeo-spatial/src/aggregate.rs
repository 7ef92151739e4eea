//! Point-in-polygon counting.
//!
//! An inner "within" join of a point layer against a polygon layer, grouped by
//! polygon. Candidate polygons come from an R-tree over their bounding boxes;
//! the exact predicate is a DE-9IM relate, so points on a polygon's boundary
//! are not counted.

use geo::{BoundingRect, Centroid, Relate};
use rstar::primitives::{GeomWithData, Rectangle};
use rstar::RTree;

use crate::layer::{Feature, Layer};
use crate::query::{ensure_available, QueryError};

/// One polygon and the number of points within it.
#[derive(Debug, Clone, Copy)]
pub struct RegionCount<'a> {
    pub index: usize,
    pub feature: &'a Feature,
    pub bin_count: usize,
}

type RegionEnvelope = GeomWithData<Rectangle<[f64; 2]>, usize>;

fn region_index(regions: &Layer) -> RTree<RegionEnvelope> {
    let envelopes = regions
        .iter()
        .enumerate()
        .filter_map(|(index, feature)| {
            let rect = feature.geometry.bounding_rect()?;
            let min = rect.min();
            let max = rect.max();
            Some(GeomWithData::new(
                Rectangle::from_corners([min.x, min.y], [max.x, max.y]),
                index,
            ))
        })
        .collect();
    RTree::bulk_load(envelopes)
}

/// Count the features of `points` within each feature of `regions`.
///
/// Every region appears exactly once in the output, in layer order, with a
/// count of zero when nothing matched. A point inside two overlapping regions
/// counts toward both. Both layers must be in the same CRS.
///
/// # Errors
///
/// Returns [`QueryError::DataUnavailable`] if either layer is empty and
/// [`QueryError::CrsMismatch`] if their CRSs differ.
pub fn count_points_within<'a>(
    points: &Layer,
    regions: &'a Layer,
) -> Result<Vec<RegionCount<'a>>, QueryError> {
    ensure_available(points)?;
    ensure_available(regions)?;

    if points.crs() != regions.crs() {
        return Err(QueryError::CrsMismatch {
            left: points.name().to_string(),
            left_crs: points.crs(),
            right: regions.name().to_string(),
            right_crs: regions.crs(),
        });
    }

    let tree = region_index(regions);
    let mut counts = vec![0usize; regions.len()];

    for point in points {
        // A geometry within a polygon has its centroid inside the polygon's
        // bounding box, so the centroid is a safe R-tree probe.
        let Some(probe) = point.geometry.centroid() else {
            continue;
        };
        for candidate in tree.locate_all_at_point(&[probe.x(), probe.y()]) {
            let region = &regions.features()[candidate.data];
            if point.geometry.relate(&region.geometry).is_within() {
                counts[candidate.data] += 1;
            }
        }
    }

    let matched: usize = counts.iter().sum();
    tracing::debug!(
        points = points.name(),
        regions = regions.name(),
        matched,
        "spatial join"
    );

    Ok(regions
        .iter()
        .zip(counts)
        .enumerate()
        .map(|(index, (feature, bin_count))| RegionCount {
            index,
            feature,
            bin_count,
        })
        .collect())
}
