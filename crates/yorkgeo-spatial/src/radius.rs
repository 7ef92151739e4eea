use std::f64::consts::TAU;

use geo::{Coord, LineString, Point, Polygon, Relate};

use crate::layer::{Feature, Layer};
use crate::query::{ensure_available, QueryError, Radius};

/// Segments per quarter circle when approximating a buffer.
pub const BUFFER_QUADRANT_SEGMENTS: usize = 16;

/// Polygonal approximation of the disc of `radius` around `centre`.
///
/// Uses `4 * BUFFER_QUADRANT_SEGMENTS` vertices, starting due east and
/// winding counter-clockwise. Built directly rather than through
/// `geo::Buffer` so the vertex count and positions stay fixed; GPs near the
/// rim are included or excluded against exactly these vertices.
#[must_use]
pub fn circular_buffer(centre: Point<f64>, radius: f64) -> Polygon<f64> {
    let segments = BUFFER_QUADRANT_SEGMENTS * 4;
    #[allow(clippy::cast_precision_loss)]
    let step = TAU / segments as f64;

    let ring: Vec<Coord<f64>> = (0..=segments)
        .map(|i| {
            // Close the ring on exactly the first vertex.
            let i = i % segments;
            #[allow(clippy::cast_precision_loss)]
            let angle = step * i as f64;
            Coord {
                x: centre.x() + radius * angle.cos(),
                y: centre.y() + radius * angle.sin(),
            }
        })
        .collect();

    Polygon::new(LineString::from(ring), vec![])
}

/// Every feature of `layer` lying within `radius` of `centre`, in layer order.
///
/// `layer` and `centre` must share a metric CRS. Features touching the buffer
/// boundary are not within it.
///
/// # Errors
///
/// Returns [`QueryError::DataUnavailable`] for an empty layer and
/// [`QueryError::NoMatches`] when nothing falls inside the buffer.
pub fn within_radius(
    layer: &Layer,
    centre: Point<f64>,
    radius: Radius,
) -> Result<Vec<&Feature>, QueryError> {
    ensure_available(layer)?;

    let buffer = circular_buffer(centre, radius.metres());
    let matches: Vec<&Feature> = layer
        .iter()
        .filter(|feature| feature.geometry.relate(&buffer).is_within())
        .collect();

    tracing::debug!(
        dataset = layer.name(),
        radius_m = radius.metres(),
        matches = matches.len(),
        "radius filter"
    );

    if matches.is_empty() {
        return Err(QueryError::NoMatches);
    }
    Ok(matches)
}
