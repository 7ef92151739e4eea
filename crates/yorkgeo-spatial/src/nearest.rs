use geo::{Centroid, Distance, Euclidean, Geometry, Point};

use crate::layer::{Feature, Layer};
use crate::query::{ensure_available, QueryError};

/// The closest feature to a query point.
#[derive(Debug, Clone, Copy)]
pub struct Nearest<'a> {
    /// Position of the feature in its layer.
    pub index: usize,
    pub feature: &'a Feature,
    /// Straight-line distance in the layer's CRS units.
    pub distance: f64,
}

/// Result of a two-hop lookup: the nearest feature of the first layer, and the
/// feature of the second layer nearest to *that* feature.
#[derive(Debug, Clone, Copy)]
pub struct NearestChain<'a> {
    pub first: Nearest<'a>,
    pub second: Nearest<'a>,
}

/// Find the feature of `layer` closest to `point`.
///
/// Both must already be in the same metric CRS. Ties go to the earliest
/// feature in layer order.
///
/// # Errors
///
/// Returns [`QueryError::DataUnavailable`] if the layer is empty or no
/// feature has a measurable distance.
pub fn nearest(layer: &Layer, point: Point<f64>) -> Result<Nearest<'_>, QueryError> {
    ensure_available(layer)?;

    let origin = Geometry::Point(point);
    let mut best: Option<Nearest<'_>> = None;

    for (index, feature) in layer.iter().enumerate() {
        let distance = Euclidean.distance(&origin, &feature.geometry);
        if distance.is_nan() {
            continue;
        }
        if best.is_none_or(|b| distance < b.distance) {
            best = Some(Nearest {
                index,
                feature,
                distance,
            });
        }
    }

    best.ok_or_else(|| QueryError::DataUnavailable {
        dataset: layer.name().to_string(),
    })
}

/// Nearest feature in `first` to `point`, then the nearest feature in
/// `second` to that result (its centroid, for non-point geometry).
///
/// # Errors
///
/// Returns [`QueryError::DataUnavailable`] if either layer is empty, checked
/// before any distance is computed.
pub fn nearest_chain<'a>(
    first: &'a Layer,
    second: &'a Layer,
    point: Point<f64>,
) -> Result<NearestChain<'a>, QueryError> {
    ensure_available(first)?;
    ensure_available(second)?;

    let hop_one = nearest(first, point)?;
    let anchor = hop_one
        .feature
        .geometry
        .centroid()
        .ok_or_else(|| QueryError::EmptyGeometry {
            dataset: first.name().to_string(),
            index: hop_one.index,
        })?;
    let hop_two = nearest(second, anchor)?;

    Ok(NearestChain {
        first: hop_one,
        second: hop_two,
    })
}
