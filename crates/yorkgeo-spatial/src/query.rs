use geo::Point;
use thiserror::Error;

use crate::error::SpatialError;
use crate::layer::Layer;
use crate::transform::{Crs, Reprojector};

pub const METRES_PER_MILE: f64 = 1609.34;

/// Errors returned by the nearest, radius and aggregation operations.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Invalid latitude or longitude.")]
    InvalidCoordinates { latitude: f64, longitude: f64 },

    #[error("Invalid radius.")]
    InvalidRadius(f64),

    /// A dataset needed by the query is empty.
    #[error("{dataset} data not available")]
    DataUnavailable { dataset: String },

    /// The query ran but nothing matched.
    #[error("no features matched")]
    NoMatches,

    #[error("feature {index} of {dataset} has an empty geometry")]
    EmptyGeometry { dataset: String, index: usize },

    #[error("cannot join {left} ({left_crs}) with {right} ({right_crs})")]
    CrsMismatch {
        left: String,
        left_crs: Crs,
        right: String,
        right_crs: Crs,
    },

    #[error(transparent)]
    Spatial(#[from] SpatialError),
}

impl QueryError {
    /// True when the caller supplied bad input, as opposed to a server-side
    /// data or processing failure.
    #[must_use]
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            Self::InvalidCoordinates { .. } | Self::InvalidRadius(_)
        )
    }
}

/// A validated WGS84 latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueryPoint {
    latitude: f64,
    longitude: f64,
}

impl QueryPoint {
    /// # Errors
    ///
    /// Returns [`QueryError::InvalidCoordinates`] if latitude is outside
    /// [-90, 90], longitude is outside [-180, 180], or either is NaN.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, QueryError> {
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(QueryError::InvalidCoordinates {
                latitude,
                longitude,
            });
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// The point as x = longitude, y = latitude.
    #[must_use]
    pub fn to_point(&self) -> Point<f64> {
        Point::new(self.longitude, self.latitude)
    }

    /// Reproject from WGS84 into `crs`.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Spatial`] if `crs` is unsupported or the
    /// transform fails.
    pub fn project_to(&self, crs: Crs) -> Result<Point<f64>, QueryError> {
        let reprojector = Reprojector::new(Crs::WGS84, crs)?;
        Ok(reprojector.point(self.to_point())?)
    }
}

/// A validated search radius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Radius {
    miles: f64,
}

impl Radius {
    /// # Errors
    ///
    /// Returns [`QueryError::InvalidRadius`] unless `miles` is finite and
    /// strictly positive.
    pub fn from_miles(miles: f64) -> Result<Self, QueryError> {
        if !miles.is_finite() || miles <= 0.0 {
            return Err(QueryError::InvalidRadius(miles));
        }
        Ok(Self { miles })
    }

    #[must_use]
    pub fn metres(&self) -> f64 {
        self.miles * METRES_PER_MILE
    }
}

/// Fails with [`QueryError::DataUnavailable`] when `layer` has no features.
///
/// # Errors
///
/// See above.
pub fn ensure_available(layer: &Layer) -> Result<(), QueryError> {
    if layer.is_empty() {
        return Err(QueryError::DataUnavailable {
            dataset: layer.name().to_string(),
        });
    }
    Ok(())
}
