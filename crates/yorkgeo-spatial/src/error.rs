use std::path::PathBuf;

use thiserror::Error;

use crate::transform::Crs;

/// Errors raised while loading datasets or moving geometry between CRSs.
#[derive(Debug, Error)]
pub enum SpatialError {
    /// A required dataset file does not exist.
    #[error("dataset file not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// The dataset file exists but could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The content is not valid GeoJSON, or a geometry could not be converted.
    #[error("failed to parse GeoJSON for {context}: {source}")]
    Parse {
        context: String,
        #[source]
        source: Box<geojson::Error>,
    },

    #[error("{context} is not a GeoJSON FeatureCollection")]
    NotFeatureCollection { context: String },

    #[error("unsupported CRS: {0}")]
    UnsupportedCrs(String),

    #[error("projection from {from} to {to} failed: {reason}")]
    Projection { from: Crs, to: Crs, reason: String },
}

impl SpatialError {
    pub(crate) fn parse(context: impl Into<String>, source: geojson::Error) -> Self {
        Self::Parse {
            context: context.into(),
            source: Box::new(source),
        }
    }
}
