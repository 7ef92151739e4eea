//! Geometry layer for the York open-data service.
//!
//! Loads the static GeoJSON datasets once, reprojects them into a metric CRS
//! and answers the nearest / radius / point-in-polygon questions the HTTP
//! layer exposes. Nothing here knows about HTTP: every operation returns a
//! `Result` whose error variants the server maps onto status codes.

pub mod aggregate;
pub mod datasets;
pub mod error;
pub mod layer;
pub mod nearest;
pub mod properties;
pub mod query;
pub mod radius;
pub mod transform;
pub mod upload;

pub use aggregate::{count_points_within, RegionCount};
pub use datasets::{BaseLayers, Datasets};
pub use error::SpatialError;
pub use layer::{Feature, Layer};
pub use nearest::{nearest, nearest_chain, Nearest, NearestChain};
pub use properties::{Properties, PropertyValue};
pub use query::{ensure_available, QueryError, QueryPoint, Radius};
pub use radius::{circular_buffer, within_radius};
pub use transform::{Crs, Reprojector};
pub use upload::{UploadError, UploadSummary};
