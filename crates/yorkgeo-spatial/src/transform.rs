//! Coordinate reference systems and reprojection.
//!
//! Only the handful of EPSG codes the York datasets need are known; anything
//! else fails with [`SpatialError::UnsupportedCrs`] when a [`Reprojector`] is
//! built. Transforms run through `proj4rs`, which works in radians for
//! geographic systems, so degrees are converted on the way in and out.

use geo::{Coord, Geometry, MapCoords, Point};
use proj4rs::proj::Proj;

use crate::error::SpatialError;
use crate::layer::{Feature, Layer};

/// A coordinate reference system identified by its EPSG code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Crs(u32);

impl Crs {
    /// WGS84 longitude/latitude in degrees; the GeoJSON default.
    pub const WGS84: Crs = Crs(4326);
    /// ETRS89 longitude/latitude in degrees.
    pub const ETRS89: Crs = Crs(4258);
    /// OSGB36 / British National Grid, eastings and northings in metres.
    pub const BRITISH_NATIONAL_GRID: Crs = Crs(27700);

    #[must_use]
    pub const fn epsg(code: u32) -> Self {
        Self(code)
    }

    /// Parse a GeoJSON `crs` name such as `urn:ogc:def:crs:EPSG::27700`,
    /// `EPSG:4326` or `urn:ogc:def:crs:OGC:1.3:CRS84`.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        if name.ends_with("CRS84") {
            return Some(Self::WGS84);
        }
        let upper = name.to_ascii_uppercase();
        if !upper.contains("EPSG") {
            return None;
        }
        upper
            .rsplit(':')
            .find(|part| !part.is_empty())
            .and_then(|code| code.parse::<u32>().ok())
            .map(Self)
    }

    fn definition(self) -> Option<CrsDefinition> {
        let def = match self.0 {
            4326 => CrsDefinition {
                proj4: "+proj=longlat +datum=WGS84 +no_defs",
                geographic: true,
            },
            4258 => CrsDefinition {
                proj4: "+proj=longlat +ellps=GRS80 +towgs84=0,0,0,0,0,0,0 +no_defs",
                geographic: true,
            },
            27700 => CrsDefinition {
                proj4: "+proj=tmerc +lat_0=49 +lon_0=-2 +k=0.9996012717 +x_0=400000 \
                        +y_0=-100000 +ellps=airy \
                        +towgs84=446.448,-125.157,542.06,0.15,0.247,0.842,-20.489 \
                        +units=m +no_defs",
                geographic: false,
            },
            _ => return None,
        };
        Some(def)
    }
}

impl std::fmt::Display for Crs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EPSG:{}", self.0)
    }
}

struct CrsDefinition {
    proj4: &'static str,
    geographic: bool,
}

struct Endpoint {
    proj: Proj,
    geographic: bool,
}

impl Endpoint {
    fn new(crs: Crs) -> Result<Self, SpatialError> {
        let def = crs
            .definition()
            .ok_or_else(|| SpatialError::UnsupportedCrs(crs.to_string()))?;
        let proj = Proj::from_proj_string(def.proj4).map_err(|e| {
            SpatialError::UnsupportedCrs(format!("{crs}: invalid definition: {e}"))
        })?;
        Ok(Self {
            proj,
            geographic: def.geographic,
        })
    }
}

/// Moves coordinates from one CRS to another.
pub struct Reprojector {
    from: Crs,
    to: Crs,
    // None when `from == to`.
    endpoints: Option<(Endpoint, Endpoint)>,
}

impl std::fmt::Debug for Reprojector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reprojector")
            .field("from", &self.from)
            .field("to", &self.to)
            .finish_non_exhaustive()
    }
}

impl Reprojector {
    /// # Errors
    ///
    /// Returns [`SpatialError::UnsupportedCrs`] if either code is unknown.
    pub fn new(from: Crs, to: Crs) -> Result<Self, SpatialError> {
        let endpoints = if from == to {
            None
        } else {
            Some((Endpoint::new(from)?, Endpoint::new(to)?))
        };
        Ok(Self {
            from,
            to,
            endpoints,
        })
    }

    fn coord(&self, coord: Coord<f64>) -> Result<Coord<f64>, SpatialError> {
        let Some((src, dst)) = &self.endpoints else {
            return Ok(coord);
        };

        let mut point = if src.geographic {
            (coord.x.to_radians(), coord.y.to_radians(), 0.0)
        } else {
            (coord.x, coord.y, 0.0)
        };

        proj4rs::transform::transform(&src.proj, &dst.proj, &mut point).map_err(|e| {
            SpatialError::Projection {
                from: self.from,
                to: self.to,
                reason: e.to_string(),
            }
        })?;

        let (x, y) = if dst.geographic {
            (point.0.to_degrees(), point.1.to_degrees())
        } else {
            (point.0, point.1)
        };

        if !x.is_finite() || !y.is_finite() {
            return Err(SpatialError::Projection {
                from: self.from,
                to: self.to,
                reason: format!("non-finite result for ({}, {})", coord.x, coord.y),
            });
        }

        Ok(Coord { x, y })
    }

    /// # Errors
    ///
    /// Returns [`SpatialError::Projection`] if the transform fails.
    pub fn point(&self, point: Point<f64>) -> Result<Point<f64>, SpatialError> {
        self.coord(point.0).map(Point::from)
    }

    /// # Errors
    ///
    /// Returns [`SpatialError::Projection`] if any vertex fails to transform.
    pub fn geometry(&self, geometry: &Geometry<f64>) -> Result<Geometry<f64>, SpatialError> {
        geometry.try_map_coords(|coord: Coord<f64>| self.coord(coord))
    }

    /// Reproject every feature of `layer`, keeping order and properties.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::Projection`] on the first feature that fails,
    /// or [`SpatialError::UnsupportedCrs`] if `layer` is not in the source CRS.
    pub fn layer(&self, layer: &Layer) -> Result<Layer, SpatialError> {
        if layer.crs() != self.from {
            return Err(SpatialError::UnsupportedCrs(format!(
                "layer {} is in {}, reprojector expects {}",
                layer.name(),
                layer.crs(),
                self.from
            )));
        }

        let features = layer
            .iter()
            .map(|feature| {
                Ok(Feature {
                    geometry: self.geometry(&feature.geometry)?,
                    properties: feature.properties.clone(),
                })
            })
            .collect::<Result<Vec<_>, SpatialError>>()?;

        Ok(Layer::new(layer.name(), self.to, features))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use geo::{point, Polygon};

    #[test]
    fn crs_from_name_handles_common_spellings() {
        assert_eq!(
            Crs::from_name("urn:ogc:def:crs:EPSG::27700"),
            Some(Crs::BRITISH_NATIONAL_GRID)
        );
        assert_eq!(Crs::from_name("EPSG:4326"), Some(Crs::WGS84));
        assert_eq!(
            Crs::from_name("urn:ogc:def:crs:OGC:1.3:CRS84"),
            Some(Crs::WGS84)
        );
        assert_eq!(Crs::from_name("urn:ogc:def:crs:EPSG:6.6:4258"), Some(Crs::ETRS89));
        assert_eq!(Crs::from_name("local-grid"), None);
    }

    #[test]
    fn unknown_epsg_code_is_rejected() {
        let err = Reprojector::new(Crs::WGS84, Crs::epsg(99_999)).unwrap_err();
        assert!(matches!(err, SpatialError::UnsupportedCrs(ref s) if s.contains("99999")));
    }

    #[test]
    fn same_crs_is_identity() {
        let reprojector = Reprojector::new(Crs::WGS84, Crs::WGS84).unwrap();
        let p = point!(x: -1.08, y: 53.96);
        assert_eq!(reprojector.point(p).unwrap(), p);
    }

    #[test]
    fn wgs84_to_national_grid_matches_os_worked_example() {
        // Caister water tower, from the Ordnance Survey coordinate guide.
        let reprojector = Reprojector::new(Crs::WGS84, Crs::BRITISH_NATIONAL_GRID).unwrap();
        let projected = reprojector
            .point(point!(x: 1.716_074_0, y: 52.658_007_8))
            .unwrap();
        assert_abs_diff_eq!(projected.x(), 651_409.903, epsilon = 10.0);
        assert_abs_diff_eq!(projected.y(), 313_177.270, epsilon = 10.0);
    }

    #[test]
    fn round_trip_returns_to_start() {
        let forward = Reprojector::new(Crs::WGS84, Crs::BRITISH_NATIONAL_GRID).unwrap();
        let back = Reprojector::new(Crs::BRITISH_NATIONAL_GRID, Crs::WGS84).unwrap();
        let start = point!(x: -1.062_741, y: 53.953_088);
        let end = back.point(forward.point(start).unwrap()).unwrap();
        assert_abs_diff_eq!(end.x(), start.x(), epsilon = 1e-6);
        assert_abs_diff_eq!(end.y(), start.y(), epsilon = 1e-6);
    }

    #[test]
    fn geometry_reprojects_every_vertex() {
        let reprojector = Reprojector::new(Crs::WGS84, Crs::BRITISH_NATIONAL_GRID).unwrap();
        let square: Polygon<f64> = Polygon::new(
            vec![
                (-1.07, 53.955),
                (-1.06, 53.955),
                (-1.06, 53.962),
                (-1.07, 53.962),
                (-1.07, 53.955),
            ]
            .into(),
            vec![],
        );
        let Geometry::Polygon(projected) = reprojector.geometry(&square.into()).unwrap() else {
            panic!("expected polygon");
        };
        assert_eq!(projected.exterior().0.len(), 5);
        for coord in &projected.exterior().0 {
            assert!(coord.x > 400_000.0 && coord.x < 500_000.0, "easting {}", coord.x);
            assert!(coord.y > 400_000.0 && coord.y < 500_000.0, "northing {}", coord.y);
        }
    }
}
