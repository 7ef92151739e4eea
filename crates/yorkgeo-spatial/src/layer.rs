use std::path::Path;

use geo::Geometry;
use geojson::{FeatureCollection, GeoJson};

use crate::error::SpatialError;
use crate::properties::Properties;
use crate::transform::Crs;

/// One geometry plus its attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub geometry: Geometry<f64>,
    pub properties: Properties,
}

/// An ordered, read-only collection of features sharing one CRS.
#[derive(Debug, Clone)]
pub struct Layer {
    name: String,
    crs: Crs,
    features: Vec<Feature>,
}

impl Layer {
    pub fn new(name: impl Into<String>, crs: Crs, features: Vec<Feature>) -> Self {
        Self {
            name: name.into(),
            crs,
            features,
        }
    }

    /// Human-readable dataset label, used in "data not available" messages.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn crs(&self) -> Crs {
        self.crs
    }

    #[must_use]
    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Feature> {
        self.features.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Read a GeoJSON `FeatureCollection` from disk.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::NotFound`] if the file is missing, or any error
    /// from [`Layer::from_geojson_str`].
    pub fn load(name: impl Into<String>, path: &Path) -> Result<Self, SpatialError> {
        if !path.exists() {
            return Err(SpatialError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let raw = std::fs::read_to_string(path).map_err(|source| SpatialError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::parse(name.into(), &raw, &path.display().to_string())
    }

    /// Parse a GeoJSON `FeatureCollection`.
    ///
    /// The CRS comes from the legacy `crs` member when present and defaults to
    /// WGS84 otherwise. Features without a geometry are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::Parse`] for malformed GeoJSON,
    /// [`SpatialError::NotFeatureCollection`] for any other top-level object and
    /// [`SpatialError::UnsupportedCrs`] for an unrecognised `crs` member.
    pub fn from_geojson_str(name: impl Into<String>, raw: &str) -> Result<Self, SpatialError> {
        let name = name.into();
        let context = name.clone();
        Self::parse(name, raw, &context)
    }

    fn parse(name: String, raw: &str, context: &str) -> Result<Self, SpatialError> {
        let geojson: GeoJson = raw
            .parse()
            .map_err(|e| SpatialError::parse(context, e))?;

        let GeoJson::FeatureCollection(collection) = geojson else {
            return Err(SpatialError::NotFeatureCollection {
                context: context.to_string(),
            });
        };

        let crs = declared_crs(&collection)?.unwrap_or(Crs::WGS84);

        let mut features = Vec::with_capacity(collection.features.len());
        let mut skipped = 0usize;
        for feature in collection.features {
            let Some(geometry) = feature.geometry else {
                skipped += 1;
                continue;
            };
            let geometry =
                Geometry::<f64>::try_from(geometry).map_err(|e| SpatialError::parse(context, e))?;
            features.push(Feature {
                geometry,
                properties: feature.properties.map(Properties::from).unwrap_or_default(),
            });
        }

        if skipped > 0 {
            tracing::warn!(dataset = %name, skipped, "skipped features without geometry");
        }

        Ok(Self::new(name, crs, features))
    }
}

impl<'a> IntoIterator for &'a Layer {
    type Item = &'a Feature;
    type IntoIter = std::slice::Iter<'a, Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Reads `{"crs": {"type": "name", "properties": {"name": "..."}}}`.
fn declared_crs(collection: &FeatureCollection) -> Result<Option<Crs>, SpatialError> {
    let Some(name) = collection
        .foreign_members
        .as_ref()
        .and_then(|members| members.get("crs"))
        .and_then(|crs| crs.get("properties"))
        .and_then(|props| props.get("name"))
        .and_then(|name| name.as_str())
    else {
        return Ok(None);
    };

    Crs::from_name(name)
        .map(Some)
        .ok_or_else(|| SpatialError::UnsupportedCrs(name.to_string()))
}
