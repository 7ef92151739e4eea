//! Shape summary of an uploaded GeoJSON file.
//!
//! Checks run in a fixed order: file name, then size, then content. Size is
//! checked before any parsing so oversized uploads are never decoded.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::properties::Properties;

pub const GEOJSON_EXTENSION: &str = ".geojson";

/// Uploads of this many bytes or more are rejected.
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Reported as `crs` when the file does not declare one.
pub const CRS_NOT_DECLARED: &str = "N/A";

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Uploaded file must be a valid GeoJSON file.")]
    WrongFileType { file_name: String },

    #[error("File is too large.")]
    TooLarge { size: usize },

    #[error("Uploaded file is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("Uploaded file is not a valid GeoJSON file.")]
    NotFeatureCollection,

    /// The feature list is present but an entry could not be read.
    #[error("{0}")]
    Malformed(String),
}

impl UploadError {
    /// True for the validation failures that are the uploader's fault.
    #[must_use]
    pub fn is_invalid_input(&self) -> bool {
        !matches!(self, Self::Malformed(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadSummary {
    pub rows: usize,
    /// Distinct property names across all features, sorted.
    pub columns: Vec<String>,
    /// The file's `crs` member as written, or `"N/A"`.
    pub crs: Value,
    /// Distinct geometry types, sorted.
    pub geometry_types: Vec<String>,
}

/// A missing or null `properties` or `geometry` member contributes nothing
/// rather than failing the upload.
#[derive(Deserialize)]
struct UploadedFeature {
    #[serde(default)]
    properties: Option<Properties>,
    #[serde(default)]
    geometry: Option<UploadedGeometry>,
}

#[derive(Deserialize)]
struct UploadedGeometry {
    #[serde(rename = "type")]
    kind: String,
}

/// # Errors
///
/// Returns [`UploadError::WrongFileType`] unless `file_name` ends in `.geojson`.
pub fn check_file_name(file_name: &str) -> Result<(), UploadError> {
    if file_name.ends_with(GEOJSON_EXTENSION) {
        Ok(())
    } else {
        Err(UploadError::WrongFileType {
            file_name: file_name.to_string(),
        })
    }
}

/// # Errors
///
/// Returns [`UploadError::TooLarge`] once `size` reaches [`MAX_UPLOAD_BYTES`].
pub fn check_size(size: usize) -> Result<(), UploadError> {
    if size >= MAX_UPLOAD_BYTES {
        Err(UploadError::TooLarge { size })
    } else {
        Ok(())
    }
}

/// Summarize GeoJSON content that already passed the name and size checks.
///
/// # Errors
///
/// Returns [`UploadError::InvalidJson`] if `content` is not JSON,
/// [`UploadError::NotFeatureCollection`] if it has no top-level `features`
/// array, and [`UploadError::Malformed`] if a feature entry is unreadable.
pub fn summarize(content: &[u8]) -> Result<UploadSummary, UploadError> {
    let value: Value = serde_json::from_slice(content).map_err(UploadError::InvalidJson)?;

    let Value::Object(mut root) = value else {
        return Err(UploadError::NotFeatureCollection);
    };
    let Some(features @ Value::Array(_)) = root.remove("features") else {
        return Err(UploadError::NotFeatureCollection);
    };

    let features: Vec<UploadedFeature> = serde_json::from_value(features)
        .map_err(|e| UploadError::Malformed(format!("invalid feature entry: {e}")))?;

    let mut columns = BTreeSet::new();
    let mut geometry_types = BTreeSet::new();
    for feature in &features {
        if let Some(properties) = &feature.properties {
            columns.extend(properties.keys().map(str::to_string));
        }
        if let Some(geometry) = &feature.geometry {
            geometry_types.insert(geometry.kind.clone());
        }
    }

    Ok(UploadSummary {
        rows: features.len(),
        columns: columns.into_iter().collect(),
        crs: root
            .remove("crs")
            .unwrap_or_else(|| Value::String(CRS_NOT_DECLARED.to_string())),
        geometry_types: geometry_types.into_iter().collect(),
    })
}

/// Run every check in order and summarize.
///
/// # Errors
///
/// Any [`UploadError`]; see [`check_file_name`], [`check_size`] and
/// [`summarize`].
pub fn summarize_upload(file_name: &str, content: &[u8]) -> Result<UploadSummary, UploadError> {
    check_file_name(file_name)?;
    check_size(content.len())?;
    summarize(content)
}
