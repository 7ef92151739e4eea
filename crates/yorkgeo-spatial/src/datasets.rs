use std::path::Path;

use crate::error::SpatialError;
use crate::layer::Layer;
use crate::transform::{Crs, Reprojector};

pub const GP_SURGERIES_FILE: &str = "GP_Surgeries.geojson";
pub const PHARMACIES_FILE: &str = "Pharmacies.geojson";
pub const BINS_FILE: &str = "Dog_Litter_bins_incidents_(all).geojson";
pub const NATURE_RESERVES_FILE: &str = "Local_nature_reserves.geojson";
pub const CONSERVATION_AREAS_FILE: &str = "Conservation_Areas.geojson";

pub const GP_SURGERIES: &str = "GP";
pub const PHARMACIES: &str = "Pharmacy";
pub const BINS: &str = "Dog or Litter Bin";
pub const NATURE_RESERVES: &str = "Nature Reserve";
pub const CONSERVATION_AREAS: &str = "Conservation Area";

/// The five source layers, as read from disk.
#[derive(Debug, Clone)]
pub struct BaseLayers {
    pub gp_surgeries: Layer,
    pub pharmacies: Layer,
    pub bins: Layer,
    pub nature_reserves: Layer,
    pub conservation_areas: Layer,
}

impl BaseLayers {
    /// Load every dataset file from `dir`.
    ///
    /// # Errors
    ///
    /// Returns the first [`SpatialError`] hit; any missing or unparsable file
    /// fails the whole load.
    pub fn load(dir: &Path) -> Result<Self, SpatialError> {
        let load = |name: &str, file: &str| -> Result<Layer, SpatialError> {
            let layer = Layer::load(name, &dir.join(file))?;
            tracing::info!(
                dataset = name,
                file,
                features = layer.len(),
                crs = %layer.crs(),
                "loaded dataset"
            );
            Ok(layer)
        };

        Ok(Self {
            gp_surgeries: load(GP_SURGERIES, GP_SURGERIES_FILE)?,
            pharmacies: load(PHARMACIES, PHARMACIES_FILE)?,
            bins: load(BINS, BINS_FILE)?,
            nature_reserves: load(NATURE_RESERVES, NATURE_RESERVES_FILE)?,
            conservation_areas: load(CONSERVATION_AREAS, CONSERVATION_AREAS_FILE)?,
        })
    }
}

/// Everything the service reads, built once at startup and never mutated.
///
/// The facility layers are also kept reprojected into the metric CRS so
/// distance queries do not reproject the whole layer per request.
#[derive(Debug, Clone)]
pub struct Datasets {
    base: BaseLayers,
    metric_crs: Crs,
    gp_surgeries_metric: Layer,
    pharmacies_metric: Layer,
}

impl Datasets {
    /// # Errors
    ///
    /// See [`BaseLayers::load`] and [`Datasets::from_layers`].
    pub fn load(dir: &Path, metric_crs: Crs) -> Result<Self, SpatialError> {
        Self::from_layers(BaseLayers::load(dir)?, metric_crs)
    }

    /// Build from already-loaded layers.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError`] if a facility layer cannot be reprojected
    /// into `metric_crs`.
    pub fn from_layers(base: BaseLayers, metric_crs: Crs) -> Result<Self, SpatialError> {
        let gp_surgeries_metric = to_metric(&base.gp_surgeries, metric_crs)?;
        let pharmacies_metric = to_metric(&base.pharmacies, metric_crs)?;
        Ok(Self {
            base,
            metric_crs,
            gp_surgeries_metric,
            pharmacies_metric,
        })
    }

    #[must_use]
    pub fn metric_crs(&self) -> Crs {
        self.metric_crs
    }

    #[must_use]
    pub fn base(&self) -> &BaseLayers {
        &self.base
    }

    #[must_use]
    pub fn gp_surgeries_metric(&self) -> &Layer {
        &self.gp_surgeries_metric
    }

    #[must_use]
    pub fn pharmacies_metric(&self) -> &Layer {
        &self.pharmacies_metric
    }

    #[must_use]
    pub fn bins(&self) -> &Layer {
        &self.base.bins
    }

    #[must_use]
    pub fn nature_reserves(&self) -> &Layer {
        &self.base.nature_reserves
    }

    #[must_use]
    pub fn conservation_areas(&self) -> &Layer {
        &self.base.conservation_areas
    }

    /// Feature count per dataset, in a fixed order.
    #[must_use]
    pub fn feature_counts(&self) -> [(&str, usize); 5] {
        [
            &self.base.gp_surgeries,
            &self.base.pharmacies,
            &self.base.bins,
            &self.base.nature_reserves,
            &self.base.conservation_areas,
        ]
        .map(|layer| (layer.name(), layer.len()))
    }
}

fn to_metric(layer: &Layer, metric_crs: Crs) -> Result<Layer, SpatialError> {
    if layer.crs() == metric_crs {
        return Ok(layer.clone());
    }
    Reprojector::new(layer.crs(), metric_crs)?.layer(layer)
}
