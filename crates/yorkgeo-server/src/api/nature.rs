use axum::{extract::State, Extension, Json};
use serde::Serialize;
use yorkgeo_spatial::datasets::{CONSERVATION_AREAS, NATURE_RESERVES};
use yorkgeo_spatial::{count_points_within, ensure_available, PropertyValue, RegionCount};

use crate::middleware::RequestId;

use super::{map_query_error, ApiError, AppState};

#[derive(Debug, Serialize)]
pub(super) struct BinsInNatureAreasResponse {
    pub nature_reserve_bin_count: Vec<NatureReserveItem>,
    pub conservation_area_bin_count: Vec<ConservationAreaItem>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct NatureReserveItem {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub name: PropertyValue,
    pub details: PropertyValue,
    pub description: PropertyValue,
    pub bin_count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ConservationAreaItem {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub name: PropertyValue,
    pub bin_count: usize,
}

impl From<RegionCount<'_>> for NatureReserveItem {
    fn from(region: RegionCount<'_>) -> Self {
        let properties = &region.feature.properties;
        Self {
            kind: NATURE_RESERVES,
            name: properties.get("LV_NAME").clone(),
            details: properties.get("LV_DETAILS").clone(),
            description: properties.get("DESCRIPTION").clone(),
            bin_count: region.bin_count,
        }
    }
}

impl From<RegionCount<'_>> for ConservationAreaItem {
    fn from(region: RegionCount<'_>) -> Self {
        Self {
            kind: CONSERVATION_AREAS,
            name: region.feature.properties.get("Name").clone(),
            bin_count: region.bin_count,
        }
    }
}

pub(super) async fn bins_in_nature_areas(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<BinsInNatureAreasResponse>, ApiError> {
    let datasets = &state.datasets;

    let (reserves, areas) = ensure_available(datasets.bins())
        .and_then(|()| ensure_available(datasets.nature_reserves()))
        .and_then(|()| ensure_available(datasets.conservation_areas()))
        .and_then(|()| {
            Ok((
                count_points_within(datasets.bins(), datasets.nature_reserves())?,
                count_points_within(datasets.bins(), datasets.conservation_areas())?,
            ))
        })
        .map_err(|e| map_query_error(req_id.0.clone(), &e))?;

    Ok(Json(BinsInNatureAreasResponse {
        nature_reserve_bin_count: reserves.into_iter().map(NatureReserveItem::from).collect(),
        conservation_area_bin_count: areas.into_iter().map(ConservationAreaItem::from).collect(),
    }))
}
