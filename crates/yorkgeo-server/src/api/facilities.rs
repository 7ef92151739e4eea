use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use yorkgeo_spatial::{
    ensure_available, nearest_chain, within_radius, Feature, Nearest, PropertyValue, QueryError,
    QueryPoint, Radius,
};

use crate::middleware::RequestId;

use super::{map_query_error, map_query_rejection, ApiError, AppState};

const NO_GPS_IN_RADIUS: &str = "No GPs found within the specified radius";

#[derive(Debug, Deserialize)]
pub(super) struct CoordinatesQuery {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Deserialize)]
pub(super) struct RadiusQuery {
    pub latitude: f64,
    pub longitude: f64,
    /// Miles.
    pub radius: f64,
}

#[derive(Debug, Serialize)]
pub(super) struct NearestGpPharmacyResponse {
    pub nearest_gp: NearestGp,
    pub nearest_pharmacy_from_gp: NearestPharmacy,
}

#[derive(Debug, Serialize)]
pub(super) struct NearestGp {
    pub name: PropertyValue,
    pub address: GpAddress,
    pub opening_hours: OpeningHours,
    pub distance_meters: f64,
}

#[derive(Debug, Serialize)]
pub(super) struct GpAddress {
    pub address1: PropertyValue,
    pub address2: PropertyValue,
    pub town: PropertyValue,
    pub postcode: PropertyValue,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct OpeningHours {
    pub monday_to_friday: PropertyValue,
    pub saturday: PropertyValue,
    pub sunday: PropertyValue,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct NearestPharmacy {
    pub pharmacy_name: PropertyValue,
    pub address: PharmacyAddress,
    pub distance_in_metres: f64,
}

#[derive(Debug, Serialize)]
pub(super) struct PharmacyAddress {
    pub address1: PropertyValue,
    pub address2: PropertyValue,
    pub address3: PropertyValue,
    pub postcode: PropertyValue,
}

#[derive(Debug, Serialize)]
pub(super) struct GpWithinRadiusResponse {
    pub gp_data: Vec<GpItem>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct GpItem {
    pub address1: PropertyValue,
    pub address2: PropertyValue,
    pub town: PropertyValue,
    pub postcode: PropertyValue,
    pub opening_hours: PropertyValue,
    pub saturday: PropertyValue,
    pub sunday: PropertyValue,
}

fn prop(feature: &Feature, key: &str) -> PropertyValue {
    feature.properties.get(key).clone()
}

impl From<Nearest<'_>> for NearestGp {
    fn from(hit: Nearest<'_>) -> Self {
        let gp = hit.feature;
        Self {
            name: prop(gp, "Address_1"),
            address: GpAddress {
                address1: prop(gp, "Address_1"),
                address2: prop(gp, "Address_2"),
                town: prop(gp, "Town"),
                postcode: prop(gp, "Postcode"),
            },
            opening_hours: OpeningHours {
                monday_to_friday: prop(gp, "opening_ho"),
                saturday: prop(gp, "Saturday"),
                sunday: prop(gp, "Sunday"),
            },
            distance_meters: hit.distance,
        }
    }
}

impl From<Nearest<'_>> for NearestPharmacy {
    fn from(hit: Nearest<'_>) -> Self {
        let pharmacy = hit.feature;
        Self {
            pharmacy_name: prop(pharmacy, "PharmacyName"),
            address: PharmacyAddress {
                address1: prop(pharmacy, "PharmacyAddress1"),
                address2: prop(pharmacy, "PharmacyAddress2"),
                address3: prop(pharmacy, "PharmacyAddress3"),
                postcode: prop(pharmacy, "Postcode"),
            },
            distance_in_metres: hit.distance,
        }
    }
}

impl From<&Feature> for GpItem {
    fn from(gp: &Feature) -> Self {
        Self {
            address1: prop(gp, "Address_1"),
            address2: prop(gp, "Address_2"),
            town: prop(gp, "Town"),
            postcode: prop(gp, "Postcode"),
            opening_hours: prop(gp, "opening_ho"),
            saturday: prop(gp, "Saturday"),
            sunday: prop(gp, "Sunday"),
        }
    }
}

pub(super) async fn nearest_gp_pharmacy(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    query: Result<Query<CoordinatesQuery>, QueryRejection>,
) -> Result<Json<NearestGpPharmacyResponse>, ApiError> {
    let Query(query) = query.map_err(|e| map_query_rejection(req_id.0.clone(), &e))?;
    let datasets = &state.datasets;

    let chain = QueryPoint::new(query.latitude, query.longitude)
        .and_then(|point| {
            ensure_available(datasets.gp_surgeries_metric())?;
            ensure_available(datasets.pharmacies_metric())?;
            let origin = point.project_to(datasets.metric_crs())?;
            nearest_chain(
                datasets.gp_surgeries_metric(),
                datasets.pharmacies_metric(),
                origin,
            )
        })
        .map_err(|e| map_query_error(req_id.0.clone(), &e))?;

    tracing::debug!(
        request_id = %req_id.0,
        gp_index = chain.first.index,
        pharmacy_index = chain.second.index,
        "resolved nearest gp and pharmacy"
    );

    Ok(Json(NearestGpPharmacyResponse {
        nearest_gp: chain.first.into(),
        nearest_pharmacy_from_gp: chain.second.into(),
    }))
}

pub(super) async fn gp_within_radius(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    query: Result<Query<RadiusQuery>, QueryRejection>,
) -> Result<Json<GpWithinRadiusResponse>, ApiError> {
    let Query(query) = query.map_err(|e| map_query_rejection(req_id.0.clone(), &e))?;
    let datasets = &state.datasets;

    let gps = QueryPoint::new(query.latitude, query.longitude)
        .and_then(|point| Ok((point, Radius::from_miles(query.radius)?)))
        .and_then(|(point, radius)| {
            ensure_available(datasets.gp_surgeries_metric())?;
            let centre = point.project_to(datasets.metric_crs())?;
            within_radius(datasets.gp_surgeries_metric(), centre, radius)
        })
        .map_err(|e| match e {
            QueryError::NoMatches => ApiError::new(req_id.0.clone(), "not_found", NO_GPS_IN_RADIUS),
            other => map_query_error(req_id.0.clone(), &other),
        })?;

    Ok(Json(GpWithinRadiusResponse {
        gp_data: gps.into_iter().map(GpItem::from).collect(),
    }))
}
