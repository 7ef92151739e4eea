mod facilities;
mod nature;
mod upload;

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, DefaultBodyLimit, State},
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use yorkgeo_spatial::{Datasets, QueryError};

use crate::middleware::{request_id, RequestId, REQUEST_ID_HEADER};

#[derive(Clone)]
pub struct AppState {
    pub datasets: Arc<Datasets>,
}

/// Error body returned by every endpoint.
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    pub code: &'static str,
    pub request_id: String,
}

#[derive(Debug, Serialize)]
struct Greeting {
    message: &'static str,
}

#[derive(Debug, Serialize)]
struct HealthData {
    status: &'static str,
    datasets: BTreeMap<String, usize>,
    checked_at: DateTime<Utc>,
}

impl ApiError {
    pub fn new(request_id: impl Into<String>, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            code,
            request_id: request_id.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.code {
            "validation_error" => StatusCode::BAD_REQUEST,
            "not_found" => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

/// Map a resolver, filter or aggregator failure onto the response contract.
///
/// Caller mistakes are logged at `warn`; everything else is a server-side
/// failure and logged at `error`.
pub(super) fn map_query_error(request_id: String, error: &QueryError) -> ApiError {
    match error {
        e if e.is_invalid_input() => {
            tracing::warn!(request_id = %request_id, error = %e, "rejected query parameters");
            ApiError::new(request_id, "validation_error", e.to_string())
        }
        QueryError::NoMatches => ApiError::new(request_id, "not_found", error.to_string()),
        QueryError::DataUnavailable { dataset } => {
            tracing::error!(request_id = %request_id, dataset = %dataset, "dataset is not available");
            ApiError::new(request_id, "data_unavailable", error.to_string())
        }
        e => {
            tracing::error!(request_id = %request_id, error = %e, "spatial query failed");
            ApiError::new(request_id, "internal_error", e.to_string())
        }
    }
}

pub(super) fn map_query_rejection(request_id: String, rejection: &QueryRejection) -> ApiError {
    tracing::warn!(request_id = %request_id, error = %rejection, "malformed query string");
    ApiError::new(request_id, "validation_error", rejection.body_text())
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static(REQUEST_ID_HEADER),
        ])
        .expose_headers([HeaderName::from_static(REQUEST_ID_HEADER)])
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route(
            "/nearest-gp-pharmacy",
            get(facilities::nearest_gp_pharmacy),
        )
        .route("/gp-within-radius", get(facilities::gp_within_radius))
        .route("/bins-in-nature-areas", get(nature::bins_in_nature_areas))
        .route(
            "/upload-geojson/",
            get(upload::upload_form)
                .post(upload::upload_geojson)
                .layer(DefaultBodyLimit::max(upload::BODY_LIMIT_BYTES)),
        )
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn root() -> Json<Greeting> {
    Json(Greeting {
        message: "Hello, world!",
    })
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let datasets: BTreeMap<String, usize> = state
        .datasets
        .feature_counts()
        .into_iter()
        .map(|(name, count)| (name.to_string(), count))
        .collect();

    let empty: Vec<&str> = datasets
        .iter()
        .filter(|(_, count)| **count == 0)
        .map(|(name, _)| name.as_str())
        .collect();

    let (status, label) = if empty.is_empty() {
        (StatusCode::OK, "ok")
    } else {
        tracing::warn!(request_id = %req_id.0, ?empty, "health check: datasets empty");
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    (
        status,
        Json(HealthData {
            status: label,
            datasets,
            checked_at: Utc::now(),
        }),
    )
}

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;
