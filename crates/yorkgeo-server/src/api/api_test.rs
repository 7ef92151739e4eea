use super::*;
use axum::body::{to_bytes, Body};
use axum::http::Request;
use serde_json::{json, Value};
use std::path::Path;
use tower::ServiceExt;
use yorkgeo_spatial::upload::MAX_UPLOAD_BYTES;
use yorkgeo_spatial::{BaseLayers, Crs, Layer};

const FIXTURES: &str = concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../yorkgeo-spatial/tests/fixtures"
);

fn fixture_layers() -> BaseLayers {
    BaseLayers::load(Path::new(FIXTURES)).expect("fixture datasets")
}

fn app_with(base: BaseLayers) -> Router {
    let datasets =
        Datasets::from_layers(base, Crs::BRITISH_NATIONAL_GRID).expect("metric projection");
    build_app(AppState {
        datasets: Arc::new(datasets),
    })
}

fn app() -> Router {
    app_with(fixture_layers())
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.expect("response");
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    let json = serde_json::from_slice(&body).expect("json body");
    (status, json)
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    send(
        app,
        Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("request"),
    )
    .await
}

const BOUNDARY: &str = "yorkgeo-test-boundary";

fn multipart_request(field: &str, file_name: &str, content: &[u8]) -> Request<Body> {
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri("/upload-geojson/")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .expect("request")
}

fn empty_layer(name: &str) -> Layer {
    Layer::new(name, Crs::WGS84, Vec::new())
}

#[test]
fn api_error_codes_map_to_statuses() {
    let status = |code| ApiError::new("req-1", code, "msg").into_response().status();
    assert_eq!(status("validation_error"), StatusCode::BAD_REQUEST);
    assert_eq!(status("not_found"), StatusCode::NOT_FOUND);
    assert_eq!(status("data_unavailable"), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(status("internal_error"), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn root_greets() {
    let (status, body) = get_json(app(), "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"message": "Hello, world!"}));
}

#[tokio::test]
async fn health_reports_feature_counts() {
    let (status, body) = get_json(app(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["datasets"]["GP"], 4);
    assert_eq!(body["datasets"]["Dog or Litter Bin"], 7);
    assert!(body["checked_at"].is_string());
}

#[tokio::test]
async fn health_is_degraded_when_a_dataset_is_empty() {
    let mut base = fixture_layers();
    base.nature_reserves = empty_layer("Nature Reserve");
    let (status, body) = get_json(app_with(base), "/health").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["datasets"]["Nature Reserve"], 0);
}

#[tokio::test]
async fn nearest_gp_then_pharmacy() {
    let (status, body) =
        get_json(app(), "/nearest-gp-pharmacy?latitude=53.9531&longitude=-1.0627").await;
    assert_eq!(status, StatusCode::OK);

    let gp = &body["nearest_gp"];
    assert_eq!(gp["name"], "Park View Surgery");
    assert_eq!(gp["address"]["address1"], "Park View Surgery");
    assert_eq!(gp["address"]["postcode"], "YO10 3AF");
    assert_eq!(gp["opening_hours"]["mondayToFriday"], "08:00 - 18:00");
    let distance = gp["distance_meters"].as_f64().expect("distance");
    assert!((distance - 368.0).abs() < 5.0, "distance {distance}");

    let pharmacy = &body["nearest_pharmacy_from_gp"];
    assert_eq!(pharmacy["pharmacyName"], "Whitworth Chemists Ltd");
    assert_eq!(pharmacy["address"]["address2"], Value::Null);
    assert!(pharmacy["distanceInMetres"].as_f64().expect("distance") < 150.0);
}

#[tokio::test]
async fn nearest_rejects_out_of_range_coordinates() {
    let request = Request::builder()
        .uri("/nearest-gp-pharmacy?latitude=91&longitude=0")
        .header(REQUEST_ID_HEADER, "req-lat")
        .body(Body::empty())
        .expect("request");
    let (status, body) = send(app(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({
            "error": "Invalid latitude or longitude.",
            "code": "validation_error",
            "request_id": "req-lat"
        })
    );
}

#[tokio::test]
async fn nearest_rejects_malformed_query() {
    let (status, body) = get_json(app(), "/nearest-gp-pharmacy?latitude=north").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");
}

#[tokio::test]
async fn nearest_fails_when_pharmacies_are_empty() {
    let mut base = fixture_layers();
    base.pharmacies = empty_layer("Pharmacy");
    let (status, body) = get_json(
        app_with(base),
        "/nearest-gp-pharmacy?latitude=53.9531&longitude=-1.0627",
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Pharmacy data not available");
    assert_eq!(body["code"], "data_unavailable");
}

#[tokio::test]
async fn radius_lists_gps_in_dataset_order() {
    let (status, body) = get_json(
        app(),
        "/gp-within-radius?latitude=53.9531&longitude=-1.0627&radius=1",
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let gps = body["gp_data"].as_array().expect("gp_data");
    let names: Vec<_> = gps.iter().map(|gp| gp["address1"].as_str().unwrap()).collect();
    assert_eq!(
        names,
        ["Park View Surgery", "Heworth Green Surgery", "Fishergate Surgery"]
    );
    assert_eq!(gps[1]["address2"], Value::Null);
    assert_eq!(gps[0]["openingHours"], "08:00 - 18:00");
    assert_eq!(gps[0]["saturday"], "Closed");
}

#[tokio::test]
async fn radius_must_be_positive() {
    for radius in ["0", "-2"] {
        let uri = format!("/gp-within-radius?latitude=53.9531&longitude=-1.0627&radius={radius}");
        let (status, body) = get_json(app(), &uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid radius.");
    }
}

#[tokio::test]
async fn coordinates_are_checked_before_radius() {
    let (status, body) = get_json(
        app(),
        "/gp-within-radius?latitude=53.9531&longitude=200&radius=0",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid latitude or longitude.");
}

#[tokio::test]
async fn empty_radius_is_not_found() {
    let (status, body) = get_json(
        app(),
        "/gp-within-radius?latitude=53.9531&longitude=-1.0627&radius=0.1",
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "No GPs found within the specified radius");
    assert_eq!(body["code"], "not_found");
}

#[tokio::test]
async fn bins_are_counted_per_area() {
    let (status, body) = get_json(app(), "/bins-in-nature-areas").await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(
        body["nature_reserve_bin_count"][0],
        json!({
            "type": "Nature Reserve",
            "name": "St Nicholas Fields",
            "details": "Local Nature Reserve",
            "description": "Former brick works and landfill site",
            "binCount": 3
        })
    );
    assert_eq!(body["nature_reserve_bin_count"][1]["binCount"], 1);
    assert_eq!(body["nature_reserve_bin_count"][1]["description"], Value::Null);

    let areas = body["conservation_area_bin_count"].as_array().expect("areas");
    assert_eq!(areas.len(), 2);
    assert_eq!(
        areas[1],
        json!({"type": "Conservation Area", "name": "Heworth Green", "binCount": 0})
    );
}

#[tokio::test]
async fn bins_fail_when_conservation_areas_are_empty() {
    let mut base = fixture_layers();
    base.conservation_areas = empty_layer("Conservation Area");
    let (status, body) = get_json(app_with(base), "/bins-in-nature-areas").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Conservation Area data not available");
}

#[tokio::test]
async fn upload_form_is_served() {
    let response = app()
        .oneshot(
            Request::builder()
                .uri("/upload-geojson/")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    let html = String::from_utf8(body.to_vec()).expect("utf8");
    assert!(html.contains(r#"name="file""#));
    assert!(html.contains(r#"accept=".geojson""#));
}

#[tokio::test]
async fn upload_is_summarized() {
    let content = json!({
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "geometry": {"type": "Point", "coordinates": [-1.0627, 53.9531]},
             "properties": {"name": "Walmgate Bar"}},
            {"type": "Feature", "geometry": {"type": "Point", "coordinates": [-1.08, 53.96]},
             "properties": {"name": "Minster", "ward": "Guildhall"}}
        ]
    });
    let request = multipart_request("file", "york.geojson", content.to_string().as_bytes());
    let (status, body) = send(app(), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "rows": 2,
            "columns": ["name", "ward"],
            "crs": "N/A",
            "geometry_types": ["Point"]
        })
    );
}

#[tokio::test]
async fn upload_at_size_cap_is_too_large() {
    let content = vec![b' '; MAX_UPLOAD_BYTES];
    let request = multipart_request("file", "big.geojson", &content);
    let (status, body) = send(app(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "File is too large.");
    assert_eq!(body["code"], "validation_error");
}

#[tokio::test]
async fn upload_just_under_size_cap_is_summarized() {
    let mut content = b"{\"features\": []}".to_vec();
    content.resize(MAX_UPLOAD_BYTES - 20, b' ');
    let request = multipart_request("file", "big.geojson", &content);
    let (status, body) = send(app(), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rows"], 0);
    assert_eq!(body["crs"], "N/A");
}

#[tokio::test]
async fn cors_preflight_allows_upload() {
    let response = app()
        .oneshot(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/upload-geojson/")
                .header(header::ORIGIN, "https://example.org")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .expect("allow origin"),
        "*"
    );
}

#[tokio::test]
async fn upload_requires_geojson_extension() {
    let request = multipart_request("file", "york.json", b"{\"features\": []}");
    let (status, body) = send(app(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Uploaded file must be a valid GeoJSON file.");
}

#[tokio::test]
async fn upload_without_features_is_rejected() {
    let request = multipart_request("file", "york.geojson", b"{\"type\": \"FeatureCollection\"}");
    let (status, body) = send(app(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Uploaded file is not a valid GeoJSON file.");
}

#[tokio::test]
async fn upload_of_non_json_is_rejected() {
    let request = multipart_request("file", "york.geojson", b"not json at all");
    let (status, body) = send(app(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
    assert_eq!(body["code"], "validation_error");
}

#[tokio::test]
async fn upload_without_file_field_is_rejected() {
    let request = multipart_request("attachment", "york.geojson", b"{\"features\": []}");
    let (status, body) = send(app(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No file uploaded.");
}

#[tokio::test]
async fn responses_carry_request_id() {
    let response = app()
        .oneshot(
            Request::builder()
                .uri("/gp-within-radius?latitude=53.9531&longitude=-1.0627&radius=0.1")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    let header = response
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .expect("request id header")
        .to_string();
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    let json: Value = serde_json::from_slice(&body).expect("json body");
    assert_eq!(json["request_id"], header);
}
