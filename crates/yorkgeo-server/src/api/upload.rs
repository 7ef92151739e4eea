use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart,
    },
    http::StatusCode,
    response::Html,
    Extension, Json,
};
use yorkgeo_spatial::upload::{check_file_name, check_size, summarize, MAX_UPLOAD_BYTES};
use yorkgeo_spatial::{UploadError, UploadSummary};

use crate::middleware::RequestId;

use super::ApiError;

/// Name of the multipart field carrying the file.
const FILE_FIELD: &str = "file";

/// Request body cap for the upload route: the file cap plus room for the
/// multipart framing, so an oversized file fails inside the handler.
pub(super) const BODY_LIMIT_BYTES: usize = MAX_UPLOAD_BYTES + 1024 * 1024;

const UPLOAD_FORM: &str = r#"<html>
    <body>
        <h2>Upload a GeoJSON file</h2>
        <form action="/upload-geojson/" method="post" enctype="multipart/form-data">
            <input type="file" name="file" accept=".geojson" required>
            <input type="submit" value="Upload">
        </form>
    </body>
</html>
"#;

pub(super) async fn upload_form() -> Html<&'static str> {
    Html(UPLOAD_FORM)
}

fn map_upload_error(request_id: String, error: &UploadError) -> ApiError {
    if error.is_invalid_input() {
        tracing::warn!(request_id = %request_id, error = %error, "rejected upload");
        ApiError::new(request_id, "validation_error", error.to_string())
    } else {
        tracing::error!(request_id = %request_id, error = %error, "failed to summarize upload");
        ApiError::new(request_id, "internal_error", error.to_string())
    }
}

fn map_multipart_error(request_id: String, error: &MultipartError) -> ApiError {
    if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return map_upload_error(
            request_id,
            &UploadError::TooLarge {
                size: BODY_LIMIT_BYTES,
            },
        );
    }
    tracing::warn!(request_id = %request_id, error = %error, "malformed multipart body");
    ApiError::new(request_id, "validation_error", error.body_text())
}

/// Summarize the first `file` field of a multipart upload.
///
/// The name is checked before any content is read, and the size is checked
/// as each chunk arrives.
pub(super) async fn upload_geojson(
    Extension(req_id): Extension<RequestId>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadSummary>, ApiError> {
    let mut multipart = multipart.map_err(|e| {
        tracing::warn!(request_id = %req_id.0, error = %e, "upload is not multipart");
        ApiError::new(req_id.0.clone(), "validation_error", e.body_text())
    })?;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| map_multipart_error(req_id.0.clone(), &e))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        check_file_name(&file_name).map_err(|e| map_upload_error(req_id.0.clone(), &e))?;

        let mut content = Vec::new();
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| map_multipart_error(req_id.0.clone(), &e))?
        {
            check_size(content.len() + chunk.len())
                .map_err(|e| map_upload_error(req_id.0.clone(), &e))?;
            content.extend_from_slice(&chunk);
        }

        let summary = summarize(&content).map_err(|e| map_upload_error(req_id.0.clone(), &e))?;
        tracing::info!(
            request_id = %req_id.0,
            file_name = %file_name,
            rows = summary.rows,
            bytes = content.len(),
            "summarized upload"
        );
        return Ok(Json(summary));
    }

    tracing::warn!(request_id = %req_id.0, "upload has no file field");
    Err(ApiError::new(req_id.0, "validation_error", "No file uploaded."))
}
