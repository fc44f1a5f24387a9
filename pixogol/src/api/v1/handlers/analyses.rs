use axum::extract::{Multipart, State};

use crate::api::state::AppState;
use crate::api::v1::dto::AnalysisResponse;
use crate::api::v1::response::{ApiError, ApiResponse, ErrorCode};
use crate::models::{AnalysisOrigin, ImageUpload};

/// `POST /api/v1/analyses:upload`
///
/// Accepts a multipart form with a `file` field holding a PNG, JPEG, GIF,
/// BMP or TIFF image. Runs OCR and the risk assessment synchronously and
/// returns 201 with the report once the audit record is written.
#[utoipa::path(
    post,
    path = "/api/v1/analyses:upload",
    tag = "analyses",
    operation_id = "analyses.upload",
    request_body(content_type = "multipart/form-data", content = String, description = "Image upload in the `file` field"),
    responses(
        (status = 201, description = "Analysis completed and recorded", body = AnalysisResponse),
        (status = 400, description = "Missing, empty, oversized or unsupported file", body = ApiError),
        (status = 401, description = "Missing or invalid API key", body = ApiError),
        (status = 429, description = "Model provider rate limit", body = ApiError),
        (status = 502, description = "OCR or model provider failed", body = ApiError),
        (status = 503, description = "Model API key or OCR backend not configured", body = ApiError),
    )
)]
pub async fn upload_analysis(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResponse<AnalysisResponse> {
    let mut file_bytes: Option<Vec<u8>> = None;
    let mut file_name: Option<String> = None;
    let mut file_content_type: Option<String> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                return ApiResponse::error(
                    ErrorCode::InvalidRequest,
                    format!("Invalid multipart body: {e}"),
                );
            }
        };

        if field.name() != Some("file") {
            continue;
        }

        file_name = field.file_name().map(str::to_string);
        file_content_type = field.content_type().map(str::to_string);

        match field.bytes().await {
            Ok(bytes) => file_bytes = Some(bytes.to_vec()),
            Err(e) => {
                return ApiResponse::error(
                    ErrorCode::InvalidRequest,
                    format!("Failed to read file: {e}"),
                );
            }
        }
    }

    let Some(bytes) = file_bytes else {
        return ApiResponse::error(ErrorCode::InvalidRequest, "Missing required 'file' field");
    };

    let upload = match ImageUpload::validate(
        bytes,
        file_name.as_deref(),
        file_content_type.as_deref(),
        state.config.server.max_upload_bytes,
    ) {
        Ok(upload) => upload,
        Err(e) => {
            tracing::info!(error = %e, "Upload rejected");
            return e.into();
        }
    };

    match state.analysis.analyze(upload, AnalysisOrigin::Http).await {
        Ok(report) => ApiResponse::created(AnalysisResponse::from(report)),
        Err(e) => e.into(),
    }
}
