use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Path, State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;

use crate::{
    errors::{AppError, BODY_INVALID, DOUBLE_REPORT, PROCESSING_FAILED},
    gemini::{ValueExtractor, sniff_mime},
    models::{UploadRequest, UploadResponse},
    readings::ReadingRepository,
    temp_store::TempImageStore,
    validation::validate,
};

pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;
pub const TEMP_IMAGE_CONTENT_TYPE: &str = "image/jpeg";

#[derive(Clone)]
pub struct AppState {
    pub images: Arc<TempImageStore>,
    pub readings: Arc<dyn ReadingRepository>,
    pub extractor: Arc<dyn ValueExtractor>,
    /// Put the extractor's error text in 500 bodies; otherwise only a reference id.
    pub expose_error_details: bool,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(banner))
        .route("/upload", post(upload))
        .route("/temp/:id", get(get_temp_image))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}

pub async fn banner(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({ "message": format!("Server is running on {}", state.images.base_url()) }))
}

pub async fn upload(
    State(state): State<AppState>,
    payload: Result<Json<UploadRequest>, JsonRejection>,
) -> Result<Json<UploadResponse>, AppError> {
    let Json(body) = payload.map_err(|rejection| {
        tracing::warn!("⚠️ Rejected upload body: {}", rejection.body_text());
        let status = match rejection.status() {
            StatusCode::PAYLOAD_TOO_LARGE => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::BAD_REQUEST,
        };
        AppError::InvalidData { status, description: BODY_INVALID.into() }
    })?;

    let upload = validate(body).inspect_err(|e| tracing::info!("⚠️ Invalid upload: {}", e))?;

    if state.readings.exists(&upload.customer_code, &upload.measured_at, upload.measure_type).await {
        tracing::info!(customer = %upload.customer_code, kind = %upload.measure_type, "🔁 {}", DOUBLE_REPORT);
        return Err(AppError::DoubleReport);
    }

    let mime_type = sniff_mime(&upload.image_bytes);
    tracing::info!("🚀 Reading {} meter for customer {}", upload.measure_type, upload.customer_code);

    let measure_value = match state.extractor.extract(&upload.image, mime_type, upload.measure_type).await {
        Ok(value) => value,
        Err(e) => {
            let reference = Uuid::new_v4();
            tracing::error!(%reference, "❌ Failed to extract meter value: {}", e);
            let description = if state.expose_error_details {
                format!("{}: {}", PROCESSING_FAILED, e)
            } else {
                format!("{} (ref: {})", PROCESSING_FAILED, reference)
            };
            return Err(AppError::Internal(description));
        }
    };

    let handle = state.images.put(upload.image_bytes);
    state.readings.record(&upload.customer_code, &upload.measured_at, upload.measure_type).await;
    tracing::info!(id = %handle.id, "✅ Stored temporary image ({} in store)", state.images.len());

    Ok(Json(UploadResponse {
        image_url: handle.url,
        measure_value,
        measure_uuid: handle.id.to_string(),
    }))
}

pub async fn get_temp_image(Path(id): Path<String>, State(state): State<AppState>) -> Result<Response, AppError> {
    let id = Uuid::parse_str(&id).map_err(|_| AppError::NotFound)?;
    let image = state.images.get(&id).ok_or(AppError::NotFound)?;
    let headers = [
        (header::CONTENT_TYPE, TEMP_IMAGE_CONTENT_TYPE.to_string()),
        (header::CONTENT_LENGTH, image.bytes.len().to_string()),
    ];
    Ok((StatusCode::OK, headers, image.bytes).into_response())
}
