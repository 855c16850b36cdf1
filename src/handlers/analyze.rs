use crate::dtos::AnalysisResponse;
use crate::error::AppError;
use crate::services::PageSummary;
use crate::startup::AppState;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::response::IntoResponse;
use axum::Json;

/// Form field that must carry the uploaded image.
const IMAGE_FIELD: &str = "image";

/// Accepts a multipart upload, runs landmark detection on the image and
/// enriches the first detection with a Wikipedia summary.
///
/// The multipart extractor is taken as a `Result` so that malformed or
/// non-multipart bodies produce the same 400 response as a missing field,
/// before any detection call is made.
pub async fn analyze_image(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, AppError> {
    let image = read_image_field(multipart).await?;

    let detections = state.detector.detect(&image).await.map_err(|e| {
        tracing::error!("Landmark detection failed: {}", e);
        metrics::counter!("analyze_requests_total", "outcome" => "error").increment(1);
        AppError::Detection(e)
    })?;

    // The first detection is the most confident one; the rest are ignored.
    let Some(detection) = detections.into_iter().next() else {
        tracing::info!("No landmarks detected in uploaded image");
        metrics::counter!("analyze_requests_total", "outcome" => "no_landmarks").increment(1);
        return Err(AppError::NoLandmarks);
    };

    tracing::info!(landmark = %detection.name, "Landmark detected");
    metrics::counter!("landmarks_detected_total").increment(1);

    // A failed summary lookup never fails the request.
    let summary = match state.wikipedia.lookup(&detection.name).await {
        Ok(summary) => summary,
        Err(e) => {
            tracing::warn!(landmark = %detection.name, "Wikipedia lookup failed: {}", e);
            metrics::counter!("wikipedia_lookup_fallbacks_total").increment(1);
            PageSummary::unavailable()
        }
    };

    metrics::counter!("analyze_requests_total", "outcome" => "ok").increment(1);
    Ok(Json(AnalysisResponse::new(detection, summary)))
}

/// Pulls the bytes of the `image` field out of the multipart body.
///
/// Every failure path maps to [`AppError::MissingImage`]: a body that is
/// not multipart at all, a body without the field, or a field whose bytes
/// cannot be read. Unrelated fields are skipped.
async fn read_image_field(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Vec<u8>, AppError> {
    let mut multipart = multipart.map_err(|e| {
        tracing::warn!("Rejected non-multipart request: {}", e);
        AppError::MissingImage
    })?;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => {
                tracing::warn!("Multipart request without an '{}' field", IMAGE_FIELD);
                return Err(AppError::MissingImage);
            }
            Err(e) => {
                tracing::warn!("Failed to read multipart body: {}", e);
                return Err(AppError::MissingImage);
            }
        };

        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        return field.bytes().await.map(|b| b.to_vec()).map_err(|e| {
            tracing::warn!("Failed to read image bytes: {}", e);
            AppError::MissingImage
        });
    }
}
