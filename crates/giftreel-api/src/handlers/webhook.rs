//! `POST /webhook`.

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::warn;

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::services::{create_video, parse_request, VideoResponse};
use crate::state::AppState;

/// Render a birthday video from the JSON payload.
///
/// The body is taken as raw bytes so malformed JSON and oversized bodies get
/// the same `{"error": ...}` shape as every other failure.
pub async fn webhook(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    match handle(&state, body).await {
        Ok(response) => Json(response).into_response(),
        Err(e) => {
            metrics::record_webhook_failure(e.kind());
            warn!(kind = e.kind(), status = %e.status_code(), error = %e, "Webhook request failed");
            e.into_response_with(!state.config.is_production())
        }
    }
}

async fn handle(
    state: &AppState,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<VideoResponse> {
    let body = body.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge {
                limit: state.config.max_body_size,
            }
        } else {
            ApiError::invalid_input(rejection.body_text())
        }
    })?;

    let request = parse_request(&body)?;
    create_video(state, request).await
}
