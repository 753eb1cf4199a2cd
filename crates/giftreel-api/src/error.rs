//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use giftreel_media::MediaError;
use giftreel_models::{InputError, OutputArtifact};

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("Failed to fetch image: {url}")]
    UpstreamFetch { url: String, reason: String },

    #[error("{0}")]
    ResourceNotFound(String),

    #[error("Request body too large (limit {limit} bytes)")]
    PayloadTooLarge { limit: usize },

    #[error("Render failed: {0}")]
    Render(String),

    /// The video exists; only the email failed.
    #[error("Video rendered but email notification failed: {message}")]
    NotificationFailed {
        artifact: OutputArtifact,
        message: String,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn upstream_fetch(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::UpstreamFetch {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::ResourceNotFound(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidInput(_) | ApiError::UpstreamFetch { .. } => StatusCode::BAD_REQUEST,
            ApiError::ResourceNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Render(_) | ApiError::NotificationFailed { .. } | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::InvalidInput(_) => "invalid_input",
            ApiError::UpstreamFetch { .. } => "upstream_fetch",
            ApiError::ResourceNotFound(_) => "resource_not_found",
            ApiError::PayloadTooLarge { .. } => "payload_too_large",
            ApiError::Render(_) => "render",
            ApiError::NotificationFailed { .. } => "notification",
            ApiError::Internal(_) => "internal",
        }
    }
}

impl From<InputError> for ApiError {
    fn from(err: InputError) -> Self {
        Self::InvalidInput(err.to_string())
    }
}

impl From<MediaError> for ApiError {
    fn from(err: MediaError) -> Self {
        Self::Render(err.to_string())
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    video_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    video_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stage: Option<&'static str>,
}

impl ApiError {
    /// Build the JSON error response. Render and internal details are replaced
    /// with a generic message unless `expose_details` is set.
    pub fn into_response_with(self, expose_details: bool) -> Response {
        let status = self.status_code();

        let error = match &self {
            ApiError::Render(_) | ApiError::Internal(_) if !expose_details => {
                "An internal error occurred".to_string()
            }
            _ => self.to_string(),
        };

        let body = match self {
            ApiError::NotificationFailed { artifact, .. } => ErrorResponse {
                error,
                video_path: Some(artifact.path_string()),
                video_url: Some(artifact.url),
                stage: Some("notification"),
            },
            _ => ErrorResponse {
                error,
                video_url: None,
                video_path: None,
                stage: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.into_response_with(true)
    }
}
