//! Request validation errors.

use thiserror::Error;

/// Result type for request validation.
pub type InputResult<T> = Result<T, InputError>;

/// Errors raised while turning a webhook payload into a [`crate::VideoRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("Missing song or photos")]
    MissingSongOrPhotos,

    #[error("Invalid song name: {0}")]
    InvalidSong(String),

    #[error("Invalid request body: {0}")]
    MalformedBody(String),
}
