//! Axum HTTP server for the birthday reel webhook.
//!
//! This crate provides:
//! - `POST /webhook`: fetch photos, render the reel, optionally email a link
//! - Static serving of rendered videos under `/videos`
//! - Liveness, health and Prometheus metrics endpoints

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;

pub use config::{AppConfig, ConfigError, SmtpConfig};
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use services::{DisabledNotifier, Notifier, NotifyError, SmtpNotifier, VideoResponse};
pub use state::AppState;
