//! Application state.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::info;

use giftreel_media::{FfmpegRenderer, Renderer};

use crate::config::AppConfig;
use crate::services::{DisabledNotifier, Notifier, SmtpNotifier};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub renderer: Arc<dyn Renderer>,
    pub notifier: Arc<dyn Notifier>,
    pub http: reqwest::Client,
    /// Bounds concurrent FFmpeg processes
    pub render_slots: Arc<Semaphore>,
}

impl AppState {
    /// Create the production state: FFmpeg renderer and SMTP notifier when configured.
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        let renderer = FfmpegRenderer::new(config.encoding_config())
            .with_font_file(config.font_file.clone())
            .with_timeout(config.render_timeout_secs);

        let notifier: Arc<dyn Notifier> = match &config.smtp {
            Some(smtp) => {
                info!(host = %smtp.host, port = smtp.port, "Email notifications enabled");
                Arc::new(SmtpNotifier::new(smtp)?)
            }
            None => Arc::new(DisabledNotifier),
        };

        Self::with_parts(config, Arc::new(renderer), notifier)
    }

    /// Assemble state from explicit parts.
    pub fn with_parts(
        config: AppConfig,
        renderer: Arc<dyn Renderer>,
        notifier: Arc<dyn Notifier>,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("giftreel/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let render_slots = Arc::new(Semaphore::new(config.max_concurrent_renders));

        Ok(Self {
            config,
            renderer,
            notifier,
            http,
            render_slots,
        })
    }
}
