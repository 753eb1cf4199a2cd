//! The webhook pipeline: validate, fetch, plan, render, publish, notify.

use std::time::Instant;

use serde::Serialize;
use tempfile::TempDir;
use tracing::{error, info, warn};

use giftreel_media::{move_file, plan_timeline, RenderJob};
use giftreel_models::{output_file_name, OutputArtifact, VideoRequest, WebhookPayload};

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::services::assets::{fetch_photos, resolve_audio};
use crate::state::AppState;

/// Success body of `POST /webhook`.
#[derive(Debug, Serialize)]
pub struct VideoResponse {
    pub status: &'static str,
    pub video_url: String,
    pub video_path: String,
    pub nickname: String,
    #[serde(rename = "bondWord")]
    pub bond_word: String,
    pub song: String,
    pub photo_count: usize,
    /// Seconds
    pub duration: f64,
    pub email_sent: bool,
}

impl VideoResponse {
    fn new(request: &VideoRequest, artifact: &OutputArtifact, email_sent: bool) -> Self {
        Self {
            status: "success",
            video_url: artifact.url.clone(),
            video_path: artifact.path_string(),
            nickname: request.nickname.clone(),
            bond_word: request.bond_word.clone(),
            song: request.song.clone(),
            photo_count: request.photo_count(),
            duration: artifact.duration,
            email_sent,
        }
    }
}

/// Parse a raw webhook body into a validated request.
pub fn parse_request(body: &[u8]) -> ApiResult<VideoRequest> {
    let request = WebhookPayload::from_json(body)?.into_request()?;
    Ok(request)
}

/// Run the whole pipeline for one request.
pub async fn create_video(state: &AppState, request: VideoRequest) -> ApiResult<VideoResponse> {
    let start = Instant::now();
    let config = &state.config;

    info!(
        nickname = %request.nickname,
        song = %request.song,
        photos = request.photo_count(),
        "Creating birthday video"
    );

    let audio = resolve_audio(&config.mp3s_dir, &request).await?;

    // Removed on drop, whichever way this function returns
    let work_dir = TempDir::with_prefix("giftreel-")
        .map_err(|e| ApiError::internal(format!("Failed to create temp dir: {}", e)))?;

    let photos = fetch_photos(
        &state.http,
        &request.photo_urls,
        work_dir.path(),
        config.fetch_timeout,
    )
    .await?;

    let timeline = plan_timeline(&request, &config.timeline_config())?;
    let duration = timeline.total_duration();

    let file_name = output_file_name();
    let job = RenderJob {
        timeline,
        photos,
        audio,
        output: work_dir.path().join(&file_name),
        work_dir: work_dir.path().join("overlays"),
    };

    {
        let _slot = state
            .render_slots
            .acquire()
            .await
            .map_err(|e| ApiError::internal(format!("Render queue closed: {}", e)))?;

        let render_start = Instant::now();
        if let Err(e) = state.renderer.render(&job).await {
            error!(error = %e.detail(), "Render failed");
            return Err(e.into());
        }
        metrics::record_render(request.photo_count(), render_start.elapsed().as_secs_f64());
    }

    let published = config.videos_dir.join(&file_name);
    move_file(&job.output, &published).await?;

    let url = config
        .video_url(&file_name)
        .map_err(|e| ApiError::internal(format!("Failed to build video URL: {}", e)))?;

    let artifact = OutputArtifact {
        file_name,
        path: published,
        url,
        duration,
    };

    info!(
        path = %artifact.path.display(),
        duration = artifact.duration,
        elapsed_secs = start.elapsed().as_secs_f64(),
        "Video published"
    );

    let email_sent = notify(state, &request, &artifact).await?;

    Ok(VideoResponse::new(&request, &artifact, email_sent))
}

/// Email the link if the request asked for it. Errors keep the artifact.
async fn notify(
    state: &AppState,
    request: &VideoRequest,
    artifact: &OutputArtifact,
) -> ApiResult<bool> {
    let Some(email) = request.email.as_deref() else {
        return Ok(false);
    };

    if !state.notifier.is_enabled() {
        warn!(to = %email, "Email requested but notifications are disabled");
        return Ok(false);
    }

    match state
        .notifier
        .send_video_link(email, &request.nickname, &artifact.url)
        .await
    {
        Ok(()) => {
            metrics::record_notification(true);
            Ok(true)
        }
        Err(e) => {
            metrics::record_notification(false);
            error!(to = %email, error = %e, "Notification failed after render");
            Err(ApiError::NotificationFailed {
                artifact: artifact.clone(),
                message: e.to_string(),
            })
        }
    }
}
