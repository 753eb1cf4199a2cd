//! Router-level tests for the webhook pipeline.
//!
//! FFmpeg and SMTP are swapped for in-process fakes; photo hosts are
//! `wiremock` servers.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use giftreel_api::{create_router, AppConfig, AppState, DisabledNotifier, Notifier, NotifyError};
use giftreel_media::{check_audio_fit, MediaError, MediaResult, RenderJob, Renderer};
use giftreel_models::AudioFit;

#[derive(Default)]
struct FakeRenderer {
    fail: bool,
    /// Length of the song as ffprobe would report it; checked with `AudioFit::Reject`
    audio_secs: Option<f64>,
    jobs: Mutex<Vec<RenderJob>>,
}

#[async_trait]
impl Renderer for FakeRenderer {
    async fn render(&self, job: &RenderJob) -> MediaResult<()> {
        assert!(job.audio.exists(), "audio resolved before render");
        for photo in &job.photos {
            assert!(photo.exists(), "photo {} downloaded", photo.display());
        }
        self.jobs.lock().unwrap().push(job.clone());

        if let Some(secs) = self.audio_secs {
            check_audio_fit(AudioFit::Reject, secs, job.timeline.total_duration())?;
        }
        if self.fail {
            return Err(MediaError::ffmpeg_failed("encoder exploded", None, Some(1)));
        }
        tokio::fs::write(&job.output, b"fake mp4").await?;
        Ok(())
    }
}

#[derive(Default)]
struct FakeNotifier {
    fail: bool,
    sent: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl Notifier for FakeNotifier {
    fn is_enabled(&self) -> bool {
        true
    }

    async fn send_video_link(
        &self,
        to: &str,
        _nickname: &str,
        video_url: &str,
    ) -> Result<(), NotifyError> {
        if self.fail {
            return Err(NotifyError::Transport("connection refused".to_string()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), video_url.to_string()));
        Ok(())
    }
}

struct TestApp {
    root: TempDir,
    renderer: Arc<FakeRenderer>,
    router: Router,
}

impl TestApp {
    fn new(renderer: FakeRenderer, notifier: Arc<dyn Notifier>) -> Self {
        Self::with_config(renderer, notifier, |_| {})
    }

    fn with_config(
        renderer: FakeRenderer,
        notifier: Arc<dyn Notifier>,
        configure: impl FnOnce(&mut AppConfig),
    ) -> Self {
        let root = TempDir::new().unwrap();
        let mut config = AppConfig {
            videos_dir: root.path().join("videos"),
            mp3s_dir: root.path().join("mp3s"),
            crossfade_seed: Some(7),
            ..AppConfig::default()
        };
        configure(&mut config);
        std::fs::create_dir_all(&config.videos_dir).unwrap();
        std::fs::create_dir_all(&config.mp3s_dir).unwrap();
        std::fs::write(config.mp3s_dir.join("happybday.mp3"), b"ID3").unwrap();

        let renderer = Arc::new(renderer);
        let state = AppState::with_parts(config, renderer.clone(), notifier).unwrap();

        Self {
            root,
            renderer,
            router: create_router(state, None),
        }
    }

    fn basic() -> Self {
        Self::new(FakeRenderer::default(), Arc::new(DisabledNotifier))
    }

    fn videos_dir(&self) -> std::path::PathBuf {
        self.root.path().join("videos")
    }

    fn render_count(&self) -> usize {
        self.renderer.jobs.lock().unwrap().len()
    }

    async fn post(&self, body: impl Into<Body>) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/webhook")
                    .header("content-type", "application/json")
                    .body(body.into())
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn post_json(&self, payload: Value) -> (StatusCode, Value) {
        self.post(payload.to_string()).await
    }
}

async fn photo_server(photos: &[&str]) -> MockServer {
    let server = MockServer::start().await;
    for photo in photos {
        Mock::given(method("GET"))
            .and(path(format!("/{}", photo)))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/jpeg")
                    .set_body_bytes(b"\xFF\xD8\xFF\xE0fake".to_vec()),
            )
            .mount(&server)
            .await;
    }
    server
}

fn urls(server: &MockServer, photos: &[&str]) -> String {
    photos
        .iter()
        .map(|p| format!("{}/{}", server.uri(), p))
        .collect::<Vec<_>>()
        .join(",")
}

fn video_files(dir: &Path) -> Vec<String> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect()
}

#[tokio::test]
async fn test_index_liveness() {
    let app = TestApp::basic();
    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], "🎉 Birthday Video Generator is Live!".as_bytes());
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = TestApp::basic();
    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_happy_path_renders_and_publishes() {
    let photos = ["a.jpg", "b.jpg", "c.jpg"];
    let server = photo_server(&photos).await;
    let app = TestApp::basic();

    let (status, body) = app
        .post_json(json!({
            "songChoice": "happybday",
            "photoURLs": urls(&server, &photos),
            "nickname": "Sam"
        }))
        .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["status"], "success");
    assert_eq!(body["nickname"], "Sam");
    assert_eq!(body["bondWord"], "Bestie");
    assert_eq!(body["song"], "happybday");
    assert_eq!(body["photo_count"], 3);
    assert_eq!(body["duration"], 27.0);
    assert_eq!(body["email_sent"], false);

    let url = body["video_url"].as_str().unwrap();
    assert!(url.starts_with("http://localhost:5000/videos/output_"));
    assert!(url.ends_with(".mp4"));

    let files = video_files(&app.videos_dir());
    assert_eq!(files.len(), 1);
    assert!(url.ends_with(&files[0]));
    assert!(body["video_path"].as_str().unwrap().ends_with(&files[0]));

    let jobs = app.renderer.jobs.lock().unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].timeline.segments.len(), 4);
    // Scratch space is gone once the request finishes
    assert!(!jobs[0].photos[0].exists());
}

#[tokio::test]
async fn test_published_video_is_served() {
    let photos = ["a.jpg"];
    let server = photo_server(&photos).await;
    let app = TestApp::basic();

    let (status, body) = app
        .post_json(json!({"song": "happybday", "photoURLs": urls(&server, &photos)}))
        .await;
    assert_eq!(status, StatusCode::OK);

    let file = video_files(&app.videos_dir()).remove(0);
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/videos/{}", file))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body["video_url"].as_str().unwrap().ends_with(&file));
}

#[tokio::test]
async fn test_missing_song_is_404() {
    let app = TestApp::basic();

    let (status, body) = app
        .post_json(json!({"song": "missing", "photoURLs": "http://127.0.0.1:9/a.jpg"}))
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Song 'missing.mp3' not found in mp3s folder.");
    assert_eq!(app.render_count(), 0);
}

#[tokio::test]
async fn test_empty_photos_is_400() {
    let app = TestApp::basic();

    let (status, body) = app
        .post_json(json!({"song": "happybday", "photoURLs": " , "}))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing song or photos");
}

#[tokio::test]
async fn test_missing_song_field_is_400() {
    let app = TestApp::basic();
    let (status, body) = app.post_json(json!({"photoURLs": "http://x/a.jpg"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing song or photos");
}

#[tokio::test]
async fn test_malformed_json_is_400() {
    let app = TestApp::basic();
    let (status, body) = app.post("{not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_failed_photo_is_400_and_writes_nothing() {
    let server = photo_server(&["a.jpg"]).await;
    Mock::given(method("GET"))
        .and(path("/gone.jpg"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    let app = TestApp::basic();
    let bad = format!("{}/gone.jpg", server.uri());

    let (status, body) = app
        .post_json(json!({
            "song": "happybday",
            "photoURLs": format!("{}/a.jpg,{}", server.uri(), bad)
        }))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], format!("Failed to fetch image: {}", bad));
    assert_eq!(app.render_count(), 0);
    assert!(video_files(&app.videos_dir()).is_empty());
}

#[tokio::test]
async fn test_render_failure_is_500_and_writes_nothing() {
    let photos = ["a.jpg", "b.jpg"];
    let server = photo_server(&photos).await;
    let app = TestApp::new(
        FakeRenderer {
            fail: true,
            ..FakeRenderer::default()
        },
        Arc::new(DisabledNotifier),
    );

    let (status, body) = app
        .post_json(json!({"song": "happybday", "photoURLs": urls(&server, &photos)}))
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].is_string());
    assert!(body.get("video_url").is_none());
    assert!(video_files(&app.videos_dir()).is_empty());
}

#[tokio::test]
async fn test_email_sent_with_video_link() {
    let photos = ["a.jpg"];
    let server = photo_server(&photos).await;
    let notifier = Arc::new(FakeNotifier::default());
    let app = TestApp::new(FakeRenderer::default(), notifier.clone());

    let (status, body) = app
        .post_json(json!({
            "song": "happybday",
            "photoURLs": urls(&server, &photos),
            "email": "sam@example.com"
        }))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email_sent"], true);
    let sent = notifier.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "sam@example.com");
    assert_eq!(sent[0].1, body["video_url"].as_str().unwrap());
}

#[tokio::test]
async fn test_email_failure_keeps_video_url() {
    let photos = ["a.jpg", "b.jpg"];
    let server = photo_server(&photos).await;
    let app = TestApp::new(
        FakeRenderer::default(),
        Arc::new(FakeNotifier {
            fail: true,
            ..FakeNotifier::default()
        }),
    );

    let (status, body) = app
        .post_json(json!({
            "song": "happybday",
            "photoURLs": urls(&server, &photos),
            "email": "sam@example.com"
        }))
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["stage"], "notification");
    assert!(body["error"].as_str().unwrap().contains("connection refused"));

    let files = video_files(&app.videos_dir());
    assert_eq!(files.len(), 1);
    assert!(body["video_url"].as_str().unwrap().ends_with(&files[0]));
    assert!(body["video_path"].as_str().unwrap().ends_with(&files[0]));
}

#[tokio::test]
async fn test_email_requested_while_disabled() {
    let photos = ["a.jpg"];
    let server = photo_server(&photos).await;
    let app = TestApp::basic();

    let (status, body) = app
        .post_json(json!({
            "song": "happybday",
            "photoURLs": urls(&server, &photos),
            "email": "sam@example.com"
        }))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email_sent"], false);
}

#[tokio::test]
async fn test_render_details_hidden_in_production() {
    let photos = ["a.jpg"];
    let server = photo_server(&photos).await;
    let app = TestApp::with_config(
        FakeRenderer {
            fail: true,
            ..FakeRenderer::default()
        },
        Arc::new(DisabledNotifier),
        |config| config.environment = "production".to_string(),
    );

    let (status, body) = app
        .post_json(json!({"song": "happybday", "photoURLs": urls(&server, &photos)}))
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "An internal error occurred");
}

#[tokio::test]
async fn test_render_details_shown_outside_production() {
    let photos = ["a.jpg"];
    let server = photo_server(&photos).await;
    let app = TestApp::new(
        FakeRenderer {
            fail: true,
            ..FakeRenderer::default()
        },
        Arc::new(DisabledNotifier),
    );

    let (status, body) = app
        .post_json(json!({"song": "happybday", "photoURLs": urls(&server, &photos)}))
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("encoder exploded"));
}

#[tokio::test]
async fn test_short_song_rejected_and_writes_nothing() {
    let photos = ["a.jpg", "b.jpg"];
    let server = photo_server(&photos).await;
    let app = TestApp::new(
        FakeRenderer {
            audio_secs: Some(10.0),
            ..FakeRenderer::default()
        },
        Arc::new(DisabledNotifier),
    );

    let (status, body) = app
        .post_json(json!({"song": "happybday", "photoURLs": urls(&server, &photos)}))
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().starts_with("Render failed"));
    assert!(video_files(&app.videos_dir()).is_empty());
}

#[tokio::test]
async fn test_long_enough_song_renders() {
    let photos = ["a.jpg"];
    let server = photo_server(&photos).await;
    let app = TestApp::new(
        FakeRenderer {
            audio_secs: Some(60.0),
            ..FakeRenderer::default()
        },
        Arc::new(DisabledNotifier),
    );

    let (status, _) = app
        .post_json(json!({"song": "happybday", "photoURLs": urls(&server, &photos)}))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(video_files(&app.videos_dir()).len(), 1);
}

#[tokio::test]
async fn test_slow_photo_host_times_out_as_400() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow.jpg"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(b"\xFF\xD8\xFF\xE0fake".to_vec())
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;
    let app = TestApp::with_config(
        FakeRenderer::default(),
        Arc::new(DisabledNotifier),
        |config| config.fetch_timeout = Some(Duration::from_millis(200)),
    );
    let slow = format!("{}/slow.jpg", server.uri());

    let (status, body) = app
        .post_json(json!({"song": "happybday", "photoURLs": slow}))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], format!("Failed to fetch image: {}", slow));
    assert_eq!(app.render_count(), 0);
}

#[tokio::test]
async fn test_unreachable_photo_host_is_400() {
    let app = TestApp::basic();
    let dead = "http://127.0.0.1:9/a.jpg";

    let (status, body) = app
        .post_json(json!({"song": "happybday", "photoURLs": dead}))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], format!("Failed to fetch image: {}", dead));
    assert_eq!(app.render_count(), 0);
    assert!(video_files(&app.videos_dir()).is_empty());
}

#[tokio::test]
async fn test_oversized_body_is_413_json() {
    let app = TestApp::basic();
    let padding = "x".repeat(2 * 1024 * 1024);

    let (status, body) = app
        .post_json(json!({"song": "happybday", "photoURLs": "http://x/a.jpg", "pad": padding}))
        .await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert!(body["error"].as_str().unwrap().contains("too large"));
    assert_eq!(app.render_count(), 0);
}
