//! Audio lookup and photo downloads.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use giftreel_models::VideoRequest;

use crate::error::{ApiError, ApiResult};
use crate::metrics;

/// Locate `<song>.mp3` directly inside `mp3s_dir`.
pub async fn resolve_audio(mp3s_dir: &Path, request: &VideoRequest) -> ApiResult<PathBuf> {
    let file_name = request.audio_file_name();
    let path = mp3s_dir.join(&file_name);

    match tokio::fs::metadata(&path).await {
        Ok(meta) if meta.is_file() => Ok(path),
        _ => Err(ApiError::not_found(format!(
            "Song '{}' not found in mp3s folder.",
            file_name
        ))),
    }
}

/// Map an image content type to a file extension.
pub fn extension_for(content_type: Option<&str>) -> &'static str {
    let mime = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase());

    match mime.as_deref() {
        Some("image/png") => "png",
        Some("image/webp") => "webp",
        Some("image/gif") => "gif",
        Some("image/bmp") => "bmp",
        Some("image/tiff") => "tiff",
        _ => "jpg",
    }
}

/// Download every photo in order into `dir`, stopping at the first failure.
pub async fn fetch_photos(
    client: &reqwest::Client,
    urls: &[String],
    dir: &Path,
    timeout: Option<Duration>,
) -> ApiResult<Vec<PathBuf>> {
    let start = Instant::now();
    let mut paths = Vec::with_capacity(urls.len());

    for (index, url) in urls.iter().enumerate() {
        let path = fetch_photo(client, url, dir, index, timeout).await?;
        paths.push(path);
    }

    let elapsed = start.elapsed().as_secs_f64();
    metrics::record_download_duration(elapsed);
    info!(photos = paths.len(), elapsed_secs = elapsed, "Photos downloaded");

    Ok(paths)
}

async fn fetch_photo(
    client: &reqwest::Client,
    url: &str,
    dir: &Path,
    index: usize,
    timeout: Option<Duration>,
) -> ApiResult<PathBuf> {
    let mut request = client.get(url);
    if let Some(timeout) = timeout {
        request = request.timeout(timeout);
    }

    let mut response = request
        .send()
        .await
        .map_err(|e| ApiError::upstream_fetch(url, e))?;

    if response.status() != StatusCode::OK {
        return Err(ApiError::upstream_fetch(
            url,
            format!("HTTP {}", response.status()),
        ));
    }

    let ext = extension_for(
        response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok()),
    );
    let path = dir.join(format!("photo_{}.{}", index, ext));

    let mut file = tokio::fs::File::create(&path)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to create {}: {}", path.display(), e)))?;

    let mut bytes = 0usize;
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| ApiError::upstream_fetch(url, e))?
    {
        bytes += chunk.len();
        file.write_all(&chunk)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to write {}: {}", path.display(), e)))?;
    }
    file.flush()
        .await
        .map_err(|e| ApiError::internal(format!("Failed to write {}: {}", path.display(), e)))?;

    debug!(url = %url, path = %path.display(), bytes, "Photo downloaded");
    Ok(path)
}
