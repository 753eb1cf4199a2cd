//! Filesystem helpers for publishing finished renders.
//!
//! Renders are written inside the request's temp directory and only moved
//! into the output directory once complete. The temp directory may sit on a
//! different filesystem, so a plain rename can fail with EXDEV.

use std::path::Path;
use tokio::fs;
use tracing::{debug, warn};

use crate::error::MediaResult;

/// Suffix of the in-flight copy during a cross-device move.
const PARTIAL_SUFFIX: &str = "partial";

/// Move `src` to `dst`, creating `dst`'s parent and falling back to
/// copy-then-rename across filesystems.
pub async fn move_file(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> MediaResult<()> {
    let src = src.as_ref();
    let dst = dst.as_ref();

    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent).await?;
    }

    match fs::rename(src, dst).await {
        Ok(()) => Ok(()),
        Err(e) if is_cross_device_error(&e) => {
            debug!(
                src = %src.display(),
                dst = %dst.display(),
                "Cross-device rename, copying instead"
            );
            copy_then_rename(src, dst).await
        }
        Err(e) => Err(e.into()),
    }
}

/// EXDEV is error code 18 on Linux and macOS.
fn is_cross_device_error(e: &std::io::Error) -> bool {
    e.raw_os_error() == Some(18)
}

/// Copy next to `dst` under a partial name, rename into place, then drop `src`.
///
/// Readers of the output directory never observe a half-written video under
/// its final name.
async fn copy_then_rename(src: &Path, dst: &Path) -> MediaResult<()> {
    let partial = dst.with_extension(PARTIAL_SUFFIX);

    if let Err(e) = fs::copy(src, &partial).await {
        let _ = fs::remove_file(&partial).await;
        return Err(e.into());
    }

    if let Err(e) = fs::rename(&partial, dst).await {
        let _ = fs::remove_file(&partial).await;
        return Err(e.into());
    }

    if let Err(e) = fs::remove_file(src).await {
        warn!(src = %src.display(), error = %e, "Failed to remove source after copy");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_move_file_into_new_directory() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("render.mp4");
        let dst = dir.path().join("videos").join("output_abc.mp4");

        fs::write(&src, b"fake video").await.unwrap();

        move_file(&src, &dst).await.unwrap();

        assert!(!src.exists());
        assert_eq!(fs::read(&dst).await.unwrap(), b"fake video");
    }

    #[tokio::test]
    async fn test_copy_then_rename_leaves_no_partial() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("render.mp4");
        let dst = dir.path().join("out").join("output_abc.mp4");
        fs::create_dir_all(dst.parent().unwrap()).await.unwrap();
        fs::write(&src, b"bytes").await.unwrap();

        copy_then_rename(&src, &dst).await.unwrap();

        assert!(!src.exists());
        assert!(dst.exists());
        assert!(!dst.with_extension(PARTIAL_SUFFIX).exists());
    }

    #[tokio::test]
    async fn test_move_missing_source_fails() {
        let dir = TempDir::new().unwrap();
        let result = move_file(dir.path().join("nope.mp4"), dir.path().join("x.mp4")).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_is_cross_device_error() {
        assert!(is_cross_device_error(&std::io::Error::from_raw_os_error(18)));
        assert!(!is_cross_device_error(&std::io::Error::from_raw_os_error(2)));
    }
}
