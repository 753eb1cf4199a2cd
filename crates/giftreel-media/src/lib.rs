//! FFmpeg CLI wrapper for birthday reel rendering.
//!
//! This crate provides:
//! - Timeline planning (segment durations, overlays, crossfades)
//! - Filter graph builders for compositing and text overlays
//! - A safe FFmpeg command builder and runner with progress parsing
//! - Media probing
//! - Publishing finished renders across filesystems

pub mod command;
pub mod error;
pub mod filters;
pub mod fs_utils;
pub mod probe;
pub mod progress;
pub mod render;
pub mod timeline;

pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegInput, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use fs_utils::move_file;
pub use probe::{probe_media, MediaInfo};
pub use progress::FfmpegProgress;
pub use render::{check_audio_fit, FfmpegRenderer, RenderJob, Renderer};
pub use timeline::{plan_timeline, plan_timeline_with_rng};
