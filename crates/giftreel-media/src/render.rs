//! Timeline rendering.
//!
//! A [`RenderJob`] pairs a planned [`Timeline`] with the local assets it
//! refers to. [`FfmpegRenderer`] turns the job into a single FFmpeg
//! invocation:
//!
//! 1. one input per segment (looped still image or a solid-color source),
//!    each fed `source_duration()` seconds so crossfades overlap extra frames
//! 2. the audio track as the last input
//! 3. a filter graph normalizing every segment to the canvas, burning in its
//!    overlays, chaining crossfades and trimming the audio
//!
//! The [`Renderer`] trait lets the HTTP layer swap the encoder out in tests.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info};

use giftreel_models::{AudioFit, EncodingConfig, SegmentSource, Timeline};

use crate::command::{FfmpegCommand, FfmpegInput, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::filters::{
    filter_audio, filter_crossfade_chain, filter_drawtext, filter_fit_canvas, filter_solid,
    solid_source,
};
use crate::probe::probe_media;

/// Tolerance when comparing audio length against the timeline.
const AUDIO_LENGTH_TOLERANCE_SECS: f64 = 0.05;

/// Everything needed to render one video.
#[derive(Debug, Clone)]
pub struct RenderJob {
    pub timeline: Timeline,
    /// Downloaded photos, indexed by `SegmentSource::Image`
    pub photos: Vec<PathBuf>,
    pub audio: PathBuf,
    pub output: PathBuf,
    /// Scratch directory for overlay text files
    pub work_dir: PathBuf,
}

/// Check an audio track's length against the timeline under `fit`.
///
/// Only [`AudioFit::Reject`] can fail; the other policies stretch or trim the
/// track inside the filter graph.
pub fn check_audio_fit(fit: AudioFit, audio_secs: f64, timeline_secs: f64) -> MediaResult<()> {
    if fit == AudioFit::Reject && audio_secs + AUDIO_LENGTH_TOLERANCE_SECS < timeline_secs {
        return Err(MediaError::AudioTooShort {
            audio: audio_secs,
            timeline: timeline_secs,
        });
    }
    Ok(())
}

/// Renders a job to `job.output`.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, job: &RenderJob) -> MediaResult<()>;
}

/// Renderer backed by the `ffmpeg` binary.
#[derive(Debug, Clone, Default)]
pub struct FfmpegRenderer {
    encoding: EncodingConfig,
    font_file: Option<PathBuf>,
    timeout_secs: Option<u64>,
}

impl FfmpegRenderer {
    pub fn new(encoding: EncodingConfig) -> Self {
        Self {
            encoding,
            font_file: None,
            timeout_secs: None,
        }
    }

    /// Font used for every overlay (needs emoji glyphs to draw emoji).
    pub fn with_font_file(mut self, font_file: Option<PathBuf>) -> Self {
        self.font_file = font_file;
        self
    }

    /// Kill the encoder after `secs` seconds.
    pub fn with_timeout(mut self, secs: Option<u64>) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Write each overlay's text to `work_dir/overlay_<segment>_<n>.txt`.
    pub async fn write_overlay_files(job: &RenderJob) -> MediaResult<Vec<Vec<PathBuf>>> {
        tokio::fs::create_dir_all(&job.work_dir).await?;

        let mut files = Vec::with_capacity(job.timeline.segments.len());
        for segment in &job.timeline.segments {
            let mut segment_files = Vec::with_capacity(segment.overlays.len());
            for (n, overlay) in segment.overlays.iter().enumerate() {
                let path = job
                    .work_dir
                    .join(format!("overlay_{}_{}.txt", segment.index, n));
                tokio::fs::write(&path, overlay.text.as_bytes()).await?;
                segment_files.push(path);
            }
            files.push(segment_files);
        }
        Ok(files)
    }

    /// Build the FFmpeg command for a job whose overlay files are written.
    pub fn build_command(
        &self,
        job: &RenderJob,
        overlay_files: &[Vec<PathBuf>],
    ) -> MediaResult<FfmpegCommand> {
        let timeline = &job.timeline;
        if timeline.segments.is_empty() {
            return Err(MediaError::invalid_timeline("timeline has no segments"));
        }
        if overlay_files.len() != timeline.segments.len() {
            return Err(MediaError::invalid_timeline(
                "overlay files do not match segments",
            ));
        }

        let total = timeline.total_duration();
        let pix = self.encoding.pixel_format.as_str();
        let mut cmd = FfmpegCommand::new(&job.output);
        let mut graph: Vec<String> = Vec::new();

        for (i, segment) in timeline.segments.iter().enumerate() {
            let (input, normalize) = match segment.source {
                SegmentSource::Image(photo) => {
                    let path = job.photos.get(photo).ok_or_else(|| {
                        MediaError::invalid_timeline(format!(
                            "segment {} refers to missing photo {}",
                            segment.index, photo
                        ))
                    })?;
                    (
                        FfmpegInput::file(path)
                            .looped()
                            .framerate(timeline.fps)
                            .duration(segment.source_duration()),
                        filter_fit_canvas(timeline.width, timeline.height, timeline.fps, pix),
                    )
                }
                SegmentSource::Solid => (
                    FfmpegInput::lavfi(solid_source(
                        &timeline.background,
                        timeline.width,
                        timeline.height,
                        timeline.fps,
                    ))
                    .duration(segment.source_duration()),
                    filter_solid(timeline.fps, pix),
                ),
            };
            cmd = cmd.input(input);

            let mut chain = vec![normalize];
            for (overlay, file) in segment.overlays.iter().zip(&overlay_files[i]) {
                chain.push(filter_drawtext(
                    file,
                    overlay.anchor,
                    &overlay.color,
                    overlay.font_size,
                    self.font_file.as_deref(),
                ));
            }
            graph.push(format!("[{}:v]{}[v{}]", i, chain.join(","), i));
        }

        graph.extend(filter_crossfade_chain(timeline, "vout"));

        let audio_index = cmd.input_count();
        let mut audio_input = FfmpegInput::file(&job.audio);
        if self.encoding.audio_fit == AudioFit::Loop {
            audio_input = audio_input.stream_loop();
        }
        cmd = cmd.input(audio_input);
        graph.push(filter_audio(
            audio_index,
            total,
            self.encoding.audio_fit == AudioFit::Pad,
            "aout",
        ));

        Ok(cmd
            .filter_complex(graph.join(";"))
            .map("[vout]")
            .map("[aout]")
            .frame_rate(timeline.fps)
            .output_args(self.encoding.to_ffmpeg_args())
            .duration(total))
    }

    async fn check_audio_length(&self, audio: &Path, total: f64) -> MediaResult<()> {
        if self.encoding.audio_fit != AudioFit::Reject {
            return Ok(());
        }
        let info = probe_media(audio).await?;
        if !info.has_audio {
            return Err(MediaError::InvalidMedia(format!(
                "{} has no audio stream",
                audio.display()
            )));
        }
        check_audio_fit(self.encoding.audio_fit, info.duration, total)
    }
}

#[async_trait]
impl Renderer for FfmpegRenderer {
    async fn render(&self, job: &RenderJob) -> MediaResult<()> {
        if !job.audio.exists() {
            return Err(MediaError::FileNotFound(job.audio.clone()));
        }

        let total = job.timeline.total_duration();
        self.check_audio_length(&job.audio, total).await?;

        let overlay_files = Self::write_overlay_files(job).await?;
        let cmd = self.build_command(job, &overlay_files)?;

        info!(
            output = %job.output.display(),
            segments = job.timeline.segments.len(),
            duration = total,
            audio_fit = %self.encoding.audio_fit,
            "Rendering timeline"
        );

        let mut runner = FfmpegRunner::new();
        if let Some(secs) = self.timeout_secs {
            runner = runner.with_timeout(secs);
        }

        runner
            .run_with_progress(&cmd, move |progress| {
                debug!(
                    percent = %format!("{:.1}", progress.percentage(total)),
                    frame = progress.frame,
                    speed = progress.speed,
                    "Render progress"
                );
            })
            .await?;

        if !job.output.exists() {
            return Err(MediaError::ffmpeg_failed(
                "FFmpeg finished without writing output",
                None,
                None,
            ));
        }

        info!(output = %job.output.display(), "Render complete");
        Ok(())
    }
}
