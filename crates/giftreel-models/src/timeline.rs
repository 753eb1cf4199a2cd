//! Timeline data model: timed segments with positioned text overlays.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

/// Output canvas width (portrait).
pub const DEFAULT_WIDTH: u32 = 720;
/// Output canvas height (portrait).
pub const DEFAULT_HEIGHT: u32 = 1280;
/// Output frame rate.
pub const DEFAULT_FPS: u32 = 24;

/// Where an overlay is anchored on the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Anchor {
    BottomCenter,
    TopCenter,
    Center,
    BottomRight,
}

/// What an overlay says, used for placement rules and font sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayKind {
    Intro,
    Location,
    MovieTitle,
    Emoji,
    Closing,
}

impl OverlayKind {
    /// Font size in pixels on the default 720px-wide canvas.
    pub fn font_size(&self) -> u32 {
        match self {
            OverlayKind::Intro => 48,
            OverlayKind::Location => 40,
            OverlayKind::MovieTitle => 56,
            OverlayKind::Emoji => 64,
            OverlayKind::Closing => 60,
        }
    }
}

/// Positioned text composited on top of a segment for its whole duration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Overlay {
    pub kind: OverlayKind,
    pub text: String,
    pub anchor: Anchor,
    pub color: String,
    pub font_size: u32,
}

impl Overlay {
    pub fn new(kind: OverlayKind, text: impl Into<String>, anchor: Anchor, color: &str) -> Self {
        Self {
            kind,
            text: text.into(),
            anchor,
            color: color.to_string(),
            font_size: kind.font_size(),
        }
    }
}

/// Visual source of a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "photo")]
pub enum SegmentSource {
    /// Index into the request's downloaded photos.
    Image(usize),
    /// Solid background (closing card).
    Solid,
}

/// One timed unit of the output timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub index: usize,
    pub source: SegmentSource,
    /// Nominal display time in seconds.
    pub duration: f64,
    pub overlays: Vec<Overlay>,
    /// Crossfade into the next segment, `None` on the final segment.
    pub crossfade_out: Option<f64>,
}

impl Segment {
    pub fn is_image(&self) -> bool {
        matches!(self.source, SegmentSource::Image(_))
    }

    pub fn has_overlay(&self, kind: OverlayKind) -> bool {
        self.overlays.iter().any(|o| o.kind == kind)
    }

    /// Length of source material needed, including the tail that the
    /// outgoing crossfade blends over.
    pub fn source_duration(&self) -> f64 {
        self.duration + self.crossfade_out.unwrap_or(0.0)
    }
}

/// Ordered segments: image segments followed by one closing segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    pub segments: Vec<Segment>,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    /// Solid background color for the closing card.
    pub background: String,
}

impl Timeline {
    /// Total duration: the sum of nominal segment durations.
    pub fn total_duration(&self) -> f64 {
        self.segments.iter().map(|s| s.duration).sum()
    }

    pub fn image_segment_count(&self) -> usize {
        self.segments.iter().filter(|s| s.is_image()).count()
    }

    /// Start time of each segment on the output timeline.
    pub fn offsets(&self) -> Vec<f64> {
        let mut at = 0.0;
        self.segments
            .iter()
            .map(|s| {
                let start = at;
                at += s.duration;
                start
            })
            .collect()
    }
}

/// Parameters for timeline planning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineConfig {
    /// Target minimum total length spread across all photos.
    pub min_total_duration: f64,
    pub min_image_duration: f64,
    pub max_image_duration: f64,
    pub closing_duration: f64,
    /// Per-join crossfade duration is sampled uniformly from this range.
    pub crossfade_range: RangeInclusive<f64>,
    /// Pin crossfade sampling for reproducible output.
    pub crossfade_seed: Option<u64>,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub background: String,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            min_total_duration: 45.0,
            min_image_duration: 4.0,
            max_image_duration: 8.0,
            closing_duration: 3.0,
            crossfade_range: 0.5..=1.0,
            crossfade_seed: None,
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            fps: DEFAULT_FPS,
            background: "black".to_string(),
        }
    }
}

impl TimelineConfig {
    /// Returns a config with a fixed crossfade seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.crossfade_seed = Some(seed);
        self
    }

    /// Per-image display duration for `photo_count` photos.
    pub fn image_duration(&self, photo_count: usize) -> f64 {
        if photo_count == 0 {
            return self.max_image_duration;
        }
        (self.min_total_duration / photo_count as f64)
            .clamp(self.min_image_duration, self.max_image_duration)
    }
}
