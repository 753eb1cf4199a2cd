//! Timeline planning.
//!
//! Turns a validated request into timed segments with positional overlays:
//!
//! | segment            | overlays                                        |
//! |--------------------|-------------------------------------------------|
//! | first image        | intro (bottom-center)                           |
//! | second image       | location (top-center), if a meeting place is set|
//! | last image         | movie title (center), if a title is set         |
//! | every image        | emoji (bottom-right)                            |
//! | closing card       | bonding-word message (center)                   |
//!
//! Planning is pure; the only randomness is the per-join crossfade length,
//! drawn from a seedable RNG.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use giftreel_models::{
    Anchor, Overlay, OverlayKind, Segment, SegmentSource, Timeline, TimelineConfig, VideoRequest,
};

use crate::error::{MediaError, MediaResult};

pub fn intro_text(request: &VideoRequest) -> String {
    format!("Happy Birthday, {}! {}", request.nickname, request.emoji)
}

pub fn location_text(place: &str) -> String {
    format!("Where it all began: {}", place)
}

pub fn movie_title_text(title: &str) -> String {
    format!("Starring in: {}", title)
}

pub fn closing_text(request: &VideoRequest) -> String {
    format!("Love you, {}! {}", request.bond_word, request.emoji)
}

/// Plan a timeline, seeding crossfades from `config.crossfade_seed` when set.
pub fn plan_timeline(request: &VideoRequest, config: &TimelineConfig) -> MediaResult<Timeline> {
    let mut rng = match config.crossfade_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    plan_timeline_with_rng(request, config, &mut rng)
}

/// Plan a timeline drawing crossfade durations from `rng`.
pub fn plan_timeline_with_rng<R: Rng>(
    request: &VideoRequest,
    config: &TimelineConfig,
    rng: &mut R,
) -> MediaResult<Timeline> {
    let photo_count = request.photo_count();
    if photo_count == 0 {
        return Err(MediaError::invalid_timeline("at least one photo is required"));
    }

    let (fade_min, fade_max) = (*config.crossfade_range.start(), *config.crossfade_range.end());
    if !(fade_min >= 0.0 && fade_min <= fade_max) {
        return Err(MediaError::invalid_timeline(format!(
            "bad crossfade range {}..={}",
            fade_min, fade_max
        )));
    }

    let image_duration = config.image_duration(photo_count);
    let last = photo_count - 1;
    let color = request.color.as_str();

    let mut segments = Vec::with_capacity(photo_count + 1);

    for i in 0..photo_count {
        let mut overlays = Vec::new();

        if i == 0 {
            overlays.push(Overlay::new(
                OverlayKind::Intro,
                intro_text(request),
                Anchor::BottomCenter,
                color,
            ));
        }
        if i == 1 {
            if let Some(place) = &request.meeting_place {
                overlays.push(Overlay::new(
                    OverlayKind::Location,
                    location_text(place),
                    Anchor::TopCenter,
                    color,
                ));
            }
        }
        if i == last {
            if let Some(title) = &request.movie_title {
                overlays.push(Overlay::new(
                    OverlayKind::MovieTitle,
                    movie_title_text(title),
                    Anchor::Center,
                    color,
                ));
            }
        }
        overlays.push(Overlay::new(
            OverlayKind::Emoji,
            request.emoji.clone(),
            Anchor::BottomRight,
            color,
        ));

        segments.push(Segment {
            index: i,
            source: SegmentSource::Image(i),
            duration: image_duration,
            overlays,
            crossfade_out: None,
        });
    }

    segments.push(Segment {
        index: photo_count,
        source: SegmentSource::Solid,
        duration: config.closing_duration,
        overlays: vec![Overlay::new(
            OverlayKind::Closing,
            closing_text(request),
            Anchor::Center,
            color,
        )],
        crossfade_out: None,
    });

    // Every segment but the closing card fades into its successor
    let joins = segments.len() - 1;
    for segment in segments.iter_mut().take(joins) {
        let sampled = if fade_max > fade_min {
            rng.random_range(fade_min..=fade_max)
        } else {
            fade_min
        };
        // A fade never eats more than half of the outgoing segment
        segment.crossfade_out = Some(sampled.min(segment.duration / 2.0));
    }

    let timeline = Timeline {
        segments,
        width: config.width,
        height: config.height,
        fps: config.fps,
        background: config.background.clone(),
    };

    debug!(
        photos = photo_count,
        image_duration,
        total = timeline.total_duration(),
        "Planned timeline"
    );

    Ok(timeline)
}
