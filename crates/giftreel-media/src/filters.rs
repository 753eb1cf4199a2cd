//! FFmpeg filter builders for segment compositing.
//!
//! Every segment becomes one labelled video stream `[v<i>]` normalized to the
//! output canvas, with its overlays burned in via `drawtext`. The streams are
//! then chained pairwise through `xfade`.

use std::path::Path;

use giftreel_models::{Anchor, Timeline};

/// Distance from the frame edge for edge-anchored overlays.
const EDGE_MARGIN: u32 = 48;
/// Bottom-center text sits above the bottom-right emoji row.
const BOTTOM_CENTER_LIFT: u32 = 160;

/// Escape a path for use inside a quoted filter option value.
pub fn escape_filter_path(path: &str) -> String {
    path.replace('\\', "\\\\")
        .replace('\'', "\\'")
        .replace(':', "\\:")
}

/// `drawtext` x/y expressions for an anchor.
pub fn anchor_position(anchor: Anchor) -> (String, String) {
    match anchor {
        Anchor::BottomCenter => (
            "(w-text_w)/2".to_string(),
            format!("h-text_h-{}", BOTTOM_CENTER_LIFT),
        ),
        Anchor::TopCenter => ("(w-text_w)/2".to_string(), EDGE_MARGIN.to_string()),
        Anchor::Center => ("(w-text_w)/2".to_string(), "(h-text_h)/2".to_string()),
        Anchor::BottomRight => (
            format!("w-text_w-{}", EDGE_MARGIN),
            format!("h-text_h-{}", EDGE_MARGIN),
        ),
    }
}

/// Scale into the canvas preserving aspect ratio, then letterbox.
pub fn filter_fit_canvas(width: u32, height: u32, fps: u32, pixel_format: &str) -> String {
    format!(
        "scale={w}:{h}:force_original_aspect_ratio=decrease,\
         pad={w}:{h}:(ow-iw)/2:(oh-ih)/2:color=black,\
         setsar=1,fps={fps},format={pix}",
        w = width,
        h = height,
        fps = fps,
        pix = pixel_format
    )
}

/// Normalization for a generated solid-color source.
pub fn filter_solid(fps: u32, pixel_format: &str) -> String {
    format!("setsar=1,fps={},format={}", fps, pixel_format)
}

/// Solid-color lavfi source for the closing card.
pub fn solid_source(color: &str, width: u32, height: u32, fps: u32) -> String {
    format!("color=c={}:s={}x{}:r={}", color, width, height, fps)
}

/// A `drawtext` filter reading its text from a file.
///
/// Reading from a file keeps user text out of the filter graph, so no quoting
/// of `:`, `,` or `'` inside the message is needed. `expansion=none` disables
/// `%{...}` sequences.
pub fn filter_drawtext(
    text_file: &Path,
    anchor: Anchor,
    color: &str,
    font_size: u32,
    font_file: Option<&Path>,
) -> String {
    let (x, y) = anchor_position(anchor);
    let mut filter = format!(
        "drawtext=textfile='{}':expansion=none:fontcolor={}:fontsize={}:x={}:y={}:borderw=3:bordercolor=black@0.6",
        escape_filter_path(&text_file.to_string_lossy()),
        color,
        font_size,
        x,
        y
    );
    if let Some(font) = font_file {
        filter.push_str(&format!(
            ":fontfile='{}'",
            escape_filter_path(&font.to_string_lossy())
        ));
    }
    filter
}

/// One crossfade join.
pub fn filter_xfade(
    left: &str,
    right: &str,
    duration: f64,
    offset: f64,
    output: &str,
) -> String {
    format!(
        "[{}][{}]xfade=transition=fade:duration={:.3}:offset={:.3}[{}]",
        left, right, duration, offset, output
    )
}

/// Chain `[v0]..[v<n-1>]` through crossfades, ending in `[output]`.
///
/// Each join starts at the next segment's nominal offset, so the chain runs
/// exactly `timeline.total_duration()` seconds when each outgoing segment is
/// fed `source_duration()` seconds of material.
pub fn filter_crossfade_chain(timeline: &Timeline, output: &str) -> Vec<String> {
    let count = timeline.segments.len();
    if count < 2 {
        return vec![format!("[v0]null[{}]", output)];
    }

    let offsets = timeline.offsets();
    let mut chains = Vec::with_capacity(count - 1);
    let mut previous = "v0".to_string();

    for k in 1..count {
        let fade = timeline.segments[k - 1].crossfade_out.unwrap_or(0.0);
        let label = if k == count - 1 {
            output.to_string()
        } else {
            format!("x{}", k)
        };
        chains.push(filter_xfade(
            &previous,
            &format!("v{}", k),
            fade,
            offsets[k],
            &label,
        ));
        previous = label;
    }

    chains
}

/// Audio chain trimming (and optionally padding) to the timeline length.
pub fn filter_audio(input_index: usize, total: f64, pad: bool, output: &str) -> String {
    let pad = if pad { "apad," } else { "" };
    format!(
        "[{}:a]{}atrim=0:{:.3},asetpts=PTS-STARTPTS[{}]",
        input_index, pad, total, output
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use giftreel_models::{Segment, SegmentSource};

    fn timeline(durations: &[(f64, Option<f64>)]) -> Timeline {
        Timeline {
            segments: durations
                .iter()
                .enumerate()
                .map(|(i, (d, f))| Segment {
                    index: i,
                    source: SegmentSource::Image(i),
                    duration: *d,
                    overlays: Vec::new(),
                    crossfade_out: *f,
                })
                .collect(),
            width: 720,
            height: 1280,
            fps: 24,
            background: "black".to_string(),
        }
    }

    #[test]
    fn test_escape_filter_path() {
        assert_eq!(escape_filter_path("/tmp/a:b'c"), "/tmp/a\\:b\\'c");
    }

    #[test]
    fn test_anchor_positions() {
        let (x, y) = anchor_position(Anchor::Center);
        assert_eq!(x, "(w-text_w)/2");
        assert_eq!(y, "(h-text_h)/2");

        let (x, _) = anchor_position(Anchor::BottomRight);
        assert!(x.starts_with("w-text_w-"));

        let (_, y) = anchor_position(Anchor::TopCenter);
        assert_eq!(y, "48");
    }

    #[test]
    fn test_drawtext_uses_textfile() {
        let filter = filter_drawtext(
            Path::new("/tmp/job/overlay_0_0.txt"),
            Anchor::BottomCenter,
            "white",
            48,
            Some(Path::new("/fonts/Noto.ttf")),
        );
        assert!(filter.starts_with("drawtext=textfile='/tmp/job/overlay_0_0.txt'"));
        assert!(filter.contains("expansion=none"));
        assert!(filter.contains("fontcolor=white"));
        assert!(filter.contains("fontfile='/fonts/Noto.ttf'"));
    }

    #[test]
    fn test_crossfade_chain_offsets() {
        let t = timeline(&[(8.0, Some(0.5)), (8.0, Some(0.75)), (3.0, None)]);
        let chains = filter_crossfade_chain(&t, "vout");
        assert_eq!(chains.len(), 2);
        assert_eq!(
            chains[0],
            "[v0][v1]xfade=transition=fade:duration=0.500:offset=8.000[x1]"
        );
        assert_eq!(
            chains[1],
            "[x1][v2]xfade=transition=fade:duration=0.750:offset=16.000[vout]"
        );
    }

    #[test]
    fn test_audio_filter() {
        assert_eq!(
            filter_audio(3, 27.0, true, "aout"),
            "[3:a]apad,atrim=0:27.000,asetpts=PTS-STARTPTS[aout]"
        );
        assert_eq!(
            filter_audio(3, 27.0, false, "aout"),
            "[3:a]atrim=0:27.000,asetpts=PTS-STARTPTS[aout]"
        );
    }
}
