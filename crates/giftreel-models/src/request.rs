//! Webhook payload and the validated video request.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{InputError, InputResult};

/// Default recipient nickname.
pub const DEFAULT_NICKNAME: &str = "Friend";
/// Default overlay text color.
pub const DEFAULT_COLOR: &str = "white";
/// Default emoji.
pub const DEFAULT_EMOJI: &str = "🎉";
/// Default bonding word used in the closing message.
pub const DEFAULT_BOND_WORD: &str = "Bestie";

/// Photo URLs as sent by the form builder.
///
/// Most callers send a single comma-separated string; a JSON array is
/// accepted as well.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PhotoUrls {
    Joined(String),
    List(Vec<String>),
}

impl PhotoUrls {
    /// Split into trimmed, non-empty URLs, preserving input order.
    pub fn to_list(&self) -> Vec<String> {
        let parts: Vec<&str> = match self {
            PhotoUrls::Joined(joined) => joined.split(',').collect(),
            PhotoUrls::List(list) => list.iter().map(String::as_str).collect(),
        };

        parts
            .into_iter()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Raw `POST /webhook` body. Every field is optional on the wire.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub nickname: Option<String>,

    #[serde(default, rename = "songChoice")]
    pub song_choice: Option<String>,

    #[serde(default)]
    pub song: Option<String>,

    #[serde(default, rename = "photoURLs")]
    pub photo_urls: Option<PhotoUrls>,

    #[serde(default, rename = "meetingPlace")]
    pub meeting_place: Option<String>,

    #[serde(default, rename = "movieTitle")]
    pub movie_title: Option<String>,

    #[serde(default, rename = "colorChoice")]
    pub color_choice: Option<String>,

    #[serde(default)]
    pub emoji: Option<String>,

    #[serde(default, rename = "bondWord")]
    pub bond_word: Option<String>,

    #[serde(default)]
    pub email: Option<String>,
}

/// A validated request with defaults applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoRequest {
    pub nickname: String,
    pub song: String,
    pub photo_urls: Vec<String>,
    pub meeting_place: Option<String>,
    pub movie_title: Option<String>,
    pub color: String,
    pub emoji: String,
    pub bond_word: String,
    pub email: Option<String>,
}

impl WebhookPayload {
    /// Parse a raw JSON body.
    pub fn from_json(body: &[u8]) -> InputResult<Self> {
        serde_json::from_slice(body).map_err(|e| InputError::MalformedBody(e.to_string()))
    }

    /// Validate presence of song and photos, then fill in defaults.
    pub fn into_request(self) -> InputResult<VideoRequest> {
        let song = non_blank(self.song_choice).or_else(|| non_blank(self.song));
        let photo_urls = self
            .photo_urls
            .as_ref()
            .map(PhotoUrls::to_list)
            .unwrap_or_default();

        let song = match song {
            Some(song) if !photo_urls.is_empty() => song,
            _ => return Err(InputError::MissingSongOrPhotos),
        };

        if song.contains('/') || song.contains('\\') || song.contains("..") {
            return Err(InputError::InvalidSong(song));
        }

        let color = match non_blank(self.color_choice) {
            Some(c) if is_valid_color(&c) => c,
            Some(c) => {
                warn!(color = %c, "Rejecting overlay color, using default");
                DEFAULT_COLOR.to_string()
            }
            None => DEFAULT_COLOR.to_string(),
        };

        Ok(VideoRequest {
            nickname: non_blank(self.nickname).unwrap_or_else(|| DEFAULT_NICKNAME.to_string()),
            song,
            photo_urls,
            meeting_place: non_blank(self.meeting_place),
            movie_title: non_blank(self.movie_title),
            color,
            emoji: non_blank(self.emoji).unwrap_or_else(|| DEFAULT_EMOJI.to_string()),
            bond_word: non_blank(self.bond_word).unwrap_or_else(|| DEFAULT_BOND_WORD.to_string()),
            email: non_blank(self.email),
        })
    }
}

impl VideoRequest {
    /// Audio file name looked up in the audio directory.
    pub fn audio_file_name(&self) -> String {
        format!("{}.mp3", self.song)
    }

    pub fn photo_count(&self) -> usize {
        self.photo_urls.len()
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// FFmpeg color syntax: names, `#RRGGBB[AA]`, `0xRRGGBB` and `@alpha` suffixes.
fn is_valid_color(color: &str) -> bool {
    color
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '#' | '@' | '.' | '_'))
}
