//! Server configuration.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use lettre::message::Mailbox;
use thiserror::Error;
use url::Url;

use giftreel_models::{AudioFit, EncodingConfig, TimelineConfig};

/// Configuration errors, reported once at startup.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value:?}")]
    InvalidValue { name: &'static str, value: String },

    #[error("{0} is required when EMAIL_ENABLED is set")]
    MissingSmtp(&'static str),
}

/// SMTP submission settings.
#[derive(Clone)]
pub struct SmtpConfig {
    pub host: String,
    /// Implicit TLS port
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("from", &self.from)
            .finish()
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Rendered output directory
    pub videos_dir: PathBuf,
    /// Audio track directory
    pub mp3s_dir: PathBuf,
    /// Base URL `video_url` is built from, always ending in `/`
    pub public_base_url: String,
    /// Per-photo download timeout
    pub fetch_timeout: Option<Duration>,
    /// FFmpeg wall-clock limit in seconds
    pub render_timeout_secs: Option<u64>,
    pub max_concurrent_renders: usize,
    /// Max request body size
    pub max_body_size: usize,
    pub crossfade_seed: Option<u64>,
    pub audio_fit: AudioFit,
    pub font_file: Option<PathBuf>,
    /// CORS origins
    pub cors_origins: Vec<String>,
    /// Environment (development/production)
    pub environment: String,
    pub metrics_enabled: bool,
    /// Present only when email is enabled
    pub smtp: Option<SmtpConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            videos_dir: PathBuf::from("videos"),
            mp3s_dir: PathBuf::from("mp3s"),
            public_base_url: "http://localhost:5000/".to_string(),
            fetch_timeout: Some(Duration::from_secs(30)),
            render_timeout_secs: Some(300),
            max_concurrent_renders: 1,
            max_body_size: 1024 * 1024, // 1MB
            crossfade_seed: None,
            audio_fit: AudioFit::Pad,
            font_file: None,
            cors_origins: vec!["*".to_string()],
            environment: "development".to_string(),
            metrics_enabled: true,
            smtp: None,
        }
    }
}

impl AppConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Create config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Blank values count as unset
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let defaults = Self::default();
        let port: u16 = parse_or(&get, "PORT", defaults.port)?;

        let public_base_url = match get("PUBLIC_BASE_URL") {
            Some(raw) => normalize_base_url(&raw).ok_or(ConfigError::InvalidValue {
                name: "PUBLIC_BASE_URL",
                value: raw,
            })?,
            None => format!("http://localhost:{}/", port),
        };

        let fetch_timeout_secs: u64 = parse_or(&get, "FETCH_TIMEOUT_SECS", 30)?;
        let render_timeout_secs: u64 = parse_or(&get, "RENDER_TIMEOUT_SECS", 300)?;

        let max_concurrent_renders: usize =
            parse_or(&get, "MAX_CONCURRENT_RENDERS", defaults.max_concurrent_renders)?;
        if max_concurrent_renders == 0 {
            return Err(ConfigError::InvalidValue {
                name: "MAX_CONCURRENT_RENDERS",
                value: "0".to_string(),
            });
        }

        let crossfade_seed = match get("CROSSFADE_SEED") {
            Some(raw) => Some(raw.parse().map_err(|_| ConfigError::InvalidValue {
                name: "CROSSFADE_SEED",
                value: raw,
            })?),
            None => None,
        };

        let smtp = if parse_bool(&get, "EMAIL_ENABLED", false)? {
            Some(smtp_from_lookup(&get)?)
        } else {
            None
        };

        Ok(Self {
            host: get("HOST").unwrap_or(defaults.host),
            port,
            videos_dir: get("VIDEOS_DIR").map(PathBuf::from).unwrap_or(defaults.videos_dir),
            mp3s_dir: get("MP3S_DIR").map(PathBuf::from).unwrap_or(defaults.mp3s_dir),
            public_base_url,
            fetch_timeout: (fetch_timeout_secs > 0).then(|| Duration::from_secs(fetch_timeout_secs)),
            render_timeout_secs: (render_timeout_secs > 0).then_some(render_timeout_secs),
            max_concurrent_renders,
            max_body_size: parse_or(&get, "MAX_BODY_SIZE", defaults.max_body_size)?,
            crossfade_seed,
            audio_fit: parse_or(&get, "AUDIO_FIT", defaults.audio_fit)?,
            font_file: get("FONT_FILE").map(PathBuf::from),
            cors_origins: get("CORS_ORIGINS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(defaults.cors_origins),
            environment: get("ENVIRONMENT").unwrap_or(defaults.environment),
            metrics_enabled: parse_bool(&get, "METRICS_ENABLED", true)?,
            smtp,
        })
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase() == "production"
    }

    pub fn email_enabled(&self) -> bool {
        self.smtp.is_some()
    }

    pub fn timeline_config(&self) -> TimelineConfig {
        let config = TimelineConfig::default();
        match self.crossfade_seed {
            Some(seed) => config.with_seed(seed),
            None => config,
        }
    }

    pub fn encoding_config(&self) -> EncodingConfig {
        EncodingConfig::default().with_audio_fit(self.audio_fit)
    }

    /// Public URL of a file in the videos directory.
    pub fn video_url(&self, file_name: &str) -> Result<String, url::ParseError> {
        let base = Url::parse(&self.public_base_url)?;
        Ok(base.join(&format!("videos/{}", file_name))?.to_string())
    }
}

fn parse_or<T, G>(get: &G, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(name) {
        Some(raw) => raw
            .parse()
            .map_err(|_| ConfigError::InvalidValue { name, value: raw }),
        None => Ok(default),
    }
}

fn parse_bool<G>(get: &G, name: &'static str, default: bool) -> Result<bool, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(name) {
        Some(raw) => match raw.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidValue { name, value: raw }),
        },
        None => Ok(default),
    }
}

fn smtp_from_lookup<G>(get: &G) -> Result<SmtpConfig, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let require = |name: &'static str| get(name).ok_or(ConfigError::MissingSmtp(name));

    let from = require("SMTP_FROM")?;
    if from.parse::<Mailbox>().is_err() {
        return Err(ConfigError::InvalidValue {
            name: "SMTP_FROM",
            value: from,
        });
    }

    Ok(SmtpConfig {
        host: require("SMTP_HOST")?,
        port: parse_or(get, "SMTP_PORT", 465)?,
        username: require("SMTP_USERNAME")?,
        password: require("SMTP_PASSWORD")?,
        from,
    })
}

/// Parse an http(s) base URL and make sure it ends with `/` so joins append.
fn normalize_base_url(raw: &str) -> Option<String> {
    let mut url = Url::parse(raw).ok()?;
    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        return None;
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Some(url.to_string())
}
