//! Shared data models for the GiftReel video service.
//!
//! This crate provides Serde-serializable types for:
//! - The webhook payload and its validated form
//! - Timeline segments and text overlays
//! - Encoding configuration
//! - Rendered output artifacts

pub mod artifact;
pub mod encoding;
pub mod error;
pub mod request;
pub mod timeline;

// Re-export common types
pub use artifact::{output_file_name, OutputArtifact};
pub use encoding::{AudioFit, EncodingConfig};
pub use error::{InputError, InputResult};
pub use request::{PhotoUrls, VideoRequest, WebhookPayload};
pub use timeline::{
    Anchor, Overlay, OverlayKind, Segment, SegmentSource, Timeline, TimelineConfig,
};
