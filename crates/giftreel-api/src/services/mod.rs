//! Business logic services.

pub mod assets;
pub mod notifier;
pub mod pipeline;

pub use notifier::{DisabledNotifier, Notifier, NotifyError, SmtpNotifier};
pub use pipeline::{create_video, parse_request, VideoResponse};
