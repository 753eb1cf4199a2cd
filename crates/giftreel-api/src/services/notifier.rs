//! Email delivery of finished videos.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;
use tracing::info;

use crate::config::SmtpConfig;

const SUBJECT: &str = "Your birthday video is ready! 🎉";

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    #[error("Failed to build email: {0}")]
    Build(String),

    #[error("SMTP delivery failed: {0}")]
    Transport(String),
}

/// Sends the link to a rendered video.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Whether messages are actually delivered.
    fn is_enabled(&self) -> bool;

    async fn send_video_link(
        &self,
        to: &str,
        nickname: &str,
        video_url: &str,
    ) -> Result<(), NotifyError>;
}

/// Plain-text body of the notification.
pub fn message_body(nickname: &str, video_url: &str) -> String {
    format!(
        "Hi!\n\nThe birthday video for {} is ready.\n\nWatch it here: {}\n\nEnjoy the celebration! 🎂\n",
        nickname, video_url
    )
}

/// SMTP over implicit TLS.
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpNotifier {
    pub fn new(config: &SmtpConfig) -> Result<Self, NotifyError> {
        let from: Mailbox = config
            .from
            .parse()
            .map_err(|_| NotifyError::InvalidAddress(config.from.clone()))?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
            .map_err(|e| NotifyError::Transport(e.to_string()))?
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();

        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    fn is_enabled(&self) -> bool {
        true
    }

    async fn send_video_link(
        &self,
        to: &str,
        nickname: &str,
        video_url: &str,
    ) -> Result<(), NotifyError> {
        let recipient: Mailbox = to
            .parse()
            .map_err(|_| NotifyError::InvalidAddress(to.to_string()))?;

        let email = Message::builder()
            .from(self.from.clone())
            .to(recipient)
            .subject(SUBJECT)
            .header(ContentType::TEXT_PLAIN)
            .body(message_body(nickname, video_url))
            .map_err(|e| NotifyError::Build(e.to_string()))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        info!(to = %to, "Video link emailed");
        Ok(())
    }
}

/// Used when no SMTP settings are configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledNotifier;

#[async_trait]
impl Notifier for DisabledNotifier {
    fn is_enabled(&self) -> bool {
        false
    }

    async fn send_video_link(
        &self,
        _to: &str,
        _nickname: &str,
        _video_url: &str,
    ) -> Result<(), NotifyError> {
        Ok(())
    }
}
