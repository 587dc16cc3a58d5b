//! # Notification Channels
//!
//! Each channel is a [`ChannelSender`] parameterized by its credential section of the
//! configuration. Senders receive the credentials verbatim, the rendered message and
//! the archive path, and report an explicit [`Result`] so the dispatcher can log every
//! outcome the same way.
//!
//! - [`telegram`] - Bot API `sendMessage` + `sendDocument`
//! - [`mail`] - SMTP with the archive as an attachment
//! - [`discord`] - channel message with the archive as an uploaded file

pub mod discord;
pub mod mail;
pub mod telegram;

pub use discord::DiscordBot;
pub use mail::SmtpMailer;
pub use telegram::TelegramBot;

use crate::config::{DiscordConfig, MailConfig, TelegramConfig};
use crate::error::ChannelError;
use async_trait::async_trait;
use reqwest::multipart::Part;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// The notification destinations known to the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    Telegram,
    Mail,
    Discord,
}

impl ChannelKind {
    pub const ALL: [ChannelKind; 3] = [ChannelKind::Telegram, ChannelKind::Mail, ChannelKind::Discord];

    pub fn as_str(self) -> &'static str {
        match self {
            ChannelKind::Telegram => "telegram",
            ChannelKind::Mail => "mail",
            ChannelKind::Discord => "discord",
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Delivers one message plus archive attachment to an external destination.
#[async_trait]
pub trait ChannelSender<C>: Send + Sync
where
    C: Sync,
{
    async fn send(&self, credentials: &C, message: &str, archive: &Path) -> Result<(), ChannelError>;
}

/// The full set of senders a dispatcher fans out to.
#[derive(Clone)]
pub struct Senders {
    pub telegram: Arc<dyn ChannelSender<TelegramConfig>>,
    pub mail: Arc<dyn ChannelSender<MailConfig>>,
    pub discord: Arc<dyn ChannelSender<DiscordConfig>>,
}

impl Senders {
    /// Network-backed senders for production use.
    pub fn live() -> Self {
        Self {
            telegram: Arc::new(TelegramBot::new()),
            mail: Arc::new(SmtpMailer::new()),
            discord: Arc::new(DiscordBot::new()),
        }
    }
}

impl Default for Senders {
    fn default() -> Self {
        Self::live()
    }
}

pub(crate) fn require<'a>(value: &'a str, what: &'static str) -> Result<&'a str, ChannelError> {
    if value.trim().is_empty() {
        Err(ChannelError::MissingCredential(what))
    } else {
        Ok(value)
    }
}

pub(crate) async fn read_attachment(archive: &Path) -> Result<Vec<u8>, ChannelError> {
    tokio::fs::read(archive)
        .await
        .map_err(|source| ChannelError::Attachment {
            path: archive.to_path_buf(),
            source,
        })
}

/// Multipart file part carrying the archive.
pub(crate) async fn archive_part(archive: &Path) -> Result<Part, ChannelError> {
    let bytes = read_attachment(archive).await?;
    let part = Part::bytes(bytes)
        .file_name(crate::archive::attachment_name(archive))
        .mime_str("application/zip")?;
    Ok(part)
}

/// Turn a non-2xx response into [`ChannelError::Api`].
pub(crate) async fn ensure_success(
    service: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response, ChannelError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ChannelError::Api {
        service,
        status: status.as_u16(),
        body: crate::text::single_line(&body),
    })
}
