//! SMTP channel. The summary is the plain-text body; the archive is attached as
//! `application/zip`.

use super::{read_attachment, require, ChannelSender};
use crate::config::MailConfig;
use crate::error::ChannelError;
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use log::debug;
use std::path::Path;

/// Port that selects implicit TLS instead of STARTTLS.
pub const IMPLICIT_TLS_PORT: u16 = 465;

#[derive(Debug, Clone, Copy, Default)]
pub struct SmtpMailer;

impl SmtpMailer {
    pub fn new() -> Self {
        Self
    }

    fn mailbox(address: &str) -> Result<Mailbox, ChannelError> {
        address.parse().map_err(|source| ChannelError::Address {
            address: address.to_string(),
            source,
        })
    }

    /// Assemble the outgoing mail without touching the network.
    pub fn build_message(
        cfg: &MailConfig,
        message: &str,
        attachment_name: &str,
        attachment: Vec<u8>,
    ) -> Result<Message, ChannelError> {
        let to = Self::mailbox(require(&cfg.to, "mail recipient")?)?;
        let from = Self::mailbox(require(cfg.sender_address(), "mail from")?)?;

        let zip = ContentType::parse("application/zip")?;
        let body = MultiPart::mixed()
            .singlepart(SinglePart::plain(message.to_string()))
            .singlepart(Attachment::new(attachment_name.to_string()).body(attachment, zip));

        let mail = Message::builder()
            .from(from)
            .to(to)
            .subject(cfg.subject.clone())
            .multipart(body)?;
        Ok(mail)
    }

    fn transport(cfg: &MailConfig) -> Result<AsyncSmtpTransport<Tokio1Executor>, ChannelError> {
        let host = require(&cfg.host, "mail host")?;
        let builder = if cfg.port == IMPLICIT_TLS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)?
        };
        let mut builder = builder.port(cfg.port);
        if !cfg.user.is_empty() {
            builder = builder.credentials(Credentials::new(cfg.user.clone(), cfg.password.clone()));
        }
        Ok(builder.build())
    }
}

#[async_trait]
impl ChannelSender<MailConfig> for SmtpMailer {
    async fn send(&self, cfg: &MailConfig, message: &str, archive: &Path) -> Result<(), ChannelError> {
        let transport = Self::transport(cfg)?;
        let bytes = read_attachment(archive).await?;
        let mail = Self::build_message(cfg, message, &crate::archive::attachment_name(archive), bytes)?;
        transport.send(mail).await?;
        debug!("Mail delivered to {} via {}:{}", cfg.to, cfg.host, cfg.port);
        Ok(())
    }
}
