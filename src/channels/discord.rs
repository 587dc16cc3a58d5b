//! Discord channel: one bot message carrying the summary and the archive upload.

use super::{archive_part, ensure_success, require, ChannelSender};
use crate::config::DiscordConfig;
use crate::error::ChannelError;
use crate::text::truncate_chars;
use async_trait::async_trait;
use log::debug;
use reqwest::multipart::Form;
use std::path::Path;
use std::time::Duration;

/// Discord's message content limit.
pub const MAX_CONTENT_CHARS: usize = 2000;

#[derive(Debug, Clone, Default)]
pub struct DiscordBot {
    client: reqwest::Client,
}

impl DiscordBot {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    fn messages_url(cfg: &DiscordConfig, channel_id: &str) -> String {
        format!(
            "{}/channels/{}/messages",
            cfg.api_base.trim_end_matches('/'),
            urlencoding::encode(channel_id)
        )
    }
}

#[async_trait]
impl ChannelSender<DiscordConfig> for DiscordBot {
    async fn send(&self, cfg: &DiscordConfig, message: &str, archive: &Path) -> Result<(), ChannelError> {
        let channel_id = require(&cfg.channel_id, "discord channel_id")?;
        let token = require(&cfg.token, "discord token")?;

        let payload = serde_json::json!({
            "content": truncate_chars(message, MAX_CONTENT_CHARS),
        });
        let form = Form::new()
            .text("payload_json", payload.to_string())
            .part("files[0]", archive_part(archive).await?);

        let response = self
            .client
            .post(Self::messages_url(cfg, channel_id))
            .header("Authorization", format!("Bot {}", token))
            .timeout(Duration::from_secs(cfg.timeout_seconds))
            .multipart(form)
            .send()
            .await?;
        ensure_success("Discord", response).await?;
        debug!("Discord message delivered to channel {}", channel_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn cfg(server: &mockito::Server) -> DiscordConfig {
        DiscordConfig {
            enabled: true,
            channel_id: "998877".to_string(),
            token: "bot-secret".to_string(),
            api_base: server.url(),
            timeout_seconds: 5,
        }
    }

    fn archive_file(dir: &tempfile::TempDir) -> std::path::PathBuf {
        let path = dir.path().join("ZyXwVuTsRq.zip");
        std::fs::write(&path, b"PK\x05\x06fake").unwrap();
        path
    }

    #[tokio::test]
    async fn posts_message_with_attachment() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/channels/998877/messages")
            .match_header("authorization", "Bot bot-secret")
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex("payload_json".to_string()),
                Matcher::Regex("ZyXwVuTsRq.zip".to_string()),
                Matcher::Regex("hello discord".to_string()),
            ]))
            .with_status(200)
            .with_body(r#"{"id":"1"}"#)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let path = archive_file(&dir);
        DiscordBot::new()
            .send(&cfg(&server), "hello discord", &path)
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn unauthorized_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/channels/998877/messages")
            .with_status(401)
            .with_body(r#"{"message":"401: Unauthorized"}"#)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let path = archive_file(&dir);
        let err = DiscordBot::new()
            .send(&cfg(&server), "hello", &path)
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelError::Api { service: "Discord", status: 401, .. }));
        assert!(err.to_string().contains("Unauthorized"));
    }

    #[tokio::test]
    async fn missing_archive_fails_before_request() {
        let server = mockito::Server::new_async().await;
        let dir = tempfile::tempdir().unwrap();
        let err = DiscordBot::new()
            .send(&cfg(&server), "hello", &dir.path().join("nope.zip"))
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelError::Attachment { .. }));
    }
}
