//! Telegram Bot API channel.
//!
//! Sends the summary with `sendMessage`, then uploads the archive with `sendDocument`.

use super::{archive_part, ensure_success, require, ChannelSender};
use crate::config::TelegramConfig;
use crate::error::ChannelError;
use crate::text::truncate_utf16;
use async_trait::async_trait;
use log::debug;
use reqwest::multipart::Form;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Telegram rejects message texts longer than this many UTF-16 code units.
pub const MAX_MESSAGE_UNITS: usize = 4096;

#[derive(Debug, Deserialize)]
struct ApiReply {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct TelegramBot {
    client: reqwest::Client,
}

impl TelegramBot {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    fn method_url(cfg: &TelegramConfig, token: &str, method: &str) -> String {
        format!("{}/bot{}/{}", cfg.api_base.trim_end_matches('/'), token, method)
    }

    async fn check(response: reqwest::Response) -> Result<(), ChannelError> {
        let response = ensure_success("Telegram", response).await?;
        let status = response.status().as_u16();
        let reply: ApiReply = response.json().await?;
        if reply.ok {
            Ok(())
        } else {
            Err(ChannelError::Api {
                service: "Telegram",
                status,
                body: reply.description.unwrap_or_default(),
            })
        }
    }
}

#[async_trait]
impl ChannelSender<TelegramConfig> for TelegramBot {
    async fn send(&self, cfg: &TelegramConfig, message: &str, archive: &Path) -> Result<(), ChannelError> {
        let chat_id = require(&cfg.chat_id, "telegram chat_id")?;
        let token = require(&cfg.token, "telegram token")?;
        let timeout = Duration::from_secs(cfg.timeout_seconds);

        let text = serde_json::json!({
            "chat_id": chat_id,
            "text": truncate_utf16(message, MAX_MESSAGE_UNITS),
        });
        let response = self
            .client
            .post(Self::method_url(cfg, token, "sendMessage"))
            .timeout(timeout)
            .json(&text)
            .send()
            .await?;
        Self::check(response).await?;
        debug!("Telegram message delivered to chat {}", chat_id);

        let form = Form::new()
            .text("chat_id", chat_id.to_string())
            .part("document", archive_part(archive).await?);
        let response = self
            .client
            .post(Self::method_url(cfg, token, "sendDocument"))
            .timeout(timeout)
            .multipart(form)
            .send()
            .await?;
        Self::check(response).await?;
        debug!("Telegram document delivered to chat {}", chat_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn cfg(server: &mockito::Server) -> TelegramConfig {
        TelegramConfig {
            enabled: true,
            chat_id: "4242".to_string(),
            token: "123:abc".to_string(),
            api_base: server.url(),
            timeout_seconds: 5,
        }
    }

    fn archive_file(dir: &tempfile::TempDir) -> std::path::PathBuf {
        let path = dir.path().join("AbCdEfGhIj.zip");
        std::fs::write(&path, b"PK\x05\x06fake").unwrap();
        path
    }

    #[tokio::test]
    async fn sends_text_then_document() {
        let mut server = mockito::Server::new_async().await;
        let text = server
            .mock("POST", "/bot123:abc/sendMessage")
            .match_body(Matcher::PartialJson(serde_json::json!({"chat_id": "4242"})))
            .with_status(200)
            .with_body(r#"{"ok":true,"result":{}}"#)
            .create_async()
            .await;
        let doc = server
            .mock("POST", "/bot123:abc/sendDocument")
            .match_body(Matcher::Regex("AbCdEfGhIj.zip".to_string()))
            .with_status(200)
            .with_body(r#"{"ok":true,"result":{}}"#)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let path = archive_file(&dir);
        TelegramBot::new()
            .send(&cfg(&server), "hello", &path)
            .await
            .unwrap();

        text.assert_async().await;
        doc.assert_async().await;
    }

    #[tokio::test]
    async fn api_refusal_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        let _text = server
            .mock("POST", "/bot123:abc/sendMessage")
            .with_status(403)
            .with_body(r#"{"ok":false,"description":"Forbidden: bot was blocked"}"#)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let path = archive_file(&dir);
        let err = TelegramBot::new()
            .send(&cfg(&server), "hello", &path)
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelError::Api { status: 403, .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn ok_false_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        let _text = server
            .mock("POST", "/bot123:abc/sendMessage")
            .with_status(200)
            .with_body(r#"{"ok":false,"description":"chat not found"}"#)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let path = archive_file(&dir);
        let err = TelegramBot::new()
            .send(&cfg(&server), "hello", &path)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("chat not found"));
    }

    #[tokio::test]
    async fn missing_token_fails_before_network() {
        let server = mockito::Server::new_async().await;
        let mut config = cfg(&server);
        config.token.clear();
        let dir = tempfile::tempdir().unwrap();
        let path = archive_file(&dir);
        let err = TelegramBot::new().send(&config, "hello", &path).await.unwrap_err();
        assert!(matches!(err, ChannelError::MissingCredential("telegram token")));
    }
}
