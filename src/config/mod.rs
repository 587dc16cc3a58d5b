//! # Configuration Management Module
//!
//! Loads the relay configuration: logging, archive placement and the three
//! notification channels with their credentials.
//!
//! ## Configuration Structure
//!
//! - [`LoggingConfig`] - log level and optional log file
//! - [`ArchiveConfig`] - where ephemeral archives are written
//! - [`TelegramConfig`] - chat-bot channel (chat id + bot token)
//! - [`MailConfig`] - SMTP channel (host, port, login, recipient)
//! - [`DiscordConfig`] - Discord channel (channel id + bot token)
//!
//! ## Usage
//!
//! ```rust,no_run
//! use sessionrelay::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("sessionrelay.toml").await?;
//!     println!("Enabled channels: {:?}", config.enabled_channels());
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration File Format
//!
//! ```toml
//! [logging]
//! level = "info"
//! file = "sessionrelay.log"
//!
//! [telegram]
//! enabled = true
//! chat_id = "123456789"
//! token = "123456:ABC-DEF"
//!
//! [mail]
//! enabled = false
//! host = "smtp.example.com"
//! port = 587
//! user = "alerts@example.com"
//! password = "secret"
//! to = "ops@example.com"
//!
//! [discord]
//! enabled = false
//! channel_id = "112233445566778899"
//! token = "bot-token"
//! ```
//!
//! The file is re-read on every dispatch cycle through [`FileConfigSource`], so
//! toggling a channel takes effect for the next session without a restart.

use crate::channels::ChannelKind;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub archive: ArchiveConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub mail: MailConfig,
    #[serde(default)]
    pub discord: DiscordConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: Some("sessionrelay.log".to_string()),
        }
    }
}

impl LoggingConfig {
    /// Parsed level filter; unknown names fall back to `Info`.
    pub fn level_filter(&self) -> log::LevelFilter {
        self.level.parse().unwrap_or(log::LevelFilter::Info)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// Directory for ephemeral archives. Defaults to the system temp dir.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp_dir: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub chat_id: String,
    #[serde(default)]
    pub token: String,
    #[serde(default = "default_telegram_api")]
    pub api_base: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            chat_id: String::new(),
            token: String::new(),
            api_base: default_telegram_api(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub host: String,
    /// 465 selects implicit TLS; any other port negotiates STARTTLS.
    #[serde(default = "default_mail_port")]
    pub port: u16,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: String,
    /// Recipient address.
    #[serde(default)]
    pub to: String,
    /// Sender address. Falls back to `user` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default = "default_mail_subject")]
    pub subject: String,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: String::new(),
            port: default_mail_port(),
            user: String::new(),
            password: String::new(),
            to: String::new(),
            from: None,
            subject: default_mail_subject(),
        }
    }
}

impl MailConfig {
    /// `from`, else `user` when the login is itself an address. Empty otherwise.
    pub fn sender_address(&self) -> &str {
        match self.from.as_deref() {
            Some(from) => from,
            None if self.user.contains('@') => &self.user,
            None => "",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub channel_id: String,
    #[serde(default)]
    pub token: String,
    #[serde(default = "default_discord_api")]
    pub api_base: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            channel_id: String::new(),
            token: String::new(),
            api_base: default_discord_api(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

fn default_telegram_api() -> String {
    "https://api.telegram.org".to_string()
}

fn default_discord_api() -> String {
    "https://discord.com/api/v10".to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_mail_port() -> u16 {
    587
}

fn default_mail_subject() -> String {
    "New session captured".to_string()
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path.display(), e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path.display(), e))?;

        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path.display(), e))?;

        Ok(())
    }

    /// Directory new archives are written into.
    pub fn archive_dir(&self) -> PathBuf {
        match self.archive.temp_dir.as_deref() {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => std::env::temp_dir(),
        }
    }

    pub fn is_enabled(&self, kind: ChannelKind) -> bool {
        match kind {
            ChannelKind::Telegram => self.telegram.enabled,
            ChannelKind::Mail => self.mail.enabled,
            ChannelKind::Discord => self.discord.enabled,
        }
    }

    pub fn enabled_channels(&self) -> Vec<ChannelKind> {
        ChannelKind::ALL
            .into_iter()
            .filter(|k| self.is_enabled(*k))
            .collect()
    }
}

/// Where a dispatch cycle obtains its configuration.
#[async_trait]
pub trait ConfigSource: Send + Sync {
    async fn load(&self) -> Result<Config>;
}

/// Reads a TOML file on every call.
#[derive(Debug, Clone)]
pub struct FileConfigSource {
    path: PathBuf,
}

impl FileConfigSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ConfigSource for FileConfigSource {
    async fn load(&self) -> Result<Config> {
        Config::load(&self.path).await
    }
}

/// A fixed, already-loaded configuration.
#[async_trait]
impl ConfigSource for Config {
    async fn load(&self) -> Result<Config> {
        Ok(self.clone())
    }
}
