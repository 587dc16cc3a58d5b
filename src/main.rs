//! Binary entrypoint for the sessionrelay CLI.
//!
//! Commands:
//! - `init [--force]` - write a starter `sessionrelay.toml`
//! - `notify <file|->` - run one dispatch cycle per session in the JSON input
//! - `preview <file|->` - print the summary message without sending anything
//! - `status` - show enabled channels and the archive directory
//!
//! See the library crate docs for module-level details: `sessionrelay::`.
use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncReadExt;

use sessionrelay::channels::ChannelKind;
use sessionrelay::config::Config;
use sessionrelay::dispatch::{dispatch_all, Dispatcher};
use sessionrelay::message::format_session_message;
use sessionrelay::metrics;
use sessionrelay::session::Session;

#[derive(Parser)]
#[command(name = "sessionrelay")]
#[command(about = "Relay captured sessions to Telegram, mail and Discord")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "sessionrelay.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Dispatch the session(s) in a JSON file ("-" reads stdin)
    Notify {
        /// Session JSON: one object or an array of objects
        input: String,
    },
    /// Print the notification text for the session(s) without sending
    Preview {
        input: String,
    },
    /// Show configuration summary
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let pre_config = match cli.command {
        Commands::Init { .. } => None,
        _ => Config::load(&cli.config).await.ok(),
    };
    init_logging(&pre_config, cli.verbose);

    match cli.command {
        Commands::Init { force } => {
            if Path::new(&cli.config).exists() && !force {
                return Err(anyhow!(
                    "{} already exists (use --force to overwrite)",
                    cli.config
                ));
            }
            Config::create_default(&cli.config).await?;
            info!("Configuration file created at {}", cli.config);
        }
        Commands::Notify { input } => {
            if pre_config.is_none() {
                // Each cycle reloads and reports this itself; warn once up front too.
                warn!("Configuration {} could not be loaded; cycles will abort", cli.config);
            }
            let sessions = read_sessions(&input).await?;
            info!("Dispatching {} session(s)", sessions.len());
            let dispatcher = Arc::new(Dispatcher::from_config_file(&cli.config));
            let reports = dispatch_all(dispatcher, sessions).await;
            let completed = reports.iter().filter(|r| r.is_completed()).count();
            info!("{} of {} cycle(s) completed", completed, reports.len());
            log_metrics();
        }
        Commands::Preview { input } => {
            for session in read_sessions(&input).await? {
                println!("{}", format_session_message(&session));
            }
        }
        Commands::Status => {
            let config = match pre_config {
                Some(config) => config,
                None => Config::load(&cli.config).await?,
            };
            let enabled: Vec<String> = config
                .enabled_channels()
                .iter()
                .map(|k| k.to_string())
                .collect();
            println!("Config:           {}", cli.config);
            println!(
                "Enabled channels: {}",
                if enabled.is_empty() {
                    "(none)".to_string()
                } else {
                    enabled.join(", ")
                }
            );
            println!("Archive dir:      {}", config.archive_dir().display());
        }
    }

    Ok(())
}

fn log_metrics() {
    let snap = metrics::snapshot();
    info!(
        "Cycles: {} started, {} completed, {} aborted; archives: {} built, {} deleted, {} cleanup failures",
        snap.cycles_started,
        snap.cycles_completed,
        snap.cycles_aborted,
        snap.archives_built,
        snap.archives_deleted,
        snap.cleanup_failed
    );
    for kind in ChannelKind::ALL {
        if let Some(c) = snap.channels.get(&kind) {
            info!("Channel {}: {} sent, {} failed, {} skipped", kind, c.sent, c.failed, c.skipped);
        }
    }
}

async fn read_sessions(input: &str) -> Result<Vec<Session>> {
    let raw = if input == "-" {
        let mut buf = String::new();
        tokio::io::stdin()
            .read_to_string(&mut buf)
            .await
            .context("Failed to read sessions from stdin")?;
        buf
    } else {
        tokio::fs::read_to_string(input)
            .await
            .with_context(|| format!("Failed to read session file {}", input))?
    };
    Session::parse_many(&raw).with_context(|| format!("Invalid session JSON in {}", input))
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // CLI verbosity overrides the configured level
    let base_level = match (verbosity, config) {
        (0, Some(cfg)) => cfg.logging.level_filter(),
        (0, None) => log::LevelFilter::Info,
        (1, _) => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);

    let log_file = config
        .as_ref()
        .and_then(|cfg| cfg.logging.file.as_ref())
        .and_then(|file| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(file)
                .ok()
        });

    if let Some(f) = log_file {
        let write_mutex = Arc::new(std::sync::Mutex::new(f));
        // Echo to the console only when someone is watching
        let is_tty = atty::is(atty::Stream::Stdout);

        builder.format(move |fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            let line = format!("{} [{}] {}", ts, record.level(), record.args());

            if let Ok(mut guard) = write_mutex.lock() {
                let _ = writeln!(guard, "{}", line);
            }

            if is_tty {
                writeln!(fmt, "{}", line)
            } else {
                Ok(())
            }
        });
    } else {
        builder.format(|fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            writeln!(fmt, "{} [{}] {}", ts, record.level(), record.args())
        });
    }
    let _ = builder.try_init();
}
