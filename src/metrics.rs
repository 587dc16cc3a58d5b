//! Process-wide dispatch counters.
use crate::channels::ChannelKind;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock, PoisonError};

static CYCLES_STARTED: AtomicU64 = AtomicU64::new(0);
static CYCLES_COMPLETED: AtomicU64 = AtomicU64::new(0);
static CYCLES_ABORTED: AtomicU64 = AtomicU64::new(0);
static ARCHIVES_BUILT: AtomicU64 = AtomicU64::new(0);
static ARCHIVES_DELETED: AtomicU64 = AtomicU64::new(0);
static CLEANUP_FAILED: AtomicU64 = AtomicU64::new(0);

static CHANNEL_COUNTERS: OnceLock<Mutex<HashMap<ChannelKind, ChannelCounter>>> = OnceLock::new();

pub fn inc_cycles_started() {
    CYCLES_STARTED.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_cycles_completed() {
    CYCLES_COMPLETED.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_cycles_aborted() {
    CYCLES_ABORTED.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_archives_built() {
    ARCHIVES_BUILT.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_archives_deleted() {
    ARCHIVES_DELETED.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_cleanup_failed() {
    CLEANUP_FAILED.fetch_add(1, Ordering::Relaxed);
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ChannelCounter {
    pub sent: u64,
    pub failed: u64,
    pub skipped: u64,
}

fn channel_lock() -> &'static Mutex<HashMap<ChannelKind, ChannelCounter>> {
    CHANNEL_COUNTERS.get_or_init(|| Mutex::new(HashMap::new()))
}

fn update_channel(kind: ChannelKind, f: impl FnOnce(&mut ChannelCounter)) -> ChannelCounter {
    let mut guard = channel_lock().lock().unwrap_or_else(PoisonError::into_inner);
    let counter = guard.entry(kind).or_default();
    f(counter);
    *counter
}

pub fn record_channel_sent(kind: ChannelKind) -> ChannelCounter {
    update_channel(kind, |c| c.sent = c.sent.saturating_add(1))
}

pub fn record_channel_failed(kind: ChannelKind) -> ChannelCounter {
    update_channel(kind, |c| c.failed = c.failed.saturating_add(1))
}

pub fn record_channel_skipped(kind: ChannelKind) -> ChannelCounter {
    update_channel(kind, |c| c.skipped = c.skipped.saturating_add(1))
}

pub fn channel_counters_snapshot() -> HashMap<ChannelKind, ChannelCounter> {
    channel_lock()
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

#[derive(Debug, Default, Clone)]
pub struct Snapshot {
    pub cycles_started: u64,
    pub cycles_completed: u64,
    pub cycles_aborted: u64,
    pub archives_built: u64,
    pub archives_deleted: u64,
    pub cleanup_failed: u64,
    pub channels: HashMap<ChannelKind, ChannelCounter>,
}

pub fn snapshot() -> Snapshot {
    Snapshot {
        cycles_started: CYCLES_STARTED.load(Ordering::Relaxed),
        cycles_completed: CYCLES_COMPLETED.load(Ordering::Relaxed),
        cycles_aborted: CYCLES_ABORTED.load(Ordering::Relaxed),
        archives_built: ARCHIVES_BUILT.load(Ordering::Relaxed),
        archives_deleted: ARCHIVES_DELETED.load(Ordering::Relaxed),
        cleanup_failed: CLEANUP_FAILED.load(Ordering::Relaxed),
        channels: channel_counters_snapshot(),
    }
}
