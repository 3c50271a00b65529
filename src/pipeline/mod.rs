//! Polling pipeline.
//!
//! - `diff`: top-K change detection
//! - `gate`: notification cooldown state machine
//! - `alert`: notification message composition
//! - `monitor`: the poll loop tying them to the collaborators
//! - `shutdown`: interrupt escalation for the loop

use std::sync::Arc;

use crate::error::Result;
use crate::models::{Config, FetchMode};
use crate::services::{
    CareersPageExtractor, Fetcher, HttpFetcher, HttpIpResolver, LogNotifier, Notifier,
    RenderingFetcher, SmtpNotifier,
};
use crate::storage::LocalStorage;

pub mod alert;
pub mod diff;
pub mod gate;
pub mod monitor;
pub mod shutdown;

pub use alert::{Alert, compose};
pub use diff::{ChangeDetector, SnapshotDiff, has_changed};
pub use gate::{GatePhase, NotificationGate, Verdict};
pub use monitor::{Monitor, jittered_delay};
pub use shutdown::escalate_interrupts;

/// Build a monitor wired to the production collaborators.
///
/// With `dry_run`, alerts are logged instead of emailed. Fails when the
/// configured fetcher cannot run (no Chromium for the browser fetcher).
pub fn build_monitor(config: Arc<Config>, dry_run: bool) -> Result<Monitor> {
    let search_url = config.search.search_url()?;

    let store = LocalStorage::new(config.storage.state_dir.clone())
        .with_default_cooldown(config.monitor.cooldown_secs);
    let fetcher: Box<dyn Fetcher> = match config.http.fetcher {
        FetchMode::Browser => Box::new(RenderingFetcher::new(&config.http)?),
        FetchMode::Http => Box::new(HttpFetcher::new(&config.http)?),
    };
    log::debug!("Fetching pages with the {:?} fetcher", config.http.fetcher);
    let extractor = CareersPageExtractor::new(search_url)?;
    let notifier: Box<dyn Notifier> = if dry_run {
        Box::new(LogNotifier)
    } else {
        Box::new(SmtpNotifier::new(&config.email)?)
    };
    let ip_resolver = HttpIpResolver::new(&config.http)?;

    let monitor = Monitor::new(
        Arc::clone(&config),
        Box::new(store),
        fetcher,
        Box::new(extractor),
        notifier,
    )?
    .with_ip_resolver(Box::new(ip_resolver));

    Ok(monitor)
}
