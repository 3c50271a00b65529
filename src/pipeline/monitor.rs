// src/pipeline/monitor.rs

//! The poll loop.
//!
//! One iteration: fetch → extract → compare → maybe notify → persist →
//! record run → record public IP. Iterations are strictly sequential and are
//! never interrupted; cancellation is observed between them and during the
//! randomized sleep.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use tokio_util::sync::CancellationToken;

use crate::error::{AppError, Result};
use crate::models::{
    Config, IpRecord, NotificationState, ParseAnomaly, RunOutcome, RunRecord, Snapshot,
};
use crate::pipeline::alert;
use crate::pipeline::{ChangeDetector, NotificationGate, Verdict};
use crate::services::{Extractor, Fetcher, IpResolver, Notifier};
use crate::storage::SnapshotStore;

/// Committed state mirrored in memory.
#[derive(Debug, Clone)]
struct CommittedState {
    snapshot: Option<Snapshot>,
    notification: NotificationState,
}

/// Drives the poll loop over its collaborators.
pub struct Monitor {
    config: Arc<Config>,
    search_url: String,
    detector: ChangeDetector,
    store: Box<dyn SnapshotStore>,
    fetcher: Box<dyn Fetcher>,
    extractor: Box<dyn Extractor>,
    notifier: Box<dyn Notifier>,
    ip_resolver: Option<Box<dyn IpResolver>>,
    state: Option<CommittedState>,
}

impl Monitor {
    /// Create a monitor. Fails if the search URL cannot be built.
    pub fn new(
        config: Arc<Config>,
        store: Box<dyn SnapshotStore>,
        fetcher: Box<dyn Fetcher>,
        extractor: Box<dyn Extractor>,
        notifier: Box<dyn Notifier>,
    ) -> Result<Self> {
        let search_url = config.search.search_url()?.to_string();
        let detector = ChangeDetector::new(config.monitor.top_k);
        Ok(Self {
            config,
            search_url,
            detector,
            store,
            fetcher,
            extractor,
            notifier,
            ip_resolver: None,
            state: None,
        })
    }

    /// Record the public IP after every iteration.
    pub fn with_ip_resolver(mut self, resolver: Box<dyn IpResolver>) -> Self {
        self.ip_resolver = Some(resolver);
        self
    }

    pub fn search_url(&self) -> &str {
        &self.search_url
    }

    /// Loop until `cancel` fires.
    pub async fn run(&mut self, cancel: CancellationToken) {
        let monitor = &self.config.monitor;
        log::info!(
            "Watching {} (top {}, every {}-{}s, cooldown {}s)",
            self.search_url,
            monitor.top_k,
            monitor.poll_min_secs,
            monitor.poll_max_secs,
            monitor.cooldown_secs
        );

        let mut rounds: u64 = 0;
        while !cancel.is_cancelled() {
            let record = self.run_once(Utc::now()).await;
            rounds += 1;

            let delay = jittered_delay(
                self.config.monitor.poll_min_secs,
                self.config.monitor.poll_max_secs,
            );
            log::info!(
                "Round {} complete ({:?}); next poll in {}s",
                rounds,
                record.outcome,
                delay.as_secs()
            );

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        log::info!("Stopped after {} rounds", rounds);
    }

    /// Run one iteration at time `now` and return its run record.
    ///
    /// Never fails: every error ends up in the returned (and appended)
    /// record.
    pub async fn run_once(&mut self, now: DateTime<Utc>) -> RunRecord {
        let record = match self.poll(now).await {
            Ok(record) => record,
            Err(e) => {
                log::error!("Iteration failed: {}", e);
                RunRecord::failure(now, e)
            }
        };

        if let Err(e) = self.store.append_run(&record).await {
            log::warn!("Could not append run record: {}", e);
        }
        self.record_public_ip(now).await;

        record
    }

    async fn poll(&mut self, now: DateTime<Utc>) -> Result<RunRecord> {
        let (previous, notification) = self.committed_state().await?;
        let top_k = self.config.monitor.top_k;

        let html = self.fetcher.fetch(&self.search_url).await?;
        let postings = self.extractor.extract(&html);
        let job_count = postings.len();

        let anomaly = ParseAnomaly::detect(job_count, top_k);
        if let Some(anomaly) = anomaly {
            log::warn!("Suspicious extraction: {}", anomaly);
        }

        let current = Snapshot::from_postings(postings, top_k, now);
        let changed = self.detector.has_changed(previous.as_ref(), &current);

        let mut gate = NotificationGate::new(notification, self.config.monitor.first_run);
        let mut notified = false;
        let mut errors: Vec<AppError> = Vec::new();

        match gate.evaluate(changed, previous.is_none(), now) {
            Verdict::Unchanged => log::info!("No change in top {}", top_k),
            Verdict::Baseline => log::info!("First snapshot stored as baseline"),
            Verdict::Suppressed { remaining } => log::info!(
                "Change detected but in cooldown ({}s left)",
                remaining.num_seconds()
            ),
            Verdict::Notify => {
                let alert = alert::compose(
                    &self.config.search,
                    top_k,
                    previous.as_ref(),
                    &current,
                    now,
                );
                match self
                    .notifier
                    .send(&alert.subject, &alert.body, &self.config.email.to)
                    .await
                {
                    Ok(()) => {
                        gate.resolve(true, now);
                        notified = true;
                        log::info!("Change detected, notification sent");
                    }
                    Err(e) => {
                        gate.resolve(false, now);
                        log::error!("Change detected, notification failed: {}", e);
                        errors.push(e);
                    }
                }
            }
        }

        // Unchanged ids with identical records need no write; a first run
        // that saw nothing has nothing worth anchoring to.
        let needs_save = match &previous {
            None => !current.is_empty(),
            Some(previous) => changed || !previous.same_records(&current),
        };
        if needs_save {
            match self.store.save_state(&current, gate.notification()).await {
                Ok(()) => {
                    self.state = Some(CommittedState {
                        snapshot: Some(current.clone()),
                        notification: *gate.notification(),
                    });
                }
                Err(e) => {
                    log::error!("Could not persist state: {}", e);
                    errors.push(e);
                }
            }
        }

        let error = (!errors.is_empty()).then(|| {
            errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ")
        });

        Ok(RunRecord {
            timestamp: now,
            outcome: if error.is_some() {
                RunOutcome::Failure
            } else {
                RunOutcome::Success
            },
            job_count,
            signature: Some(current.signature()),
            top: current.postings,
            changed,
            notified,
            anomaly,
            error,
        })
    }

    /// Committed state, loading it from the store on first use.
    async fn committed_state(&mut self) -> Result<(Option<Snapshot>, NotificationState)> {
        if let Some(state) = &self.state {
            return Ok((state.snapshot.clone(), state.notification));
        }

        let (snapshot, mut notification) = self.store.load_state().await?;
        let cooldown = self.config.monitor.cooldown_secs;
        if notification.cooldown_secs != cooldown {
            log::info!(
                "Cooldown set to {}s (stored state had {}s)",
                cooldown,
                notification.cooldown_secs
            );
            notification.cooldown_secs = cooldown;
        }

        match &snapshot {
            Some(s) => log::info!("Resuming from snapshot of {} postings", s.len()),
            None => log::info!("No previous snapshot"),
        }

        self.state = Some(CommittedState {
            snapshot: snapshot.clone(),
            notification,
        });
        Ok((snapshot, notification))
    }

    /// Best-effort: failures are logged and dropped.
    async fn record_public_ip(&self, now: DateTime<Utc>) {
        let Some(resolver) = &self.ip_resolver else {
            return;
        };

        match resolver.resolve().await {
            Ok(ip) => {
                let record = IpRecord {
                    timestamp: now,
                    ip: ip.to_string(),
                };
                if let Err(e) = self.store.append_ip(&record).await {
                    log::warn!("Could not append IP record: {}", e);
                }
            }
            Err(e) => log::warn!("Public IP lookup failed: {}", e),
        }
    }
}

/// Uniformly random delay in `[min_secs, max_secs]`.
pub fn jittered_delay(min_secs: u64, max_secs: u64) -> Duration {
    let (lo, hi) = if min_secs <= max_secs {
        (min_secs, max_secs)
    } else {
        (max_secs, min_secs)
    };
    Duration::from_secs(rand::rng().random_range(lo..=hi))
}
