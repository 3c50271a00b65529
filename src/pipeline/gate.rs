//! Notification gate.
//!
//! Decouples "content changed" from "allowed to notify":
//!
//! ```text
//!            change, no cooldown             send ok
//!   IDLE ───────────────────────► PENDING_NOTIFY ───────► COOLDOWN
//!    ▲                                  │                     │
//!    │            send failed           │                     │
//!    ├──────────────────────────────────┘                     │
//!    │              cooldown_secs elapsed                     │
//!    └────────────────────────────────────────────────────────┘
//! ```
//!
//! A change seen during COOLDOWN is dropped, not queued.

use chrono::{DateTime, Duration, Utc};

use crate::models::{FirstRunPolicy, NotificationState};

/// Gate phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatePhase {
    Idle,
    PendingNotify,
    Cooldown,
}

/// What to do about the current observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Nothing changed
    Unchanged,
    /// First population stored silently (baseline policy)
    Baseline,
    /// Changed, but a notification was sent too recently
    Suppressed { remaining: Duration },
    /// Send a notification now, then call [`NotificationGate::resolve`]
    Notify,
}

/// Cooldown state machine over a [`NotificationState`].
#[derive(Debug, Clone)]
pub struct NotificationGate {
    notification: NotificationState,
    first_run: FirstRunPolicy,
    pending: bool,
}

impl NotificationGate {
    pub fn new(notification: NotificationState, first_run: FirstRunPolicy) -> Self {
        Self {
            notification,
            first_run,
            pending: false,
        }
    }

    /// Current phase at time `now`.
    pub fn phase(&self, now: DateTime<Utc>) -> GatePhase {
        if self.pending {
            GatePhase::PendingNotify
        } else if self.notification.can_notify(now) {
            GatePhase::Idle
        } else {
            GatePhase::Cooldown
        }
    }

    /// Decide on an observation.
    ///
    /// `first_run` is true when there was no previous snapshot to compare
    /// against.
    pub fn evaluate(&mut self, changed: bool, first_run: bool, now: DateTime<Utc>) -> Verdict {
        if !changed {
            return Verdict::Unchanged;
        }
        if first_run && self.first_run == FirstRunPolicy::Baseline {
            return Verdict::Baseline;
        }
        match self.notification.cooldown_remaining(now) {
            Some(remaining) => Verdict::Suppressed { remaining },
            None => {
                self.pending = true;
                Verdict::Notify
            }
        }
    }

    /// Complete a pending notification.
    ///
    /// Success starts the cooldown; failure leaves the timer untouched so a
    /// broken transport does not block later changes.
    pub fn resolve(&mut self, delivered: bool, now: DateTime<Utc>) -> GatePhase {
        if self.pending {
            self.pending = false;
            if delivered {
                self.notification.mark_notified(now);
            }
        } else {
            log::warn!("Notification gate resolved with nothing pending");
        }
        self.phase(now)
    }

    pub fn notification(&self) -> &NotificationState {
        &self.notification
    }
}
