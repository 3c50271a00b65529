//! Notification cooldown state.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// When the operator was last notified, and how long to stay quiet after.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationState {
    /// Time of the last successful notification
    #[serde(default)]
    pub last_notified_at: Option<DateTime<Utc>>,

    /// Minimum spacing between notifications
    pub cooldown_secs: u64,
}

impl NotificationState {
    pub fn new(cooldown_secs: u64) -> Self {
        Self {
            last_notified_at: None,
            cooldown_secs,
        }
    }

    /// Time left before another notification is allowed, if any.
    pub fn cooldown_remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        let last = self.last_notified_at?;
        let cooldown = i64::try_from(self.cooldown_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX);
        let elapsed = now - last;
        (elapsed < cooldown).then(|| cooldown.checked_sub(&elapsed).unwrap_or(cooldown))
    }

    /// `now - last_notified_at >= cooldown`, or never notified.
    pub fn can_notify(&self, now: DateTime<Utc>) -> bool {
        self.cooldown_remaining(now).is_none()
    }

    /// Record a successful notification.
    pub fn mark_notified(&mut self, now: DateTime<Utc>) {
        self.last_notified_at = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_never_notified_can_notify() {
        let state = NotificationState::new(600);
        assert!(state.can_notify(Utc::now()));
        assert!(state.cooldown_remaining(Utc::now()).is_none());
    }

    #[test]
    fn test_cooldown_boundary_is_inclusive() {
        let t = Utc::now();
        let mut state = NotificationState::new(600);
        state.mark_notified(t);

        assert!(!state.can_notify(t + Duration::seconds(599)));
        assert_eq!(
            state.cooldown_remaining(t + Duration::seconds(120)),
            Some(Duration::seconds(480))
        );
        assert!(state.can_notify(t + Duration::seconds(600)));
    }

    #[test]
    fn test_zero_cooldown_never_blocks() {
        let t = Utc::now();
        let mut state = NotificationState::new(0);
        state.mark_notified(t);
        assert!(state.can_notify(t));
    }
}
