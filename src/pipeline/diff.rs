//! Change detection between two top-K snapshots.
//!
//! Only rank and presence are tracked: two snapshots are equal when their
//! ordered id sequences are equal, regardless of title or date text.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::models::{Posting, Snapshot};

/// Postings that entered or left the top-K.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct SnapshotDiff {
    /// In current but not in previous, in current order
    pub entered: Vec<Posting>,
    /// In previous but not in current, in previous order
    pub left: Vec<Posting>,
}

impl SnapshotDiff {
    /// Membership changed (a pure reorder has no entered/left postings).
    pub fn has_membership_changes(&self) -> bool {
        !self.entered.is_empty() || !self.left.is_empty()
    }
}

/// Compares snapshots over their first `top_k` postings.
#[derive(Debug, Clone, Copy)]
pub struct ChangeDetector {
    top_k: usize,
}

impl ChangeDetector {
    pub fn new(top_k: usize) -> Self {
        Self { top_k }
    }

    /// Whether `current` differs from `previous`.
    ///
    /// With no previous snapshot, only a non-empty current one counts as a
    /// change.
    pub fn has_changed(&self, previous: Option<&Snapshot>, current: &Snapshot) -> bool {
        match previous {
            None => !current.is_empty(),
            Some(previous) => !previous
                .ids()
                .take(self.top_k)
                .eq(current.ids().take(self.top_k)),
        }
    }

    /// Entered/left postings between two snapshots, by id.
    pub fn diff(&self, previous: &Snapshot, current: &Snapshot) -> SnapshotDiff {
        let prev: Vec<&Posting> = previous.postings.iter().take(self.top_k).collect();
        let curr: Vec<&Posting> = current.postings.iter().take(self.top_k).collect();

        let prev_ids: HashSet<&str> = prev.iter().map(|p| p.id.as_str()).collect();
        let curr_ids: HashSet<&str> = curr.iter().map(|p| p.id.as_str()).collect();

        SnapshotDiff {
            entered: curr
                .iter()
                .filter(|p| !prev_ids.contains(p.id.as_str()))
                .map(|p| (*p).clone())
                .collect(),
            left: prev
                .iter()
                .filter(|p| !curr_ids.contains(p.id.as_str()))
                .map(|p| (*p).clone())
                .collect(),
        }
    }
}

/// Convenience function comparing whole snapshots.
pub fn has_changed(previous: Option<&Snapshot>, current: &Snapshot) -> bool {
    ChangeDetector::new(usize::MAX).has_changed(previous, current)
}
