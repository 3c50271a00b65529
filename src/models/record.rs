//! Append-only diagnostic records.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Posting;

/// Final outcome of one poll iteration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    Success,
    Failure,
}

/// Extraction results that look wrong but are not errors.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParseAnomaly {
    /// Nothing parsed; usually a layout or rendering problem
    NoPostings,
    /// Fewer postings than the configured top-K
    BelowTopK { found: usize, expected: usize },
}

impl ParseAnomaly {
    /// Classify an extraction result.
    pub fn detect(found: usize, expected: usize) -> Option<Self> {
        match found {
            0 => Some(Self::NoPostings),
            n if n < expected => Some(Self::BelowTopK { found, expected }),
            _ => None,
        }
    }
}

impl fmt::Display for ParseAnomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoPostings => write!(f, "no postings parsed from page"),
            Self::BelowTopK { found, expected } => {
                write!(f, "only {found} postings parsed, expected {expected}")
            }
        }
    }
}

/// One row of run history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunRecord {
    pub timestamp: DateTime<Utc>,
    pub outcome: RunOutcome,

    /// Postings extracted from the page (before truncation)
    pub job_count: usize,

    /// Signature of the current snapshot, when one was built
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,

    /// The top-K observed this iteration, in rank order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub top: Vec<Posting>,

    /// Top-K changed against the previous snapshot
    #[serde(default)]
    pub changed: bool,

    /// A notification was delivered this iteration
    #[serde(default)]
    pub notified: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anomaly: Option<ParseAnomaly>,

    /// Error detail for failed iterations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunRecord {
    /// A record for an iteration that failed before a snapshot existed.
    pub fn failure(timestamp: DateTime<Utc>, error: impl fmt::Display) -> Self {
        Self {
            timestamp,
            outcome: RunOutcome::Failure,
            job_count: 0,
            signature: None,
            top: Vec::new(),
            changed: false,
            notified: false,
            anomaly: None,
            error: Some(error.to_string()),
        }
    }
}

/// One row of public IP history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IpRecord {
    pub timestamp: DateTime<Utc>,
    pub ip: String,
}
