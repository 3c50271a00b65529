//! Top-K snapshot of the results page.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::Posting;

/// Ordered top-K postings observed in one poll.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Snapshot {
    /// When the page was observed
    pub captured_at: DateTime<Utc>,

    /// Postings in page order, at most K of them
    pub postings: Vec<Posting>,
}

impl Snapshot {
    /// Build a snapshot from extracted postings.
    ///
    /// Duplicate ids keep their first occurrence; the result is truncated
    /// to `top_k` after deduplication.
    pub fn from_postings(
        postings: impl IntoIterator<Item = Posting>,
        top_k: usize,
        captured_at: DateTime<Utc>,
    ) -> Self {
        let mut seen = HashSet::new();
        let postings = postings
            .into_iter()
            .filter(|p| seen.insert(p.id.clone()))
            .take(top_k)
            .collect();

        Self {
            captured_at,
            postings,
        }
    }

    /// Posting ids in rank order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.postings.iter().map(|p| p.id.as_str())
    }

    pub fn len(&self) -> usize {
        self.postings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }

    /// Whether both snapshots hold exactly the same records, ignoring
    /// capture time.
    pub fn same_records(&self, other: &Snapshot) -> bool {
        self.postings == other.postings
    }

    /// Order-sensitive hex SHA-256 over `(id, title)` pairs.
    pub fn signature(&self) -> String {
        let pairs: Vec<(&str, &str)> = self
            .postings
            .iter()
            .map(|p| (p.id.as_str(), p.title.as_str()))
            .collect();
        // Serializing a Vec of string tuples cannot fail.
        let payload = serde_json::to_vec(&pairs).unwrap_or_default();
        hex::encode(Sha256::digest(&payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn posting(id: &str, title: &str) -> Posting {
        Posting {
            id: id.to_string(),
            title: title.to_string(),
            location: None,
            posted_date: None,
            url: format!("https://example.com/job/{id}/"),
        }
    }

    #[test]
    fn test_dedup_first_occurrence_wins() {
        let snapshot = Snapshot::from_postings(
            vec![posting("1", "First"), posting("2", "Two"), posting("1", "Dup")],
            5,
            Utc::now(),
        );
        assert_eq!(snapshot.ids().collect::<Vec<_>>(), vec!["1", "2"]);
        assert_eq!(snapshot.postings[0].title, "First");
    }

    #[test]
    fn test_truncates_after_dedup() {
        let snapshot = Snapshot::from_postings(
            vec![
                posting("1", "a"),
                posting("1", "a"),
                posting("2", "b"),
                posting("3", "c"),
            ],
            2,
            Utc::now(),
        );
        assert_eq!(snapshot.ids().collect::<Vec<_>>(), vec!["1", "2"]);
    }

    #[test]
    fn test_signature_is_order_sensitive() {
        let now = Utc::now();
        let ab = Snapshot::from_postings(vec![posting("a", "A"), posting("b", "B")], 5, now);
        let ba = Snapshot::from_postings(vec![posting("b", "B"), posting("a", "A")], 5, now);
        assert_ne!(ab.signature(), ba.signature());
        assert_eq!(ab.signature(), ab.clone().signature());
        assert_eq!(ab.signature().len(), 64);
    }
}
