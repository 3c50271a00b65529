//! Alert message composition.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::models::{Posting, SearchConfig, Snapshot};
use crate::pipeline::ChangeDetector;
use crate::utils::dates::resolve_posted;

/// Subject and plain-text body of one notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub subject: String,
    pub body: String,
}

/// Compose the alert for a changed top-K.
pub fn compose(
    search: &SearchConfig,
    top_k: usize,
    previous: Option<&Snapshot>,
    current: &Snapshot,
    now: DateTime<Utc>,
) -> Alert {
    let subject = format!("[Job Alert] Top {} changed: {}", top_k, search.label());

    let mut lines = vec![format!("Top {top_k} changed")];
    match &search.url {
        Some(url) => lines.push(format!("search: {url}")),
        None => {
            lines.push(format!("keyword: {}", search.keyword));
            lines.push(format!("location: {}", search.location));
        }
    }
    lines.push(format!(
        "time (UTC): {}",
        now.to_rfc3339_opts(SecondsFormat::Secs, true)
    ));
    lines.push(String::new());

    if let Some(previous) = previous {
        let diff = ChangeDetector::new(top_k).diff(previous, current);
        if !diff.has_membership_changes() {
            lines.push(format!("Same postings, new order in top {top_k}."));
            lines.push(String::new());
        }
        if !diff.entered.is_empty() {
            lines.push(format!("Entered top {top_k}:"));
            lines.extend(diff.entered.iter().map(|p| format!("  + {}", p.title)));
            lines.push(String::new());
        }
        if !diff.left.is_empty() {
            lines.push(format!("Left top {top_k}:"));
            lines.extend(diff.left.iter().map(|p| format!("  - {}", p.title)));
            lines.push(String::new());
        }
    }

    lines.push(format!("New top {top_k}:"));
    for (rank, posting) in current.postings.iter().enumerate() {
        lines.push(format!(
            "{}. {} - {}",
            rank + 1,
            posting.title,
            posting.location_or_na()
        ));
        lines.push(format!("   Posted: {}", posted_label(posting, now)));
        lines.push(format!("   {}", posting.url));
    }

    Alert {
        subject,
        body: lines.join("\n"),
    }
}

fn posted_label(posting: &Posting, now: DateTime<Utc>) -> String {
    match posting.posted_date.as_deref() {
        Some(text) => match resolve_posted(text, now) {
            Some(at) => format!("{} ({})", at.to_rfc3339_opts(SecondsFormat::Secs, true), text),
            None => text.to_string(),
        },
        None => "unknown".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn posting(id: &str, posted: Option<&str>) -> Posting {
        Posting {
            id: id.to_string(),
            title: format!("Engineer {id}"),
            location: (id != "B").then(|| "Redmond".to_string()),
            posted_date: posted.map(String::from),
            url: format!("https://example.com/job/{id}/"),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_compose_with_previous_lists_entered_and_left() {
        let previous = Snapshot::from_postings(
            vec![posting("A", None), posting("B", None), posting("C", None)],
            3,
            now(),
        );
        let current = Snapshot::from_postings(
            vec![posting("D", Some("2 days ago")), posting("A", None), posting("B", None)],
            3,
            now(),
        );

        let alert = compose(&SearchConfig::default(), 3, Some(&previous), &current, now());

        assert_eq!(
            alert.subject,
            "[Job Alert] Top 3 changed: software engineer (United States)"
        );
        assert!(alert.body.contains("Entered top 3:\n  + Engineer D"));
        assert!(alert.body.contains("Left top 3:\n  - Engineer C"));
        assert!(alert.body.contains("1. Engineer D - Redmond"));
        assert!(alert.body.contains("   Posted: 2026-03-08T12:00:00Z (2 days ago)"));
        assert!(alert.body.contains("3. Engineer B - N/A"));
        assert!(alert.body.contains("   Posted: unknown"));
    }

    #[test]
    fn test_compose_labels_pure_reorder() {
        let previous =
            Snapshot::from_postings(vec![posting("A", None), posting("C", None)], 2, now());
        let current =
            Snapshot::from_postings(vec![posting("C", None), posting("A", None)], 2, now());

        let alert = compose(&SearchConfig::default(), 2, Some(&previous), &current, now());
        assert!(alert.body.contains("Same postings, new order in top 2."));
        assert!(!alert.body.contains("Entered"));
        assert!(!alert.body.contains("Left"));

        let moved = Snapshot::from_postings(vec![posting("D", None), posting("A", None)], 2, now());
        let alert = compose(&SearchConfig::default(), 2, Some(&previous), &moved, now());
        assert!(!alert.body.contains("new order"));
    }

    #[test]
    fn test_compose_first_run_has_no_diff_sections() {
        let current = Snapshot::from_postings(vec![posting("A", Some("Recently"))], 5, now());
        let alert = compose(&SearchConfig::default(), 5, None, &current, now());

        assert!(!alert.body.contains("Entered"));
        assert!(!alert.body.contains("Left"));
        assert!(alert.body.contains("time (UTC): 2026-03-10T12:00:00Z"));
        assert!(alert.body.contains("   Posted: Recently"));
    }

    #[test]
    fn test_compose_with_url_override() {
        let search = SearchConfig {
            url: Some("https://example.com/search?q=rust".to_string()),
            ..SearchConfig::default()
        };
        let current = Snapshot::from_postings(vec![posting("A", None)], 5, now());
        let alert = compose(&search, 5, None, &current, now());

        assert!(alert.subject.ends_with("https://example.com/search?q=rust"));
        assert!(alert.body.contains("search: https://example.com/search?q=rust"));
        assert!(!alert.body.contains("keyword:"));
    }
}
