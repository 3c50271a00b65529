//! Posting data structure.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static JOB_ID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/job/([0-9]+)(?:[/?#]|$)").expect("job id pattern is valid")
});

/// A single job listing as it appeared on the results page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Posting {
    /// Stable identifier within a snapshot comparison
    pub id: String,

    /// Posting title
    pub title: String,

    /// Location text, when the card shows one
    #[serde(default)]
    pub location: Option<String>,

    /// Posted date text exactly as shown (e.g. "3 days ago")
    #[serde(default)]
    pub posted_date: Option<String>,

    /// Absolute URL of the posting
    pub url: String,
}

impl Posting {
    /// Derive a posting id.
    ///
    /// Preference order: numeric `/job/<id>` segment of the URL, the URL
    /// itself, then `fallback::<title>::<location>`.
    pub fn derive_id(url: Option<&str>, title: &str, location: Option<&str>) -> String {
        match url.map(str::trim).filter(|u| !u.is_empty()) {
            Some(url) => extract_job_id(url).unwrap_or_else(|| url.to_string()),
            None => format!("fallback::{}::{}", title, location.unwrap_or("")),
        }
    }

    /// Location for display.
    pub fn location_or_na(&self) -> &str {
        self.location.as_deref().unwrap_or("N/A")
    }
}

/// Extract the numeric job id from a posting URL.
pub fn extract_job_id(url: &str) -> Option<String> {
    JOB_ID_PATTERN
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_job_id() {
        assert_eq!(
            extract_job_id("https://jobs.careers.microsoft.com/global/en/job/1789012/Software-Engineer"),
            Some("1789012".to_string())
        );
        assert_eq!(
            extract_job_id("/global/en/job/42"),
            Some("42".to_string())
        );
        assert_eq!(extract_job_id("https://example.com/job/abc/"), None);
    }

    #[test]
    fn test_derive_id_prefers_numeric_segment() {
        let id = Posting::derive_id(Some("https://x.test/job/555/Title"), "Title", None);
        assert_eq!(id, "555");
    }

    #[test]
    fn test_derive_id_falls_back_to_url_then_title() {
        assert_eq!(
            Posting::derive_id(Some("https://x.test/job/lead-dev"), "Lead", None),
            "https://x.test/job/lead-dev"
        );
        assert_eq!(
            Posting::derive_id(None, "Lead Dev", Some("Redmond")),
            "fallback::Lead Dev::Redmond"
        );
        assert_eq!(
            Posting::derive_id(Some("   "), "Lead Dev", None),
            "fallback::Lead Dev::"
        );
    }
}
