//! Utility functions and helpers.

pub mod dates;
pub mod http;

use url::Url;

/// Resolve a potentially relative URL against a base URL.
pub fn resolve_url(base: &Url, href: &str) -> String {
    base.join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// Collapse runs of whitespace into single spaces and trim.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_url() {
        let base =
            Url::parse("https://jobs.careers.microsoft.com/global/en/search?keywords=x").unwrap();
        assert_eq!(
            resolve_url(&base, "/global/en/job/123/Engineer"),
            "https://jobs.careers.microsoft.com/global/en/job/123/Engineer"
        );
        assert_eq!(
            resolve_url(&base, "job/9/"),
            "https://jobs.careers.microsoft.com/global/en/job/9/"
        );
        assert_eq!(
            resolve_url(&base, "https://other.com/job/1/"),
            "https://other.com/job/1/"
        );
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  Senior \n\t Engineer  "), "Senior Engineer");
        assert_eq!(normalize_whitespace("   "), "");
    }
}
