//! Posted-date text resolution.
//!
//! Result pages show either absolute dates or relative text such as
//! "3 days ago". Both are turned into UTC timestamps for display.

use std::sync::LazyLock;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use regex::Regex;

static RELATIVE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+)\s+(minute|hour|day|week|month)s?\s+ago")
        .expect("relative date pattern is valid")
});

// Average Gregorian month.
const MONTH_SECS: i64 = 2_629_746;

/// Resolve posted text to a UTC timestamp relative to `now`.
///
/// Returns `None` for text that is neither an ISO-8601 date nor
/// `<n> <unit>(s) ago`.
pub fn resolve_posted(text: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }

    let lower = text.to_lowercase();
    let caps = RELATIVE_PATTERN.captures(&lower)?;
    let qty: i64 = caps.get(1)?.as_str().parse().ok()?;
    let unit_secs = match caps.get(2)?.as_str() {
        "minute" => 60,
        "hour" => 3_600,
        "day" => 86_400,
        "week" => 604_800,
        _ => MONTH_SECS,
    };
    let delta = Duration::try_seconds(qty.checked_mul(unit_secs)?)?;
    now.checked_sub_signed(delta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_relative_units() {
        assert_eq!(
            resolve_posted("Posted 3 days ago", now()),
            Some(Utc.with_ymd_and_hms(2026, 3, 7, 12, 0, 0).unwrap())
        );
        assert_eq!(
            resolve_posted("1 hour ago", now()),
            Some(Utc.with_ymd_and_hms(2026, 3, 10, 11, 0, 0).unwrap())
        );
        assert_eq!(
            resolve_posted("2 Weeks Ago", now()),
            Some(Utc.with_ymd_and_hms(2026, 2, 24, 12, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_absolute_dates() {
        assert_eq!(
            resolve_posted("2026-01-15T08:30:00Z", now()),
            Some(Utc.with_ymd_and_hms(2026, 1, 15, 8, 30, 0).unwrap())
        );
        assert_eq!(
            resolve_posted("2026-01-15", now()),
            Some(Utc.with_ymd_and_hms(2026, 1, 15, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_unknown_text() {
        assert_eq!(resolve_posted("Recently", now()), None);
        assert_eq!(resolve_posted("", now()), None);
    }
}
