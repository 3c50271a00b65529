// src/services/extractor.rs

//! Posting extraction from a rendered results page.
//!
//! Every anchor whose `href` contains `/job/` is a posting. The nearest
//! `article`, `li` or `div` ancestor is treated as the posting card, and the
//! card's first `span`/`div` whose class mentions `location` (or `posted` /
//! `date`) supplies the location (or posted text).

use std::collections::HashSet;

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::Posting;
use crate::utils::{normalize_whitespace, resolve_url};

const JOB_PATH_MARKER: &str = "/job/";
const CARD_TAGS: [&str; 3] = ["article", "li", "div"];
const LOCATION_MARKERS: [&str; 1] = ["location"];
const POSTED_MARKERS: [&str; 2] = ["posted", "date"];

/// Turns page content into postings, in page order.
///
/// Must be pure: an unparseable page yields an empty list, never an error.
pub trait Extractor: Send + Sync {
    fn extract(&self, html: &str) -> Vec<Posting>;
}

/// Extractor for careers search result pages.
pub struct CareersPageExtractor {
    base_url: Url,
    link_sel: Selector,
    field_sel: Selector,
}

impl CareersPageExtractor {
    /// Create an extractor that resolves relative links against `base_url`.
    pub fn new(base_url: Url) -> Result<Self> {
        Ok(Self {
            base_url,
            link_sel: Self::parse_selector("a[href]")?,
            field_sel: Self::parse_selector("span, div")?,
        })
    }

    fn parse_selector(s: &str) -> Result<Selector> {
        Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
    }

    fn find_card(anchor: ElementRef<'_>) -> Option<ElementRef<'_>> {
        anchor
            .ancestors()
            .filter_map(ElementRef::wrap)
            .find(|el| CARD_TAGS.contains(&el.value().name()))
    }

    /// First descendant `span`/`div` of the card whose class contains one of
    /// `markers` and which has text.
    fn find_marked(&self, card: ElementRef<'_>, markers: &[&str]) -> Option<String> {
        card.select(&self.field_sel)
            .filter(|el| el.id() != card.id())
            .filter(|el| {
                el.value()
                    .attr("class")
                    .map(|class| {
                        let class = class.to_lowercase();
                        markers.iter().any(|m| class.contains(m))
                    })
                    .unwrap_or(false)
            })
            .map(|el| normalize_whitespace(&el.text().collect::<Vec<_>>().join(" ")))
            .find(|text| !text.is_empty())
    }
}

impl Extractor for CareersPageExtractor {
    fn extract(&self, html: &str) -> Vec<Posting> {
        let document = Html::parse_document(html);
        let mut seen = HashSet::new();
        let mut postings = Vec::new();

        for anchor in document.select(&self.link_sel) {
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };
            if !href.contains(JOB_PATH_MARKER) {
                continue;
            }

            let url = resolve_url(&self.base_url, href);
            let title = normalize_whitespace(&anchor.text().collect::<Vec<_>>().join(" "));
            let title = if title.is_empty() {
                "Untitled".to_string()
            } else {
                title
            };

            let card = Self::find_card(anchor);
            let location = card.and_then(|c| self.find_marked(c, &LOCATION_MARKERS));
            let posted_date = card.and_then(|c| self.find_marked(c, &POSTED_MARKERS));

            let id = Posting::derive_id(Some(&url), &title, location.as_deref());
            if !seen.insert(id.clone()) {
                continue;
            }

            postings.push(Posting {
                id,
                title,
                location,
                posted_date,
                url,
            });
        }

        postings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
          <nav><a href="/global/en/search">Search</a></nav>
          <ul>
            <li class="ms-List-cell">
              <div class="card">
                <a href="/global/en/job/1700001/Software-Engineer">
                  Software   Engineer
                </a>
                <div class="jobLocation"><span>Redmond, Washington</span></div>
                <span class="postedDate">3 days ago</span>
              </div>
            </li>
            <li>
              <article>
                <a href="https://jobs.careers.microsoft.com/global/en/job/1700002/">Senior PM</a>
                <span class="location-text">Remote</span>
              </article>
            </li>
            <li>
              <div>
                <a href="/global/en/job/1700001/Software-Engineer?ref=dup">Duplicate</a>
              </div>
            </li>
            <li><a href="/global/en/job/1700003/"></a></li>
          </ul>
        </body></html>
    "#;

    fn extractor() -> CareersPageExtractor {
        let base = Url::parse("https://jobs.careers.microsoft.com/global/en/search?keywords=x")
            .unwrap();
        CareersPageExtractor::new(base).unwrap()
    }

    #[test]
    fn test_extracts_in_page_order_with_card_fields() {
        let postings = extractor().extract(PAGE);
        let ids: Vec<&str> = postings.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["1700001", "1700002", "1700003"]);

        let first = &postings[0];
        assert_eq!(first.title, "Software Engineer");
        assert_eq!(first.location.as_deref(), Some("Redmond, Washington"));
        assert_eq!(first.posted_date.as_deref(), Some("3 days ago"));
        assert_eq!(
            first.url,
            "https://jobs.careers.microsoft.com/global/en/job/1700001/Software-Engineer"
        );

        let second = &postings[1];
        assert_eq!(second.location.as_deref(), Some("Remote"));
        assert_eq!(second.posted_date, None);
    }

    #[test]
    fn test_duplicate_id_keeps_first() {
        let postings = extractor().extract(PAGE);
        let first = postings.iter().find(|p| p.id == "1700001").unwrap();
        assert_eq!(first.title, "Software Engineer");
        assert_eq!(postings.iter().filter(|p| p.id == "1700001").count(), 1);
    }

    #[test]
    fn test_empty_anchor_text_is_untitled() {
        let postings = extractor().extract(PAGE);
        assert_eq!(postings[2].title, "Untitled");
        assert_eq!(postings[2].location, None);
    }

    #[test]
    fn test_page_without_postings_is_empty() {
        let postings = extractor().extract("<html><body><p>Loading...</p></body></html>");
        assert!(postings.is_empty());
        assert!(extractor().extract("").is_empty());
    }

    #[test]
    fn test_parse_selector_invalid() {
        assert!(CareersPageExtractor::parse_selector("[[invalid").is_err());
    }
}
