// src/services/fetcher.rs

//! Results-page fetching.
//!
//! The default careers page is client-rendered, so production polling goes
//! through [`RenderingFetcher`]. [`HttpFetcher`] serves server-rendered
//! override URLs.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::Page;
use chromiumoxide::browser::{Browser, BrowserConfig};
use futures::StreamExt;
use reqwest::Client;

use crate::error::{AppError, Result};
use crate::models::HttpConfig;
use crate::utils::http;

/// Returns the content of a page.
///
/// Implementations own their timeout policy; no retry happens here, the
/// next poll cycle is the retry.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// Plain HTTP fetcher backed by reqwest.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Create a fetcher with the configured headers and timeout.
    pub fn new(config: &HttpConfig) -> Result<Self> {
        Ok(Self {
            client: http::create_page_client(config)?,
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AppError::fetch(url, e))?;

        let body = response.text().await.map_err(|e| AppError::fetch(url, e))?;
        log::debug!("Fetched {} ({} bytes)", url, body.len());
        Ok(body)
    }
}

/// Posting links the renderer waits for.
const JOB_LINK_SELECTOR: &str = "a[href*='/job/']";

/// Interval between checks for rendered posting links.
const RENDER_POLL: Duration = Duration::from_millis(250);

/// Renders pages in headless Chromium and returns the resulting DOM.
///
/// A browser is launched per fetch and shut down afterwards, so a crashed
/// browser never outlives one poll.
pub struct RenderingFetcher {
    chrome_path: Option<PathBuf>,
    user_agent: String,
    load_timeout: Duration,
    render_wait: Duration,
    settle: Duration,
}

impl RenderingFetcher {
    /// Create a renderer. Fails when no Chromium executable can be found.
    pub fn new(config: &HttpConfig) -> Result<Self> {
        if let Some(path) = &config.chrome_path {
            if !path.exists() {
                return Err(AppError::config(format!(
                    "Chromium not found at {}",
                    path.display()
                )));
            }
        }

        let fetcher = Self {
            chrome_path: config.chrome_path.clone(),
            user_agent: config.user_agent.clone(),
            load_timeout: Duration::from_secs(config.timeout_secs),
            render_wait: Duration::from_secs(config.render_wait_secs),
            settle: Duration::from_millis(config.render_settle_ms),
        };
        // Resolves the executable now so a missing browser fails at startup.
        fetcher.browser_config()?;
        Ok(fetcher)
    }

    fn browser_config(&self) -> Result<BrowserConfig> {
        let mut builder = BrowserConfig::builder()
            .arg(format!("--user-agent={}", self.user_agent))
            .request_timeout(self.load_timeout);
        if let Some(path) = &self.chrome_path {
            builder = builder.chrome_executable(path);
        }
        builder
            .build()
            .map_err(|e| AppError::config(format!("Headless browser unavailable: {e}")))
    }

    async fn render(&self, browser: &Browser, url: &str) -> Result<String> {
        let page = browser
            .new_page(url)
            .await
            .map_err(|e| AppError::fetch(url, e))?;
        page.wait_for_navigation()
            .await
            .map_err(|e| AppError::fetch(url, e))?;

        if !self.wait_for_postings(&page).await {
            log::warn!(
                "No posting link rendered within {}s at {}",
                self.render_wait.as_secs(),
                url
            );
        }
        tokio::time::sleep(self.settle).await;

        let html = page.content().await.map_err(|e| AppError::fetch(url, e))?;
        if let Err(e) = page.close().await {
            log::debug!("Page close failed: {}", e);
        }
        Ok(html)
    }

    /// Wait, bounded by `render_wait`, until a posting link exists.
    async fn wait_for_postings(&self, page: &Page) -> bool {
        let appeared = async {
            while page.find_element(JOB_LINK_SELECTOR).await.is_err() {
                tokio::time::sleep(RENDER_POLL).await;
            }
        };
        tokio::time::timeout(self.render_wait, appeared).await.is_ok()
    }
}

#[async_trait]
impl Fetcher for RenderingFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        let (mut browser, mut handler) = Browser::launch(self.browser_config()?)
            .await
            .map_err(|e| AppError::fetch(url, format!("browser launch failed: {e}")))?;
        let events = tokio::spawn(async move { while handler.next().await.is_some() {} });

        let deadline = self.load_timeout + self.render_wait + self.settle;
        let result = tokio::time::timeout(deadline, self.render(&browser, url))
            .await
            .unwrap_or_else(|_| Err(AppError::fetch(url, "page render timed out")));

        if let Err(e) = browser.close().await {
            log::debug!("Browser close failed: {}", e);
        }
        if let Err(e) = browser.wait().await {
            log::debug!("Browser exit wait failed: {}", e);
        }
        events.abort();

        if let Ok(html) = &result {
            log::debug!("Rendered {} ({} bytes)", url, html.len());
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rendering_fetcher_rejects_missing_executable() {
        let config = HttpConfig {
            chrome_path: Some(PathBuf::from("/nonexistent/chromium-browser")),
            ..HttpConfig::default()
        };
        let err = RenderingFetcher::new(&config).err().unwrap();
        assert!(matches!(err, AppError::Config(_)));
        assert!(err.to_string().contains("/nonexistent/chromium-browser"));
    }

    #[test]
    fn test_http_fetcher_builds_without_browser() {
        assert!(HttpFetcher::new(&HttpConfig::default()).is_ok());
    }
}
