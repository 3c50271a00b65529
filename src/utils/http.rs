// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use reqwest::header::{self, HeaderMap, HeaderValue};

use crate::error::{AppError, Result};
use crate::models::HttpConfig;

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9";

/// Create the client used for results-page fetches.
pub fn create_page_client(config: &HttpConfig) -> Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    headers.insert(header::ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
    headers.insert(
        header::ACCEPT_LANGUAGE,
        header_value("accept_language", &config.accept_language)?,
    );
    if !config.referer.is_empty() {
        headers.insert(header::REFERER, header_value("referer", &config.referer)?);
    }

    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .default_headers(headers)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

/// Create the client used for the public IP lookup.
pub fn create_ip_client(config: &HttpConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.ip_timeout_secs))
        .build()?;
    Ok(client)
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| AppError::config(format!("http.{name} is not a valid header value: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_clients_build() {
        let config = HttpConfig::default();
        assert!(create_page_client(&config).is_ok());
        assert!(create_ip_client(&config).is_ok());
    }

    #[test]
    fn test_bad_header_is_config_error() {
        let config = HttpConfig {
            referer: "bad\nvalue".to_string(),
            ..HttpConfig::default()
        };
        assert!(matches!(
            create_page_client(&config),
            Err(AppError::Config(_))
        ));
    }
}
