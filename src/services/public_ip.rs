// src/services/public_ip.rs

//! Public IP lookup, used only for diagnostics.

use std::net::IpAddr;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::{AppError, Result};
use crate::models::HttpConfig;
use crate::utils::http;

/// Resolves the address this process is seen from.
#[async_trait]
pub trait IpResolver: Send + Sync {
    async fn resolve(&self) -> Result<IpAddr>;
}

/// Queries a plain-text IP echo endpoint.
pub struct HttpIpResolver {
    client: Client,
    url: String,
}

impl HttpIpResolver {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        Ok(Self {
            client: http::create_ip_client(config)?,
            url: config.ip_lookup_url.clone(),
        })
    }
}

#[async_trait]
impl IpResolver for HttpIpResolver {
    async fn resolve(&self) -> Result<IpAddr> {
        let text = self
            .client
            .get(&self.url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AppError::fetch(&self.url, e))?
            .text()
            .await
            .map_err(|e| AppError::fetch(&self.url, e))?;

        parse_ip(&text)
            .ok_or_else(|| AppError::fetch(&self.url, format!("not an IP address: {text:?}")))
    }
}

fn parse_ip(text: &str) -> Option<IpAddr> {
    text.trim().parse().ok()
}
