//! Outbound HTTP transport.
//!
//! The dispatcher only needs "send this JSON body, tell me the status"; the
//! trait keeps the retry loop independent of the HTTP client.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use url::Url;

use crate::error::TransportError;

/// Delivers one JSON body and reports the response status.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post_json(&self, url: &Url, body: &Value) -> Result<u16, TransportError>;
}

/// reqwest-backed transport with a shared connection pool.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(10)
            .timeout(timeout)
            .user_agent(concat!("webrehook/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post_json(&self, url: &Url, body: &Value) -> Result<u16, TransportError> {
        let response = self.client.post(url.clone()).json(body).send().await?;
        let status = response.status();
        if !status.is_success() {
            if let Ok(text) = response.text().await {
                if !text.is_empty() {
                    tracing::debug!(url = %url, status = %status, body = %text, "Downstream responded");
                }
            }
        }
        Ok(status.as_u16())
    }
}
