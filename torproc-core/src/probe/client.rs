//! Proxy-capable HTTP client used by the readiness probe
//!
//! The controller only needs "GET this URL and give me the body". The real
//! implementation routes through the local SOCKS endpoint with reqwest; tests
//! plug in scripted clients.

use crate::config::ProxyConfig;
use crate::error::ProbeError;
use async_trait::async_trait;
use reqwest::{Client, Proxy};
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use url::Url;

/// Fetches a page body, routed however the implementation sees fit
#[async_trait]
pub trait ProbeClient: Send + Sync {
    async fn get(&self, url: &str) -> Result<String, ProbeError>;
}

/// reqwest-based `ProbeClient`
#[derive(Debug, Clone)]
pub struct HttpProbeClient {
    client: Client,
    timeout: Duration,
    proxied: bool,
}

impl HttpProbeClient {
    /// Client that tunnels every request through the configured SOCKS endpoint
    #[tracing::instrument(skip(config), fields(socks = %config.socks_address, port = config.socks_port))]
    pub fn through_proxy(config: &ProxyConfig, timeout: Duration) -> Result<Self, ProbeError> {
        config.validate().map_err(ProbeError::ClientCreationFailed)?;
        let proxy_url = config.proxy_url().map_err(ProbeError::InvalidUrl)?;

        let proxy = Proxy::all(proxy_url.as_str())
            .map_err(|e| ProbeError::ClientCreationFailed(format!("Invalid proxy: {}", e)))?;

        let client = Client::builder()
            .proxy(proxy)
            .timeout(timeout)
            .use_rustls_tls()
            .build()
            .map_err(|e| {
                ProbeError::ClientCreationFailed(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            timeout,
            proxied: true,
        })
    }

    /// Client without a proxy, for endpoints reachable directly
    pub fn direct(timeout: Duration) -> Result<Self, ProbeError> {
        let client = Client::builder()
            .no_proxy()
            .timeout(timeout)
            .use_rustls_tls()
            .build()
            .map_err(|e| {
                ProbeError::ClientCreationFailed(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            timeout,
            proxied: false,
        })
    }

    pub fn is_proxied(&self) -> bool {
        self.proxied
    }
}

#[async_trait]
impl ProbeClient for HttpProbeClient {
    /// GET `url` and return the body; non-2xx statuses count as failures
    async fn get(&self, url: &str) -> Result<String, ProbeError> {
        let parsed = Url::parse(url)
            .map_err(|e| ProbeError::InvalidUrl(format!("Failed to parse URL: {}", e)))?;
        match parsed.scheme() {
            "http" | "https" => {}
            scheme => {
                return Err(ProbeError::InvalidUrl(format!(
                    "Only HTTP/HTTPS schemes are supported, got: {}",
                    scheme
                )));
            }
        }

        let start = Instant::now();
        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .and_then(|response| response.error_for_status());

        let response = match response {
            Ok(response) => response,
            Err(e) => {
                let reason = if e.is_timeout() {
                    format!("Request timeout after {:?}", self.timeout)
                } else if e.is_connect() {
                    "Connection refused or unreachable".to_string()
                } else if let Some(status) = e.status() {
                    format!("Unexpected status code: {}", status)
                } else {
                    format!("Request failed: {}", e)
                };

                warn!(
                    url,
                    error = %reason,
                    duration_ms = start.elapsed().as_millis(),
                    "Probe request failed"
                );
                return Err(ProbeError::Network { reason });
            }
        };

        let status = response.status();
        let body = response.text().await.map_err(|e| ProbeError::Network {
            reason: format!("Failed to read response body: {}", e),
        })?;

        debug!(
            url,
            status = %status,
            bytes = body.len(),
            duration_ms = start.elapsed().as_millis(),
            "Probe request succeeded"
        );
        Ok(body)
    }
}
