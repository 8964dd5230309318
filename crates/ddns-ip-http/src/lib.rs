// # HTTP IP Resolver
//
// Resolves the public IP by issuing a GET to an "echo my IP" endpoint and
// parsing the plain-text body.
//
// ## Services
//
// Any endpoint that answers with the caller's address as the whole body
// works. `ifconfig.me` is the default; `api.ipify.org` and `icanhazip.com`
// behave the same way.
//
// ## Determinism
//
// These services answer with a single address. If a body ever carries
// several lines, the first non-empty line wins (see
// `ddns_core::traits::parse_resolved_address`).

use async_trait::async_trait;
use ddns_core::traits::{IpResolver, parse_resolved_address};
use ddns_core::{Error, Result};
use std::net::IpAddr;
use std::time::Duration;

/// Default echo endpoint
///
/// Answers over whichever address family the connection used, so on a
/// dual-stack host this is usually an IPv6 address and only the AAAA record
/// set gets written. Use an IPv4-only endpoint (e.g. `https://api.ipify.org`)
/// or `IP_RESOLVER=dns` to keep A records current.
pub const DEFAULT_URL: &str = "https://ifconfig.me";

/// Default request timeout (10 seconds)
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP-based public IP resolver
#[derive(Debug, Clone)]
pub struct HttpIpResolver {
    /// URL to fetch IP from
    url: String,

    /// HTTP client
    client: reqwest::Client,
}

impl HttpIpResolver {
    /// Create a resolver for `url` with the default timeout
    pub fn new(url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(url, DEFAULT_TIMEOUT)
    }

    /// Create a resolver for `url` with a custom request timeout
    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let url = url.into();
        if !url.starts_with("https://") && !url.starts_with("http://") {
            return Err(Error::config(format!(
                "IP echo URL must use HTTP or HTTPS scheme. Got: {}",
                url
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            // ifconfig.me serves HTML to browsers; a curl-like agent gets plain text.
            .user_agent("curl/8.5.0")
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { url, client })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl IpResolver for HttpIpResolver {
    async fn resolve(&self) -> Result<IpAddr> {
        tracing::debug!("Fetching public IP from {}", self.url);

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::resolution(format!("Request to {} failed: {}", self.url, e)))?;

        if !response.status().is_success() {
            return Err(Error::resolution(format!(
                "Unexpected status code from {}: {}",
                self.url,
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::resolution(format!("Failed to read response: {}", e)))?;

        parse_resolved_address(&body)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
