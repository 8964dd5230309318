// # Azure DNS Provider
//
// This crate provides the Azure DNS record updater for the DDNS agent, plus
// the service principal credential it authenticates with.
//
// ## Behavior
//
// - One HTTP request per `update` call: a full replace of the address record
//   set, so repeating it is harmless
// - A records for IPv4 addresses, AAAA records for IPv6 addresses
// - TTL fixed at construction (the agent derives it from the poll interval)
// - HTTP timeout configured (30 seconds)
// - Specific error handling for HTTP status codes (401, 403, 404, 429, 5xx)
// - NO retry or backoff logic (owned by the reconciler)
//
// ## Security Requirements
//
// - Client secret and bearer tokens NEVER appear in logs or error messages
//
// ## API Reference
//
// - Record Sets - Create Or Update:
//   PUT `/subscriptions/{sub}/resourceGroups/{rg}/providers/Microsoft.Network/dnsZones/{zone}/{A|AAAA}/{name}?api-version=2018-05-01`

pub mod credential;

pub use credential::ClientSecretCredential;

use async_trait::async_trait;
use ddns_core::config::RecordTarget;
use ddns_core::traits::{CredentialProvider, RecordUpdater};
use ddns_core::{Error, Result};
use serde::Deserialize;
use serde_json::{Value, json};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

/// Azure Resource Manager endpoint for the public cloud
pub const MANAGEMENT_ENDPOINT: &str = "https://management.azure.com";

/// DNS zone API version
pub const API_VERSION: &str = "2018-05-01";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Address record type, chosen from the IP family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordType {
    A,
    Aaaa,
}

impl RecordType {
    pub fn for_ip(ip: IpAddr) -> Self {
        match ip {
            IpAddr::V4(_) => RecordType::A,
            IpAddr::V6(_) => RecordType::Aaaa,
        }
    }

    /// Path segment used by the record set API
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
        }
    }
}

/// Build the record set body replacing all addresses with `ip`
fn record_set_body(ip: IpAddr, ttl: u32) -> Value {
    match ip {
        IpAddr::V4(v4) => json!({
            "properties": {
                "TTL": ttl,
                "ARecords": [{ "ipv4Address": v4.to_string() }]
            }
        }),
        IpAddr::V6(v6) => json!({
            "properties": {
                "TTL": ttl,
                "AAAARecords": [{ "ipv6Address": v6.to_string() }]
            }
        }),
    }
}

#[derive(Debug, Deserialize)]
struct ArmErrorResponse {
    error: ArmErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ArmErrorDetail {
    code: String,
    message: String,
}

/// Pull `code: message` out of an ARM error body, falling back to the raw text
fn describe_error_body(body: &str) -> String {
    match serde_json::from_str::<ArmErrorResponse>(body) {
        Ok(parsed) => format!("{}: {}", parsed.error.code, parsed.error.message),
        Err(_) if body.trim().is_empty() => "no response body".to_string(),
        Err(_) => body.trim().to_string(),
    }
}

/// Azure DNS record set updater
pub struct AzureDnsUpdater {
    credential: Arc<dyn CredentialProvider>,

    /// Resource Manager base URL
    endpoint: String,

    /// TTL written with every record set
    ttl: u32,

    /// HTTP client for API requests
    client: reqwest::Client,
}

impl std::fmt::Debug for AzureDnsUpdater {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureDnsUpdater")
            .field("endpoint", &self.endpoint)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl AzureDnsUpdater {
    /// Create a new updater writing record sets with the given TTL
    pub fn new(credential: Arc<dyn CredentialProvider>, ttl: u32) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            credential,
            endpoint: MANAGEMENT_ENDPOINT.to_string(),
            ttl,
            client,
        })
    }

    /// Use a different Resource Manager endpoint (sovereign clouds, tests)
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    pub fn ttl(&self) -> u32 {
        self.ttl
    }

    /// Record set URL for `target`
    fn record_set_url(&self, target: &RecordTarget, record_type: RecordType) -> String {
        format!(
            "{}/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Network/dnsZones/{}/{}/{}?api-version={}",
            self.endpoint,
            target.zone.subscription_id,
            target.zone.resource_group,
            target.zone.zone,
            record_type.as_str(),
            target.name,
            API_VERSION
        )
    }
}

#[async_trait]
impl RecordUpdater for AzureDnsUpdater {
    async fn update(&self, target: &RecordTarget, ip: IpAddr) -> Result<()> {
        let token = self.credential.token().await?;
        let record_type = RecordType::for_ip(ip);
        let url = self.record_set_url(target, record_type);

        tracing::debug!(
            "PUT {} record set {} (ttl {}s)",
            record_type.as_str(),
            target,
            self.ttl
        );

        let response = self
            .client
            .put(&url)
            .bearer_auth(token.secret())
            .json(&record_set_body(ip, self.ttl))
            .send()
            .await
            .map_err(|e| Error::update(&target.name, format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let detail = describe_error_body(&response.text().await.unwrap_or_default());

        match status.as_u16() {
            401 | 403 => Err(Error::credential(format!(
                "Azure rejected the service principal for {} ({}): {}. \
                Check that it holds DNS Zone Contributor on the zone.",
                target, status, detail
            ))),
            404 => Err(Error::update(
                &target.name,
                format!(
                    "Zone {} not found in resource group {}: {}",
                    target.zone.zone, target.zone.resource_group, detail
                ),
            )),
            429 => Err(Error::update(
                &target.name,
                format!("Rate limit exceeded ({}): {}", status, detail),
            )),
            500..=599 => Err(Error::update(
                &target.name,
                format!("Azure server error (transient) {}: {}", status, detail),
            )),
            _ => Err(Error::update(
                &target.name,
                format!("Unexpected status {}: {}", status, detail),
            )),
        }
    }

    fn provider_name(&self) -> &'static str {
        "azure"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ddns_core::config::ZoneRef;
    use ddns_core::traits::AccessToken;
    use httpmock::prelude::*;

    const RECORD_PATH: &str = "/subscriptions/sub-1/resourceGroups/rg-dns/providers/Microsoft.Network/dnsZones/example.com/A/home";

    struct StaticCredential;

    #[async_trait]
    impl CredentialProvider for StaticCredential {
        async fn token(&self) -> Result<AccessToken> {
            Ok(AccessToken::new("test-token", Duration::from_secs(3600)))
        }
    }

    struct BrokenCredential;

    #[async_trait]
    impl CredentialProvider for BrokenCredential {
        async fn token(&self) -> Result<AccessToken> {
            Err(Error::credential("AADSTS7000215: Invalid client secret"))
        }
    }

    fn target(name: &str) -> RecordTarget {
        RecordTarget::new(name, ZoneRef::new("sub-1", "rg-dns", "example.com"))
    }

    fn updater_for(server: &MockServer, credential: Arc<dyn CredentialProvider>) -> AzureDnsUpdater {
        AzureDnsUpdater::new(credential, 300)
            .unwrap()
            .with_endpoint(server.base_url())
    }

    #[tokio::test]
    async fn puts_a_record_set_with_ttl_and_bearer_token() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path(RECORD_PATH)
                    .query_param("api-version", API_VERSION)
                    .header("authorization", "Bearer test-token")
                    .json_body(json!({
                        "properties": {
                            "TTL": 300,
                            "ARecords": [{ "ipv4Address": "203.0.113.7" }]
                        }
                    }));
                then.status(200).json_body(json!({ "name": "home" }));
            })
            .await;

        let updater = updater_for(&server, Arc::new(StaticCredential));
        updater
            .update(&target("home"), IpAddr::from([203, 0, 113, 7]))
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn ipv6_goes_to_aaaa_record_set() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path("/subscriptions/sub-1/resourceGroups/rg-dns/providers/Microsoft.Network/dnsZones/example.com/AAAA/home")
                    .json_body(json!({
                        "properties": {
                            "TTL": 300,
                            "AAAARecords": [{ "ipv6Address": "2001:db8::7" }]
                        }
                    }));
                then.status(201);
            })
            .await;

        let updater = updater_for(&server, Arc::new(StaticCredential));
        updater
            .update(&target("home"), "2001:db8::7".parse().unwrap())
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn forbidden_is_credential_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(PUT).path(RECORD_PATH);
                then.status(403).json_body(json!({
                    "error": { "code": "AuthorizationFailed", "message": "no access" }
                }));
            })
            .await;

        let updater = updater_for(&server, Arc::new(StaticCredential));
        let err = updater
            .update(&target("home"), IpAddr::from([203, 0, 113, 7]))
            .await
            .unwrap_err();

        assert!(err.is_credential(), "got {:?}", err);
        assert!(err.to_string().contains("AuthorizationFailed"));
        assert!(!err.to_string().contains("test-token"));
    }

    #[tokio::test]
    async fn server_error_is_update_error_naming_record() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(PUT).path(RECORD_PATH);
                then.status(503).body("upstream unavailable");
            })
            .await;

        let updater = updater_for(&server, Arc::new(StaticCredential));
        let err = updater
            .update(&target("home"), IpAddr::from([203, 0, 113, 7]))
            .await
            .unwrap_err();

        match err {
            Error::Update { record, message } => {
                assert_eq!(record, "home");
                assert!(message.contains("transient"));
            }
            other => panic!("expected update error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn missing_zone_is_update_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(PUT).path(RECORD_PATH);
                then.status(404).json_body(json!({
                    "error": { "code": "ParentResourceNotFound", "message": "zone missing" }
                }));
            })
            .await;

        let updater = updater_for(&server, Arc::new(StaticCredential));
        let err = updater
            .update(&target("home"), IpAddr::from([203, 0, 113, 7]))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Update { .. }));
        assert!(err.to_string().contains("ParentResourceNotFound"));
    }

    #[tokio::test]
    async fn credential_failure_skips_the_request() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(PUT);
                then.status(200);
            })
            .await;

        let updater = updater_for(&server, Arc::new(BrokenCredential));
        let err = updater
            .update(&target("home"), IpAddr::from([203, 0, 113, 7]))
            .await
            .unwrap_err();

        assert!(err.is_credential());
        assert_eq!(mock.hits_async().await, 0);
    }

    #[test]
    fn record_type_follows_ip_family() {
        assert_eq!(RecordType::for_ip(IpAddr::from([1, 2, 3, 4])), RecordType::A);
        assert_eq!(
            RecordType::for_ip("::1".parse().unwrap()),
            RecordType::Aaaa
        );
    }

    #[test]
    fn error_body_description() {
        assert_eq!(
            describe_error_body(r#"{"error":{"code":"BadRequest","message":"TTL too low"}}"#),
            "BadRequest: TTL too low"
        );
        assert_eq!(describe_error_body("  plain text "), "plain text");
        assert_eq!(describe_error_body(""), "no response body");
    }
}
