//! Service principal credential (Azure AD client-credentials flow)
//!
//! Exchanges tenant/client/secret for a bearer token scoped to Azure Resource
//! Manager and caches it until shortly before expiry.
//!
//! ## API Call
//!
//! ```http
//! POST /{tenant}/oauth2/v2.0/token
//! Content-Type: application/x-www-form-urlencoded
//!
//! grant_type=client_credentials&client_id=...&client_secret=...&scope=https://management.azure.com/.default
//! ```

use async_trait::async_trait;
use ddns_core::traits::{AccessToken, CredentialProvider};
use ddns_core::{Error, Result};
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::Mutex;

/// Azure AD authority for the public cloud
pub const AUTHORITY_HOST: &str = "https://login.microsoftonline.com";

/// Scope granting access to Azure Resource Manager
pub const MANAGEMENT_SCOPE: &str = "https://management.azure.com/.default";

/// Default HTTP timeout for token requests
const TOKEN_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Refresh tokens this long before they expire
const REFRESH_MARGIN: Duration = Duration::from_secs(300);

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: String,
}

/// Client-secret credential for an Azure service principal
///
/// The Debug implementation does NOT expose the client secret.
pub struct ClientSecretCredential {
    tenant_id: String,
    client_id: String,
    /// ⚠️ NEVER log this value
    client_secret: String,
    authority_host: String,
    client: reqwest::Client,
    cached: Mutex<Option<AccessToken>>,
}

impl std::fmt::Debug for ClientSecretCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSecretCredential")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<REDACTED>")
            .field("authority_host", &self.authority_host)
            .finish()
    }
}

impl ClientSecretCredential {
    /// Create a credential for the public Azure cloud
    ///
    /// Fails with [`Error::Credential`] if any identifier is empty.
    pub fn new(
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Result<Self> {
        let tenant_id = tenant_id.into();
        let client_id = client_id.into();
        let client_secret = client_secret.into();

        if tenant_id.trim().is_empty() {
            return Err(Error::credential("Tenant id cannot be empty"));
        }
        if client_id.trim().is_empty() {
            return Err(Error::credential("Client id cannot be empty"));
        }
        if client_secret.is_empty() {
            return Err(Error::credential("Client secret cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(TOKEN_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            tenant_id,
            client_id,
            client_secret,
            authority_host: AUTHORITY_HOST.to_string(),
            client,
            cached: Mutex::new(None),
        })
    }

    /// Use a different authority (sovereign clouds, tests)
    pub fn with_authority_host(mut self, authority_host: impl Into<String>) -> Self {
        self.authority_host = authority_host.into().trim_end_matches('/').to_string();
        self
    }

    fn token_url(&self) -> String {
        format!("{}/{}/oauth2/v2.0/token", self.authority_host, self.tenant_id)
    }

    async fn request_token(&self) -> Result<AccessToken> {
        tracing::debug!("Requesting Azure AD token for client {}", self.client_id);

        let response = self
            .client
            .post(self.token_url())
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("scope", MANAGEMENT_SCOPE),
            ])
            .send()
            .await
            .map_err(|e| Error::credential(format!("Token request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<TokenErrorResponse>(&body)
                .map(|e| format!("{}: {}", e.error, e.error_description))
                .unwrap_or(body);
            return Err(Error::credential(format!(
                "Azure AD rejected service principal {} ({}): {}",
                self.client_id, status, detail
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| Error::credential(format!("Failed to parse token response: {}", e)))?;

        tracing::debug!("Obtained Azure AD token valid for {}s", token.expires_in);
        Ok(AccessToken::new(
            token.access_token,
            Duration::from_secs(token.expires_in),
        ))
    }
}

#[async_trait]
impl CredentialProvider for ClientSecretCredential {
    async fn token(&self) -> Result<AccessToken> {
        let mut cached = self.cached.lock().await;

        if let Some(token) = cached.as_ref()
            && token.is_fresh(REFRESH_MARGIN)
        {
            return Ok(token.clone());
        }

        let token = self.request_token().await?;
        *cached = Some(token.clone());
        Ok(token)
    }
}
