// # Credential Provider Trait
//
// Exchanges long-lived service principal secrets for short-lived bearer
// tokens. Record updaters ask for a token before every write; providers may
// cache it until it is close to expiry.

use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;

/// Longest lifetime a token is trusted for, whatever the issuer claims
pub const MAX_TOKEN_LIFETIME: Duration = Duration::from_secs(24 * 60 * 60);

/// A bearer token with its expiry
///
/// The Debug implementation does NOT expose the token.
#[derive(Clone)]
pub struct AccessToken {
    secret: String,
    expires_at: Instant,
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("secret", &"<REDACTED>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl AccessToken {
    /// Create a token that expires `lifetime` from now
    ///
    /// Lifetimes above [`MAX_TOKEN_LIFETIME`] are capped.
    pub fn new(secret: impl Into<String>, lifetime: Duration) -> Self {
        let now = Instant::now();
        let lifetime = lifetime.min(MAX_TOKEN_LIFETIME);
        Self {
            secret: secret.into(),
            expires_at: now.checked_add(lifetime).unwrap_or(now),
        }
    }

    /// The raw bearer value
    /// ⚠️ NEVER log this value
    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// Whether the token stays valid for at least `margin` longer
    pub fn is_fresh(&self, margin: Duration) -> bool {
        Instant::now()
            .checked_add(margin)
            .is_some_and(|deadline| deadline < self.expires_at)
    }
}

/// Trait for credential provider implementations
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Get a token valid for the provider's management API
    ///
    /// Any failure is reported as [`Error::Credential`](crate::Error::Credential).
    async fn token(&self) -> Result<AccessToken, crate::Error>;
}
