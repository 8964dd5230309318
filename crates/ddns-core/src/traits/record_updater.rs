// # Record Updater Trait
//
// Defines the interface for writing an address to one record set at the
// DNS provider.
//
// ## Implementations
//
// - Azure DNS: `ddns-provider-azure` crate

use async_trait::async_trait;
use std::net::IpAddr;

use crate::config::RecordTarget;

/// Trait for DNS provider record set writers
///
/// # Contract
///
/// - **Idempotent**: `update` replaces the address record set with exactly
///   `ip`. Calling it twice with the same arguments leaves the provider in the
///   same state as calling it once. The engine relies on this when it
///   re-attempts every target after a partial failure.
/// - **Single-shot**: one write per call, no retries or backoff. Retry policy
///   belongs to the engine.
/// - **Deadline-bound**: implementations configure a request timeout. The
///   engine also wraps every call in its own deadline.
/// - Credential problems are reported as
///   [`Error::Credential`](crate::Error::Credential), everything else as
///   [`Error::Update`](crate::Error::Update).
#[async_trait]
pub trait RecordUpdater: Send + Sync {
    /// Point `target` at `ip`
    async fn update(&self, target: &RecordTarget, ip: IpAddr) -> Result<(), crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}
