// # IP Resolver Trait
//
// Defines the interface for discovering the host's current public IP.
//
// ## Implementations
//
// - HTTP echo service: `ddns-ip-http` crate
// - DNS echo hostname: `ddns-ip-dns` crate
//
// ## Usage
//
// ```rust,ignore
// use ddns_core::IpResolver;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let resolver = /* IpResolver implementation */;
//     let ip = resolver.resolve().await?;
//     println!("public IP: {}", ip);
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::net::IpAddr;

/// Trait for public IP resolver implementations
///
/// Each call is independent: implementations hold no state between calls
/// beyond reusable clients, and never cache a previous answer.
///
/// # Contract
///
/// - Exactly one address per call. When the underlying service returns
///   several, the implementation picks one deterministically and documents
///   which, since alternating between equally valid answers would look like
///   an IP change to the engine.
/// - Bounded: implementations apply their own request timeout. The engine
///   additionally wraps every call in its own deadline.
/// - Every failure (network, timeout, non-success response, unparsable or
///   empty answer) is reported as [`Error::Resolution`](crate::Error::Resolution).
#[async_trait]
pub trait IpResolver: Send + Sync {
    /// Resolve the current public IP address
    async fn resolve(&self) -> Result<IpAddr, crate::Error>;

    /// Short name of the lookup strategy (for logging)
    fn name(&self) -> &'static str;
}

/// Parse a plain-text "echo my IP" answer
///
/// Surrounding whitespace is ignored. If the body holds more than one line,
/// the first non-empty line is used. A blank body is an error, never a
/// valid "changed" value.
pub fn parse_resolved_address(body: &str) -> Result<IpAddr, crate::Error> {
    let candidate = body
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .ok_or_else(|| crate::Error::resolution("Empty response from IP echo service"))?;

    candidate
        .parse()
        .map_err(|_| crate::Error::resolution(format!("Invalid IP address: '{candidate}'")))
}
