// # DNS IP Resolver
//
// Resolves the public IP by asking a well-known recursive resolver for a
// special hostname that answers with the requester's source address.
//
// ## Default Service
//
// OpenDNS: querying `myip.opendns.com` against `resolver1.opendns.com`
// (208.67.222.222) returns the caller's IPv4 address as an A record.
//
// ## Determinism
//
// The service returns a single record. If an answer ever holds more than
// one, the first record in answer order wins.

use async_trait::async_trait;
use ddns_core::traits::IpResolver;
use ddns_core::{Error, Result};
use hickory_resolver::TokioAsyncResolver;
use hickory_resolver::config::{
    LookupIpStrategy, NameServerConfigGroup, ResolverConfig, ResolverOpts,
};
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

/// Hostname that echoes the requester's address
pub const DEFAULT_ECHO_HOSTNAME: &str = "myip.opendns.com.";

/// resolver1.opendns.com
pub const DEFAULT_NAMESERVER: IpAddr = IpAddr::V4(Ipv4Addr::new(208, 67, 222, 222));

/// Default query timeout (10 seconds)
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// DNS-based public IP resolver
pub struct DnsIpResolver {
    hostname: String,
    resolver: TokioAsyncResolver,
}

impl std::fmt::Debug for DnsIpResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DnsIpResolver")
            .field("hostname", &self.hostname)
            .finish_non_exhaustive()
    }
}

impl DnsIpResolver {
    /// Create a resolver using OpenDNS with the default timeout
    pub fn opendns() -> Self {
        Self::new(DEFAULT_ECHO_HOSTNAME, DEFAULT_NAMESERVER, DEFAULT_TIMEOUT)
    }

    /// Create a resolver querying `nameserver` for `hostname`
    pub fn new(hostname: impl Into<String>, nameserver: IpAddr, timeout: Duration) -> Self {
        let config = ResolverConfig::from_parts(
            None,
            Vec::new(),
            NameServerConfigGroup::from_ips_clear(&[nameserver], 53, true),
        );

        let mut opts = ResolverOpts::default();
        opts.timeout = timeout;
        opts.attempts = 1;
        // Every call must reach the echo service; a cached answer would hide a change.
        opts.cache_size = 0;
        opts.ip_strategy = LookupIpStrategy::Ipv4Only;

        Self {
            hostname: hostname.into(),
            resolver: TokioAsyncResolver::tokio(config, opts),
        }
    }
}

/// Pick the first address in answer order
fn first_address(hostname: &str, answers: impl IntoIterator<Item = IpAddr>) -> Result<IpAddr> {
    answers
        .into_iter()
        .next()
        .ok_or_else(|| Error::resolution(format!("DNS lookup of {} returned no address", hostname)))
}

#[async_trait]
impl IpResolver for DnsIpResolver {
    async fn resolve(&self) -> Result<IpAddr> {
        tracing::debug!("Querying {} for public IP", self.hostname);

        let lookup = self
            .resolver
            .lookup_ip(self.hostname.as_str())
            .await
            .map_err(|e| Error::resolution(format!("DNS lookup of {} failed: {}", self.hostname, e)))?;

        first_address(&self.hostname, lookup.iter())
    }

    fn name(&self) -> &'static str {
        "dns"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unreachable_nameserver_is_resolution_error() {
        // TEST-NET-1 address: nothing answers, so the query times out.
        let resolver = DnsIpResolver::new(
            DEFAULT_ECHO_HOSTNAME,
            IpAddr::from([192, 0, 2, 1]),
            Duration::from_millis(200),
        );

        let err = resolver.resolve().await.unwrap_err();
        assert!(matches!(err, Error::Resolution(_)), "got {:?}", err);
    }

    #[test]
    fn first_answer_wins() {
        let answers = [IpAddr::from([203, 0, 113, 8]), IpAddr::from([203, 0, 113, 9])];
        assert_eq!(
            first_address(DEFAULT_ECHO_HOSTNAME, answers).unwrap(),
            IpAddr::from([203, 0, 113, 8])
        );
    }

    #[test]
    fn single_answer_is_returned() {
        assert_eq!(
            first_address(DEFAULT_ECHO_HOSTNAME, [IpAddr::from([198, 51, 100, 20])]).unwrap(),
            IpAddr::from([198, 51, 100, 20])
        );
    }

    #[test]
    fn empty_answer_is_resolution_error() {
        let err = first_address(DEFAULT_ECHO_HOSTNAME, std::iter::empty()).unwrap_err();
        assert!(matches!(err, Error::Resolution(_)), "got {:?}", err);
        assert!(err.to_string().contains("myip.opendns.com"));
    }

    #[tokio::test]
    async fn opendns_defaults() {
        let resolver = DnsIpResolver::opendns();
        assert_eq!(resolver.hostname, "myip.opendns.com.");
        assert_eq!(resolver.name(), "dns");
    }
}
