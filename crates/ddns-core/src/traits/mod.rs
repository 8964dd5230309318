//! Core traits for the DDNS agent
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`IpResolver`]: Discover the current public IP
//! - [`RecordUpdater`]: Write an address to a record set via a provider API
//! - [`CredentialProvider`]: Obtain bearer tokens for the provider API

pub mod ip_resolver;
pub mod record_updater;
pub mod credential;

pub use ip_resolver::{IpResolver, parse_resolved_address};
pub use record_updater::RecordUpdater;
pub use credential::{AccessToken, CredentialProvider};
