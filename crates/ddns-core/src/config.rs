//! Configuration types for the DDNS agent
//!
//! This module defines the immutable configuration handed to the
//! [`Reconciler`](crate::engine::Reconciler) at construction time, plus the
//! small parsers the daemon uses to build it from strings.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Lowest TTL written to a record set, in seconds
///
/// Providers reject (or silently raise) unreasonably low TTLs.
pub const MIN_RECORD_TTL_SECS: u64 = 60;

/// Highest TTL a record set accepts, in seconds
pub const MAX_RECORD_TTL_SECS: u64 = i32::MAX as u64;

/// Main agent configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// How often the public IP is checked
    pub poll_interval: Duration,

    /// Record sets to keep pointed at the public IP, in update order
    #[serde(default)]
    pub targets: Vec<RecordTarget>,

    /// Optional engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl AgentConfig {
    /// Create a new configuration with default engine settings
    pub fn new(poll_interval: Duration, targets: Vec<RecordTarget>) -> Self {
        Self {
            poll_interval,
            targets,
            engine: EngineConfig::default(),
        }
    }

    /// Validate the configuration
    ///
    /// An empty target list is valid: every cycle then trivially succeeds.
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.poll_interval.is_zero() {
            return Err(crate::Error::config("Poll interval must be greater than zero"));
        }
        if self.poll_interval.as_secs() > MAX_RECORD_TTL_SECS {
            return Err(crate::Error::config(format!(
                "Poll interval {:?} is too long; the derived record TTL may not exceed {}s",
                self.poll_interval, MAX_RECORD_TTL_SECS
            )));
        }

        for target in &self.targets {
            target.validate()?;
        }

        self.engine.validate()
    }

    /// TTL to publish alongside the address
    ///
    /// Tracks the poll interval so a published value is not cached for
    /// longer than it takes the agent to notice a further change, with a
    /// floor of [`MIN_RECORD_TTL_SECS`].
    pub fn record_ttl(&self) -> u32 {
        let secs = self.poll_interval.as_secs().max(MIN_RECORD_TTL_SECS);
        u32::try_from(secs).unwrap_or(u32::MAX)
    }
}

/// Provider addressing context shared by record sets in one zone
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ZoneRef {
    /// Subscription that owns the resource group
    pub subscription_id: String,
    /// Resource group that holds the zone
    pub resource_group: String,
    /// DNS zone name (e.g. "example.com")
    pub zone: String,
}

impl ZoneRef {
    pub fn new(
        subscription_id: impl Into<String>,
        resource_group: impl Into<String>,
        zone: impl Into<String>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group: resource_group.into(),
            zone: zone.into(),
        }
    }

    fn validate(&self) -> Result<(), crate::Error> {
        for (field, value) in [
            ("subscription id", &self.subscription_id),
            ("resource group", &self.resource_group),
            ("zone", &self.zone),
        ] {
            if value.trim().is_empty() {
                return Err(crate::Error::config(format!("Zone {field} cannot be empty")));
            }
            if value.contains('/') {
                return Err(crate::Error::config(format!(
                    "Zone {field} cannot contain '/': {value}"
                )));
            }
        }
        Ok(())
    }
}

/// One record set the agent keeps up to date
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordTarget {
    /// Record set name relative to the zone (e.g. "home", "@")
    pub name: String,
    /// Where the record set lives
    pub zone: ZoneRef,
}

impl RecordTarget {
    /// Create a new record target
    pub fn new(name: impl Into<String>, zone: ZoneRef) -> Self {
        Self {
            name: name.into(),
            zone,
        }
    }

    /// Validate the record target
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.name.is_empty() {
            return Err(crate::Error::config("Record set name cannot be empty"));
        }
        if self.name.chars().any(|c| c.is_whitespace() || c == '/') {
            return Err(crate::Error::config(format!(
                "Record set name contains invalid characters: '{}'",
                self.name
            )));
        }
        self.zone.validate()
    }
}

impl std::fmt::Display for RecordTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.name, self.zone.zone)
    }
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Deadline for a single IP resolution (in seconds)
    #[serde(default = "default_resolve_timeout_secs")]
    pub resolve_timeout_secs: u64,

    /// Deadline for a single record set update (in seconds)
    #[serde(default = "default_update_timeout_secs")]
    pub update_timeout_secs: u64,

    /// Capacity of the internal event channel
    ///
    /// When full, events are dropped with a warning log.
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl EngineConfig {
    fn validate(&self) -> Result<(), crate::Error> {
        if self.resolve_timeout_secs == 0 || self.update_timeout_secs == 0 {
            return Err(crate::Error::config("Engine timeouts must be greater than zero"));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be greater than zero"));
        }
        Ok(())
    }

    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_secs(self.resolve_timeout_secs)
    }

    pub fn update_timeout(&self) -> Duration {
        Duration::from_secs(self.update_timeout_secs)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            resolve_timeout_secs: default_resolve_timeout_secs(),
            update_timeout_secs: default_update_timeout_secs(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_resolve_timeout_secs() -> u64 {
    10
}

fn default_update_timeout_secs() -> u64 {
    30
}

fn default_event_channel_capacity() -> usize {
    1000
}

/// Parse a duration string such as `"30s"`, `"5m"` or `"1h30m"`
///
/// Accepted units: `ns`, `us` (or `µs`), `ms`, `s`, `m`, `h`. Components may
/// carry a fractional part (`"1.5h"`). A bare `"0"` is accepted and yields
/// a zero duration, which [`AgentConfig::validate`] later rejects as an
/// interval.
pub fn parse_duration(input: &str) -> Result<Duration, crate::Error> {
    let s = input.trim();
    if s.is_empty() {
        return Err(crate::Error::config("Duration cannot be empty"));
    }
    if s == "0" {
        return Ok(Duration::ZERO);
    }

    let invalid = || crate::Error::config(format!("Invalid duration: '{input}'"));
    let mut total_nanos: f64 = 0.0;
    let mut rest = s;

    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(|| crate::Error::config(format!("Missing unit in duration: '{input}'")))?;
        if number_len == 0 {
            return Err(invalid());
        }
        let value: f64 = rest[..number_len].parse().map_err(|_| invalid())?;
        rest = &rest[number_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let nanos_per_unit = match &rest[..unit_len] {
            "ns" => 1.0,
            "us" | "µs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60.0 * 1e9,
            "h" => 3600.0 * 1e9,
            unit => {
                return Err(crate::Error::config(format!(
                    "Unknown unit '{unit}' in duration: '{input}'"
                )));
            }
        };
        rest = &rest[unit_len..];
        total_nanos += value * nanos_per_unit;
    }

    // Same ceiling as Go durations: a signed 64-bit count of nanoseconds.
    if !total_nanos.is_finite() || total_nanos > i64::MAX as f64 {
        return Err(invalid());
    }
    Ok(Duration::from_nanos(total_nanos.round() as u64))
}

/// Split a comma-separated record set list, trimming entries and dropping blanks
pub fn parse_record_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
