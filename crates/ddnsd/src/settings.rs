//! Daemon settings
//!
//! Values come from environment variables. When `SECRETS_PATH` names a TOML
//! file, its top-level keys are layered on top and win over the environment.

use anyhow::{Context, Result, bail};
use ddns_core::config::{AgentConfig, RecordTarget, ZoneRef, parse_duration, parse_record_list};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tracing::Level;

/// Every key the daemon reads
const KEYS: &[&str] = &[
    "INTERVAL",
    "AZURE_TENANT_ID",
    "AZURE_CLIENT_ID",
    "AZURE_CLIENT_SECRET",
    "AZURE_SUBSCRIPTION_ID",
    "AZURE_RESOURCE_GROUP",
    "AZURE_DNS_ZONE",
    "AZURE_DNS_RECORDS",
    "IP_RESOLVER",
    "IP_RESOLVER_URL",
    "LOG_LEVEL",
];

const DEFAULT_LOG_LEVEL: &str = "debug";

/// Public IP lookup strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolverKind {
    /// GET against an echo endpoint
    Http,
    /// OpenDNS `myip.opendns.com` query
    Dns,
}

impl ResolverKind {
    fn parse(value: &str) -> Result<Self> {
        match value.to_lowercase().as_str() {
            "http" => Ok(ResolverKind::Http),
            "dns" => Ok(ResolverKind::Dns),
            _ => bail!(
                "IP_RESOLVER '{}' is not supported. Supported resolvers: http, dns",
                value
            ),
        }
    }
}

/// Validated daemon settings
pub struct Settings {
    pub interval: Duration,
    pub tenant_id: String,
    pub client_id: String,
    /// ⚠️ NEVER log this value
    pub client_secret: String,
    pub subscription_id: String,
    pub resource_group: String,
    pub zone: String,
    pub records: Vec<String>,
    pub resolver: ResolverKind,
    pub resolver_url: String,
    pub log_level: Level,
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("interval", &self.interval)
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<REDACTED>")
            .field("subscription_id", &self.subscription_id)
            .field("resource_group", &self.resource_group)
            .field("zone", &self.zone)
            .field("records", &self.records)
            .field("resolver", &self.resolver)
            .field("resolver_url", &self.resolver_url)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl Settings {
    /// Load settings from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_sources(|key| std::env::var(key).ok())
    }

    /// Load settings using `lookup` in place of the environment
    pub fn from_sources(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut values: HashMap<&'static str, String> = KEYS
            .iter()
            .filter_map(|key| lookup(key).map(|value| (*key, value)))
            .collect();

        if let Some(path) = lookup("SECRETS_PATH")
            && !path.trim().is_empty()
        {
            overlay_secrets_file(&mut values, Path::new(path.trim()))?;
        }

        let required = |key: &str| -> Result<String> {
            match values.get(key).map(|v| v.trim()) {
                Some(value) if !value.is_empty() => Ok(value.to_string()),
                _ => bail!(
                    "{} is required. Set it via: export {}=... or in the SECRETS_PATH file",
                    key,
                    key
                ),
            }
        };
        let optional = |key: &str, default: &str| -> String {
            values
                .get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .unwrap_or(default)
                .to_string()
        };

        let interval_text = required("INTERVAL")?;
        let interval = parse_duration(&interval_text)
            .with_context(|| format!("INTERVAL '{}' is not a valid duration", interval_text))?;
        if interval.is_zero() {
            bail!("INTERVAL must be greater than zero. Got: {}", interval_text);
        }

        let resolver_url = optional("IP_RESOLVER_URL", ddns_ip_http::DEFAULT_URL);
        if !resolver_url.starts_with("https://") && !resolver_url.starts_with("http://") {
            bail!(
                "IP_RESOLVER_URL must use HTTP or HTTPS scheme. Got: {}",
                resolver_url
            );
        }

        let settings = Self {
            interval,
            tenant_id: required("AZURE_TENANT_ID")?,
            client_id: required("AZURE_CLIENT_ID")?,
            // Secrets are taken verbatim; surrounding whitespace may be significant.
            client_secret: match values.get("AZURE_CLIENT_SECRET") {
                Some(secret) if !secret.is_empty() => secret.clone(),
                _ => bail!(
                    "AZURE_CLIENT_SECRET is required. Set it via: export AZURE_CLIENT_SECRET=... \
                    or in the SECRETS_PATH file"
                ),
            },
            subscription_id: required("AZURE_SUBSCRIPTION_ID")?,
            resource_group: required("AZURE_RESOURCE_GROUP")?,
            zone: required("AZURE_DNS_ZONE")?,
            records: parse_record_list(values.get("AZURE_DNS_RECORDS").map_or("", |v| v)),
            resolver: ResolverKind::parse(&optional("IP_RESOLVER", "http"))?,
            resolver_url,
            log_level: parse_log_level(&optional("LOG_LEVEL", DEFAULT_LOG_LEVEL))?,
        };

        Ok(settings)
    }

    /// Build the agent configuration handed to the reconciler
    pub fn agent_config(&self) -> Result<AgentConfig> {
        let zone = ZoneRef::new(&self.subscription_id, &self.resource_group, &self.zone);
        let targets = self
            .records
            .iter()
            .map(|name| RecordTarget::new(name.as_str(), zone.clone()))
            .collect();

        let config = AgentConfig::new(self.interval, targets);
        config
            .validate()
            .context("Configuration validation error")?;
        Ok(config)
    }
}

fn parse_log_level(value: &str) -> Result<Level> {
    match value.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => bail!(
            "LOG_LEVEL '{}' is not valid. Valid levels: trace, debug, info, warn, error",
            value
        ),
    }
}

/// Layer the known keys found in the TOML file at `path` over `values`
fn overlay_secrets_file(values: &mut HashMap<&'static str, String>, path: &Path) -> Result<()> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read SECRETS_PATH file {}", path.display()))?;
    let table: toml::Table = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse SECRETS_PATH file {}", path.display()))?;

    for key in KEYS {
        if let Some(value) = table.get(*key) {
            values.insert(*key, toml_value_to_string(key, value)?);
        }
    }

    Ok(())
}

fn toml_value_to_string(key: &str, value: &toml::Value) -> Result<String> {
    match value {
        toml::Value::String(s) => Ok(s.clone()),
        toml::Value::Integer(i) => Ok(i.to_string()),
        toml::Value::Array(items) => {
            let parts = items
                .iter()
                .map(|item| match item {
                    toml::Value::String(s) => Ok(s.as_str()),
                    _ => bail!("{} in SECRETS_PATH file must be a list of strings", key),
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(parts.join(","))
        }
        _ => bail!("{} in SECRETS_PATH file must be a string", key),
    }
}
