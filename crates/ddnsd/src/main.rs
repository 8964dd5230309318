// # ddnsd - Azure DDNS Daemon
//
// Thin integration layer: reads configuration, wires the IP resolver,
// credential and Azure record updater into the reconciler, and runs it until
// SIGINT or SIGTERM. All change detection and update logic lives in ddns-core.
//
// ## Configuration
//
// Environment variables, optionally overlaid by a TOML file named by
// `SECRETS_PATH` (file values win):
//
// - `INTERVAL`: Poll interval as a duration string (`30s`, `5m`, `1h30m`)
// - `AZURE_TENANT_ID`, `AZURE_CLIENT_ID`, `AZURE_CLIENT_SECRET`: Service principal
// - `AZURE_SUBSCRIPTION_ID`, `AZURE_RESOURCE_GROUP`, `AZURE_DNS_ZONE`: Zone location
// - `AZURE_DNS_RECORDS`: Comma-separated record set names (may be empty)
// - `IP_RESOLVER`: `http` (default) or `dns`
// - `IP_RESOLVER_URL`: Echo endpoint for the http resolver (default `https://ifconfig.me`)
//   On dual-stack hosts the default answers with IPv6 and only AAAA is written;
//   use `IP_RESOLVER=dns` to publish the IPv4 address.
// - `LOG_LEVEL`: trace, debug (default), info, warn, error
//
// ## Example
//
// ```bash
// export INTERVAL=5m
// export AZURE_SUBSCRIPTION_ID=00000000-0000-0000-0000-000000000000
// export AZURE_RESOURCE_GROUP=dns
// export AZURE_DNS_ZONE=example.com
// export AZURE_DNS_RECORDS=home,vpn
// export SECRETS_PATH=/run/secrets/ddns.toml   # AZURE_TENANT_ID, AZURE_CLIENT_ID, AZURE_CLIENT_SECRET
//
// ddnsd
// ```

mod settings;

use anyhow::Result;
use ddns_core::config::AgentConfig;
use ddns_core::engine::EngineEvent;
use ddns_core::traits::IpResolver;
use ddns_core::Reconciler;
use ddns_ip_dns::DnsIpResolver;
use ddns_ip_http::HttpIpResolver;
use ddns_provider_azure::{AzureDnsUpdater, ClientSecretCredential};
use settings::{ResolverKind, Settings};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Consecutive credential failures before the daemon repeats its hint
const CREDENTIAL_HINT_EVERY: u32 = 5;

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum DdnsExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<DdnsExitCode> for ExitCode {
    fn from(code: DdnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

fn main() -> ExitCode {
    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return DdnsExitCode::ConfigError.into();
        }
    };

    let config = match settings.agent_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration validation error: {:#}", e);
            return DdnsExitCode::ConfigError.into();
        }
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(settings.log_level)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DdnsExitCode::ConfigError.into();
    }

    info!("Starting ddnsd daemon");
    log_startup_summary(&settings, &config);

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DdnsExitCode::RuntimeError.into();
        }
    };

    rt.block_on(run_daemon(settings, config)).into()
}

fn log_startup_summary(settings: &Settings, config: &AgentConfig) {
    info!(
        "Zone {} in resource group {} (subscription {})",
        settings.zone, settings.resource_group, settings.subscription_id
    );
    info!(
        "Poll interval {:?}, record TTL {}s",
        config.poll_interval,
        config.record_ttl()
    );
    match settings.resolver {
        ResolverKind::Http => info!("IP resolver: http ({})", settings.resolver_url),
        ResolverKind::Dns => info!("IP resolver: dns (OpenDNS)"),
    }

    if config.targets.is_empty() {
        warn!("AZURE_DNS_RECORDS is empty; no record sets will be updated");
    }
    for target in &config.targets {
        info!("Managing record set: {}", target);
    }
}

/// Run the daemon until a shutdown signal arrives
async fn run_daemon(settings: Settings, config: AgentConfig) -> DdnsExitCode {
    let (mut reconciler, events) = match build_reconciler(&settings, &config) {
        Ok(parts) => parts,
        Err(e) => {
            error!("Startup error: {:#}", e);
            return DdnsExitCode::ConfigError;
        }
    };

    let shutdown = match shutdown_signal() {
        Ok(shutdown) => shutdown,
        Err(e) => {
            error!("Shutdown error: {}", e);
            return DdnsExitCode::RuntimeError;
        }
    };

    let monitor = tokio::spawn(monitor_events(events));

    reconciler.run(shutdown).await;

    // Dropping the reconciler closes the event channel and ends the monitor.
    drop(reconciler);
    if let Err(e) = monitor.await {
        error!("Event monitor failed: {}", e);
        return DdnsExitCode::RuntimeError;
    }

    info!("Shutting down daemon");
    DdnsExitCode::CleanShutdown
}

fn build_reconciler(
    settings: &Settings,
    config: &AgentConfig,
) -> Result<(Reconciler, mpsc::Receiver<EngineEvent>)> {
    let credential = ClientSecretCredential::new(
        settings.tenant_id.as_str(),
        settings.client_id.as_str(),
        settings.client_secret.as_str(),
    )?;
    let updater = AzureDnsUpdater::new(Arc::new(credential), config.record_ttl())?;

    let resolver: Box<dyn IpResolver> = match settings.resolver {
        ResolverKind::Http => Box::new(HttpIpResolver::new(settings.resolver_url.as_str())?),
        ResolverKind::Dns => Box::new(DnsIpResolver::opendns()),
    };

    Ok(Reconciler::new(resolver, Box::new(updater), config)?)
}

/// Consecutive credential failures seen by the event monitor
#[derive(Debug, Default)]
struct CredentialStreak {
    failures: u32,
}

impl CredentialStreak {
    /// Track `event`, returning true when the operator hint is due
    fn observe(&mut self, event: &EngineEvent) -> bool {
        match event {
            EngineEvent::CredentialFailed { .. } => {
                self.failures = self.failures.saturating_add(1);
                self.failures % CREDENTIAL_HINT_EVERY == 1
            }
            EngineEvent::Settled { .. } | EngineEvent::Unchanged { .. } => {
                if self.failures > 0 {
                    info!("Azure credentials accepted again");
                }
                self.failures = 0;
                false
            }
            _ => false,
        }
    }
}

/// Surface persistent credential problems the operator has to fix
///
/// Returns the number of hints logged once the channel closes.
async fn monitor_events(mut events: mpsc::Receiver<EngineEvent>) -> u32 {
    let mut streak = CredentialStreak::default();
    let mut hints = 0;

    while let Some(event) = events.recv().await {
        if streak.observe(&event) {
            hints += 1;
            error!(
                "Azure rejected the service principal {} time(s) in a row; \
                check AZURE_TENANT_ID, AZURE_CLIENT_ID, AZURE_CLIENT_SECRET \
                and the DNS Zone Contributor role assignment",
                streak.failures
            );
        }
    }

    hints
}

/// Build a future that completes on SIGTERM or SIGINT
#[cfg(unix)]
fn shutdown_signal() -> Result<impl Future<Output = ()>> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    Ok(async move {
        let signal = tokio::select! {
            _ = sigterm.recv() => "SIGTERM",
            _ = sigint.recv() => "SIGINT",
        };
        info!("Received shutdown signal: {}", signal);
    })
}

/// Build a future that completes on CTRL-C
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
fn shutdown_signal() -> Result<impl Future<Output = ()>> {
    Ok(async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received shutdown signal: SIGINT"),
            Err(e) => error!("Failed to wait for CTRL-C: {}", e),
        }
    })
}
