//! Core reconciliation engine
//!
//! The Reconciler is responsible for:
//! - Polling the IpResolver on a fixed cadence
//! - Comparing the resolved IP with the last IP published to every target
//! - Driving the RecordUpdater across all configured record sets on change
//! - Rolling the whole cycle back when any single update fails
//!
//! ## Architecture
//!
//! ```text
//!      tick ──┐
//!             ▼
//! ┌─────────────┐   resolve()   ┌──────────────┐
//! │ Reconciler  │──────────────►│  IpResolver  │
//! │ (AgentState)│               └──────────────┘
//! └─────────────┘
//!        │ on change, per target, in order
//!        ▼
//! ┌──────────────┐           ┌─────────────┐
//! │ RecordUpdater│           │   Events    │
//! │ (update)     │           │  (notify)   │
//! └──────────────┘           └─────────────┘
//! ```
//!
//! ## Cycle
//!
//! ```text
//! IDLE ─tick─► RESOLVING ─err──────────────────────────────► IDLE
//!                 │ ok
//!                 ▼
//!             COMPARING ─same as published─────────────────► IDLE
//!                 │ changed (or nothing published yet)
//!                 ▼
//!             UPDATING ─any target fails: clear published──► IDLE
//!                 │ all targets ok
//!                 ▼
//!             SETTLED: published = resolved ───────────────► IDLE
//! ```
//!
//! The published IP is never advanced past a cycle in which even one target
//! failed. Since updates are idempotent set-operations, the next tick simply
//! re-attempts every target.

use crate::config::{AgentConfig, RecordTarget};
use crate::error::{Error, Result};
use crate::traits::{IpResolver, RecordUpdater};
use std::future::Future;
use std::net::IpAddr;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// Events emitted by the Reconciler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Engine started
    Started {
        targets_count: usize,
    },

    /// Public IP could not be resolved; state left untouched
    ResolutionFailed {
        error: String,
    },

    /// Resolved IP equals the published one; no remote calls made
    Unchanged {
        ip: IpAddr,
    },

    /// Resolved IP differs from the published one
    IpChanged {
        new_ip: IpAddr,
        previous_ip: Option<IpAddr>,
    },

    /// Record set update started
    UpdateStarted {
        record_name: String,
        new_ip: IpAddr,
    },

    /// Record set update succeeded
    UpdateSucceeded {
        record_name: String,
        new_ip: IpAddr,
    },

    /// Record set update failed
    UpdateFailed {
        record_name: String,
        error: String,
    },

    /// Credential acquisition failed while updating a record set
    CredentialFailed {
        record_name: String,
        error: String,
    },

    /// Every target now points at `ip`
    Settled {
        ip: IpAddr,
    },

    /// At least one target failed; published IP cleared
    CycleFailed {
        new_ip: IpAddr,
        failed_record: String,
    },

    /// Engine stopped
    Stopped {
        reason: String,
    },
}

/// Terminal state of one reconciliation cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Resolution failed; nothing compared or written
    ResolutionFailed,
    /// IP matched the published one; nothing written
    Unchanged(IpAddr),
    /// All targets updated; `ip` is now published
    Settled(IpAddr),
    /// An update failed; published IP cleared
    Failed {
        ip: IpAddr,
        failed_record: String,
    },
}

/// The agent's only mutable state
///
/// Not persisted: a fresh process starts with nothing published, so its first
/// successful resolution always triggers an update, even if the provider
/// already holds that address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentState {
    last_published_ip: Option<IpAddr>,
    poll_interval: Duration,
}

impl AgentState {
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            last_published_ip: None,
            poll_interval,
        }
    }

    /// IP most recently confirmed written to every target
    pub fn last_published_ip(&self) -> Option<IpAddr> {
        self.last_published_ip
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}

/// Core reconciliation engine
///
/// ## Lifecycle
///
/// 1. Create with [`Reconciler::new()`]
/// 2. Start with [`Reconciler::run()`], passing a shutdown future
/// 3. The first cycle runs immediately, then once per poll interval
/// 4. Returns once the shutdown future completes
///
/// ## Threading
///
/// Cycles never overlap: one resolve, then zero or more sequential updates,
/// each finished (or timed out) before the next tick is awaited. A cycle
/// that overruns the interval causes missed ticks to be skipped rather than
/// fired back to back.
pub struct Reconciler {
    /// Public IP lookup
    resolver: Box<dyn IpResolver>,

    /// Record set writer
    updater: Box<dyn RecordUpdater>,

    /// Record sets to manage, in update order
    targets: Vec<RecordTarget>,

    /// Deadline for one resolve() call
    resolve_timeout: Duration,

    /// Deadline for one update() call
    update_timeout: Duration,

    state: AgentState,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<EngineEvent>,
}

impl Reconciler {
    /// Create a new reconciler
    ///
    /// # Returns
    ///
    /// A tuple of (reconciler, event_receiver) where event_receiver yields engine events
    pub fn new(
        resolver: Box<dyn IpResolver>,
        updater: Box<dyn RecordUpdater>,
        config: &AgentConfig,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>)> {
        config.validate()?;

        if config.targets.is_empty() {
            warn!("No record sets configured; cycles will only track the public IP");
        }

        let (tx, rx) = mpsc::channel(config.engine.event_channel_capacity);

        let reconciler = Self {
            resolver,
            updater,
            targets: config.targets.clone(),
            resolve_timeout: config.engine.resolve_timeout(),
            update_timeout: config.engine.update_timeout(),
            state: AgentState::new(config.poll_interval),
            event_tx: tx,
        };

        Ok((reconciler, rx))
    }

    pub fn state(&self) -> &AgentState {
        &self.state
    }

    /// Run the polling loop until `shutdown` completes
    ///
    /// An in-flight cycle is abandoned as soon as shutdown is requested: its
    /// future is dropped, which cancels any outstanding request, and the
    /// published IP is not advanced for it.
    pub async fn run<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let mut ticker = tokio::time::interval(self.state.poll_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            "Reconciler started: {} record set(s) via {}, resolver {}, interval {:?}",
            self.targets.len(),
            self.updater.provider_name(),
            self.resolver.name(),
            self.state.poll_interval()
        );
        self.emit_event(EngineEvent::Started {
            targets_count: self.targets.len(),
        });

        let reason = loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break "Shutdown signal",
                _ = ticker.tick() => {}
            }

            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    warn!("Shutdown requested mid-cycle, abandoning in-flight cycle");
                    break "Shutdown signal during cycle";
                }
                outcome = self.run_cycle() => {
                    debug!("Cycle finished: {:?}", outcome);
                }
            }
        };

        info!("Reconciler stopped: {}", reason);
        self.emit_event(EngineEvent::Stopped {
            reason: reason.to_string(),
        });
    }

    /// Run exactly one reconciliation cycle
    ///
    /// Never fails: every runtime error is logged, reported as an event and
    /// folded into the returned outcome.
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        debug!("Checking public IP via {}", self.resolver.name());

        let ip = match self.resolve().await {
            Ok(ip) => ip,
            Err(e) => {
                error!("Failed to resolve public IP: {}", e);
                self.emit_event(EngineEvent::ResolutionFailed {
                    error: e.to_string(),
                });
                return CycleOutcome::ResolutionFailed;
            }
        };

        let previous_ip = self.state.last_published_ip;
        if previous_ip == Some(ip) {
            debug!("IP unchanged: {}", ip);
            self.emit_event(EngineEvent::Unchanged { ip });
            return CycleOutcome::Unchanged(ip);
        }

        info!("IP changed: {} (previous: {:?})", ip, previous_ip);
        self.emit_event(EngineEvent::IpChanged {
            new_ip: ip,
            previous_ip,
        });

        match self.update_all(ip).await {
            Ok(()) => {
                self.state.last_published_ip = Some(ip);
                info!("All {} record set(s) now point at {}", self.targets.len(), ip);
                self.emit_event(EngineEvent::Settled { ip });
                CycleOutcome::Settled(ip)
            }
            Err(failed_record) => {
                // Forces the next tick to re-attempt every target.
                self.state.last_published_ip = None;
                warn!(
                    "Cycle for {} failed at record set {}; will retry all record sets next tick",
                    ip, failed_record
                );
                self.emit_event(EngineEvent::CycleFailed {
                    new_ip: ip,
                    failed_record: failed_record.clone(),
                });
                CycleOutcome::Failed { ip, failed_record }
            }
        }
    }

    /// Resolve under the engine's own deadline
    async fn resolve(&self) -> Result<IpAddr> {
        match tokio::time::timeout(self.resolve_timeout, self.resolver.resolve()).await {
            Ok(result) => result,
            Err(_) => Err(Error::resolution(format!(
                "{} resolver did not answer within {:?}",
                self.resolver.name(),
                self.resolve_timeout
            ))),
        }
    }

    /// Update every target in order, stopping at the first failure
    ///
    /// # Returns
    ///
    /// - `Ok(())`: every target was updated
    /// - `Err(record_name)`: the first target that failed
    async fn update_all(&self, ip: IpAddr) -> std::result::Result<(), String> {
        for target in &self.targets {
            self.emit_event(EngineEvent::UpdateStarted {
                record_name: target.name.clone(),
                new_ip: ip,
            });
            info!("Updating record set {} -> {}", target, ip);

            match self.update_target(target, ip).await {
                Ok(()) => {
                    info!("Record set {} updated", target);
                    self.emit_event(EngineEvent::UpdateSucceeded {
                        record_name: target.name.clone(),
                        new_ip: ip,
                    });
                }
                Err(e) => {
                    if e.is_credential() {
                        error!(
                            "Credential failure while updating {}: {}. \
                            Check the service principal tenant, client id and secret.",
                            target, e
                        );
                        self.emit_event(EngineEvent::CredentialFailed {
                            record_name: target.name.clone(),
                            error: e.to_string(),
                        });
                    } else {
                        error!("Failed to update record set {}: {}", target, e);
                    }
                    self.emit_event(EngineEvent::UpdateFailed {
                        record_name: target.name.clone(),
                        error: e.to_string(),
                    });
                    return Err(target.name.clone());
                }
            }
        }

        Ok(())
    }

    /// Perform a single update under the engine's own deadline
    async fn update_target(&self, target: &RecordTarget, ip: IpAddr) -> Result<()> {
        match tokio::time::timeout(self.update_timeout, self.updater.update(target, ip)).await {
            Ok(result) => result,
            Err(_) => Err(Error::timeout(format!(
                "update of record set {} exceeded {:?}",
                target, self.update_timeout
            ))),
        }
    }

    /// Emit an engine event
    fn emit_event(&self, event: EngineEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
            }
            // Nobody is listening; events are optional.
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }
}
