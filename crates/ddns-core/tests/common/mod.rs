//! Test doubles and common utilities for reconciliation contract tests
//!
//! The doubles record every call so tests can assert exactly what the engine
//! asked the outside world to do.

#![allow(dead_code)]

use ddns_core::config::{AgentConfig, RecordTarget, ZoneRef};
use ddns_core::engine::EngineEvent;
use ddns_core::error::{Error, Result};
use ddns_core::traits::{IpResolver, RecordUpdater};
use std::collections::{HashSet, VecDeque};
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

/// One scripted resolver answer
#[derive(Debug, Clone)]
pub enum Answer {
    Ip(IpAddr),
    Fail(&'static str),
    Hang,
}

/// Resolver that replays a script, repeating the last answer once exhausted
pub struct ScriptedResolver {
    script: Arc<Mutex<VecDeque<Answer>>>,
    last: Arc<Mutex<Option<Answer>>>,
    call_count: Arc<AtomicUsize>,
}

impl ScriptedResolver {
    pub fn new(answers: impl IntoIterator<Item = Answer>) -> Self {
        Self {
            script: Arc::new(Mutex::new(answers.into_iter().collect())),
            last: Arc::new(Mutex::new(None)),
            call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Resolver that always answers `ip`
    pub fn fixed(ip: IpAddr) -> Self {
        Self::new([Answer::Ip(ip)])
    }

    /// Create a new ScriptedResolver that shares its script and counters with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            script: Arc::clone(&other.script),
            last: Arc::clone(&other.last),
            call_count: Arc::clone(&other.call_count),
        }
    }

    /// Queue more answers
    pub fn push(&self, answer: Answer) {
        self.script.lock().unwrap().push_back(answer);
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl IpResolver for ScriptedResolver {
    async fn resolve(&self) -> Result<IpAddr> {
        self.call_count.fetch_add(1, Ordering::SeqCst);

        let answer = {
            let next = self.script.lock().unwrap().pop_front();
            let mut last = self.last.lock().unwrap();
            match next {
                Some(answer) => {
                    *last = Some(answer.clone());
                    answer
                }
                None => last.clone().expect("resolver script must not start empty"),
            }
        };

        match answer {
            Answer::Ip(ip) => Ok(ip),
            Answer::Fail(msg) => Err(Error::resolution(msg)),
            Answer::Hang => {
                std::future::pending::<()>().await;
                unreachable!()
            }
        }
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// How the recording updater should treat one record set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    Update,
    Credential,
    Hang,
}

/// Updater that records every call and fails on demand
pub struct RecordingUpdater {
    calls: Arc<Mutex<Vec<(String, IpAddr)>>>,
    failures: Arc<Mutex<Vec<(String, Failure)>>>,
    delay: Duration,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl RecordingUpdater {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            failures: Arc::new(Mutex::new(Vec::new())),
            delay: Duration::ZERO,
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Every update takes `delay` before completing
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Create a new RecordingUpdater that shares its log and failure plan with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            calls: Arc::clone(&other.calls),
            failures: Arc::clone(&other.failures),
            delay: other.delay,
            in_flight: Arc::clone(&other.in_flight),
            max_in_flight: Arc::clone(&other.max_in_flight),
        }
    }

    pub fn fail(&self, record_name: &str, failure: Failure) {
        self.failures
            .lock()
            .unwrap()
            .push((record_name.to_string(), failure));
    }

    pub fn heal(&self, record_name: &str) {
        self.failures
            .lock()
            .unwrap()
            .retain(|(name, _)| name != record_name);
    }

    /// All calls so far, in order
    pub fn calls(&self) -> Vec<(String, IpAddr)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Record set names called so far, in order
    pub fn called_names(&self) -> Vec<String> {
        self.calls().into_iter().map(|(name, _)| name).collect()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn planned_failure(&self, record_name: &str) -> Option<Failure> {
        self.failures
            .lock()
            .unwrap()
            .iter()
            .find(|(name, _)| name == record_name)
            .map(|(_, failure)| *failure)
    }
}

#[async_trait::async_trait]
impl RecordUpdater for RecordingUpdater {
    async fn update(&self, target: &RecordTarget, ip: IpAddr) -> Result<()> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.calls.lock().unwrap().push((target.name.clone(), ip));

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let result = match self.planned_failure(&target.name) {
            None => Ok(()),
            Some(Failure::Update) => Err(Error::update(&target.name, "HTTP 500 from provider")),
            Some(Failure::Credential) => Err(Error::credential("invalid client secret")),
            Some(Failure::Hang) => {
                std::future::pending::<()>().await;
                unreachable!()
            }
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    fn provider_name(&self) -> &'static str {
        "recording"
    }
}

pub fn ip(s: &str) -> IpAddr {
    s.parse().expect("valid test IP")
}

pub fn test_zone() -> ZoneRef {
    ZoneRef::new("00000000-0000-0000-0000-000000000000", "rg-dns", "example.com")
}

/// Helper to create a minimal AgentConfig for testing
pub fn config_with(interval: Duration, record_names: &[&str]) -> AgentConfig {
    let targets = record_names
        .iter()
        .map(|name| RecordTarget::new(*name, test_zone()))
        .collect();
    AgentConfig::new(interval, targets)
}

pub fn minimal_config(record_names: &[&str]) -> AgentConfig {
    config_with(Duration::from_secs(1), record_names)
}

/// Drain every event currently queued
pub fn drain_events(rx: &mut mpsc::Receiver<EngineEvent>) -> Vec<EngineEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Record set names that received no call, used to spot skipped targets
pub fn missing(called: &[String], expected: &[&str]) -> HashSet<String> {
    expected
        .iter()
        .map(|s| s.to_string())
        .filter(|name| !called.contains(name))
        .collect()
}
