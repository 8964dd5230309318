// # ddns-core
//
// Core library for the DDNS reconciliation agent.
//
// ## Architecture Overview
//
// This library provides the core functionality for dynamic DNS updates:
// - **IpResolver**: Trait for discovering the current public IP
// - **RecordUpdater**: Trait for writing an address to a record set via a provider API
// - **CredentialProvider**: Trait for obtaining provider API tokens
// - **Reconciler**: Polling loop that owns the last published IP and drives updates
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from provider and lookup implementations
// 2. **All-or-nothing publication**: The published IP only advances when every target succeeded
// 3. **Library-First**: All core functionality can be used as a library
// 4. **Bounded**: Every network call runs under a deadline; shutdown is prompt

pub mod traits;
pub mod engine;
pub mod config;
pub mod error;

// Re-export core types for convenience
pub use traits::{CredentialProvider, IpResolver, RecordUpdater};
pub use engine::{AgentState, CycleOutcome, EngineEvent, Reconciler};
pub use config::{AgentConfig, EngineConfig, RecordTarget, ZoneRef};
pub use error::{Error, Result};
