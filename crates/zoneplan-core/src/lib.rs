//! # zoneplan-core
//!
//! Core library for the declarative DNS reconciliation engine.
//!
//! An operator's desired state — zones, records, delegation — is
//! reconciled against the live state at one or more DNS service
//! providers, producing an ordered list of corrections that the
//! caller previews or applies.
//!
//! ## Architecture Overview
//!
//! - **model**: canonical record and domain representation
//! - **diff**: correlates existing vs desired records into a plan
//! - **nameservers**: resolves and injects apex NS records
//! - **traits**: the DSP and registrar driver contracts
//! - **registry**: type-name → driver factory + capability table
//! - **engine**: per-domain orchestration of the above
//! - **creds**: the credentials file drivers are built from
//!
//! ## Design Principles
//!
//! 1. **Separation of concerns**: the core never talks to a provider
//!    API; drivers live behind the traits
//! 2. **Plan, then act**: corrections are data until the caller
//!    decides to run them
//! 3. **Plugin-based**: drivers register factories by type name
//! 4. **Normalization at the edge**: records are canonical from the
//!    moment a setter accepts them

pub mod creds;
pub mod diff;
pub mod engine;
pub mod error;
pub mod model;
pub mod nameservers;
pub mod registry;
pub mod traits;

// Re-export core types for convenience
pub use diff::{Changeset, Correlation, Diff, Differ};
pub use engine::{apply_corrections, DomainResult, ReconcileEngine};
pub use error::{Error, Result};
pub use model::{
    post_process_records, Correction, DomainConfig, DspBinding, Nameserver, RData, RecordConfig,
    RecordKey, RecordType, RegistrarBinding,
};
pub use registry::ProviderRegistry;
pub use traits::{Capabilities, Capability, DnsServiceProvider, DspFactory, Registrar};
