//! DNS service provider contract
//!
//! A DSP driver answers two questions for a zone — "which nameservers
//! do you serve it from" and "what has to change to make the live
//! records match the desired ones" — and optionally knows how to
//! create the zone when it is absent.
//!
//! Drivers are expected to be safe for concurrent use across distinct
//! domains; the engine never calls one driver concurrently for the
//! same domain. Long-running calls should observe the caller's
//! cancellation at each request boundary.

use crate::error::Result;
use crate::model::{Correction, DomainConfig, Nameserver, RData, RecordConfig};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Trait for DSP driver implementations.
#[async_trait]
pub trait DnsServiceProvider: Send + Sync {
    /// The nameservers this provider serves the domain from.
    async fn get_nameservers(&self, domain: &str) -> Result<Vec<Nameserver>>;

    /// Compute the corrections that bring the provider's live records
    /// for this domain into conformance with the desired ones.
    ///
    /// The config is mutable so a driver can complete the desired set
    /// (the file-backed driver appends a rebuilt SOA). Corrections are
    /// returned, never executed here.
    async fn get_domain_corrections(&self, dc: &mut DomainConfig) -> Result<Vec<Correction>>;

    /// Create the zone on the provider if it does not exist.
    /// Idempotent. The default implementation does nothing.
    async fn ensure_domain_exists(&self, _domain: &str) -> Result<()> {
        Ok(())
    }
}

/// Constructs DSP drivers from per-instance credentials plus the
/// optional provider metadata block.
#[async_trait]
pub trait DspFactory: Send + Sync {
    /// Create a driver instance.
    async fn create(
        &self,
        config: &HashMap<String, String>,
        metadata: Option<&serde_json::Value>,
    ) -> Result<Arc<dyn DnsServiceProvider>>;
}

/// Features a driver type may or may not support.
///
/// An enum rather than strings so that adding a capability forces
/// every match over it to be revisited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// ALIAS/flattened-CNAME records at the apex
    CanUseAlias,
    /// CAA records
    CanUseCaa,
    /// PTR records
    CanUsePtr,
    /// SRV records
    CanUseSrv,
    /// NAPTR records
    CanUseNaptr,
    /// SSHFP records
    CanUseSshfp,
    /// TLSA records
    CanUseTlsa,
    /// TXT records with more than one chunk
    CanUseTxtMulti,
    /// Set when the provider cannot leave unknown records in place
    /// (i.e. `keep_unknown` does not work against it)
    CantUseNopurge,
    /// The driver can create absent zones
    DocCreateDomains,
    /// Suitable for serving a zone together with another provider
    DocDualHost,
    /// Officially supported by the project
    DocOfficiallySupported,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::CanUseAlias => "ALIAS records",
            Capability::CanUseCaa => "CAA records",
            Capability::CanUsePtr => "PTR records",
            Capability::CanUseSrv => "SRV records",
            Capability::CanUseNaptr => "NAPTR records",
            Capability::CanUseSshfp => "SSHFP records",
            Capability::CanUseTlsa => "TLSA records",
            Capability::CanUseTxtMulti => "multi-chunk TXT records",
            Capability::CantUseNopurge => "keeping unknown records (NO_PURGE)",
            Capability::DocCreateDomains => "creating domains",
            Capability::DocDualHost => "dual hosting",
            Capability::DocOfficiallySupported => "official support",
        };
        f.write_str(name)
    }
}

/// Whether a driver type supports a capability, with an optional note
/// for the provider matrix documentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Support {
    /// Supported?
    pub can: bool,
    /// Documentation note
    pub note: Option<&'static str>,
}

/// The capability is supported.
pub fn can() -> Support {
    Support { can: true, note: None }
}

/// The capability is supported, with a documentation note.
pub fn can_with(note: &'static str) -> Support {
    Support {
        can: true,
        note: Some(note),
    }
}

/// The capability is not supported.
pub fn cannot() -> Support {
    Support {
        can: false,
        note: None,
    }
}

/// The capability is not supported, with a documentation note.
pub fn cannot_with(note: &'static str) -> Support {
    Support {
        can: false,
        note: Some(note),
    }
}

/// A driver type's capability table. Unlisted capabilities count as
/// unsupported.
#[derive(Debug, Clone, Default)]
pub struct Capabilities(HashMap<Capability, Support>);

impl Capabilities {
    /// Empty table; chain [`Capabilities::set`] to fill it.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare support for one capability.
    pub fn set(mut self, cap: Capability, support: Support) -> Self {
        self.0.insert(cap, support);
        self
    }

    /// Look up a capability's declared support.
    pub fn get(&self, cap: Capability) -> Option<Support> {
        self.0.get(&cap).copied()
    }

    /// Whether the capability is declared supported.
    pub fn can(&self, cap: Capability) -> bool {
        self.0.get(&cap).map(|s| s.can).unwrap_or(false)
    }
}

/// The capability a desired record requires of its hosting drivers,
/// if any.
pub fn required_capability(record: &RecordConfig) -> Option<Capability> {
    match record.rdata() {
        RData::Caa { .. } => Some(Capability::CanUseCaa),
        RData::Ptr { .. } => Some(Capability::CanUsePtr),
        RData::Srv { .. } => Some(Capability::CanUseSrv),
        RData::Naptr { .. } => Some(Capability::CanUseNaptr),
        RData::Sshfp { .. } => Some(Capability::CanUseSshfp),
        RData::Tlsa { .. } => Some(Capability::CanUseTlsa),
        RData::Txt { chunks } if chunks.len() > 1 => Some(Capability::CanUseTxtMulti),
        _ => None,
    }
}
