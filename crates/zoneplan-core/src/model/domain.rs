//! Domain configuration, nameservers, and corrections

use crate::error::{Error, Result};
use crate::model::record::{RecordConfig, RecordType};
use crate::traits::{Capabilities, DnsServiceProvider, Registrar};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// A nameserver a zone is (or should be) delegated to.
///
/// The name carries no trailing dot; drivers that report dotted names
/// have the dot stripped during resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nameserver {
    /// Nameserver hostname, no trailing dot
    pub name: String,
}

impl Nameserver {
    /// Create a nameserver from a hostname, stripping a trailing dot.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            name: name.trim_end_matches('.').to_string(),
        }
    }

    /// Build a nameserver list from plain hostnames.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Vec<Nameserver> {
        names.iter().map(|n| Nameserver::new(n.as_ref())).collect()
    }
}

/// One DSP bound to a domain.
///
/// `number_of_nameservers` is the binding's quota: negative means all
/// of the driver's nameservers, zero means none, positive takes the
/// first N in driver order.
#[derive(Clone)]
pub struct DspBinding {
    /// Credentials-file instance name (e.g. `"inside"`)
    pub name: String,
    /// Registered driver type (e.g. `"BIND"`)
    pub provider_type: String,
    /// The driver itself
    pub driver: Arc<dyn DnsServiceProvider>,
    /// Nameserver quota for this binding
    pub number_of_nameservers: i32,
    /// Capability table of the driver type, copied at instantiation
    pub capabilities: Capabilities,
}

impl fmt::Debug for DspBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DspBinding")
            .field("name", &self.name)
            .field("provider_type", &self.provider_type)
            .field("number_of_nameservers", &self.number_of_nameservers)
            .finish()
    }
}

/// The registrar bound to a domain.
#[derive(Clone)]
pub struct RegistrarBinding {
    /// Credentials-file instance name
    pub name: String,
    /// The registrar driver
    pub driver: Arc<dyn Registrar>,
}

impl fmt::Debug for RegistrarBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrarBinding")
            .field("name", &self.name)
            .finish()
    }
}

/// Desired state for one zone plus its provider bindings.
#[derive(Debug, Clone, Default)]
pub struct DomainConfig {
    /// Zone origin, lowercase, no trailing dot
    pub name: String,
    /// Desired records; exclusively owned by this config
    pub records: Vec<RecordConfig>,
    /// Explicitly configured nameservers
    pub nameservers: Vec<Nameserver>,
    /// DSPs hosting this zone, in binding order
    pub dns_provider_instances: Vec<DspBinding>,
    /// Registrar maintaining the delegation, if managed
    pub registrar_instance: Option<RegistrarBinding>,
    /// Suppress deletions of unmatched existing records
    pub keep_unknown: bool,
    /// Glob patterns for labels the engine must not touch
    pub ignored_labels: Vec<String>,
    /// Free-form metadata; `ns_ttl` selects the TTL of injected NS records
    pub metadata: HashMap<String, String>,
}

impl DomainConfig {
    /// Create a domain config for the given origin.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into().trim_end_matches('.').to_ascii_lowercase(),
            ..Self::default()
        }
    }

    /// Whether a desired record with this type and short label exists.
    pub fn has_record_type_name(&self, rtype: RecordType, label: &str) -> bool {
        self.records
            .iter()
            .any(|r| r.rtype() == rtype && r.get_label() == label)
    }

    /// IDNA-punycode the zone name, record labels, and hostname-valued
    /// targets in place. Idempotent: ASCII input passes through.
    pub fn punycode(&mut self) -> Result<()> {
        self.name = to_ascii(&self.name)?;
        let origin = self.name.clone();
        for rec in &mut self.records {
            let label = rec.get_label().to_string();
            if label != "@" {
                rec.set_label(&to_ascii(&label)?, &origin);
            } else {
                // rebind the (possibly converted) origin
                rec.set_label("@", &origin);
            }
            match rec.rtype() {
                RecordType::Cname
                | RecordType::Ns
                | RecordType::Ptr
                | RecordType::Mx
                | RecordType::Srv => {
                    let target = rec.get_target_field();
                    let converted = to_ascii(target.trim_end_matches('.'))?;
                    rec.set_target(&format!("{converted}."))?;
                }
                _ => {}
            }
        }
        for ns in &mut self.nameservers {
            ns.name = to_ascii(&ns.name)?;
        }
        Ok(())
    }
}

fn to_ascii(name: &str) -> Result<String> {
    if name.is_empty() {
        return Ok(String::new());
    }
    idna::domain_to_ascii(name)
        .map_err(|e| Error::invalid_record(format!("IDNA conversion of {name:?} failed: {e}")))
}

type ApplyFuture = Pin<Box<dyn Future<Output = Result<()>> + Send>>;

/// A single deferred change plus its human-readable message.
///
/// The action captures whatever driver state it needs; it is consumed
/// at most once. Drivers must not assume it will run immediately or at
/// all — preview never runs it.
pub struct Correction {
    /// Single-line human description of the change
    pub msg: String,
    action: Box<dyn FnOnce() -> ApplyFuture + Send>,
}

impl Correction {
    /// Bundle a message with the deferred action that performs it.
    pub fn new<F, Fut>(msg: impl Into<String>, action: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        Self {
            msg: msg.into(),
            action: Box::new(move || {
                let fut: ApplyFuture = Box::pin(action());
                fut
            }),
        }
    }

    /// Perform the change. Consumes the correction.
    pub async fn apply(self) -> Result<()> {
        (self.action)().await
    }
}

impl fmt::Debug for Correction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Correction").field("msg", &self.msg).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nameserver_strips_trailing_dot() {
        assert_eq!(Nameserver::new("ns1.example.com.").name, "ns1.example.com");
        let list = Nameserver::from_names(&["a.x.", "b.x"]);
        assert_eq!(list[0].name, "a.x");
        assert_eq!(list[1].name, "b.x");
    }

    #[test]
    fn punycode_converts_unicode_names() {
        let mut dc = DomainConfig::new("bücher.example");
        let mut rc = RecordConfig::new(RecordType::Cname);
        rc.set_label("www", "bücher.example");
        rc.set_target("zürich.example.net.").unwrap();
        dc.records.push(rc);

        dc.punycode().unwrap();
        assert_eq!(dc.name, "xn--bcher-kva.example");
        assert_eq!(dc.records[0].get_label_fqdn(), "www.xn--bcher-kva.example");
        assert_eq!(
            dc.records[0].get_target_field(),
            "xn--zrich-kva.example.net."
        );
    }

    #[test]
    fn punycode_is_idempotent_on_ascii() {
        let mut dc = DomainConfig::new("example.com");
        let mut rc = RecordConfig::new(RecordType::A);
        rc.set_label("www", "example.com");
        rc.set_target("1.2.3.4").unwrap();
        dc.records.push(rc);

        dc.punycode().unwrap();
        dc.punycode().unwrap();
        assert_eq!(dc.name, "example.com");
        assert_eq!(dc.records[0].get_label_fqdn(), "www.example.com");
    }

    #[test]
    fn has_record_type_name_matches_short_label() {
        let mut dc = DomainConfig::new("example.com");
        let mut soa = RecordConfig::new(RecordType::Soa);
        soa.set_label("@", "example.com");
        dc.records.push(soa);
        assert!(dc.has_record_type_name(RecordType::Soa, "@"));
        assert!(!dc.has_record_type_name(RecordType::Soa, "www"));
        assert!(!dc.has_record_type_name(RecordType::Ns, "@"));
    }

    #[tokio::test]
    async fn correction_is_consumed_once() {
        let flag = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
        let flag2 = flag.clone();
        let c = Correction::new("set the flag", move || async move {
            flag2.store(true, std::sync::atomic::Ordering::SeqCst);
            Ok(())
        });
        assert_eq!(c.msg, "set the flag");
        c.apply().await.unwrap();
        assert!(flag.load(std::sync::atomic::Ordering::SeqCst));
    }
}
