//! Nameserver resolution and apex NS injection
//!
//! Finds all nameservers a domain should use — every explicitly
//! configured one, plus each bound DSP's own, subject to the binding's
//! quota — and synthesizes the matching apex NS records.

use crate::error::Result;
use crate::model::{DomainConfig, Nameserver, RecordConfig, RecordType};
use tracing::{info, warn};

/// TTL for injected NS records when `ns_ttl` metadata is absent or bad.
const DEFAULT_NS_TTL: u32 = 300;

/// Determine the nameservers a domain should use.
///
/// Explicit nameservers are always taken. Each DSP binding contributes
/// according to its quota: zero contributes nothing, a positive quota
/// takes the first N in driver order, anything else takes all.
/// Returned names have trailing dots stripped; duplicates are
/// preserved.
pub async fn determine_nameservers(dc: &DomainConfig) -> Result<Vec<Nameserver>> {
    let mut ns = dc.nameservers.clone();
    for binding in &dc.dns_provider_instances {
        let quota = binding.number_of_nameservers;
        if quota == 0 {
            continue;
        }
        info!("getting nameservers from: {}", binding.name);
        let reported = binding.driver.get_nameservers(&dc.name).await?;
        let take = if quota > 0 {
            reported.len().min(quota as usize)
        } else {
            reported.len()
        };
        for entry in reported.into_iter().take(take) {
            ns.push(Nameserver::new(entry.name));
        }
    }
    Ok(ns)
}

/// Append one apex NS record per resolved nameserver to the desired
/// set. The TTL comes from the `ns_ttl` metadata key; a value that
/// does not parse as u32 warns and falls back to 300. Targets are
/// written with an enforced trailing dot.
pub fn add_ns_records(dc: &mut DomainConfig) {
    let mut ttl = DEFAULT_NS_TTL;
    if let Some(raw) = dc.metadata.get("ns_ttl") {
        match raw.parse::<u32>() {
            Ok(parsed) => ttl = parsed,
            Err(_) => {
                warn!("ns_ttl for {} ({}) is not a valid integer", dc.name, raw);
            }
        }
    }
    let mut injected = Vec::with_capacity(dc.nameservers.len());
    for ns in &dc.nameservers {
        let mut rc = RecordConfig::new(RecordType::Ns);
        rc.ttl = ttl;
        rc.set_label("@", &dc.name);
        let mut target = ns.name.clone();
        if !target.ends_with('.') {
            target.push('.');
        }
        // hostnames straight out of resolution are never empty
        if let Err(e) = rc.set_target(&target) {
            warn!("skipping nameserver {:?} for {}: {}", ns.name, dc.name, e);
            continue;
        }
        injected.push(rc);
    }
    dc.records.extend(injected);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::model::DspBinding;
    use crate::traits::{Capabilities, DnsServiceProvider};
    use crate::model::Correction;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct StaticNsProvider {
        ns: Vec<&'static str>,
    }

    #[async_trait]
    impl DnsServiceProvider for StaticNsProvider {
        async fn get_nameservers(&self, _domain: &str) -> Result<Vec<Nameserver>> {
            Ok(self.ns.iter().map(|n| Nameserver { name: n.to_string() }).collect())
        }

        async fn get_domain_corrections(
            &self,
            _dc: &mut DomainConfig,
        ) -> Result<Vec<Correction>> {
            Ok(Vec::new())
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl DnsServiceProvider for FailingProvider {
        async fn get_nameservers(&self, domain: &str) -> Result<Vec<Nameserver>> {
            Err(Error::provider("failing", format!("no nameservers for {domain}")))
        }

        async fn get_domain_corrections(
            &self,
            _dc: &mut DomainConfig,
        ) -> Result<Vec<Correction>> {
            Ok(Vec::new())
        }
    }

    fn binding(driver: Arc<dyn DnsServiceProvider>, quota: i32) -> DspBinding {
        DspBinding {
            name: "test".to_string(),
            provider_type: "TEST".to_string(),
            driver,
            number_of_nameservers: quota,
            capabilities: Capabilities::new(),
        }
    }

    #[tokio::test]
    async fn explicit_plus_quota_limited_driver_nameservers() {
        let mut dc = DomainConfig::new("example.com");
        dc.nameservers = vec![Nameserver::new("ns1.example.net")];
        dc.dns_provider_instances = vec![binding(
            Arc::new(StaticNsProvider {
                ns: vec!["d1.x.", "d2.x.", "d3.x."],
            }),
            2,
        )];
        dc.metadata.insert("ns_ttl".into(), "86400".into());

        dc.nameservers = determine_nameservers(&dc).await.unwrap();
        assert_eq!(
            dc.nameservers
                .iter()
                .map(|n| n.name.as_str())
                .collect::<Vec<_>>(),
            vec!["ns1.example.net", "d1.x", "d2.x"]
        );

        add_ns_records(&mut dc);
        let ns_records: Vec<&RecordConfig> = dc
            .records
            .iter()
            .filter(|r| r.rtype() == RecordType::Ns)
            .collect();
        assert_eq!(ns_records.len(), 3);
        for r in &ns_records {
            assert_eq!(r.ttl, 86400);
            assert_eq!(r.get_label(), "@");
        }
        assert_eq!(ns_records[0].get_target_field(), "ns1.example.net.");
        assert_eq!(ns_records[1].get_target_field(), "d1.x.");
        assert_eq!(ns_records[2].get_target_field(), "d2.x.");
    }

    #[tokio::test]
    async fn zero_quota_skips_the_driver() {
        let mut dc = DomainConfig::new("example.com");
        dc.dns_provider_instances = vec![binding(
            Arc::new(StaticNsProvider {
                ns: vec!["d1.x.", "d2.x."],
            }),
            0,
        )];
        let resolved = determine_nameservers(&dc).await.unwrap();
        assert!(resolved.is_empty());
    }

    #[tokio::test]
    async fn negative_quota_takes_all() {
        let mut dc = DomainConfig::new("example.com");
        dc.dns_provider_instances = vec![binding(
            Arc::new(StaticNsProvider {
                ns: vec!["d1.x.", "d2.x."],
            }),
            -1,
        )];
        let resolved = determine_nameservers(&dc).await.unwrap();
        assert_eq!(resolved.len(), 2);
    }

    #[tokio::test]
    async fn driver_failure_propagates() {
        let mut dc = DomainConfig::new("example.com");
        dc.dns_provider_instances = vec![binding(Arc::new(FailingProvider), -1)];
        let err = determine_nameservers(&dc).await.unwrap_err();
        assert!(matches!(err, Error::Provider { .. }));
    }

    #[test]
    fn bad_ns_ttl_falls_back_to_default() {
        let mut dc = DomainConfig::new("example.com");
        dc.nameservers = vec![Nameserver::new("ns1.example.net")];
        dc.metadata.insert("ns_ttl".into(), "a lot".into());
        add_ns_records(&mut dc);
        assert_eq!(dc.records[0].ttl, 300);
    }
}
