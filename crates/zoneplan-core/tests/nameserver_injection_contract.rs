//! Engine Contract Test: Nameserver Resolution & Injection
//!
//! Explicit nameservers come first, each DSP contributes up to its
//! quota in driver order, and every resolved nameserver becomes one
//! apex NS record with the `ns_ttl` TTL and a dotted target.

mod common;

use common::*;
use std::sync::Arc;
use zoneplan_core::{DomainConfig, Nameserver, ReconcileEngine, RecordType};

#[tokio::test]
async fn explicit_then_quota_limited_driver_nameservers() {
    let mock = Arc::new(MockDsp::with_nameservers(
        vec![],
        &["d1.x.", "d2.x.", "d3.x."],
    ));
    let mut dc = DomainConfig::new("example.com");
    dc.nameservers = vec![Nameserver::new("ns1.example.net")];
    dc.metadata.insert("ns_ttl".into(), "86400".into());
    dc.dns_provider_instances =
        vec![binding("mock", mock.clone(), 2, full_capabilities())];

    let engine = ReconcileEngine::new();
    let result = engine.reconcile_domain(&mut dc).await;
    assert!(result.error.is_none(), "unexpected: {:?}", result.error);

    let ns: Vec<_> = dc
        .records
        .iter()
        .filter(|r| r.rtype() == RecordType::Ns)
        .collect();
    assert_eq!(ns.len(), 3);
    assert_eq!(ns[0].get_target_field(), "ns1.example.net.");
    assert_eq!(ns[1].get_target_field(), "d1.x.");
    assert_eq!(ns[2].get_target_field(), "d2.x.");
    for rec in ns {
        assert_eq!(rec.ttl, 86400);
        assert_eq!(rec.get_label(), "@");
    }
}

#[tokio::test]
async fn resolution_completes_before_any_corrections_call() {
    // The injected NS records must be visible to the driver's diff:
    // a fresh zone therefore creates them.
    let mock = Arc::new(MockDsp::with_nameservers(vec![], &["d1.x."]));
    let mut dc = DomainConfig::new("example.com");
    dc.dns_provider_instances =
        vec![binding("mock", mock.clone(), -1, full_capabilities())];

    let engine = ReconcileEngine::new();
    let result = engine.reconcile_domain(&mut dc).await;
    assert!(result.error.is_none());

    let messages = mock.messages();
    assert_eq!(messages.len(), 1);
    assert!(
        messages[0].starts_with("CREATE NS example.com"),
        "got: {}",
        messages[0]
    );
}

#[tokio::test]
async fn nameserver_failure_aborts_the_domain() {
    let mut dc = DomainConfig::new("example.com");
    dc.dns_provider_instances = vec![binding(
        "broken",
        Arc::new(BrokenDsp),
        -1,
        full_capabilities(),
    )];

    let engine = ReconcileEngine::new();
    let result = engine.reconcile_domain(&mut dc).await;
    assert!(matches!(
        result.error,
        Some(zoneplan_core::Error::Provider { .. })
    ));
    assert!(result.corrections.is_empty());
}
