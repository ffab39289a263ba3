//! Driver Contract Test: File-Backed Reconciliation
//!
//! End-to-end over a temporary zone directory: fresh zones produce a
//! single rewrite correction, applying it lands the canonical file,
//! an unchanged re-run produces nothing, and rewrites bump the SOA
//! serial monotonically.

use tempfile::tempdir;
use zoneplan_core::{DnsServiceProvider, DomainConfig, RData, RecordConfig, RecordType};
use zoneplan_provider_bind::parser::parse_zone_text;
use zoneplan_provider_bind::{BindProvider, SoaDefaults};

fn a_record(label: &str, origin: &str, ttl: u32, ip: &str) -> RecordConfig {
    let mut rc = RecordConfig::new(RecordType::A);
    rc.set_label(label, origin);
    rc.ttl = ttl;
    rc.set_target(ip).unwrap();
    rc
}

fn domain(records: Vec<RecordConfig>) -> DomainConfig {
    let mut dc = DomainConfig::new("example.com");
    dc.records = records;
    dc
}

fn provider(dir: &std::path::Path) -> BindProvider {
    BindProvider::new(
        dir,
        vec!["ns1.example.net".to_string()],
        SoaDefaults {
            master: "ns1.example.net.".into(),
            mbox: "hostmaster.example.net.".into(),
            ..SoaDefaults::default()
        },
    )
}

fn soa_serial(records: &[RecordConfig]) -> u32 {
    records
        .iter()
        .find_map(|r| match r.rdata() {
            RData::Soa { serial, .. } => Some(*serial),
            _ => None,
        })
        .expect("zone has an SOA")
}

#[tokio::test]
async fn fresh_zone_writes_one_correction_with_record_count() {
    let dir = tempdir().unwrap();
    let bind = provider(dir.path());

    let mut dc = domain(vec![a_record("www", "example.com", 300, "1.2.3.4")]);
    let corrections = bind.get_domain_corrections(&mut dc).await.unwrap();

    assert_eq!(corrections.len(), 1);
    assert!(corrections[0].msg.starts_with("GENERATE_ZONEFILE: example.com"));
    // fresh zone: record count instead of per-change lines
    assert!(corrections[0].msg.contains("(2 records)"), "{}", corrections[0].msg);

    corrections.into_iter().next().unwrap().apply().await.unwrap();

    let text = std::fs::read_to_string(dir.path().join("example.com.zone")).unwrap();
    let parsed = parse_zone_text(&text, "example.com").unwrap();
    assert_eq!(parsed.len(), 2); // the A record plus the default SOA
    assert!(text.starts_with("$TTL "));
}

#[tokio::test]
async fn unchanged_zone_produces_no_corrections() {
    let dir = tempdir().unwrap();
    let bind = provider(dir.path());

    let mut dc = domain(vec![a_record("www", "example.com", 300, "1.2.3.4")]);
    let corrections = bind.get_domain_corrections(&mut dc).await.unwrap();
    for c in corrections {
        c.apply().await.unwrap();
    }

    // Same desired state, fresh config: nothing to do. The serial-only
    // SOA rebuild must not force a rewrite.
    let mut dc2 = domain(vec![a_record("www", "example.com", 300, "1.2.3.4")]);
    let corrections = bind.get_domain_corrections(&mut dc2).await.unwrap();
    assert!(corrections.is_empty());
}

#[tokio::test]
async fn rewrite_bumps_the_serial_and_lists_changes() {
    let dir = tempdir().unwrap();
    let bind = provider(dir.path());

    let mut dc = domain(vec![a_record("www", "example.com", 300, "1.2.3.4")]);
    for c in bind.get_domain_corrections(&mut dc).await.unwrap() {
        c.apply().await.unwrap();
    }
    let first = parse_zone_text(
        &std::fs::read_to_string(dir.path().join("example.com.zone")).unwrap(),
        "example.com",
    )
    .unwrap();
    let first_serial = soa_serial(&first);

    // Change the address; the rewrite must carry a higher serial.
    let mut dc2 = domain(vec![a_record("www", "example.com", 300, "5.6.7.8")]);
    let corrections = bind.get_domain_corrections(&mut dc2).await.unwrap();
    assert_eq!(corrections.len(), 1);
    assert!(corrections[0].msg.contains("MODIFY A www.example.com"));
    for c in corrections {
        c.apply().await.unwrap();
    }

    let second = parse_zone_text(
        &std::fs::read_to_string(dir.path().join("example.com.zone")).unwrap(),
        "example.com",
    )
    .unwrap();
    assert!(soa_serial(&second) > first_serial);
    assert!(second
        .iter()
        .any(|r| r.rtype() == RecordType::A && r.get_target_field() == "5.6.7.8"));
}

#[tokio::test]
async fn desired_soa_wins_over_the_default() {
    let dir = tempdir().unwrap();
    let bind = provider(dir.path());

    let mut soa = RecordConfig::new(RecordType::Soa);
    soa.set_label("@", "example.com");
    soa.ttl = 3600;
    soa.set_target("ns9.example.org. admin.example.org. 42 3600 600 604800 1440")
        .unwrap();
    let mut dc = domain(vec![soa]);

    for c in bind.get_domain_corrections(&mut dc).await.unwrap() {
        c.apply().await.unwrap();
    }
    let written = parse_zone_text(
        &std::fs::read_to_string(dir.path().join("example.com.zone")).unwrap(),
        "example.com",
    )
    .unwrap();
    assert_eq!(written.len(), 1);
    assert_eq!(soa_serial(&written), 42);
}

#[tokio::test]
async fn two_soa_records_in_a_zone_file_is_fatal() {
    let dir = tempdir().unwrap();
    std::fs::write(
        dir.path().join("example.com.zone"),
        "$TTL 300\n\
         @ IN SOA a. b. 1 2 3 4 5\n\
         @ IN SOA c. d. 6 7 8 9 10\n",
    )
    .unwrap();

    let bind = provider(dir.path());
    let mut dc = domain(vec![]);
    let err = bind.get_domain_corrections(&mut dc).await.unwrap_err();
    assert!(matches!(err, zoneplan_core::Error::FatalInternal(_)));
}
