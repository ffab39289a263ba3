//! Serialize → parse round-trip
//!
//! Whatever the serializer writes, the parser reads back to the same
//! canonical records (modulo SOA serial rebuilding, which the driver
//! owns, and the default-TTL elision the parser re-expands).

use zoneplan_core::{RecordConfig, RecordType};
use zoneplan_provider_bind::parser::parse_zone_text;
use zoneplan_provider_bind::zonefile::zone_file_text;

fn rec(label: &str, ttl: u32, rtype: RecordType, data: &str) -> RecordConfig {
    let mut rc = RecordConfig::new(rtype);
    rc.set_label(label, "example.com");
    rc.ttl = ttl;
    rc.populate_from_string(data, "example.com").unwrap();
    rc
}

fn canonical(records: &[RecordConfig]) -> Vec<(String, u32, String, String)> {
    let mut out: Vec<_> = records
        .iter()
        .map(|r| {
            (
                r.get_label_fqdn().to_string(),
                r.ttl,
                r.rtype().to_string(),
                r.get_target_combined(),
            )
        })
        .collect();
    out.sort();
    out
}

#[test]
fn full_zone_round_trips() {
    let records = vec![
        rec(
            "@",
            3600,
            RecordType::Soa,
            "ns1.example.com. hostmaster.example.com. 2020060101 3600 600 604800 1440",
        ),
        rec("@", 86400, RecordType::Ns, "ns1.example.net."),
        rec("@", 86400, RecordType::Ns, "ns2.example.net."),
        rec("@", 300, RecordType::Mx, "10 mail.example.com."),
        rec("@", 300, RecordType::Mx, "20 backup.example.com."),
        rec("@", 300, RecordType::Txt, "\"v=spf1 mx -all\""),
        rec("@", 300, RecordType::Caa, "0 issue \"letsencrypt.org\""),
        rec("www", 300, RecordType::A, "1.2.3.4"),
        rec("www", 300, RecordType::A, "1.2.3.5"),
        rec("www", 300, RecordType::Aaaa, "2001:db8::1"),
        rec("*", 600, RecordType::Cname, "www.example.com."),
        rec("ftp", 300, RecordType::Cname, "www.example.com."),
        rec("txt", 300, RecordType::Txt, "\"chunk one\" \"chunk two\""),
        rec("_sip._udp", 300, RecordType::Srv, "5 10 5060 sip.example.com."),
        rec("4.3.2.1", 300, RecordType::Ptr, "host.example.com."),
        rec("ssh", 300, RecordType::Sshfp, "1 1 0123456789abcdef"),
        rec("_443._tcp", 300, RecordType::Tlsa, "3 1 1 abcdef012345"),
        rec(
            "naptr",
            300,
            RecordType::Naptr,
            "100 50 \"s\" \"SIP+D2U\" \"\" _sip._udp.example.com.",
        ),
    ];

    let text = zone_file_text(&records).unwrap();
    let parsed = parse_zone_text(&text, "example.com").unwrap();

    assert_eq!(canonical(&records), canonical(&parsed));
}

#[test]
fn round_trip_is_a_fixpoint() {
    let records = vec![
        rec("@", 300, RecordType::Ns, "ns1.example.net."),
        rec("www", 300, RecordType::A, "1.2.3.4"),
        rec("mail", 600, RecordType::A, "2.3.4.5"),
    ];
    let text = zone_file_text(&records).unwrap();
    let parsed = parse_zone_text(&text, "example.com").unwrap();
    let text2 = zone_file_text(&parsed).unwrap();
    assert_eq!(text, text2);
}
