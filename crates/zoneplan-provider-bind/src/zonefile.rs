//! Zone-file pretty-printer
//!
//! Emits a stable, diff-friendly master file: records in a total
//! order (so rewrites of the same data are byte-identical), a `$TTL`
//! header carrying the zone's most common TTL, and fixed column
//! widths with the name and TTL columns elided where redundant.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::io::Write;
use zoneplan_core::{RData, RecordConfig, RecordType, Result};

/// Column widths for name, ttl, class, type, target.
const COLUMN_WIDTHS: [usize; 5] = [10, 5, 2, 5, 0];

/// Write the records as a zone file in canonical order.
pub fn write_zone_file(w: &mut impl Write, records: &[RecordConfig]) -> Result<()> {
    let default_ttl = most_common_ttl(records);
    let mut sorted: Vec<&RecordConfig> = records.iter().collect();
    sorted.sort_by(|a, b| record_cmp(a, b));

    writeln!(w, "$TTL {default_ttl}")?;
    let mut previous_name: Option<&str> = None;
    for rec in sorted {
        let short = rec.get_label();
        let name = if previous_name == Some(short) { "" } else { short };
        previous_name = Some(short);

        let ttl = if rec.ttl != default_ttl && rec.ttl != 0 {
            rec.ttl.to_string()
        } else {
            String::new()
        };

        let target = rec.get_target_combined();
        let line = format_line(
            &COLUMN_WIDTHS,
            &[name, &ttl, "IN", rec.rtype().as_str(), &target],
        );
        writeln!(w, "{line}")?;
    }
    Ok(())
}

/// Render the records as zone-file text.
pub fn zone_file_text(records: &[RecordConfig]) -> Result<String> {
    let mut buf = Vec::new();
    write_zone_file(&mut buf, records)?;
    // the serializer only ever writes ASCII
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// The zone's default TTL: the most common TTL across non-NS records,
/// ties broken by the highest value.
fn most_common_ttl(records: &[RecordConfig]) -> u32 {
    let mut counts: HashMap<u32, usize> = HashMap::new();
    for rec in records {
        if rec.rtype() != RecordType::Ns {
            *counts.entry(rec.ttl).or_insert(0) += 1;
        }
    }
    let best = counts.values().copied().max().unwrap_or(0);
    counts
        .iter()
        .filter(|(_, &count)| count == best)
        .map(|(&ttl, _)| ttl)
        .max()
        .unwrap_or(0)
}

/// Total order on records: label tier, type tier, then type-specific
/// tiebreakers with the canonical rendering (and finally the TTL) as
/// the fallback.
pub fn record_cmp(a: &RecordConfig, b: &RecordConfig) -> Ordering {
    label_cmp(a.get_label(), b.get_label())
        .then_with(|| rtype_cmp(a.rtype(), b.rtype()))
        .then_with(|| rdata_cmp(a.rdata(), b.rdata()))
        .then_with(|| a.get_target_combined().cmp(&b.get_target_combined()))
        .then_with(|| a.ttl.cmp(&b.ttl))
}

/// `@` sorts first, then `*`, then label-reversed comparison: split
/// on `.` and compare from the rightmost component leftwards, numeric
/// where both sides are numeric; at the leftmost position a bare `*`
/// sorts before anything else.
fn label_cmp(a: &str, b: &str) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }
    match (a, b) {
        ("@", _) => return Ordering::Less,
        (_, "@") => return Ordering::Greater,
        ("*", _) => return Ordering::Less,
        (_, "*") => return Ordering::Greater,
        _ => {}
    }
    let av: Vec<&str> = a.split('.').collect();
    let bv: Vec<&str> = b.split('.').collect();
    let mut i = av.len();
    let mut j = bv.len();
    while i > 0 && j > 0 {
        i -= 1;
        j -= 1;
        let (ac, bc) = (av[i], bv[j]);
        if ac == bc {
            continue;
        }
        if i == 0 && ac == "*" {
            return Ordering::Less;
        }
        if j == 0 && bc == "*" {
            return Ordering::Greater;
        }
        return match (ac.parse::<u64>(), bc.parse::<u64>()) {
            (Ok(an), Ok(bn)) => an.cmp(&bn),
            _ => ac.cmp(bc),
        };
    }
    // one label is a suffix of the other; fewer components first
    av.len().cmp(&bv.len())
}

/// `SOA` first, then `NS`, then ascending numeric type code.
fn rtype_cmp(a: RecordType, b: RecordType) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }
    match (a, b) {
        (RecordType::Soa, _) => Ordering::Less,
        (_, RecordType::Soa) => Ordering::Greater,
        (RecordType::Ns, _) => Ordering::Less,
        (_, RecordType::Ns) => Ordering::Greater,
        _ => a.code().cmp(&b.code()),
    }
}

fn rdata_cmp(a: &RData, b: &RData) -> Ordering {
    match (a, b) {
        (RData::A(x), RData::A(y)) => x.octets().cmp(&y.octets()),
        (RData::Aaaa(x), RData::Aaaa(y)) => x.octets().cmp(&y.octets()),
        (
            RData::Mx {
                preference: pa,
                exchange: ea,
            },
            RData::Mx {
                preference: pb,
                exchange: eb,
            },
        ) => pa.cmp(pb).then_with(|| ea.cmp(eb)),
        (
            RData::Srv {
                priority: pa,
                weight: wa,
                port: porta,
                ..
            },
            RData::Srv {
                priority: pb,
                weight: wb,
                port: portb,
                ..
            },
        ) => porta
            .cmp(portb)
            .then_with(|| pa.cmp(pb))
            .then_with(|| wa.cmp(wb)),
        (RData::Ptr { target: ta }, RData::Ptr { target: tb }) => ta.cmp(tb),
        (
            RData::Caa {
                tag: ta, flag: fa, ..
            },
            RData::Caa {
                tag: tb, flag: fb, ..
            },
        ) => ta.cmp(tb).then_with(|| fb.cmp(fa)), // flag descending
        _ => Ordering::Equal, // defer to the canonical-text fallback
    }
}

/// Pad fields into fixed-width columns, dropping empty fields but
/// keeping their column position.
fn format_line(lengths: &[usize], fields: &[&str]) -> String {
    let mut result = String::new();
    let mut column = 0;
    for (item, length) in fields.iter().zip(lengths) {
        while result.len() < column {
            result.push(' ');
        }
        if !item.is_empty() {
            result.push_str(item);
            result.push(' ');
        }
        column += length + 1;
    }
    result.trim_end().to_string()
}
