//! Zone-file reader
//!
//! Reads the master-file dialect the serializer emits, plus the usual
//! relaxations found in hand-edited files: `$TTL` and `$ORIGIN`
//! directives, name inheritance from the previous record, optional
//! TTL and class in either order, parenthesized multi-line data (SOA),
//! quoted character strings, and `;` comments.
//!
//! Malformed lines and unknown record types are logged and skipped —
//! the plan built from the rest still stands, and the warning is the
//! operator's cue to inspect the file. A class other than `IN` is an
//! invariant violation and aborts.

use std::str::FromStr;
use tracing::warn;
use zoneplan_core::{Error, RecordConfig, RecordType, Result};

/// Fallback TTL when a file carries neither `$TTL` nor explicit TTLs.
const FALLBACK_TTL: u32 = 3600;

/// Parse zone-file text into records.
///
/// `origin` is the zone the file belongs to; relative names are
/// qualified against it (or against a `$ORIGIN` directive once seen).
pub fn parse_zone_text(text: &str, origin: &str) -> Result<Vec<RecordConfig>> {
    let origin = origin.trim_end_matches('.').to_ascii_lowercase();
    let mut state = ParseState {
        zone_origin: origin.clone(),
        current_origin: origin,
        default_ttl: None,
        last_name: None,
        records: Vec::new(),
    };

    for (number, line) in logical_lines(text) {
        if let Err(e) = state.take_line(&line) {
            if matches!(e, Error::FatalInternal(_)) {
                return Err(e);
            }
            warn!("zone file line {number}: {e} (skipped): {line:?}");
        }
    }
    Ok(state.records)
}

struct ParseState {
    zone_origin: String,
    current_origin: String,
    default_ttl: Option<u32>,
    last_name: Option<String>,
    records: Vec<RecordConfig>,
}

impl ParseState {
    fn take_line(&mut self, line: &str) -> Result<()> {
        if line.trim().is_empty() {
            return Ok(());
        }

        if let Some(directive) = line.trim_start().strip_prefix('$') {
            return self.take_directive(directive);
        }

        // A line starting in column one names its owner; otherwise the
        // previous record's name carries over.
        let has_name = !line.starts_with(|c: char| c.is_whitespace());
        let mut rest = line.trim_start();

        let name_fqdn = if has_name {
            let (token, after) = split_token(rest);
            rest = after;
            let fqdn = self.qualify(token);
            self.last_name = Some(fqdn.clone());
            fqdn
        } else {
            self.last_name
                .clone()
                .ok_or_else(|| Error::invalid_record("record with no name and no predecessor"))?
        };

        // Optional TTL and class, in either order.
        let mut ttl: Option<u32> = None;
        let rtype = loop {
            let (token, after) = split_token(rest);
            if token.is_empty() {
                return Err(Error::invalid_record("record with no type"));
            }
            if let Ok(parsed) = token.parse::<u32>() {
                if ttl.is_some() {
                    return Err(Error::invalid_record("two TTL fields"));
                }
                ttl = Some(parsed);
                rest = after;
                continue;
            }
            if token.eq_ignore_ascii_case("IN") {
                rest = after;
                continue;
            }
            if ["CH", "HS", "CS", "NONE", "ANY"]
                .iter()
                .any(|c| token.eq_ignore_ascii_case(c))
            {
                return Err(Error::fatal(format!("unsupported record class {token}")));
            }
            break RecordType::from_str(token)?;
        };
        let (_, rdata) = split_type_token(rest);

        let mut rc = RecordConfig::new(rtype);
        rc.ttl = ttl
            .or(self.default_ttl)
            .unwrap_or(FALLBACK_TTL);
        rc.set_label_from_fqdn(&name_fqdn, &self.zone_origin)?;
        rc.populate_from_string(rdata.trim(), &self.current_origin)?;
        self.records.push(rc);
        Ok(())
    }

    fn take_directive(&mut self, directive: &str) -> Result<()> {
        let (keyword, rest) = split_token(directive);
        match keyword.to_ascii_uppercase().as_str() {
            "TTL" => {
                let (value, _) = split_token(rest);
                self.default_ttl = Some(
                    value
                        .parse::<u32>()
                        .map_err(|_| Error::invalid_record(format!("bad $TTL {value:?}")))?,
                );
                Ok(())
            }
            "ORIGIN" => {
                let (value, _) = split_token(rest);
                if value.is_empty() {
                    return Err(Error::invalid_record("$ORIGIN with no name"));
                }
                self.current_origin = value.trim_end_matches('.').to_ascii_lowercase();
                Ok(())
            }
            other => Err(Error::invalid_record(format!(
                "unsupported directive ${other}"
            ))),
        }
    }

    /// Resolve a name token against the current origin.
    fn qualify(&self, token: &str) -> String {
        if token == "@" {
            return self.current_origin.clone();
        }
        if let Some(absolute) = token.strip_suffix('.') {
            return absolute.to_ascii_lowercase();
        }
        format!("{}.{}", token.to_ascii_lowercase(), self.current_origin)
    }

}

/// Split off the first whitespace-delimited token.
fn split_token(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    match s.find(char::is_whitespace) {
        Some(end) => (&s[..end], s[end..].trim_start()),
        None => (s, ""),
    }
}

/// The type token was already parsed; return it and the raw remainder
/// (which may contain quoted strings and must not be re-split).
fn split_type_token(s: &str) -> (&str, &str) {
    split_token(s)
}

/// Fold the file into logical lines: strip `;` comments outside
/// quotes and join parenthesized continuations, tracking the source
/// line number of each logical line's start.
fn logical_lines(text: &str) -> Vec<(usize, String)> {
    let mut lines = Vec::new();
    let mut pending = String::new();
    let mut pending_start = 0;
    let mut depth = 0usize;

    for (idx, raw) in text.lines().enumerate() {
        let mut cleaned = String::with_capacity(raw.len());
        let mut in_quotes = false;
        for c in raw.chars() {
            match c {
                '"' => {
                    in_quotes = !in_quotes;
                    cleaned.push(c);
                }
                ';' if !in_quotes => break,
                '(' if !in_quotes => {
                    depth += 1;
                    cleaned.push(' ');
                }
                ')' if !in_quotes => {
                    depth = depth.saturating_sub(1);
                    cleaned.push(' ');
                }
                c => cleaned.push(c),
            }
        }

        if pending.is_empty() {
            pending_start = idx + 1;
            pending = cleaned;
        } else {
            pending.push(' ');
            pending.push_str(cleaned.trim_start());
        }

        if depth == 0 {
            if !pending.trim().is_empty() {
                lines.push((pending_start, std::mem::take(&mut pending)));
            } else {
                pending.clear();
            }
        }
    }
    if !pending.trim().is_empty() {
        lines.push((pending_start, pending));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use zoneplan_core::RData;

    #[test]
    fn parses_serializer_output_shape() {
        let text = "\
$TTL 300
@                IN SOA   ns1.example.com. host.example.com. 2020060101 3600 600 604800 1440
                 IN NS    ns1.example.com.
mail             IN A     2.3.4.5
www              IN A     1.2.3.4
           600   IN A     1.2.3.5
";
        let records = parse_zone_text(text, "example.com").unwrap();
        assert_eq!(records.len(), 5);
        assert_eq!(records[0].rtype(), RecordType::Soa);
        assert_eq!(records[1].rtype(), RecordType::Ns);
        assert_eq!(records[1].get_label(), "@"); // inherited name
        assert_eq!(records[2].get_label(), "mail");
        assert_eq!(records[3].ttl, 300);
        assert_eq!(records[4].ttl, 600);
        assert_eq!(records[4].get_label(), "www"); // inherited name
    }

    #[test]
    fn soa_parentheses_and_comments() {
        let text = "\
$TTL 3600
@ IN SOA ns1.example.com. host.example.com. (
        2020060101 ; serial
        3600       ; refresh
        600        ; retry
        604800     ; expire
        1440 )     ; minimum
";
        let records = parse_zone_text(text, "example.com").unwrap();
        assert_eq!(records.len(), 1);
        match records[0].rdata() {
            RData::Soa { serial, minttl, .. } => {
                assert_eq!(*serial, 2020060101);
                assert_eq!(*minttl, 1440);
            }
            other => panic!("expected SOA, got {other:?}"),
        }
    }

    #[test]
    fn relative_names_and_targets_qualify_against_origin() {
        let text = "\
$TTL 300
www IN CNAME web
web IN A 1.2.3.4
@   IN MX 10 mail
";
        let records = parse_zone_text(text, "example.com").unwrap();
        assert_eq!(records[0].get_target_field(), "web.example.com.");
        assert_eq!(records[1].get_label_fqdn(), "web.example.com");
        assert_eq!(records[2].get_target_combined(), "10 mail.example.com.");
    }

    #[test]
    fn origin_directive_rebases_names() {
        let text = "\
$ORIGIN sub.example.com.
www IN A 1.2.3.4
";
        let records = parse_zone_text(text, "example.com").unwrap();
        assert_eq!(records[0].get_label_fqdn(), "www.sub.example.com");
        assert_eq!(records[0].get_label(), "www.sub");
    }

    #[test]
    fn quoted_txt_chunks_survive() {
        let text = "www 300 IN TXT \"hello world\" \"second chunk; not a comment\"\n";
        let records = parse_zone_text(text, "example.com").unwrap();
        assert_eq!(
            records[0].get_target_combined(),
            "\"hello world\" \"second chunk; not a comment\""
        );
    }

    #[test]
    fn ttl_and_class_in_either_order() {
        let text = "www IN 600 A 1.2.3.4\nmail 600 IN A 2.3.4.5\n";
        let records = parse_zone_text(text, "example.com").unwrap();
        assert_eq!(records[0].ttl, 600);
        assert_eq!(records[1].ttl, 600);
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let text = "\
$TTL 300
www IN A not-an-ip
mail IN A 2.3.4.5
gibberish
";
        let records = parse_zone_text(text, "example.com").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get_label(), "mail");
    }

    #[test]
    fn non_in_class_is_fatal() {
        let text = "www 300 CH A 1.2.3.4\n";
        let err = parse_zone_text(text, "example.com").unwrap_err();
        assert!(matches!(err, Error::FatalInternal(_)));
    }

    #[test]
    fn missing_ttl_uses_directive_then_fallback() {
        let records = parse_zone_text("www IN A 1.2.3.4\n", "example.com").unwrap();
        assert_eq!(records[0].ttl, FALLBACK_TTL);
    }
}
