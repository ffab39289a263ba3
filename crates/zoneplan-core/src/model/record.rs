//! Record representation and normalization
//!
//! A [`RecordConfig`] is a tagged union over the record type plus the
//! attributes every record shares (label, TTL, metadata). Construction
//! fixes the type; the typed setters validate and normalize at write
//! time so that records flowing through the diff engine are always in
//! canonical form:
//!
//! - the apex is represented as `@` and nothing else
//! - hostname-valued targets are absolute and end in `.`
//! - `A`/`AAAA` targets are held as parsed addresses

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

/// Record type token. The numeric codes are the IANA RR type codes,
/// used by the zone serializer's type ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordType {
    A,
    Aaaa,
    Cname,
    Ns,
    Mx,
    Srv,
    Txt,
    Ptr,
    Caa,
    Naptr,
    Sshfp,
    Tlsa,
    Soa,
}

impl RecordType {
    /// Uppercase ASCII token, as used in zone files and messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
            RecordType::Cname => "CNAME",
            RecordType::Ns => "NS",
            RecordType::Mx => "MX",
            RecordType::Srv => "SRV",
            RecordType::Txt => "TXT",
            RecordType::Ptr => "PTR",
            RecordType::Caa => "CAA",
            RecordType::Naptr => "NAPTR",
            RecordType::Sshfp => "SSHFP",
            RecordType::Tlsa => "TLSA",
            RecordType::Soa => "SOA",
        }
    }

    /// IANA RR type code.
    pub fn code(&self) -> u16 {
        match self {
            RecordType::A => 1,
            RecordType::Ns => 2,
            RecordType::Cname => 5,
            RecordType::Soa => 6,
            RecordType::Ptr => 12,
            RecordType::Mx => 15,
            RecordType::Txt => 16,
            RecordType::Aaaa => 28,
            RecordType::Srv => 33,
            RecordType::Naptr => 35,
            RecordType::Sshfp => 44,
            RecordType::Tlsa => 52,
            RecordType::Caa => 257,
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "A" => Ok(RecordType::A),
            "AAAA" => Ok(RecordType::Aaaa),
            "CNAME" => Ok(RecordType::Cname),
            "NS" => Ok(RecordType::Ns),
            "MX" => Ok(RecordType::Mx),
            "SRV" => Ok(RecordType::Srv),
            "TXT" => Ok(RecordType::Txt),
            "PTR" => Ok(RecordType::Ptr),
            "CAA" => Ok(RecordType::Caa),
            "NAPTR" => Ok(RecordType::Naptr),
            "SSHFP" => Ok(RecordType::Sshfp),
            "TLSA" => Ok(RecordType::Tlsa),
            "SOA" => Ok(RecordType::Soa),
            other => Err(Error::invalid_record(format!(
                "unsupported record type {other:?}"
            ))),
        }
    }
}

/// Per-type record data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RData {
    A(Ipv4Addr),
    Aaaa(Ipv6Addr),
    Cname {
        target: String,
    },
    Ns {
        target: String,
    },
    Mx {
        preference: u16,
        exchange: String,
    },
    Srv {
        priority: u16,
        weight: u16,
        port: u16,
        target: String,
    },
    Txt {
        chunks: Vec<String>,
    },
    Ptr {
        target: String,
    },
    Caa {
        flag: u8,
        tag: String,
        value: String,
    },
    Naptr {
        order: u16,
        preference: u16,
        flags: String,
        service: String,
        regexp: String,
        replacement: String,
    },
    Sshfp {
        algorithm: u8,
        fingerprint_type: u8,
        fingerprint: String,
    },
    Tlsa {
        usage: u8,
        selector: u8,
        matching_type: u8,
        certificate: String,
    },
    Soa {
        mname: String,
        rname: String,
        serial: u32,
        refresh: u32,
        retry: u32,
        expire: u32,
        minttl: u32,
    },
}

impl RData {
    /// An empty value of the given type, filled in by the setters.
    fn empty(rtype: RecordType) -> Self {
        match rtype {
            RecordType::A => RData::A(Ipv4Addr::UNSPECIFIED),
            RecordType::Aaaa => RData::Aaaa(Ipv6Addr::UNSPECIFIED),
            RecordType::Cname => RData::Cname {
                target: String::new(),
            },
            RecordType::Ns => RData::Ns {
                target: String::new(),
            },
            RecordType::Mx => RData::Mx {
                preference: 0,
                exchange: String::new(),
            },
            RecordType::Srv => RData::Srv {
                priority: 0,
                weight: 0,
                port: 0,
                target: String::new(),
            },
            RecordType::Txt => RData::Txt { chunks: Vec::new() },
            RecordType::Ptr => RData::Ptr {
                target: String::new(),
            },
            RecordType::Caa => RData::Caa {
                flag: 0,
                tag: String::new(),
                value: String::new(),
            },
            RecordType::Naptr => RData::Naptr {
                order: 0,
                preference: 0,
                flags: String::new(),
                service: String::new(),
                regexp: String::new(),
                replacement: String::new(),
            },
            RecordType::Sshfp => RData::Sshfp {
                algorithm: 0,
                fingerprint_type: 0,
                fingerprint: String::new(),
            },
            RecordType::Tlsa => RData::Tlsa {
                usage: 0,
                selector: 0,
                matching_type: 0,
                certificate: String::new(),
            },
            RecordType::Soa => RData::Soa {
                mname: String::new(),
                rname: String::new(),
                serial: 0,
                refresh: 0,
                retry: 0,
                expire: 0,
                minttl: 0,
            },
        }
    }

    /// The record type this data belongs to.
    pub fn rtype(&self) -> RecordType {
        match self {
            RData::A(_) => RecordType::A,
            RData::Aaaa(_) => RecordType::Aaaa,
            RData::Cname { .. } => RecordType::Cname,
            RData::Ns { .. } => RecordType::Ns,
            RData::Mx { .. } => RecordType::Mx,
            RData::Srv { .. } => RecordType::Srv,
            RData::Txt { .. } => RecordType::Txt,
            RData::Ptr { .. } => RecordType::Ptr,
            RData::Caa { .. } => RecordType::Caa,
            RData::Naptr { .. } => RecordType::Naptr,
            RData::Sshfp { .. } => RecordType::Sshfp,
            RData::Tlsa { .. } => RecordType::Tlsa,
            RData::Soa { .. } => RecordType::Soa,
        }
    }
}

/// The `(labelFQDN, type)` pair diffing proceeds under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordKey {
    /// Fully-qualified record name, no trailing dot
    pub name_fqdn: String,
    /// Record type
    pub rtype: RecordType,
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.rtype, self.name_fqdn)
    }
}

/// One DNS record in canonical form.
///
/// The record type is fixed at construction; setters for type-specific
/// fields fail with [`Error::InvalidRecord`] when the declared type does
/// not match. `metadata` is diff-transparent unless an extractor
/// projects keys out of it; `original` is an opaque provider handle
/// that never participates in equality or diffing.
#[derive(Debug, Clone)]
pub struct RecordConfig {
    label: String,
    label_fqdn: String,
    rdata: RData,
    /// TTL in seconds; zero means "use the zone default"
    pub ttl: u32,
    /// Free-form provider metadata
    pub metadata: HashMap<String, String>,
    /// Opaque handle a driver may stash (e.g. a provider record id)
    pub original: Option<serde_json::Value>,
}

impl RecordConfig {
    /// Create an empty record of the given type at the apex.
    pub fn new(rtype: RecordType) -> Self {
        Self {
            label: "@".to_string(),
            label_fqdn: String::new(),
            rdata: RData::empty(rtype),
            ttl: 0,
            metadata: HashMap::new(),
            original: None,
        }
    }

    /// The record type declared at construction.
    pub fn rtype(&self) -> RecordType {
        self.rdata.rtype()
    }

    /// The per-type record data.
    pub fn rdata(&self) -> &RData {
        &self.rdata
    }

    /// Short label: `@` for the apex, otherwise the name relative to
    /// the origin. Never contains the origin, never ends in a dot.
    pub fn get_label(&self) -> &str {
        &self.label
    }

    /// Fully-qualified name: the origin for the apex, otherwise
    /// `label.origin`. No trailing dot.
    pub fn get_label_fqdn(&self) -> &str {
        &self.label_fqdn
    }

    /// The `(labelFQDN, type)` diff key.
    pub fn key(&self) -> RecordKey {
        RecordKey {
            name_fqdn: self.label_fqdn.clone(),
            rtype: self.rtype(),
        }
    }

    /// Store the label. `name` equal to the origin, `@`, or empty means
    /// the apex; anything else is kept as the short name, lowercased.
    pub fn set_label(&mut self, name: &str, origin: &str) {
        let origin = origin.trim_end_matches('.').to_ascii_lowercase();
        let name = name.trim_end_matches('.').to_ascii_lowercase();
        if name.is_empty() || name == "@" || name == origin {
            self.label = "@".to_string();
            self.label_fqdn = origin;
        } else {
            self.label_fqdn = format!("{name}.{origin}");
            self.label = name;
        }
    }

    /// Store the label from a fully-qualified name by stripping the
    /// origin suffix. A name that is not under the origin is an error.
    pub fn set_label_from_fqdn(&mut self, fqdn: &str, origin: &str) -> Result<()> {
        let origin = origin.trim_end_matches('.').to_ascii_lowercase();
        let fqdn = fqdn.trim_end_matches('.').to_ascii_lowercase();
        if fqdn == origin {
            self.label = "@".to_string();
            self.label_fqdn = origin;
            return Ok(());
        }
        match fqdn.strip_suffix(&format!(".{origin}")) {
            Some(short) if !short.is_empty() => {
                self.label = short.to_string();
                self.label_fqdn = fqdn;
                Ok(())
            }
            _ => Err(Error::invalid_record(format!(
                "{fqdn:?} is not under origin {origin:?}"
            ))),
        }
    }

    /// Set the primary target value, dispatched on the record type.
    ///
    /// Validates `A`/`AAAA` addresses and forces hostname-valued
    /// targets absolute. For `SOA` the value is the seven-field
    /// presentation form `mname rname serial refresh retry expire
    /// minttl`.
    pub fn set_target(&mut self, value: &str) -> Result<()> {
        match &mut self.rdata {
            RData::A(addr) => {
                *addr = value
                    .parse::<Ipv4Addr>()
                    .map_err(|_| Error::invalid_record(format!("bad A target {value:?}")))?;
            }
            RData::Aaaa(addr) => {
                *addr = value
                    .parse::<Ipv6Addr>()
                    .map_err(|_| Error::invalid_record(format!("bad AAAA target {value:?}")))?;
            }
            RData::Cname { target } | RData::Ns { target } | RData::Ptr { target } => {
                *target = absolute(value)?;
            }
            RData::Mx { exchange, .. } => {
                *exchange = absolute(value)?;
            }
            RData::Srv { target, .. } => {
                *target = absolute(value)?;
            }
            RData::Txt { chunks } => {
                *chunks = vec![value.to_string()];
            }
            RData::Caa { value: v, .. } => {
                *v = value.to_string();
            }
            RData::Naptr { replacement, .. } => {
                if value.is_empty() {
                    return Err(Error::invalid_record("empty NAPTR replacement"));
                }
                *replacement = value.to_string();
            }
            RData::Sshfp { fingerprint, .. } => {
                *fingerprint = value.to_ascii_lowercase();
            }
            RData::Tlsa { certificate, .. } => {
                *certificate = value.to_ascii_lowercase();
            }
            RData::Soa { .. } => {
                let parsed = parse_soa_fields(value)?;
                self.rdata = parsed;
            }
        }
        Ok(())
    }

    /// Set an MX target: preference plus exchange hostname.
    pub fn set_target_mx(&mut self, preference: u16, exchange: &str) -> Result<()> {
        match &mut self.rdata {
            RData::Mx {
                preference: p,
                exchange: e,
            } => {
                *p = preference;
                *e = absolute(exchange)?;
                Ok(())
            }
            _ => Err(self.type_mismatch("MX")),
        }
    }

    /// Set an SRV target: priority, weight, port, target hostname.
    pub fn set_target_srv(
        &mut self,
        priority: u16,
        weight: u16,
        port: u16,
        target: &str,
    ) -> Result<()> {
        match &mut self.rdata {
            RData::Srv {
                priority: p,
                weight: w,
                port: po,
                target: t,
            } => {
                *p = priority;
                *w = weight;
                *po = port;
                *t = absolute(target)?;
                Ok(())
            }
            _ => Err(self.type_mismatch("SRV")),
        }
    }

    /// Set an SRV target from a priority plus a `"weight port target"`
    /// data string, the split some provider APIs hand back.
    pub fn set_target_srv_priority_string(&mut self, priority: u16, data: &str) -> Result<()> {
        let parts: Vec<&str> = data.split_whitespace().collect();
        if parts.len() != 3 {
            return Err(Error::invalid_record(format!(
                "bad SRV data {data:?}: want \"weight port target\""
            )));
        }
        let weight = parse_num::<u16>(parts[0], "SRV weight")?;
        let port = parse_num::<u16>(parts[1], "SRV port")?;
        self.set_target_srv(priority, weight, port, parts[2])
    }

    /// Set a CAA target: flag, tag, value.
    pub fn set_target_caa(&mut self, flag: u8, tag: &str, value: &str) -> Result<()> {
        match tag {
            "issue" | "issuewild" | "iodef" => {}
            other => {
                return Err(Error::invalid_record(format!("unknown CAA tag {other:?}")));
            }
        }
        match &mut self.rdata {
            RData::Caa {
                flag: f,
                tag: t,
                value: v,
            } => {
                *f = flag;
                *t = tag.to_string();
                *v = value.to_string();
                Ok(())
            }
            _ => Err(self.type_mismatch("CAA")),
        }
    }

    /// Set a CAA target from its presentation form
    /// `flag tag "value"` (quotes optional).
    pub fn set_target_caa_string(&mut self, data: &str) -> Result<()> {
        let tokens = tokenize(data)?;
        if tokens.len() != 3 {
            return Err(Error::invalid_record(format!(
                "bad CAA data {data:?}: want \"flag tag value\""
            )));
        }
        let flag = parse_num::<u8>(&tokens[0], "CAA flag")?;
        self.set_target_caa(flag, &tokens[1], &tokens[2])
    }

    /// Set a TXT target from a single chunk.
    pub fn set_target_txt(&mut self, chunk: &str) -> Result<()> {
        self.set_target_txts(vec![chunk.to_string()])
    }

    /// Set a TXT target from an ordered chunk sequence. An empty
    /// sequence is invalid.
    pub fn set_target_txts(&mut self, new_chunks: Vec<String>) -> Result<()> {
        if new_chunks.is_empty() {
            return Err(Error::invalid_record("TXT record with no chunks"));
        }
        match &mut self.rdata {
            RData::Txt { chunks } => {
                *chunks = new_chunks;
                Ok(())
            }
            _ => Err(self.type_mismatch("TXT")),
        }
    }

    /// Set a NAPTR target.
    #[allow(clippy::too_many_arguments)]
    pub fn set_target_naptr(
        &mut self,
        order: u16,
        preference: u16,
        flags: &str,
        service: &str,
        regexp: &str,
        replacement: &str,
    ) -> Result<()> {
        match &mut self.rdata {
            RData::Naptr {
                order: o,
                preference: p,
                flags: f,
                service: s,
                regexp: re,
                replacement: r,
            } => {
                *o = order;
                *p = preference;
                *f = flags.to_string();
                *s = service.to_string();
                *re = regexp.to_string();
                *r = replacement.to_string();
                Ok(())
            }
            _ => Err(self.type_mismatch("NAPTR")),
        }
    }

    /// Set an SSHFP target.
    pub fn set_target_sshfp(
        &mut self,
        algorithm: u8,
        fingerprint_type: u8,
        fingerprint: &str,
    ) -> Result<()> {
        match &mut self.rdata {
            RData::Sshfp {
                algorithm: a,
                fingerprint_type: t,
                fingerprint: f,
            } => {
                *a = algorithm;
                *t = fingerprint_type;
                *f = fingerprint.to_ascii_lowercase();
                Ok(())
            }
            _ => Err(self.type_mismatch("SSHFP")),
        }
    }

    /// Set a TLSA target.
    pub fn set_target_tlsa(
        &mut self,
        usage: u8,
        selector: u8,
        matching_type: u8,
        certificate: &str,
    ) -> Result<()> {
        match &mut self.rdata {
            RData::Tlsa {
                usage: u,
                selector: s,
                matching_type: m,
                certificate: c,
            } => {
                *u = usage;
                *s = selector;
                *m = matching_type;
                *c = certificate.to_ascii_lowercase();
                Ok(())
            }
            _ => Err(self.type_mismatch("TLSA")),
        }
    }

    /// Set an SOA target from its seven fields.
    #[allow(clippy::too_many_arguments)]
    pub fn set_target_soa(
        &mut self,
        mname: &str,
        rname: &str,
        serial: u32,
        refresh: u32,
        retry: u32,
        expire: u32,
        minttl: u32,
    ) -> Result<()> {
        match &mut self.rdata {
            RData::Soa { .. } => {
                self.rdata = RData::Soa {
                    mname: absolute(mname)?,
                    rname: absolute(rname)?,
                    serial,
                    refresh,
                    retry,
                    expire,
                    minttl,
                };
                Ok(())
            }
            _ => Err(self.type_mismatch("SOA")),
        }
    }

    /// Fill the record from the presentation form of its data, the
    /// catch-all remote drivers and the zone parser use for types they
    /// do not special-case. Relative hostname-valued fields (CNAME,
    /// NS, PTR, the MX exchange, the SRV target) are qualified against
    /// `origin`; already-absolute names pass through.
    pub fn populate_from_string(&mut self, contents: &str, origin: &str) -> Result<()> {
        match self.rtype() {
            RecordType::A | RecordType::Aaaa | RecordType::Soa => self.set_target(contents),
            RecordType::Cname | RecordType::Ns | RecordType::Ptr => {
                self.set_target(&with_origin(contents.trim(), origin))
            }
            RecordType::Mx => {
                let parts: Vec<&str> = contents.split_whitespace().collect();
                if parts.len() != 2 {
                    return Err(Error::invalid_record(format!("bad MX data {contents:?}")));
                }
                let pref = parse_num::<u16>(parts[0], "MX preference")?;
                self.set_target_mx(pref, &with_origin(parts[1], origin))
            }
            RecordType::Srv => {
                let parts: Vec<&str> = contents.split_whitespace().collect();
                if parts.len() != 4 {
                    return Err(Error::invalid_record(format!("bad SRV data {contents:?}")));
                }
                let prio = parse_num::<u16>(parts[0], "SRV priority")?;
                let weight = parse_num::<u16>(parts[1], "SRV weight")?;
                let port = parse_num::<u16>(parts[2], "SRV port")?;
                self.set_target_srv(prio, weight, port, &with_origin(parts[3], origin))
            }
            RecordType::Txt => {
                if contents.starts_with('"') {
                    self.set_target_txts(tokenize(contents)?)
                } else {
                    self.set_target_txt(contents)
                }
            }
            RecordType::Caa => self.set_target_caa_string(contents),
            RecordType::Naptr => {
                let tokens = tokenize(contents)?;
                if tokens.len() != 6 {
                    return Err(Error::invalid_record(format!(
                        "bad NAPTR data {contents:?}"
                    )));
                }
                let order = parse_num::<u16>(&tokens[0], "NAPTR order")?;
                let pref = parse_num::<u16>(&tokens[1], "NAPTR preference")?;
                self.set_target_naptr(order, pref, &tokens[2], &tokens[3], &tokens[4], &tokens[5])
            }
            RecordType::Sshfp => {
                let parts: Vec<&str> = contents.split_whitespace().collect();
                if parts.len() != 3 {
                    return Err(Error::invalid_record(format!(
                        "bad SSHFP data {contents:?}"
                    )));
                }
                let alg = parse_num::<u8>(parts[0], "SSHFP algorithm")?;
                let fptype = parse_num::<u8>(parts[1], "SSHFP type")?;
                self.set_target_sshfp(alg, fptype, parts[2])
            }
            RecordType::Tlsa => {
                let parts: Vec<&str> = contents.split_whitespace().collect();
                if parts.len() != 4 {
                    return Err(Error::invalid_record(format!("bad TLSA data {contents:?}")));
                }
                let usage = parse_num::<u8>(parts[0], "TLSA usage")?;
                let selector = parse_num::<u8>(parts[1], "TLSA selector")?;
                let matching = parse_num::<u8>(parts[2], "TLSA matching type")?;
                self.set_target_tlsa(usage, selector, matching, parts[3])
            }
        }
    }

    /// The primary target value as text, without type-specific
    /// auxiliaries. This is what the diff engine's same-target pass
    /// compares.
    pub fn get_target_field(&self) -> String {
        match &self.rdata {
            RData::A(a) => a.to_string(),
            RData::Aaaa(a) => a.to_string(),
            RData::Cname { target } | RData::Ns { target } | RData::Ptr { target } => {
                target.clone()
            }
            RData::Mx { exchange, .. } => exchange.clone(),
            RData::Srv { target, .. } => target.clone(),
            RData::Txt { chunks } => chunks.concat(),
            RData::Caa { value, .. } => value.clone(),
            RData::Naptr { replacement, .. } => replacement.clone(),
            RData::Sshfp { fingerprint, .. } => fingerprint.clone(),
            RData::Tlsa { certificate, .. } => certificate.clone(),
            RData::Soa { mname, .. } => mname.clone(),
        }
    }

    /// Canonical textual rendering including all type-specific
    /// auxiliaries in fixed order. This is the basis of the diff
    /// fingerprint and the zone serializer's target column.
    pub fn get_target_combined(&self) -> String {
        match &self.rdata {
            RData::A(a) => a.to_string(),
            RData::Aaaa(a) => a.to_string(),
            RData::Cname { target } | RData::Ns { target } | RData::Ptr { target } => {
                target.clone()
            }
            RData::Mx {
                preference,
                exchange,
            } => format!("{preference} {exchange}"),
            RData::Srv {
                priority,
                weight,
                port,
                target,
            } => format!("{priority} {weight} {port} {target}"),
            RData::Txt { chunks } => chunks
                .iter()
                .map(|c| format!("\"{c}\""))
                .collect::<Vec<_>>()
                .join(" "),
            RData::Caa { flag, tag, value } => format!("{flag} {tag} \"{value}\""),
            RData::Naptr {
                order,
                preference,
                flags,
                service,
                regexp,
                replacement,
            } => format!("{order} {preference} \"{flags}\" \"{service}\" \"{regexp}\" {replacement}"),
            RData::Sshfp {
                algorithm,
                fingerprint_type,
                fingerprint,
            } => format!("{algorithm} {fingerprint_type} {fingerprint}"),
            RData::Tlsa {
                usage,
                selector,
                matching_type,
                certificate,
            } => format!("{usage} {selector} {matching_type} {certificate}"),
            RData::Soa {
                mname,
                rname,
                serial,
                refresh,
                retry,
                expire,
                minttl,
            } => format!("{mname} {rname} {serial} {refresh} {retry} {expire} {minttl}"),
        }
    }

    /// The record's own diffable projection: the combined rendering,
    /// the TTL, and any extractor-contributed key-value pairs in
    /// sorted-key order. The diff engine cross-checks its fingerprint
    /// against this.
    pub fn to_diffable(&self, extra_maps: &[BTreeMap<String, String>]) -> String {
        let mut content = format!("{} ttl={}", self.get_target_combined(), self.ttl);
        for map in extra_maps {
            for (k, v) in map {
                content.push_str(&format!(" {k}={v}"));
            }
        }
        content
    }

    fn type_mismatch(&self, wanted: &str) -> Error {
        Error::invalid_record(format!(
            "set_target_{} on a {} record",
            wanted.to_ascii_lowercase(),
            self.rtype()
        ))
    }
}

impl fmt::Display for RecordConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} IN {} {}",
            self.label,
            self.ttl,
            self.rtype(),
            self.get_target_combined()
        )
    }
}

/// Normalize records a provider handed back: lowercase
/// case-insensitive fields and force hostname-valued targets
/// absolute. Deterministic and idempotent; applying it twice is the
/// same as applying it once.
pub fn post_process_records(records: &mut [RecordConfig]) {
    for rec in records.iter_mut() {
        rec.label = rec.label.to_ascii_lowercase();
        rec.label_fqdn = rec.label_fqdn.to_ascii_lowercase();
        match &mut rec.rdata {
            RData::Cname { target }
            | RData::Ns { target }
            | RData::Ptr { target }
            | RData::Srv { target, .. } => {
                *target = lower_absolute(target);
            }
            RData::Mx { exchange, .. } => {
                *exchange = lower_absolute(exchange);
            }
            RData::Soa { mname, rname, .. } => {
                *mname = lower_absolute(mname);
                *rname = lower_absolute(rname);
            }
            _ => {}
        }
    }
}

fn lower_absolute(name: &str) -> String {
    let lowered = name.to_ascii_lowercase();
    if lowered.ends_with('.') || lowered.is_empty() {
        lowered
    } else {
        format!("{lowered}.")
    }
}

/// Qualify a possibly-relative hostname against the origin. Absolute
/// names (and empty input, which the setters reject) pass through.
fn with_origin(name: &str, origin: &str) -> String {
    let origin = origin.trim_end_matches('.');
    if name.is_empty() || name.ends_with('.') || origin.is_empty() {
        name.to_string()
    } else {
        format!("{name}.{origin}")
    }
}

/// Canonicalize a hostname: lowercase, absolute, non-empty.
fn absolute(name: &str) -> Result<String> {
    if name.is_empty() {
        return Err(Error::invalid_record("empty hostname target"));
    }
    let lowered = name.to_ascii_lowercase();
    if lowered.ends_with('.') {
        Ok(lowered)
    } else {
        Ok(format!("{lowered}."))
    }
}

fn parse_num<T: FromStr>(s: &str, what: &str) -> Result<T> {
    s.parse::<T>()
        .map_err(|_| Error::invalid_record(format!("bad {what} {s:?}")))
}

fn parse_soa_fields(value: &str) -> Result<RData> {
    let parts: Vec<&str> = value.split_whitespace().collect();
    if parts.len() != 7 {
        return Err(Error::invalid_record(format!(
            "bad SOA data {value:?}: want 7 fields"
        )));
    }
    Ok(RData::Soa {
        mname: absolute(parts[0])?,
        rname: absolute(parts[1])?,
        serial: parse_num(parts[2], "SOA serial")?,
        refresh: parse_num(parts[3], "SOA refresh")?,
        retry: parse_num(parts[4], "SOA retry")?,
        expire: parse_num(parts[5], "SOA expire")?,
        minttl: parse_num(parts[6], "SOA minttl")?,
    })
}

/// Split presentation-form record data into tokens, treating each
/// double-quoted segment as one token with the quotes removed.
fn tokenize(s: &str) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                in_quotes = false;
                tokens.push(std::mem::take(&mut current));
            }
            '"' => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
                in_quotes = true;
            }
            '\\' if in_quotes => {
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            }
            c if c.is_whitespace() && !in_quotes => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if in_quotes {
        return Err(Error::invalid_record(format!(
            "unterminated quote in {s:?}"
        )));
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    Ok(tokens)
}
