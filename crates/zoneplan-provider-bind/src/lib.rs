//! # zoneplan-provider-bind
//!
//! File-backed DSP driver. Zones live as master files in a configured
//! directory; reconciliation parses the existing file (if any), diffs
//! it against the desired records, and emits a single correction that
//! rewrites the file deterministically.
//!
//! ## Provider metadata
//!
//! ```json
//! {
//!   "default_ns": ["ns1.example.net", "ns2.example.net"],
//!   "default_soa": {
//!     "master": "ns1.example.net.",
//!     "mbox": "hostmaster.example.net.",
//!     "refresh": 3600
//!   }
//! }
//! ```
//!
//! Unrecognized metadata keys are ignored. The credentials block
//! accepts a single `directory` key (default `zones`).

pub mod parser;
pub mod serial;
pub mod zonefile;

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};
use tracing::{info, warn};
use zoneplan_core::model::{Correction, DomainConfig, Nameserver, RecordConfig};
use zoneplan_core::traits::{can, can_with, cannot, Capabilities, Capability};
use zoneplan_core::{
    post_process_records, Differ, DnsServiceProvider, DspFactory, Error, RData, RecordType, Result,
};

/// Placeholder for SOA master/mbox the operator never configured.
const DEFAULT_NOT_SET: &str = "DEFAULT_NOT_SET.";

/// Configured SOA defaults for zones without an existing file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SoaDefaults {
    /// Primary master name
    #[serde(default)]
    pub master: String,
    /// Responsible mailbox
    #[serde(default)]
    pub mbox: String,
    /// Initial serial
    #[serde(default)]
    pub serial: u32,
    /// Refresh interval, seconds
    #[serde(default)]
    pub refresh: u32,
    /// Retry interval, seconds
    #[serde(default)]
    pub retry: u32,
    /// Expire interval, seconds
    #[serde(default)]
    pub expire: u32,
    /// Negative-caching TTL
    #[serde(default)]
    pub minttl: u32,
}

#[derive(Debug, Default, Deserialize)]
struct BindMetadata {
    #[serde(default)]
    default_ns: Vec<String>,
    #[serde(default)]
    default_soa: SoaDefaults,
}

/// File-backed BIND-style driver.
#[derive(Debug)]
pub struct BindProvider {
    directory: PathBuf,
    default_ns: Vec<Nameserver>,
    default_soa: SoaDefaults,
}

/// Factory registered under the `"BIND"` type name.
pub struct BindFactory;

#[async_trait]
impl DspFactory for BindFactory {
    async fn create(
        &self,
        config: &HashMap<String, String>,
        metadata: Option<&serde_json::Value>,
    ) -> Result<Arc<dyn DnsServiceProvider>> {
        let directory = config
            .get("directory")
            .map(String::as_str)
            .filter(|d| !d.is_empty())
            .unwrap_or("zones");
        let meta: BindMetadata = match metadata {
            Some(value) => serde_json::from_value(value.clone())
                .map_err(|e| Error::config(format!("BIND provider metadata: {e}")))?,
            None => BindMetadata::default(),
        };
        Ok(Arc::new(BindProvider {
            directory: PathBuf::from(directory),
            default_ns: Nameserver::from_names(&meta.default_ns),
            default_soa: meta.default_soa,
        }))
    }
}

/// The capability table the `"BIND"` type declares.
pub fn bind_capabilities() -> Capabilities {
    Capabilities::new()
        .set(Capability::CanUseCaa, can())
        .set(Capability::CanUsePtr, can())
        .set(Capability::CanUseNaptr, can())
        .set(Capability::CanUseSrv, can())
        .set(Capability::CanUseSshfp, can())
        .set(Capability::CanUseTlsa, can())
        .set(Capability::CanUseTxtMulti, can())
        .set(Capability::CantUseNopurge, cannot())
        .set(
            Capability::DocCreateDomains,
            can_with("the driver maintains a directory of zone files and adds missing ones"),
        )
        .set(Capability::DocDualHost, can())
        .set(Capability::DocOfficiallySupported, can())
}

impl BindProvider {
    /// Build a provider directly (tests and embedders).
    pub fn new(directory: impl Into<PathBuf>, default_ns: Vec<String>, soa: SoaDefaults) -> Self {
        Self {
            directory: directory.into(),
            default_ns: Nameserver::from_names(&default_ns),
            default_soa: soa,
        }
    }

    fn zone_file_path(&self, domain: &str) -> PathBuf {
        let file = format!("{}.zone", domain.to_ascii_lowercase().replace('/', "_"));
        self.directory.join(file)
    }
}

#[async_trait]
impl DnsServiceProvider for BindProvider {
    async fn get_nameservers(&self, _domain: &str) -> Result<Vec<Nameserver>> {
        Ok(self.default_ns.clone())
    }

    async fn get_domain_corrections(&self, dc: &mut DomainConfig) -> Result<Vec<Correction>> {
        let mut soa_rec = make_default_soa(&self.default_soa, &dc.name)?;

        if !self.directory.exists() {
            warn!(
                "BIND zone directory {} does not exist",
                self.directory.display()
            );
        }

        let zone_path = self.zone_file_path(&dc.name);
        let mut found_records: Vec<RecordConfig> = Vec::new();
        let mut old_serial: Option<u32> = None;
        let mut zone_file_found = false;

        match tokio::fs::read_to_string(&zone_path).await {
            Ok(text) => {
                zone_file_found = true;
                for rec in parser::parse_zone_text(&text, &dc.name)? {
                    if rec.rtype() == RecordType::Soa {
                        if old_serial.is_some() {
                            return Err(Error::fatal(format!(
                                "multiple SOA records in zone file {}",
                                zone_path.display()
                            )));
                        }
                        let serial = match rec.rdata() {
                            RData::Soa { serial, .. } => (*serial).max(1),
                            _ => 1,
                        };
                        old_serial = Some(serial);
                        let new_serial = serial::generate_serial_today(serial)?;
                        soa_rec = rebuild_soa(&rec, new_serial)?;
                        // the existing side sees the rebuilt SOA too, so
                        // a bare serial bump does not force a rewrite
                        found_records.push(soa_rec.clone());
                    } else {
                        found_records.push(rec);
                    }
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!("could not read zone file {}: {e}", zone_path.display());
            }
        }

        if !dc.has_record_type_name(RecordType::Soa, "@") {
            dc.records.push(soa_rec);
        }
        post_process_records(&mut dc.records);
        post_process_records(&mut found_records);

        let differ = Differ::new(dc)?;
        let diff = differ.incremental_diff(&found_records)?;
        if !diff.has_changes() {
            return Ok(Vec::new());
        }

        let mut msg = format!("GENERATE_ZONEFILE: {}\n", dc.name);
        if !zone_file_found {
            msg.push_str(&format!(" ({} records)\n", diff.create.len()));
        } else {
            for change in diff
                .create
                .iter()
                .chain(diff.to_delete.iter())
                .chain(diff.modify.iter())
            {
                msg.push_str(&format!("{change}\n"));
            }
        }

        let records = dc.records.clone();
        let path = zone_path.clone();
        Ok(vec![Correction::new(msg, move || async move {
            let lock = lock_for_path(&path);
            let _guard = lock.lock().await;
            info!("writing zone file {}", path.display());
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            let text = zonefile::zone_file_text(&records)?;
            tokio::fs::write(&path, text).await?;
            Ok(())
        })])
    }
}

/// Zone-file writes serialize per path so concurrent runs over one
/// zone cannot interleave.
fn lock_for_path(path: &Path) -> Arc<tokio::sync::Mutex<()>> {
    static LOCKS: OnceLock<Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>> = OnceLock::new();
    let locks = LOCKS.get_or_init(|| Mutex::new(HashMap::new()));
    let mut map = locks.lock().unwrap();
    map.entry(path.to_path_buf())
        .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
        .clone()
}

/// The SOA used when a zone has no file yet: configured defaults with
/// placeholders for unset names and safe timer fallbacks.
fn make_default_soa(info: &SoaDefaults, origin: &str) -> Result<RecordConfig> {
    let mut soa = RecordConfig::new(RecordType::Soa);
    soa.set_label("@", origin);
    let master = non_empty(&info.master, DEFAULT_NOT_SET);
    let mbox = non_empty(&info.mbox, DEFAULT_NOT_SET);
    soa.set_target_soa(
        &master,
        &mbox,
        if info.serial == 0 { 1 } else { info.serial },
        if info.refresh == 0 { 3600 } else { info.refresh },
        if info.retry == 0 { 600 } else { info.retry },
        if info.expire == 0 { 604800 } else { info.expire },
        if info.minttl == 0 { 1440 } else { info.minttl },
    )?;
    Ok(soa)
}

/// A parsed SOA with its serial replaced.
fn rebuild_soa(rec: &RecordConfig, new_serial: u32) -> Result<RecordConfig> {
    match rec.rdata() {
        RData::Soa {
            mname,
            rname,
            refresh,
            retry,
            expire,
            minttl,
            ..
        } => {
            let mut soa = rec.clone();
            soa.set_target_soa(mname, rname, new_serial, *refresh, *retry, *expire, *minttl)?;
            Ok(soa)
        }
        _ => Err(Error::fatal("rebuild_soa on a non-SOA record")),
    }
}

fn non_empty(value: &str, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}
