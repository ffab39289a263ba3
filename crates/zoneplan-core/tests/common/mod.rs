//! Test doubles and common utilities for engine contract tests
//!
//! The mock DSP behaves like a minimal real driver: it holds a fixed
//! set of "live" records, runs the diff engine over them, and turns
//! every change into a counting correction.

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use zoneplan_core::error::Result;
use zoneplan_core::model::{Correction, DomainConfig, DspBinding, Nameserver, RecordConfig};
use zoneplan_core::traits::{can, Capabilities, Capability, DnsServiceProvider};
use zoneplan_core::{post_process_records, Differ, Error, RecordType};

/// A DSP driver backed by an in-memory record set.
pub struct MockDsp {
    /// Records the "provider" currently serves
    pub existing: Mutex<Vec<RecordConfig>>,
    /// Nameservers reported for every domain
    pub nameservers: Vec<String>,
    /// Counts get_nameservers() calls
    ns_call_count: AtomicUsize,
    /// Counts get_domain_corrections() calls
    corrections_call_count: AtomicUsize,
    /// Counts corrections actually applied
    applied_count: Arc<AtomicUsize>,
    /// Messages of corrections produced, in order
    messages: Mutex<Vec<String>>,
}

impl MockDsp {
    pub fn new(existing: Vec<RecordConfig>) -> Self {
        Self {
            existing: Mutex::new(existing),
            nameservers: vec!["ns1.mock.example.".to_string(), "ns2.mock.example.".to_string()],
            ns_call_count: AtomicUsize::new(0),
            corrections_call_count: AtomicUsize::new(0),
            applied_count: Arc::new(AtomicUsize::new(0)),
            messages: Mutex::new(Vec::new()),
        }
    }

    pub fn with_nameservers(existing: Vec<RecordConfig>, ns: &[&str]) -> Self {
        let mut mock = Self::new(existing);
        mock.nameservers = ns.iter().map(|n| n.to_string()).collect();
        mock
    }

    pub fn ns_calls(&self) -> usize {
        self.ns_call_count.load(Ordering::SeqCst)
    }

    pub fn corrections_calls(&self) -> usize {
        self.corrections_call_count.load(Ordering::SeqCst)
    }

    pub fn applied(&self) -> usize {
        self.applied_count.load(Ordering::SeqCst)
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl DnsServiceProvider for MockDsp {
    async fn get_nameservers(&self, _domain: &str) -> Result<Vec<Nameserver>> {
        self.ns_call_count.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .nameservers
            .iter()
            .map(|n| Nameserver { name: n.clone() })
            .collect())
    }

    async fn get_domain_corrections(&self, dc: &mut DomainConfig) -> Result<Vec<Correction>> {
        self.corrections_call_count.fetch_add(1, Ordering::SeqCst);

        let mut existing = self.existing.lock().unwrap().clone();
        post_process_records(&mut existing);

        let differ = Differ::new(dc)?;
        let diff = differ.incremental_diff(&existing)?;

        let mut corrections = Vec::new();
        for correlation in diff
            .to_delete
            .iter()
            .chain(diff.create.iter())
            .chain(diff.modify.iter())
        {
            let msg = correlation.to_string();
            self.messages.lock().unwrap().push(msg.clone());
            let counter = self.applied_count.clone();
            corrections.push(Correction::new(msg, move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }));
        }
        Ok(corrections)
    }
}

/// A DSP whose every method fails.
pub struct BrokenDsp;

#[async_trait]
impl DnsServiceProvider for BrokenDsp {
    async fn get_nameservers(&self, domain: &str) -> Result<Vec<Nameserver>> {
        Err(Error::provider("broken", format!("nameservers for {domain}")))
    }

    async fn get_domain_corrections(&self, dc: &mut DomainConfig) -> Result<Vec<Correction>> {
        Err(Error::provider("broken", format!("corrections for {}", dc.name)))
    }
}

/// The capability table a full-featured mock declares.
pub fn full_capabilities() -> Capabilities {
    Capabilities::new()
        .set(Capability::CanUseCaa, can())
        .set(Capability::CanUsePtr, can())
        .set(Capability::CanUseSrv, can())
        .set(Capability::CanUseNaptr, can())
        .set(Capability::CanUseSshfp, can())
        .set(Capability::CanUseTlsa, can())
        .set(Capability::CanUseTxtMulti, can())
}

pub fn binding(
    name: &str,
    driver: Arc<dyn DnsServiceProvider>,
    quota: i32,
    capabilities: Capabilities,
) -> DspBinding {
    DspBinding {
        name: name.to_string(),
        provider_type: "MOCK".to_string(),
        driver,
        number_of_nameservers: quota,
        capabilities,
    }
}

pub fn a_record(label: &str, origin: &str, ttl: u32, ip: &str) -> RecordConfig {
    let mut rc = RecordConfig::new(RecordType::A);
    rc.set_label(label, origin);
    rc.ttl = ttl;
    rc.set_target(ip).unwrap();
    rc
}

pub fn srv_record(label: &str, origin: &str, ttl: u32) -> RecordConfig {
    let mut rc = RecordConfig::new(RecordType::Srv);
    rc.set_label(label, origin);
    rc.ttl = ttl;
    rc.set_target_srv(5, 10, 8080, "svc.example.net.").unwrap();
    rc
}
