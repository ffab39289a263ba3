//! # zoneplan - declarative DNS reconciliation CLI
//!
//! A thin integration layer over `zoneplan-core`: it loads the
//! desired-state file and the provider credentials, registers the
//! built-in driver types, runs one reconciliation pass, and either
//! prints the corrections (`preview`) or applies them (`push`).
//! All DNS logic lives in the core and driver crates.
//!
//! ## Desired-state file
//!
//! ```json
//! {
//!   "dns_providers": [
//!     { "name": "inside", "type": "BIND",
//!       "meta": { "default_ns": ["ns1.example.net"] } }
//!   ],
//!   "domains": [
//!     {
//!       "name": "example.com",
//!       "dns_providers": { "inside": -1 },
//!       "nameservers": ["ns1.example.net"],
//!       "meta": { "ns_ttl": "86400" },
//!       "records": [
//!         { "type": "A", "name": "www", "target": "1.2.3.4", "ttl": 300 },
//!         { "type": "MX", "name": "@", "preference": 10,
//!           "target": "mail.example.com.", "ttl": 300 }
//!       ]
//!     }
//!   ]
//! }
//! ```
//!
//! ## Credentials file
//!
//! JSON with comments, instance name -> string map; values starting
//! with `$` are read from the environment:
//!
//! ```json
//! { "inside": { "directory": "zones" },
//!   "hosted": { "token": "$VULTR_TOKEN" } }
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;
use zoneplan_core::creds::load_provider_configs;
use zoneplan_core::model::{DomainConfig, DspBinding, Nameserver, RecordConfig, RegistrarBinding};
use zoneplan_core::{
    apply_corrections, Capabilities, DnsServiceProvider, ProviderRegistry, ReconcileEngine,
    RecordType,
};
use zoneplan_provider_bind::{bind_capabilities, BindFactory};
use zoneplan_provider_vultr::{vultr_capabilities, VultrFactory};

/// Exit codes following the daemon conventions:
/// 0 clean, 1 configuration or startup error, 2 runtime error.
#[derive(Debug, Clone, Copy)]
enum RunExitCode {
    Clean = 0,
    ConfigError = 1,
    RuntimeError = 2,
}

impl From<RunExitCode> for ExitCode {
    fn from(code: RunExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

#[derive(Debug, Parser)]
#[command(name = "zoneplan", about = "Reconcile DNS zones against their desired state")]
struct Cli {
    /// Desired-state file
    #[arg(long, global = true, default_value = "dnsconfig.json")]
    config: PathBuf,

    /// Provider credentials file
    #[arg(long, global = true, default_value = "creds.json")]
    creds: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Compute and print corrections without applying them
    Preview,
    /// Compute corrections and apply them
    Push,
}

// ---------------------------------------------------------------------------
// Desired-state wire format

#[derive(Debug, Deserialize)]
struct WireConfig {
    #[serde(default)]
    dns_providers: Vec<WireProvider>,
    #[serde(default)]
    registrars: Vec<WireProvider>,
    #[serde(default)]
    domains: Vec<WireDomain>,
}

#[derive(Debug, Deserialize)]
struct WireProvider {
    name: String,
    #[serde(rename = "type")]
    provider_type: String,
    #[serde(default)]
    meta: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct WireDomain {
    name: String,
    /// instance name -> nameserver quota
    #[serde(default)]
    dns_providers: HashMap<String, i32>,
    #[serde(default)]
    registrar: Option<String>,
    #[serde(default)]
    nameservers: Vec<String>,
    #[serde(default)]
    keep_unknown: bool,
    #[serde(default)]
    ignored_labels: Vec<String>,
    #[serde(default)]
    meta: HashMap<String, String>,
    #[serde(default)]
    records: Vec<WireRecord>,
}

#[derive(Debug, Deserialize)]
struct WireRecord {
    #[serde(rename = "type")]
    rtype: String,
    name: String,
    #[serde(default)]
    target: String,
    #[serde(default)]
    ttl: u32,
    // type-specific auxiliaries
    #[serde(default)]
    preference: u16,
    #[serde(default)]
    priority: u16,
    #[serde(default)]
    weight: u16,
    #[serde(default)]
    port: u16,
    #[serde(default)]
    flag: u8,
    #[serde(default)]
    tag: String,
    #[serde(default)]
    algorithm: u8,
    #[serde(default)]
    fingerprint_type: u8,
    #[serde(default)]
    usage: u8,
    #[serde(default)]
    selector: u8,
    #[serde(default)]
    matching_type: u8,
    #[serde(default)]
    order: u16,
    #[serde(default)]
    flags: String,
    #[serde(default)]
    service: String,
    #[serde(default)]
    regexp: String,
    #[serde(default)]
    chunks: Option<Vec<String>>,
}

/// Build a canonical record through the model's setters so every
/// validation applies.
fn build_record(wire: &WireRecord, origin: &str) -> Result<RecordConfig> {
    let rtype: RecordType = wire
        .rtype
        .parse()
        .with_context(|| format!("record {:?} in {origin}", wire.name))?;
    let mut rc = RecordConfig::new(rtype);
    rc.set_label(&wire.name, origin);
    rc.ttl = wire.ttl;
    let result = match rtype {
        RecordType::Mx => rc.set_target_mx(wire.preference, &wire.target),
        RecordType::Srv => rc.set_target_srv(wire.priority, wire.weight, wire.port, &wire.target),
        RecordType::Caa => rc.set_target_caa(wire.flag, &wire.tag, &wire.target),
        RecordType::Txt => match &wire.chunks {
            Some(chunks) => rc.set_target_txts(chunks.clone()),
            None => rc.set_target_txt(&wire.target),
        },
        RecordType::Sshfp => {
            rc.set_target_sshfp(wire.algorithm, wire.fingerprint_type, &wire.target)
        }
        RecordType::Tlsa => {
            rc.set_target_tlsa(wire.usage, wire.selector, wire.matching_type, &wire.target)
        }
        RecordType::Naptr => rc.set_target_naptr(
            wire.order,
            wire.preference,
            &wire.flags,
            &wire.service,
            &wire.regexp,
            &wire.target,
        ),
        _ => rc.set_target(&wire.target),
    };
    result.with_context(|| format!("record {} {:?} in {origin}", wire.rtype, wire.name))?;
    Ok(rc)
}

// ---------------------------------------------------------------------------

struct Instantiated {
    driver: Arc<dyn DnsServiceProvider>,
    provider_type: String,
    capabilities: Capabilities,
}

async fn build_domains(cli: &Cli, registry: &ProviderRegistry) -> Result<Vec<DomainConfig>> {
    let creds = load_provider_configs(&cli.creds)?;

    let raw = std::fs::read_to_string(&cli.config)
        .with_context(|| format!("reading desired state {}", cli.config.display()))?;
    let wire: WireConfig = serde_json::from_str(&raw)
        .with_context(|| format!("parsing desired state {}", cli.config.display()))?;

    let empty = HashMap::new();
    let mut dsps: HashMap<String, Instantiated> = HashMap::new();
    for decl in &wire.dns_providers {
        let block = creds.get(&decl.name).unwrap_or(&empty);
        if block.is_empty() {
            warn!("no credentials for DNS provider {:?}", decl.name);
        }
        let driver = registry
            .create_dsp(&decl.provider_type, block, decl.meta.as_ref())
            .await
            .with_context(|| format!("initializing DNS provider {:?}", decl.name))?;
        let capabilities = registry
            .capabilities(&decl.provider_type)
            .unwrap_or_default();
        dsps.insert(
            decl.name.clone(),
            Instantiated {
                driver,
                provider_type: decl.provider_type.clone(),
                capabilities,
            },
        );
    }

    let mut registrars: HashMap<String, Arc<dyn zoneplan_core::Registrar>> = HashMap::new();
    for decl in &wire.registrars {
        let block = creds.get(&decl.name).unwrap_or(&empty);
        let driver = registry
            .create_registrar(&decl.provider_type, block)
            .await
            .with_context(|| format!("initializing registrar {:?}", decl.name))?;
        registrars.insert(decl.name.clone(), driver);
    }

    let mut domains = Vec::with_capacity(wire.domains.len());
    for wd in &wire.domains {
        let mut dc = DomainConfig::new(&wd.name);
        dc.keep_unknown = wd.keep_unknown;
        dc.ignored_labels = wd.ignored_labels.clone();
        dc.metadata = wd.meta.clone();
        dc.nameservers = Nameserver::from_names(&wd.nameservers);
        for record in &wd.records {
            dc.records.push(build_record(record, &dc.name)?);
        }

        // deterministic binding order
        let mut bindings: Vec<(&String, &i32)> = wd.dns_providers.iter().collect();
        bindings.sort();
        for (instance, quota) in bindings {
            let inst = dsps.get(instance).with_context(|| {
                format!("domain {} references unknown DNS provider {instance:?}", wd.name)
            })?;
            dc.dns_provider_instances.push(DspBinding {
                name: instance.clone(),
                provider_type: inst.provider_type.clone(),
                driver: inst.driver.clone(),
                number_of_nameservers: *quota,
                capabilities: inst.capabilities.clone(),
            });
        }

        if let Some(reg_name) = &wd.registrar {
            let driver = registrars.get(reg_name).with_context(|| {
                format!("domain {} references unknown registrar {reg_name:?}", wd.name)
            })?;
            dc.registrar_instance = Some(RegistrarBinding {
                name: reg_name.clone(),
                driver: driver.clone(),
            });
        }

        domains.push(dc);
    }
    Ok(domains)
}

fn register_builtin_drivers(registry: &ProviderRegistry) -> Result<()> {
    registry.register_dsp("BIND", bind_capabilities(), Arc::new(BindFactory))?;
    registry.register_dsp("VULTR", vultr_capabilities(), Arc::new(VultrFactory))?;
    Ok(())
}

async fn run(cli: &Cli) -> Result<RunExitCode> {
    let registry = ProviderRegistry::new();
    register_builtin_drivers(&registry)?;

    let mut domains = build_domains(cli, &registry).await?;

    let engine = ReconcileEngine::new();
    let cancel = engine.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling");
            cancel.cancel();
        }
    });

    let results = engine.reconcile_all(&mut domains).await;

    let mut exit = RunExitCode::Clean;
    for result in results {
        println!("******************** Domain: {}", result.domain);
        if result.corrections.is_empty() {
            println!("0 corrections");
        }
        for (i, correction) in result.corrections.iter().enumerate() {
            println!("#{}: {}", i + 1, correction.msg);
        }

        if let Some(err) = &result.error {
            error!("domain {}: {}", result.domain, err);
            if err.is_fatal() {
                // invariant violations abort the whole run
                return Ok(RunExitCode::RuntimeError);
            }
            exit = RunExitCode::RuntimeError;
            continue;
        }

        if matches!(cli.command, Command::Push) {
            let total = result.corrections.len();
            match apply_corrections(result.corrections).await {
                Ok(applied) => {
                    info!("{}: applied {applied} of {total} corrections", result.domain);
                }
                Err(e) => {
                    error!("{}: apply failed: {e}", result.domain);
                    exit = RunExitCode::RuntimeError;
                }
            }
        }
    }
    Ok(exit)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        other => {
            eprintln!("unknown log level {other:?}");
            return RunExitCode::ConfigError.into();
        }
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("failed to initialize logging");
        return RunExitCode::ConfigError.into();
    }

    match run(&cli).await {
        Ok(code) => code.into(),
        Err(e) => {
            error!("{e:#}");
            RunExitCode::ConfigError.into()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_records_build_through_the_model() {
        let json = r#"{
            "type": "MX", "name": "@", "preference": 10,
            "target": "mail.example.com", "ttl": 300
        }"#;
        let wire: WireRecord = serde_json::from_str(json).unwrap();
        let rc = build_record(&wire, "example.com").unwrap();
        assert_eq!(rc.get_target_combined(), "10 mail.example.com.");
        assert_eq!(rc.get_label(), "@");
    }

    #[test]
    fn bad_wire_records_are_rejected() {
        let json = r#"{ "type": "A", "name": "www", "target": "not-an-ip" }"#;
        let wire: WireRecord = serde_json::from_str(json).unwrap();
        assert!(build_record(&wire, "example.com").is_err());
    }

    #[test]
    fn txt_chunks_override_target() {
        let json = r#"{ "type": "TXT", "name": "@", "chunks": ["a", "b"] }"#;
        let wire: WireRecord = serde_json::from_str(json).unwrap();
        let rc = build_record(&wire, "example.com").unwrap();
        assert_eq!(rc.get_target_combined(), "\"a\" \"b\"");
    }

    #[test]
    fn full_config_parses() {
        let json = r#"{
            "dns_providers": [
                { "name": "inside", "type": "BIND",
                  "meta": { "default_ns": ["ns1.example.net"] } }
            ],
            "domains": [
                { "name": "example.com",
                  "dns_providers": { "inside": -1 },
                  "meta": { "ns_ttl": "86400" },
                  "records": [
                      { "type": "A", "name": "www", "target": "1.2.3.4", "ttl": 300 }
                  ] }
            ]
        }"#;
        let wire: WireConfig = serde_json::from_str(json).unwrap();
        assert_eq!(wire.dns_providers.len(), 1);
        assert_eq!(wire.domains[0].dns_providers["inside"], -1);
        assert!(wire.registrars.is_empty());
    }
}
