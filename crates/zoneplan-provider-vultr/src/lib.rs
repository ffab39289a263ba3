//! # zoneplan-provider-vultr
//!
//! DSP driver for the Vultr DNS API (v1). Demonstrates the driver
//! contract against a hosted provider: list the live records, diff
//! them against the desired set, and turn every change into a
//! deferred API call.
//!
//! ## API Reference
//!
//! - Account probe: GET `/v1/account/info`
//! - List domains: GET `/v1/dns/list`
//! - Create domain: POST `/v1/dns/create_domain`
//! - List records: GET `/v1/dns/records?domain=...`
//! - Create/update/delete record: POST `/v1/dns/{create,update,delete}_record`
//!
//! Authentication is the `API-Key` header. The key never appears in
//! logs or Debug output.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use zoneplan_core::model::{Correction, DomainConfig, Nameserver, RecordConfig};
use zoneplan_core::traits::{can, cannot, Capabilities, Capability};
use zoneplan_core::{
    post_process_records, Differ, DnsServiceProvider, DspFactory, Error, RData, RecordType, Result,
};

/// Vultr API base URL.
const VULTR_API_BASE: &str = "https://api.vultr.com/v1";

/// HTTP timeout for API requests.
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Nameservers every Vultr-hosted zone delegates to.
const DEFAULT_NS: [&str; 2] = ["ns1.vultr.com", "ns2.vultr.com"];

/// One record as the Vultr API represents it.
#[derive(Debug, Clone, Deserialize)]
struct VultrRecord {
    #[serde(rename = "RECORDID")]
    record_id: i64,
    #[serde(rename = "type")]
    rtype: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    data: String,
    #[serde(default)]
    priority: i32,
    #[serde(default)]
    ttl: i32,
}

#[derive(Debug, Deserialize)]
struct VultrDomain {
    domain: String,
}

/// Vultr DSP driver.
pub struct VultrProvider {
    client: reqwest::Client,
    api_key: String,
}

// The API key stays out of Debug output.
impl std::fmt::Debug for VultrProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VultrProvider")
            .field("api_key", &"<REDACTED>")
            .finish()
    }
}

/// Factory registered under the `"VULTR"` type name.
pub struct VultrFactory;

#[async_trait]
impl DspFactory for VultrFactory {
    async fn create(
        &self,
        config: &HashMap<String, String>,
        _metadata: Option<&serde_json::Value>,
    ) -> Result<Arc<dyn DnsServiceProvider>> {
        let token = config
            .get("token")
            .map(String::as_str)
            .unwrap_or_default();
        if token.is_empty() {
            return Err(Error::config("Vultr API token is required"));
        }
        let provider = VultrProvider::new(token)?;
        // fail fast on bad credentials
        provider.probe_account().await?;
        Ok(Arc::new(provider))
    }
}

/// The capability table the `"VULTR"` type declares.
pub fn vultr_capabilities() -> Capabilities {
    Capabilities::new()
        .set(Capability::CanUseAlias, cannot())
        .set(Capability::CanUseCaa, can())
        .set(Capability::CanUsePtr, cannot())
        .set(Capability::CanUseSrv, can())
        .set(Capability::CanUseTlsa, cannot())
        .set(Capability::CanUseSshfp, can())
        .set(Capability::DocCreateDomains, can())
        .set(Capability::DocOfficiallySupported, cannot())
}

impl VultrProvider {
    /// Build a driver from an API key.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::provider("vultr", format!("building HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
        })
    }

    async fn probe_account(&self) -> Result<()> {
        let url = format!("{VULTR_API_BASE}/account/info");
        let response = self
            .client
            .get(&url)
            .header("API-Key", &self.api_key)
            .send()
            .await
            .map_err(|e| Error::provider("vultr", format!("HTTP request failed: {e}")))?;
        check_status(response).await.map(|_| ())
    }

    async fn list_records(&self, domain: &str) -> Result<Vec<VultrRecord>> {
        let url = format!("{VULTR_API_BASE}/dns/records");
        let response = self
            .client
            .get(&url)
            .query(&[("domain", domain)])
            .header("API-Key", &self.api_key)
            .send()
            .await
            .map_err(|e| Error::provider("vultr", format!("HTTP request failed: {e}")))?;
        let body = check_status(response).await?;
        serde_json::from_str(&body)
            .map_err(|e| Error::provider("vultr", format!("parsing record list: {e}")))
    }

    async fn list_domains(&self) -> Result<Vec<VultrDomain>> {
        let url = format!("{VULTR_API_BASE}/dns/list");
        let response = self
            .client
            .get(&url)
            .header("API-Key", &self.api_key)
            .send()
            .await
            .map_err(|e| Error::provider("vultr", format!("HTTP request failed: {e}")))?;
        let body = check_status(response).await?;
        serde_json::from_str(&body)
            .map_err(|e| Error::provider("vultr", format!("parsing domain list: {e}")))
    }

    async fn post_form(&self, endpoint: &str, form: &[(&str, String)]) -> Result<()> {
        let url = format!("{VULTR_API_BASE}/dns/{endpoint}");
        let response = self
            .client
            .post(&url)
            .header("API-Key", &self.api_key)
            .form(form)
            .send()
            .await
            .map_err(|e| Error::provider("vultr", format!("HTTP request failed: {e}")))?;
        check_status(response).await.map(|_| ())
    }
}

/// Map an HTTP response to a provider error, mirroring the status
/// classes the API documents.
async fn check_status(response: reqwest::Response) -> Result<String> {
    let status = response.status();
    if status.is_success() {
        return response
            .text()
            .await
            .map_err(|e| Error::provider("vultr", format!("reading response body: {e}")));
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "unable to read error response".to_string());
    Err(match status.as_u16() {
        401 | 403 => Error::provider(
            "vultr",
            format!("authentication failed: invalid API key or insufficient permissions ({status})"),
        ),
        412 => Error::provider("vultr", format!("request rejected: {body}")),
        429 => Error::provider("vultr", format!("rate limit exceeded ({status})")),
        500..=599 => Error::provider("vultr", format!("server error (transient): {status} - {body}")),
        _ => Error::provider("vultr", format!("request failed: {status} - {body}")),
    })
}

#[async_trait]
impl DnsServiceProvider for VultrProvider {
    async fn get_nameservers(&self, _domain: &str) -> Result<Vec<Nameserver>> {
        Ok(Nameserver::from_names(&DEFAULT_NS))
    }

    async fn get_domain_corrections(&self, dc: &mut DomainConfig) -> Result<Vec<Correction>> {
        let records = self.list_records(&dc.name).await?;

        let mut existing = Vec::with_capacity(records.len());
        for record in &records {
            existing.push(to_record_config(&dc.name, record)?);
        }
        post_process_records(&mut existing);

        let differ = Differ::new(dc)?;
        let diff = differ.incremental_diff(&existing)?;

        let mut corrections = Vec::new();

        // Deletes go first so obsolete records vacate before
        // replacements land.
        for correlation in diff.to_delete {
            let ex = correlation
                .existing
                .as_ref()
                .ok_or_else(|| Error::fatal("delete correlation without an existing record"))?;
            let record_id = original_record_id(ex)?;
            let msg = format!("{correlation}; Vultr RECORDID: {record_id}");
            let this = self.clone_handles();
            let domain = dc.name.clone();
            corrections.push(Correction::new(msg, move || async move {
                this.post_form(
                    "delete_record",
                    &[("domain", domain), ("RECORDID", record_id.to_string())],
                )
                .await
            }));
        }

        for correlation in diff.create {
            let de = correlation
                .desired
                .as_ref()
                .ok_or_else(|| Error::fatal("create correlation without a desired record"))?;
            let wire = to_vultr_wire(de);
            let msg = correlation.to_string();
            let this = self.clone_handles();
            let domain = dc.name.clone();
            corrections.push(Correction::new(msg, move || async move {
                this.post_form(
                    "create_record",
                    &[
                        ("domain", domain),
                        ("name", wire.name),
                        ("type", wire.rtype),
                        ("data", wire.data),
                        ("ttl", wire.ttl.to_string()),
                        ("priority", wire.priority.to_string()),
                    ],
                )
                .await
            }));
        }

        for correlation in diff.modify {
            let ex = correlation
                .existing
                .as_ref()
                .ok_or_else(|| Error::fatal("modify correlation without an existing record"))?;
            let de = correlation
                .desired
                .as_ref()
                .ok_or_else(|| Error::fatal("modify correlation without a desired record"))?;
            let record_id = original_record_id(ex)?;
            let wire = to_vultr_wire(de);
            let msg = format!("{correlation}; Vultr RECORDID: {record_id}");
            let this = self.clone_handles();
            let domain = dc.name.clone();
            corrections.push(Correction::new(msg, move || async move {
                this.post_form(
                    "update_record",
                    &[
                        ("domain", domain),
                        ("RECORDID", record_id.to_string()),
                        ("name", wire.name),
                        ("data", wire.data),
                        ("ttl", wire.ttl.to_string()),
                        ("priority", wire.priority.to_string()),
                    ],
                )
                .await
            }));
        }

        debug!(
            "{} corrections for {} at vultr",
            corrections.len(),
            dc.name
        );
        Ok(corrections)
    }

    async fn ensure_domain_exists(&self, domain: &str) -> Result<()> {
        let domains = self.list_domains().await?;
        if domains.iter().any(|d| d.domain == domain) {
            return Ok(());
        }
        // a placeholder address; the zone's records come from the plan
        self.post_form(
            "create_domain",
            &[
                ("domain", domain.to_string()),
                ("serverip", "0.0.0.0".to_string()),
            ],
        )
        .await
    }
}

impl VultrProvider {
    /// Cheap clone for correction closures: reqwest clients share
    /// their connection pool.
    fn clone_handles(&self) -> VultrProvider {
        VultrProvider {
            client: self.client.clone(),
            api_key: self.api_key.clone(),
        }
    }
}

/// The provider-side record id a driver stashed in `original`.
fn original_record_id(rec: &RecordConfig) -> Result<i64> {
    rec.original
        .as_ref()
        .and_then(|v| v.get("RECORDID"))
        .and_then(|v| v.as_i64())
        .ok_or_else(|| Error::fatal("existing vultr record without a RECORDID"))
}

/// Convert a wire record into the canonical model.
fn to_record_config(origin: &str, record: &VultrRecord) -> Result<RecordConfig> {
    let rtype: RecordType = record
        .rtype
        .parse()
        .map_err(|_| Error::provider("vultr", format!("unsupported record type {:?}", record.rtype)))?;
    let mut rc = RecordConfig::new(rtype);
    rc.set_label(&record.name, origin);
    rc.ttl = record.ttl.max(0) as u32;
    rc.original = Some(serde_json::json!({ "RECORDID": record.record_id }));

    let data = record.data.as_str();
    match rtype {
        RecordType::Cname | RecordType::Ns => {
            rc.set_target(&ensure_dotted(data))?;
        }
        RecordType::Caa => {
            rc.set_target_caa_string(data)?;
        }
        RecordType::Mx => {
            rc.set_target_mx(clamp_u16(record.priority), &ensure_dotted(data))?;
        }
        RecordType::Srv => {
            rc.set_target_srv_priority_string(clamp_u16(record.priority), data)?;
        }
        RecordType::Txt => {
            let trimmed = data
                .strip_prefix('"')
                .and_then(|s| s.strip_suffix('"'))
                .ok_or_else(|| {
                    Error::provider("vultr", format!("unquoted TXT data {data:?}"))
                })?;
            rc.set_target_txt(trimmed)?;
        }
        _ => {
            rc.populate_from_string(data, origin)?;
        }
    }
    Ok(rc)
}

struct WireRecord {
    name: String,
    rtype: String,
    data: String,
    ttl: u32,
    priority: i32,
}

/// Convert a canonical record into the wire shape the API accepts.
fn to_vultr_wire(rc: &RecordConfig) -> WireRecord {
    let name = match rc.get_label() {
        "@" => String::new(),
        label => label.to_string(),
    };

    let mut priority = 0i32;
    let data = match rc.rdata() {
        RData::Mx {
            preference,
            exchange,
        } => {
            priority = i32::from(*preference);
            exchange.trim_end_matches('.').to_string()
        }
        RData::Srv {
            priority: prio,
            weight,
            port,
            target,
        } => {
            priority = i32::from(*prio);
            format!("{weight} {port} {}", target.trim_end_matches('.'))
        }
        RData::Caa { flag, tag, value } => format!("{flag} {tag} \"{value}\""),
        RData::Sshfp {
            algorithm,
            fingerprint_type,
            fingerprint,
        } => format!("{algorithm} {fingerprint_type} {fingerprint}"),
        RData::Txt { .. } => format!("\"{}\"", rc.get_target_field()),
        _ => rc.get_target_field().trim_end_matches('.').to_string(),
    };

    WireRecord {
        name,
        rtype: rc.rtype().to_string(),
        data,
        ttl: rc.ttl,
        priority,
    }
}

fn ensure_dotted(name: &str) -> String {
    if name.ends_with('.') {
        name.to_string()
    } else {
        format!("{name}.")
    }
}

fn clamp_u16(value: i32) -> u16 {
    value.clamp(0, i32::from(u16::MAX)) as u16
}
