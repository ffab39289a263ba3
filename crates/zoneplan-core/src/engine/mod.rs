//! Reconciliation engine
//!
//! The engine drives one pass over a set of domain configurations:
//!
//! 1. Punycode the domain in place
//! 2. Check every desired record against each bound driver's
//!    capability table — an unsupported feature refuses the domain
//!    before any driver is called
//! 3. Resolve nameservers and inject the apex NS records
//! 4. Ask each bound DSP, in binding order, for corrections
//! 5. Ask the registrar, if one is bound
//!
//! Corrections are returned to the caller, never executed here; the
//! caller previews or applies them. A provider failure marks that
//! domain and moves on — other domains still reconcile. Cooperative
//! cancellation is observed between driver calls: on cancellation the
//! engine returns whatever it has assembled with `Cancelled` recorded.

use crate::error::{Error, Result};
use crate::model::{Correction, DomainConfig};
use crate::nameservers::{add_ns_records, determine_nameservers};
use crate::traits::{required_capability, Capability};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Outcome of reconciling one domain.
#[derive(Debug)]
pub struct DomainResult {
    /// The domain's (punycoded) name
    pub domain: String,
    /// Corrections assembled so far, in binding order
    pub corrections: Vec<Correction>,
    /// The first error encountered, if any
    pub error: Option<Error>,
}

impl DomainResult {
    fn new(domain: &str) -> Self {
        Self {
            domain: domain.to_string(),
            corrections: Vec::new(),
            error: None,
        }
    }

    fn record_error(&mut self, err: Error) {
        error!("reconciling {}: {}", self.domain, err);
        if self.error.is_none() {
            self.error = Some(err);
        }
    }
}

/// One-shot reconciliation engine.
///
/// The engine holds no driver state of its own; drivers live in the
/// domain bindings. It is safe to share across tasks and to run
/// distinct domains concurrently, but it never calls the same driver
/// concurrently for one domain.
#[derive(Default)]
pub struct ReconcileEngine {
    cancel: CancellationToken,
}

impl ReconcileEngine {
    /// Create an engine with a fresh cancellation token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an engine observing the given token.
    pub fn with_cancellation(cancel: CancellationToken) -> Self {
        Self { cancel }
    }

    /// A handle the caller can use to cancel the run.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Reconcile every domain, sequentially, collecting per-domain
    /// results. No error short-circuits the run except cancellation.
    pub async fn reconcile_all(&self, domains: &mut [DomainConfig]) -> Vec<DomainResult> {
        let mut results = Vec::with_capacity(domains.len());
        for dc in domains.iter_mut() {
            if self.cancel.is_cancelled() {
                let mut res = DomainResult::new(&dc.name);
                res.error = Some(Error::Cancelled);
                results.push(res);
                continue;
            }
            results.push(self.reconcile_domain(dc).await);
        }
        results
    }

    /// Reconcile a single domain.
    pub async fn reconcile_domain(&self, dc: &mut DomainConfig) -> DomainResult {
        let mut result = DomainResult::new(&dc.name);

        if let Err(e) = dc.punycode() {
            result.record_error(e);
            return result;
        }
        result.domain = dc.name.clone();

        if let Err(e) = validate_capabilities(dc) {
            result.record_error(e);
            return result;
        }

        // Driver calls run under the cancellation token: a cancelled
        // run abandons the in-flight call and returns what it has.
        match self.cancel.run_until_cancelled(determine_nameservers(dc)).await {
            None => {
                result.record_error(Error::Cancelled);
                return result;
            }
            Some(Ok(resolved)) => {
                dc.nameservers = resolved;
                add_ns_records(dc);
            }
            Some(Err(e)) => {
                result.record_error(e);
                return result;
            }
        }

        let bindings = dc.dns_provider_instances.clone();
        for binding in bindings {
            info!("----- DNS provider: {}", binding.name);
            match self
                .cancel
                .run_until_cancelled(binding.driver.get_domain_corrections(dc))
                .await
            {
                None => {
                    result.record_error(Error::Cancelled);
                    return result;
                }
                Some(Ok(corrections)) => {
                    debug!(
                        "{} corrections from {} for {}",
                        corrections.len(),
                        binding.name,
                        dc.name
                    );
                    result.corrections.extend(corrections);
                }
                Some(Err(e)) => result.record_error(e),
            }
        }

        if let Some(registrar) = dc.registrar_instance.clone() {
            info!("----- registrar: {}", registrar.name);
            match self
                .cancel
                .run_until_cancelled(registrar.driver.get_registrar_corrections(dc))
                .await
            {
                None => {
                    result.record_error(Error::Cancelled);
                    return result;
                }
                Some(Ok(corrections)) => result.corrections.extend(corrections),
                Some(Err(e)) => result.record_error(e),
            }
        }

        result
    }
}

/// Check every desired record against every bound driver's capability
/// table, and `keep_unknown` against drivers that cannot honor it.
fn validate_capabilities(dc: &DomainConfig) -> Result<()> {
    for binding in &dc.dns_provider_instances {
        if dc.keep_unknown && binding.capabilities.can(Capability::CantUseNopurge) {
            return Err(Error::unsupported(
                &binding.name,
                Capability::CantUseNopurge.to_string(),
            ));
        }
        for record in &dc.records {
            if let Some(cap) = required_capability(record) {
                if !binding.capabilities.can(cap) {
                    return Err(Error::unsupported(&binding.name, cap.to_string()));
                }
            }
        }
    }
    Ok(())
}

/// Apply a correction list sequentially, stopping at the first
/// failure. Returns how many corrections ran successfully.
pub async fn apply_corrections(corrections: Vec<Correction>) -> Result<usize> {
    let mut applied = 0;
    for correction in corrections {
        info!("{}", correction.msg);
        correction.apply().await?;
        applied += 1;
    }
    Ok(applied)
}
