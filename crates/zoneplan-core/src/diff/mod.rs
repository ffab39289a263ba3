//! Incremental diff engine
//!
//! Correlates an existing record set against a domain's desired set
//! and emits an unchanged/create/modify/delete plan. The engine is
//! pure aside from debug logging: it never calls a provider and never
//! mutates records.
//!
//! Records are bucketed by [`RecordKey`] and each shared key goes
//! through three passes: exact fingerprint matches drop out as
//! unchanged, remaining pairs with an equal target field become
//! modifications, and the residue is paired positionally in
//! fingerprint order.

use crate::error::{Error, Result};
use crate::model::{DomainConfig, RecordConfig, RecordKey};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use tracing::debug;

/// Extra-value extractor: projects diff-visible key-value pairs out of
/// a record (per-DSP fields such as proxy flags).
pub type ExtractorFn = Box<dyn Fn(&RecordConfig) -> HashMap<String, String> + Send + Sync>;

/// One element of the plan: an existing record, a desired record, or
/// a pairing of both.
pub struct Correlation {
    /// The live record, absent for creations
    pub existing: Option<RecordConfig>,
    /// The wanted record, absent for deletions
    pub desired: Option<RecordConfig>,
    existing_content: Option<String>,
    desired_content: Option<String>,
}

impl fmt::Display for Correlation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.existing, &self.desired) {
            (None, Some(de)) => write!(
                f,
                "CREATE {} {} {}",
                de.rtype(),
                de.get_label_fqdn(),
                self.desired_content.as_deref().unwrap_or_default()
            ),
            (Some(ex), None) => write!(
                f,
                "DELETE {} {} {}",
                ex.rtype(),
                ex.get_label_fqdn(),
                self.existing_content.as_deref().unwrap_or_default()
            ),
            (Some(ex), Some(_)) => write!(
                f,
                "MODIFY {} {}: ({}) -> ({})",
                ex.rtype(),
                ex.get_label_fqdn(),
                self.existing_content.as_deref().unwrap_or_default(),
                self.desired_content.as_deref().unwrap_or_default()
            ),
            (None, None) => f.write_str("EMPTY CORRELATION"),
        }
    }
}

impl fmt::Debug for Correlation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

/// A group of correlations.
pub type Changeset = Vec<Correlation>;

/// The complete plan for one domain against one provider's records.
#[derive(Debug, Default)]
pub struct Diff {
    /// Pairs already in conformance
    pub unchanged: Changeset,
    /// Desired records with no live counterpart
    pub create: Changeset,
    /// Live records with no desired counterpart
    pub to_delete: Changeset,
    /// Pairs whose content differs
    pub modify: Changeset,
}

impl Diff {
    /// Whether the plan contains any actual change.
    pub fn has_changes(&self) -> bool {
        !self.create.is_empty() || !self.to_delete.is_empty() || !self.modify.is_empty()
    }
}

/// Diff engine for one domain.
pub struct Differ<'a> {
    dc: &'a DomainConfig,
    extractors: Vec<ExtractorFn>,
    ignored: Vec<glob::Pattern>,
}

impl<'a> Differ<'a> {
    /// Build a differ with no extra-value extractors.
    pub fn new(dc: &'a DomainConfig) -> Result<Self> {
        Self::with_extractors(dc, Vec::new())
    }

    /// Build a differ with extra-value extractors, applied in order.
    pub fn with_extractors(dc: &'a DomainConfig, extractors: Vec<ExtractorFn>) -> Result<Self> {
        let ignored = dc
            .ignored_labels
            .iter()
            .map(|pat| {
                glob::Pattern::new(pat)
                    .map_err(|e| Error::config(format!("bad ignore pattern {pat:?}: {e}")))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            dc,
            extractors,
            ignored,
        })
    }

    /// The record's diff fingerprint: canonical combined target, TTL,
    /// and extractor-contributed pairs with keys sorted per extractor.
    fn content(&self, r: &RecordConfig) -> Result<String> {
        let mut content = format!("{} ttl={}", r.get_target_combined(), r.ttl);
        let mut all_maps = Vec::with_capacity(self.extractors.len());
        for extract in &self.extractors {
            let map: BTreeMap<String, String> = extract(r).into_iter().collect();
            for (k, v) in &map {
                content.push_str(&format!(" {k}={v}"));
            }
            all_maps.push(map);
        }
        let control = r.to_diffable(&all_maps);
        if control != content {
            return Err(Error::fatal(format!(
                "diff fingerprint mismatch: {control:?} != {content:?}"
            )));
        }
        Ok(content)
    }

    fn match_ignored(&self, label: &str) -> bool {
        self.ignored.iter().any(|pat| pat.matches(label))
    }

    /// Correlate existing records against the domain's desired set.
    pub fn incremental_diff(&self, existing: &[RecordConfig]) -> Result<Diff> {
        let mut existing_by_key: BTreeMap<RecordKey, Vec<RecordConfig>> = BTreeMap::new();
        for e in existing {
            if self.match_ignored(e.get_label()) {
                debug!("ignoring record {} {} due to IGNORE", e.get_label(), e.rtype());
            } else {
                existing_by_key.entry(e.key()).or_default().push(e.clone());
            }
        }

        let mut desired_by_key: BTreeMap<RecordKey, Vec<RecordConfig>> = BTreeMap::new();
        for d in &self.dc.records {
            if self.match_ignored(d.get_label()) {
                return Err(Error::IgnoredRecordCollision {
                    label: d.get_label().to_string(),
                    rtype: d.rtype().to_string(),
                });
            }
            desired_by_key.entry(d.key()).or_default().push(d.clone());
        }

        if self.dc.keep_unknown {
            existing_by_key.retain(|key, _| {
                let keep = desired_by_key.contains_key(key);
                if !keep {
                    debug!("ignoring record set {key} due to NO_PURGE");
                }
                keep
            });
        }

        let mut diff = Diff::default();

        for (key, mut existing_recs) in existing_by_key {
            let mut desired_recs = desired_by_key.remove(&key).unwrap_or_default();

            // Exact-match pass: identical fingerprints are unchanged.
            let mut i = 0;
            'exact: while i < existing_recs.len() {
                let ex_content = self.content(&existing_recs[i])?;
                for j in 0..desired_recs.len() {
                    if self.content(&desired_recs[j])? == ex_content {
                        let ex = existing_recs.remove(i);
                        let de = desired_recs.remove(j);
                        diff.unchanged.push(self.correlate(Some(ex), Some(de))?);
                        continue 'exact;
                    }
                }
                i += 1;
            }

            // Same-target pass: equal primary values pair as modify.
            let mut i = 0;
            'target: while i < existing_recs.len() {
                let ex_target = existing_recs[i].get_target_field();
                for j in 0..desired_recs.len() {
                    if desired_recs[j].get_target_field() == ex_target {
                        let ex = existing_recs.remove(i);
                        let de = desired_recs.remove(j);
                        diff.modify.push(self.correlate(Some(ex), Some(de))?);
                        continue 'target;
                    }
                }
                i += 1;
            }

            // Residual pass: index by fingerprint, pair positionally.
            let existing_lookup = self.index_by_content(&key, existing_recs)?;
            let mut desired_lookup = self.index_by_content(&key, desired_recs)?;

            let mut ex_leftover: Vec<(String, RecordConfig)> = Vec::new();
            for (content, ex) in existing_lookup {
                if let Some(de) = desired_lookup.remove(&content) {
                    diff.unchanged.push(self.correlate(Some(ex), Some(de))?);
                } else {
                    ex_leftover.push((content, ex));
                }
            }
            let mut de_leftover: Vec<(String, RecordConfig)> =
                desired_lookup.into_iter().collect();

            let paired = ex_leftover.len().min(de_leftover.len());
            let ex_rest = ex_leftover.split_off(paired);
            let de_rest = de_leftover.split_off(paired);
            for ((_, ex), (_, de)) in ex_leftover.into_iter().zip(de_leftover) {
                diff.modify.push(self.correlate(Some(ex), Some(de))?);
            }
            for (_, de) in de_rest {
                diff.create.push(self.correlate(None, Some(de))?);
            }
            for (_, ex) in ex_rest {
                diff.to_delete.push(self.correlate(Some(ex), None)?);
            }
        }

        // Keys present only on the desired side are pure creations.
        for (_, recs) in desired_by_key {
            for de in recs {
                diff.create.push(self.correlate(None, Some(de))?);
            }
        }

        Ok(diff)
    }

    /// Group the changing correlations' messages per record key, the
    /// shape drivers use to build per-record-set corrections.
    pub fn changed_groups(
        &self,
        existing: &[RecordConfig],
    ) -> Result<BTreeMap<RecordKey, Vec<String>>> {
        let mut groups: BTreeMap<RecordKey, Vec<String>> = BTreeMap::new();
        let diff = self.incremental_diff(existing)?;
        for c in &diff.create {
            if let Some(de) = &c.desired {
                groups.entry(de.key()).or_default().push(c.to_string());
            }
        }
        for c in &diff.to_delete {
            if let Some(ex) = &c.existing {
                groups.entry(ex.key()).or_default().push(c.to_string());
            }
        }
        for c in &diff.modify {
            if let Some(de) = &c.desired {
                groups.entry(de.key()).or_default().push(c.to_string());
            }
        }
        Ok(groups)
    }

    fn index_by_content(
        &self,
        key: &RecordKey,
        recs: Vec<RecordConfig>,
    ) -> Result<BTreeMap<String, RecordConfig>> {
        let mut lookup = BTreeMap::new();
        for rec in recs {
            let content = self.content(&rec)?;
            if lookup.contains_key(&content) {
                return Err(Error::DuplicateFingerprint {
                    key: key.to_string(),
                    fingerprint: content,
                });
            }
            lookup.insert(content, rec);
        }
        Ok(lookup)
    }

    fn correlate(
        &self,
        existing: Option<RecordConfig>,
        desired: Option<RecordConfig>,
    ) -> Result<Correlation> {
        let existing_content = match &existing {
            Some(ex) => Some(self.content(ex)?),
            None => None,
        };
        let desired_content = match &desired {
            Some(de) => Some(self.content(de)?),
            None => None,
        };
        Ok(Correlation {
            existing,
            desired,
            existing_content,
            desired_content,
        })
    }
}
