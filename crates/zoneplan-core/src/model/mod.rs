//! Canonical record and domain model
//!
//! Everything the engine manipulates lives here:
//!
//! - [`RecordConfig`]: one DNS record, a tagged union over the record
//!   type behind a facade of normalizing setters
//! - [`DomainConfig`]: a zone's desired state plus its provider bindings
//! - [`Nameserver`]: a delegation target
//! - [`Correction`]: a deferred change plus its human-readable message

pub mod domain;
pub mod record;

pub use domain::{Correction, DomainConfig, DspBinding, Nameserver, RegistrarBinding};
pub use record::{post_process_records, RData, RecordConfig, RecordKey, RecordType};
