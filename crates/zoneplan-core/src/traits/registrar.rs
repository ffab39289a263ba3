//! Registrar contract
//!
//! A registrar driver only manages NS delegation at the registry; it
//! never touches the records inside a zone.

use crate::error::Result;
use crate::model::{Correction, DomainConfig};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Trait for registrar driver implementations.
#[async_trait]
pub trait Registrar: Send + Sync {
    /// Compute the corrections that align the registry's delegation
    /// with the domain's resolved nameservers.
    async fn get_registrar_corrections(&self, dc: &DomainConfig) -> Result<Vec<Correction>>;
}

/// Constructs registrar drivers from per-instance credentials.
#[async_trait]
pub trait RegistrarFactory: Send + Sync {
    /// Create a registrar instance.
    async fn create(&self, config: &HashMap<String, String>) -> Result<Arc<dyn Registrar>>;
}
