//! Core traits for the reconciliation system
//!
//! This module defines the interfaces every provider implements.
//!
//! - [`DnsServiceProvider`]: hosts authoritative records for zones
//! - [`Registrar`]: maintains NS delegation at the registry
//! - [`Capability`]: the feature matrix a driver type declares

pub mod dns_provider;
pub mod registrar;

pub use dns_provider::{
    can, can_with, cannot, cannot_with, required_capability, Capabilities, Capability,
    DnsServiceProvider, DspFactory, Support,
};
pub use registrar::{Registrar, RegistrarFactory};
