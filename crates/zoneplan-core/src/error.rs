//! Error types for the reconciliation core
//!
//! This module defines all error types used throughout the workspace.
//! Policy: validation errors are local to the caller, provider errors
//! are per-domain, invariant violations are fatal.

use thiserror::Error;

/// Result type alias for reconciliation operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the reconciliation engine
#[derive(Error, Debug)]
pub enum Error {
    /// A type/target pair failed validation at setter time
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    /// The desired set contains a record matching an ignore pattern
    #[error("desired record {label} {rtype} matches an ignored-label pattern")]
    IgnoredRecordCollision {
        /// Record label (short form)
        label: String,
        /// Record type token
        rtype: String,
    },

    /// Two records share a diff fingerprint within one side of one key
    #[error("duplicate diff fingerprint for {key}: {fingerprint}")]
    DuplicateFingerprint {
        /// The (labelFQDN, type) key the collision occurred under
        key: String,
        /// The colliding fingerprint
        fingerprint: String,
    },

    /// Any failure surfaced by a driver (network, authentication, parse)
    #[error("provider error ({provider}): {message}")]
    Provider {
        /// Provider instance or type name
        provider: String,
        /// Error message
        message: String,
    },

    /// Desired records require a feature the driver does not advertise
    #[error("provider {provider} does not support {feature}")]
    UnsupportedCapability {
        /// Provider instance or type name
        provider: String,
        /// Human description of the missing feature
        feature: String,
    },

    /// Cooperative cancellation observed
    #[error("reconciliation cancelled")]
    Cancelled,

    /// An internal invariant was violated; aborts the process in CLI use
    #[error("internal invariant violated: {0}")]
    FatalInternal(String),

    /// Configuration errors (credentials, metadata, desired-state input)
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create an invalid-record error
    pub fn invalid_record(msg: impl Into<String>) -> Self {
        Self::InvalidRecord(msg.into())
    }

    /// Create a provider error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create an unsupported-capability error
    pub fn unsupported(provider: impl Into<String>, feature: impl Into<String>) -> Self {
        Self::UnsupportedCapability {
            provider: provider.into(),
            feature: feature.into(),
        }
    }

    /// Create a fatal internal error
    pub fn fatal(msg: impl Into<String>) -> Self {
        Self::FatalInternal(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether this error aborts the whole run rather than one domain
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::FatalInternal(_) | Error::DuplicateFingerprint { .. }
        )
    }
}
