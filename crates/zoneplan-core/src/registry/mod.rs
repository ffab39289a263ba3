//! Provider registry
//!
//! Maps driver type names (e.g. `"BIND"`, `"VULTR"`) to the factories
//! that build them and the capability table their type declares.
//! Registration happens during initialization; afterwards the registry
//! is only read. Registering the same name twice is an error — it
//! indicates two drivers fighting over one type name.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let registry = ProviderRegistry::new();
//! registry.register_dsp("BIND", bind_capabilities(), Arc::new(BindFactory))?;
//!
//! let driver = registry
//!     .create_dsp("BIND", &creds["inside"], metadata.as_ref())
//!     .await?;
//! ```

use crate::error::{Error, Result};
use crate::traits::{
    Capabilities, Capability, DnsServiceProvider, DspFactory, Registrar, RegistrarFactory, Support,
};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

struct DspEntry {
    factory: Arc<dyn DspFactory>,
    capabilities: Capabilities,
}

/// Registry of DSP and registrar driver types.
#[derive(Default)]
pub struct ProviderRegistry {
    dsps: RwLock<HashMap<String, DspEntry>>,
    registrars: RwLock<HashMap<String, Arc<dyn RegistrarFactory>>>,
}

impl ProviderRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a DSP driver type with its capability table.
    ///
    /// A second registration under the same name is fatal.
    pub fn register_dsp(
        &self,
        name: impl Into<String>,
        capabilities: Capabilities,
        factory: Arc<dyn DspFactory>,
    ) -> Result<()> {
        let name = name.into();
        let mut dsps = self.dsps.write().unwrap();
        if dsps.contains_key(&name) {
            return Err(Error::fatal(format!("DSP type {name:?} registered twice")));
        }
        dsps.insert(
            name,
            DspEntry {
                factory,
                capabilities,
            },
        );
        Ok(())
    }

    /// Register a registrar driver type.
    ///
    /// A second registration under the same name is fatal.
    pub fn register_registrar(
        &self,
        name: impl Into<String>,
        factory: Arc<dyn RegistrarFactory>,
    ) -> Result<()> {
        let name = name.into();
        let mut registrars = self.registrars.write().unwrap();
        if registrars.contains_key(&name) {
            return Err(Error::fatal(format!(
                "registrar type {name:?} registered twice"
            )));
        }
        registrars.insert(name, factory);
        Ok(())
    }

    /// Instantiate a DSP driver from credentials and provider metadata.
    pub async fn create_dsp(
        &self,
        type_name: &str,
        config: &HashMap<String, String>,
        metadata: Option<&serde_json::Value>,
    ) -> Result<Arc<dyn DnsServiceProvider>> {
        let factory = {
            let dsps = self.dsps.read().unwrap();
            dsps.get(type_name)
                .ok_or_else(|| Error::config(format!("unknown DSP type: {type_name}")))?
                .factory
                .clone()
            // guard dropped here, before the factory awaits
        };
        factory.create(config, metadata).await
    }

    /// Instantiate a registrar driver from credentials.
    pub async fn create_registrar(
        &self,
        type_name: &str,
        config: &HashMap<String, String>,
    ) -> Result<Arc<dyn Registrar>> {
        let factory = {
            let registrars = self.registrars.read().unwrap();
            registrars
                .get(type_name)
                .ok_or_else(|| Error::config(format!("unknown registrar type: {type_name}")))?
                .clone()
        };
        factory.create(config).await
    }

    /// The capability table a DSP type declares, if registered.
    pub fn capabilities(&self, type_name: &str) -> Option<Capabilities> {
        let dsps = self.dsps.read().unwrap();
        dsps.get(type_name).map(|e| e.capabilities.clone())
    }

    /// A single capability lookup.
    pub fn capability(&self, type_name: &str, cap: Capability) -> Option<Support> {
        let dsps = self.dsps.read().unwrap();
        dsps.get(type_name).and_then(|e| e.capabilities.get(cap))
    }

    /// Whether a DSP type is registered.
    pub fn has_dsp(&self, name: &str) -> bool {
        self.dsps.read().unwrap().contains_key(name)
    }

    /// All registered DSP type names.
    pub fn list_dsps(&self) -> Vec<String> {
        self.dsps.read().unwrap().keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::can;
    use async_trait::async_trait;

    struct NullFactory;

    #[async_trait]
    impl DspFactory for NullFactory {
        async fn create(
            &self,
            _config: &HashMap<String, String>,
            _metadata: Option<&serde_json::Value>,
        ) -> Result<Arc<dyn DnsServiceProvider>> {
            Err(Error::config("null factory"))
        }
    }

    #[test]
    fn registration_and_lookup() {
        let registry = ProviderRegistry::new();
        assert!(!registry.has_dsp("MOCK"));

        let caps = Capabilities::new().set(Capability::CanUseSrv, can());
        registry
            .register_dsp("MOCK", caps, Arc::new(NullFactory))
            .unwrap();

        assert!(registry.has_dsp("MOCK"));
        assert!(registry.list_dsps().contains(&"MOCK".to_string()));
        assert!(registry
            .capability("MOCK", Capability::CanUseSrv)
            .map(|s| s.can)
            .unwrap_or(false));
        assert!(registry.capability("MOCK", Capability::CanUseCaa).is_none());
    }

    #[test]
    fn duplicate_registration_is_fatal() {
        let registry = ProviderRegistry::new();
        registry
            .register_dsp("MOCK", Capabilities::new(), Arc::new(NullFactory))
            .unwrap();
        let err = registry
            .register_dsp("MOCK", Capabilities::new(), Arc::new(NullFactory))
            .unwrap_err();
        assert!(matches!(err, Error::FatalInternal(_)));
    }

    #[tokio::test]
    async fn unknown_type_is_a_config_error() {
        let registry = ProviderRegistry::new();
        let result = registry
            .create_dsp("NOPE", &HashMap::new(), None)
            .await;
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
