//! Plugin registry for sources, transformers and DNS providers
//!
//! The registry maps configuration type tags to factory objects, avoiding
//! hardcoded if-else chains. It is an ordinary value: build it once at
//! startup, let each plugin crate add its factories, then hand it to
//! [`Resolver::new`](crate::Resolver::new) and use it to create the provider.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ddns_core::Registry;
//!
//! let mut registry = Registry::with_builtins();
//! ddns_ip_http::register(&mut registry);
//! ddns_ip_netlink::register(&mut registry);
//! ddns_provider_cloudflare::register(&mut registry);
//!
//! let resolver = ddns_core::Resolver::new(&config.address, &registry)?;
//! let provider = registry.create_provider(&config.provider)?;
//! ```
//!
//! ## Registration
//!
//! Implementations register themselves from a `register` function:
//!
//! ```rust,ignore
//! // In ddns-ip-http crate
//! pub fn register(registry: &mut Registry) {
//!     registry.register_source("simple", Box::new(SimpleFactory));
//! }
//! ```

use crate::config::{ProviderConfig, SourceConfig, TransformerConfig};
use crate::error::{Error, Result};
use crate::traits::{DnsProvider, Source, Transformer};
use crate::traits::{DnsProviderFactory, SourceFactory, TransformerFactory};
use std::collections::HashMap;

/// Registry of factories keyed by configuration type tag
#[derive(Default)]
pub struct Registry {
    /// Registered source factories
    sources: HashMap<String, Box<dyn SourceFactory>>,

    /// Registered transformer factories
    transformers: HashMap<String, Box<dyn TransformerFactory>>,

    /// Registered DNS provider factories
    providers: HashMap<String, Box<dyn DnsProviderFactory>>,
}

impl Registry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in `reference` source and
    /// `mask_rewrite` transformer
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        crate::register_builtins(&mut registry);
        registry
    }

    /// Register a source factory
    ///
    /// # Parameters
    ///
    /// - `name`: Source type tag (e.g., "cf_trace", "interface")
    /// - `factory`: Factory object for creating source instances
    pub fn register_source(&mut self, name: impl Into<String>, factory: Box<dyn SourceFactory>) {
        self.sources.insert(name.into(), factory);
    }

    /// Register a transformer factory
    pub fn register_transformer(
        &mut self,
        name: impl Into<String>,
        factory: Box<dyn TransformerFactory>,
    ) {
        self.transformers.insert(name.into(), factory);
    }

    /// Register a DNS provider factory
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// # use ddns_core::registry::Registry;
    /// # use ddns_core::traits::DnsProviderFactory;
    /// # struct MyFactory;
    /// # impl DnsProviderFactory for MyFactory {
    /// #     fn create(&self, config: &ddns_core::config::ProviderConfig) -> ddns_core::Result<Box<dyn ddns_core::DnsProvider>> { unimplemented!() }
    /// # }
    /// let mut registry = Registry::new();
    /// registry.register_provider("myprovider", Box::new(MyFactory));
    /// ```
    pub fn register_provider(
        &mut self,
        name: impl Into<String>,
        factory: Box<dyn DnsProviderFactory>,
    ) {
        self.providers.insert(name.into(), factory);
    }

    /// Create a source from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn Source>)`: Created source instance
    /// - `Err(Error)`: If the type tag is not registered or the settings are malformed
    pub fn create_source(&self, config: &SourceConfig) -> Result<Box<dyn Source>> {
        let factory = self.sources.get(&config.source_type).ok_or_else(|| {
            Error::config(format!("Unknown source type: {}", config.source_type))
        })?;

        factory.create(config)
    }

    /// Create a transformer from configuration
    pub fn create_transformer(&self, config: &TransformerConfig) -> Result<Box<dyn Transformer>> {
        let factory = self
            .transformers
            .get(&config.transformer_type)
            .ok_or_else(|| {
                Error::config(format!(
                    "Unknown transformer type: {}",
                    config.transformer_type
                ))
            })?;

        factory.create(config)
    }

    /// Create a DNS provider from configuration
    pub fn create_provider(&self, config: &ProviderConfig) -> Result<Box<dyn DnsProvider>> {
        let provider_type = config.type_name();

        let factory = self
            .providers
            .get(provider_type)
            .ok_or_else(|| Error::config(format!("Unknown provider type: {}", provider_type)))?;

        factory.create(config)
    }

    /// List all registered source types
    pub fn list_sources(&self) -> Vec<String> {
        sorted_keys(&self.sources)
    }

    /// List all registered transformer types
    pub fn list_transformers(&self) -> Vec<String> {
        sorted_keys(&self.transformers)
    }

    /// List all registered provider types
    pub fn list_providers(&self) -> Vec<String> {
        sorted_keys(&self.providers)
    }

    /// Check if a source type is registered
    pub fn has_source(&self, name: &str) -> bool {
        self.sources.contains_key(name)
    }

    /// Check if a transformer type is registered
    pub fn has_transformer(&self, name: &str) -> bool {
        self.transformers.contains_key(name)
    }

    /// Check if a provider type is registered
    pub fn has_provider(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }
}

fn sorted_keys<V>(map: &HashMap<String, V>) -> Vec<String> {
    let mut keys: Vec<String> = map.keys().cloned().collect();
    keys.sort();
    keys
}
