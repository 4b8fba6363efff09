//! Configuration types for the DDNS system
//!
//! This module defines the typed configuration record consumed at startup.
//! Per-variant source and transformer settings stay as an open map
//! ([`Options`]) and are decoded by the owning factory with
//! [`decode_options`].

use crate::common::deserialize_opt_duration;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

/// Open key-value map carried by source and transformer records
pub type Options = serde_json::Map<String, serde_json::Value>;

/// Main DDNS configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DdnsConfig {
    /// Service settings
    #[serde(default)]
    pub service: ServiceConfig,

    /// Logging settings
    #[serde(default)]
    pub log: LogConfig,

    /// DNS provider configuration
    pub provider: ProviderConfig,

    /// Named addresses to resolve
    #[serde(default)]
    pub address: Vec<AddressConfig>,

    /// DNS records to publish
    #[serde(default)]
    pub domain: Vec<DomainConfig>,
}

impl DdnsConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.address.is_empty() {
            return Err(crate::Error::config("No addresses configured"));
        }

        let mut names = HashSet::new();
        for address in &self.address {
            address.validate()?;
            if !names.insert(address.name.as_str()) {
                return Err(crate::Error::config(format!(
                    "Duplicate address name: {}",
                    address.name
                )));
            }
        }

        for domain in &self.domain {
            domain.validate()?;
            if !names.contains(domain.address.as_str()) {
                return Err(crate::Error::config(format!(
                    "Domain {} refers to unknown address: {}",
                    domain.domain, domain.address
                )));
            }
        }

        self.provider.validate()?;

        Ok(())
    }
}

/// Service settings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceConfig {
    /// Instance name, appended to the ownership mark of every record
    #[serde(default)]
    pub name: String,

    /// Interval between resolution passes; unset or zero runs once
    #[serde(default, deserialize_with = "deserialize_opt_duration")]
    pub refresh_rate: Option<Duration>,

    /// Optional PID file guarding against concurrent instances
    #[serde(default)]
    pub pid_file: Option<String>,

    /// Base of the ownership mark, `ddns` when unset
    #[serde(default)]
    pub mark_prefix: Option<String>,
}

impl ServiceConfig {
    /// Base of the ownership mark written to every record
    pub fn mark_prefix(&self) -> &str {
        self.mark_prefix
            .as_deref()
            .filter(|p| !p.is_empty())
            .unwrap_or(crate::publisher::MARK_PREFIX)
    }

    /// The refresh interval, if the service runs periodically
    pub fn interval(&self) -> Option<Duration> {
        self.refresh_rate.filter(|d| !d.is_zero())
    }
}

/// Logging settings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogConfig {
    /// Maximum level (trace, debug, info, warn, error)
    #[serde(default)]
    pub level: Option<String>,

    /// Output encoding: console (default) or json
    #[serde(default)]
    pub encoding: Option<String>,

    /// Targets receiving every log line: file paths, `stdout` or `stderr`.
    /// Unset means stdout.
    #[serde(default)]
    pub info_path: Option<Vec<String>>,

    /// Targets additionally receiving error-level lines
    #[serde(default)]
    pub error_path: Option<Vec<String>>,
}

/// Named address configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressConfig {
    /// Unique address name (e.g. "wan", "lan6")
    pub name: String,

    /// Sources, tried in order
    pub sources: Vec<SourceConfig>,

    /// Transformers, applied in order to a source's result
    #[serde(default)]
    pub transformers: Vec<TransformerConfig>,
}

impl AddressConfig {
    /// Create an address with no sources or transformers
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sources: Vec::new(),
            transformers: Vec::new(),
        }
    }

    /// Append a source
    pub fn with_source(mut self, source: SourceConfig) -> Self {
        self.sources.push(source);
        self
    }

    /// Append a transformer
    pub fn with_transformer(mut self, transformer: TransformerConfig) -> Self {
        self.transformers.push(transformer);
        self
    }

    /// Validate the address configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.name.is_empty() {
            return Err(crate::Error::config("Address name cannot be empty"));
        }
        if self.sources.is_empty() {
            return Err(crate::Error::config(format!(
                "Address {} has no sources",
                self.name
            )));
        }
        Ok(())
    }
}

/// Source configuration record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Type tag selecting the source variant
    #[serde(rename = "type")]
    pub source_type: String,

    /// Endpoint URL, interface name or referenced address name
    #[serde(default)]
    pub source: String,

    /// Variant-specific settings
    #[serde(default)]
    pub config: Options,
}

impl SourceConfig {
    /// Create a source record without variant settings
    pub fn new(source_type: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            source_type: source_type.into(),
            source: source.into(),
            config: Options::new(),
        }
    }

    /// Set one variant-specific setting
    pub fn with_option(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.config.insert(key.into(), value);
        self
    }
}

/// Transformer configuration record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformerConfig {
    /// Type tag selecting the transformer variant
    #[serde(rename = "type")]
    pub transformer_type: String,

    /// Variant-specific settings
    #[serde(default)]
    pub config: Options,
}

impl TransformerConfig {
    /// Create a transformer record without variant settings
    pub fn new(transformer_type: impl Into<String>) -> Self {
        Self {
            transformer_type: transformer_type.into(),
            config: Options::new(),
        }
    }

    /// Set one variant-specific setting
    pub fn with_option(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.config.insert(key.into(), value);
        self
    }
}

/// Decode a variant-specific settings map into its typed form
pub fn decode_options<T: DeserializeOwned>(kind: &str, options: &Options) -> Result<T, crate::Error> {
    serde_json::from_value(serde_json::Value::Object(options.clone()))
        .map_err(|e| crate::Error::config(format!("bad {} config: {}", kind, e)))
}

/// DNS record binding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainConfig {
    /// Fully qualified record name
    pub domain: String,

    /// Record type (A or AAAA)
    #[serde(rename = "type")]
    pub record_type: String,

    /// Extra ownership mark for this record
    #[serde(default)]
    pub mark: Option<String>,

    /// Name of the address whose value is published
    pub address: String,
}

impl DomainConfig {
    /// Validate the record binding
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.domain.is_empty() {
            return Err(crate::Error::config("Domain name cannot be empty"));
        }
        match self.record_type.to_ascii_uppercase().as_str() {
            "A" | "AAAA" => Ok(()),
            other => Err(crate::Error::config(format!(
                "Unsupported record type {} for {}",
                other, self.domain
            ))),
        }
    }
}

/// DNS provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Cloudflare provider
    Cloudflare {
        /// Cloudflare API token
        api_token: String,
        /// Zones that published records belong to
        #[serde(default)]
        zone_names: Vec<String>,
        /// TTL for created records (1 = automatic)
        #[serde(default = "default_ttl")]
        ttl: u32,
        /// Log intended writes instead of performing them
        #[serde(default)]
        dry_run: bool,
    },

    /// Custom provider
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl ProviderConfig {
    /// Validate the provider configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            ProviderConfig::Cloudflare {
                api_token,
                zone_names,
                ..
            } => {
                if api_token.is_empty() {
                    return Err(crate::Error::config("Cloudflare API token cannot be empty"));
                }
                if zone_names.is_empty() {
                    return Err(crate::Error::config("Cloudflare zone_names cannot be empty"));
                }
                Ok(())
            }
            ProviderConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(crate::Error::config(
                        "Custom provider factory cannot be empty",
                    ));
                }
                if config.is_null() {
                    return Err(crate::Error::config(
                        "Custom provider config cannot be null",
                    ));
                }
                Ok(())
            }
        }
    }

    /// Get the provider type name
    pub fn type_name(&self) -> &str {
        match self {
            ProviderConfig::Cloudflare { .. } => "cloudflare",
            ProviderConfig::Custom { factory, .. } => factory,
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig::Cloudflare {
            api_token: String::new(),
            zone_names: Vec::new(),
            ttl: default_ttl(),
            dry_run: false,
        }
    }
}

fn default_ttl() -> u32 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> serde_json::Value {
        json!({
            "service": { "name": "home", "refresh_rate": "5m" },
            "provider": {
                "type": "cloudflare",
                "api_token": "token",
                "zone_names": ["example.com"]
            },
            "address": [
                {
                    "name": "wan",
                    "sources": [
                        { "type": "cf_trace", "source": "1.1.1.1", "config": { "type": "v4" } }
                    ]
                },
                {
                    "name": "lan",
                    "sources": [ { "type": "reference", "source": "wan" } ],
                    "transformers": [
                        { "type": "mask_rewrite", "config": { "mask": 24, "overwrite": "10.0.0.1" } }
                    ]
                }
            ],
            "domain": [
                { "domain": "home.example.com", "type": "A", "address": "wan" }
            ]
        })
    }

    #[test]
    fn test_decode_and_validate() {
        let config: DdnsConfig = serde_json::from_value(sample()).unwrap();
        config.validate().unwrap();

        assert_eq!(config.service.interval(), Some(Duration::from_secs(300)));
        assert_eq!(config.address.len(), 2);
        assert_eq!(config.address[0].sources[0].source_type, "cf_trace");
        assert_eq!(config.address[1].transformers[0].transformer_type, "mask_rewrite");
        assert_eq!(config.provider.type_name(), "cloudflare");
    }

    #[test]
    fn test_mark_prefix() {
        let config: DdnsConfig = serde_json::from_value(sample()).unwrap();
        assert_eq!(config.service.mark_prefix(), "ddns");

        let mut value = sample();
        value["service"]["mark_prefix"] = json!("cfddns");
        let config: DdnsConfig = serde_json::from_value(value).unwrap();
        assert_eq!(config.service.mark_prefix(), "cfddns");
    }

    #[test]
    fn test_zero_refresh_rate_means_one_shot() {
        let mut value = sample();
        value["service"]["refresh_rate"] = json!(0);
        let config: DdnsConfig = serde_json::from_value(value).unwrap();
        assert_eq!(config.service.interval(), None);
    }

    #[test]
    fn test_duplicate_address_rejected() {
        let mut value = sample();
        value["address"][1]["name"] = json!("wan");
        let config: DdnsConfig = serde_json::from_value(value).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_domain_must_bind_known_address() {
        let mut value = sample();
        value["domain"][0]["address"] = json!("nope");
        let config: DdnsConfig = serde_json::from_value(value).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_decode_options_reports_kind() {
        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        struct Needs {
            mask: String,
        }

        let err = decode_options::<Needs>("mask_rewrite", &Options::new()).unwrap_err();
        assert!(err.to_string().contains("bad mask_rewrite config"));
    }
}
