// # ddns-core
//
// Core library for the DDNS address resolver.
//
// ## Architecture Overview
//
// - **Source**: strategy producing a candidate address for a named address
// - **Transformer**: deterministic rewrite of a source's result
// - **Pipeline**: ordered sources and transformers for one name
// - **Resolver**: resolves every named address per pass, following
//   references between names with memoization and cycle detection
// - **Registry**: explicit map from configuration type tags to factories
// - **Publisher**: writes resolved addresses through a **DnsProvider**
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from platform and
//    network implementations, which live in plugin crates
// 2. **Plugin-Based**: Variants are created through the Registry, no
//    hard-coded if-else over type tags
// 3. **Library-First**: All core functionality can be used as a library
// 4. **Fail-Fast Passes**: A pass either resolves every name or reports the
//    first failure; nothing is carried over between passes

pub mod common;
pub mod config;
pub mod error;
pub mod publisher;
pub mod registry;
pub mod resolver;
pub mod sources;
pub mod traits;
pub mod transformers;

// Re-export core types for convenience
pub use common::{Family, FilterFlags, IpNetwork, SelectMode};
pub use config::{AddressConfig, DdnsConfig, DomainConfig, ProviderConfig, SourceConfig, TransformerConfig};
pub use error::{Error, Result};
pub use publisher::{PublishSummary, Publisher};
pub use registry::Registry;
pub use resolver::{Pipeline, Resolution, ResolveContext, Resolver};
pub use traits::{DnsProvider, Record, RecordHandle, Source, Transformer};

/// Register the sources and transformers that need no platform support
///
/// Adds the `reference` source and the `mask_rewrite` transformer.
pub fn register_builtins(registry: &mut Registry) {
    registry.register_source("reference", Box::new(sources::ReferenceFactory));
    registry.register_transformer("mask_rewrite", Box::new(transformers::MaskRewriteFactory));
}
