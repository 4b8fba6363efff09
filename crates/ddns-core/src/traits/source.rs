// # Source Trait
//
// Defines the interface for strategies that produce a candidate address.
//
// ## Implementations
//
// - Reference (another named address): `ddns_core::sources::reference`
// - Interface addresses: `ddns_core::sources::interface`, fed by `ddns-ip-netlink`
// - HTTP trace endpoint and generic HTTP page: `ddns-ip-http` crate
//
// ## Usage
//
// ```rust,ignore
// use ddns_core::Source;
//
// // Sources are driven by the resolver; a lookup receives the pass context
// // so that reference sources can re-enter resolution.
// let ip = source.lookup(&mut ctx).await?;
// ```

use crate::resolver::ResolveContext;
use async_trait::async_trait;
use std::net::IpAddr;

/// Trait for address source implementations
///
/// A source holds only its own immutable configuration and is tried by the
/// owning pipeline in configured order. Returning an error that is not
/// [fatal](crate::Error::is_fatal) makes the pipeline fall through to the
/// next source.
///
/// Sources must not retry internally; retrying is left to the next
/// scheduled pass.
#[async_trait]
pub trait Source: Send + Sync {
    /// Attempt to produce an address
    ///
    /// # Parameters
    ///
    /// - `ctx`: The current pass's resolution context. Only sources that
    ///   depend on other named addresses need to touch it.
    ///
    /// # Returns
    ///
    /// - `Ok(IpAddr)`: The candidate address
    /// - `Err(Error)`: If no address could be produced
    async fn lookup(&self, ctx: &mut ResolveContext<'_>) -> Result<IpAddr, crate::Error>;

    /// Short type name used in logs (e.g. "cf-trace", "interface")
    fn type_name(&self) -> &'static str;

    /// Name of the address this source depends on, if any
    ///
    /// Used to validate the dependency graph when the resolver is built.
    fn reference(&self) -> Option<&str> {
        None
    }
}

/// Helper trait for constructing sources from configuration
pub trait SourceFactory: Send + Sync {
    /// Create a Source instance from configuration
    ///
    /// # Parameters
    ///
    /// - `config`: The source record; `config.config` holds the
    ///   variant-specific settings
    ///
    /// # Returns
    ///
    /// A boxed Source trait object, or a configuration error
    fn create(
        &self,
        config: &crate::config::SourceConfig,
    ) -> Result<Box<dyn Source>, crate::Error>;
}
