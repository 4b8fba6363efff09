//! Transformer trait
//!
//! Transformers post-process a successful source result. They run in
//! configured order; the first failure discards the source's result and the
//! pipeline moves on to the next source.

use std::net::IpAddr;

/// Trait for address transformer implementations
pub trait Transformer: Send + Sync {
    /// Map one address to another
    fn transform(&self, address: IpAddr) -> Result<IpAddr, crate::Error>;

    /// Short type name used in logs
    fn type_name(&self) -> &'static str;
}

/// Helper trait for constructing transformers from configuration
pub trait TransformerFactory: Send + Sync {
    /// Create a Transformer instance from configuration
    fn create(
        &self,
        config: &crate::config::TransformerConfig,
    ) -> Result<Box<dyn Transformer>, crate::Error>;
}
