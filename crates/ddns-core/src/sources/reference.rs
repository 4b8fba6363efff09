//! Reference source: alias another named address

use crate::config::SourceConfig;
use crate::error::{Error, Result};
use crate::resolver::ResolveContext;
use crate::traits::{Source, SourceFactory};
use async_trait::async_trait;
use std::net::IpAddr;

/// Resolves to whatever another named address resolves to in the same pass
#[derive(Debug, Clone)]
pub struct ReferenceSource {
    target: String,
}

impl ReferenceSource {
    /// Create a reference to `target`
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
        }
    }
}

#[async_trait]
impl Source for ReferenceSource {
    async fn lookup(&self, ctx: &mut ResolveContext<'_>) -> Result<IpAddr> {
        ctx.resolve_reference(&self.target).await
    }

    fn type_name(&self) -> &'static str {
        "reference"
    }

    fn reference(&self) -> Option<&str> {
        Some(&self.target)
    }
}

/// Factory for the `reference` source type
pub struct ReferenceFactory;

impl SourceFactory for ReferenceFactory {
    fn create(&self, config: &SourceConfig) -> Result<Box<dyn Source>> {
        let target = config.source.trim();
        if target.is_empty() {
            return Err(Error::config("reference source needs a target name"));
        }
        Ok(Box::new(ReferenceSource::new(target)))
    }
}
