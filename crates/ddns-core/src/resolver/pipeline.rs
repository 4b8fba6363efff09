//! Per-name source/transformer pipeline

use super::ResolveContext;
use crate::error::{Error, Result};
use crate::traits::{Source, Transformer};
use std::net::IpAddr;
use tracing::{debug, error, info, warn};

/// A resolved address and the source variant that produced it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved {
    /// The final address, after all transformers
    pub address: IpAddr,
    /// Type name of the source that produced it
    pub source_type: &'static str,
}

/// Ordered sources and transformers for one named address
pub struct Pipeline {
    name: String,
    sources: Vec<Box<dyn Source>>,
    transformers: Vec<Box<dyn Transformer>>,
}

/// Progress of one pipeline invocation
enum Step {
    TryingSource(usize),
    Success(Resolved),
    Exhausted,
}

impl Pipeline {
    /// Create a pipeline
    pub fn new(
        name: impl Into<String>,
        sources: Vec<Box<dyn Source>>,
        transformers: Vec<Box<dyn Transformer>>,
    ) -> Self {
        Self {
            name: name.into(),
            sources,
            transformers,
        }
    }

    /// The address name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Configured sources, in order
    pub fn sources(&self) -> &[Box<dyn Source>] {
        &self.sources
    }

    /// Run the pipeline
    ///
    /// Sources are tried in order. A source's result goes through every
    /// transformer in order; the first source to make it through all of
    /// them wins. Recoverable failures move on to the next source, fatal
    /// ones are returned immediately.
    pub async fn run(&self, ctx: &mut ResolveContext<'_>) -> Result<Resolved> {
        let mut step = Step::TryingSource(0);

        loop {
            step = match step {
                Step::TryingSource(index) => match self.sources.get(index) {
                    None => Step::Exhausted,
                    Some(source) => match self.attempt(source.as_ref(), ctx).await {
                        Ok(address) => Step::Success(Resolved {
                            address,
                            source_type: source.type_name(),
                        }),
                        Err(e) if e.is_fatal() => return Err(e),
                        Err(e) => {
                            warn!(
                                source_type = source.type_name(),
                                index,
                                error = %e,
                                "source failed, trying next"
                            );
                            Step::TryingSource(index + 1)
                        }
                    },
                },
                Step::Success(resolved) => {
                    info!(
                        ip = %resolved.address,
                        source_type = resolved.source_type,
                        "resolved ip"
                    );
                    return Ok(resolved);
                }
                Step::Exhausted => {
                    error!("all sources failed, unable to get ip");
                    return Err(Error::unresolved(&self.name));
                }
            };
        }
    }

    async fn attempt(&self, source: &dyn Source, ctx: &mut ResolveContext<'_>) -> Result<IpAddr> {
        let mut address = source.lookup(ctx).await?;
        debug!(source_type = source.type_name(), ip = %address, "source produced ip");

        for transformer in &self.transformers {
            address = transformer.transform(address)?;
            debug!(transformer = transformer.type_name(), ip = %address, "transformed ip");
        }

        Ok(address)
    }
}
