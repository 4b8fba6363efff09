//! Dependency-aware address resolver
//!
//! The Resolver owns one [`Pipeline`] per named address and runs resolution
//! passes over all of them.
//!
//! ## Architecture
//!
//! ```text
//!  Resolver::resolve()
//!        │
//!        ▼
//!  ┌──────────────┐  pending name   ┌──────────────┐
//!  │  PassState   │ ──────────────► │  Pipeline    │── sources, in order
//!  │ table/pending│ ◄────────────── │  (one name)  │── transformers, in order
//!  └──────────────┘   result        └──────────────┘
//!        ▲                                 │
//!        │      ResolveContext             │ reference source
//!        └─────────────────────────────────┘
//! ```
//!
//! ## Pass Semantics
//!
//! 1. Every configured name starts out pending.
//! 2. Names are taken from the pending list in configuration order and
//!    resolved; a name already in the result table is a memo hit.
//! 3. Reference sources resolve their target directly through the
//!    [`ResolveContext`], sharing the pass's result table, so a name is
//!    looked up by its own pipeline at most once per pass.
//! 4. The first name whose pipeline fails, or the first reference cycle,
//!    aborts the pass. There is no partial result.
//!
//! Nothing survives between passes.

mod pipeline;

pub use pipeline::{Pipeline, Resolved};

use crate::config::AddressConfig;
use crate::error::{Error, Result};
use crate::registry::Registry;
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::net::IpAddr;
use std::pin::Pin;
use tracing::{Instrument, debug, error, info_span};

/// Result of a successful pass: every configured name mapped to an address
pub type Resolution = HashMap<String, IpAddr>;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Resolves every named address, following references between them
pub struct Resolver {
    /// Names in configuration order
    order: Vec<String>,

    /// Pipelines keyed by name
    pipelines: HashMap<String, Pipeline>,
}

impl Resolver {
    /// Build a resolver from address configuration
    ///
    /// Every source and transformer is created through `registry`. Fails with
    /// a configuration error on unknown type tags, malformed variant settings,
    /// duplicate names, empty source lists or references to unknown names.
    pub fn new(addresses: &[AddressConfig], registry: &Registry) -> Result<Self> {
        let mut pipelines = Vec::with_capacity(addresses.len());

        for address in addresses {
            address.validate()?;

            let mut sources = Vec::with_capacity(address.sources.len());
            for config in &address.sources {
                let source = registry.create_source(config).map_err(|e| {
                    error!(name = %address.name, source_type = %config.source_type, error = %e, "failed creating source");
                    e
                })?;
                debug!(name = %address.name, source_type = source.type_name(), "created source");
                sources.push(source);
            }

            let mut transformers = Vec::with_capacity(address.transformers.len());
            for config in &address.transformers {
                let transformer = registry.create_transformer(config).map_err(|e| {
                    error!(name = %address.name, transformer_type = %config.transformer_type, error = %e, "failed creating transformer");
                    e
                })?;
                debug!(name = %address.name, transformer_type = transformer.type_name(), "created transformer");
                transformers.push(transformer);
            }

            pipelines.push(Pipeline::new(&address.name, sources, transformers));
        }

        Self::from_pipelines(pipelines)
    }

    /// Build a resolver from ready-made pipelines
    pub fn from_pipelines(pipelines: Vec<Pipeline>) -> Result<Self> {
        let mut order = Vec::with_capacity(pipelines.len());
        let mut by_name = HashMap::with_capacity(pipelines.len());

        for pipeline in pipelines {
            let name = pipeline.name().to_string();
            if by_name.contains_key(&name) {
                return Err(Error::config(format!("Duplicate address name: {}", name)));
            }
            order.push(name.clone());
            by_name.insert(name, pipeline);
        }

        for pipeline in by_name.values() {
            for target in pipeline.sources().iter().filter_map(|s| s.reference()) {
                if !by_name.contains_key(target) {
                    return Err(Error::config(format!(
                        "Address {} references unknown address: {}",
                        pipeline.name(),
                        target
                    )));
                }
            }
        }

        Ok(Self {
            order,
            pipelines: by_name,
        })
    }

    /// Configured names, in configuration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Run one resolution pass
    ///
    /// # Returns
    ///
    /// - `Ok(Resolution)`: An address for every configured name
    /// - `Err(Error)`: The first unresolvable name or reference cycle
    ///
    /// Dropping the returned future cancels every in-flight lookup.
    pub async fn resolve(&self) -> Result<Resolution> {
        let mut pass = PassState::new(&self.order);

        while let Some(name) = pass.pending.pop_front() {
            let mut ctx = ResolveContext::new(self, &mut pass, &name);
            if let Err(e) = ctx.resolve_name(&name).await {
                error!(name = %name, error = %e, "resolve failed");
                return Err(e);
            }
        }

        Ok(pass.into_resolution())
    }
}

/// Pass-local state: written once per name, dropped at the end of the pass
struct PassState {
    /// name → resolved address, `None` marks a failed name
    table: HashMap<String, Option<IpAddr>>,

    /// names not yet attempted this pass
    pending: VecDeque<String>,
}

impl PassState {
    fn new(order: &[String]) -> Self {
        Self {
            table: HashMap::with_capacity(order.len()),
            pending: order.iter().cloned().collect(),
        }
    }

    fn into_resolution(self) -> Resolution {
        self.table
            .into_iter()
            .filter_map(|(name, ip)| ip.map(|ip| (name, ip)))
            .collect()
    }
}

/// Resolution context threaded through every source lookup
///
/// Holds the running pass's state and the active reference chain of the
/// current top-level request. The chain lists the names currently being
/// resolved, outermost first.
pub struct ResolveContext<'a> {
    resolver: &'a Resolver,
    pass: &'a mut PassState,
    chain: Vec<String>,
}

impl<'a> ResolveContext<'a> {
    fn new(resolver: &'a Resolver, pass: &'a mut PassState, root: &str) -> Self {
        Self {
            resolver,
            pass,
            chain: vec![root.to_string()],
        }
    }

    /// Names currently being resolved, outermost first
    pub fn chain(&self) -> &[String] {
        &self.chain
    }

    /// Resolve another named address within the current pass
    ///
    /// Fails with a cycle error, without recursing, when `target` is
    /// already on the active chain.
    pub async fn resolve_reference(&mut self, target: &str) -> Result<IpAddr> {
        if self.chain.iter().any(|name| name == target) {
            let mut chain = self.chain.clone();
            chain.push(target.to_string());
            error!(chain = ?chain, "infinite loop detected in IP source chain");
            return Err(Error::cycle(chain));
        }

        self.chain.push(target.to_string());
        let result = self.resolve_name(target).await;
        self.chain.pop();

        result
    }

    fn resolve_name<'b>(&'b mut self, name: &'b str) -> BoxFuture<'b, Result<IpAddr>> {
        Box::pin(async move {
            if let Some(entry) = self.pass.table.get(name) {
                debug!(name, "found result in resolved table");
                return (*entry).ok_or_else(|| Error::unresolved(name));
            }

            let resolver = self.resolver;
            let pipeline = resolver.pipelines.get(name).ok_or_else(|| {
                error!(name, "non-existent IP address entry");
                Error::internal(format!("non-existent IP address entry: {}", name))
            })?;

            self.pass.pending.retain(|pending| pending != name);

            let outcome = pipeline
                .run(self)
                .instrument(info_span!("resolve", name))
                .await
                .map(|resolved| resolved.address);

            self.pass
                .table
                .insert(name.to_string(), outcome.as_ref().ok().copied());

            outcome
        })
    }
}
