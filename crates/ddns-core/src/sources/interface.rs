//! Interface source: pick one of the addresses bound to a local interface
//!
//! Enumeration is platform specific and provided through
//! [`AddressEnumerator`]; this module owns the filtering and selection.
//!
//! ## Filtering
//!
//! For each enumerated address, in order:
//!
//! 1. Wrong family: discarded.
//! 2. Non-global-unicast, private, temporary, tentative/duplicated,
//!    deprecated and (IPv6 only) EUI-64 addresses: discarded unless the
//!    matching [`FilterFlags`] override is set.
//! 3. Inside any `exclude` range: discarded.
//! 4. `include` non-empty and outside every range: discarded.
//!
//! The survivors are then reduced to one address by [`SelectMode`].

use crate::common::{Family, FilterFlags, IpNetwork, SelectMode};
use crate::common::{is_eui64, is_global_unicast, is_private};
use crate::config::{SourceConfig, decode_options};
use crate::error::{Error, Result};
use crate::resolver::ResolveContext;
use crate::traits::{Source, SourceFactory};
use async_trait::async_trait;
use serde::Deserialize;
use std::net::IpAddr;
use std::sync::Arc;
use tracing::debug;

const SOURCE_TYPE: &str = "interface";

/// Kernel-reported state of a bound address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AddrFlags {
    /// Temporary (privacy extension) address
    pub temporary: bool,
    /// Duplicate address detection still running
    pub tentative: bool,
    /// Duplicate address detection failed
    pub duplicated: bool,
    /// Preferred lifetime expired
    pub deprecated: bool,
}

/// One address bound to an interface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterfaceAddress {
    /// The address
    pub addr: IpAddr,
    /// Its kernel state
    pub flags: AddrFlags,
}

impl InterfaceAddress {
    /// An address with no state flags set
    pub fn new(addr: IpAddr) -> Self {
        Self {
            addr,
            flags: AddrFlags::default(),
        }
    }

    /// Same address with the given flags
    pub fn with_flags(mut self, flags: AddrFlags) -> Self {
        self.flags = flags;
        self
    }
}

/// Lists the addresses bound to a named interface
///
/// Called from a blocking task; implementations may perform synchronous
/// system calls.
pub trait AddressEnumerator: Send + Sync {
    /// All addresses bound to `interface`, in system order
    ///
    /// Fails if the interface does not exist or the system query fails.
    fn addresses(&self, interface: &str) -> Result<Vec<InterfaceAddress>>;
}

/// Settings decoded from the source record's `config` map
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct InterfaceOptions {
    /// Requested family
    #[serde(rename = "type")]
    pub family: Family,
    /// Selection among surviving candidates
    pub select: SelectMode,
    /// Exclusion overrides
    pub flags: FilterFlags,
    /// Ranges that discard a candidate outright
    pub exclude: Vec<IpNetwork>,
    /// Ranges a candidate must fall into, when non-empty
    pub include: Vec<IpNetwork>,
}

/// Address source backed by a local interface
pub struct InterfaceSource {
    interface: String,
    options: InterfaceOptions,
    enumerator: Arc<dyn AddressEnumerator>,
}

impl InterfaceSource {
    /// Create an interface source
    pub fn new(
        interface: impl Into<String>,
        options: InterfaceOptions,
        enumerator: Arc<dyn AddressEnumerator>,
    ) -> Self {
        Self {
            interface: interface.into(),
            options,
            enumerator,
        }
    }

    /// Why `candidate` is discarded, or `None` if it is eligible
    fn discard_reason(&self, candidate: &InterfaceAddress) -> Option<&'static str> {
        let ip = &candidate.addr;
        let allow = |flag| self.options.flags.contains(flag);

        if Family::of(ip) != self.options.family {
            return Some("mismatched family");
        }
        if !allow(FilterFlags::ALLOW_NON_GLOBAL_UNICAST) && !is_global_unicast(ip) {
            return Some("not global unicast");
        }
        if !allow(FilterFlags::ALLOW_PRIVATE) && is_private(ip) {
            return Some("private");
        }
        if !allow(FilterFlags::ALLOW_TEMPORARY) && candidate.flags.temporary {
            return Some("temporary");
        }
        if !allow(FilterFlags::ALLOW_BAD_DAD)
            && (candidate.flags.tentative || candidate.flags.duplicated)
        {
            return Some("tentative or duplicated");
        }
        if !allow(FilterFlags::ALLOW_DEPRECATED) && candidate.flags.deprecated {
            return Some("deprecated");
        }
        if self.options.family == Family::V6 && !allow(FilterFlags::ALLOW_EUI64) && is_eui64(ip) {
            return Some("EUI-64 derived");
        }
        if self.options.exclude.iter().any(|range| range.contains(*ip)) {
            return Some("excluded");
        }
        if !self.options.include.is_empty()
            && !self.options.include.iter().any(|range| range.contains(*ip))
        {
            return Some("not included");
        }

        None
    }

    /// Filter `candidates` and pick one according to the select mode
    pub fn select(&self, candidates: &[InterfaceAddress]) -> Result<IpAddr> {
        let mut eligible: Vec<IpAddr> = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            match self.discard_reason(candidate) {
                Some(reason) => debug!(
                    interface = %self.interface,
                    ip = %candidate.addr,
                    reason,
                    "discarded candidate"
                ),
                None => eligible.push(candidate.addr),
            }
        }

        let chosen = match self.options.select {
            SelectMode::First => eligible.first().copied(),
            SelectMode::Last => eligible.last().copied(),
            SelectMode::Shortest => {
                // sort_by_key is stable, so equal lengths keep system order
                eligible.sort_by_key(|ip| ip.to_string().len());
                eligible.first().copied()
            }
        };

        chosen.ok_or_else(|| {
            Error::lookup(
                SOURCE_TYPE,
                format!(
                    "no eligible {} address on interface {} (flags {})",
                    self.options.family, self.interface, self.options.flags
                ),
            )
        })
    }
}

#[async_trait]
impl Source for InterfaceSource {
    async fn lookup(&self, _ctx: &mut ResolveContext<'_>) -> Result<IpAddr> {
        let enumerator = Arc::clone(&self.enumerator);
        let interface = self.interface.clone();

        let candidates = tokio::task::spawn_blocking(move || enumerator.addresses(&interface))
            .await
            .map_err(|e| Error::lookup(SOURCE_TYPE, format!("enumeration task failed: {}", e)))??;

        debug!(
            interface = %self.interface,
            count = candidates.len(),
            "enumerated interface addresses"
        );

        self.select(&candidates)
    }

    fn type_name(&self) -> &'static str {
        SOURCE_TYPE
    }
}

/// Factory for the `interface` source type
pub struct InterfaceFactory {
    enumerator: Arc<dyn AddressEnumerator>,
}

impl InterfaceFactory {
    /// Create a factory whose sources enumerate through `enumerator`
    pub fn new(enumerator: Arc<dyn AddressEnumerator>) -> Self {
        Self { enumerator }
    }
}

impl SourceFactory for InterfaceFactory {
    fn create(&self, config: &SourceConfig) -> Result<Box<dyn Source>> {
        let interface = config.source.trim();
        if interface.is_empty() {
            return Err(Error::config("interface source needs an interface name"));
        }

        let options: InterfaceOptions = decode_options(SOURCE_TYPE, &config.config)?;
        Ok(Box::new(InterfaceSource::new(
            interface,
            options,
            Arc::clone(&self.enumerator),
        )))
    }
}
