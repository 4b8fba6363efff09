//! Core traits for the DDNS system
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`Source`]: Produce a candidate address for a named address
//! - [`Transformer`]: Deterministically rewrite a source's result
//! - [`DnsProvider`]: Read and write DNS records via provider APIs

pub mod source;
pub mod transformer;
pub mod dns_provider;

pub use source::{Source, SourceFactory};
pub use transformer::{Transformer, TransformerFactory};
pub use dns_provider::{DnsProvider, DnsProviderFactory, Record, RecordHandle};
