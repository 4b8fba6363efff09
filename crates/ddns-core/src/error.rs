//! Error types for the DDNS system
//!
//! This module defines all error types used throughout the crate.
//!
//! Errors raised while resolving addresses fall into two groups. Source and
//! transformer failures are *recoverable*: the owning pipeline moves on to
//! its next source. Cycles, exhausted names and broken invariants are
//! *fatal*: they abort the whole resolution pass. See [`Error::is_fatal`].

use thiserror::Error;

/// Result type alias for DDNS operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the DDNS system
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors (unknown type tag, malformed per-variant config)
    #[error("Configuration error: {0}")]
    Config(String),

    /// A source could not produce an address
    #[error("Lookup failed ({source_type}): {message}")]
    Lookup {
        /// Type name of the failing source
        source_type: &'static str,
        /// Error message
        message: String,
    },

    /// A transformer could not map an address
    #[error("Transform failed: {0}")]
    Transform(String),

    /// A reference chain revisited a name
    #[error("Reference cycle detected: {}", chain.join(" -> "))]
    Cycle {
        /// The active chain, ending with the name that closed the loop
        chain: Vec<String>,
    },

    /// Every source of a named address failed
    #[error("All sources failed for address '{name}'")]
    Unresolved {
        /// The address name
        name: String,
    },

    /// A reachable-but-unexpected state
    #[error("Internal error: {0}")]
    Internal(String),

    /// DNS provider-related errors
    #[error("DNS provider error: {0}")]
    DnsProvider(String),

    /// Record not found
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Provider-specific error
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a lookup failure for the given source type
    pub fn lookup(source_type: &'static str, msg: impl Into<String>) -> Self {
        Self::Lookup {
            source_type,
            message: msg.into(),
        }
    }

    /// Create a transform failure
    pub fn transform(msg: impl Into<String>) -> Self {
        Self::Transform(msg.into())
    }

    /// Create a cycle error from the offending chain
    pub fn cycle(chain: Vec<String>) -> Self {
        Self::Cycle { chain }
    }

    /// Create an "all sources failed" error
    pub fn unresolved(name: impl Into<String>) -> Self {
        Self::Unresolved { name: name.into() }
    }

    /// Create an internal invariant error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Create a DNS provider error
    pub fn dns_provider(msg: impl Into<String>) -> Self {
        Self::DnsProvider(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Whether this error must abort the resolution pass
    ///
    /// Fatal errors are never absorbed by a pipeline's source fallback.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Cycle { .. } | Self::Unresolved { .. } | Self::Internal(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(Error::cycle(vec!["a".into(), "b".into(), "a".into()]).is_fatal());
        assert!(Error::unresolved("wan").is_fatal());
        assert!(Error::internal("bad state").is_fatal());

        assert!(!Error::lookup("simple", "connection refused").is_fatal());
        assert!(!Error::transform("mismatched IP family").is_fatal());
        assert!(!Error::config("bad mask").is_fatal());
    }

    #[test]
    fn test_cycle_message_lists_chain() {
        let err = Error::cycle(vec!["lan".into(), "wan".into(), "lan".into()]);
        assert_eq!(err.to_string(), "Reference cycle detected: lan -> wan -> lan");
    }
}
