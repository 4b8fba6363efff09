// # DNS Provider Trait
//
// Defines the interface for reading and writing DNS records via provider APIs.
//
// ## Implementations
//
// - Cloudflare: `ddns-provider-cloudflare` crate
//
// ## Usage
//
// ```rust,ignore
// use ddns_core::traits::{DnsProvider, Record};
//
// let query = Record::new("home.example.com", "A", "ddns-home");
// let existing = provider.find_records(&query).await?;
//
// let mut record = existing.into_iter().next().unwrap_or(query);
// record.content = "203.0.113.7".to_string();
// let written = provider.write_record(&record).await?;
// ```

use async_trait::async_trait;

/// Provider-specific identity of an existing remote record
///
/// A record without a handle has not been created yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordHandle {
    /// Cloudflare record and the zone it lives in
    Cloudflare {
        /// Record ID
        id: String,
        /// Zone ID
        zone_id: String,
    },
}

/// A DNS record owned by this service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Remote identity, `None` until the record exists
    pub handle: Option<RecordHandle>,
    /// Fully qualified record name
    pub domain: String,
    /// Record type (A or AAAA)
    pub record_type: String,
    /// Record content (the published address)
    pub content: String,
    /// Ownership mark, stored alongside the record
    pub mark: String,
}

impl Record {
    /// Create an unpublished record
    pub fn new(
        domain: impl Into<String>,
        record_type: impl Into<String>,
        mark: impl Into<String>,
    ) -> Self {
        Self {
            handle: None,
            domain: domain.into(),
            record_type: record_type.into(),
            content: String::new(),
            mark: mark.into(),
        }
    }
}

/// Trait for DNS provider implementations
///
/// Records are addressed by domain, type and ownership mark so that the
/// service never touches records it did not create.
///
/// # Thread Safety
///
/// Implementations must be thread-safe and usable across async tasks.
///
/// Providers must not retry internally; a failed write is reported and the
/// next scheduled pass tries again.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Find records matching the query's domain, type and mark
    ///
    /// The query's `content` and `handle` are ignored.
    async fn find_records(&self, query: &Record) -> Result<Vec<Record>, crate::Error>;

    /// Create (no handle) or update (with handle) a record
    ///
    /// # Returns
    ///
    /// The record as stored by the provider, always carrying a handle
    async fn write_record(&self, record: &Record) -> Result<Record, crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}

/// Helper trait for constructing DNS providers from configuration
pub trait DnsProviderFactory: Send + Sync {
    /// Create a DnsProvider instance from configuration
    ///
    /// # Parameters
    ///
    /// - `config`: Configuration specific to this provider
    ///
    /// # Returns
    ///
    /// A boxed DnsProvider trait object
    fn create(
        &self,
        config: &crate::config::ProviderConfig,
    ) -> Result<Box<dyn DnsProvider>, crate::Error>;
}
