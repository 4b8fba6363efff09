//! Publisher: push resolved addresses to DNS records
//!
//! The Publisher sits between the resolver and a [`DnsProvider`]. It owns one
//! record per configured domain binding and only ever touches records that
//! carry its ownership mark.
//!
//! ## Flow
//!
//! ```text
//!  Resolution ──► Publisher::publish()
//!                     │
//!                     ├─ name missing      → warn, skip
//!                     ├─ content unchanged → skip
//!                     └─ changed           → DnsProvider::write_record()
//!                                              ├─ ok   → remember record
//!                                              └─ err  → log, keep going
//! ```
//!
//! A failed write never aborts the other domains; the next pass retries it.

use crate::config::DomainConfig;
use crate::error::{Error, Result};
use crate::resolver::Resolution;
use crate::traits::{DnsProvider, Record};
use std::fmt;
use std::net::IpAddr;
use tracing::{debug, error, info, warn};

/// Default base of the ownership mark
///
/// Installs migrating from `cfddns` set `service.mark_prefix = "cfddns"` so
/// that their existing records are adopted instead of duplicated.
pub const MARK_PREFIX: &str = "ddns";

/// Build the ownership mark for a record
///
/// `prefix`, then `-<service>` when a service name is set, then `-<mark>`
/// when the domain binding carries its own mark.
pub fn ownership_mark(prefix: &str, service_name: Option<&str>, domain_mark: Option<&str>) -> String {
    let mut mark = String::from(prefix);
    for part in [service_name, domain_mark].into_iter().flatten() {
        if !part.is_empty() {
            mark.push('-');
            mark.push_str(part);
        }
    }
    mark
}

/// Outcome counts of one publish run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishSummary {
    /// Records created or updated
    pub updated: usize,
    /// Records already holding the resolved address
    pub unchanged: usize,
    /// Bindings with no usable address in the resolution
    pub skipped: usize,
    /// Writes the provider rejected
    pub failed: usize,
}

impl PublishSummary {
    /// Whether every binding was either written or already current
    pub fn is_complete(&self) -> bool {
        self.skipped == 0 && self.failed == 0
    }
}

impl fmt::Display for PublishSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} updated, {} unchanged, {} skipped, {} failed",
            self.updated, self.unchanged, self.skipped, self.failed
        )
    }
}

struct Binding {
    address: String,
    record: Record,
}

/// Publishes resolved addresses through a DNS provider
pub struct Publisher {
    provider: Box<dyn DnsProvider>,
    bindings: Vec<Binding>,
}

impl Publisher {
    /// Create a publisher marking records with the default [`MARK_PREFIX`]
    pub async fn new(
        provider: Box<dyn DnsProvider>,
        domains: &[DomainConfig],
        service_name: Option<&str>,
    ) -> Result<Self> {
        Self::with_mark_prefix(provider, domains, MARK_PREFIX, service_name).await
    }

    /// Create a publisher, loading the current state of every owned record
    ///
    /// Fails if a lookup fails or if more than one record carries the same
    /// ownership mark for a domain.
    pub async fn with_mark_prefix(
        provider: Box<dyn DnsProvider>,
        domains: &[DomainConfig],
        mark_prefix: &str,
        service_name: Option<&str>,
    ) -> Result<Self> {
        let mut bindings = Vec::with_capacity(domains.len());

        for domain in domains {
            let mark = ownership_mark(mark_prefix, service_name, domain.mark.as_deref());
            let query = Record::new(&domain.domain, domain.record_type.to_ascii_uppercase(), mark);

            let mut found = provider.find_records(&query).await?;
            let record = match found.len() {
                0 => {
                    debug!(domain = %query.domain, mark = %query.mark, "no existing record");
                    query
                }
                1 => {
                    let record = found.remove(0);
                    debug!(domain = %record.domain, content = %record.content, "found existing record");
                    record
                }
                n => {
                    return Err(Error::dns_provider(format!(
                        "found {} records for {} {} marked {}, expected at most one",
                        n, query.record_type, query.domain, query.mark
                    )));
                }
            };

            bindings.push(Binding {
                address: domain.address.clone(),
                record,
            });
        }

        info!(
            provider = provider.provider_name(),
            records = bindings.len(),
            "publisher ready"
        );

        Ok(Self { provider, bindings })
    }

    /// Current view of every owned record
    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.bindings.iter().map(|b| &b.record)
    }

    /// Write every binding whose address changed
    pub async fn publish(&mut self, resolution: &Resolution) -> PublishSummary {
        let mut summary = PublishSummary::default();

        for binding in &mut self.bindings {
            let record = &binding.record;

            let Some(ip) = resolution.get(&binding.address) else {
                warn!(
                    domain = %record.domain,
                    name = %binding.address,
                    "no resolved address for record, skipping"
                );
                summary.skipped += 1;
                continue;
            };

            if !family_matches(&record.record_type, ip) {
                warn!(
                    domain = %record.domain,
                    record_type = %record.record_type,
                    ip = %ip,
                    "address family does not match record type, skipping"
                );
                summary.skipped += 1;
                continue;
            }

            let content = ip.to_string();
            if record.handle.is_some() && record.content == content {
                debug!(domain = %record.domain, ip = %ip, "record unchanged");
                summary.unchanged += 1;
                continue;
            }

            let mut wanted = record.clone();
            wanted.content = content;

            match self.provider.write_record(&wanted).await {
                Ok(written) => {
                    info!(
                        "Updated {} {} -> {} (previous: {})",
                        written.record_type,
                        written.domain,
                        written.content,
                        if record.content.is_empty() { "none" } else { record.content.as_str() }
                    );
                    binding.record = written;
                    summary.updated += 1;
                }
                Err(e) => {
                    error!("Failed to update record {}: {}", record.domain, e);
                    summary.failed += 1;
                }
            }
        }

        summary
    }
}

fn family_matches(record_type: &str, ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(_) => record_type.eq_ignore_ascii_case("A"),
        IpAddr::V6(_) => record_type.eq_ignore_ascii_case("AAAA"),
    }
}
