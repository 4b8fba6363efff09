//! Test doubles and common utilities for contract tests
//!
//! This module provides minimal test doubles that verify behavioral
//! contracts without touching the network or the host's interfaces.

#![allow(dead_code)]

use async_trait::async_trait;
use ddns_core::error::{Error, Result};
use ddns_core::resolver::{Pipeline, ResolveContext};
use ddns_core::sources::{AddressEnumerator, InterfaceAddress, ReferenceSource};
use ddns_core::traits::{DnsProvider, Record, RecordHandle, Source};
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// A source that returns a fixed address and counts its lookups
pub struct CountingSource {
    ip: IpAddr,
    calls: Arc<AtomicUsize>,
}

impl CountingSource {
    pub fn new(ip: IpAddr) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                ip,
                calls: Arc::clone(&calls),
            },
            calls,
        )
    }
}

#[async_trait]
impl Source for CountingSource {
    async fn lookup(&self, _ctx: &mut ResolveContext<'_>) -> Result<IpAddr> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.ip)
    }

    fn type_name(&self) -> &'static str {
        "counting"
    }
}

/// A source that always fails with a recoverable lookup error
pub struct FailingSource {
    calls: Arc<AtomicUsize>,
}

impl FailingSource {
    pub fn new() -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                calls: Arc::clone(&calls),
            },
            calls,
        )
    }
}

#[async_trait]
impl Source for FailingSource {
    async fn lookup(&self, _ctx: &mut ResolveContext<'_>) -> Result<IpAddr> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(Error::lookup("failing", "simulated outage"))
    }

    fn type_name(&self) -> &'static str {
        "failing"
    }
}

/// Pipeline with a single fixed-address source
pub fn fixed(name: &str, ip: IpAddr) -> Pipeline {
    let (source, _) = CountingSource::new(ip);
    Pipeline::new(name, vec![Box::new(source)], Vec::new())
}

/// Pipeline with a single reference source
pub fn reference(name: &str, target: &str) -> Pipeline {
    Pipeline::new(name, vec![Box::new(ReferenceSource::new(target))], Vec::new())
}

/// Enumerator serving a canned address list for one interface
pub struct StaticEnumerator {
    interface: String,
    addresses: Vec<InterfaceAddress>,
}

impl StaticEnumerator {
    pub fn new(interface: &str, addresses: Vec<InterfaceAddress>) -> Self {
        Self {
            interface: interface.to_string(),
            addresses,
        }
    }
}

impl AddressEnumerator for StaticEnumerator {
    fn addresses(&self, interface: &str) -> Result<Vec<InterfaceAddress>> {
        if interface != self.interface {
            return Err(Error::lookup("interface", format!("no such interface: {}", interface)));
        }
        Ok(self.addresses.clone())
    }
}

/// In-memory DNS provider keyed by (domain, type, mark)
pub struct MockDnsProvider {
    records: Arc<Mutex<HashMap<(String, String, String), Record>>>,
    write_calls: Arc<AtomicUsize>,
    failing_domains: Vec<String>,
    next_id: AtomicUsize,
}

impl MockDnsProvider {
    pub fn new() -> Self {
        Self {
            records: Arc::new(Mutex::new(HashMap::new())),
            write_calls: Arc::new(AtomicUsize::new(0)),
            failing_domains: Vec::new(),
            next_id: AtomicUsize::new(1),
        }
    }

    /// Make every write to `domain` fail
    pub fn failing_on(mut self, domain: &str) -> Self {
        self.failing_domains.push(domain.to_string());
        self
    }

    /// Seed an existing owned record
    pub fn with_record(self, domain: &str, record_type: &str, mark: &str, content: &str) -> Self {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let record = Record {
            handle: Some(RecordHandle::Cloudflare {
                id: format!("rec-{}", id),
                zone_id: "zone-1".to_string(),
            }),
            domain: domain.to_string(),
            record_type: record_type.to_string(),
            content: content.to_string(),
            mark: mark.to_string(),
        };
        self.records.lock().unwrap().insert(key(&record), record);
        self
    }

    /// Handle to the stored records, usable after the provider is boxed
    pub fn records(&self) -> Arc<Mutex<HashMap<(String, String, String), Record>>> {
        Arc::clone(&self.records)
    }

    /// Handle to the write counter, usable after the provider is boxed
    pub fn write_calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.write_calls)
    }
}

fn key(record: &Record) -> (String, String, String) {
    (
        record.domain.clone(),
        record.record_type.clone(),
        record.mark.clone(),
    )
}

#[async_trait]
impl DnsProvider for MockDnsProvider {
    async fn find_records(&self, query: &Record) -> Result<Vec<Record>> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .get(&key(query))
            .cloned()
            .into_iter()
            .collect())
    }

    async fn write_record(&self, record: &Record) -> Result<Record> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);

        if self.failing_domains.contains(&record.domain) {
            return Err(Error::provider("mock", format!("rejected {}", record.domain)));
        }

        let mut written = record.clone();
        if written.handle.is_none() {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            written.handle = Some(RecordHandle::Cloudflare {
                id: format!("rec-{}", id),
                zone_id: "zone-1".to_string(),
            });
        }
        self.records
            .lock()
            .unwrap()
            .insert(key(&written), written.clone());
        Ok(written)
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

pub fn ip(s: &str) -> IpAddr {
    s.parse().unwrap()
}
