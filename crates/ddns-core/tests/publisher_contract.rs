//! Contract Test: Publishing
//!
//! Constraints verified:
//! - Records are only written when the resolved address changed
//! - Records carry the service's ownership mark
//! - A failed write or missing address does not stop other records
//! - Conflicting owned records are refused at startup
//!
//! If this test fails, the resolver-to-DNS boundary is broken.

mod common;

use common::*;
use ddns_core::config::DomainConfig;
use ddns_core::{Error, Publisher, Resolution};
use std::sync::atomic::Ordering;

fn domain(name: &str, record_type: &str, address: &str) -> DomainConfig {
    DomainConfig {
        domain: name.to_string(),
        record_type: record_type.to_string(),
        mark: None,
        address: address.to_string(),
    }
}

fn resolution(pairs: &[(&str, &str)]) -> Resolution {
    pairs
        .iter()
        .map(|(name, addr)| (name.to_string(), ip(addr)))
        .collect()
}

#[tokio::test]
async fn unchanged_address_is_not_rewritten() {
    let provider = MockDnsProvider::new().with_record("home.example.com", "A", "ddns-home", "203.0.113.7");
    let writes = provider.write_calls();

    let mut publisher = Publisher::new(
        Box::new(provider),
        &[domain("home.example.com", "A", "wan")],
        Some("home"),
    )
    .await
    .unwrap();

    let summary = publisher.publish(&resolution(&[("wan", "203.0.113.7")])).await;
    assert_eq!(summary.unchanged, 1);
    assert_eq!(summary.updated, 0);
    assert_eq!(writes.load(Ordering::SeqCst), 0);

    let summary = publisher.publish(&resolution(&[("wan", "203.0.113.8")])).await;
    assert_eq!(summary.updated, 1);
    assert_eq!(writes.load(Ordering::SeqCst), 1);

    // The written record is remembered
    let summary = publisher.publish(&resolution(&[("wan", "203.0.113.8")])).await;
    assert_eq!(summary.unchanged, 1);
    assert_eq!(writes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn records_under_a_custom_prefix_are_adopted() {
    let provider = MockDnsProvider::new().with_record("home.example.com", "A", "cfddns-home", "203.0.113.7");
    let writes = provider.write_calls();

    let mut publisher = Publisher::with_mark_prefix(
        Box::new(provider),
        &[domain("home.example.com", "A", "wan")],
        "cfddns",
        Some("home"),
    )
    .await
    .unwrap();

    assert!(publisher.records().all(|r| r.mark == "cfddns-home" && r.handle.is_some()));

    let summary = publisher.publish(&resolution(&[("wan", "203.0.113.7")])).await;
    assert_eq!(summary.unchanged, 1);
    assert_eq!(writes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn new_records_carry_ownership_mark() {
    let provider = MockDnsProvider::new();
    let records = provider.records();

    let mut config = domain("v6.example.com", "AAAA", "wan6");
    config.mark = Some("lab".to_string());

    let mut publisher = Publisher::new(Box::new(provider), &[config], Some("home"))
        .await
        .unwrap();
    let summary = publisher.publish(&resolution(&[("wan6", "2001:db8::7")])).await;
    assert!(summary.is_complete());

    let stored = records.lock().unwrap();
    let record = stored
        .get(&(
            "v6.example.com".to_string(),
            "AAAA".to_string(),
            "ddns-home-lab".to_string(),
        ))
        .expect("record written with ownership mark");
    assert_eq!(record.content, "2001:db8::7");
    assert!(record.handle.is_some());
}

#[tokio::test]
async fn failures_do_not_block_other_records() {
    let provider = MockDnsProvider::new().failing_on("broken.example.com");
    let writes = provider.write_calls();

    let mut publisher = Publisher::new(
        Box::new(provider),
        &[
            domain("broken.example.com", "A", "wan"),
            domain("missing.example.com", "A", "nowhere"),
            domain("wrong-family.example.com", "AAAA", "wan"),
            domain("ok.example.com", "A", "wan"),
        ],
        None,
    )
    .await
    .unwrap();

    let summary = publisher.publish(&resolution(&[("wan", "198.51.100.4")])).await;

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.skipped, 2);
    assert_eq!(summary.updated, 1);
    assert_eq!(writes.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn conflicting_owned_records_are_refused() {
    struct Duplicating;

    #[async_trait::async_trait]
    impl ddns_core::DnsProvider for Duplicating {
        async fn find_records(
            &self,
            query: &ddns_core::Record,
        ) -> ddns_core::Result<Vec<ddns_core::Record>> {
            Ok(vec![query.clone(), query.clone()])
        }

        async fn write_record(
            &self,
            record: &ddns_core::Record,
        ) -> ddns_core::Result<ddns_core::Record> {
            Ok(record.clone())
        }

        fn provider_name(&self) -> &'static str {
            "duplicating"
        }
    }

    let result = Publisher::new(
        Box::new(Duplicating),
        &[domain("home.example.com", "A", "wan")],
        None,
    )
    .await;
    assert!(matches!(result, Err(Error::DnsProvider(_))));
}
