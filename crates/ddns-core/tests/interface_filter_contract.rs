//! Contract Test: Interface Filtering
//!
//! Constraints verified:
//! - With default settings only clean global-unicast addresses are eligible
//! - Each filter override re-admits exactly its own category
//! - Unknown interfaces surface as recoverable lookup failures
//!
//! If this test fails, interface address selection is broken.

mod common;

use common::*;
use ddns_core::common::{Family, FilterFlags};
use ddns_core::sources::{AddrFlags, InterfaceAddress, InterfaceOptions, InterfaceSource};
use std::net::IpAddr;
use std::sync::Arc;

fn flagged(addr: &str, flags: AddrFlags) -> InterfaceAddress {
    InterfaceAddress::new(ip(addr)).with_flags(flags)
}

/// One candidate per excluded category, followed by the clean address
fn v6_candidates() -> Vec<InterfaceAddress> {
    vec![
        InterfaceAddress::new(ip("fe80::1234")),
        InterfaceAddress::new(ip("fd00::1234")),
        InterfaceAddress::new(ip("2001:db8::211:22ff:fe33:4455")),
        flagged(
            "2001:db8::aaaa",
            AddrFlags {
                temporary: true,
                ..Default::default()
            },
        ),
        flagged(
            "2001:db8::bbbb",
            AddrFlags {
                tentative: true,
                ..Default::default()
            },
        ),
        flagged(
            "2001:db8::cccc",
            AddrFlags {
                deprecated: true,
                ..Default::default()
            },
        ),
        InterfaceAddress::new(ip("2001:db8::100")),
    ]
}

fn v6_source(flags: FilterFlags) -> InterfaceSource {
    let options = InterfaceOptions {
        family: Family::V6,
        flags,
        ..Default::default()
    };
    InterfaceSource::new(
        "eth0",
        options,
        Arc::new(StaticEnumerator::new("eth0", Vec::new())),
    )
}

#[test]
fn default_filtering_selects_only_clean_address() {
    let chosen = v6_source(FilterFlags::NONE).select(&v6_candidates()).unwrap();
    assert_eq!(chosen, ip("2001:db8::100"));
}

#[test]
fn each_override_readmits_its_category() {
    let cases: [(FilterFlags, &str); 6] = [
        (FilterFlags::ALLOW_NON_GLOBAL_UNICAST, "fe80::1234"),
        (FilterFlags::ALLOW_PRIVATE, "fd00::1234"),
        (FilterFlags::ALLOW_EUI64, "2001:db8::211:22ff:fe33:4455"),
        (FilterFlags::ALLOW_TEMPORARY, "2001:db8::aaaa"),
        (FilterFlags::ALLOW_BAD_DAD, "2001:db8::bbbb"),
        (FilterFlags::ALLOW_DEPRECATED, "2001:db8::cccc"),
    ];

    for (flag, readmitted) in cases {
        let chosen = v6_source(flag).select(&v6_candidates()).unwrap();
        assert_eq!(chosen, ip(readmitted), "override {} should re-admit {}", flag, readmitted);
    }
}

#[test]
fn duplicated_addresses_count_as_bad_dad() {
    let candidates = vec![
        flagged(
            "2001:db8::dddd",
            AddrFlags {
                duplicated: true,
                ..Default::default()
            },
        ),
        InterfaceAddress::new(ip("2001:db8::100")),
    ];

    let chosen = v6_source(FilterFlags::NONE).select(&candidates).unwrap();
    assert_eq!(chosen, ip("2001:db8::100"));

    let chosen = v6_source(FilterFlags::ALLOW_BAD_DAD).select(&candidates).unwrap();
    assert_eq!(chosen, ip("2001:db8::dddd"));
}

#[test]
fn v4_filtering_ignores_other_family_and_private_ranges() {
    let source = InterfaceSource::new(
        "eth0",
        InterfaceOptions::default(),
        Arc::new(StaticEnumerator::new("eth0", Vec::new())),
    );
    let candidates = vec![
        InterfaceAddress::new(ip("2001:db8::100")),
        InterfaceAddress::new(ip("127.0.0.1")),
        InterfaceAddress::new(ip("10.1.2.3")),
        InterfaceAddress::new(ip("169.254.0.9")),
        InterfaceAddress::new(ip("198.51.100.4")),
    ];

    let chosen: IpAddr = source.select(&candidates).unwrap();
    assert_eq!(chosen, ip("198.51.100.4"));
}

#[tokio::test]
async fn unknown_interface_is_recoverable() {
    use ddns_core::resolver::{Pipeline, Resolver};

    let enumerator = Arc::new(StaticEnumerator::new(
        "eth0",
        vec![InterfaceAddress::new(ip("198.51.100.4"))],
    ));
    let missing = InterfaceSource::new("wlan9", InterfaceOptions::default(), enumerator.clone());
    let present = InterfaceSource::new("eth0", InterfaceOptions::default(), enumerator);

    let resolver = Resolver::from_pipelines(vec![Pipeline::new(
        "wan",
        vec![Box::new(missing), Box::new(present)],
        Vec::new(),
    )])
    .unwrap();

    let result = resolver.resolve().await.unwrap();
    assert_eq!(result["wan"], ip("198.51.100.4"));
}
