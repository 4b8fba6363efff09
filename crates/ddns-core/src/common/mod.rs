//! Shared vocabulary for sources and transformers
//!
//! - [`Family`]: IPv4 / IPv6 selector used by every source
//! - [`SelectMode`]: how the interface source picks among candidates
//! - [`FilterFlags`]: per-category overrides for interface filtering
//! - [`IpNetwork`]: include/exclude address ranges
//! - duration parsing for `timeout` / `refresh_rate` style settings

mod duration;
mod filter;

pub use ipnetwork::IpNetwork;
pub use duration::{deserialize_opt_duration, parse_duration};
pub use filter::{FilterFlags, is_eui64, is_global_unicast, is_private};

use crate::error::{Error, Result};
use serde::Deserialize;
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

/// IP address family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(try_from = "TextOrNumber")]
pub enum Family {
    /// IPv4
    #[default]
    V4,
    /// IPv6
    V6,
}

impl Family {
    /// Family of an address
    pub fn of(ip: &IpAddr) -> Self {
        match ip {
            IpAddr::V4(_) => Family::V4,
            IpAddr::V6(_) => Family::V6,
        }
    }

    /// Address length in bytes
    pub fn byte_len(self) -> usize {
        match self {
            Family::V4 => 4,
            Family::V6 => 16,
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Family::V4 => f.write_str("IPv4"),
            Family::V6 => f.write_str("IPv6"),
        }
    }
}

impl FromStr for Family {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "4" | "v4" | "ipv4" => Ok(Family::V4),
            "6" | "v6" | "ipv6" => Ok(Family::V6),
            other => Err(format!("invalid IP family: {}", other)),
        }
    }
}

/// Config values that may be written either as text or as a bare number
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum TextOrNumber {
    Text(String),
    Number(u64),
}

impl TextOrNumber {
    pub(crate) fn into_text(self) -> String {
        match self {
            TextOrNumber::Text(s) => s,
            TextOrNumber::Number(n) => n.to_string(),
        }
    }
}

impl TryFrom<TextOrNumber> for Family {
    type Error = String;

    fn try_from(value: TextOrNumber) -> std::result::Result<Self, Self::Error> {
        value.into_text().parse()
    }
}

/// Candidate selection mode for the interface source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum SelectMode {
    /// First eligible address in enumeration order
    #[default]
    First,
    /// Shortest canonical text form, ties keep enumeration order
    Shortest,
    /// Last eligible address in enumeration order
    Last,
}

impl fmt::Display for SelectMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectMode::First => f.write_str("first"),
            SelectMode::Shortest => f.write_str("shortest"),
            SelectMode::Last => f.write_str("last"),
        }
    }
}

impl FromStr for SelectMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "first" => Ok(SelectMode::First),
            "shortest" => Ok(SelectMode::Shortest),
            "last" => Ok(SelectMode::Last),
            other => Err(format!("invalid select mode: {}", other)),
        }
    }
}

impl TryFrom<String> for SelectMode {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

/// Normalize a host string, reporting whether it is an IP literal
///
/// Bracketed IPv6 literals (`[2001:db8::1]`) are unwrapped.
pub fn detect_normalize_addr(addr: &str) -> (String, bool) {
    if addr.parse::<IpAddr>().is_ok() {
        return (addr.to_string(), true);
    }

    if let Some(inner) = addr.strip_prefix('[').and_then(|a| a.strip_suffix(']'))
        && let Ok(IpAddr::V6(_)) = inner.parse::<IpAddr>()
    {
        return (inner.to_string(), true);
    }

    (addr.to_string(), false)
}

/// Parse an address literal found in a source response
///
/// Rejects zoned addresses (`fe80::1%eth0`) and addresses whose family
/// contradicts `family`. With no family restriction the address is returned
/// in canonical form (IPv4-mapped IPv6 becomes IPv4).
pub fn parse_address(
    text: &str,
    family: Option<Family>,
    source_type: &'static str,
) -> Result<IpAddr> {
    let text = text.trim();

    if let Some((_, zone)) = text.split_once('%') {
        return Err(Error::lookup(
            source_type,
            format!("unsupported: found zone '{}' in IP {}", zone, text),
        ));
    }

    let ip: IpAddr = text
        .parse()
        .map_err(|e| Error::lookup(source_type, format!("found bad IP '{}': {}", text, e)))?;

    match (family, ip) {
        (None, ip) => Ok(ip.to_canonical()),
        (Some(Family::V4), IpAddr::V4(_)) => Ok(ip),
        (Some(Family::V4), IpAddr::V6(v6)) => v6
            .to_ipv4_mapped()
            .map(IpAddr::V4)
            .ok_or_else(|| mismatch(source_type, Family::V4, &ip)),
        (Some(Family::V6), IpAddr::V6(_)) => Ok(ip),
        (Some(Family::V6), IpAddr::V4(_)) => Err(mismatch(source_type, Family::V6, &ip)),
    }
}

fn mismatch(source_type: &'static str, expected: Family, ip: &IpAddr) -> Error {
    Error::lookup(
        source_type,
        format!("mismatched IP family: expected {}, got {}", expected, ip),
    )
}
