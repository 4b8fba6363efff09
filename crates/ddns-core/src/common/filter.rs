use serde::Deserialize;
use std::fmt;
use std::net::IpAddr;
use std::ops::{BitOr, BitOrAssign};
use std::str::FromStr;

/// Exclusion overrides for the interface source
///
/// Every category below is discarded by default; setting the flag makes
/// the category eligible again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(try_from = "Vec<String>")]
pub struct FilterFlags(u8);

impl FilterFlags {
    /// No overrides: default filtering
    pub const NONE: FilterFlags = FilterFlags(0);
    /// Keep loopback, link-local, multicast and unspecified addresses
    pub const ALLOW_NON_GLOBAL_UNICAST: FilterFlags = FilterFlags(1 << 0);
    /// Keep RFC 1918 / unique-local addresses
    pub const ALLOW_PRIVATE: FilterFlags = FilterFlags(1 << 1);
    /// Keep IPv6 addresses with an EUI-64 derived interface identifier
    pub const ALLOW_EUI64: FilterFlags = FilterFlags(1 << 2);
    /// Keep temporary (privacy extension) addresses
    pub const ALLOW_TEMPORARY: FilterFlags = FilterFlags(1 << 3);
    /// Keep tentative and duplicated addresses
    pub const ALLOW_BAD_DAD: FilterFlags = FilterFlags(1 << 4);
    /// Keep deprecated addresses
    pub const ALLOW_DEPRECATED: FilterFlags = FilterFlags(1 << 5);

    const NAMES: [(FilterFlags, &'static str); 6] = [
        (Self::ALLOW_NON_GLOBAL_UNICAST, "allow-non-global-unicast"),
        (Self::ALLOW_PRIVATE, "allow-private"),
        (Self::ALLOW_EUI64, "allow-eui64"),
        (Self::ALLOW_TEMPORARY, "allow-temporary"),
        (Self::ALLOW_BAD_DAD, "allow-bad-dad"),
        (Self::ALLOW_DEPRECATED, "allow-deprecated"),
    ];

    /// Whether all bits of `other` are set
    pub fn contains(self, other: FilterFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Raw bit value
    pub fn bits(self) -> u8 {
        self.0
    }
}

impl BitOr for FilterFlags {
    type Output = FilterFlags;

    fn bitor(self, rhs: FilterFlags) -> FilterFlags {
        FilterFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for FilterFlags {
    fn bitor_assign(&mut self, rhs: FilterFlags) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for FilterFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = Self::NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();

        if names.is_empty() {
            write!(f, "{:x}", self.0)
        } else {
            write!(f, "{:x}({})", self.0, names.join(","))
        }
    }
}

impl FromStr for FilterFlags {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let flag = match s.to_ascii_lowercase().as_str() {
            "nonglobalunicast" | "non-global-unicast" | "allow-non-global-unicast" => {
                Self::ALLOW_NON_GLOBAL_UNICAST
            }
            "private" | "allow-private" => Self::ALLOW_PRIVATE,
            "eui64" | "alloweui64" | "allow-eui64" => Self::ALLOW_EUI64,
            "temporary" | "allowtemporary" | "allow-temporary" => Self::ALLOW_TEMPORARY,
            "baddad" | "allowbaddad" | "bad-dad" | "allow-bad-dad" => Self::ALLOW_BAD_DAD,
            "deprecated" | "allowdeprecated" | "allow-deprecated" => Self::ALLOW_DEPRECATED,
            // EUI-64 exclusion is already the default
            "noeui64" | "no-eui64" | "excludeeui64" | "exclude-eui64" => Self::NONE,
            other => return Err(format!("invalid filter flag: {}", other)),
        };
        Ok(flag)
    }
}

impl TryFrom<Vec<String>> for FilterFlags {
    type Error = String;

    fn try_from(names: Vec<String>) -> Result<Self, Self::Error> {
        let mut flags = FilterFlags::NONE;
        for name in &names {
            flags |= name.parse::<FilterFlags>()?;
        }
        Ok(flags)
    }
}

/// Global unicast in the sense used for DNS publishing
///
/// Everything except unspecified, loopback, multicast, link-local unicast
/// and the IPv4 limited broadcast address. Private ranges count as global
/// unicast here; they are filtered separately by [`is_private`].
pub fn is_global_unicast(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            !(v4.is_unspecified()
                || v4.is_loopback()
                || v4.is_multicast()
                || v4.is_link_local()
                || v4.is_broadcast())
        }
        IpAddr::V6(v6) => {
            !(v6.is_unspecified()
                || v6.is_loopback()
                || v6.is_multicast()
                || v6.is_unicast_link_local())
        }
    }
}

/// RFC 1918 (IPv4) and RFC 4193 unique-local (IPv6) ranges
pub fn is_private(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_private(),
        IpAddr::V6(v6) => v6.is_unique_local(),
    }
}

/// IPv6 address whose interface identifier carries the EUI-64 `ff:fe` marker
pub fn is_eui64(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(_) => false,
        IpAddr::V6(v6) => {
            let octets = v6.octets();
            octets[11] == 0xff && octets[12] == 0xfe
        }
    }
}
