//! Built-in source variants
//!
//! - [`ReferenceSource`]: reuse another named address
//! - [`InterfaceSource`]: pick an address bound to a local interface
//!
//! HTTP-based sources live in `ddns-ip-http`; the platform enumerator that
//! feeds [`InterfaceSource`] lives in `ddns-ip-netlink`.

pub mod interface;
pub mod reference;

pub use interface::{
    AddrFlags, AddressEnumerator, InterfaceAddress, InterfaceFactory, InterfaceOptions,
    InterfaceSource,
};
pub use reference::{ReferenceFactory, ReferenceSource};
