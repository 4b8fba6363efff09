// # Netlink Interface Addresses
//
// This crate feeds the core `interface` source with the addresses bound to a
// network interface, read from the kernel over rtnetlink.
//
// ## Implementation
//
// 1. Resolve the interface name to its index (`if_nametoindex`)
// 2. Send an `RTM_GETADDR` dump request on a `NETLINK_ROUTE` socket
// 3. Parse the replies with `netlink-packet-route`, keeping the addresses
//    whose header index matches
// 4. Translate `IFA_F_*` flags (from `IFA_FLAGS` when present, otherwise
//    the 8-bit header field) into `AddrFlags`
//
// Filtering and selection are done by the core source.
//
// ## Platform Support
//
// Netlink is Linux-only. On other platforms the enumerator reports every
// lookup as failed, so pipelines fall through to their other sources.

use ddns_core::Registry;
use ddns_core::sources::{AddressEnumerator, InterfaceAddress, InterfaceFactory};
use std::sync::Arc;

#[cfg(target_os = "linux")]
use ddns_core::sources::AddrFlags;
#[cfg(target_os = "linux")]
use ddns_core::{Error, Result};
#[cfg(target_os = "linux")]
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

#[cfg(target_os = "linux")]
use netlink_packet_core::{
    NLM_F_DUMP, NLM_F_REQUEST, NetlinkHeader, NetlinkMessage, NetlinkPayload,
};
#[cfg(target_os = "linux")]
use netlink_packet_route::address::nlas::Nla;
#[cfg(target_os = "linux")]
use netlink_packet_route::{AddressMessage, RtnlMessage};
#[cfg(target_os = "linux")]
use netlink_sys::{Socket, SocketAddr, protocols::NETLINK_ROUTE};
#[cfg(target_os = "linux")]
use tracing::{debug, warn};

const SOURCE_TYPE: &str = "interface";

// linux/if_addr.h
#[cfg(target_os = "linux")]
const IFA_F_TEMPORARY: u32 = 0x01;
#[cfg(target_os = "linux")]
const IFA_F_DADFAILED: u32 = 0x08;
#[cfg(target_os = "linux")]
const IFA_F_DEPRECATED: u32 = 0x20;
#[cfg(target_os = "linux")]
const IFA_F_TENTATIVE: u32 = 0x40;

/// Interface address table read over rtnetlink
#[derive(Debug, Clone, Copy, Default)]
pub struct NetlinkAddressTable;

#[cfg(target_os = "linux")]
impl AddressEnumerator for NetlinkAddressTable {
    fn addresses(&self, interface: &str) -> Result<Vec<InterfaceAddress>> {
        let index = interface_index(interface)?;

        let addresses: Vec<InterfaceAddress> = dump_addresses()?
            .iter()
            .filter(|message| message.header.index == index)
            .filter_map(to_interface_address)
            .collect();

        debug!(interface, index, count = addresses.len(), "read interface addresses");
        Ok(addresses)
    }
}

#[cfg(not(target_os = "linux"))]
impl AddressEnumerator for NetlinkAddressTable {
    fn addresses(&self, interface: &str) -> ddns_core::Result<Vec<InterfaceAddress>> {
        Err(ddns_core::Error::lookup(
            SOURCE_TYPE,
            format!(
                "cannot read addresses of {}: interface lookup is only supported on Linux",
                interface
            ),
        ))
    }
}

/// Register the `interface` source backed by netlink with a registry
pub fn register(registry: &mut Registry) {
    registry.register_source(
        SOURCE_TYPE,
        Box::new(InterfaceFactory::new(Arc::new(NetlinkAddressTable))),
    );
}

#[cfg(target_os = "linux")]
fn interface_index(interface: &str) -> Result<u32> {
    let name = std::ffi::CString::new(interface)
        .map_err(|_| Error::lookup(SOURCE_TYPE, format!("invalid interface name: {:?}", interface)))?;

    // SAFETY: `name` is a valid NUL-terminated string for the whole call
    let index = unsafe { libc::if_nametoindex(name.as_ptr()) };
    if index == 0 {
        return Err(Error::lookup(
            SOURCE_TYPE,
            format!(
                "no such interface {}: {}",
                interface,
                std::io::Error::last_os_error()
            ),
        ));
    }

    Ok(index)
}

#[cfg(target_os = "linux")]
fn dump_addresses() -> Result<Vec<AddressMessage>> {
    let netlink_err =
        |what: &str, e: std::io::Error| Error::lookup(SOURCE_TYPE, format!("netlink {} failed: {}", what, e));

    let mut socket = Socket::new(NETLINK_ROUTE).map_err(|e| netlink_err("socket", e))?;
    socket.bind_auto().map_err(|e| netlink_err("bind", e))?;
    socket
        .connect(&SocketAddr::new(0, 0))
        .map_err(|e| netlink_err("connect", e))?;

    let mut header = NetlinkHeader::default();
    header.flags = NLM_F_REQUEST | NLM_F_DUMP;
    header.sequence_number = 1;

    let mut request = NetlinkMessage::new(
        header,
        NetlinkPayload::InnerMessage(RtnlMessage::GetAddress(AddressMessage::default())),
    );
    request.finalize();

    let mut buf = vec![0u8; request.header.length as usize];
    request.serialize(&mut buf[..]);
    socket.send(&buf[..], 0).map_err(|e| netlink_err("send", e))?;

    let mut messages = Vec::new();

    loop {
        let (datagram, _) = socket
            .recv_from_full()
            .map_err(|e| netlink_err("receive", e))?;
        if datagram.is_empty() {
            return Err(Error::lookup(SOURCE_TYPE, "netlink socket closed during dump"));
        }

        let mut offset = 0;
        while offset < datagram.len() {
            let reply = NetlinkMessage::<RtnlMessage>::deserialize(&datagram[offset..])
                .map_err(|e| Error::lookup(SOURCE_TYPE, format!("bad netlink reply: {:?}", e)))?;

            let length = reply.header.length as usize;
            match reply.payload {
                NetlinkPayload::Done(_) => return Ok(messages),
                NetlinkPayload::Error(e) => {
                    warn!(error = ?e, "netlink dump refused");
                    return Err(Error::lookup(
                        SOURCE_TYPE,
                        format!("netlink dump refused: {:?}", e),
                    ));
                }
                NetlinkPayload::InnerMessage(RtnlMessage::NewAddress(message)) => {
                    messages.push(message);
                }
                _ => {}
            }

            if length == 0 {
                break;
            }
            offset += length;
        }
    }
}

#[cfg(target_os = "linux")]
fn to_interface_address(message: &AddressMessage) -> Option<InterfaceAddress> {
    let mut address = None;
    let mut local = None;
    let mut flags = u32::from(message.header.flags);

    for nla in &message.nlas {
        match nla {
            Nla::Address(bytes) => address = Some(bytes.as_slice()),
            Nla::Local(bytes) => local = Some(bytes.as_slice()),
            Nla::Flags(extended) => flags = *extended,
            _ => {}
        }
    }

    // IFA_LOCAL is the interface's own address on point-to-point links,
    // where IFA_ADDRESS holds the peer
    let ip = parse_bytes(local.or(address)?)?;

    Some(InterfaceAddress::new(ip).with_flags(AddrFlags {
        temporary: flags & IFA_F_TEMPORARY != 0,
        tentative: flags & IFA_F_TENTATIVE != 0,
        duplicated: flags & IFA_F_DADFAILED != 0,
        deprecated: flags & IFA_F_DEPRECATED != 0,
    }))
}

#[cfg(target_os = "linux")]
fn parse_bytes(bytes: &[u8]) -> Option<IpAddr> {
    if let Ok(octets) = <[u8; 4]>::try_from(bytes) {
        return Some(IpAddr::V4(Ipv4Addr::from(octets)));
    }
    if let Ok(octets) = <[u8; 16]>::try_from(bytes) {
        return Some(IpAddr::V6(Ipv6Addr::from(octets)));
    }
    None
}
