//! Link, IP and TCP header extraction.
//!
//! Only what reassembly needs is kept: endpoints, sequence numbers, flags
//! and the TCP payload. Anything that is not TCP over IPv4/IPv6 is skipped.

use std::net::IpAddr;

use bytes::Bytes;
use etherparse::{Ethernet2HeaderSlice, Ipv4HeaderSlice, Ipv6HeaderSlice, TcpHeaderSlice};
use tracing::trace;

use super::{Endpoint, TcpFlags};

/// Link-layer header types understood by [`decode_frame`].
pub mod link_type {
    pub const NULL: u16 = 0;
    pub const ETHERNET: u16 = 1;
    pub const RAW_OPENBSD: u16 = 12;
    pub const RAW: u16 = 101;
    pub const LINUX_SLL: u16 = 113;
    pub const IPV4: u16 = 228;
    pub const IPV6: u16 = 229;
}

mod ethertype {
    pub const IPV4: u16 = 0x0800;
    pub const IPV6: u16 = 0x86dd;
    pub const VLAN: u16 = 0x8100;
    pub const QINQ: u16 = 0x88a8;
}

const IP_PROTO_TCP: u8 = 6;
const SLL_HEADER_LEN: usize = 16;
const VLAN_TAG_LEN: usize = 4;

/// The parts of a TCP segment that reassembly needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcpSegment {
    pub src: Endpoint,
    pub dst: Endpoint,
    pub seq: u32,
    pub ack: u32,
    pub flags: TcpFlags,
    pub payload: Bytes,
}

/// Extract the TCP segment carried by a captured frame.
///
/// Returns `None` for non-TCP traffic, IP fragments and truncated headers.
pub fn decode_frame(link_type: u16, data: &Bytes) -> Option<TcpSegment> {
    let (ip_offset, ethertype) = match link_type {
        link_type::ETHERNET => ethernet_payload(data)?,
        link_type::LINUX_SLL => {
            let protocol = data.get(14..SLL_HEADER_LEN)?;
            (SLL_HEADER_LEN, u16::from_be_bytes([protocol[0], protocol[1]]))
        }
        link_type::NULL => {
            let family = data.get(..4)?;
            // Host byte order of the capturing machine; AF_INET is 2 everywhere
            let family = u32::from_le_bytes([family[0], family[1], family[2], family[3]])
                .min(u32::from_be_bytes([family[0], family[1], family[2], family[3]]));
            let ethertype = if family == 2 {
                ethertype::IPV4
            } else {
                ethertype::IPV6
            };
            (4, ethertype)
        }
        link_type::RAW | link_type::RAW_OPENBSD => (0, version_ethertype(data.first()?)?),
        link_type::IPV4 => (0, ethertype::IPV4),
        link_type::IPV6 => (0, ethertype::IPV6),
        other => {
            trace!(link_type = other, "unsupported link type");
            return None;
        }
    };

    let ip = data.slice(ip_offset..);
    match ethertype {
        ethertype::IPV4 => decode_ipv4(&ip),
        ethertype::IPV6 => decode_ipv6(&ip),
        _ => None,
    }
}

fn version_ethertype(first: &u8) -> Option<u16> {
    match first >> 4 {
        4 => Some(ethertype::IPV4),
        6 => Some(ethertype::IPV6),
        _ => None,
    }
}

/// Offset and ethertype of the Ethernet payload, looking through VLAN tags.
fn ethernet_payload(data: &[u8]) -> Option<(usize, u16)> {
    let eth = Ethernet2HeaderSlice::from_slice(data).ok()?;
    let mut offset = eth.slice().len();
    let mut ethertype = eth.ether_type().0;

    while ethertype == ethertype::VLAN || ethertype == ethertype::QINQ {
        let tag = data.get(offset..offset + VLAN_TAG_LEN)?;
        ethertype = u16::from_be_bytes([tag[2], tag[3]]);
        offset += VLAN_TAG_LEN;
    }
    Some((offset, ethertype))
}

fn decode_ipv4(data: &Bytes) -> Option<TcpSegment> {
    let ip = Ipv4HeaderSlice::from_slice(data).ok()?;
    if ip.protocol().0 != IP_PROTO_TCP {
        return None;
    }
    if ip.more_fragments() || ip.fragments_offset().value() != 0 {
        trace!("skipping IPv4 fragment");
        return None;
    }

    // Total length excludes any Ethernet padding
    let end = usize::from(ip.total_len()).min(data.len());
    let start = ip.slice().len();
    if start > end {
        return None;
    }
    decode_tcp(
        IpAddr::V4(ip.source_addr()),
        IpAddr::V4(ip.destination_addr()),
        data.slice(start..end),
    )
}

fn decode_ipv6(data: &Bytes) -> Option<TcpSegment> {
    let ip = Ipv6HeaderSlice::from_slice(data).ok()?;
    if ip.next_header().0 != IP_PROTO_TCP {
        return None;
    }

    let start = ip.slice().len();
    let end = (start + usize::from(ip.payload_length())).min(data.len());
    decode_tcp(
        IpAddr::V6(ip.source_addr()),
        IpAddr::V6(ip.destination_addr()),
        data.slice(start..end),
    )
}

fn decode_tcp(src_ip: IpAddr, dst_ip: IpAddr, data: Bytes) -> Option<TcpSegment> {
    let tcp = TcpHeaderSlice::from_slice(&data).ok()?;
    let header_len = tcp.slice().len();

    Some(TcpSegment {
        src: Endpoint::new(src_ip, tcp.source_port()),
        dst: Endpoint::new(dst_ip, tcp.destination_port()),
        seq: tcp.sequence_number(),
        ack: tcp.acknowledgment_number(),
        flags: TcpFlags {
            syn: tcp.syn(),
            ack: tcp.ack(),
            fin: tcp.fin(),
            rst: tcp.rst(),
        },
        payload: data.slice(header_len..),
    })
}
