// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Ethernet frame parsing for packet-in payloads.
//!
//! # Layout
//!
//! ```text
//! +----------+----------+-------------------+-----------+-----------------+
//! | dst (6)  | src (6)  | [0x8100 tci] (4)  | type (2)  | payload ...     |
//! +----------+----------+-------------------+-----------+-----------------+
//! ```
//!
//! Only the headers a flow match needs are extracted: the Ethernet header (with an
//! optional single 802.1Q tag), ARP opcode and protocol addresses, and for IPv4 the
//! addresses, protocol, ToS and TCP/UDP ports (ICMP type/code in the port slots).

use crate::types::{DatapathId, MacAddr, PortNo};
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use thiserror::Error;

pub const ETH_TYPE_IPV4: u16 = 0x0800;
pub const ETH_TYPE_ARP: u16 = 0x0806;
pub const ETH_TYPE_VLAN: u16 = 0x8100;
pub const ETH_TYPE_IPV6: u16 = 0x86dd;
pub const ETH_TYPE_LLDP: u16 = 0x88cc;

pub const IP_PROTO_ICMP: u8 = 1;
pub const IP_PROTO_TCP: u8 = 6;
pub const IP_PROTO_UDP: u8 = 17;

const ETH_HEADER_LEN: usize = 14;
const VLAN_TAG_LEN: usize = 4;
const ARP_IPV4_LEN: usize = 28;
const IPV4_MIN_HEADER_LEN: usize = 20;

/// Frame parse errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("truncated {layer} header: need {need} bytes, have {have}")]
    Truncated {
        layer: &'static str,
        need: usize,
        have: usize,
    },

    #[error("invalid IPv4 header: {0}")]
    InvalidIpv4(String),

    #[error("unsupported ARP hardware/protocol combination ({htype:#06x}/{ptype:#06x})")]
    UnsupportedArp { htype: u16, ptype: u16 },
}

/// Protocol carried by a frame, as far as forwarding cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PacketKind {
    Arp,
    Lldp,
    Ipv6,
    Ipv4,
    Other(u16),
}

impl PacketKind {
    fn from_ethertype(ethertype: u16) -> Self {
        match ethertype {
            ETH_TYPE_ARP => Self::Arp,
            ETH_TYPE_LLDP => Self::Lldp,
            ETH_TYPE_IPV6 => Self::Ipv6,
            ETH_TYPE_IPV4 => Self::Ipv4,
            other => Self::Other(other),
        }
    }
}

/// Network-layer fields usable in a flow match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NetworkFields {
    pub src: Option<Ipv4Addr>,
    pub dst: Option<Ipv4Addr>,
    /// IP protocol number, or the ARP opcode for ARP frames.
    pub proto: Option<u8>,
    pub tos: Option<u8>,
    /// L4 source port (ICMP type).
    pub tp_src: Option<u16>,
    /// L4 destination port (ICMP code).
    pub tp_dst: Option<u16>,
}

/// Parsed view of a packet-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketDescriptor {
    pub dpid: DatapathId,
    pub in_port: PortNo,
    pub src: MacAddr,
    pub dst: MacAddr,
    pub ethertype: u16,
    pub vlan: Option<u16>,
    pub kind: PacketKind,
    pub network: NetworkFields,
    /// Original frame bytes, forwarded untouched in packet-outs.
    pub data: Vec<u8>,
}

impl PacketDescriptor {
    /// Parse a raw frame received on `in_port` of `dpid`.
    pub fn parse(dpid: DatapathId, in_port: PortNo, data: Vec<u8>) -> Result<Self, FrameError> {
        ensure_len("ethernet", &data, ETH_HEADER_LEN)?;

        let dst = mac_at(&data, 0);
        let src = mac_at(&data, 6);
        let mut ethertype = be16(&data, 12);
        let mut offset = ETH_HEADER_LEN;
        let mut vlan = None;

        if ethertype == ETH_TYPE_VLAN {
            ensure_len("802.1Q", &data, ETH_HEADER_LEN + VLAN_TAG_LEN)?;
            vlan = Some(be16(&data, 14) & 0x0fff);
            ethertype = be16(&data, 16);
            offset += VLAN_TAG_LEN;
        }

        let kind = PacketKind::from_ethertype(ethertype);
        let network = match kind {
            PacketKind::Arp => parse_arp(&data[offset..])?,
            PacketKind::Ipv4 => parse_ipv4(&data[offset..])?,
            _ => NetworkFields::default(),
        };

        Ok(Self {
            dpid,
            in_port,
            src,
            dst,
            ethertype,
            vlan,
            kind,
            network,
            data,
        })
    }
}

fn ensure_len(layer: &'static str, buf: &[u8], need: usize) -> Result<(), FrameError> {
    if buf.len() < need {
        return Err(FrameError::Truncated {
            layer,
            need,
            have: buf.len(),
        });
    }
    Ok(())
}

fn be16(buf: &[u8], at: usize) -> u16 {
    u16::from_be_bytes([buf[at], buf[at + 1]])
}

fn mac_at(buf: &[u8], at: usize) -> MacAddr {
    let mut octets = [0u8; 6];
    octets.copy_from_slice(&buf[at..at + 6]);
    MacAddr(octets)
}

fn ipv4_at(buf: &[u8], at: usize) -> Ipv4Addr {
    Ipv4Addr::new(buf[at], buf[at + 1], buf[at + 2], buf[at + 3])
}

fn parse_arp(buf: &[u8]) -> Result<NetworkFields, FrameError> {
    ensure_len("arp", buf, ARP_IPV4_LEN)?;

    let htype = be16(buf, 0);
    let ptype = be16(buf, 2);
    if htype != 1 || ptype != ETH_TYPE_IPV4 || buf[4] != 6 || buf[5] != 4 {
        return Err(FrameError::UnsupportedArp { htype, ptype });
    }

    let opcode = be16(buf, 6);
    Ok(NetworkFields {
        src: Some(ipv4_at(buf, 14)),
        dst: Some(ipv4_at(buf, 24)),
        // OpenFlow 1.0 matches the low byte of the opcode in nw_proto
        proto: Some(opcode as u8),
        ..Default::default()
    })
}

fn parse_ipv4(buf: &[u8]) -> Result<NetworkFields, FrameError> {
    ensure_len("ipv4", buf, IPV4_MIN_HEADER_LEN)?;

    let version = buf[0] >> 4;
    if version != 4 {
        return Err(FrameError::InvalidIpv4(format!("version {}", version)));
    }
    let ihl = usize::from(buf[0] & 0x0f) * 4;
    if ihl < IPV4_MIN_HEADER_LEN {
        return Err(FrameError::InvalidIpv4(format!("header length {}", ihl)));
    }
    ensure_len("ipv4", buf, ihl)?;

    let proto = buf[9];
    let mut fields = NetworkFields {
        src: Some(ipv4_at(buf, 12)),
        dst: Some(ipv4_at(buf, 16)),
        proto: Some(proto),
        tos: Some(buf[1] & 0xfc),
        ..Default::default()
    };

    // Later fragments carry no L4 header.
    let fragment_offset = be16(buf, 6) & 0x1fff;
    if fragment_offset != 0 {
        return Ok(fields);
    }

    let l4 = &buf[ihl..];
    match proto {
        IP_PROTO_TCP | IP_PROTO_UDP if l4.len() >= 4 => {
            fields.tp_src = Some(be16(l4, 0));
            fields.tp_dst = Some(be16(l4, 2));
        }
        IP_PROTO_ICMP if l4.len() >= 2 => {
            fields.tp_src = Some(u16::from(l4[0]));
            fields.tp_dst = Some(u16::from(l4[1]));
        }
        _ => {}
    }

    Ok(fields)
}

/// Builder for well-formed frames, used by fixtures and the fabric simulation.
#[derive(Debug, Clone)]
pub struct FrameBuilder {
    dst: MacAddr,
    src: MacAddr,
    vlan: Option<u16>,
    ethertype: u16,
    payload: Vec<u8>,
}

impl FrameBuilder {
    /// Start a frame with an empty payload of the given EtherType.
    pub fn new(src: MacAddr, dst: MacAddr, ethertype: u16) -> Self {
        Self {
            dst,
            src,
            vlan: None,
            ethertype,
            payload: Vec::new(),
        }
    }

    /// ARP request `sender_ip` asking for `target_ip`.
    pub fn arp_request(src: MacAddr, sender_ip: Ipv4Addr, target_ip: Ipv4Addr) -> Self {
        let mut payload = Vec::with_capacity(ARP_IPV4_LEN);
        payload.extend_from_slice(&1u16.to_be_bytes());
        payload.extend_from_slice(&ETH_TYPE_IPV4.to_be_bytes());
        payload.extend_from_slice(&[6, 4]);
        payload.extend_from_slice(&1u16.to_be_bytes());
        payload.extend_from_slice(&src.octets());
        payload.extend_from_slice(&sender_ip.octets());
        payload.extend_from_slice(&[0u8; 6]);
        payload.extend_from_slice(&target_ip.octets());

        Self::new(src, MacAddr::BROADCAST, ETH_TYPE_ARP).payload(payload)
    }

    /// UDP datagram inside an IPv4 packet.
    pub fn udp(
        src: MacAddr,
        dst: MacAddr,
        src_ip: Ipv4Addr,
        dst_ip: Ipv4Addr,
        src_port: u16,
        dst_port: u16,
    ) -> Self {
        let mut ip = vec![0u8; IPV4_MIN_HEADER_LEN];
        ip[0] = 0x45;
        let total_len = (IPV4_MIN_HEADER_LEN + 8) as u16;
        ip[2..4].copy_from_slice(&total_len.to_be_bytes());
        ip[8] = 64;
        ip[9] = IP_PROTO_UDP;
        ip[12..16].copy_from_slice(&src_ip.octets());
        ip[16..20].copy_from_slice(&dst_ip.octets());
        ip.extend_from_slice(&src_port.to_be_bytes());
        ip.extend_from_slice(&dst_port.to_be_bytes());
        ip.extend_from_slice(&8u16.to_be_bytes());
        ip.extend_from_slice(&[0, 0]);

        Self::new(src, dst, ETH_TYPE_IPV4).payload(ip)
    }

    /// Add an 802.1Q tag.
    pub fn vlan(mut self, vid: u16) -> Self {
        self.vlan = Some(vid & 0x0fff);
        self
    }

    /// Replace the payload.
    pub fn payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = payload;
        self
    }

    /// Serialize to wire bytes.
    pub fn build(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(ETH_HEADER_LEN + VLAN_TAG_LEN + self.payload.len());
        out.extend_from_slice(&self.dst.octets());
        out.extend_from_slice(&self.src.octets());
        if let Some(vid) = self.vlan {
            out.extend_from_slice(&ETH_TYPE_VLAN.to_be_bytes());
            out.extend_from_slice(&vid.to_be_bytes());
        }
        out.extend_from_slice(&self.ethertype.to_be_bytes());
        out.extend_from_slice(&self.payload);
        out
    }
}
