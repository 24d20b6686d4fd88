// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Flow rule descriptors and the installation policy.
//!
//! Two kinds of rules are ever installed:
//!
//! - the permanent table-miss rule (wildcard match, output to controller,
//!   priority 0, no timeouts), once per switch after connection-up;
//! - an exact-match unicast rule for every packet whose destination is known.
//!
//! Floods never install anything, so they recur per packet until the destination
//! has been learned.

use crate::forwarding::Decision;
use crate::packet::PacketDescriptor;
use crate::types::{MacAddr, PortNo, OFPP_CONTROLLER, OFPP_FLOOD};
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::time::Duration;

/// Priority used for learned unicast rules (OpenFlow `OFP_DEFAULT_PRIORITY`).
pub const DEFAULT_PRIORITY: u16 = 0x8000;

/// Priority of the table-miss rule; evaluated after everything else.
pub const TABLE_MISS_PRIORITY: u16 = 0;

pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_HARD_TIMEOUT: Duration = Duration::from_secs(30);

/// Output action of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Port(PortNo),
    Flood,
    Controller,
}

impl Action {
    /// OpenFlow port number for the action.
    pub fn port_no(&self) -> PortNo {
        match self {
            Self::Port(p) => *p,
            Self::Flood => OFPP_FLOOD,
            Self::Controller => OFPP_CONTROLLER,
        }
    }
}

/// OpenFlow 1.0 style match; `None` fields are wildcarded.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FlowMatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_port: Option<PortNo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dl_src: Option<MacAddr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dl_dst: Option<MacAddr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dl_vlan: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dl_type: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nw_src: Option<Ipv4Addr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nw_dst: Option<Ipv4Addr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nw_proto: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nw_tos: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tp_src: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tp_dst: Option<u16>,
}

impl FlowMatch {
    /// Match everything.
    pub fn wildcard_all() -> Self {
        Self::default()
    }

    /// Exact match on every field the packet carries, at `in_port`.
    pub fn from_packet(packet: &PacketDescriptor, in_port: PortNo) -> Self {
        let net = &packet.network;
        Self {
            in_port: Some(in_port),
            dl_src: Some(packet.src),
            dl_dst: Some(packet.dst),
            dl_vlan: packet.vlan,
            dl_type: Some(packet.ethertype),
            nw_src: net.src,
            nw_dst: net.dst,
            nw_proto: net.proto,
            nw_tos: net.tos,
            tp_src: net.tp_src,
            tp_dst: net.tp_dst,
        }
    }

    pub fn is_wildcard_all(&self) -> bool {
        *self == Self::default()
    }
}

/// A rule to be installed in a switch flow table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowRule {
    #[serde(rename = "match")]
    pub matches: FlowMatch,
    pub output: Action,
    pub priority: u16,
    /// `None` means the rule never idles out.
    pub idle_timeout: Option<Duration>,
    /// `None` means the rule is permanent.
    pub hard_timeout: Option<Duration>,
}

/// Timeouts applied to learned unicast rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowPolicy {
    pub idle_timeout: Duration,
    pub hard_timeout: Duration,
}

impl Default for FlowPolicy {
    fn default() -> Self {
        Self {
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            hard_timeout: DEFAULT_HARD_TIMEOUT,
        }
    }
}

impl FlowPolicy {
    pub fn new(idle_timeout: Duration, hard_timeout: Duration) -> Self {
        Self {
            idle_timeout,
            hard_timeout,
        }
    }

    /// The catch-all rule sending unmatched packets to the controller.
    pub fn table_miss() -> FlowRule {
        FlowRule {
            matches: FlowMatch::wildcard_all(),
            output: Action::Controller,
            priority: TABLE_MISS_PRIORITY,
            idle_timeout: None,
            hard_timeout: None,
        }
    }

    /// Rule to install for a forwarding decision, if the decision installs one.
    pub fn build_rule(&self, decision: Decision, packet: &PacketDescriptor) -> Option<FlowRule> {
        match decision {
            Decision::Unicast(out_port) => Some(FlowRule {
                matches: FlowMatch::from_packet(packet, packet.in_port),
                output: Action::Port(out_port),
                priority: DEFAULT_PRIORITY,
                idle_timeout: Some(self.idle_timeout),
                hard_timeout: Some(self.hard_timeout),
            }),
            Decision::Flood | Decision::Drop => None,
        }
    }
}
