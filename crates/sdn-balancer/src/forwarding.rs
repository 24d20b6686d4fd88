// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Forwarding decision engine.

use crate::learning::{LearnOutcome, LearningTable};
use crate::packet::{PacketDescriptor, PacketKind};
use crate::types::PortNo;
use serde::{Deserialize, Serialize};

/// What to do with a packet-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Destination is known: install a rule and send out this port.
    Unicast(PortNo),
    /// Destination unknown (or ARP): flood without installing a rule.
    Flood,
    /// Discovery/control traffic that is ignored entirely.
    Drop,
}

/// Learn the source, then pick unicast, flood or drop.
///
/// ARP is flooded even when the target is already learned, keeping address
/// resolution broadcast-based. LLDP and IPv6 are dropped.
pub fn decide(table: &mut LearningTable, packet: &PacketDescriptor) -> (Decision, LearnOutcome) {
    let learned = table.observe(packet.src, packet.in_port);

    let decision = match packet.kind {
        PacketKind::Lldp | PacketKind::Ipv6 => Decision::Drop,
        PacketKind::Arp => Decision::Flood,
        PacketKind::Ipv4 | PacketKind::Other(_) => match table.lookup(&packet.dst) {
            Some(port) => Decision::Unicast(port),
            None => Decision::Flood,
        },
    };

    (decision, learned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::{FrameBuilder, ETH_TYPE_IPV6, ETH_TYPE_LLDP};
    use crate::types::MacAddr;
    use std::net::Ipv4Addr;

    fn aa() -> MacAddr {
        MacAddr::repeat(0xaa)
    }

    fn bb() -> MacAddr {
        MacAddr::repeat(0xbb)
    }

    fn parse(frame: Vec<u8>, in_port: PortNo) -> PacketDescriptor {
        PacketDescriptor::parse("s1".into(), in_port, frame).expect("parse")
    }

    fn ip(src: MacAddr, dst: MacAddr, in_port: PortNo) -> PacketDescriptor {
        let frame = FrameBuilder::udp(
            src,
            dst,
            Ipv4Addr::new(10, 0, 0, 1),
            Ipv4Addr::new(10, 0, 0, 2),
            1000,
            2000,
        )
        .build();
        parse(frame, in_port)
    }

    #[test]
    fn test_unknown_destination_floods() {
        let mut table = LearningTable::new();
        let (decision, learned) = decide(&mut table, &ip(aa(), bb(), 1));

        assert_eq!(decision, Decision::Flood);
        assert_eq!(learned, LearnOutcome::Learned);
        assert_eq!(table.lookup(&aa()), Some(1));
    }

    #[test]
    fn test_known_destination_unicasts() {
        let mut table = LearningTable::new();
        decide(&mut table, &ip(aa(), bb(), 1));
        let (decision, _) = decide(&mut table, &ip(bb(), aa(), 2));

        assert_eq!(decision, Decision::Unicast(1));
        assert_eq!(table.lookup(&bb()), Some(2));
    }

    #[test]
    fn test_arp_always_floods() {
        let mut table = LearningTable::new();
        table.observe(MacAddr::BROADCAST, 5);
        table.observe(bb(), 2);

        let request = FrameBuilder::arp_request(
            aa(),
            Ipv4Addr::new(10, 0, 0, 1),
            Ipv4Addr::new(10, 0, 0, 2),
        )
        .build();
        let (decision, _) = decide(&mut table, &parse(request, 1));
        assert_eq!(decision, Decision::Flood);

        // Unicast ARP reply to a learned host still floods.
        let reply = FrameBuilder::arp_request(
            bb(),
            Ipv4Addr::new(10, 0, 0, 2),
            Ipv4Addr::new(10, 0, 0, 1),
        )
        .build();
        let mut reply = parse(reply, 2);
        reply.dst = aa();
        let (decision, _) = decide(&mut table, &reply);
        assert_eq!(decision, Decision::Flood);
    }

    #[test]
    fn test_lldp_and_ipv6_dropped_after_learning() {
        let mut table = LearningTable::new();
        table.observe(bb(), 2);

        let lldp = FrameBuilder::new(aa(), bb(), ETH_TYPE_LLDP).build();
        let (decision, learned) = decide(&mut table, &parse(lldp, 1));
        assert_eq!(decision, Decision::Drop);
        assert_eq!(learned, LearnOutcome::Learned);

        let v6 = FrameBuilder::new(aa(), bb(), ETH_TYPE_IPV6).build();
        let (decision, learned) = decide(&mut table, &parse(v6, 1));
        assert_eq!(decision, Decision::Drop);
        assert_eq!(learned, LearnOutcome::Unchanged);

        assert_eq!(table.lookup(&aa()), Some(1));
    }

    #[test]
    fn test_other_ethertype_uses_table() {
        let mut table = LearningTable::new();
        table.observe(bb(), 9);
        let frame = FrameBuilder::new(aa(), bb(), 0x88b5).build();
        let (decision, _) = decide(&mut table, &parse(frame, 1));
        assert_eq!(decision, Decision::Unicast(9));
    }
}
