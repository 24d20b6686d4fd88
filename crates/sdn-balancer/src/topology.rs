// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Reference lab topologies.
//!
//! Describes the switches, hosts and links of the two lab networks the controller
//! is exercised against. Ports are numbered per node in link order starting at 1,
//! which is how the emulator numbers them.

use crate::types::{MacAddr, PortNo};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::net::Ipv4Addr;
use thiserror::Error;

/// Topology errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TopologyError {
    #[error("Unknown topology: {0} (expected one of: loopfree, projecttopo)")]
    UnknownTopology(String),

    #[error("Duplicate node name: {0}")]
    DuplicateNode(String),

    #[error("Link endpoint does not exist: {0}")]
    UnknownNode(String),

    #[error("Host {host} must have exactly one link (has {links})")]
    HostLinks { host: String, links: usize },

    #[error("Host {0} is not attached to a switch")]
    HostNotOnSwitch(String),
}

/// Kind of a topology node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum NodeKind {
    Switch,
    Host { ip: Ipv4Addr, mac: MacAddr },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    #[serde(flatten)]
    pub kind: NodeKind,
}

impl Node {
    pub fn is_switch(&self) -> bool {
        matches!(self.kind, NodeKind::Switch)
    }
}

/// One side of a link.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    pub node: String,
    pub port: PortNo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub a: Endpoint,
    pub b: Endpoint,
}

/// A named network of switches and hosts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topology {
    pub name: String,
    nodes: Vec<Node>,
    links: Vec<Link>,
    #[serde(skip)]
    next_port: HashMap<String, PortNo>,
}

impl Topology {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Look up a reference topology by name.
    pub fn by_name(name: &str) -> Result<Self, TopologyError> {
        match name {
            "loopfree" => Ok(Self::loopfree()),
            "projecttopo" => Ok(Self::projecttopo()),
            other => Err(TopologyError::UnknownTopology(other.to_string())),
        }
    }

    /// Six switches in a tree, one host per switch.
    pub fn loopfree() -> Self {
        Self::lab("loopfree", &[(1, 2), (1, 3), (2, 4), (2, 5), (3, 6)])
    }

    /// Six switches with redundant paths, one host per switch.
    pub fn projecttopo() -> Self {
        Self::lab(
            "projecttopo",
            &[
                (1, 2),
                (2, 3),
                (1, 4),
                (4, 5),
                (5, 6),
                (4, 6),
                (2, 5),
                (3, 6),
            ],
        )
    }

    fn lab(name: &str, trunks: &[(u8, u8)]) -> Self {
        let mut topo = Self::new(name);
        for i in 1..=6u8 {
            topo.add_switch(format!("s{}", i));
        }
        for i in 1..=6u8 {
            topo.add_host(
                format!("h{}", i),
                Ipv4Addr::new(10, 0, 0, i),
                MacAddr::new([0, 0, 0, 0, 0, i]),
            );
        }
        for &(a, b) in trunks {
            topo.add_link(&format!("s{}", a), &format!("s{}", b));
        }
        for i in 1..=6u8 {
            topo.add_link(&format!("h{}", i), &format!("s{}", i));
        }
        topo
    }

    pub fn add_switch(&mut self, name: impl Into<String>) -> &mut Self {
        self.nodes.push(Node {
            name: name.into(),
            kind: NodeKind::Switch,
        });
        self
    }

    pub fn add_host(&mut self, name: impl Into<String>, ip: Ipv4Addr, mac: MacAddr) -> &mut Self {
        self.nodes.push(Node {
            name: name.into(),
            kind: NodeKind::Host { ip, mac },
        });
        self
    }

    /// Connect two nodes on their next free ports.
    pub fn add_link(&mut self, a: &str, b: &str) -> &mut Self {
        let a = self.allocate(a);
        let b = self.allocate(b);
        self.links.push(Link { a, b });
        self
    }

    fn allocate(&mut self, node: &str) -> Endpoint {
        let next = self.next_port.entry(node.to_string()).or_insert(1);
        let port = *next;
        *next += 1;
        Endpoint {
            node: node.to_string(),
            port,
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn node(&self, name: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.name == name)
    }

    pub fn switches(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| n.is_switch())
    }

    pub fn hosts(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| !n.is_switch())
    }

    /// Ports in use on `node`, ascending.
    pub fn ports(&self, node: &str) -> Vec<PortNo> {
        let mut ports: Vec<PortNo> = self
            .links
            .iter()
            .flat_map(|l| [&l.a, &l.b])
            .filter(|e| e.node == node)
            .map(|e| e.port)
            .collect();
        ports.sort_unstable();
        ports
    }

    /// Endpoint on the far side of `node`'s `port`.
    pub fn peer(&self, node: &str, port: PortNo) -> Option<&Endpoint> {
        self.links.iter().find_map(|l| {
            if l.a.node == node && l.a.port == port {
                Some(&l.b)
            } else if l.b.node == node && l.b.port == port {
                Some(&l.a)
            } else {
                None
            }
        })
    }

    /// Switch and port a host is attached to.
    pub fn attachment(&self, host: &str) -> Option<&Endpoint> {
        self.peer(host, 1)
    }

    /// Check that names are unique, links reference existing nodes and every host
    /// hangs off exactly one switch.
    pub fn validate(&self) -> Result<(), TopologyError> {
        let mut by_name: BTreeMap<&str, &Node> = BTreeMap::new();
        for node in &self.nodes {
            if by_name.insert(node.name.as_str(), node).is_some() {
                return Err(TopologyError::DuplicateNode(node.name.clone()));
            }
        }

        for link in &self.links {
            for end in [&link.a, &link.b] {
                if !by_name.contains_key(end.node.as_str()) {
                    return Err(TopologyError::UnknownNode(end.node.clone()));
                }
            }
        }

        for host in self.hosts() {
            let links: Vec<&Endpoint> = self
                .links
                .iter()
                .filter_map(|l| {
                    if l.a.node == host.name {
                        Some(&l.b)
                    } else if l.b.node == host.name {
                        Some(&l.a)
                    } else {
                        None
                    }
                })
                .collect();

            if links.len() != 1 {
                return Err(TopologyError::HostLinks {
                    host: host.name.clone(),
                    links: links.len(),
                });
            }
            let on_switch = by_name
                .get(links[0].node.as_str())
                .map_or(false, |n| n.is_switch());
            if !on_switch {
                return Err(TopologyError::HostNotOnSwitch(host.name.clone()));
            }
        }

        Ok(())
    }

    /// Whether the switch-to-switch graph contains a loop.
    ///
    /// Parallel links between the same pair of switches count as a loop.
    pub fn has_switch_cycle(&self) -> bool {
        let index: HashMap<&str, usize> = self
            .switches()
            .enumerate()
            .map(|(i, n)| (n.name.as_str(), i))
            .collect();
        let mut parent: Vec<usize> = (0..index.len()).collect();

        fn root(parent: &mut [usize], mut i: usize) -> usize {
            while parent[i] != i {
                parent[i] = parent[parent[i]];
                i = parent[i];
            }
            i
        }

        for link in &self.links {
            let (Some(&a), Some(&b)) = (
                index.get(link.a.node.as_str()),
                index.get(link.b.node.as_str()),
            ) else {
                continue;
            };
            let (ra, rb) = (root(&mut parent, a), root(&mut parent, b));
            if ra == rb {
                return true;
            }
            parent[ra] = rb;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loopfree_layout() {
        let topo = Topology::loopfree();
        assert!(topo.validate().is_ok());
        assert_eq!(topo.switches().count(), 6);
        assert_eq!(topo.hosts().count(), 6);
        assert_eq!(topo.links().len(), 11);
        assert!(!topo.has_switch_cycle());

        // s1: trunk to s2, trunk to s3, then h1
        assert_eq!(topo.ports("s1"), vec![1, 2, 3]);
        assert_eq!(
            topo.peer("s1", 2),
            Some(&Endpoint {
                node: "s3".into(),
                port: 1
            })
        );
        assert_eq!(
            topo.attachment("h1"),
            Some(&Endpoint {
                node: "s1".into(),
                port: 3
            })
        );
    }

    #[test]
    fn test_projecttopo_has_loop() {
        let topo = Topology::projecttopo();
        assert!(topo.validate().is_ok());
        assert_eq!(topo.links().len(), 14);
        assert!(topo.has_switch_cycle());
        assert_eq!(topo.ports("s4"), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_by_name() {
        assert_eq!(Topology::by_name("loopfree").map(|t| t.name), Ok("loopfree".to_string()));
        assert_eq!(
            Topology::by_name("mesh"),
            Err(TopologyError::UnknownTopology("mesh".into()))
        );
    }

    #[test]
    fn test_host_addresses() {
        let topo = Topology::projecttopo();
        match topo.node("h3").map(|n| n.kind) {
            Some(NodeKind::Host { ip, mac }) => {
                assert_eq!(ip, Ipv4Addr::new(10, 0, 0, 3));
                assert_eq!(mac.to_string(), "00:00:00:00:00:03");
            }
            other => panic!("unexpected node {:?}", other),
        }
    }

    #[test]
    fn test_validation_errors() {
        let ip = Ipv4Addr::new(10, 0, 0, 1);
        let mac = MacAddr::repeat(1);

        let mut topo = Topology::new("dup");
        topo.add_switch("s1").add_switch("s1");
        assert_eq!(
            topo.validate(),
            Err(TopologyError::DuplicateNode("s1".into()))
        );

        let mut topo = Topology::new("dangling");
        topo.add_switch("s1").add_link("s1", "s2");
        assert_eq!(topo.validate(), Err(TopologyError::UnknownNode("s2".into())));

        let mut topo = Topology::new("orphan");
        topo.add_switch("s1").add_host("h1", ip, mac);
        assert_eq!(
            topo.validate(),
            Err(TopologyError::HostLinks {
                host: "h1".into(),
                links: 0
            })
        );

        let mut topo = Topology::new("dual-homed");
        topo.add_switch("s1")
            .add_switch("s2")
            .add_host("h1", ip, mac)
            .add_link("h1", "s1")
            .add_link("h1", "s2");
        assert!(matches!(
            topo.validate(),
            Err(TopologyError::HostLinks { links: 2, .. })
        ));

        let mut topo = Topology::new("back-to-back");
        topo.add_host("h1", ip, mac)
            .add_host("h2", ip, mac)
            .add_link("h1", "h2");
        assert_eq!(
            topo.validate(),
            Err(TopologyError::HostNotOnSwitch("h1".into()))
        );
    }

    #[test]
    fn test_parallel_links_are_a_cycle() {
        let mut topo = Topology::new("parallel");
        topo.add_switch("s1")
            .add_switch("s2")
            .add_link("s1", "s2")
            .add_link("s1", "s2");
        assert!(topo.has_switch_cycle());
    }
}
