// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Identifiers shared by every controller component.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Switch port number (OpenFlow 1.0 `uint16_t`).
pub type PortNo = u16;

/// Highest number usable for a physical port; everything at or above is reserved.
pub const OFPP_MAX: PortNo = 0xff00;
/// Reserved port: all physical ports except the ingress port.
pub const OFPP_FLOOD: PortNo = 0xfffb;
/// Reserved port: send to the controller.
pub const OFPP_CONTROLLER: PortNo = 0xfffd;
/// Reserved port: the switch's local networking stack.
pub const OFPP_LOCAL: PortNo = 0xfffe;

/// Check whether a port number is a reserved/internal one.
pub fn is_reserved_port(port: PortNo) -> bool {
    port >= OFPP_MAX
}

/// Stable datapath identifier of a switch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatapathId(String);

impl DatapathId {
    /// Create a datapath id from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DatapathId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DatapathId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for DatapathId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// MAC address parse error.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid MAC address: {0}")]
pub struct MacParseError(String);

/// 48-bit Ethernet hardware address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct MacAddr(pub [u8; 6]);

impl MacAddr {
    pub const BROADCAST: MacAddr = MacAddr([0xff; 6]);

    /// Build an address from its six octets.
    pub const fn new(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    /// Address with every octet equal to `b` (handy for host fixtures).
    pub const fn repeat(b: u8) -> Self {
        Self([b; 6])
    }

    pub fn octets(&self) -> [u8; 6] {
        self.0
    }

    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let o = self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            o[0], o[1], o[2], o[3], o[4], o[5]
        )
    }
}

impl FromStr for MacAddr {
    type Err = MacParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut octets = [0u8; 6];
        let mut parts = s.split(|c| c == ':' || c == '-');

        for octet in octets.iter_mut() {
            let part = parts.next().ok_or_else(|| MacParseError(s.to_string()))?;
            if part.len() != 2 {
                return Err(MacParseError(s.to_string()));
            }
            *octet = u8::from_str_radix(part, 16).map_err(|_| MacParseError(s.to_string()))?;
        }

        if parts.next().is_some() {
            return Err(MacParseError(s.to_string()));
        }

        Ok(Self(octets))
    }
}

impl Serialize for MacAddr {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MacAddr {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Key of a single switch port, used wherever state is tracked per (switch, port).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PortKey {
    pub dpid: DatapathId,
    pub port: PortNo,
}

impl PortKey {
    pub fn new(dpid: DatapathId, port: PortNo) -> Self {
        Self { dpid, port }
    }
}

impl fmt::Display for PortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.dpid, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mac_roundtrip_display() {
        let mac: MacAddr = "00:1b:21:3a:4f:0c".parse().expect("parse");
        assert_eq!(mac.octets(), [0x00, 0x1b, 0x21, 0x3a, 0x4f, 0x0c]);
        assert_eq!(mac.to_string(), "00:1b:21:3a:4f:0c");
    }

    #[test]
    fn test_mac_parse_rejects_garbage() {
        assert!("00:1b:21:3a:4f".parse::<MacAddr>().is_err());
        assert!("00:1b:21:3a:4f:0c:99".parse::<MacAddr>().is_err());
        assert!("zz:1b:21:3a:4f:0c".parse::<MacAddr>().is_err());
        assert!("001b213a4f0c".parse::<MacAddr>().is_err());
    }

    #[test]
    fn test_mac_flags() {
        assert!(MacAddr::BROADCAST.is_broadcast());
        assert!(!MacAddr::repeat(0xaa).is_broadcast());
    }

    #[test]
    fn test_reserved_ports() {
        assert!(!is_reserved_port(1));
        assert!(!is_reserved_port(OFPP_MAX - 1));
        assert!(is_reserved_port(OFPP_MAX));
        assert!(is_reserved_port(OFPP_LOCAL));
        assert!(is_reserved_port(OFPP_CONTROLLER));
    }

    #[test]
    fn test_mac_serde_as_string() {
        let mac = MacAddr::repeat(0xbb);
        let json = serde_json::to_string(&mac).expect("serialize");
        assert_eq!(json, "\"bb:bb:bb:bb:bb:bb\"");
        let back: MacAddr = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, mac);
    }

    #[test]
    fn test_port_key_display() {
        let key = PortKey::new("s1".into(), 3);
        assert_eq!(key.to_string(), "s1-3");
    }
}
