// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Edge-triggered congestion detection.
//!
//! A port is congested while its utilization is strictly above the threshold.
//! Only the crossings are reported: the first sample above the threshold raises,
//! the first sample at or below it afterwards clears. Steady states are silent.

use crate::stats::Rates;
use crate::types::{DatapathId, PortKey, PortNo};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A change of congestion state on one port.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Transition {
    Raised { utilization: f64 },
    Cleared { utilization: f64 },
}

impl Transition {
    pub fn utilization(&self) -> f64 {
        match self {
            Self::Raised { utilization } | Self::Cleared { utilization } => *utilization,
        }
    }

    pub fn is_raised(&self) -> bool {
        matches!(self, Self::Raised { .. })
    }
}

/// Alert surfaced for every transition.
///
/// Transitions come only from samples. A switch evicted on disconnect leaves the
/// congested set without a `Cleared` alert; consumers should treat the switch's
/// disconnect as closing its open alerts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CongestionAlert {
    pub dpid: DatapathId,
    pub port: PortNo,
    pub transition: Transition,
}

/// Holds the set of currently congested ports.
#[derive(Debug, Default)]
pub struct CongestionMonitor {
    congested: BTreeSet<PortKey>,
}

impl CongestionMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluate one rate sample for `dpid`/`port`.
    ///
    /// `capacity` is the link capacity in bytes per second.
    pub fn evaluate(
        &mut self,
        dpid: &DatapathId,
        port: PortNo,
        rates: &Rates,
        capacity: f64,
        threshold: f64,
    ) -> Option<Transition> {
        let utilization = rates.utilization(capacity);
        let key = PortKey::new(dpid.clone(), port);

        if utilization > threshold {
            if self.congested.insert(key) {
                return Some(Transition::Raised { utilization });
            }
        } else if self.congested.remove(&key) {
            return Some(Transition::Cleared { utilization });
        }

        None
    }

    pub fn is_congested(&self, dpid: &DatapathId, port: PortNo) -> bool {
        self.congested.contains(&PortKey::new(dpid.clone(), port))
    }

    /// Currently congested ports, ordered by switch then port.
    pub fn congested(&self) -> impl Iterator<Item = &PortKey> {
        self.congested.iter()
    }

    pub fn congested_count(&self) -> usize {
        self.congested.len()
    }

    /// Drop every entry belonging to `dpid`; returns how many were removed.
    pub fn forget_switch(&mut self, dpid: &DatapathId) -> usize {
        let before = self.congested.len();
        self.congested.retain(|key| &key.dpid != dpid);
        before - self.congested.len()
    }
}
