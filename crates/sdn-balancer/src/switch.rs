// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-switch state and the registry that owns it.

use crate::learning::LearningTable;
use crate::stats::{PortCounters, PortSample, Rates, SampleSkip};
use crate::types::{DatapathId, MacAddr, PortNo};
use std::collections::BTreeMap;
use std::time::Instant;

/// Everything the controller knows about one switch.
#[derive(Debug)]
pub struct SwitchState {
    pub dpid: DatapathId,
    pub learning: LearningTable,
    pub counters: PortCounters,
    /// Set on connection-up; `None` when the switch was only seen implicitly
    /// or is disconnected.
    pub connected_at: Option<Instant>,
    /// Connection-ups seen since the state was created.
    pub connections: u64,
}

impl SwitchState {
    pub fn new(dpid: DatapathId) -> Self {
        Self {
            dpid,
            learning: LearningTable::new(),
            counters: PortCounters::new(),
            connected_at: None,
            connections: 0,
        }
    }
}

/// Registry of known switches, keyed by datapath id.
///
/// Iteration order is by datapath id so that fan-outs are deterministic.
#[derive(Debug, Default)]
pub struct SwitchRegistry {
    switches: BTreeMap<DatapathId, SwitchState>,
}

impl SwitchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connected switch. Existing state is kept on reconnect.
    ///
    /// Returns `true` on the first connection of this state, including a switch
    /// that was only seen implicitly before.
    pub fn connect(&mut self, dpid: &DatapathId, at: Instant) -> bool {
        let sw = self.entry(dpid);
        sw.connected_at = Some(at);
        sw.connections += 1;
        sw.connections == 1
    }

    /// Mark a switch as disconnected while keeping its tables.
    ///
    /// Returns `false` if the switch is unknown.
    pub fn disconnect(&mut self, dpid: &DatapathId) -> bool {
        match self.switches.get_mut(dpid) {
            Some(sw) => {
                sw.connected_at = None;
                true
            }
            None => false,
        }
    }

    /// Remove a switch and all of its state.
    pub fn remove(&mut self, dpid: &DatapathId) -> Option<SwitchState> {
        self.switches.remove(dpid)
    }

    /// State of `dpid`, created empty if it was never seen.
    pub fn entry(&mut self, dpid: &DatapathId) -> &mut SwitchState {
        self.switches
            .entry(dpid.clone())
            .or_insert_with(|| SwitchState::new(dpid.clone()))
    }

    pub fn get(&self, dpid: &DatapathId) -> Option<&SwitchState> {
        self.switches.get(dpid)
    }

    /// Port of `dst` on `dpid`, if learned.
    pub fn lookup(&self, dpid: &DatapathId, dst: &MacAddr) -> Option<PortNo> {
        self.switches
            .get(dpid)
            .and_then(|sw| sw.learning.lookup(dst))
    }

    /// Feed a port sample of `dpid` into its counters.
    pub fn ingest(
        &mut self,
        dpid: &DatapathId,
        sample: PortSample,
        at: Instant,
    ) -> Result<Rates, SampleSkip> {
        self.entry(dpid).counters.ingest(sample, at)
    }

    pub fn contains(&self, dpid: &DatapathId) -> bool {
        self.switches.contains_key(dpid)
    }

    pub fn is_connected(&self, dpid: &DatapathId) -> bool {
        self.switches
            .get(dpid)
            .map_or(false, |sw| sw.connected_at.is_some())
    }

    /// Known datapath ids in order.
    pub fn ids(&self) -> impl Iterator<Item = &DatapathId> {
        self.switches.keys()
    }

    /// Ids of switches with a live connection, in order.
    pub fn connected_ids(&self) -> impl Iterator<Item = &DatapathId> {
        self.switches
            .values()
            .filter(|sw| sw.connected_at.is_some())
            .map(|sw| &sw.dpid)
    }

    pub fn len(&self) -> usize {
        self.switches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.switches.is_empty()
    }
}
