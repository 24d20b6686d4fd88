// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-switch MAC learning table.

use crate::types::{MacAddr, PortNo};
use std::collections::HashMap;

/// Result of observing a source address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LearnOutcome {
    /// Address was not known on this switch.
    Learned,
    /// Address was known on another port; the entry now points at the new one.
    Moved { from: PortNo },
    /// Address was already known on this port.
    Unchanged,
}

/// Hardware address to ingress port mapping for a single switch.
///
/// Entries never expire; the latest observation always wins.
#[derive(Debug, Clone, Default)]
pub struct LearningTable {
    entries: HashMap<MacAddr, PortNo>,
}

impl LearningTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `src` was seen arriving on `in_port`.
    pub fn observe(&mut self, src: MacAddr, in_port: PortNo) -> LearnOutcome {
        match self.entries.insert(src, in_port) {
            None => LearnOutcome::Learned,
            Some(prev) if prev == in_port => LearnOutcome::Unchanged,
            Some(prev) => LearnOutcome::Moved { from: prev },
        }
    }

    /// Port where `dst` was last seen.
    pub fn lookup(&self, dst: &MacAddr) -> Option<PortNo> {
        self.entries.get(dst).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over all learned entries.
    pub fn entries(&self) -> impl Iterator<Item = (&MacAddr, &PortNo)> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observe_then_lookup() {
        let mut table = LearningTable::new();
        assert!(table.is_empty());
        assert_eq!(table.lookup(&MacAddr::repeat(0xaa)), None);

        assert_eq!(table.observe(MacAddr::repeat(0xaa), 1), LearnOutcome::Learned);
        assert_eq!(table.lookup(&MacAddr::repeat(0xaa)), Some(1));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_observe_idempotent() {
        let mut table = LearningTable::new();
        table.observe(MacAddr::repeat(0xaa), 1);
        assert_eq!(table.observe(MacAddr::repeat(0xaa), 1), LearnOutcome::Unchanged);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_latest_write_wins() {
        let mut table = LearningTable::new();
        let mac = MacAddr::repeat(0xaa);
        let ports = [1, 4, 4, 2, 7, 1, 3];

        let mut last = None;
        for port in ports {
            let outcome = table.observe(mac, port);
            match last {
                None => assert_eq!(outcome, LearnOutcome::Learned),
                Some(prev) if prev == port => assert_eq!(outcome, LearnOutcome::Unchanged),
                Some(prev) => assert_eq!(outcome, LearnOutcome::Moved { from: prev }),
            }
            last = Some(port);
            assert_eq!(table.lookup(&mac), Some(port));
        }
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_independent_addresses() {
        let mut table = LearningTable::new();
        table.observe(MacAddr::repeat(0xaa), 1);
        table.observe(MacAddr::repeat(0xbb), 2);
        assert_eq!(table.lookup(&MacAddr::repeat(0xaa)), Some(1));
        assert_eq!(table.lookup(&MacAddr::repeat(0xbb)), Some(2));
        assert_eq!(table.entries().count(), 2);
    }
}
