// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Port counter tracking and rate normalization.
//!
//! Switches report cumulative byte counters. Rates are always computed against the
//! immediately preceding sample for the same port, using the wall-clock time
//! between the two samples.

use crate::types::{is_reserved_port, PortNo};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::time::Instant;

/// One port entry of a port-stats reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortSample {
    pub port_no: PortNo,
    pub rx_bytes: u64,
    pub tx_bytes: u64,
}

impl PortSample {
    pub fn new(port_no: PortNo, rx_bytes: u64, tx_bytes: u64) -> Self {
        Self {
            port_no,
            rx_bytes,
            tx_bytes,
        }
    }
}

/// Byte rates over one sampling interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rates {
    /// Received bytes per second.
    pub rx: f64,
    /// Transmitted bytes per second.
    pub tx: f64,
}

impl Rates {
    pub fn new(rx: f64, tx: f64) -> Self {
        Self { rx, tx }
    }

    pub fn total(&self) -> f64 {
        self.rx + self.tx
    }

    /// Combined rate as a fraction of `capacity` bytes per second.
    pub fn utilization(&self, capacity: f64) -> f64 {
        self.total() / capacity
    }
}

/// Previous sample of a port plus the last utilization derived from it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PortCounterState {
    pub prev_rx: u64,
    pub prev_tx: u64,
    pub prev_time: Instant,
    pub utilization: f64,
}

/// Why a sample produced no rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleSkip {
    /// Port number is reserved/internal.
    ReservedPort,
    /// First sample for the port; stored as the baseline.
    ColdStart,
    /// Sample is not newer than the stored one; state left as is.
    NonMonotonicTime,
    /// A counter went backwards; the sample became the new baseline.
    CounterReset,
}

/// Counter states of every port of one switch.
#[derive(Debug, Clone, Default)]
pub struct PortCounters {
    ports: HashMap<PortNo, PortCounterState>,
}

impl PortCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one sample taken at `at` and compute rates against the previous one.
    pub fn ingest(&mut self, sample: PortSample, at: Instant) -> Result<Rates, SampleSkip> {
        if is_reserved_port(sample.port_no) {
            return Err(SampleSkip::ReservedPort);
        }

        let state = match self.ports.entry(sample.port_no) {
            Entry::Occupied(slot) => slot.into_mut(),
            Entry::Vacant(slot) => {
                slot.insert(PortCounterState {
                    prev_rx: sample.rx_bytes,
                    prev_tx: sample.tx_bytes,
                    prev_time: at,
                    utilization: 0.0,
                });
                return Err(SampleSkip::ColdStart);
            }
        };

        // checked_duration_since is None when `at` precedes the stored time
        let elapsed = match at.checked_duration_since(state.prev_time) {
            Some(d) if !d.is_zero() => d.as_secs_f64(),
            _ => return Err(SampleSkip::NonMonotonicTime),
        };

        if sample.rx_bytes < state.prev_rx || sample.tx_bytes < state.prev_tx {
            state.prev_rx = sample.rx_bytes;
            state.prev_tx = sample.tx_bytes;
            state.prev_time = at;
            return Err(SampleSkip::CounterReset);
        }

        let rates = Rates {
            rx: (sample.rx_bytes - state.prev_rx) as f64 / elapsed,
            tx: (sample.tx_bytes - state.prev_tx) as f64 / elapsed,
        };

        state.prev_rx = sample.rx_bytes;
        state.prev_tx = sample.tx_bytes;
        state.prev_time = at;

        Ok(rates)
    }

    /// Store the utilization derived from the latest rates of `port`.
    pub fn record_utilization(&mut self, port: PortNo, utilization: f64) {
        if let Some(state) = self.ports.get_mut(&port) {
            state.utilization = utilization;
        }
    }

    pub fn get(&self, port: PortNo) -> Option<&PortCounterState> {
        self.ports.get(&port)
    }

    pub fn len(&self) -> usize {
        self.ports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OFPP_LOCAL, OFPP_MAX};
    use std::time::Duration;

    #[test]
    fn test_first_sample_is_baseline() {
        let mut counters = PortCounters::new();
        let t0 = Instant::now();

        assert_eq!(
            counters.ingest(PortSample::new(3, 100, 200), t0),
            Err(SampleSkip::ColdStart)
        );
        let state = counters.get(3).expect("state");
        assert_eq!(state.prev_rx, 100);
        assert_eq!(state.prev_tx, 200);
        assert_eq!(state.utilization, 0.0);
    }

    #[test]
    fn test_rate_over_interval() {
        let mut counters = PortCounters::new();
        let t0 = Instant::now();

        let _ = counters.ingest(PortSample::new(3, 0, 0), t0);
        let rates = counters
            .ingest(PortSample::new(3, 1_250_000, 500_000), t0 + Duration::from_secs(5))
            .expect("rates");

        assert_eq!(rates.rx, 250_000.0);
        assert_eq!(rates.tx, 100_000.0);
        assert_eq!(rates.total(), 350_000.0);
    }

    #[test]
    fn test_rate_relative_to_previous_sample() {
        let mut counters = PortCounters::new();
        let t0 = Instant::now();

        let _ = counters.ingest(PortSample::new(1, 0, 0), t0);
        let _ = counters.ingest(PortSample::new(1, 1000, 0), t0 + Duration::from_secs(1));
        let rates = counters
            .ingest(PortSample::new(1, 1500, 0), t0 + Duration::from_secs(3))
            .expect("rates");

        assert_eq!(rates.rx, 250.0);
    }

    #[test]
    fn test_zero_and_negative_delta_skipped() {
        let mut counters = PortCounters::new();
        let t0 = Instant::now() + Duration::from_secs(10);

        let _ = counters.ingest(PortSample::new(1, 0, 0), t0);
        assert_eq!(
            counters.ingest(PortSample::new(1, 500, 0), t0),
            Err(SampleSkip::NonMonotonicTime)
        );
        assert_eq!(
            counters.ingest(PortSample::new(1, 500, 0), t0 - Duration::from_secs(1)),
            Err(SampleSkip::NonMonotonicTime)
        );

        // Baseline untouched
        let state = counters.get(1).expect("state");
        assert_eq!(state.prev_rx, 0);
        assert_eq!(state.prev_time, t0);
    }

    #[test]
    fn test_reserved_ports_ignored() {
        let mut counters = PortCounters::new();
        let t0 = Instant::now();

        assert_eq!(
            counters.ingest(PortSample::new(OFPP_LOCAL, 1, 1), t0),
            Err(SampleSkip::ReservedPort)
        );
        assert_eq!(
            counters.ingest(PortSample::new(OFPP_MAX, 1, 1), t0),
            Err(SampleSkip::ReservedPort)
        );
        assert!(counters.is_empty());
    }

    #[test]
    fn test_counter_reset_rebaselines() {
        let mut counters = PortCounters::new();
        let t0 = Instant::now();

        let _ = counters.ingest(PortSample::new(2, 10_000, 10_000), t0);
        assert_eq!(
            counters.ingest(PortSample::new(2, 50, 10_500), t0 + Duration::from_secs(5)),
            Err(SampleSkip::CounterReset)
        );

        let rates = counters
            .ingest(PortSample::new(2, 1050, 10_500), t0 + Duration::from_secs(10))
            .expect("rates");
        assert_eq!(rates.rx, 200.0);
        assert_eq!(rates.tx, 0.0);
    }

    #[test]
    fn test_record_utilization() {
        let mut counters = PortCounters::new();
        counters.record_utilization(4, 0.5);
        assert!(counters.get(4).is_none());

        let _ = counters.ingest(PortSample::new(4, 0, 0), Instant::now());
        counters.record_utilization(4, 0.5);
        assert_eq!(counters.get(4).map(|s| s.utilization), Some(0.5));
    }

    #[test]
    fn test_utilization() {
        let capacity = 100.0 * 1024.0 * 1024.0 / 8.0;
        let rates = Rates::new(250_000.0, 0.0);
        let util = rates.utilization(capacity);
        assert!((util - 0.019).abs() < 0.001);
    }
}
