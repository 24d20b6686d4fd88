// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Controller orchestrator.
//!
//! Owns all controller state and turns one inbound event into the commands and
//! alerts it causes. Handling is synchronous and runs to completion, so callers
//! serialize events through a single owner (see [`crate::runtime`]).

use crate::config::{ConfigError, ControllerConfig};
use crate::congestion::{CongestionAlert, CongestionMonitor, Transition};
use crate::event::{Command, ControllerEvent, Outcome};
use crate::flow::{FlowPolicy, FlowRule};
use crate::forwarding::{self, Decision};
use crate::learning::LearnOutcome;
use crate::packet::PacketDescriptor;
use crate::poller::PollSchedule;
use crate::stats::{PortSample, SampleSkip};
use crate::switch::SwitchRegistry;
use crate::types::{DatapathId, PortNo};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Controller counters.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerMetrics {
    pub connections: u64,
    pub disconnects: u64,
    pub packets_in: u64,
    pub malformed_packets: u64,
    pub unicasts: u64,
    pub floods: u64,
    pub drops: u64,
    pub flows_installed: u64,
    pub stats_requests: u64,
    pub stats_replies: u64,
    pub samples_skipped: u64,
    pub polls: u64,
    pub congestion_raised: u64,
    pub congestion_cleared: u64,
}

/// Point-in-time view of the controller.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ControllerSnapshot {
    pub name: String,
    pub switches: usize,
    pub connected_switches: usize,
    pub learned_addresses: usize,
    pub congested_ports: Vec<String>,
    pub metrics: ControllerMetrics,
}

/// The forwarding and congestion-monitoring controller.
#[derive(Debug)]
pub struct Controller {
    config: ControllerConfig,
    policy: FlowPolicy,
    capacity: f64,
    switches: SwitchRegistry,
    monitor: CongestionMonitor,
    schedule: PollSchedule,
    metrics: ControllerMetrics,
}

impl Controller {
    /// Create a controller from a validated configuration.
    pub fn new(config: ControllerConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        Ok(Self {
            policy: config.flow_policy(),
            capacity: config.link_capacity_bytes_per_sec(),
            schedule: PollSchedule::new(config.monitoring_interval()),
            switches: SwitchRegistry::new(),
            monitor: CongestionMonitor::new(),
            metrics: ControllerMetrics::default(),
            config,
        })
    }

    /// Handle one event observed at `now`.
    pub fn handle(&mut self, event: ControllerEvent, now: Instant) -> Outcome {
        let mut out = Outcome::default();

        match event {
            ControllerEvent::ConnectionUp { dpid } => self.on_connection_up(dpid, now, &mut out),
            ControllerEvent::ConnectionDown { dpid } => self.on_connection_down(&dpid),
            ControllerEvent::PacketIn {
                dpid,
                in_port,
                data,
            } => self.on_packet_in(dpid, in_port, data, &mut out),
            ControllerEvent::PortStatsReceived { dpid, stats } => {
                self.on_port_stats(&dpid, stats, now, &mut out)
            }
            ControllerEvent::PollTimerFired => self.on_poll_timer(now, &mut out),
        }

        out
    }

    fn on_connection_up(&mut self, dpid: DatapathId, now: Instant, out: &mut Outcome) {
        let first = self.switches.connect(&dpid, now);
        self.metrics.connections += 1;
        info!(
            "Switch {} connected{}",
            dpid,
            if first { "" } else { " (reconnect)" }
        );

        self.install(&dpid, FlowPolicy::table_miss(), out);
        debug!("Installed table-miss flow on switch {}", dpid);

        self.request_stats(dpid, out);

        if self.schedule.arm(now) {
            debug!(
                "Stats polling every {}s",
                self.schedule.interval().as_secs()
            );
        }
    }

    fn on_connection_down(&mut self, dpid: &DatapathId) {
        self.metrics.disconnects += 1;

        if !self.config.evict_on_disconnect {
            if self.switches.disconnect(dpid) {
                info!("Switch {} disconnected (state retained)", dpid);
            }
            return;
        }

        match self.switches.remove(dpid) {
            Some(state) => {
                let cleared = self.monitor.forget_switch(dpid);
                info!(
                    "Switch {} disconnected: dropped {} learned addresses, {} port counters, {} congested ports",
                    dpid,
                    state.learning.len(),
                    state.counters.len(),
                    cleared
                );
            }
            None => debug!("Disconnect for unknown switch {}", dpid),
        }
    }

    fn on_packet_in(
        &mut self,
        dpid: DatapathId,
        in_port: PortNo,
        data: Vec<u8>,
        out: &mut Outcome,
    ) {
        self.metrics.packets_in += 1;

        let packet = match PacketDescriptor::parse(dpid, in_port, data) {
            Ok(packet) => packet,
            Err(err) => {
                self.metrics.malformed_packets += 1;
                warn!("Ignoring malformed packet on port {}: {}", in_port, err);
                return;
            }
        };

        let switch = self.switches.entry(&packet.dpid);
        let (decision, learned) = forwarding::decide(&mut switch.learning, &packet);

        match learned {
            LearnOutcome::Learned => info!(
                "Learned {} on switch {} port {}",
                packet.src, packet.dpid, in_port
            ),
            LearnOutcome::Moved { from } => debug!(
                "{} moved on switch {} from port {} to {}",
                packet.src, packet.dpid, from, in_port
            ),
            LearnOutcome::Unchanged => {}
        }

        match decision {
            Decision::Drop => {
                self.metrics.drops += 1;
                debug!(
                    "Dropping {:?} from {} on switch {}",
                    packet.kind, packet.src, packet.dpid
                );
            }
            Decision::Flood => {
                self.metrics.floods += 1;
                debug!("Flooding packet from {} on switch {}", packet.src, packet.dpid);
                out.commands.push(Command::FloodPacket {
                    dpid: packet.dpid,
                    exclude_in_port: in_port,
                    data: packet.data,
                });
            }
            Decision::Unicast(out_port) => {
                self.metrics.unicasts += 1;
                debug!(
                    "Forwarding {} -> {} on switch {} port {}",
                    packet.src, packet.dst, packet.dpid, out_port
                );
                if let Some(rule) = self.policy.build_rule(decision, &packet) {
                    debug!(
                        "Installed flow: {} in_port:{} -> out_port:{}",
                        packet.dpid,
                        in_port,
                        rule.output.port_no()
                    );
                    self.install(&packet.dpid, rule, out);
                }
                out.commands.push(Command::SendPacket {
                    dpid: packet.dpid,
                    out_port,
                    in_port,
                    data: packet.data,
                });
            }
        }
    }

    fn on_port_stats(
        &mut self,
        dpid: &DatapathId,
        stats: Vec<PortSample>,
        now: Instant,
        out: &mut Outcome,
    ) {
        self.metrics.stats_replies += 1;

        // Replies are only expected from switches we poll; anything else was in
        // flight when the switch went away.
        if !self.switches.is_connected(dpid) {
            self.metrics.samples_skipped += stats.len() as u64;
            debug!(
                "Dropping stale stats reply from {} ({} ports)",
                dpid,
                stats.len()
            );
            return;
        }

        for sample in stats {
            let port = sample.port_no;
            let rates = match self.switches.ingest(dpid, sample, now) {
                Ok(rates) => rates,
                Err(SampleSkip::ReservedPort) => continue,
                Err(skip) => {
                    self.metrics.samples_skipped += 1;
                    debug!("{} port {}: no rate this cycle ({:?})", dpid, port, skip);
                    continue;
                }
            };

            let utilization = rates.utilization(self.capacity);
            self.switches
                .entry(dpid)
                .counters
                .record_utilization(port, utilization);

            if utilization > self.config.utilization_log_floor {
                info!(
                    "{} port {}: RX={:.0} B/s, TX={:.0} B/s, {:.1}% util",
                    dpid,
                    port,
                    rates.rx,
                    rates.tx,
                    utilization * 100.0
                );
            }

            let transition = self.monitor.evaluate(
                dpid,
                port,
                &rates,
                self.capacity,
                self.config.congestion_threshold,
            );

            if let Some(transition) = transition {
                match transition {
                    Transition::Raised { utilization } => {
                        self.metrics.congestion_raised += 1;
                        warn!(
                            "CONGESTION on {} port {}: {:.1}%",
                            dpid,
                            port,
                            utilization * 100.0
                        );
                    }
                    Transition::Cleared { utilization } => {
                        self.metrics.congestion_cleared += 1;
                        info!(
                            "Congestion cleared on {} port {} ({:.1}%)",
                            dpid,
                            port,
                            utilization * 100.0
                        );
                    }
                }
                out.alerts.push(CongestionAlert {
                    dpid: dpid.clone(),
                    port,
                    transition,
                });
            }
        }
    }

    fn on_poll_timer(&mut self, now: Instant, out: &mut Outcome) {
        if !self.schedule.fire(now) {
            debug!("Poll timer fired before its deadline; ignored");
            return;
        }
        self.metrics.polls += 1;

        let targets: Vec<DatapathId> = self.switches.connected_ids().cloned().collect();
        debug!("Requesting port stats from {} switches", targets.len());
        for dpid in targets {
            self.request_stats(dpid, out);
        }
    }

    fn install(&mut self, dpid: &DatapathId, rule: FlowRule, out: &mut Outcome) {
        self.metrics.flows_installed += 1;
        out.commands.push(Command::InstallFlow {
            dpid: dpid.clone(),
            rule,
        });
    }

    fn request_stats(&mut self, dpid: DatapathId, out: &mut Outcome) {
        self.metrics.stats_requests += 1;
        out.commands.push(Command::RequestPortStats { dpid });
    }

    /// Deadline of the next stats poll, if polling has started.
    pub fn next_poll(&self) -> Option<Instant> {
        self.schedule.next_deadline()
    }

    /// Stop periodic polling until the next connection-up.
    pub fn cancel_polling(&mut self) {
        self.schedule.cancel();
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn switches(&self) -> &SwitchRegistry {
        &self.switches
    }

    pub fn monitor(&self) -> &CongestionMonitor {
        &self.monitor
    }

    pub fn metrics(&self) -> &ControllerMetrics {
        &self.metrics
    }

    /// Snapshot of state sizes and counters.
    pub fn snapshot(&self) -> ControllerSnapshot {
        let learned_addresses = self
            .switches
            .ids()
            .filter_map(|id| self.switches.get(id))
            .map(|sw| sw.learning.len())
            .sum();

        ControllerSnapshot {
            name: self.config.name.clone(),
            switches: self.switches.len(),
            connected_switches: self.switches.connected_ids().count(),
            learned_addresses,
            congested_ports: self.monitor.congested().map(|k| k.to_string()).collect(),
            metrics: self.metrics.clone(),
        }
    }
}
