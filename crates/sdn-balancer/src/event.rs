// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Events consumed from, and commands issued to, the switch transport.

use crate::congestion::CongestionAlert;
use crate::flow::FlowRule;
use crate::stats::PortSample;
use crate::types::{DatapathId, PortNo};
use serde::{Deserialize, Serialize};

/// Inbound event from the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerEvent {
    /// A switch completed its handshake.
    ConnectionUp { dpid: DatapathId },

    /// A switch connection went away.
    ConnectionDown { dpid: DatapathId },

    /// A frame missed the flow table and was sent to the controller.
    PacketIn {
        dpid: DatapathId,
        in_port: PortNo,
        data: Vec<u8>,
    },

    /// Reply to a port stats request.
    PortStatsReceived {
        dpid: DatapathId,
        stats: Vec<PortSample>,
    },

    /// The stats poll deadline elapsed.
    PollTimerFired,
}

impl ControllerEvent {
    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ConnectionUp { .. } => "connection_up",
            Self::ConnectionDown { .. } => "connection_down",
            Self::PacketIn { .. } => "packet_in",
            Self::PortStatsReceived { .. } => "port_stats_received",
            Self::PollTimerFired => "poll_timer_fired",
        }
    }
}

/// Outbound command for the transport. Commands are fire-and-forget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    InstallFlow {
        dpid: DatapathId,
        rule: FlowRule,
    },

    SendPacket {
        dpid: DatapathId,
        out_port: PortNo,
        in_port: PortNo,
        data: Vec<u8>,
    },

    FloodPacket {
        dpid: DatapathId,
        exclude_in_port: PortNo,
        data: Vec<u8>,
    },

    RequestPortStats { dpid: DatapathId },
}

/// Everything the controller emits: commands for switches and congestion alerts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Output {
    Command(Command),
    Alert(CongestionAlert),
}

/// Result of handling one event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outcome {
    pub commands: Vec<Command>,
    pub alerts: Vec<CongestionAlert>,
}

impl Outcome {
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty() && self.alerts.is_empty()
    }

    /// Flatten into outputs, commands first.
    pub fn into_outputs(self) -> impl Iterator<Item = Output> {
        self.commands
            .into_iter()
            .map(Output::Command)
            .chain(self.alerts.into_iter().map(Output::Alert))
    }
}
