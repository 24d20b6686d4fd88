// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! SDN Load-Balancer Controller
//!
//! Reactive L2 learning controller for OpenFlow 1.0 style switches, with
//! periodic port statistics polling and link congestion detection.
//!
//! # Features
//!
//! - **MAC Learning**: Per-switch address to port tables, latest observation wins
//! - **Forwarding**: Unicast to learned ports with flow installation, flood otherwise
//! - **Stats Collection**: Byte-rate derivation from cumulative port counters
//! - **Congestion Monitoring**: Edge-triggered alerts on link utilization
//!
//! # Quick Start
//!
//! ```bash
//! # JSON-lines events on stdin, commands and alerts on stdout
//! sdn-balancer run
//!
//! # Deterministic replay of a recorded trace
//! sdn-balancer replay --input trace.jsonl
//!
//! # Using config file
//! sdn-balancer --config controller.toml run
//! ```
//!
//! # Configuration File
//!
//! ```toml
//! name = "lab-controller"
//! monitoring_interval_secs = 5
//! congestion_threshold = 0.7
//! link_capacity_mbps = 100.0
//! flow_idle_timeout_secs = 10
//! flow_hard_timeout_secs = 30
//! ```
//!
//! # Library Use
//!
//! ```
//! use sdn_balancer::{Command, Controller, ControllerConfig, ControllerEvent};
//! use std::time::Instant;
//!
//! let mut controller = Controller::new(ControllerConfig::default()).unwrap();
//! let outcome = controller.handle(
//!     ControllerEvent::ConnectionUp { dpid: "s1".into() },
//!     Instant::now(),
//! );
//! assert!(matches!(outcome.commands[0], Command::InstallFlow { .. }));
//! ```

pub mod config;
pub mod congestion;
pub mod controller;
pub mod event;
pub mod flow;
pub mod forwarding;
pub mod learning;
pub mod packet;
pub mod poller;
pub mod replay;
pub mod runtime;
pub mod stats;
pub mod switch;
pub mod topology;
pub mod types;

pub use config::{ConfigError, ControllerConfig};
pub use congestion::{CongestionAlert, CongestionMonitor, Transition};
pub use controller::{Controller, ControllerMetrics, ControllerSnapshot};
pub use event::{Command, ControllerEvent, Outcome, Output};
pub use flow::{Action, FlowMatch, FlowPolicy, FlowRule};
pub use forwarding::Decision;
pub use learning::LearningTable;
pub use packet::{FrameBuilder, FrameError, PacketDescriptor};
pub use replay::{replay, ReplaySummary, TraceEvent};
pub use runtime::{ControllerError, ControllerHandle};
pub use stats::{PortSample, Rates};
pub use topology::{Topology, TopologyError};
pub use types::{DatapathId, MacAddr, PortKey, PortNo};
