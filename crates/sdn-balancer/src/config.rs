// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Controller configuration.
//!
//! Supports both programmatic and file-based (TOML) configuration.

use crate::flow::FlowPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Controller configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Controller name (for identification).
    #[serde(default = "default_name")]
    pub name: String,

    /// Port stats polling interval (seconds).
    #[serde(default = "default_monitoring_interval")]
    pub monitoring_interval_secs: u64,

    /// Utilization ratio above which a port is congested.
    #[serde(default = "default_congestion_threshold")]
    pub congestion_threshold: f64,

    /// Assumed link capacity (Mbit/s, 1 Mbit = 1024 * 1024 bits).
    #[serde(default = "default_link_capacity_mbps")]
    pub link_capacity_mbps: f64,

    /// Idle timeout of learned unicast rules (seconds).
    #[serde(default = "default_idle_timeout")]
    pub flow_idle_timeout_secs: u64,

    /// Hard timeout of learned unicast rules (seconds).
    #[serde(default = "default_hard_timeout")]
    pub flow_hard_timeout_secs: u64,

    /// Utilization above which per-port samples are logged at info level.
    #[serde(default = "default_utilization_log_floor")]
    pub utilization_log_floor: f64,

    /// Purge learned state and counters when a switch disconnects.
    #[serde(default = "default_true")]
    pub evict_on_disconnect: bool,

    /// Log level.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_name() -> String {
    "sdn-balancer".to_string()
}

fn default_monitoring_interval() -> u64 {
    5
}

fn default_congestion_threshold() -> f64 {
    0.7
}

fn default_link_capacity_mbps() -> f64 {
    100.0
}

fn default_idle_timeout() -> u64 {
    10
}

fn default_hard_timeout() -> u64 {
    30
}

fn default_utilization_log_floor() -> f64 {
    0.05
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            monitoring_interval_secs: default_monitoring_interval(),
            congestion_threshold: default_congestion_threshold(),
            link_capacity_mbps: default_link_capacity_mbps(),
            flow_idle_timeout_secs: default_idle_timeout(),
            flow_hard_timeout_secs: default_hard_timeout(),
            utilization_log_floor: default_utilization_log_floor(),
            evict_on_disconnect: true,
            log_level: default_log_level(),
        }
    }
}

impl ControllerConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.monitoring_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "monitoring_interval_secs must be at least 1".into(),
            ));
        }

        if !(self.congestion_threshold > 0.0 && self.congestion_threshold.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "congestion_threshold must be a positive ratio (got {})",
                self.congestion_threshold
            )));
        }

        if !(self.link_capacity_mbps > 0.0 && self.link_capacity_mbps.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "link_capacity_mbps must be positive (got {})",
                self.link_capacity_mbps
            )));
        }

        if self.flow_idle_timeout_secs > u64::from(u16::MAX)
            || self.flow_hard_timeout_secs > u64::from(u16::MAX)
        {
            return Err(ConfigError::Invalid(
                "flow timeouts must fit in 16 bits".into(),
            ));
        }

        if self.flow_hard_timeout_secs != 0
            && self.flow_idle_timeout_secs > self.flow_hard_timeout_secs
        {
            return Err(ConfigError::Invalid(format!(
                "flow_idle_timeout_secs ({}) exceeds flow_hard_timeout_secs ({})",
                self.flow_idle_timeout_secs, self.flow_hard_timeout_secs
            )));
        }

        if self.utilization_log_floor < 0.0 {
            return Err(ConfigError::Invalid(
                "utilization_log_floor must not be negative".into(),
            ));
        }

        Ok(())
    }

    /// Stats polling interval.
    pub fn monitoring_interval(&self) -> Duration {
        Duration::from_secs(self.monitoring_interval_secs)
    }

    /// Link capacity in bytes per second.
    pub fn link_capacity_bytes_per_sec(&self) -> f64 {
        self.link_capacity_mbps * 1024.0 * 1024.0 / 8.0
    }

    /// Timeouts for learned unicast rules.
    pub fn flow_policy(&self) -> FlowPolicy {
        FlowPolicy::new(
            Duration::from_secs(self.flow_idle_timeout_secs),
            Duration::from_secs(self.flow_hard_timeout_secs),
        )
    }
}
