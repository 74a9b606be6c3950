// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/meshguard

//! Configuration module

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::error::Error;
use crate::sensors::Topology;

/// Main application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level
    pub log_level: String,

    /// Mesh layout
    pub topology: TopologyConfig,

    /// Debounce, heartbeat and auto-reset timing
    pub detection: DetectionConfig,

    /// Where raw lines come from
    pub transport: TransportConfig,

    /// Append-only record of confirmed intrusions
    pub intrusion_log: IntrusionLogConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            topology: TopologyConfig::default(),
            detection: DetectionConfig::default(),
            transport: TransportConfig::default(),
            intrusion_log: IntrusionLogConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Load or create default configuration
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            let config = Self::default();

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            config.save(path)?;
            Ok(config)
        }
    }

    /// Get configuration directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("meshguard"))
            .unwrap_or_else(|| PathBuf::from("./config"))
    }

    /// Get default configuration path
    pub fn default_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Reject settings the monitor cannot run with
    pub fn validate(&self) -> std::result::Result<(), Error> {
        self.topology.build()?;

        let d = &self.detection;
        if d.confirmation_threshold == 0 {
            return Err(Error::InvalidConfig("confirmation_threshold must be at least 1".into()));
        }
        if d.heartbeat_period_ms == 0 {
            return Err(Error::InvalidConfig("heartbeat_period_ms must be positive".into()));
        }
        if d.auto_reset_delay_ms == 0 {
            return Err(Error::InvalidConfig("auto_reset_delay_ms must be positive".into()));
        }
        if d.heartbeat_grace_sweeps == 0 {
            return Err(Error::InvalidConfig("heartbeat_grace_sweeps must be at least 1".into()));
        }
        if self.transport.queue_capacity == 0 {
            return Err(Error::InvalidConfig("queue_capacity must be at least 1".into()));
        }
        Ok(())
    }
}

/// Mesh layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopologyConfig {
    /// Nodes are numbered `1..=node_count`
    pub node_count: u8,

    /// Sensors on each node, numbered from 1
    pub sensors_per_node: u32,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            node_count: 9,
            sensors_per_node: 4,
        }
    }
}

impl TopologyConfig {
    /// Validated topology for these counts
    pub fn build(&self) -> std::result::Result<Topology, Error> {
        Topology::new(self.node_count, self.sensors_per_node)
    }
}

/// Detection timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Consecutive triggers needed to confirm an intrusion
    pub confirmation_threshold: u32,

    /// Heartbeat sweep period in milliseconds
    pub heartbeat_period_ms: u64,

    /// Delay after the latest confirmed intrusion before everything resets
    pub auto_reset_delay_ms: u64,

    /// Silent sweeps in a row before a node is marked offline
    pub heartbeat_grace_sweeps: u32,

    /// Notification bus depth per observer
    pub event_capacity: usize,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            confirmation_threshold: 3,
            heartbeat_period_ms: 5_000,
            auto_reset_delay_ms: 10_000,
            heartbeat_grace_sweeps: 1,
            event_capacity: 1024,
        }
    }
}

impl DetectionConfig {
    /// Sweep period as a `Duration`
    pub fn heartbeat_period(&self) -> Duration {
        Duration::from_millis(self.heartbeat_period_ms)
    }

    /// Reset delay as a `Duration`
    pub fn auto_reset_delay(&self) -> Duration {
        Duration::from_millis(self.auto_reset_delay_ms)
    }
}

/// Where frames come from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Gateway radio on a serial line
    Serial,
    /// Lines piped on standard input
    Stdin,
    /// Built-in mesh simulator
    Simulator,
}

/// Transport configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Active transport
    pub kind: TransportKind,

    /// Serial device of the gateway radio
    pub serial_port: String,

    /// Serial baud rate
    pub baud_rate: u32,

    /// Serial read timeout in milliseconds
    pub read_timeout_ms: u64,

    /// Bounded ingest queue depth
    pub queue_capacity: usize,

    /// Mean gap between simulated frames
    pub simulator_interval_ms: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            kind: TransportKind::Serial,
            serial_port: "/dev/ttyUSB0".to_string(),
            baud_rate: 115_200,
            read_timeout_ms: 1_000,
            queue_capacity: 256,
            simulator_interval_ms: 200,
        }
    }
}

/// Intrusion log line format
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// `Intrusion detected at Node N, Sensor S - timestamp`
    Text,
    /// One JSON object per line
    Json,
}

/// Intrusion log configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntrusionLogConfig {
    /// Write confirmed intrusions to disk
    pub enabled: bool,
    /// Append-only log file
    pub path: PathBuf,
    /// Line format
    pub format: LogFormat,
}

impl Default for IntrusionLogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: PathBuf::from("intrusion_log.txt"),
            format: LogFormat::Text,
        }
    }
}
