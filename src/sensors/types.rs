// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/meshguard

//! Sensor identity, status and per-sensor record types

use std::fmt;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// Identity of one monitored point on the mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SensorKey {
    /// Node id, the first wire digit
    pub node: u8,
    /// Sensor id on that node
    pub sensor: u32,
}

impl SensorKey {
    /// Key for `sensor` on `node`
    pub fn new(node: u8, sensor: u32) -> Self {
        Self { node, sensor }
    }
}

impl fmt::Display for SensorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node {} Sensor {}", self.node, self.sensor)
    }
}

/// Externally visible classification of a sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SensorStatus {
    /// Nothing received from the node since startup
    Unknown,
    /// Last heard all-clear, or restored by auto-reset
    Normal,
    /// Confirmed by consecutive triggers
    Intrusion,
    /// Node missed its heartbeat window
    Offline,
}

impl SensorStatus {
    /// Console label, as shown on the field display
    pub fn label(&self) -> &'static str {
        match self {
            SensorStatus::Unknown => "Unknown",
            SensorStatus::Normal => "OK",
            SensorStatus::Intrusion => "Intrusion",
            SensorStatus::Offline => "Out",
        }
    }
}

impl fmt::Display for SensorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A decoded transport message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorEvent {
    /// Node id, the first wire digit
    pub node: u8,
    /// 0 for an all-clear heartbeat
    pub sensor: u32,
    /// False for an all-clear
    pub triggered: bool,
}

impl SensorEvent {
    /// Triggered reading from a real sensor
    pub fn trigger(node: u8, sensor: u32) -> Self {
        Self { node, sensor, triggered: true }
    }

    /// Node-wide all-clear
    pub fn all_clear(node: u8) -> Self {
        Self { node, sensor: 0, triggered: false }
    }

    /// Sensor this event addresses
    pub fn key(&self) -> SensorKey {
        SensorKey::new(self.node, self.sensor)
    }
}

/// Mutable state kept for every sensor in the topology
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorRecord {
    /// Current classification
    pub status: SensorStatus,
    /// Debounce counter
    pub consecutive_triggers: u32,
    /// Last message of any kind from the owning node
    pub last_seen: Option<Instant>,
}

impl Default for SensorRecord {
    fn default() -> Self {
        Self {
            status: SensorStatus::Unknown,
            consecutive_triggers: 0,
            last_seen: None,
        }
    }
}

/// Liveness bookkeeping for one node
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeHeartbeat {
    /// Set by any all-clear in the current window
    pub saw_activity: bool,
    /// Silent sweeps in a row
    pub missed_sweeps: u32,
}
