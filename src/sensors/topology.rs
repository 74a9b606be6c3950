// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/meshguard

//! Fixed node/sensor layout of the mesh

use tracing::warn;

use super::SensorKey;
use crate::error::{Error, Result};

/// Highest node id the single-digit wire encoding can address
pub const MAX_ADDRESSABLE_NODE: u8 = 9;

/// Valid node ids are `1..=node_count`, sensor ids `1..=sensors_per_node`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Topology {
    node_count: u8,
    sensors_per_node: u32,
}

impl Topology {
    /// Nodes `1..=node_count`, each with sensors `1..=sensors_per_node`
    pub fn new(node_count: u8, sensors_per_node: u32) -> Result<Self> {
        if node_count == 0 {
            return Err(Error::InvalidConfig("node_count must be at least 1".into()));
        }
        if sensors_per_node == 0 {
            return Err(Error::InvalidConfig("sensors_per_node must be at least 1".into()));
        }
        if node_count > MAX_ADDRESSABLE_NODE {
            warn!(
                "Topology has {} nodes but only nodes 1..={} can be addressed on the wire",
                node_count, MAX_ADDRESSABLE_NODE
            );
        }
        Ok(Self { node_count, sensors_per_node })
    }

    /// Number of nodes
    pub fn node_count(&self) -> u8 {
        self.node_count
    }

    /// Sensors on each node
    pub fn sensors_per_node(&self) -> u32 {
        self.sensors_per_node
    }

    /// True for a node id in `1..=node_count`
    pub fn contains_node(&self, node: u8) -> bool {
        (1..=self.node_count).contains(&node)
    }

    /// True for a real sensor; sensor 0 is never a member
    pub fn contains(&self, key: SensorKey) -> bool {
        self.contains_node(key.node) && (1..=self.sensors_per_node).contains(&key.sensor)
    }

    /// Node ids in ascending order
    pub fn nodes(&self) -> impl Iterator<Item = u8> {
        1..=self.node_count
    }

    /// Keys of every sensor on `node`
    pub fn sensors_of(&self, node: u8) -> impl Iterator<Item = SensorKey> {
        (1..=self.sensors_per_node).map(move |sensor| SensorKey::new(node, sensor))
    }

    /// Every key, node-major
    pub fn keys(&self) -> impl Iterator<Item = SensorKey> + '_ {
        self.nodes().flat_map(move |node| self.sensors_of(node))
    }

    /// Total number of sensors
    pub fn len(&self) -> usize {
        self.node_count as usize * self.sensors_per_node as usize
    }

    /// Never true for a validated topology
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
