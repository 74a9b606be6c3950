// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/meshguard

//! Decoder for the numeric line protocol spoken by the mesh gateway
//!
//! A frame is a run of ASCII digits: the first digit is the node id and the
//! rest is the sensor id. Sensor `0` is the node's all-clear heartbeat.
//!
//! ```text
//! "70"  -> node 7, all clear
//! "32"  -> node 3, sensor 2 triggered
//! "312" -> node 3, sensor 12 triggered
//! ```

use super::{SensorEvent, Topology};

/// Why a raw line was dropped
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// Not a numeric frame
    #[error("malformed message {raw:?}: {reason}")]
    Malformed {
        /// Trimmed input
        raw: String,
        /// Which rule it broke
        reason: &'static str,
    },

    /// Well-formed, but not a sensor in the topology
    #[error("address out of range: node {node}, sensor {sensor}")]
    OutOfRange {
        /// Decoded node id
        node: u8,
        /// Decoded sensor id
        sensor: u32,
    },
}

/// Decode one transport line against the topology
pub fn decode(raw: &str, topology: &Topology) -> Result<SensorEvent, DecodeError> {
    let line = raw.trim();
    let malformed = |reason| DecodeError::Malformed { raw: line.to_string(), reason };

    if line.is_empty() {
        return Err(malformed("empty line"));
    }
    if !line.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed("not a numeric frame"));
    }
    if line.len() < 2 {
        return Err(malformed("missing sensor id"));
    }

    // All bytes are ASCII digits, so splitting at 1 is on a char boundary
    let (node_part, sensor_part) = line.split_at(1);
    let node = node_part.as_bytes()[0] - b'0';
    let sensor: u32 = sensor_part
        .parse()
        .map_err(|_| malformed("sensor id overflow"))?;

    let event = SensorEvent {
        node,
        sensor,
        triggered: sensor != 0,
    };

    check_address(&event, topology)?;
    Ok(event)
}

/// Range check shared by the line decoder and typed ingestion. An all-clear
/// only needs a known node; a trigger needs a known sensor.
pub fn check_address(event: &SensorEvent, topology: &Topology) -> Result<(), DecodeError> {
    let in_range = if event.triggered {
        topology.contains(event.key())
    } else {
        topology.contains_node(event.node)
    };
    if !in_range {
        return Err(DecodeError::OutOfRange {
            node: event.node,
            sensor: event.sensor,
        });
    }
    Ok(())
}
