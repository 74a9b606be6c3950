// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/meshguard

//! Error types for the monitor core

use crate::sensors::DecodeError;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Raw line could not be parsed
    #[error("Malformed message {raw:?}: {reason}")]
    MalformedMessage {
        /// Trimmed input
        raw: String,
        /// Which rule it broke
        reason: &'static str,
    },

    /// Decoded address is outside the topology
    #[error("Out of range address: node {node}, sensor {sensor}")]
    OutOfRangeAddress {
        /// Node id
        node: u8,
        /// Sensor id
        sensor: u32,
    },

    /// Transport could not be opened or was lost
    #[error("Transport unavailable: {0}")]
    TransportUnavailable(String),

    /// Reset fire request for a generation that was never armed
    #[error("Scheduler race detected: reset generation {generation} was never issued")]
    SchedulerRaceDetected {
        /// Generation named by the fire request
        generation: u64,
    },

    /// Configuration rejected at startup
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Monitor constructed outside a tokio runtime
    #[error("No tokio runtime available")]
    NoRuntime,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<DecodeError> for Error {
    fn from(err: DecodeError) -> Self {
        match err {
            DecodeError::Malformed { raw, reason } => Error::MalformedMessage { raw, reason },
            DecodeError::OutOfRange { node, sensor } => Error::OutOfRangeAddress { node, sensor },
        }
    }
}
