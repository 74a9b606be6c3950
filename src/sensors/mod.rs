//! Sensor module - mesh topology, wire decoding and the state store

mod types;
mod topology;
mod decoder;
mod store;
mod simulator;

pub use types::{NodeHeartbeat, SensorEvent, SensorKey, SensorRecord, SensorStatus};
pub use topology::{Topology, MAX_ADDRESSABLE_NODE};
pub use decoder::{check_address, decode, DecodeError};
pub use store::{SensorStore, Transition};
pub use simulator::MeshSimulator;
