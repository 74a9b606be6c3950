// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/meshguard

//! MeshGuard - Wireless Sensor Mesh Intrusion Monitor
//!
//! Turns the noisy stream of numeric frames coming off a LoRa sensor mesh
//! into one classified status per sensor:
//! - 3-of-N debounce before an intrusion is confirmed
//! - node-wide all-clear and heartbeat-loss detection
//! - a single re-armable auto-reset after the latest intrusion
//! - asynchronous observers for displays, logs and alerts
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   bounded    ┌──────────────────────────────────────┐
//! │  Transport   │ ──queue────▶ │               Monitor                │
//! │ serial/stdin │              │  decode → debounce ─┐                │
//! │  simulator   │              │                     ▼                │
//! └──────────────┘              │   ┌──────── state mutex ────────┐    │
//!                               │   │ SensorStore  AutoReset slot │    │
//!          heartbeat interval ─▶│   └─────────────────────────────┘    │
//!          reset timer task   ─▶│                     │                │
//!                               └─────────────────────┼────────────────┘
//!                                                     ▼
//!                                               ┌──────────┐
//!                                               │ EventBus │
//!                                               └──────────┘
//!                                  ↓               ↓              ↓
//!                            LoggingObserver  IntrusionLog   console grid
//! ```

#![warn(missing_docs)]

/// Monitor engine, scheduling and notification
pub mod core;
/// Topology, wire decoding and sensor state
pub mod sensors;
/// Debounce and heartbeat rules
pub mod detection;
/// Transports and the intrusion log
pub mod streaming;
/// TOML configuration
pub mod config;
/// Error types
pub mod error;
/// Console rendering
pub mod ui;

// Re-exports for convenience
pub use config::Config;
pub use core::{EventBus, Monitor, MonitorEvent, Observer};
pub use error::{Error, Result};
pub use sensors::{SensorEvent, SensorKey, SensorStatus, Topology};

/// MeshGuard version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// MeshGuard name
pub const NAME: &str = "MeshGuard";

/// Build info
pub fn build_info() -> BuildInfo {
    BuildInfo {
        version: VERSION.to_string(),
        target: std::env::consts::ARCH.to_string(),
        os: std::env::consts::OS.to_string(),
        features: enabled_features(),
    }
}

/// Build information
#[derive(Debug, Clone)]
pub struct BuildInfo {
    /// Version string
    pub version: String,
    /// Target architecture
    pub target: String,
    /// Operating system
    pub os: String,
    /// Enabled features
    pub features: Vec<String>,
}

fn enabled_features() -> Vec<String> {
    #[allow(unused_mut)]
    let mut features = vec![];

    #[cfg(feature = "serial")]
    features.push("serial".to_string());

    features
}
