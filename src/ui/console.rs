// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/meshguard

//! Plain-text status grid, one row per node

use std::collections::BTreeMap;
use std::fmt::Write;

use crate::sensors::{SensorKey, SensorStatus, Topology};

const RESET: &str = "\x1b[0m";

/// ANSI colour used for a status cell
pub fn status_color(status: SensorStatus) -> &'static str {
    match status {
        SensorStatus::Normal => "\x1b[32m",
        SensorStatus::Intrusion => "\x1b[31m",
        SensorStatus::Offline => "\x1b[33m",
        SensorStatus::Unknown => "\x1b[90m",
    }
}

/// Render a snapshot from `Monitor::get_all_statuses`
pub fn render_grid(
    topology: &Topology,
    statuses: &BTreeMap<SensorKey, SensorStatus>,
    ansi: bool,
) -> String {
    let mut out = String::new();

    let _ = write!(out, "{:<8}", "");
    for sensor in 1..=topology.sensors_per_node() {
        let _ = write!(out, " {:<11}", format!("Sensor {}", sensor));
    }
    out.push('\n');

    for node in topology.nodes() {
        let _ = write!(out, "{:<8}", format!("Node {}", node));
        for key in topology.sensors_of(node) {
            let status = statuses.get(&key).copied().unwrap_or(SensorStatus::Unknown);
            let cell = format!("{:<11}", status.label());
            if ansi {
                let _ = write!(out, " {}{}{}", status_color(status), cell, RESET);
            } else {
                let _ = write!(out, " {}", cell);
            }
        }
        out.push('\n');
    }

    out
}
