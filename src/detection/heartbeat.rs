// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/meshguard

//! Heartbeat sweep - demotes silent nodes to offline

use tracing::{debug, warn};

use crate::sensors::{SensorStore, Transition};

/// What one sweep changed
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SweepOutcome {
    /// Sensors that went offline
    pub transitions: Vec<Transition>,
    /// Nodes that went offline on this sweep
    pub offline_nodes: Vec<u8>,
}

/// Periodic liveness sweep over the store
#[derive(Debug, Clone, Copy)]
pub struct HeartbeatMonitor {
    grace_sweeps: u32,
}

impl HeartbeatMonitor {
    /// `grace_sweeps` silent windows in a row before a node is marked offline
    pub fn new(grace_sweeps: u32) -> Self {
        Self { grace_sweeps: grace_sweeps.max(1) }
    }

    /// Close the current window for every node. The caller holds the store lock.
    pub fn sweep(&self, store: &mut SensorStore) -> SweepOutcome {
        let mut outcome = SweepOutcome::default();
        let nodes: Vec<u8> = store.topology().nodes().collect();

        for node in nodes {
            let Some(hb) = store.heartbeat_mut(node) else {
                continue;
            };

            let silent = if hb.saw_activity {
                hb.missed_sweeps = 0;
                false
            } else {
                hb.missed_sweeps = hb.missed_sweeps.saturating_add(1);
                hb.missed_sweeps >= self.grace_sweeps
            };
            hb.saw_activity = false;

            if silent {
                let transitions = store.mark_node_offline(node);
                if !transitions.is_empty() {
                    warn!("Node {} missed its heartbeat, marking sensors offline", node);
                    outcome.offline_nodes.push(node);
                    outcome.transitions.extend(transitions);
                }
            }
        }

        debug!(offline = outcome.offline_nodes.len(), "Heartbeat sweep complete");
        outcome
    }
}
