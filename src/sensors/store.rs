// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/meshguard

//! Sensor state store - single owner of every per-sensor and per-node record
//!
//! The store does no locking of its own. It lives inside the monitor's
//! state mutex and every mutation returns the status transitions it caused
//! so the caller can publish them after the lock is released.

use std::collections::BTreeMap;
use tokio::time::Instant;

use super::{NodeHeartbeat, SensorKey, SensorRecord, SensorStatus, Topology};

/// A status change produced by a store mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// Affected sensor
    pub key: SensorKey,
    /// Status before
    pub old: SensorStatus,
    /// Status after
    pub new: SensorStatus,
}

/// Per-sensor records and per-node heartbeats for a whole topology
pub struct SensorStore {
    topology: Topology,
    records: BTreeMap<SensorKey, SensorRecord>,
    heartbeats: BTreeMap<u8, NodeHeartbeat>,
}

impl SensorStore {
    /// Every key starts `Unknown` with a zero counter
    pub fn new(topology: Topology) -> Self {
        let records = topology.keys().map(|k| (k, SensorRecord::default())).collect();
        let heartbeats = topology.nodes().map(|n| (n, NodeHeartbeat::default())).collect();
        Self { topology, records, heartbeats }
    }

    /// Layout the store was built for
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Record for `key`, `None` outside the topology
    pub fn record(&self, key: SensorKey) -> Option<&SensorRecord> {
        self.records.get(&key)
    }

    /// Status for `key`, `None` outside the topology
    pub fn status(&self, key: SensorKey) -> Option<SensorStatus> {
        self.records.get(&key).map(|r| r.status)
    }

    /// Status of every key, ordered by node then sensor
    pub fn statuses(&self) -> BTreeMap<SensorKey, SensorStatus> {
        self.records.iter().map(|(k, r)| (*k, r.status)).collect()
    }

    /// Heartbeat bookkeeping for `node`
    pub fn heartbeat(&self, node: u8) -> Option<&NodeHeartbeat> {
        self.heartbeats.get(&node)
    }

    pub(crate) fn heartbeat_mut(&mut self, node: u8) -> Option<&mut NodeHeartbeat> {
        self.heartbeats.get_mut(&node)
    }

    /// Record that the node said something, triggered or not
    pub(crate) fn touch_node(&mut self, node: u8, now: Instant) {
        for key in self.topology.sensors_of(node) {
            if let Some(record) = self.records.get_mut(&key) {
                record.last_seen = Some(now);
            }
        }
    }

    /// Increment the debounce counter, returning the new count
    pub(crate) fn bump_trigger(&mut self, key: SensorKey) -> Option<u32> {
        let record = self.records.get_mut(&key)?;
        record.consecutive_triggers += 1;
        Some(record.consecutive_triggers)
    }

    pub(crate) fn clear_trigger(&mut self, key: SensorKey) {
        if let Some(record) = self.records.get_mut(&key) {
            record.consecutive_triggers = 0;
        }
    }

    pub(crate) fn set_status(&mut self, key: SensorKey, status: SensorStatus) -> Option<Transition> {
        let record = self.records.get_mut(&key)?;
        let old = record.status;
        if old == status {
            return None;
        }
        record.status = status;
        Some(Transition { key, old, new: status })
    }

    /// Node-wide all clear: zero every counter, mark every sensor normal
    pub(crate) fn node_all_clear(&mut self, node: u8) -> Vec<Transition> {
        if let Some(hb) = self.heartbeats.get_mut(&node) {
            hb.saw_activity = true;
        }
        let keys: Vec<_> = self.topology.sensors_of(node).collect();
        keys.into_iter()
            .filter_map(|key| {
                self.clear_trigger(key);
                self.set_status(key, SensorStatus::Normal)
            })
            .collect()
    }

    pub(crate) fn mark_node_offline(&mut self, node: u8) -> Vec<Transition> {
        let keys: Vec<_> = self.topology.sensors_of(node).collect();
        keys.into_iter()
            .filter_map(|key| self.set_status(key, SensorStatus::Offline))
            .collect()
    }

    /// Every sensor back to normal with a zero counter
    pub(crate) fn reset_all(&mut self) -> Vec<Transition> {
        let mut transitions = Vec::new();
        for (key, record) in self.records.iter_mut() {
            record.consecutive_triggers = 0;
            if record.status != SensorStatus::Normal {
                transitions.push(Transition {
                    key: *key,
                    old: record.status,
                    new: SensorStatus::Normal,
                });
                record.status = SensorStatus::Normal;
            }
        }
        transitions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SensorStore {
        SensorStore::new(Topology::new(3, 4).unwrap())
    }

    #[test]
    fn test_every_key_has_a_record() {
        let store = store();
        assert_eq!(store.statuses().len(), 12);
        assert!(store.statuses().values().all(|s| *s == SensorStatus::Unknown));
        assert!(store.record(SensorKey::new(4, 1)).is_none());
    }

    #[test]
    fn test_all_clear_is_node_wide() {
        let mut store = store();
        store.bump_trigger(SensorKey::new(2, 1));
        store.bump_trigger(SensorKey::new(2, 3));
        store.bump_trigger(SensorKey::new(1, 1));

        let transitions = store.node_all_clear(2);
        assert_eq!(transitions.len(), 4);
        for key in store.topology().sensors_of(2).collect::<Vec<_>>() {
            let record = store.record(key).unwrap();
            assert_eq!(record.status, SensorStatus::Normal);
            assert_eq!(record.consecutive_triggers, 0);
        }
        assert!(store.heartbeat(2).unwrap().saw_activity);
        // Other nodes untouched
        assert_eq!(store.record(SensorKey::new(1, 1)).unwrap().consecutive_triggers, 1);
        assert!(!store.heartbeat(1).unwrap().saw_activity);
    }

    #[test]
    fn test_set_status_reports_only_changes() {
        let mut store = store();
        let key = SensorKey::new(1, 2);
        assert!(store.set_status(key, SensorStatus::Intrusion).is_some());
        assert!(store.set_status(key, SensorStatus::Intrusion).is_none());
    }

    #[test]
    fn test_reset_all() {
        let mut store = store();
        store.set_status(SensorKey::new(1, 1), SensorStatus::Intrusion);
        store.node_all_clear(2);
        store.bump_trigger(SensorKey::new(2, 2));

        let transitions = store.reset_all();
        // Node 2 was already normal
        assert_eq!(transitions.len(), 8);
        assert!(store.statuses().values().all(|s| *s == SensorStatus::Normal));
        assert_eq!(store.record(SensorKey::new(2, 2)).unwrap().consecutive_triggers, 0);
    }
}
