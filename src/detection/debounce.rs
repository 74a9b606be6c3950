// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/meshguard

//! Debounce/confirmation rule
//!
//! A single triggering report is not enough to raise an alarm: radio noise or
//! someone brushing past a detector produces one-off frames. A sensor is only
//! promoted to `Intrusion` after `threshold` consecutive triggers for the same
//! key, with no all-clear from its node in between.

use tokio::time::Instant;
use tracing::{debug, trace};

use crate::sensors::{SensorEvent, SensorKey, SensorStatus, SensorStore, Transition};

/// Result of applying one event to the store
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Applied {
    /// Status changes, in application order
    pub transitions: Vec<Transition>,
    /// Set when this event completed a confirmation
    pub confirmed: Option<SensorKey>,
}

/// Consecutive-trigger confirmation
#[derive(Debug, Clone, Copy)]
pub struct DebounceEngine {
    threshold: u32,
}

impl DebounceEngine {
    /// Threshold is clamped to at least 1
    pub fn new(threshold: u32) -> Self {
        Self { threshold: threshold.max(1) }
    }

    /// Triggers needed to confirm
    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Apply a decoded event. The caller holds the store lock.
    pub fn apply(&self, store: &mut SensorStore, event: SensorEvent, now: Instant) -> Applied {
        store.touch_node(event.node, now);

        if !event.triggered {
            let transitions = store.node_all_clear(event.node);
            trace!(node = event.node, changed = transitions.len(), "All clear");
            return Applied { transitions, confirmed: None };
        }

        let key = event.key();
        let Some(count) = store.bump_trigger(key) else {
            return Applied::default();
        };

        if count < self.threshold {
            debug!("{} trigger {}/{}", key, count, self.threshold);
            return Applied::default();
        }

        store.clear_trigger(key);
        let transitions = store
            .set_status(key, SensorStatus::Intrusion)
            .into_iter()
            .collect();

        Applied {
            transitions,
            confirmed: Some(key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::Topology;

    fn setup() -> (DebounceEngine, SensorStore) {
        (
            DebounceEngine::new(3),
            SensorStore::new(Topology::new(9, 4).unwrap()),
        )
    }

    #[test]
    fn test_confirms_on_third_trigger_only() {
        let (engine, mut store) = setup();
        let now = Instant::now();
        let key = SensorKey::new(3, 2);

        for _ in 0..2 {
            let applied = engine.apply(&mut store, SensorEvent::trigger(3, 2), now);
            assert!(applied.confirmed.is_none());
            assert_eq!(store.status(key), Some(SensorStatus::Unknown));
        }

        let applied = engine.apply(&mut store, SensorEvent::trigger(3, 2), now);
        assert_eq!(applied.confirmed, Some(key));
        assert_eq!(
            applied.transitions,
            vec![Transition { key, old: SensorStatus::Unknown, new: SensorStatus::Intrusion }]
        );
        assert_eq!(store.record(key).unwrap().consecutive_triggers, 0);
    }

    #[test]
    fn test_all_clear_breaks_the_run() {
        let (engine, mut store) = setup();
        let now = Instant::now();

        engine.apply(&mut store, SensorEvent::trigger(3, 2), now);
        engine.apply(&mut store, SensorEvent::trigger(3, 2), now);
        engine.apply(&mut store, SensorEvent::all_clear(3), now);
        let applied = engine.apply(&mut store, SensorEvent::trigger(3, 2), now);

        assert!(applied.confirmed.is_none());
        assert_eq!(store.status(SensorKey::new(3, 2)), Some(SensorStatus::Normal));
        assert_eq!(store.record(SensorKey::new(3, 2)).unwrap().consecutive_triggers, 1);
    }

    #[test]
    fn test_sibling_triggers_keep_separate_counts() {
        let (engine, mut store) = setup();
        let now = Instant::now();

        engine.apply(&mut store, SensorEvent::trigger(4, 1), now);
        engine.apply(&mut store, SensorEvent::trigger(4, 2), now);
        engine.apply(&mut store, SensorEvent::trigger(4, 1), now);
        let applied = engine.apply(&mut store, SensorEvent::trigger(4, 1), now);

        assert_eq!(applied.confirmed, Some(SensorKey::new(4, 1)));
        assert_eq!(store.record(SensorKey::new(4, 2)).unwrap().consecutive_triggers, 1);
    }

    #[test]
    fn test_reconfirm_while_in_intrusion() {
        let (engine, mut store) = setup();
        let now = Instant::now();

        for _ in 0..3 {
            engine.apply(&mut store, SensorEvent::trigger(1, 1), now);
        }
        let mut last = Applied::default();
        for _ in 0..3 {
            last = engine.apply(&mut store, SensorEvent::trigger(1, 1), now);
        }

        assert_eq!(last.confirmed, Some(SensorKey::new(1, 1)));
        assert!(last.transitions.is_empty());
    }

    #[test]
    fn test_all_clear_is_idempotent() {
        let (engine, mut store) = setup();
        let now = Instant::now();

        engine.apply(&mut store, SensorEvent::trigger(2, 3), now);
        let first = engine.apply(&mut store, SensorEvent::all_clear(2), now);
        let snapshot: Vec<_> = store.topology().sensors_of(2).map(|k| store.record(k).cloned()).collect();

        let second = engine.apply(&mut store, SensorEvent::all_clear(2), now);
        let again: Vec<_> = store.topology().sensors_of(2).map(|k| store.record(k).cloned()).collect();

        assert_eq!(first.transitions.len(), 4);
        assert!(second.transitions.is_empty());
        assert_eq!(snapshot, again);
    }

    #[test]
    fn test_any_message_updates_last_seen() {
        let (engine, mut store) = setup();
        let now = Instant::now();

        engine.apply(&mut store, SensorEvent::trigger(6, 1), now);
        for key in store.topology().sensors_of(6).collect::<Vec<_>>() {
            assert_eq!(store.record(key).unwrap().last_seen, Some(now));
        }
        // Triggers are not liveness
        assert!(!store.heartbeat(6).unwrap().saw_activity);
    }
}
