// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/meshguard

//! Monitor engine - the one place shared sensor state is mutated
//!
//! Three activities touch the store: ingestion (`submit`/`apply`), the
//! heartbeat sweep and the auto-reset fire. Each takes the state mutex once,
//! mutates, and publishes its notifications on the bus before releasing it.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use chrono::Utc;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, trace, warn};

use super::event_bus::{EventBus, Intrusion, MonitorEvent, RejectedMessage, StatusChange};
use super::scheduler::AutoResetScheduler;
use super::MonitorStats;
use crate::config::{Config, DetectionConfig};
use crate::detection::{DebounceEngine, HeartbeatMonitor};
use crate::error::{Error, Result};
use crate::sensors::{check_address, decode, DecodeError, SensorEvent, SensorKey, SensorRecord, SensorStatus, SensorStore, Topology, Transition};

/// Everything guarded by the state lock
struct MonitorState {
    store: SensorStore,
    reset: AutoResetScheduler,
}

#[derive(Default)]
struct Counters {
    accepted: AtomicU64,
    rejected: AtomicU64,
    intrusions: AtomicU64,
    auto_resets: AtomicU64,
    sweeps: AtomicU64,
}

struct Inner {
    topology: Topology,
    debounce: DebounceEngine,
    heartbeat: HeartbeatMonitor,
    heartbeat_period: Duration,
    auto_reset_delay: Duration,
    state: Mutex<MonitorState>,
    event_bus: Arc<EventBus>,
    counters: Counters,
    runtime: Handle,
}

/// Cloneable handle to the sensor monitor
#[derive(Clone)]
pub struct Monitor {
    inner: Arc<Inner>,
}

impl Monitor {
    /// Must be called from inside a tokio runtime; the handle is captured so
    /// `submit` can later be called from any thread.
    pub fn new(topology: Topology, detection: &DetectionConfig, event_bus: Arc<EventBus>) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|_| Error::NoRuntime)?;

        let inner = Inner {
            topology,
            debounce: DebounceEngine::new(detection.confirmation_threshold),
            heartbeat: HeartbeatMonitor::new(detection.heartbeat_grace_sweeps),
            heartbeat_period: detection.heartbeat_period(),
            auto_reset_delay: detection.auto_reset_delay(),
            state: Mutex::new(MonitorState {
                store: SensorStore::new(topology),
                reset: AutoResetScheduler::new(),
            }),
            event_bus,
            counters: Counters::default(),
            runtime,
        };

        info!(
            "Monitor ready: {} nodes x {} sensors, confirm after {} triggers",
            topology.node_count(),
            topology.sensors_per_node(),
            inner.debounce.threshold()
        );

        Ok(Self { inner: Arc::new(inner) })
    }

    /// Validate `config` and build a monitor from it
    pub fn from_config(config: &Config, event_bus: Arc<EventBus>) -> anyhow::Result<Self> {
        config.validate()?;
        let topology = config.topology.build()?;
        Ok(Self::new(topology, &config.detection, event_bus)?)
    }

    /// Fixed node and sensor layout
    pub fn topology(&self) -> &Topology {
        &self.inner.topology
    }

    /// Bus observers subscribe to
    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.inner.event_bus
    }

    /// Feed one raw transport line. Never fails; bad lines are logged and
    /// reported on the bus as `MessageRejected`.
    pub fn submit(&self, raw: &str) {
        match decode(raw, &self.inner.topology) {
            Ok(event) => self.commit(event),
            Err(e) => self.reject(raw.trim().to_string(), &e),
        }
    }

    /// Apply an already-decoded event. Addresses outside the topology are
    /// rejected the same way `submit` rejects them.
    pub fn apply(&self, event: SensorEvent) -> Result<()> {
        if let Err(e) = check_address(&event, &self.inner.topology) {
            self.reject(format!("{}{}", event.node, event.sensor), &e);
            return Err(e.into());
        }
        self.commit(event);
        Ok(())
    }

    fn reject(&self, raw: String, e: &DecodeError) {
        self.inner.counters.rejected.fetch_add(1, Ordering::Relaxed);
        warn!("Non-standard message received: {}", e);
        self.inner.event_bus.publish(MonitorEvent::MessageRejected(RejectedMessage {
            raw,
            reason: e.to_string(),
            timestamp: Utc::now(),
        }));
    }

    // Every activity publishes while still holding the state lock so that
    // observers see transitions in the order the store applied them.
    // Broadcast sends never wait on subscribers.
    fn commit(&self, event: SensorEvent) {
        let now = Instant::now();
        let mut state = self.inner.state.lock();
        let applied = self.inner.debounce.apply(&mut state.store, event, now);
        if applied.confirmed.is_some() {
            self.arm_reset(&mut state.reset);
        }

        self.inner.counters.accepted.fetch_add(1, Ordering::Relaxed);
        let timestamp = Utc::now();
        let mut events = status_events(applied.transitions, timestamp);
        if let Some(key) = applied.confirmed {
            self.inner.counters.intrusions.fetch_add(1, Ordering::Relaxed);
            info!("Intrusion detected at Node {}, Sensor {}", key.node, key.sensor);
            events.push(MonitorEvent::IntrusionConfirmed(Intrusion::new(key, timestamp)));
        }
        self.inner.event_bus.publish_all(events);
    }

    /// Called with the state lock held
    fn arm_reset(&self, reset: &mut AutoResetScheduler) {
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let runtime = &self.inner.runtime;

        reset.arm(self.inner.auto_reset_delay, |generation, fire_at| {
            runtime.spawn(async move {
                tokio::time::sleep_until(fire_at).await;
                if let Some(inner) = weak.upgrade() {
                    // Errors are logged inside fire_reset
                    let _ = Monitor { inner }.fire_reset(generation);
                }
            })
        });
    }

    /// Run the reset for `generation` if it is still the pending one.
    ///
    /// Returns `Ok(false)` when the generation was superseded by a newer
    /// intrusion.
    pub fn fire_reset(&self, generation: u64) -> Result<bool> {
        let mut state = self.inner.state.lock();
        let transitions = match state.reset.take_due(generation) {
            Ok(true) => state.store.reset_all(),
            Ok(false) => {
                trace!(generation, "Superseded auto-reset ignored");
                return Ok(false);
            }
            Err(e) => {
                error!("{}", e);
                return Err(e);
            }
        };

        self.inner.counters.auto_resets.fetch_add(1, Ordering::Relaxed);
        info!("Auto-reset fired, {} sensors restored", transitions.len());
        let timestamp = Utc::now();
        let mut events = status_events(transitions, timestamp);
        events.push(MonitorEvent::AutoReset { timestamp });
        self.inner.event_bus.publish_all(events);
        Ok(true)
    }

    /// One heartbeat sweep over every node
    pub fn sweep_heartbeats(&self) {
        let mut state = self.inner.state.lock();
        let outcome = self.inner.heartbeat.sweep(&mut state.store);

        self.inner.counters.sweeps.fetch_add(1, Ordering::Relaxed);
        let timestamp = Utc::now();
        let mut events = status_events(outcome.transitions, timestamp);
        events.extend(
            outcome
                .offline_nodes
                .into_iter()
                .map(|node| MonitorEvent::NodeOffline { node, timestamp }),
        );
        self.inner.event_bus.publish_all(events);
    }

    /// Sweep every heartbeat period until shutdown. The first sweep happens
    /// one full period after start.
    pub async fn run_heartbeat(&self, mut shutdown: broadcast::Receiver<()>) {
        let period = self.inner.heartbeat_period;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("Heartbeat monitor running every {:?}", period);

        loop {
            tokio::select! {
                _ = ticker.tick() => self.sweep_heartbeats(),
                _ = shutdown.recv() => {
                    info!("Heartbeat monitor shutting down...");
                    break;
                }
            }
        }
    }

    /// Drain the ingest queue until it closes or shutdown is signalled
    pub async fn run_ingestion(&self, mut lines: mpsc::Receiver<String>, mut shutdown: broadcast::Receiver<()>) {
        info!("Ingestion running");
        loop {
            tokio::select! {
                line = lines.recv() => match line {
                    Some(line) => self.submit(&line),
                    None => {
                        debug!("Ingest queue closed");
                        break;
                    }
                },
                _ = shutdown.recv() => {
                    info!("Ingestion shutting down...");
                    break;
                }
            }
        }
    }

    /// Current status, `None` outside the topology
    pub fn get_status(&self, node: u8, sensor: u32) -> Option<SensorStatus> {
        self.inner.state.lock().store.status(SensorKey::new(node, sensor))
    }

    /// Consistent snapshot of every sensor
    pub fn get_all_statuses(&self) -> BTreeMap<SensorKey, SensorStatus> {
        self.inner.state.lock().store.statuses()
    }

    /// Full record including the debounce counter
    pub fn record(&self, key: SensorKey) -> Option<SensorRecord> {
        self.inner.state.lock().store.record(key).cloned()
    }

    /// When the armed auto-reset will fire, if any
    pub fn pending_reset_deadline(&self) -> Option<Instant> {
        self.inner.state.lock().reset.pending_deadline()
    }

    /// Counter snapshot
    pub fn stats(&self) -> MonitorStats {
        let c = &self.inner.counters;
        MonitorStats {
            messages_accepted: c.accepted.load(Ordering::Relaxed),
            messages_rejected: c.rejected.load(Ordering::Relaxed),
            intrusions_confirmed: c.intrusions.load(Ordering::Relaxed),
            auto_resets: c.auto_resets.load(Ordering::Relaxed),
            heartbeat_sweeps: c.sweeps.load(Ordering::Relaxed),
        }
    }
}

fn status_events(transitions: Vec<Transition>, timestamp: chrono::DateTime<Utc>) -> Vec<MonitorEvent> {
    transitions
        .into_iter()
        .map(|t| {
            MonitorEvent::StatusChanged(StatusChange {
                key: t.key,
                old: t.old,
                new: t.new,
                timestamp,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monitor() -> Monitor {
        let topology = Topology::new(9, 4).unwrap();
        Monitor::new(topology, &DetectionConfig::default(), Arc::new(EventBus::new(256))).unwrap()
    }

    fn drain(rx: &mut broadcast::Receiver<MonitorEvent>) -> Vec<MonitorEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_new_requires_runtime() {
        let topology = Topology::new(1, 1).unwrap();
        let result = Monitor::new(topology, &DetectionConfig::default(), Arc::new(EventBus::default()));
        assert!(matches!(result, Err(Error::NoRuntime)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_intrusion_emitted_once() {
        let monitor = monitor();
        let mut rx = monitor.event_bus().subscribe();

        monitor.submit("32");
        monitor.submit("32");
        assert!(drain(&mut rx).is_empty());
        assert!(monitor.pending_reset_deadline().is_none());

        monitor.submit("32");
        let events = drain(&mut rx);
        assert_eq!(events.len(), 2);
        assert!(matches!(
            &events[0],
            MonitorEvent::StatusChanged(c) if c.key == SensorKey::new(3, 2) && c.new == SensorStatus::Intrusion
        ));
        assert!(matches!(
            &events[1],
            MonitorEvent::IntrusionConfirmed(i) if i.key == SensorKey::new(3, 2)
        ));
        assert_eq!(
            monitor.pending_reset_deadline(),
            Some(Instant::now() + Duration::from_secs(10))
        );
        assert_eq!(monitor.stats().intrusions_confirmed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_lines_are_reported() {
        let monitor = monitor();
        let mut rx = monitor.event_bus().subscribe();

        monitor.submit("hello");
        monitor.submit("05");
        monitor.submit("");

        let events = drain(&mut rx);
        assert_eq!(events.len(), 3);
        assert!(events.iter().all(|e| matches!(e, MonitorEvent::MessageRejected(_))));
        assert_eq!(monitor.stats().messages_rejected, 3);
        assert_eq!(monitor.stats().messages_accepted, 0);

        // Still ingesting after garbage
        monitor.submit("10");
        assert_eq!(monitor.get_status(1, 1), Some(SensorStatus::Normal));
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_reset_fires_after_delay() {
        let monitor = monitor();
        for _ in 0..3 {
            monitor.submit("11");
        }
        monitor.submit("24");
        assert_eq!(monitor.get_status(1, 1), Some(SensorStatus::Intrusion));

        tokio::time::sleep(Duration::from_millis(10_001)).await;

        assert!(monitor.get_all_statuses().values().all(|s| *s == SensorStatus::Normal));
        let record = monitor.record(SensorKey::new(2, 4)).unwrap();
        assert_eq!(record.consecutive_triggers, 0);
        assert!(monitor.pending_reset_deadline().is_none());
        assert_eq!(monitor.stats().auto_resets, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_fire_does_not_clear_new_intrusion() {
        let monitor = monitor();
        for _ in 0..3 {
            monitor.submit("11");
        }
        let stale = monitor.inner.state.lock().reset.pending_generation().unwrap();

        for _ in 0..3 {
            monitor.submit("22");
        }

        // A superseded task that slipped past its abort
        assert!(!monitor.fire_reset(stale).unwrap());
        assert_eq!(monitor.get_status(2, 2), Some(SensorStatus::Intrusion));
        assert!(monitor.pending_reset_deadline().is_some());
    }

    #[tokio::test]
    async fn test_unissued_generation_is_refused() {
        let monitor = monitor();
        assert!(matches!(
            monitor.fire_reset(42),
            Err(Error::SchedulerRaceDetected { generation: 42 })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_publishes_offline_nodes() {
        let monitor = monitor();
        let mut rx = monitor.event_bus().subscribe();
        for node in 1..=9 {
            if node != 7 {
                monitor.submit(&format!("{}0", node));
            }
        }
        drain(&mut rx);

        monitor.sweep_heartbeats();

        let events = drain(&mut rx);
        let offline: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                MonitorEvent::NodeOffline { node, .. } => Some(*node),
                _ => None,
            })
            .collect();
        assert_eq!(offline, vec![7]);
        assert_eq!(events.len(), 5);
    }

    #[tokio::test]
    async fn test_submit_from_plain_thread() {
        let monitor = monitor();
        let clone = monitor.clone();

        std::thread::spawn(move || {
            for _ in 0..3 {
                clone.submit("43");
            }
        })
        .join()
        .unwrap();

        assert_eq!(monitor.get_status(4, 3), Some(SensorStatus::Intrusion));
        assert!(monitor.pending_reset_deadline().is_some());
    }

    #[tokio::test]
    async fn test_apply_rejects_unknown_address() {
        let monitor = monitor();
        let mut rx = monitor.event_bus().subscribe();

        assert!(matches!(
            monitor.apply(SensorEvent::trigger(3, 7)),
            Err(Error::OutOfRangeAddress { node: 3, sensor: 7 })
        ));
        assert!(matches!(
            monitor.apply(SensorEvent::all_clear(0)),
            Err(Error::OutOfRangeAddress { node: 0, sensor: 0 })
        ));
        assert!(monitor.apply(SensorEvent::trigger(3, 4)).is_ok());

        let events = drain(&mut rx);
        assert_eq!(events.len(), 2);
        assert!(matches!(&events[0], MonitorEvent::MessageRejected(r) if r.raw == "37"));
        let stats = monitor.stats();
        assert_eq!(stats.messages_rejected, 2);
        assert_eq!(stats.messages_accepted, 1);
    }

    #[test]
    fn test_transitions_reach_bus_in_store_order() {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap();
        let _guard = rt.enter();

        let topology = Topology::new(1, 1).unwrap();
        let monitor = Monitor::new(topology, &DetectionConfig::default(), Arc::new(EventBus::new(1 << 16))).unwrap();
        let mut rx = monitor.event_bus().subscribe();

        std::thread::scope(|scope| {
            scope.spawn(|| {
                for _ in 0..2_000 {
                    monitor.submit("10");
                }
            });
            scope.spawn(|| {
                for _ in 0..2_000 {
                    monitor.sweep_heartbeats();
                    monitor.sweep_heartbeats();
                }
            });
        });

        let mut last = SensorStatus::Unknown;
        let mut changes = 0;
        for event in drain(&mut rx) {
            if let MonitorEvent::StatusChanged(change) = event {
                assert_eq!(change.old, last, "transition {} out of order", changes);
                last = change.new;
                changes += 1;
            }
        }
        assert!(changes > 0);
        assert_eq!(monitor.get_status(1, 1), Some(last));
    }
}
