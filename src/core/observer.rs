// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/meshguard

//! Observer port - how displays, loggers and alerters hear about transitions

use std::sync::Arc;
use chrono::{DateTime, Utc};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::event_bus::{EventBus, Intrusion, MonitorEvent, RejectedMessage, StatusChange};

/// Receiver side of monitor notifications.
///
/// Callbacks run on the observer's own task, never under the state lock.
/// A slow observer only delays itself.
pub trait Observer: Send + Sync {
    /// A sensor moved between statuses
    fn on_status_changed(&self, change: &StatusChange);

    /// A sensor confirmed an intrusion, possibly again
    fn on_intrusion_confirmed(&self, intrusion: &Intrusion);

    /// Every sensor of `node` went offline on a sweep
    fn on_node_offline(&self, _node: u8, _timestamp: DateTime<Utc>) {}

    /// A line was dropped by the decoder or the range check
    fn on_message_rejected(&self, _rejected: &RejectedMessage) {}

    /// The auto-reset fired
    fn on_auto_reset(&self, _timestamp: DateTime<Utc>) {}
}

pub(crate) fn dispatch(observer: &dyn Observer, event: &MonitorEvent) {
    match event {
        MonitorEvent::StatusChanged(change) => observer.on_status_changed(change),
        MonitorEvent::IntrusionConfirmed(intrusion) => observer.on_intrusion_confirmed(intrusion),
        MonitorEvent::NodeOffline { node, timestamp } => observer.on_node_offline(*node, *timestamp),
        MonitorEvent::MessageRejected(rejected) => observer.on_message_rejected(rejected),
        MonitorEvent::AutoReset { timestamp } => observer.on_auto_reset(*timestamp),
    }
}

/// Subscribe `observer` to the bus and drain it on a dedicated task
pub fn spawn_observer(
    bus: &EventBus,
    observer: Arc<dyn Observer>,
    mut shutdown: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    let mut events = bus.subscribe();

    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                received = events.recv() => match received {
                    Ok(event) => dispatch(observer.as_ref(), &event),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Observer fell behind, {} notifications skipped", skipped);
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = shutdown.recv() => {
                    debug!("Observer shutting down...");
                    break;
                }
            }
        }
    })
}

/// Writes every transition to the tracing log
pub struct LoggingObserver;

impl Observer for LoggingObserver {
    fn on_status_changed(&self, change: &StatusChange) {
        info!("{}: {} -> {}", change.key, change.old, change.new);
    }

    fn on_intrusion_confirmed(&self, intrusion: &Intrusion) {
        warn!(
            "Intrusion detected at Node {}, Sensor {}",
            intrusion.key.node, intrusion.key.sensor
        );
    }

    fn on_node_offline(&self, node: u8, _timestamp: DateTime<Utc>) {
        warn!("Node {} is offline", node);
    }

    fn on_message_rejected(&self, rejected: &RejectedMessage) {
        debug!("Dropped {:?}: {}", rejected.raw, rejected.reason);
    }

    fn on_auto_reset(&self, _timestamp: DateTime<Utc>) {
        info!("All sensors reset to OK");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::{SensorKey, SensorStatus};
    use parking_lot::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<String>>,
    }

    impl Observer for Recorder {
        fn on_status_changed(&self, change: &StatusChange) {
            self.seen.lock().push(format!("{} {}", change.key, change.new));
        }

        fn on_intrusion_confirmed(&self, intrusion: &Intrusion) {
            self.seen.lock().push(format!("intrusion {}", intrusion.key));
        }
    }

    #[tokio::test]
    async fn test_observer_receives_in_order() {
        let bus = EventBus::new(16);
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let recorder = Arc::new(Recorder::default());
        let handle = spawn_observer(&bus, recorder.clone(), shutdown_rx);

        let key = SensorKey::new(3, 2);
        bus.publish(MonitorEvent::StatusChanged(StatusChange {
            key,
            old: SensorStatus::Normal,
            new: SensorStatus::Intrusion,
            timestamp: Utc::now(),
        }));
        bus.publish(MonitorEvent::IntrusionConfirmed(Intrusion::new(key, Utc::now())));
        // Default no-op hook
        bus.publish(MonitorEvent::AutoReset { timestamp: Utc::now() });

        tokio::time::sleep(Duration::from_millis(50)).await;
        let _ = shutdown_tx.send(());
        handle.await.unwrap();

        assert_eq!(
            *recorder.seen.lock(),
            vec![
                "Node 3 Sensor 2 Intrusion".to_string(),
                "intrusion Node 3 Sensor 2".to_string(),
            ]
        );
    }
}
