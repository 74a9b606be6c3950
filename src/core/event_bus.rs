// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/meshguard

//! Event bus carrying monitor notifications to observers

use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::sensors::{SensorKey, SensorStatus};

/// A sensor changed classification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    /// Affected sensor
    pub key: SensorKey,
    /// Status before
    pub old: SensorStatus,
    /// Status after
    pub new: SensorStatus,
    /// Wall-clock time of the change
    pub timestamp: DateTime<Utc>,
}

/// A confirmed intrusion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intrusion {
    /// Unique id for log correlation
    pub id: Uuid,
    /// Affected sensor
    pub key: SensorKey,
    /// Wall-clock time of the change
    pub timestamp: DateTime<Utc>,
}

impl Intrusion {
    /// New intrusion with a fresh id
    pub fn new(key: SensorKey, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            key,
            timestamp,
        }
    }
}

/// A transport line that was dropped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedMessage {
    /// Trimmed input line
    pub raw: String,
    /// Why it was dropped
    pub reason: String,
    /// Wall-clock time of the change
    pub timestamp: DateTime<Utc>,
}

/// Everything the monitor reports to observers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MonitorEvent {
    /// A sensor changed status
    StatusChanged(StatusChange),
    /// A sensor reached the confirmation threshold
    IntrusionConfirmed(Intrusion),
    /// A node missed its heartbeat window
    NodeOffline {
        /// Silent node
        node: u8,
        /// Sweep time
        timestamp: DateTime<Utc>,
    },
    /// A line was malformed or out of range
    MessageRejected(RejectedMessage),
    /// The auto-reset restored every sensor
    AutoReset {
        /// Fire time
        timestamp: DateTime<Utc>,
    },
}

/// Broadcast bus. Publishing never blocks; a receiver that falls more than
/// `capacity` events behind loses the oldest ones.
pub struct EventBus {
    event_tx: broadcast::Sender<MonitorEvent>,
    event_counter: AtomicU64,
}

impl EventBus {
    /// Bus holding up to `capacity` unread events per receiver
    pub fn new(capacity: usize) -> Self {
        let (event_tx, _) = broadcast::channel(capacity.max(1));
        Self {
            event_tx,
            event_counter: AtomicU64::new(0),
        }
    }

    /// Send to every current subscriber
    pub fn publish(&self, event: MonitorEvent) {
        self.event_counter.fetch_add(1, Ordering::Relaxed);
        // No subscribers is fine
        let _ = self.event_tx.send(event);
    }

    /// Publish in iteration order
    pub fn publish_all<I>(&self, events: I)
    where
        I: IntoIterator<Item = MonitorEvent>,
    {
        for event in events {
            self.publish(event);
        }
    }

    /// Receiver that sees events published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.event_tx.subscribe()
    }

    /// Total events published since creation
    pub fn published(&self) -> u64 {
        self.event_counter.load(Ordering::Relaxed)
    }

    /// Live receivers
    pub fn subscriber_count(&self) -> usize {
        self.event_tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}
