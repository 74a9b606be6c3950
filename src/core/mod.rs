//! Core engine module - state ownership, scheduling and notification

mod engine;
mod scheduler;
mod event_bus;
mod observer;

pub use engine::Monitor;
pub use scheduler::AutoResetScheduler;
pub use event_bus::{EventBus, Intrusion, MonitorEvent, RejectedMessage, StatusChange};
pub use observer::{spawn_observer, LoggingObserver, Observer};

use serde::{Deserialize, Serialize};

/// Running counters, snapshotted by `Monitor::stats`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorStats {
    /// Lines decoded and applied
    pub messages_accepted: u64,
    /// Malformed or out-of-range lines
    pub messages_rejected: u64,
    /// Confirmations, including repeats on a sensor already in intrusion
    pub intrusions_confirmed: u64,
    /// Resets that actually fired
    pub auto_resets: u64,
    /// Sweeps run
    pub heartbeat_sweeps: u64,
}
