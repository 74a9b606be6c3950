//! Detection module - debounce confirmation and heartbeat liveness

mod debounce;
mod heartbeat;

pub use debounce::{Applied, DebounceEngine};
pub use heartbeat::{HeartbeatMonitor, SweepOutcome};
