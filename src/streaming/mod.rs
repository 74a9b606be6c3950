//! Streaming module - transports feeding the ingest queue, and the intrusion log
//!
//! A transport is anything that yields raw text lines. `pump` moves lines from
//! a source into the bounded ingest queue that `Monitor::run_ingestion` drains.
//!
//! Backpressure policy: block. When the queue is full the pump waits for room
//! rather than dropping lines; the transport's own buffer absorbs the burst.

mod reader;
mod export;
#[cfg(feature = "serial")]
mod serial;

pub use reader::ReaderSource;
pub use export::IntrusionLog;
#[cfg(feature = "serial")]
pub use serial::SerialSource;

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info};

use crate::error::Result;

/// A source of raw protocol lines
#[async_trait]
pub trait LineSource: Send {
    /// Human readable name for logs
    fn name(&self) -> &str;

    /// Next line, or `None` once the source is exhausted
    async fn next_line(&mut self) -> Result<Option<String>>;
}

/// Bounded queue between a transport and the monitor
pub fn ingest_channel(capacity: usize) -> (mpsc::Sender<String>, mpsc::Receiver<String>) {
    mpsc::channel(capacity.max(1))
}

/// Forward lines from `source` into `tx` until the source ends, the queue is
/// closed or shutdown is signalled. Returns the number of lines forwarded.
pub async fn pump<S>(
    source: &mut S,
    tx: mpsc::Sender<String>,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<u64>
where
    S: LineSource + ?Sized,
{
    info!("Reading from {}", source.name());
    let mut forwarded = 0u64;

    loop {
        let line = tokio::select! {
            line = source.next_line() => line?,
            _ = shutdown.recv() => break,
        };

        let Some(line) = line else {
            info!("{} reached end of input", source.name());
            break;
        };

        tokio::select! {
            sent = tx.send(line) => {
                if sent.is_err() {
                    debug!("Ingest queue closed");
                    break;
                }
                forwarded += 1;
            }
            _ = shutdown.recv() => break,
        }
    }

    Ok(forwarded)
}
