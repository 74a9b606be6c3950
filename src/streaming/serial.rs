// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/meshguard

//! Serial line source for the LoRa gateway radio
//!
//! `serialport` is blocking, so the port is read on a dedicated OS thread that
//! forwards complete lines over a small channel.

use std::io::{BufRead, BufReader, ErrorKind};
use std::time::Duration;
use async_trait::async_trait;
use serialport::SerialPort;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use super::LineSource;
use crate::error::{Error, Result};

/// Gateway radio on a serial port
pub struct SerialSource {
    name: String,
    rx: mpsc::Receiver<std::io::Result<String>>,
}

impl SerialSource {
    /// Open the port and start the reader thread
    pub fn open(path: &str, baud_rate: u32, read_timeout: Duration) -> Result<Self> {
        let port = serialport::new(path, baud_rate)
            .timeout(read_timeout)
            .open()
            .map_err(|e| Error::TransportUnavailable(format!("{}: {}", path, e)))?;
        info!("Opened serial port {} at {} baud", path, baud_rate);

        let (tx, rx) = mpsc::channel(64);
        std::thread::Builder::new()
            .name("serial-reader".to_string())
            .spawn(move || read_loop(port, tx))?;

        Ok(Self {
            name: path.to_string(),
            rx,
        })
    }
}

fn read_loop(port: Box<dyn SerialPort>, tx: mpsc::Sender<std::io::Result<String>>) {
    let mut reader = BufReader::new(port);
    let mut buf = Vec::new();

    loop {
        // On timeout, bytes read so far stay in `buf` for the next attempt
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => {
                let _ = tx.blocking_send(Err(ErrorKind::UnexpectedEof.into()));
                break;
            }
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf).trim().to_string();
                buf.clear();
                if line.is_empty() {
                    continue;
                }
                if tx.blocking_send(Ok(line)).is_err() {
                    debug!("Serial consumer gone, stopping reader");
                    break;
                }
            }
            Err(e) if e.kind() == ErrorKind::TimedOut => continue,
            Err(e) => {
                error!("Serial read failed: {}", e);
                let _ = tx.blocking_send(Err(e));
                break;
            }
        }
    }
}

#[async_trait]
impl LineSource for SerialSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn next_line(&mut self) -> Result<Option<String>> {
        match self.rx.recv().await {
            Some(Ok(line)) => Ok(Some(line)),
            Some(Err(e)) => Err(Error::TransportUnavailable(format!("{}: {}", self.name, e))),
            None => Err(Error::TransportUnavailable(format!("{}: reader thread exited", self.name))),
        }
    }
}
