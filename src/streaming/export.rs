// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/meshguard

//! Append-only intrusion log

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use chrono::Local;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::LogFormat;
use crate::core::{Intrusion, Observer, StatusChange};
use crate::error::Result;

#[derive(Serialize)]
struct IntrusionRecord<'a> {
    id: String,
    timestamp: &'a chrono::DateTime<chrono::Utc>,
    node: u8,
    sensor: u32,
}

/// Observer that appends one line per confirmed intrusion
pub struct IntrusionLog {
    path: PathBuf,
    format: LogFormat,
    file: Mutex<File>,
}

impl IntrusionLog {
    /// Open `path` for appending, creating it and its parent directory
    pub fn open(path: &Path, format: LogFormat) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        info!("Intrusion log at {:?}", path);

        Ok(Self {
            path: path.to_path_buf(),
            format,
            file: Mutex::new(file),
        })
    }

    /// File being appended to
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn format_line(&self, intrusion: &Intrusion) -> String {
        match self.format {
            LogFormat::Text => format!(
                "Intrusion detected at Node {}, Sensor {} - {}",
                intrusion.key.node,
                intrusion.key.sensor,
                intrusion.timestamp.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
            ),
            LogFormat::Json => {
                let record = IntrusionRecord {
                    id: intrusion.id.to_string(),
                    timestamp: &intrusion.timestamp,
                    node: intrusion.key.node,
                    sensor: intrusion.key.sensor,
                };
                // Plain struct of strings and integers always serializes
                serde_json::to_string(&record).unwrap_or_default()
            }
        }
    }

    /// Write and flush one record
    pub fn append(&self, intrusion: &Intrusion) -> Result<()> {
        let line = self.format_line(intrusion);
        let mut file = self.file.lock();
        writeln!(file, "{}", line)?;
        file.flush()?;
        Ok(())
    }
}

impl Observer for IntrusionLog {
    fn on_status_changed(&self, _change: &StatusChange) {}

    fn on_intrusion_confirmed(&self, intrusion: &Intrusion) {
        if let Err(e) = self.append(intrusion) {
            warn!("Failed to write intrusion log {:?}: {}", self.path, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::SensorKey;
    use chrono::Utc;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("meshguard-{}", uuid::Uuid::new_v4()))
            .join(name)
    }

    #[test]
    fn test_text_format_appends() {
        let path = temp_path("intrusion_log.txt");
        let log = IntrusionLog::open(&path, LogFormat::Text).unwrap();

        log.append(&Intrusion::new(SensorKey::new(3, 2), Utc::now())).unwrap();
        log.on_intrusion_confirmed(&Intrusion::new(SensorKey::new(7, 4), Utc::now()));

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("Intrusion detected at Node 3, Sensor 2 - "));
        assert!(lines[1].starts_with("Intrusion detected at Node 7, Sensor 4 - "));
        // "YYYY-MM-DD HH:MM:SS"
        assert_eq!(lines[0].rsplit(" - ").next().unwrap().len(), 19);

        // Reopening keeps earlier records
        drop(log);
        let log = IntrusionLog::open(&path, LogFormat::Text).unwrap();
        log.append(&Intrusion::new(SensorKey::new(1, 1), Utc::now())).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap().lines().count(), 3);

        std::fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }

    #[test]
    fn test_json_format() {
        let path = temp_path("intrusions.jsonl");
        let log = IntrusionLog::open(&path, LogFormat::Json).unwrap();
        let intrusion = Intrusion::new(SensorKey::new(5, 3), Utc::now());

        log.append(&intrusion).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(content.trim()).unwrap();
        assert_eq!(value["node"], 5);
        assert_eq!(value["sensor"], 3);
        assert_eq!(value["id"], intrusion.id.to_string());
        assert!(value["timestamp"].is_string());

        std::fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }
}
