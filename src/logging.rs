//! Structured JSONL logger for debugging and session reconstruction.
//!
//! One JSON object per line with a monotonic sequence number, microsecond
//! timestamp, and session id, so a session's command/event history can be
//! replayed after the fact.

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crate::state_machine::{StateCommand, StateEvent};

pub struct StructuredLogger {
    session_id: String,
    seq: AtomicU64,
    log_file: Mutex<Option<File>>,
    log_path: Option<PathBuf>,
}

/// A single log entry in JSONL format.
#[derive(Serialize, serde::Deserialize)]
pub struct LogEntry {
    /// Monotonic sequence number, unique across the session.
    pub seq: u64,
    /// ISO 8601 timestamp with microseconds.
    pub ts: String,
    pub session_id: String,
    /// Component that emitted the entry.
    pub component: String,
    pub event: Value,
}

impl StructuredLogger {
    /// Creates a logger writing to `<logs_dir>/events.jsonl`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the file
    /// cannot be opened.
    pub fn new(session_id: &str, logs_dir: &Path) -> anyhow::Result<Self> {
        std::fs::create_dir_all(logs_dir)?;
        let log_path = logs_dir.join("events.jsonl");
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;
        Ok(Self {
            session_id: session_id.to_string(),
            seq: AtomicU64::new(0),
            log_file: Mutex::new(Some(file)),
            log_path: Some(log_path),
        })
    }

    /// Logger that drops everything. Used when no log directory is
    /// available; the workflow must not fail just because logging cannot.
    pub fn disabled(session_id: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            seq: AtomicU64::new(0),
            log_file: Mutex::new(None),
            log_path: None,
        }
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Logs a structured event. Thread-safe; write failures are ignored.
    pub fn log(&self, component: &str, event: impl Serialize) {
        let entry = LogEntry {
            seq: self.next_seq(),
            ts: Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string(),
            session_id: self.session_id.clone(),
            component: component.to_string(),
            event: serde_json::to_value(event).unwrap_or(Value::Null),
        };

        if let Ok(mut guard) = self.log_file.lock() {
            if let Some(file) = guard.as_mut() {
                if let Ok(line) = serde_json::to_string(&entry) {
                    let _ = writeln!(file, "{}", line);
                    let _ = file.flush();
                }
            }
        }
    }

    /// Logs a workflow command received by the state machine.
    pub fn log_command(&self, command: &StateCommand) {
        self.log(
            "StateMachine",
            serde_json::json!({ "type": "Command", "command": command }),
        );
    }

    /// Logs an event emitted by the state machine.
    pub fn log_event(&self, event: &StateEvent) {
        self.log(
            "StateMachine",
            serde_json::json!({ "type": "Event", "event": event }),
        );
    }

    /// Logs a user key press with UI context.
    pub fn log_user_input(&self, key: &str, context: &str) {
        self.log(
            "Tui",
            serde_json::json!({ "type": "UserInput", "key": key, "context": context }),
        );
    }

    /// Returns the path to the log file, if logging is enabled.
    pub fn path(&self) -> Option<&PathBuf> {
        self.log_path.as_ref()
    }
}
