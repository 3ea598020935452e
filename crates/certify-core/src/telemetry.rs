// crates/certify-core/src/telemetry.rs
// ============================================================================
// Module: Harness Logging
// Description: Structured JSON-lines events emitted by the runners.
// Purpose: Record per-fixture verdicts and session lifecycle without hard dependencies.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Runners report what they did through a [`HarnessLog`] sink. Every event is
//! one JSON object carrying `event` and `timestamp_ms`. Sinks route events to
//! stderr, an append-only file, memory (tests), or nowhere.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;
use serde_json::Value;

use crate::core::CheckStatus;
use crate::core::DeploymentMode;
use crate::core::LogLevel;

// ============================================================================
// SECTION: Events
// ============================================================================

/// Harness event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HarnessEvent {
    /// One fixture was checked.
    CheckFixture {
        /// Fixture label.
        fixture: String,
        /// Mode the fixture ran under.
        mode: DeploymentMode,
        /// Expected status.
        expected: CheckStatus,
        /// Reported status, when exactly one was reported.
        status: Option<CheckStatus>,
        /// Whether the fixture met its expectation.
        passed: bool,
        /// Mismatch description for failed fixtures.
        detail: Option<String>,
    },
    /// A write session started.
    SessionOpened {
        /// Session identifier.
        session_id: String,
        /// Session namespace.
        namespace: String,
        /// Stream label.
        stream: String,
        /// Deployment mode.
        mode: DeploymentMode,
        /// Connector identity.
        connector: String,
    },
    /// Connector emitted a log message.
    ConnectorLog {
        /// Session identifier, when inside a write session.
        session_id: Option<String>,
        /// Connector log level.
        level: LogLevel,
        /// Connector log text.
        message: String,
    },
    /// A write session finished its write and verification.
    WriteCompleted {
        /// Session identifier.
        session_id: String,
        /// Records streamed to the connector.
        records_sent: usize,
        /// Whether records were read back and compared.
        verified: bool,
        /// Whether every assertion held.
        passed: bool,
    },
    /// Session cleanup succeeded.
    CleanupCompleted {
        /// Session identifier.
        session_id: String,
    },
    /// Session cleanup failed.
    CleanupFailed {
        /// Session identifier.
        session_id: String,
        /// Cleaner error text.
        message: String,
    },
    /// Writing a diagnostic artifact failed.
    ArtifactFailed {
        /// Session identifier.
        session_id: String,
        /// Error text.
        message: String,
    },
}

impl HarnessEvent {
    /// Renders the event as a timestamped JSON object.
    #[must_use]
    pub fn to_record(&self) -> Value {
        let timestamp_ms =
            SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        let mut value = serde_json::to_value(self).unwrap_or(Value::Null);
        if let Value::Object(map) = &mut value {
            map.insert("timestamp_ms".to_string(), Value::from(timestamp_ms.to_string()));
        }
        value
    }
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Sink for harness events.
pub trait HarnessLog: Send + Sync {
    /// Record an event.
    fn record(&self, event: &HarnessEvent);
}

/// Sink that writes JSON lines to stderr.
pub struct StderrHarnessLog;

impl HarnessLog for StderrHarnessLog {
    fn record(&self, event: &HarnessEvent) {
        let _ = writeln!(io::stderr(), "{}", event.to_record());
    }
}

/// Sink that appends JSON lines to a file.
pub struct FileHarnessLog {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileHarnessLog {
    /// Opens the log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl HarnessLog for FileHarnessLog {
    fn record(&self, event: &HarnessEvent) {
        if let Ok(mut file) = self.file.lock() {
            let _ = writeln!(file, "{}", event.to_record());
            let _ = file.flush();
        }
    }
}

/// Sink that keeps events in memory.
#[derive(Default)]
pub struct MemoryHarnessLog {
    /// Captured events.
    events: Mutex<Vec<HarnessEvent>>,
}

impl MemoryHarnessLog {
    /// Creates an empty capture.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of captured events.
    #[must_use]
    pub fn events(&self) -> Vec<HarnessEvent> {
        self.events.lock().map_or_else(|_| Vec::new(), |events| events.clone())
    }
}

impl HarnessLog for MemoryHarnessLog {
    fn record(&self, event: &HarnessEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

/// No-op sink.
pub struct NoopHarnessLog;

impl HarnessLog for NoopHarnessLog {
    fn record(&self, _event: &HarnessEvent) {}
}
