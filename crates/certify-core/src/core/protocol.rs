// crates/certify-core/src/core/protocol.rs
// ============================================================================
// Module: Connector Protocol
// Description: Line-delimited JSON messages exchanged with connectors.
// Purpose: Define the wire format across the connector process boundary.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Connectors speak one JSON object per line on stdio. The harness writes
//! `RECORD`, `STATE`, and `TRACE` messages into a `write` invocation and reads
//! `CONNECTION_STATUS`, `STATE`, `LOG`, `TRACE`, and `SPEC` messages back.
//! Lines that do not parse as a message are not protocol traffic; callers keep
//! them as diagnostics instead of failing.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::deployment::DeploymentMode;
use crate::core::outcome::CheckOutcome;
use crate::core::records::StreamDescriptor;

// ============================================================================
// SECTION: Messages
// ============================================================================

/// Envelope for every message on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectorMessage {
    /// A data record.
    Record {
        /// Record payload.
        record: RecordMessage,
    },
    /// A stream checkpoint.
    State {
        /// Checkpoint payload.
        state: StateMessage,
    },
    /// A log line.
    Log {
        /// Log payload.
        log: LogMessage,
    },
    /// Result of a check operation.
    ConnectionStatus {
        /// Reported status.
        connection_status: CheckOutcome,
    },
    /// Error or stream-status trace.
    Trace {
        /// Trace payload.
        trace: TraceMessage,
    },
    /// Connector specification.
    Spec {
        /// Specification payload.
        spec: SpecMessage,
    },
}

impl ConnectorMessage {
    /// Parses one wire line. Returns `None` for lines that are not messages.
    #[must_use]
    pub fn parse_line(line: &str) -> Option<Self> {
        let trimmed = line.trim();
        if !trimmed.starts_with('{') {
            return None;
        }
        serde_json::from_str(trimmed).ok()
    }

    /// Serializes the message as a single wire line (without newline).
    ///
    /// # Errors
    ///
    /// Returns the serializer error when the payload cannot be encoded.
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Returns the wire type label.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Record {
                ..
            } => "RECORD",
            Self::State {
                ..
            } => "STATE",
            Self::Log {
                ..
            } => "LOG",
            Self::ConnectionStatus {
                ..
            } => "CONNECTION_STATUS",
            Self::Trace {
                ..
            } => "TRACE",
            Self::Spec {
                ..
            } => "SPEC",
        }
    }
}

/// Data record on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMessage {
    /// Target stream.
    pub stream: StreamDescriptor,
    /// Record payload.
    pub data: Value,
    /// Emission time in epoch milliseconds.
    pub emitted_at_ms: i64,
}

/// Stream checkpoint. Destinations echo it back once the preceding records
/// are committed, filling in `destination_record_count`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateMessage {
    /// Stream the checkpoint covers.
    pub stream: StreamDescriptor,
    /// Opaque source state blob.
    pub data: Value,
    /// Records the source emitted since the previous checkpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_record_count: Option<u64>,
    /// Records the destination committed since the previous checkpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_record_count: Option<u64>,
}

/// Log severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogLevel {
    /// Debug detail.
    Debug,
    /// Informational.
    Info,
    /// Recoverable problem.
    Warn,
    /// Error.
    Error,
}

/// Log line emitted by a connector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogMessage {
    /// Severity.
    pub level: LogLevel,
    /// Text.
    pub message: String,
}

/// Lifecycle status of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StreamStatus {
    /// Stream started.
    Started,
    /// Stream is emitting records.
    Running,
    /// All records for the stream have been sent.
    Complete,
    /// Stream stopped early.
    Incomplete,
}

/// Error details in a trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceError {
    /// User-facing message.
    pub message: String,
    /// Internal detail, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal_message: Option<String>,
}

/// Trace payload: either an error or a stream-status transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "trace_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TraceMessage {
    /// Fatal error reported by the connector.
    Error {
        /// Error details.
        error: TraceError,
    },
    /// Stream status transition.
    StreamStatus {
        /// Stream the status applies to.
        stream: StreamDescriptor,
        /// New status.
        status: StreamStatus,
    },
}

/// Connector specification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecMessage {
    /// Mode the specification applies to.
    pub deployment_mode: DeploymentMode,
    /// JSON schema for the configuration document.
    pub connection_specification: Value,
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        reason = "Test-only assertions favor direct unwrap and panics."
    )]

    use serde_json::json;

    use super::ConnectorMessage;
    use super::StreamStatus;
    use super::TraceMessage;
    use crate::core::outcome::CheckStatus;
    use crate::core::records::StreamDescriptor;

    #[test]
    fn connection_status_uses_tagged_wire_shape() {
        let line = r#"{"type":"CONNECTION_STATUS","connection_status":{"status":"FAILED","message":"nope"}}"#;
        let message = ConnectorMessage::parse_line(line).unwrap();
        let ConnectorMessage::ConnectionStatus {
            connection_status,
        } = message
        else {
            panic!("expected connection status");
        };
        assert_eq!(connection_status.status, CheckStatus::Failed);
        assert_eq!(connection_status.message.as_deref(), Some("nope"));
    }

    #[test]
    fn non_message_lines_are_ignored() {
        assert!(ConnectorMessage::parse_line("starting up...").is_none());
        assert!(ConnectorMessage::parse_line("{\"type\":\"UNKNOWN\"}").is_none());
        assert!(ConnectorMessage::parse_line("").is_none());
    }

    #[test]
    fn stream_status_trace_serializes_with_trace_type() {
        let message = ConnectorMessage::Trace {
            trace: TraceMessage::StreamStatus {
                stream: StreamDescriptor::new(Some("ns".to_string()), "users"),
                status: StreamStatus::Complete,
            },
        };
        let value: serde_json::Value = serde_json::from_str(&message.to_line().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "TRACE",
                "trace": {
                    "trace_type": "STREAM_STATUS",
                    "stream": { "namespace": "ns", "name": "users" },
                    "status": "COMPLETE"
                }
            })
        );
    }
}
