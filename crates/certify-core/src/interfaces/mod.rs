// crates/certify-core/src/interfaces/mod.rs
// ============================================================================
// Module: Certify Interfaces
// Description: Connector boundary and destination verification contracts.
// Purpose: Define the surfaces a connector suite plugs into the harness.
// Dependencies: crate::core, async-trait, thiserror
// ============================================================================

//! ## Overview
//! The harness never sees a concrete connector or destination. It drives a
//! [`DestinationConnector`] and verifies through a [`DataVerification`]
//! capability set made of a [`DestinationCleaner`], a
//! [`DestinationDataDumper`], and an [`ExpectedRecordMapper`]. Each has a
//! no-op variant for destinations without readable state.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::core::CheckOutcome;
use crate::core::ConfigDocument;
use crate::core::ConfiguredCatalog;
use crate::core::ConnectorMessage;
use crate::core::DeploymentMode;
use crate::core::LogMessage;
use crate::core::OutputRecord;
use crate::core::SessionContext;
use crate::core::StateMessage;
use crate::core::TraceMessage;
use crate::runtime::differ::RecordOrdering;

// ============================================================================
// SECTION: Connector Boundary
// ============================================================================

/// Maximum bytes of each captured stream rendered into error messages.
const CAPTURE_TAIL_BYTES: usize = 2048;

/// Everything observed from one connector invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectorRun {
    /// Process exit code (`None` when terminated by a signal).
    pub exit_code: Option<i32>,
    /// Parsed protocol messages in emission order.
    pub messages: Vec<ConnectorMessage>,
    /// Stdout lines that were not protocol messages.
    pub stdout_noise: Vec<String>,
    /// Captured stderr.
    pub stderr: String,
}

impl ConnectorRun {
    /// Returns true when the process exited with status zero.
    #[must_use]
    pub const fn exited_cleanly(&self) -> bool {
        matches!(self.exit_code, Some(0))
    }

    /// Returns every connection status message.
    #[must_use]
    pub fn connection_statuses(&self) -> Vec<&CheckOutcome> {
        self.messages
            .iter()
            .filter_map(|message| match message {
                ConnectorMessage::ConnectionStatus {
                    connection_status,
                } => Some(connection_status),
                _ => None,
            })
            .collect()
    }

    /// Returns every state message.
    #[must_use]
    pub fn states(&self) -> Vec<&StateMessage> {
        self.messages
            .iter()
            .filter_map(|message| match message {
                ConnectorMessage::State {
                    state,
                } => Some(state),
                _ => None,
            })
            .collect()
    }

    /// Returns every log message.
    #[must_use]
    pub fn logs(&self) -> Vec<&LogMessage> {
        self.messages
            .iter()
            .filter_map(|message| match message {
                ConnectorMessage::Log {
                    log,
                } => Some(log),
                _ => None,
            })
            .collect()
    }

    /// Returns the first error trace message text, if any.
    #[must_use]
    pub fn first_error_trace(&self) -> Option<&str> {
        self.messages.iter().find_map(|message| match message {
            ConnectorMessage::Trace {
                trace:
                    TraceMessage::Error {
                        error,
                    },
            } => Some(error.message.as_str()),
            _ => None,
        })
    }

    /// Returns the trailing part of stderr for diagnostics.
    #[must_use]
    pub fn stderr_tail(&self) -> &str {
        capture_tail(&self.stderr)
    }

    /// Returns the trailing part of non-protocol stdout for diagnostics.
    #[must_use]
    pub fn stdout_noise_tail(&self) -> String {
        noise_tail(&self.stdout_noise)
    }
}

/// Returns at most the last [`CAPTURE_TAIL_BYTES`] of a capture, on a char boundary.
#[must_use]
pub fn capture_tail(capture: &str) -> &str {
    if capture.len() <= CAPTURE_TAIL_BYTES {
        return capture;
    }
    let mut start = capture.len() - CAPTURE_TAIL_BYTES;
    while !capture.is_char_boundary(start) {
        start += 1;
    }
    &capture[start..]
}

/// Joins stdout noise lines and keeps the trailing [`CAPTURE_TAIL_BYTES`].
#[must_use]
pub fn noise_tail(lines: &[String]) -> String {
    capture_tail(&lines.join("\n")).to_string()
}

/// Connector process failures. These are fatal and never retried.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// The connector could not be started.
    #[error("failed to start connector {program}: {message}")]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// Underlying error text.
        message: String,
    },
    /// The connector did not finish in time and was killed.
    #[error(
        "connector {operation} timed out after {elapsed_ms} ms; stderr: {stderr}; stdout: \
         {stdout_noise}"
    )]
    Timeout {
        /// Operation name (`check`, `write`, ...).
        operation: String,
        /// Timeout that elapsed.
        elapsed_ms: u128,
        /// Captured stderr tail.
        stderr: String,
        /// Tail of stdout lines that were not protocol messages.
        stdout_noise: String,
    },
    /// The connector exited abnormally.
    #[error(
        "connector {operation} exited with {code}: {detail}; stderr: {stderr}; stdout: \
         {stdout_noise}",
        code = .exit_code.map_or_else(|| "signal".to_string(), |code| format!("code {code}")),
        detail = .trace.as_deref().unwrap_or("no error trace")
    )]
    Crashed {
        /// Operation name.
        operation: String,
        /// Exit code, if any.
        exit_code: Option<i32>,
        /// First error trace message, if the connector emitted one.
        trace: Option<String>,
        /// Captured stderr tail.
        stderr: String,
        /// Tail of stdout lines that were not protocol messages.
        stdout_noise: String,
    },
    /// Input or output plumbing failed (temp files, pipes).
    #[error("connector io failure during {operation}: {message}")]
    Io {
        /// Operation name.
        operation: String,
        /// Underlying error text.
        message: String,
    },
}

impl ConnectorError {
    /// Builds a crash error from an observed run.
    #[must_use]
    pub fn crashed(operation: &str, run: &ConnectorRun) -> Self {
        Self::Crashed {
            operation: operation.to_string(),
            exit_code: run.exit_code,
            trace: run.first_error_trace().map(ToString::to_string),
            stderr: run.stderr_tail().to_string(),
            stdout_noise: run.stdout_noise_tail(),
        }
    }
}

/// Black-box connector under test.
#[async_trait]
pub trait DestinationConnector: Send + Sync {
    /// Returns a human-readable identity (image or program).
    fn describe(&self) -> String;

    /// Runs the connector's check operation.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError`] when the process cannot run to completion.
    async fn check(
        &self,
        config: &ConfigDocument,
        mode: DeploymentMode,
    ) -> Result<ConnectorRun, ConnectorError>;

    /// Runs the connector's write operation over a finite message stream.
    /// Implementations end the stream by closing the connector's input.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError`] when the process cannot run to completion.
    async fn write(
        &self,
        config: &ConfigDocument,
        catalog: &ConfiguredCatalog,
        mode: DeploymentMode,
        input: Vec<ConnectorMessage>,
    ) -> Result<ConnectorRun, ConnectorError>;
}

// ============================================================================
// SECTION: Data Verification
// ============================================================================

/// Cleaner failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CleanerError {
    /// Removing destination state failed.
    #[error("cleaner failed: {0}")]
    Failed(String),
}

/// Dumper and mapper failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    /// The destination has no readable representation.
    #[error("destination cannot be read back: {0}")]
    Unsupported(String),
    /// Reading the destination failed.
    #[error("dump failed: {0}")]
    Dump(String),
    /// Normalizing a record failed.
    #[error("record mapping failed: {0}")]
    Map(String),
}

/// Removes destination state created by a session.
pub trait DestinationCleaner: Send + Sync {
    /// Removes all state in the session's scope. Absent state is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`CleanerError`] when existing state cannot be removed.
    fn clean(&self, context: &SessionContext) -> Result<(), CleanerError>;
}

/// Reads back what a session persisted.
pub trait DestinationDataDumper: Send + Sync {
    /// Returns a snapshot of the records committed for the session stream.
    ///
    /// # Errors
    ///
    /// Returns [`VerificationError`] when the destination cannot be read.
    fn dump(&self, context: &SessionContext) -> Result<Vec<OutputRecord>, VerificationError>;
}

/// Normalizes dumped records into the comparable shape.
///
/// Implementations must be pure: the same input always maps to the same
/// output and mapping has no side effects.
pub trait ExpectedRecordMapper: Send + Sync {
    /// Maps one raw record.
    ///
    /// # Errors
    ///
    /// Returns [`VerificationError::Map`] when the record cannot be normalized.
    fn map(&self, record: &OutputRecord) -> Result<OutputRecord, VerificationError>;

    /// Declares whether record order is significant.
    fn ordering(&self) -> RecordOrdering {
        RecordOrdering::Unordered
    }
}

/// Cleaner for destinations without reachable state.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopDestinationCleaner;

impl DestinationCleaner for NoopDestinationCleaner {
    fn clean(&self, _context: &SessionContext) -> Result<(), CleanerError> {
        Ok(())
    }
}

/// Dumper for destinations without reachable state.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopDestinationDataDumper;

impl DestinationDataDumper for NoopDestinationDataDumper {
    fn dump(&self, _context: &SessionContext) -> Result<Vec<OutputRecord>, VerificationError> {
        Ok(Vec::new())
    }
}

/// Identity mapper.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopExpectedRecordMapper;

impl ExpectedRecordMapper for NoopExpectedRecordMapper {
    fn map(&self, record: &OutputRecord) -> Result<OutputRecord, VerificationError> {
        Ok(record.clone())
    }
}

/// Verification capability set held by the write runner.
#[derive(Clone)]
pub struct DataVerification {
    /// Reads back persisted records.
    pub dumper: Arc<dyn DestinationDataDumper>,
    /// Removes session state.
    pub cleaner: Arc<dyn DestinationCleaner>,
    /// Normalizes dumped records.
    pub mapper: Arc<dyn ExpectedRecordMapper>,
}

impl DataVerification {
    /// Bundles the three collaborators.
    #[must_use]
    pub fn new(
        dumper: Arc<dyn DestinationDataDumper>,
        cleaner: Arc<dyn DestinationCleaner>,
        mapper: Arc<dyn ExpectedRecordMapper>,
    ) -> Self {
        Self {
            dumper,
            cleaner,
            mapper,
        }
    }

    /// Capability set for destinations with no reachable state.
    #[must_use]
    pub fn noop() -> Self {
        Self::new(
            Arc::new(NoopDestinationDataDumper),
            Arc::new(NoopDestinationCleaner),
            Arc::new(NoopExpectedRecordMapper),
        )
    }
}

impl fmt::Debug for DataVerification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataVerification").finish_non_exhaustive()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
