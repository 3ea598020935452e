// crates/certify-core/src/runtime/write.rs
// ============================================================================
// Module: Write Runner
// Description: Drives one basic write session end to end.
// Purpose: Verify checkpoint echo and persisted records, then always clean up.
// Dependencies: crate::core, crate::interfaces, crate::telemetry, crate::artifacts
// ============================================================================

//! ## Overview
//! [`WriteHarness::run_basic_write`] opens a session with a fresh namespace,
//! streams the records followed by one checkpoint and a stream-complete
//! trace, closes the input, and then asserts:
//! - the connector exited cleanly;
//! - exactly one checkpoint was echoed, carrying the destination record count;
//! - when data verification is enabled, the mapped dump equals the expected
//!   records.
//!
//! Invariants:
//! - The cleaner runs exactly once per session, on every exit path,
//!   including panics inside the session.
//! - A cleanup failure never masks an earlier failure.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::panic;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use serde::Serialize;
use serde_json::json;

use crate::artifacts::ArtifactStore;
use crate::core::CheckOutcome;
use crate::core::ConfigDocument;
use crate::core::ConfigFixture;
use crate::core::ConfiguredStream;
use crate::core::ConnectorMessage;
use crate::core::DeploymentMode;
use crate::core::InputRecord;
use crate::core::OutputRecord;
use crate::core::RecordMessage;
use crate::core::SessionContext;
use crate::core::StateMessage;
use crate::core::StreamStatus;
use crate::core::TraceMessage;
use crate::error::HarnessError;
use crate::error::WriteFailure;
use crate::interfaces::CleanerError;
use crate::interfaces::ConnectorError;
use crate::interfaces::ConnectorRun;
use crate::interfaces::DataVerification;
use crate::interfaces::DestinationCleaner;
use crate::interfaces::DestinationConnector;
use crate::runtime::check::CheckReport;
use crate::runtime::check::Expectation;
use crate::runtime::check::judge_run;
use crate::runtime::check::record_fixture;
use crate::runtime::differ::RecordDiffer;
use crate::telemetry::HarnessEvent;
use crate::telemetry::HarnessLog;
use crate::telemetry::NoopHarnessLog;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Stream name used when no stream is configured.
pub const DEFAULT_STREAM_NAME: &str = "test_stream";

// ============================================================================
// SECTION: Report
// ============================================================================

/// Summary of a successful write session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WriteReport {
    /// Session identifier.
    pub session_id: String,
    /// Session namespace.
    pub namespace: String,
    /// Records streamed to the connector.
    pub records_sent: usize,
    /// Checkpoints echoed by the connector.
    pub states_received: usize,
    /// Records read back, when data verification ran.
    pub records_verified: Option<usize>,
}

/// Connector transcript stored as a session artifact.
#[derive(Serialize)]
struct Transcript<'a> {
    /// Process exit code.
    exit_code: Option<i32>,
    /// Input sent to the connector.
    input: &'a [ConnectorMessage],
    /// Messages read back.
    output: &'a [ConnectorMessage],
    /// Non-protocol stdout lines.
    stdout_noise: &'a [String],
}

// ============================================================================
// SECTION: Cleanup Guard
// ============================================================================

/// Runs the cleaner exactly once, either explicitly or on drop.
struct CleanupGuard {
    /// Cleaner to run.
    cleaner: Arc<dyn DestinationCleaner>,
    /// Session being cleaned.
    context: SessionContext,
    /// Event sink.
    log: Arc<dyn HarnessLog>,
    /// Whether cleanup is still owed.
    armed: bool,
}

impl CleanupGuard {
    /// Runs cleanup now and disarms the guard.
    fn finish(mut self) -> Result<(), CleanerError> {
        self.armed = false;
        self.clean()
    }

    /// Invokes the cleaner and records the result.
    fn clean(&self) -> Result<(), CleanerError> {
        let result = self.cleaner.clean(&self.context);
        let session_id = self.context.session_id.clone();
        match &result {
            Ok(()) => self.log.record(&HarnessEvent::CleanupCompleted {
                session_id,
            }),
            Err(err) => self.log.record(&HarnessEvent::CleanupFailed {
                session_id,
                message: err.to_string(),
            }),
        }
        result
    }
}

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        self.armed = false;
        // A panic escaping here while already unwinding aborts the process.
        if panic::catch_unwind(AssertUnwindSafe(|| self.clean())).is_err() {
            self.log.record(&HarnessEvent::CleanupFailed {
                session_id: self.context.session_id.clone(),
                message: "cleaner panicked".to_string(),
            });
        }
    }
}

// ============================================================================
// SECTION: Harness
// ============================================================================

/// Runs write sessions against one connector configuration.
pub struct WriteHarness {
    /// Connector under test.
    connector: Arc<dyn DestinationConnector>,
    /// Suite configuration.
    config: ConfigDocument,
    /// Deployment mode for every invocation.
    mode: DeploymentMode,
    /// Stream template; each session binds it to its own namespace.
    stream: ConfiguredStream,
    /// Dumper, cleaner, and mapper.
    verification: DataVerification,
    /// Event sink.
    log: Arc<dyn HarnessLog>,
    /// Optional artifact directory for transcripts.
    artifacts: Option<ArtifactStore>,
}

impl WriteHarness {
    /// Creates a harness in OSS mode over the default stream.
    #[must_use]
    pub fn new(
        connector: Arc<dyn DestinationConnector>,
        config: ConfigDocument,
        verification: DataVerification,
    ) -> Self {
        Self {
            connector,
            config,
            mode: DeploymentMode::Oss,
            stream: ConfiguredStream::basic(DEFAULT_STREAM_NAME),
            verification,
            log: Arc::new(NoopHarnessLog),
            artifacts: None,
        }
    }

    /// Sets the deployment mode.
    #[must_use]
    pub fn with_mode(mut self, mode: DeploymentMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the stream template.
    #[must_use]
    pub fn with_stream(mut self, stream: ConfiguredStream) -> Self {
        self.stream = stream;
        self
    }

    /// Installs an event sink.
    #[must_use]
    pub fn with_log(mut self, log: Arc<dyn HarnessLog>) -> Self {
        self.log = log;
        self
    }

    /// Stores connector transcripts under the given artifact directory.
    #[must_use]
    pub fn with_artifacts(mut self, artifacts: ArtifactStore) -> Self {
        self.artifacts = Some(artifacts);
        self
    }

    /// Checks the suite configuration, which must succeed.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::CheckMismatches`] when the check does not report
    /// exactly one `SUCCEEDED`, or [`HarnessError::Connector`] on process failure.
    pub async fn run_check(&self) -> Result<CheckOutcome, HarnessError> {
        let fixture = ConfigFixture::new(self.config.locator(), self.mode);
        let connector_error = |source: ConnectorError| HarnessError::Connector {
            context: fixture.to_string(),
            source,
        };
        let run = self.connector.check(&self.config, self.mode).await.map_err(connector_error)?;
        let result = judge_run(&fixture, Expectation::Succeed, &run).map_err(connector_error)?;
        record_fixture(self.log.as_ref(), &result, &run);
        let outcome = result.outcome.clone();
        let report = CheckReport {
            results: vec![result],
        };
        report.into_result()?;
        Ok(outcome.unwrap_or_else(CheckOutcome::succeeded))
    }

    /// Streams `records` through one write session and verifies the result.
    /// The session's cleaner runs exactly once whatever happens.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Connector`] on process failure,
    /// [`HarnessError::WriteMismatches`] listing every failed assertion, or
    /// [`HarnessError::Cleanup`] when only cleanup failed.
    pub async fn run_basic_write(
        &self,
        records: Vec<InputRecord>,
        verify_data_writing: bool,
    ) -> Result<WriteReport, HarnessError> {
        let context = SessionContext::open(self.config.clone(), self.mode, &self.stream);
        self.log.record(&HarnessEvent::SessionOpened {
            session_id: context.session_id.clone(),
            namespace: context.namespace.clone(),
            stream: context.stream.descriptor.to_string(),
            mode: context.mode,
            connector: self.connector.describe(),
        });
        let guard = CleanupGuard {
            cleaner: Arc::clone(&self.verification.cleaner),
            context: context.clone(),
            log: Arc::clone(&self.log),
            armed: true,
        };
        let outcome = self.drive(&context, &records, verify_data_writing).await;
        self.log.record(&HarnessEvent::WriteCompleted {
            session_id: context.session_id.clone(),
            records_sent: records.len(),
            verified: verify_data_writing,
            passed: outcome.is_ok(),
        });
        let cleanup = guard.finish();
        match (outcome, cleanup) {
            (Ok(report), Ok(())) => Ok(report),
            (Ok(_), Err(source)) => Err(HarnessError::Cleanup {
                session_id: context.session_id,
                source,
            }),
            (Err(primary), _) => Err(primary),
        }
    }

    /// Runs the connector and evaluates every assertion.
    async fn drive(
        &self,
        context: &SessionContext,
        records: &[InputRecord],
        verify_data_writing: bool,
    ) -> Result<WriteReport, HarnessError> {
        let checkpoint = checkpoint(context, records.len());
        let input = session_input(context, records, &checkpoint);
        let run = self
            .connector
            .write(&context.config, &context.catalog(), context.mode, input.clone())
            .await
            .map_err(|source| HarnessError::Connector {
                context: context.session_id.clone(),
                source,
            })?;
        self.persist_run(context, &input, &run);
        self.forward_logs(context, &run);
        if !run.exited_cleanly() {
            return Err(HarnessError::Connector {
                context: context.session_id.clone(),
                source: ConnectorError::crashed("write", &run),
            });
        }

        let mut failures = Vec::new();
        let states: Vec<StateMessage> = run.states().into_iter().cloned().collect();
        let expected_state = StateMessage {
            destination_record_count: checkpoint.source_record_count,
            ..checkpoint
        };
        if states.len() != 1 || states[0] != expected_state {
            failures.push(WriteFailure::StateMismatch {
                expected: expected_state,
                actual: states.clone(),
            });
        }

        let mut records_verified = None;
        if verify_data_writing {
            match self.verify_records(context, records) {
                Ok(count) => records_verified = Some(count),
                Err(failure) => failures.push(failure),
            }
        }

        if !failures.is_empty() {
            return Err(HarnessError::WriteMismatches {
                session_id: context.session_id.clone(),
                failures,
            });
        }
        Ok(WriteReport {
            session_id: context.session_id.clone(),
            namespace: context.namespace.clone(),
            records_sent: records.len(),
            states_received: states.len(),
            records_verified,
        })
    }

    /// Dumps, maps, and diffs the persisted records.
    fn verify_records(
        &self,
        context: &SessionContext,
        records: &[InputRecord],
    ) -> Result<usize, WriteFailure> {
        let raw = self.verification.dumper.dump(context).map_err(|source| WriteFailure::Dump {
            source,
        })?;
        let mapper = &self.verification.mapper;
        let mapped = raw
            .iter()
            .map(|record| mapper.map(record))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| WriteFailure::Map {
                source,
                raw: raw.clone(),
            })?;
        let expected: Vec<OutputRecord> =
            records.iter().map(|record| OutputRecord::expected(record, &context.stream)).collect();
        let differ = RecordDiffer::new(context.stream.primary_key.clone(), mapper.ordering());
        let diff = differ.diff(&expected, &mapped);
        if diff.is_empty() {
            return Ok(mapped.len());
        }
        Err(WriteFailure::RecordMismatch {
            diff,
            expected,
            mapped,
            raw,
        })
    }

    /// Forwards connector log messages to the event sink.
    fn forward_logs(&self, context: &SessionContext, run: &ConnectorRun) {
        for line in run.logs() {
            self.log.record(&HarnessEvent::ConnectorLog {
                session_id: Some(context.session_id.clone()),
                level: line.level,
                message: line.message.clone(),
            });
        }
    }

    /// Stores the transcript and stderr when an artifact directory is set.
    fn persist_run(&self, context: &SessionContext, input: &[ConnectorMessage], run: &ConnectorRun) {
        let Some(artifacts) = &self.artifacts else {
            return;
        };
        let transcript = Transcript {
            exit_code: run.exit_code,
            input,
            output: &run.messages,
            stdout_noise: &run.stdout_noise,
        };
        let stored = artifacts.child(&context.session_id).and_then(|session| {
            session.write_json("transcript.json", &transcript)?;
            session.write_text("stderr.log", &run.stderr)
        });
        if let Err(err) = stored {
            self.log.record(&HarnessEvent::ArtifactFailed {
                session_id: context.session_id.clone(),
                message: err.to_string(),
            });
        }
    }
}

// ============================================================================
// SECTION: Session Input
// ============================================================================

/// Builds the checkpoint sent after the records.
fn checkpoint(context: &SessionContext, record_count: usize) -> StateMessage {
    StateMessage {
        stream: context.stream.descriptor.clone(),
        data: json!({ "foo": "bar" }),
        source_record_count: Some(u64::try_from(record_count).unwrap_or(u64::MAX)),
        destination_record_count: None,
    }
}

/// Builds the finite input stream: records, checkpoint, stream completion.
fn session_input(
    context: &SessionContext,
    records: &[InputRecord],
    checkpoint: &StateMessage,
) -> Vec<ConnectorMessage> {
    let stream = &context.stream.descriptor;
    let mut input: Vec<ConnectorMessage> = records
        .iter()
        .map(|record| ConnectorMessage::Record {
            record: RecordMessage {
                stream: stream.clone(),
                data: record.data.clone(),
                emitted_at_ms: record.emitted_at_ms,
            },
        })
        .collect();
    input.push(ConnectorMessage::State {
        state: checkpoint.clone(),
    });
    input.push(ConnectorMessage::Trace {
        trace: TraceMessage::StreamStatus {
            stream: stream.clone(),
            status: StreamStatus::Complete,
        },
    });
    input
}
