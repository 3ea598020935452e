// crates/certify-destinations/src/io.rs
// ============================================================================
// Module: Destination Wire I/O
// Description: Message output and the shared write loop.
// Purpose: Keep protocol framing out of individual destinations.
// Dependencies: certify-core
// ============================================================================

//! ## Overview
//! [`MessageWriter`] frames one message per line and flushes after each so a
//! harness reading stdout sees messages as they happen. [`pump`] drives the
//! write operation: it feeds records to a [`RecordSink`], commits on every
//! checkpoint, and echoes the checkpoint back with the number of records
//! committed for that stream since its previous checkpoint.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::io::BufRead;
use std::io::Write;

use certify_core::CheckOutcome;
use certify_core::ConfiguredCatalog;
use certify_core::ConnectorMessage;
use certify_core::LogLevel;
use certify_core::LogMessage;
use certify_core::RecordMessage;
use certify_core::StreamDescriptor;
use certify_core::StreamStatus;
use certify_core::TraceError;
use certify_core::TraceMessage;

use crate::error::DestinationError;

// ============================================================================
// SECTION: Output
// ============================================================================

/// Line-framed protocol output.
pub struct MessageWriter<'a> {
    /// Underlying stream (stdout in the binaries).
    sink: &'a mut dyn Write,
}

impl<'a> MessageWriter<'a> {
    /// Wraps an output stream.
    pub fn new(sink: &'a mut dyn Write) -> Self {
        Self {
            sink,
        }
    }

    /// Writes one message and flushes.
    ///
    /// # Errors
    ///
    /// Returns [`DestinationError::Io`] when encoding or writing fails.
    pub fn emit(&mut self, message: &ConnectorMessage) -> Result<(), DestinationError> {
        let line = message.to_line().map_err(DestinationError::io)?;
        writeln!(self.sink, "{line}").map_err(DestinationError::io)?;
        self.sink.flush().map_err(DestinationError::io)
    }

    /// Emits a `LOG` message.
    ///
    /// # Errors
    ///
    /// Returns [`DestinationError::Io`] when writing fails.
    pub fn log(&mut self, level: LogLevel, message: impl Into<String>) -> Result<(), DestinationError> {
        self.emit(&ConnectorMessage::Log {
            log: LogMessage {
                level,
                message: message.into(),
            },
        })
    }

    /// Emits the `CONNECTION_STATUS` of a check.
    ///
    /// # Errors
    ///
    /// Returns [`DestinationError::Io`] when writing fails.
    pub fn status(&mut self, outcome: CheckOutcome) -> Result<(), DestinationError> {
        self.emit(&ConnectorMessage::ConnectionStatus {
            connection_status: outcome,
        })
    }

    /// Emits an error trace describing a fatal failure.
    ///
    /// # Errors
    ///
    /// Returns [`DestinationError::Io`] when writing fails.
    pub fn error_trace(&mut self, error: &DestinationError) -> Result<(), DestinationError> {
        self.emit(&ConnectorMessage::Trace {
            trace: TraceMessage::Error {
                error: TraceError {
                    message: error.to_string(),
                    internal_message: None,
                },
            },
        })
    }
}

// ============================================================================
// SECTION: Write Loop
// ============================================================================

/// Storage side of a destination's write operation.
pub trait RecordSink {
    /// Accepts one record. Accepted records count toward the next checkpoint.
    ///
    /// # Errors
    ///
    /// Returns [`DestinationError`] when the record cannot be accepted.
    fn accept(
        &mut self,
        record: RecordMessage,
        output: &mut MessageWriter<'_>,
    ) -> Result<(), DestinationError>;

    /// Makes everything accepted for `stream` durable.
    ///
    /// # Errors
    ///
    /// Returns [`DestinationError`] when the commit fails.
    fn commit(&mut self, _stream: &StreamDescriptor) -> Result<(), DestinationError> {
        Ok(())
    }

    /// Called once after input ends.
    ///
    /// # Errors
    ///
    /// Returns [`DestinationError`] when final commits fail.
    fn finish(&mut self, _output: &mut MessageWriter<'_>) -> Result<(), DestinationError> {
        Ok(())
    }
}

/// Runs the write loop until input ends. Returns the number of records
/// accepted.
///
/// # Errors
///
/// Returns [`DestinationError::Protocol`] for malformed input or records on
/// streams outside the catalog, and any error raised by the sink.
pub fn pump(
    input: &mut dyn BufRead,
    catalog: &ConfiguredCatalog,
    output: &mut MessageWriter<'_>,
    sink: &mut dyn RecordSink,
) -> Result<u64, DestinationError> {
    let known: BTreeSet<&StreamDescriptor> =
        catalog.streams.iter().map(|stream| &stream.descriptor).collect();
    let mut pending: BTreeMap<StreamDescriptor, u64> = BTreeMap::new();
    let mut total = 0_u64;
    for (index, line) in input.lines().enumerate() {
        let line = line.map_err(DestinationError::io)?;
        if line.trim().is_empty() {
            continue;
        }
        let Some(message) = ConnectorMessage::parse_line(&line) else {
            return Err(DestinationError::Protocol(format!(
                "input line {} is not a protocol message",
                index + 1
            )));
        };
        match message {
            ConnectorMessage::Record {
                record,
            } => {
                if !known.contains(&record.stream) {
                    return Err(DestinationError::Protocol(format!(
                        "record for stream {} which is not in the catalog",
                        record.stream
                    )));
                }
                let stream = record.stream.clone();
                sink.accept(record, output)?;
                *pending.entry(stream).or_default() += 1;
                total += 1;
            }
            ConnectorMessage::State {
                mut state,
            } => {
                sink.commit(&state.stream)?;
                state.destination_record_count =
                    Some(pending.remove(&state.stream).unwrap_or_default());
                output.emit(&ConnectorMessage::State {
                    state,
                })?;
            }
            ConnectorMessage::Trace {
                trace: TraceMessage::StreamStatus {
                    stream,
                    status,
                },
            } => {
                output.log(LogLevel::Debug, format!("stream {stream} is {}", status_label(status)))?;
            }
            other => {
                return Err(DestinationError::Protocol(format!(
                    "unexpected {} message on input",
                    other.kind()
                )));
            }
        }
    }
    sink.finish(output)?;
    Ok(total)
}

/// Returns the wire label of a stream status.
const fn status_label(status: StreamStatus) -> &'static str {
    match status {
        StreamStatus::Started => "STARTED",
        StreamStatus::Running => "RUNNING",
        StreamStatus::Complete => "COMPLETE",
        StreamStatus::Incomplete => "INCOMPLETE",
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::panic,
        clippy::missing_docs_in_private_items,
        reason = "Test-only assertions favor direct unwrap and panics."
    )]

    use certify_core::ConfiguredCatalog;
    use certify_core::ConfiguredStream;
    use certify_core::ConnectorMessage;
    use certify_core::RecordMessage;
    use certify_core::StreamDescriptor;

    use super::MessageWriter;
    use super::RecordSink;
    use super::pump;
    use crate::error::DestinationError;

    #[derive(Default)]
    struct Collect {
        records: Vec<RecordMessage>,
        commits: usize,
        finished: bool,
    }

    impl RecordSink for Collect {
        fn accept(
            &mut self,
            record: RecordMessage,
            _output: &mut MessageWriter<'_>,
        ) -> Result<(), DestinationError> {
            self.records.push(record);
            Ok(())
        }

        fn commit(&mut self, _stream: &StreamDescriptor) -> Result<(), DestinationError> {
            self.commits += 1;
            Ok(())
        }

        fn finish(&mut self, _output: &mut MessageWriter<'_>) -> Result<(), DestinationError> {
            self.finished = true;
            Ok(())
        }
    }

    fn catalog() -> ConfiguredCatalog {
        ConfiguredCatalog {
            streams: vec![ConfiguredStream::basic("users").in_namespace("ns")],
        }
    }

    const RECORD: &str = r#"{"type":"RECORD","record":{"stream":{"namespace":"ns","name":"users"},"data":{"id":1},"emitted_at_ms":5}}"#;
    const STATE: &str =
        r#"{"type":"STATE","state":{"stream":{"namespace":"ns","name":"users"},"data":{"c":1}}}"#;

    fn outputs(bytes: &[u8]) -> Vec<ConnectorMessage> {
        String::from_utf8_lossy(bytes)
            .lines()
            .map(|line| ConnectorMessage::parse_line(line).unwrap())
            .collect()
    }

    #[test]
    fn checkpoints_echo_the_records_committed_since_the_previous_one() {
        let input = format!("{RECORD}\n{RECORD}\n{STATE}\n\n{RECORD}\n{STATE}\n");
        let mut out = Vec::new();
        let mut sink = Collect::default();

        let total = {
            let mut writer = MessageWriter::new(&mut out);
            pump(&mut input.as_bytes(), &catalog(), &mut writer, &mut sink).unwrap()
        };

        assert_eq!(total, 3);
        assert_eq!(sink.records.len(), 3);
        assert_eq!(sink.commits, 2);
        assert!(sink.finished);
        let counts: Vec<_> = outputs(&out)
            .into_iter()
            .filter_map(|message| match message {
                ConnectorMessage::State {
                    state,
                } => state.destination_record_count,
                _ => None,
            })
            .collect();
        assert_eq!(counts, vec![2, 1]);
    }

    #[test]
    fn records_outside_the_catalog_are_rejected() {
        let input = RECORD.replace("users", "orders");
        let mut out = Vec::new();
        let mut writer = MessageWriter::new(&mut out);

        let err = pump(&mut input.as_bytes(), &catalog(), &mut writer, &mut Collect::default())
            .unwrap_err();

        assert!(matches!(err, DestinationError::Protocol(_)));
        assert!(err.to_string().contains("ns.orders"));
    }

    #[test]
    fn garbage_input_is_a_protocol_violation() {
        let input = format!("{RECORD}\nnot json\n");
        let mut out = Vec::new();
        let mut writer = MessageWriter::new(&mut out);

        let err = pump(&mut input.as_bytes(), &catalog(), &mut writer, &mut Collect::default())
            .unwrap_err();

        assert_eq!(err, DestinationError::Protocol("input line 2 is not a protocol message".into()));
    }
}
