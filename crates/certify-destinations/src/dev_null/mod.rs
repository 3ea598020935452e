// crates/certify-destinations/src/dev_null/mod.rs
// ============================================================================
// Module: Dev-Null Destination
// Description: Destination that accepts records and keeps none of them.
// Purpose: Certify the check and unverified write paths without storage.
// Dependencies: certify-core, rand, serde_json
// ============================================================================

//! ## Overview
//! Dev-null acknowledges every checkpoint but persists nothing, so a
//! certification run against it must disable data verification. The
//! [`DevNullDataDumper`] refuses to read back to make that mistake visible.

pub mod config;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use certify_core::ConfiguredCatalog;
use certify_core::DataVerification;
use certify_core::DeploymentMode;
use certify_core::DestinationDataDumper;
use certify_core::LogLevel;
use certify_core::NoopDestinationCleaner;
use certify_core::NoopExpectedRecordMapper;
use certify_core::OutputRecord;
use certify_core::RecordMessage;
use certify_core::SessionContext;
use certify_core::VerificationError;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde_json::Value;

pub use self::config::DevNullConfig;
pub use self::config::LoggingConfig;
pub use self::config::TestDestination;
use crate::cli::Destination;
use crate::error::DestinationError;
use crate::io::MessageWriter;
use crate::io::RecordSink;

// ============================================================================
// SECTION: Destination
// ============================================================================

/// Dev-null destination.
#[derive(Debug, Clone, Copy, Default)]
pub struct DevNullDestination;

impl DevNullDestination {
    /// Verification collaborators for dev-null runs: nothing to clean, nothing
    /// to map, and a dumper that refuses to read back.
    #[must_use]
    pub fn verification() -> DataVerification {
        DataVerification::new(
            Arc::new(DevNullDataDumper),
            Arc::new(NoopDestinationCleaner),
            Arc::new(NoopExpectedRecordMapper),
        )
    }
}

impl Destination for DevNullDestination {
    fn specification(&self, mode: DeploymentMode) -> Value {
        config::specification(mode)
    }

    fn check(&self, config: &Value, mode: DeploymentMode) -> Result<(), DestinationError> {
        DevNullConfig::parse(config, mode).map(|_| ())
    }

    fn open_sink(
        &self,
        config: &Value,
        _catalog: &ConfiguredCatalog,
        mode: DeploymentMode,
    ) -> Result<Box<dyn RecordSink>, DestinationError> {
        let config = DevNullConfig::parse(config, mode)?;
        Ok(match config.test_destination {
            TestDestination::Logging {
                logging_config,
            } => Box::new(LoggingSink::new(&logging_config)),
            TestDestination::Silent => Box::new(SilentSink),
            TestDestination::Throttled {
                millis_per_record,
            } => Box::new(ThrottledSink {
                delay: Duration::from_millis(millis_per_record),
            }),
            TestDestination::Failing {
                num_messages,
            } => Box::new(FailingSink {
                limit: num_messages,
                accepted: 0,
            }),
        })
    }
}

/// Dumper that reports dev-null as unreadable.
#[derive(Debug, Clone, Copy, Default)]
pub struct DevNullDataDumper;

impl DestinationDataDumper for DevNullDataDumper {
    fn dump(&self, _context: &SessionContext) -> Result<Vec<OutputRecord>, VerificationError> {
        Err(VerificationError::Unsupported("dev-null discards every record".to_string()))
    }
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Discards records.
struct SilentSink;

impl RecordSink for SilentSink {
    fn accept(
        &mut self,
        _record: RecordMessage,
        _output: &mut MessageWriter<'_>,
    ) -> Result<(), DestinationError> {
        Ok(())
    }
}

/// Discards records after sleeping.
struct ThrottledSink {
    /// Delay per record.
    delay: Duration,
}

impl RecordSink for ThrottledSink {
    fn accept(
        &mut self,
        _record: RecordMessage,
        _output: &mut MessageWriter<'_>,
    ) -> Result<(), DestinationError> {
        thread::sleep(self.delay);
        Ok(())
    }
}

/// Fails once the record budget is spent.
struct FailingSink {
    /// Records accepted before failing.
    limit: u64,
    /// Records accepted so far.
    accepted: u64,
}

impl RecordSink for FailingSink {
    fn accept(
        &mut self,
        _record: RecordMessage,
        _output: &mut MessageWriter<'_>,
    ) -> Result<(), DestinationError> {
        if self.accepted >= self.limit {
            return Err(DestinationError::Failing {
                records: self.accepted,
            });
        }
        self.accepted += 1;
        Ok(())
    }
}

/// Which records a logging sink selects.
enum Sampler {
    /// Every record until the cap.
    FirstN,
    /// Records whose 1-based position is a multiple of n.
    EveryNth(u64),
    /// Records drawn with a fixed probability.
    Random {
        /// Selection probability.
        ratio: f64,
        /// Random source.
        rng: StdRng,
    },
}

impl Sampler {
    /// Decides whether the record at 1-based `position` is logged.
    fn select(&mut self, position: u64) -> bool {
        match self {
            Self::FirstN => true,
            Self::EveryNth(nth) => position % *nth == 0,
            Self::Random {
                ratio,
                rng,
            } => rng.r#gen::<f64>() < *ratio,
        }
    }
}

/// Logs a sample of records.
struct LoggingSink {
    /// Selection strategy.
    sampler: Sampler,
    /// Maximum records to log.
    max_entries: u64,
    /// Records seen.
    seen: u64,
    /// Records logged.
    logged: u64,
}

impl LoggingSink {
    /// Builds a sink from its configuration.
    fn new(config: &LoggingConfig) -> Self {
        let (sampler, max_entries) = match config {
            LoggingConfig::FirstN {
                max_entry_count,
            } => (Sampler::FirstN, *max_entry_count),
            LoggingConfig::EveryNth {
                nth_entry_to_log,
                max_entry_count,
            } => (Sampler::EveryNth((*nth_entry_to_log).max(1)), *max_entry_count),
            LoggingConfig::RandomSampling {
                sampling_ratio,
                seed,
                max_entry_count,
            } => {
                let rng = seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
                (
                    Sampler::Random {
                        ratio: *sampling_ratio,
                        rng,
                    },
                    *max_entry_count,
                )
            }
        };
        Self {
            sampler,
            max_entries,
            seen: 0,
            logged: 0,
        }
    }
}

impl RecordSink for LoggingSink {
    fn accept(
        &mut self,
        record: RecordMessage,
        output: &mut MessageWriter<'_>,
    ) -> Result<(), DestinationError> {
        self.seen += 1;
        if self.logged >= self.max_entries || !self.sampler.select(self.seen) {
            return Ok(());
        }
        self.logged += 1;
        output.log(
            LogLevel::Info,
            format!("[{}] record {}: {}", record.stream, self.seen, record.data),
        )
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::missing_docs_in_private_items,
        reason = "Test-only assertions favor direct unwrap."
    )]

    use certify_core::ConnectorMessage;
    use certify_core::RecordMessage;
    use certify_core::StreamDescriptor;
    use serde_json::json;

    use super::FailingSink;
    use super::LoggingConfig;
    use super::LoggingSink;
    use crate::error::DestinationError;
    use crate::io::MessageWriter;
    use crate::io::RecordSink;

    fn record(id: u64) -> RecordMessage {
        RecordMessage {
            stream: StreamDescriptor::new(None, "users"),
            data: json!({ "id": id }),
            emitted_at_ms: 1,
        }
    }

    fn logged_lines(sink: &mut dyn RecordSink, count: u64) -> Vec<String> {
        let mut out = Vec::new();
        {
            let mut writer = MessageWriter::new(&mut out);
            for id in 1 ..= count {
                sink.accept(record(id), &mut writer).unwrap();
            }
        }
        String::from_utf8_lossy(&out)
            .lines()
            .filter_map(|line| match ConnectorMessage::parse_line(line) {
                Some(ConnectorMessage::Log {
                    log,
                }) => Some(log.message),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn first_n_stops_at_the_cap() {
        let mut sink = LoggingSink::new(&LoggingConfig::FirstN {
            max_entry_count: 2,
        });
        let lines = logged_lines(&mut sink, 5);
        assert_eq!(lines, vec![
            "[users] record 1: {\"id\":1}".to_string(),
            "[users] record 2: {\"id\":2}".to_string(),
        ]);
    }

    #[test]
    fn every_nth_logs_multiples() {
        let mut sink = LoggingSink::new(&LoggingConfig::EveryNth {
            nth_entry_to_log: 3,
            max_entry_count: 10,
        });
        let lines = logged_lines(&mut sink, 7);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("record 3"));
        assert!(lines[1].contains("record 6"));
    }

    #[test]
    fn seeded_sampling_is_reproducible() {
        let config = LoggingConfig::RandomSampling {
            sampling_ratio: 0.5,
            seed: Some(7),
            max_entry_count: 100,
        };
        let first = logged_lines(&mut LoggingSink::new(&config), 50);
        let second = logged_lines(&mut LoggingSink::new(&config), 50);
        assert_eq!(first, second);
    }

    #[test]
    fn sampling_extremes_log_all_or_nothing() {
        let all = LoggingConfig::RandomSampling {
            sampling_ratio: 1.0,
            seed: Some(1),
            max_entry_count: 100,
        };
        let none = LoggingConfig::RandomSampling {
            sampling_ratio: 0.0,
            seed: Some(1),
            max_entry_count: 100,
        };
        assert_eq!(logged_lines(&mut LoggingSink::new(&all), 10).len(), 10);
        assert!(logged_lines(&mut LoggingSink::new(&none), 10).is_empty());
    }

    #[test]
    fn failing_sink_accepts_its_budget_then_fails() {
        let mut sink = FailingSink {
            limit: 2,
            accepted: 0,
        };
        let mut out = Vec::new();
        let mut writer = MessageWriter::new(&mut out);
        sink.accept(record(1), &mut writer).unwrap();
        sink.accept(record(2), &mut writer).unwrap();
        let err = sink.accept(record(3), &mut writer).unwrap_err();
        assert_eq!(err, DestinationError::Failing {
            records: 2
        });
        assert_eq!(err.to_string(), "Failing Destination: failed after 2 records");
    }
}
