// crates/certify-destinations/src/local_jsonl/mod.rs
// ============================================================================
// Module: Local JSON-Lines Destination
// Description: Destination persisting records as JSON lines on local disk.
// Purpose: Certify the verified write path against real storage.
// Dependencies: certify-core, serde, serde_json, time
// ============================================================================

//! ## Overview
//! Records for stream `name` in namespace `ns` are appended to
//! `<destination_path>/<ns>/<name>.jsonl`, one output record per line, stamped
//! with the load time. Buffered lines are flushed on every checkpoint and at
//! end of input, so an echoed checkpoint means its records are on disk.
//! Streams configured with `overwrite` start from an empty file.
//! Invariants:
//! - Namespace and stream names are single path components.

mod verification;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs;
use std::fs::File;
use std::fs::OpenOptions;
use std::io::BufWriter;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use certify_core::ConfiguredCatalog;
use certify_core::ConfiguredStream;
use certify_core::DataVerification;
use certify_core::DeploymentMode;
use certify_core::ImportType;
use certify_core::InputRecord;
use certify_core::OutputRecord;
use certify_core::RecordMessage;
use certify_core::StreamDescriptor;
use serde::Deserialize;
use serde_json::Value;
use serde_json::json;
use time::OffsetDateTime;

pub use self::verification::LocalJsonlCleaner;
pub use self::verification::LocalJsonlDataDumper;
pub use self::verification::LocalJsonlMapper;
use crate::cli::Destination;
use crate::error::DestinationError;
use crate::io::MessageWriter;
use crate::io::RecordSink;
use crate::schema;
use crate::schema::SCHEMA_DIALECT;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Directory used for streams without a namespace.
const DEFAULT_NAMESPACE_DIR: &str = "_default";
/// File extension of stream files.
const STREAM_FILE_EXTENSION: &str = "jsonl";
/// Probe file written by `check`.
const CHECK_PROBE_FILE: &str = ".certify-check";

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Local JSON-lines configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LocalJsonlConfig {
    /// Root directory for all namespaces.
    pub destination_path: PathBuf,
}

impl LocalJsonlConfig {
    /// Validates and parses a raw document.
    ///
    /// # Errors
    ///
    /// Returns [`DestinationError::Config`] describing the first violation.
    pub fn parse(raw: &Value) -> Result<Self, DestinationError> {
        schema::validate(&specification(), raw)?;
        serde_json::from_value(raw.clone())
            .map_err(|err| DestinationError::Config(format!("invalid configuration: {err}")))
    }
}

/// Configuration schema; identical in every mode.
#[must_use]
pub fn specification() -> Value {
    json!({
        "$schema": SCHEMA_DIALECT,
        "title": "Local JSON Lines Destination Spec",
        "type": "object",
        "required": ["destination_path"],
        "additionalProperties": false,
        "properties": {
            "destination_path": {
                "type": "string",
                "minLength": 1,
                "description": "Directory receiving one sub-directory per namespace."
            }
        }
    })
}

// ============================================================================
// SECTION: Destination
// ============================================================================

/// Local JSON-lines destination.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalJsonlDestination;

impl LocalJsonlDestination {
    /// Verification collaborators reading back from `root`.
    #[must_use]
    pub fn verification(root: impl Into<PathBuf>) -> DataVerification {
        let root = root.into();
        DataVerification::new(
            Arc::new(LocalJsonlDataDumper::new(root.clone())),
            Arc::new(LocalJsonlCleaner::new(root)),
            Arc::new(LocalJsonlMapper),
        )
    }
}

impl Destination for LocalJsonlDestination {
    fn specification(&self, _mode: DeploymentMode) -> Value {
        specification()
    }

    fn check(&self, config: &Value, _mode: DeploymentMode) -> Result<(), DestinationError> {
        let config = LocalJsonlConfig::parse(config)?;
        let root = &config.destination_path;
        let unwritable = |err: std::io::Error| {
            DestinationError::Storage(format!("cannot write to {}: {err}", root.display()))
        };
        fs::create_dir_all(root).map_err(unwritable)?;
        let probe = root.join(CHECK_PROBE_FILE);
        fs::write(&probe, b"ok").map_err(unwritable)?;
        fs::remove_file(&probe).map_err(unwritable)
    }

    fn open_sink(
        &self,
        config: &Value,
        catalog: &ConfiguredCatalog,
        _mode: DeploymentMode,
    ) -> Result<Box<dyn RecordSink>, DestinationError> {
        let config = LocalJsonlConfig::parse(config)?;
        Ok(Box::new(JsonlSink::open(config.destination_path, catalog)?))
    }
}

// ============================================================================
// SECTION: Layout
// ============================================================================

/// Returns the file holding a stream's records under `root`.
///
/// # Errors
///
/// Returns [`DestinationError::Protocol`] when a name is not a single path
/// component.
pub fn stream_file(root: &Path, stream: &StreamDescriptor) -> Result<PathBuf, DestinationError> {
    let namespace = stream.namespace.as_deref().unwrap_or(DEFAULT_NAMESPACE_DIR);
    Ok(namespace_dir(root, namespace)?
        .join(format!("{}.{STREAM_FILE_EXTENSION}", path_component(&stream.name)?)))
}

/// Returns the directory of one namespace under `root`.
///
/// # Errors
///
/// Returns [`DestinationError::Protocol`] when the namespace is not a single
/// path component.
pub fn namespace_dir(root: &Path, namespace: &str) -> Result<PathBuf, DestinationError> {
    Ok(root.join(path_component(namespace)?))
}

/// Accepts names that cannot escape their parent directory.
fn path_component(name: &str) -> Result<&str, DestinationError> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0']);
    if invalid {
        return Err(DestinationError::Protocol(format!("invalid stream path component '{name}'")));
    }
    Ok(name)
}

// ============================================================================
// SECTION: Sink
// ============================================================================

/// Appends output records to per-stream files.
struct JsonlSink {
    /// Destination root.
    root: PathBuf,
    /// Catalog streams by descriptor.
    streams: BTreeMap<StreamDescriptor, ConfiguredStream>,
    /// Open writers by stream.
    writers: BTreeMap<StreamDescriptor, BufWriter<File>>,
}

impl JsonlSink {
    /// Prepares storage, truncating `overwrite` streams.
    fn open(root: PathBuf, catalog: &ConfiguredCatalog) -> Result<Self, DestinationError> {
        let mut streams = BTreeMap::new();
        for stream in &catalog.streams {
            if stream.import_type == ImportType::Overwrite {
                let path = stream_file(&root, &stream.descriptor)?;
                match fs::remove_file(&path) {
                    Err(err) if err.kind() != std::io::ErrorKind::NotFound => {
                        return Err(storage_error(&path, &err));
                    }
                    _ => {}
                }
            }
            streams.insert(stream.descriptor.clone(), stream.clone());
        }
        Ok(Self {
            root,
            streams,
            writers: BTreeMap::new(),
        })
    }

    /// Returns the writer for a stream, opening its file on first use.
    fn writer(&mut self, stream: &StreamDescriptor) -> Result<&mut BufWriter<File>, DestinationError> {
        if !self.writers.contains_key(stream) {
            let path = stream_file(&self.root, stream)?;
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(|err| storage_error(parent, &err))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map_err(|err| storage_error(&path, &err))?;
            self.writers.insert(stream.clone(), BufWriter::new(file));
        }
        self.writers
            .get_mut(stream)
            .ok_or_else(|| DestinationError::Storage(format!("no writer for stream {stream}")))
    }
}

impl RecordSink for JsonlSink {
    fn accept(
        &mut self,
        record: RecordMessage,
        _output: &mut MessageWriter<'_>,
    ) -> Result<(), DestinationError> {
        let stream = self.streams.get(&record.stream).ok_or_else(|| {
            DestinationError::Protocol(format!("record for unknown stream {}", record.stream))
        })?;
        let input = InputRecord::new(record.data, record.emitted_at_ms);
        let mut output = OutputRecord::expected(&input, stream);
        output.loaded_at_ms = Some(now_ms());
        let line = serde_json::to_string(&output).map_err(DestinationError::io)?;
        let writer = self.writer(&record.stream)?;
        writeln!(writer, "{line}").map_err(|err| DestinationError::Storage(err.to_string()))
    }

    fn commit(&mut self, stream: &StreamDescriptor) -> Result<(), DestinationError> {
        match self.writers.get_mut(stream) {
            Some(writer) => flush(writer),
            None => Ok(()),
        }
    }

    fn finish(&mut self, _output: &mut MessageWriter<'_>) -> Result<(), DestinationError> {
        self.writers.values_mut().try_for_each(flush)
    }
}

/// Flushes buffered lines through to the file.
fn flush(writer: &mut BufWriter<File>) -> Result<(), DestinationError> {
    writer.flush().map_err(|err| DestinationError::Storage(err.to_string()))?;
    writer.get_ref().sync_data().map_err(|err| DestinationError::Storage(err.to_string()))
}

/// Builds a storage error naming the path.
fn storage_error(path: &Path, err: &std::io::Error) -> DestinationError {
    DestinationError::Storage(format!("{}: {err}", path.display()))
}

/// Current time in epoch milliseconds.
fn now_ms() -> i64 {
    let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
    i64::try_from(millis).unwrap_or(i64::MAX)
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

    use std::path::Path;

    use certify_core::ConfiguredCatalog;
    use certify_core::ConfiguredStream;
    use certify_core::DeploymentMode;
    use certify_core::ImportType;
    use certify_core::RecordMessage;
    use certify_core::StreamDescriptor;
    use serde_json::json;

    use super::LocalJsonlDestination;
    use super::stream_file;
    use crate::cli::Destination;
    use crate::error::DestinationError;
    use crate::io::MessageWriter;

    fn record(stream: &ConfiguredStream, id: u64) -> RecordMessage {
        RecordMessage {
            stream: stream.descriptor.clone(),
            data: json!({ "id": id }),
            emitted_at_ms: 10,
        }
    }

    fn write_two(root: &Path, stream: &ConfiguredStream) {
        let catalog = ConfiguredCatalog {
            streams: vec![stream.clone()],
        };
        let config = json!({ "destination_path": root });
        let mut sink =
            LocalJsonlDestination.open_sink(&config, &catalog, DeploymentMode::Oss).unwrap();
        let mut out = Vec::new();
        let mut writer = MessageWriter::new(&mut out);
        sink.accept(record(stream, 1), &mut writer).unwrap();
        sink.accept(record(stream, 2), &mut writer).unwrap();
        sink.finish(&mut writer).unwrap();
    }

    #[test]
    fn records_land_in_the_namespace_stream_file() {
        let dir = tempfile::tempdir().unwrap();
        let stream = ConfiguredStream::basic("users").in_namespace("ns1");

        write_two(dir.path(), &stream);

        let path = dir.path().join("ns1").join("users.jsonl");
        let lines: Vec<serde_json::Value> = std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["data"], json!({ "id": 1 }));
        assert_eq!(lines[0]["extracted_at_ms"], json!(10));
        assert!(lines[0]["loaded_at_ms"].is_i64());
    }

    #[test]
    fn overwrite_streams_start_empty_and_append_streams_accumulate() {
        let dir = tempfile::tempdir().unwrap();
        let mut stream = ConfiguredStream::basic("users").in_namespace("ns1");
        let path = stream_file(dir.path(), &stream.descriptor).unwrap();

        write_two(dir.path(), &stream);
        write_two(dir.path(), &stream);
        assert_eq!(std::fs::read_to_string(&path).unwrap().lines().count(), 4);

        stream.import_type = ImportType::Overwrite;
        write_two(dir.path(), &stream);
        assert_eq!(std::fs::read_to_string(&path).unwrap().lines().count(), 2);
    }

    #[test]
    fn names_cannot_escape_the_root() {
        let root = Path::new("/data");
        let escaping = StreamDescriptor::new(Some("..".to_string()), "users");
        assert!(matches!(stream_file(root, &escaping), Err(DestinationError::Protocol(_))));
        let nested = StreamDescriptor::new(None, "a/b");
        assert!(stream_file(root, &nested).is_err());
        let plain = StreamDescriptor::new(None, "users");
        assert_eq!(stream_file(root, &plain).unwrap(), root.join("_default").join("users.jsonl"));
    }

    #[test]
    fn check_rejects_unwritable_roots() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("plain-file");
        std::fs::write(&file, b"x").unwrap();

        let config = json!({ "destination_path": file.join("nested") });
        let err = LocalJsonlDestination.check(&config, DeploymentMode::Oss).unwrap_err();
        assert!(err.to_string().starts_with("storage error: cannot write to"), "{err}");

        let ok = json!({ "destination_path": dir.path().join("fresh") });
        LocalJsonlDestination.check(&ok, DeploymentMode::Cloud).unwrap();
        assert!(dir.path().join("fresh").is_dir());
    }
}
