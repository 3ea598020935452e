// crates/certify-destinations/src/local_jsonl/verification.rs
// ============================================================================
// Module: Local JSON-Lines Verification
// Description: Dumper, cleaner, and mapper for the local JSON-lines layout.
// Purpose: Read back, normalize, and remove what a write session persisted.
// Dependencies: certify-core, serde_json
// ============================================================================

//! ## Overview
//! The dumper reads the session stream's file; a missing file means nothing
//! was committed. The cleaner removes the session namespace directory. The
//! mapper drops `loaded_at_ms`, the only field the destination derives from
//! the wall clock.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use certify_core::CleanerError;
use certify_core::DestinationCleaner;
use certify_core::DestinationDataDumper;
use certify_core::ExpectedRecordMapper;
use certify_core::OutputRecord;
use certify_core::SessionContext;
use certify_core::VerificationError;

use super::namespace_dir;
use super::stream_file;

/// Reads a session's records back from disk.
#[derive(Debug, Clone)]
pub struct LocalJsonlDataDumper {
    /// Destination root.
    root: PathBuf,
}

impl LocalJsonlDataDumper {
    /// Creates a dumper over `root`.
    #[must_use]
    pub const fn new(root: PathBuf) -> Self {
        Self {
            root,
        }
    }
}

impl DestinationDataDumper for LocalJsonlDataDumper {
    fn dump(&self, context: &SessionContext) -> Result<Vec<OutputRecord>, VerificationError> {
        let path = stream_file(&self.root, &context.stream.descriptor)
            .map_err(|err| VerificationError::Dump(err.to_string()))?;
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(VerificationError::Dump(format!("{}: {err}", path.display())));
            }
        };
        text.lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(index, line)| {
                serde_json::from_str(line).map_err(|err| {
                    VerificationError::Dump(format!("{} line {}: {err}", path.display(), index + 1))
                })
            })
            .collect()
    }
}

/// Removes a session's namespace directory.
#[derive(Debug, Clone)]
pub struct LocalJsonlCleaner {
    /// Destination root.
    root: PathBuf,
}

impl LocalJsonlCleaner {
    /// Creates a cleaner over `root`.
    #[must_use]
    pub const fn new(root: PathBuf) -> Self {
        Self {
            root,
        }
    }
}

impl DestinationCleaner for LocalJsonlCleaner {
    fn clean(&self, context: &SessionContext) -> Result<(), CleanerError> {
        let dir = namespace_dir(&self.root, &context.namespace)
            .map_err(|err| CleanerError::Failed(err.to_string()))?;
        match fs::remove_dir_all(&dir) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(CleanerError::Failed(format!("{}: {err}", dir.display()))),
        }
    }
}

/// Drops the load timestamp so records compare deterministically.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalJsonlMapper;

impl ExpectedRecordMapper for LocalJsonlMapper {
    fn map(&self, record: &OutputRecord) -> Result<OutputRecord, VerificationError> {
        if record.loaded_at_ms.is_none() {
            return Err(VerificationError::Map(format!(
                "record {record} has no loaded_at_ms; it was not written by this destination"
            )));
        }
        let mut mapped = record.clone();
        mapped.loaded_at_ms = None;
        Ok(mapped)
    }
}
