// crates/certify-core/src/core/records.rs
// ============================================================================
// Module: Records and Streams
// Description: Input records, comparable output records, and catalogs.
// Purpose: Describe what is written and what is read back for comparison.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! [`InputRecord`] values are streamed to the connector. [`OutputRecord`] is
//! the comparable shape: dumpers produce raw output records, mappers
//! normalize them, and the differ compares them with the expected records
//! derived from the inputs.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Streams
// ============================================================================

/// Identifies a stream within an optional namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StreamDescriptor {
    /// Stream namespace (schema, directory, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Stream name.
    pub name: String,
}

impl StreamDescriptor {
    /// Creates a descriptor.
    #[must_use]
    pub fn new(namespace: Option<String>, name: impl Into<String>) -> Self {
        Self {
            namespace,
            name: name.into(),
        }
    }
}

impl fmt::Display for StreamDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(namespace) => write!(f, "{namespace}.{}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// How records are imported into the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportType {
    /// Records are appended.
    Append,
    /// Existing records are replaced.
    Overwrite,
}

/// Stream configuration sent to the connector alongside records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfiguredStream {
    /// Stream identity.
    pub descriptor: StreamDescriptor,
    /// JSON schema of the record data.
    pub schema: Value,
    /// Import behavior.
    pub import_type: ImportType,
    /// Top-level data fields forming the primary key (may be empty).
    #[serde(default)]
    pub primary_key: Vec<String>,
    /// Generation of the data being written.
    pub generation_id: i64,
    /// Oldest generation the destination must retain.
    pub minimum_generation_id: i64,
    /// Sync identifier stamped into record metadata.
    pub sync_id: i64,
}

impl ConfiguredStream {
    /// Default stream used by basic write runs: one integer `id` column.
    #[must_use]
    pub fn basic(name: impl Into<String>) -> Self {
        Self {
            descriptor: StreamDescriptor::new(None, name),
            schema: json!({
                "type": "object",
                "properties": {
                    "id": { "type": "integer" }
                }
            }),
            import_type: ImportType::Append,
            primary_key: Vec::new(),
            generation_id: 0,
            minimum_generation_id: 0,
            sync_id: 42,
        }
    }

    /// Returns a copy bound to the given namespace.
    #[must_use]
    pub fn in_namespace(&self, namespace: &str) -> Self {
        let mut stream = self.clone();
        stream.descriptor.namespace = Some(namespace.to_string());
        stream
    }
}

/// Catalog of streams for one write invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfiguredCatalog {
    /// Configured streams.
    pub streams: Vec<ConfiguredStream>,
}

// ============================================================================
// SECTION: Records
// ============================================================================

/// Record fed to the connector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputRecord {
    /// Record payload (a JSON object).
    pub data: Value,
    /// Source emission time in epoch milliseconds.
    pub emitted_at_ms: i64,
}

impl InputRecord {
    /// Creates an input record.
    #[must_use]
    pub const fn new(data: Value, emitted_at_ms: i64) -> Self {
        Self {
            data,
            emitted_at_ms,
        }
    }
}

/// Per-record metadata written by destinations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputRecordMeta {
    /// Sync that wrote the record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_id: Option<i64>,
    /// Field-level changes applied by the destination (nulling, truncation).
    #[serde(default)]
    pub changes: Vec<Value>,
}

/// Comparable record shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputRecord {
    /// Extraction time in epoch milliseconds.
    pub extracted_at_ms: i64,
    /// Generation identifier, when the destination records one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation_id: Option<i64>,
    /// Load time in epoch milliseconds, when the destination records one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loaded_at_ms: Option<i64>,
    /// Record payload.
    pub data: Value,
    /// Destination metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<OutputRecordMeta>,
}

impl OutputRecord {
    /// Derives the record a destination is expected to persist for an input.
    #[must_use]
    pub fn expected(input: &InputRecord, stream: &ConfiguredStream) -> Self {
        Self {
            extracted_at_ms: input.emitted_at_ms,
            generation_id: Some(stream.generation_id),
            loaded_at_ms: None,
            data: input.data.clone(),
            meta: Some(OutputRecordMeta {
                sync_id: Some(stream.sync_id),
                changes: Vec::new(),
            }),
        }
    }
}

impl fmt::Display for OutputRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(text) => f.write_str(&text),
            Err(_) => write!(f, "<unrenderable record: {}>", self.data),
        }
    }
}
