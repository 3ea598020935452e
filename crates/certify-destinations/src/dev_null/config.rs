// crates/certify-destinations/src/dev_null/config.rs
// ============================================================================
// Module: Dev-Null Configuration
// Description: Schema and typed model of the dev-null configuration.
// Purpose: Validate configs per deployment mode before any record is read.
// Dependencies: serde, serde_json, jsonschema
// ============================================================================

//! ## Overview
//! The configuration selects one behavior under `test_destination`:
//!
//! ```json
//! { "test_destination": { "test_destination_type": "LOGGING",
//!     "logging_config": { "logging_type": "FirstN", "max_entry_count": 100 } } }
//! ```
//!
//! OSS accepts `LOGGING`, `SILENT`, `THROTTLED`, and `FAILING`. CLOUD only
//! accepts `SILENT`. A discriminator outside the mode's set is rejected with
//! `Value '<value>' is not defined in the schema`; every other violation is
//! reported by JSON schema validation.

// ============================================================================
// SECTION: Imports
// ============================================================================

use certify_core::DeploymentMode;
use serde::Deserialize;
use serde_json::Value;
use serde_json::json;

use crate::error::DestinationError;
use crate::schema;
use crate::schema::SCHEMA_DIALECT;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Behaviors accepted in OSS mode.
const OSS_TYPES: [&str; 4] = ["LOGGING", "SILENT", "THROTTLED", "FAILING"];
/// Behaviors accepted in CLOUD mode.
const CLOUD_TYPES: [&str; 1] = ["SILENT"];
/// Upper bound on logged entries.
const MAX_LOGGED_ENTRIES: u64 = 1000;
/// Default number of logged entries.
const DEFAULT_MAX_ENTRY_COUNT: u64 = 100;

// ============================================================================
// SECTION: Typed Model
// ============================================================================

/// Root dev-null configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DevNullConfig {
    /// Selected behavior.
    pub test_destination: TestDestination,
}

/// Behavior of the destination.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "test_destination_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TestDestination {
    /// Log a sample of records as `LOG` messages.
    Logging {
        /// Sampling strategy.
        logging_config: LoggingConfig,
    },
    /// Discard records.
    Silent,
    /// Discard records after a fixed delay each.
    Throttled {
        /// Delay per record in milliseconds.
        millis_per_record: u64,
    },
    /// Fail once more than `num_messages` records arrive.
    Failing {
        /// Records accepted before failing.
        num_messages: u64,
    },
}

/// Record sampling strategy for `LOGGING`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "logging_type")]
pub enum LoggingConfig {
    /// Log the first records.
    FirstN {
        /// Records to log.
        #[serde(default = "default_max_entry_count")]
        max_entry_count: u64,
    },
    /// Log every nth record.
    EveryNth {
        /// Distance between logged records.
        nth_entry_to_log: u64,
        /// Records to log.
        #[serde(default = "default_max_entry_count")]
        max_entry_count: u64,
    },
    /// Log each record with a fixed probability.
    RandomSampling {
        /// Probability in `[0, 1]`.
        sampling_ratio: f64,
        /// Seed for reproducible sampling.
        #[serde(default)]
        seed: Option<u64>,
        /// Records to log.
        #[serde(default = "default_max_entry_count")]
        max_entry_count: u64,
    },
}

/// Default entry count for serde.
const fn default_max_entry_count() -> u64 {
    DEFAULT_MAX_ENTRY_COUNT
}

impl DevNullConfig {
    /// Validates a raw document for `mode` and parses it.
    ///
    /// # Errors
    ///
    /// Returns [`DestinationError::Config`] describing the first violation.
    pub fn parse(raw: &Value, mode: DeploymentMode) -> Result<Self, DestinationError> {
        check_discriminator(raw, mode)?;
        schema::validate(&specification(mode), raw)?;
        serde_json::from_value(raw.clone())
            .map_err(|err| DestinationError::Config(format!("invalid configuration: {err}")))
    }
}

// ============================================================================
// SECTION: Schema
// ============================================================================

/// Returns the behaviors accepted under `mode`.
const fn accepted_types(mode: DeploymentMode) -> &'static [&'static str] {
    match mode {
        DeploymentMode::Oss => &OSS_TYPES,
        DeploymentMode::Cloud => &CLOUD_TYPES,
    }
}

/// Rejects discriminator values the mode does not define.
fn check_discriminator(raw: &Value, mode: DeploymentMode) -> Result<(), DestinationError> {
    let value = raw
        .get("test_destination")
        .and_then(|destination| destination.get("test_destination_type"))
        .and_then(Value::as_str);
    match value {
        Some(value) if !accepted_types(mode).contains(&value) => Err(DestinationError::Config(
            format!("Value '{value}' is not defined in the schema"),
        )),
        _ => Ok(()),
    }
}

/// Builds the configuration schema for `mode`.
#[must_use]
pub fn specification(mode: DeploymentMode) -> Value {
    let mut properties = json!({
        "test_destination_type": {
            "type": "string",
            "enum": accepted_types(mode),
        }
    });
    let mut rules = Vec::new();
    if mode == DeploymentMode::Oss {
        if let Some(map) = properties.as_object_mut() {
            map.insert("logging_config".to_string(), logging_schema());
            map.insert("millis_per_record".to_string(), json!({ "type": "integer", "minimum": 0 }));
            map.insert("num_messages".to_string(), json!({ "type": "integer", "minimum": 0 }));
        }
        rules.push(requires("LOGGING", "logging_config"));
        rules.push(requires("THROTTLED", "millis_per_record"));
        rules.push(requires("FAILING", "num_messages"));
    }
    let mut destination = json!({
        "type": "object",
        "required": ["test_destination_type"],
        "properties": properties,
    });
    // `allOf` must not be empty.
    if !rules.is_empty() {
        if let Some(map) = destination.as_object_mut() {
            map.insert("allOf".to_string(), Value::Array(rules));
        }
    }
    json!({
        "$schema": SCHEMA_DIALECT,
        "title": "Dev Null Destination Spec",
        "type": "object",
        "required": ["test_destination"],
        "properties": {
            "test_destination": destination,
        }
    })
}

/// Schema of the `logging_config` object.
fn logging_schema() -> Value {
    json!({
        "type": "object",
        "required": ["logging_type"],
        "properties": {
            "logging_type": { "type": "string", "enum": ["FirstN", "EveryNth", "RandomSampling"] },
            "max_entry_count": { "type": "integer", "minimum": 1, "maximum": MAX_LOGGED_ENTRIES },
            "nth_entry_to_log": { "type": "integer", "minimum": 1 },
            "sampling_ratio": { "type": "number", "minimum": 0, "maximum": 1 },
            "seed": { "type": "integer", "minimum": 0 }
        },
        "allOf": [
            {
                "if": { "properties": { "logging_type": { "const": "EveryNth" } } },
                "then": { "required": ["nth_entry_to_log"] }
            },
            {
                "if": { "properties": { "logging_type": { "const": "RandomSampling" } } },
                "then": { "required": ["sampling_ratio"] }
            }
        ]
    })
}

/// Conditional rule requiring `field` when the behavior is `kind`.
fn requires(kind: &str, field: &str) -> Value {
    json!({
        "if": { "properties": { "test_destination_type": { "const": kind } } },
        "then": { "required": [field] }
    })
}

// ============================================================================
// SECTION: Tests
// ============================================================================
