// crates/certify-destinations/src/schema.rs
// ============================================================================
// Module: Config Schema Validation
// Description: JSON schema checks for destination configuration documents.
// Purpose: Reject invalid configuration with the validator's own message.
// Dependencies: jsonschema, serde_json
// ============================================================================

//! ## Overview
//! Destinations publish their configuration schema through `spec` and reject
//! documents that violate it. The first validation error becomes the check
//! failure message.

use jsonschema::Draft;
use serde_json::Value;

use crate::error::DestinationError;

/// Draft every destination schema declares.
pub(crate) const SCHEMA_DIALECT: &str = "https://json-schema.org/draft/2020-12/schema";

/// Validates `instance` against `schema`.
///
/// # Errors
///
/// Returns [`DestinationError::Config`] carrying the first validation error.
pub(crate) fn validate(schema: &Value, instance: &Value) -> Result<(), DestinationError> {
    let validator = jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(schema)
        .map_err(|err| DestinationError::Config(format!("connector schema is invalid: {err}")))?;
    let first = validator.iter_errors(instance).next().map(|err| err.to_string());
    match first {
        Some(message) => Err(DestinationError::Config(message)),
        None => Ok(()),
    }
}
