// crates/certify-destinations/src/error.rs
// ============================================================================
// Module: Destination Errors
// Description: Failures raised inside reference destinations.
// Purpose: Map destination failures onto protocol-visible outcomes.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! A [`DestinationError`] raised during `check` becomes the message of a
//! `FAILED` connection status, so the configuration variant renders its text
//! verbatim. Raised during `write`, any error becomes an error trace on stdout
//! and a non-zero exit.

use thiserror::Error;

/// Destination failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DestinationError {
    /// The configuration document is rejected.
    #[error("{0}")]
    Config(String),
    /// Input on stdin violates the protocol.
    #[error("protocol violation: {0}")]
    Protocol(String),
    /// Reading input or writing output failed.
    #[error("io error: {0}")]
    Io(String),
    /// Storage could not be written.
    #[error("storage error: {0}")]
    Storage(String),
    /// Intentional failure after a configured number of records.
    #[error("Failing Destination: failed after {records} records")]
    Failing {
        /// Records accepted before failing.
        records: u64,
    },
}

impl DestinationError {
    /// Builds an I/O error from any displayable source.
    pub(crate) fn io(err: impl std::fmt::Display) -> Self {
        Self::Io(err.to_string())
    }
}
