// crates/certify-core/src/error.rs
// ============================================================================
// Module: Harness Errors
// Description: Error taxonomy surfaced by the runners.
// Purpose: Keep fixture, process, assertion, and cleanup failures distinct.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! Runner errors fall into four classes: fixture errors (unreadable
//! documents, bad patterns), connector process errors, assertion failures
//! (check mismatches and write mismatches), and cleanup failures. Assertion
//! failures carry everything needed to diagnose them: the report for check
//! batches and the expected, mapped, and raw records for writes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::FixtureError;
use crate::core::OutputRecord;
use crate::core::StateMessage;
use crate::interfaces::CleanerError;
use crate::interfaces::ConnectorError;
use crate::interfaces::VerificationError;
use crate::runtime::CheckReport;
use crate::runtime::RecordDiff;

// ============================================================================
// SECTION: Write Failures
// ============================================================================

/// One failed assertion within a write session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WriteFailure {
    /// The connector did not echo exactly the expected checkpoint.
    #[error(
        "expected exactly one state message {expected}, got {count}: {actual}",
        expected = render_json(.expected),
        count = .actual.len(),
        actual = render_json(.actual)
    )]
    StateMismatch {
        /// Checkpoint the connector should have echoed.
        expected: StateMessage,
        /// Checkpoints the connector did echo.
        actual: Vec<StateMessage>,
    },
    /// The dumper could not read the destination.
    #[error("reading back destination records failed: {source}")]
    Dump {
        /// Dumper error.
        source: VerificationError,
    },
    /// The mapper rejected a dumped record.
    #[error("mapping destination records failed: {source}; raw records: {raw}", raw = render_json(.raw))]
    Map {
        /// Mapper error.
        source: VerificationError,
        /// Raw dumped records.
        raw: Vec<OutputRecord>,
    },
    /// Mapped records differ from the expected ones.
    #[error(
        "persisted records differ from expected:\n{diff}expected: {expected}\nactual (mapped): {mapped}\nactual (raw): {raw}",
        expected = render_json(.expected),
        mapped = render_json(.mapped),
        raw = render_json(.raw)
    )]
    RecordMismatch {
        /// Complete diff.
        diff: RecordDiff,
        /// Expected records.
        expected: Vec<OutputRecord>,
        /// Mapped actual records.
        mapped: Vec<OutputRecord>,
        /// Raw dumped records.
        raw: Vec<OutputRecord>,
    },
}

/// Renders a value as compact JSON for error output.
fn render_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|err| format!("<unrenderable: {err}>"))
}

/// Renders write failures one per paragraph.
fn render_failures(failures: &[WriteFailure]) -> String {
    failures.iter().map(ToString::to_string).collect::<Vec<_>>().join("\n")
}

// ============================================================================
// SECTION: Harness Error
// ============================================================================

/// Runner failures.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// A fixture or expectation set was malformed.
    #[error(transparent)]
    Fixture(#[from] FixtureError),
    /// The connector process failed.
    #[error("connector failure for {context}: {source}")]
    Connector {
        /// Fixture label or session identifier.
        context: String,
        /// Process error.
        source: ConnectorError,
    },
    /// One or more check fixtures did not meet their expectation.
    #[error("{0}")]
    CheckMismatches(CheckReport),
    /// One or more write assertions failed.
    #[error(
        "write session {session_id} failed:\n{rendered}",
        rendered = render_failures(.failures)
    )]
    WriteMismatches {
        /// Session identifier.
        session_id: String,
        /// Every failed assertion.
        failures: Vec<WriteFailure>,
    },
    /// Session cleanup failed after an otherwise successful session.
    #[error("cleanup failed for session {session_id}: {source}")]
    Cleanup {
        /// Session identifier.
        session_id: String,
        /// Cleaner error.
        source: CleanerError,
    },
}
