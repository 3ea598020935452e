// crates/certify-core/src/runtime/mod.rs
// ============================================================================
// Module: Certify Runtime
// Description: Check and write runners plus the record differ.
// Purpose: Execute certification scenarios against any connector.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! The runtime holds the two runners. [`CheckRunner`] validates connector
//! `check` behavior across fixture sets. [`WriteHarness`] drives one basic
//! write session end to end and guarantees cleanup.

pub mod check;
pub mod differ;
pub mod write;

pub use check::CheckReport;
pub use check::CheckRunner;
pub use check::ConfigTransform;
pub use check::Expectation;
pub use check::FixtureResult;
pub use check::FixtureVerdict;
pub use differ::RecordDiff;
pub use differ::RecordDiffer;
pub use differ::RecordOrdering;
pub use write::WriteHarness;
pub use write::WriteReport;
