// crates/certify-core/src/lib.rs
// ============================================================================
// Module: Connector Certify Core Library
// Description: Connector-agnostic certification harness for destinations.
// Purpose: Drive connector check/write operations against declarative fixtures.
// Dependencies: serde, regex, thiserror, async-trait
// ============================================================================

//! ## Overview
//! Connector Certify Core drives a connector's `check` and `write` operations
//! against declarative fixtures and verifies the outcome without any
//! per-connector branching. Concrete connectors plug in through the traits in
//! [`interfaces`]; the runners in [`runtime`] only ever see trait objects.
//! Invariants:
//! - Fixtures and expectation sets are immutable after construction.
//! - Every write session invokes its cleaner exactly once.
//! - Deployment mode is passed explicitly to every connector invocation.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod artifacts;
pub mod core;
pub mod error;
pub mod interfaces;
pub mod runtime;
pub mod telemetry;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use artifacts::ArtifactStore;
pub use artifacts::TestReporter;
pub use crate::core::CheckExpectations;
pub use crate::core::CheckOutcome;
pub use crate::core::CheckStatus;
pub use crate::core::ConfigDocument;
pub use crate::core::ConfigFixture;
pub use crate::core::ConfiguredCatalog;
pub use crate::core::ConfiguredStream;
pub use crate::core::ConnectorMessage;
pub use crate::core::DeploymentMode;
pub use crate::core::FailurePattern;
pub use crate::core::FixtureError;
pub use crate::core::ImportType;
pub use crate::core::InputRecord;
pub use crate::core::LogLevel;
pub use crate::core::LogMessage;
pub use crate::core::OutputRecord;
pub use crate::core::OutputRecordMeta;
pub use crate::core::RecordMessage;
pub use crate::core::SessionContext;
pub use crate::core::SpecMessage;
pub use crate::core::StateMessage;
pub use crate::core::StreamDescriptor;
pub use crate::core::StreamStatus;
pub use crate::core::TraceError;
pub use crate::core::TraceMessage;
pub use crate::core::UnknownDeploymentMode;
pub use error::HarnessError;
pub use error::WriteFailure;
pub use interfaces::CleanerError;
pub use interfaces::ConnectorError;
pub use interfaces::ConnectorRun;
pub use interfaces::DataVerification;
pub use interfaces::DestinationCleaner;
pub use interfaces::DestinationConnector;
pub use interfaces::DestinationDataDumper;
pub use interfaces::ExpectedRecordMapper;
pub use interfaces::NoopDestinationCleaner;
pub use interfaces::NoopDestinationDataDumper;
pub use interfaces::NoopExpectedRecordMapper;
pub use interfaces::VerificationError;
pub use runtime::Expectation;
pub use runtime::CheckReport;
pub use runtime::CheckRunner;
pub use runtime::ConfigTransform;
pub use runtime::FixtureResult;
pub use runtime::FixtureVerdict;
pub use runtime::RecordDiff;
pub use runtime::RecordDiffer;
pub use runtime::RecordOrdering;
pub use runtime::WriteHarness;
pub use runtime::WriteReport;
pub use telemetry::FileHarnessLog;
pub use telemetry::HarnessEvent;
pub use telemetry::HarnessLog;
pub use telemetry::MemoryHarnessLog;
pub use telemetry::NoopHarnessLog;
pub use telemetry::StderrHarnessLog;
