// crates/certify-core/src/core/mod.rs
// ============================================================================
// Module: Certify Core Types
// Description: Deployment modes, fixtures, protocol messages, and records.
// Purpose: Provide stable, serializable types shared by runners and connectors.
// Dependencies: serde, regex
// ============================================================================

//! ## Overview
//! Core types describe what the harness feeds to a connector and what it
//! observes coming back. They are the canonical source of truth for the wire
//! protocol spoken across the connector process boundary.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod deployment;
pub mod fixtures;
pub mod outcome;
pub mod protocol;
pub mod records;
pub mod session;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use deployment::DeploymentMode;
pub use deployment::UnknownDeploymentMode;
pub use fixtures::CheckExpectations;
pub use fixtures::ConfigDocument;
pub use fixtures::ConfigFixture;
pub use fixtures::FailurePattern;
pub use fixtures::FixtureError;
pub use outcome::CheckOutcome;
pub use outcome::CheckStatus;
pub use protocol::ConnectorMessage;
pub use protocol::LogLevel;
pub use protocol::LogMessage;
pub use protocol::RecordMessage;
pub use protocol::SpecMessage;
pub use protocol::StateMessage;
pub use protocol::StreamStatus;
pub use protocol::TraceError;
pub use protocol::TraceMessage;
pub use records::ConfiguredCatalog;
pub use records::ConfiguredStream;
pub use records::ImportType;
pub use records::InputRecord;
pub use records::OutputRecord;
pub use records::OutputRecordMeta;
pub use records::StreamDescriptor;
pub use session::SessionContext;
