// crates/certify-config/src/lib.rs
// ============================================================================
// Module: Connector Certify Config Library
// Description: Harness configuration, env overrides, and check manifests.
// Purpose: Load how to launch a connector and which fixtures to check.
// Dependencies: certify-core, serde, toml
// ============================================================================

//! ## Overview
//! [`HarnessConfig`] is loaded from a TOML file and describes how to launch
//! the connector under test, operation timeouts, where artifacts go, and
//! where harness events are logged. [`HarnessEnv`] layers environment
//! overrides on top. [`CheckManifest`] declares success and failure fixtures
//! and converts them into a [`certify_core::CheckExpectations`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
mod env;
pub mod manifest;

// ============================================================================
// SECTION: Tests
// ============================================================================


// ============================================================================
// SECTION: Re-exports
// ============================================================================

pub use config::ArtifactSection;
pub use config::ConfigError;
pub use config::ConnectorSection;
pub use config::HarnessConfig;
pub use config::LogSection;
pub use config::LogSinkKind;
pub use config::TimeoutSection;
pub use env::EnvError;
pub use env::HarnessEnv;
pub use env::HarnessEnvVar;
pub use manifest::CheckManifest;
pub use manifest::FailureEntry;
pub use manifest::SuccessEntry;
