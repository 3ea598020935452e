// crates/certify-destinations/tests/support/mod.rs
// ============================================================================
// Module: Destination Suite Support
// Description: Shared wiring for reference destination certification suites.
// ============================================================================
//! ## Overview
//! Builds process connectors for the crate's own binaries and locates the
//! checked-in config fixtures.

#![allow(
    dead_code,
    clippy::missing_docs_in_private_items,
    reason = "Shared test scaffolding; not every suite uses every helper."
)]

use std::path::PathBuf;
use std::sync::Arc;

use certify_config::HarnessConfig;
use certify_core::DestinationConnector;
use certify_process::ProcessConnector;

/// Image identity the dev-null suite reports.
pub const DEV_NULL_IMAGE: &str = "airbyte/destination-dev-null:dev";

/// Connector running the dev-null binary.
pub fn dev_null() -> Arc<dyn DestinationConnector> {
    let mut config = HarnessConfig::for_program(env!("CARGO_BIN_EXE_destination-dev-null"));
    config.connector.image = Some(DEV_NULL_IMAGE.to_string());
    Arc::new(ProcessConnector::new(config))
}

/// Connector running the local JSON-lines binary.
pub fn local_jsonl() -> Arc<dyn DestinationConnector> {
    let config = HarnessConfig::for_program(env!("CARGO_BIN_EXE_destination-local-jsonl"));
    Arc::new(ProcessConnector::new(config))
}

/// Path of a checked-in config fixture.
pub fn test_config(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_configs").join(name)
}
