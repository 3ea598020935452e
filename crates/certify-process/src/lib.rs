// crates/certify-process/src/lib.rs
// ============================================================================
// Module: Connector Certify Process Library
// Description: Drives connector executables over the line protocol.
// Purpose: Provide the subprocess implementation of the connector boundary.
// Dependencies: certify-core, certify-config, tokio, tempfile
// ============================================================================

//! ## Overview
//! [`ProcessConnector`] launches the connector executable once per
//! operation, passes the deployment mode through the environment, streams
//! input messages on stdin, and parses protocol messages from stdout.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod connector;

// ============================================================================
// SECTION: Re-exports
// ============================================================================

pub use connector::ProcessConnector;
