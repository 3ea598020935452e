// crates/certify-destinations/src/lib.rs
// ============================================================================
// Module: Connector Certify Reference Destinations
// Description: Small destinations speaking the connector protocol.
// Purpose: Give the harness real processes to certify end to end.
// Dependencies: certify-core, clap, jsonschema, rand, serde_json, time
// ============================================================================

//! ## Overview
//! Two reference destinations ship as binaries:
//! - `destination-dev-null` accepts records and discards them, optionally
//!   logging samples, throttling, or failing on purpose.
//! - `destination-local-jsonl` persists records as JSON lines under a local
//!   directory and can be read back for verified write runs.
//!
//! Both share the operation driver in [`cli`] and the wire plumbing in
//! [`io`]. The verification collaborators each destination needs for a
//! certification run live next to the destination itself.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod cli;
pub mod dev_null;
pub mod error;
pub mod io;
pub mod local_jsonl;
mod schema;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use cli::Destination;
pub use cli::run_main;
pub use dev_null::DevNullDataDumper;
pub use dev_null::DevNullDestination;
pub use error::DestinationError;
pub use io::MessageWriter;
pub use io::RecordSink;
pub use local_jsonl::LocalJsonlCleaner;
pub use local_jsonl::LocalJsonlDataDumper;
pub use local_jsonl::LocalJsonlDestination;
pub use local_jsonl::LocalJsonlMapper;
