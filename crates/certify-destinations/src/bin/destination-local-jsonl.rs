// crates/certify-destinations/src/bin/destination-local-jsonl.rs
// ============================================================================
// Module: Local JSON-Lines Destination Binary
// Description: Process entry point for the local JSON-lines destination.
// Purpose: Expose `spec`, `check`, and `write` over stdio.
// Dependencies: certify-destinations
// ============================================================================

//! ## Overview
//! Runs [`LocalJsonlDestination`] behind the shared destination command line.

use std::process::ExitCode;

use certify_destinations::LocalJsonlDestination;
use certify_destinations::run_main;

fn main() -> ExitCode {
    run_main(&LocalJsonlDestination)
}
