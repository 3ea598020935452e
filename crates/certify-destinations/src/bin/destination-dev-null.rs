// crates/certify-destinations/src/bin/destination-dev-null.rs
// ============================================================================
// Module: Dev-Null Destination Binary
// Description: Process entry point for the dev-null reference destination.
// Purpose: Expose `spec`, `check`, and `write` over stdio.
// Dependencies: certify-destinations
// ============================================================================

//! ## Overview
//! Runs [`DevNullDestination`] behind the shared destination command line.

use std::process::ExitCode;

use certify_destinations::DevNullDestination;
use certify_destinations::run_main;

fn main() -> ExitCode {
    run_main(&DevNullDestination)
}
