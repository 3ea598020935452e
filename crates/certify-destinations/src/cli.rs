// crates/certify-destinations/src/cli.rs
// ============================================================================
// Module: Destination Command Line
// Description: Operation dispatch shared by the reference destination binaries.
// Purpose: Parse `spec` / `check` / `write` invocations and run them.
// Dependencies: clap, certify-core, serde_json
// ============================================================================

//! ## Overview
//! Every reference destination is invoked as:
//! - `<bin> spec`
//! - `<bin> check --config <path>`
//! - `<bin> write --config <path> --catalog <path>`
//!
//! The deployment mode comes from `DEPLOYMENT_MODE` and defaults to `OSS`.
//! `check` always exits successfully with exactly one connection status; an
//! invalid configuration is a `FAILED` status, not a crash. `write` reads
//! messages from stdin until it closes. Any `write` failure is reported as an
//! error trace on stdout, echoed on stderr, and ends with a non-zero exit.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::io::BufRead;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use certify_core::CheckOutcome;
use certify_core::ConfiguredCatalog;
use certify_core::ConnectorMessage;
use certify_core::DeploymentMode;
use certify_core::SpecMessage;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use serde_json::Value;

use crate::error::DestinationError;
use crate::io::MessageWriter;
use crate::io::RecordSink;
use crate::io::pump;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum size of a config or catalog file.
const MAX_INPUT_FILE_BYTES: u64 = 1024 * 1024;

// ============================================================================
// SECTION: Destination Contract
// ============================================================================

/// Behavior a reference destination plugs into the shared driver.
pub trait Destination {
    /// Returns the configuration schema for `mode`.
    fn specification(&self, mode: DeploymentMode) -> Value;

    /// Validates `config` and probes the destination.
    ///
    /// # Errors
    ///
    /// Returns [`DestinationError`] whose message becomes the `FAILED` status.
    fn check(&self, config: &Value, mode: DeploymentMode) -> Result<(), DestinationError>;

    /// Opens the storage side of a write run. Called after `check` passed.
    ///
    /// # Errors
    ///
    /// Returns [`DestinationError`] when storage cannot be prepared.
    fn open_sink(
        &self,
        config: &Value,
        catalog: &ConfiguredCatalog,
        mode: DeploymentMode,
    ) -> Result<Box<dyn RecordSink>, DestinationError>;
}

// ============================================================================
// SECTION: Arguments
// ============================================================================

/// Reference destination command line.
#[derive(Parser, Debug)]
#[command(disable_help_subcommand = true)]
pub struct Cli {
    /// Operation to run.
    #[command(subcommand)]
    pub operation: Operation,
}

/// Connector operations.
#[derive(Subcommand, Debug)]
pub enum Operation {
    /// Print the configuration specification.
    Spec,
    /// Validate a configuration.
    Check(CheckArgs),
    /// Consume records from stdin.
    Write(WriteArgs),
}

/// Arguments for `check`.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Configuration document.
    #[arg(long, value_name = "PATH")]
    pub config: PathBuf,
}

/// Arguments for `write`.
#[derive(Args, Debug)]
pub struct WriteArgs {
    /// Configuration document.
    #[arg(long, value_name = "PATH")]
    pub config: PathBuf,
    /// Configured catalog.
    #[arg(long, value_name = "PATH")]
    pub catalog: PathBuf,
}

// ============================================================================
// SECTION: Entry Points
// ============================================================================

/// Parses the process arguments and runs one operation against stdio.
#[must_use]
pub fn run_main(destination: &dyn Destination) -> ExitCode {
    let cli = Cli::parse();
    let stdout = std::io::stdout();
    let mut stdout = stdout.lock();
    let mut output = MessageWriter::new(&mut stdout);
    let result = mode_from_env().and_then(|mode| {
        let stdin = std::io::stdin();
        let mut stdin = stdin.lock();
        execute(destination, cli.operation, mode, &mut stdin, &mut output)
    });
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let _ = output.error_trace(&err);
            let _ = write_stderr_line(&err.to_string());
            ExitCode::FAILURE
        }
    }
}

/// Runs one operation.
///
/// # Errors
///
/// Returns [`DestinationError`] when `spec` or `write` fails. `check` only
/// fails when its status cannot be written.
pub fn execute(
    destination: &dyn Destination,
    operation: Operation,
    mode: DeploymentMode,
    input: &mut dyn BufRead,
    output: &mut MessageWriter<'_>,
) -> Result<(), DestinationError> {
    match operation {
        Operation::Spec => output.emit(&ConnectorMessage::Spec {
            spec: SpecMessage {
                deployment_mode: mode,
                connection_specification: destination.specification(mode),
            },
        }),
        Operation::Check(args) => {
            let outcome = read_json(&args.config, "config")
                .and_then(|config| destination.check(&config, mode))
                .map_or_else(|err| CheckOutcome::failed(err.to_string()), |()| {
                    CheckOutcome::succeeded()
                });
            output.status(outcome)
        }
        Operation::Write(args) => {
            let config = read_json(&args.config, "config")?;
            let catalog: ConfiguredCatalog =
                serde_json::from_value(read_json(&args.catalog, "catalog")?).map_err(|err| {
                    DestinationError::Config(format!("catalog is invalid: {err}"))
                })?;
            destination.check(&config, mode)?;
            let mut sink = destination.open_sink(&config, &catalog, mode)?;
            pump(input, &catalog, output, sink.as_mut()).map(|_| ())
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads the deployment mode from the environment, defaulting to OSS.
fn mode_from_env() -> Result<DeploymentMode, DestinationError> {
    match std::env::var(DeploymentMode::ENV_VAR) {
        Ok(raw) if raw.trim().is_empty() => Ok(DeploymentMode::Oss),
        Ok(raw) => raw.parse().map_err(|err| DestinationError::Config(format!("{err}"))),
        Err(std::env::VarError::NotPresent) => Ok(DeploymentMode::Oss),
        Err(std::env::VarError::NotUnicode(_)) => Err(DestinationError::Config(format!(
            "{} must be valid UTF-8",
            DeploymentMode::ENV_VAR
        ))),
    }
}

/// Reads a size-limited JSON document.
fn read_json(path: &Path, label: &str) -> Result<Value, DestinationError> {
    let metadata = fs::metadata(path)
        .map_err(|err| DestinationError::Io(format!("cannot read {label} {}: {err}", path.display())))?;
    if metadata.len() > MAX_INPUT_FILE_BYTES {
        return Err(DestinationError::Config(format!("{label} file exceeds size limit")));
    }
    let bytes = fs::read(path)
        .map_err(|err| DestinationError::Io(format!("cannot read {label} {}: {err}", path.display())))?;
    serde_json::from_slice(&bytes)
        .map_err(|err| DestinationError::Config(format!("{label} is not valid JSON: {err}")))
}

/// Writes a line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}
