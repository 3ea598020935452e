// crates/certify-config/src/env.rs
// ============================================================================
// Module: Harness Environment
// Description: Environment-backed overrides for harness runs.
// Purpose: Turn `CERTIFY_*` variables into typed, validated overrides.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! Overrides are read from a variable list rather than the live process
//! environment, so [`HarnessEnv::load`] is a thin wrapper over
//! [`HarnessEnv::from_vars`]. Every name under the `CERTIFY_` prefix must be
//! one of [`HarnessEnvVar::ALL`]; a misspelled override is an error instead of
//! a silently ignored setting.
//!
//! Per-variable rules:
//! - `CERTIFY_TIMEOUT_SEC` is a floor in whole seconds, at most one hour. It
//!   raises operation timeouts and never lowers them.
//! - `CERTIFY_CONNECTOR_PROGRAM` names a single executable. Arguments belong in
//!   `connector.args`, so whitespace is rejected.
//! - `CERTIFY_LOG_PATH` must name a file, not a directory.
//! - `CERTIFY_CAPTURE_TRANSCRIPTS` is a switch: `1`/`0`, `true`/`false`,
//!   `on`/`off`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::ffi::OsStr;
use std::ffi::OsString;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Prefix shared by every harness override.
const ENV_PREFIX: &str = "CERTIFY_";
/// Largest accepted timeout floor in seconds.
const MAX_TIMEOUT_FLOOR_SECS: u64 = 60 * 60;

/// Environment keys for harness overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarnessEnvVar {
    /// Path of the harness TOML file.
    ConfigPath,
    /// Artifact root.
    RunRoot,
    /// Timeout floor in seconds.
    TimeoutSeconds,
    /// Connector executable.
    ConnectorProgram,
    /// Harness event log file.
    LogPath,
    /// Transcript capture switch.
    CaptureTranscripts,
}

impl HarnessEnvVar {
    /// Every recognized override.
    pub const ALL: [Self; 6] = [
        Self::ConfigPath,
        Self::RunRoot,
        Self::TimeoutSeconds,
        Self::ConnectorProgram,
        Self::LogPath,
        Self::CaptureTranscripts,
    ];

    /// Returns the canonical environment variable name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ConfigPath => "CERTIFY_CONFIG",
            Self::RunRoot => "CERTIFY_RUN_ROOT",
            Self::TimeoutSeconds => "CERTIFY_TIMEOUT_SEC",
            Self::ConnectorProgram => "CERTIFY_CONNECTOR_PROGRAM",
            Self::LogPath => "CERTIFY_LOG_PATH",
            Self::CaptureTranscripts => "CERTIFY_CAPTURE_TRANSCRIPTS",
        }
    }

    /// Looks up an override by its variable name.
    pub(crate) fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|var| var.as_str() == name)
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Environment override errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvError {
    /// A `CERTIFY_` variable the harness does not define.
    #[error("unknown harness override {0}")]
    Unknown(String),
    /// Value is not valid UTF-8.
    #[error("{0} must be valid UTF-8")]
    NotUnicode(&'static str),
    /// Value is empty or whitespace.
    #[error("{0} must not be empty")]
    Empty(&'static str),
    /// Value fails the variable's own rule.
    #[error("{var}: {reason}")]
    Invalid {
        /// Variable name.
        var: &'static str,
        /// Rule that failed.
        reason: String,
    },
}

// ============================================================================
// SECTION: Overrides
// ============================================================================

/// Typed overrides derived from environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HarnessEnv {
    /// Harness TOML file.
    pub config_path: Option<PathBuf>,
    /// Artifact root.
    pub run_root: Option<PathBuf>,
    /// Lower bound applied to both operation timeouts.
    pub timeout_floor: Option<Duration>,
    /// Connector executable.
    pub connector_program: Option<String>,
    /// Harness event log file.
    pub log_path: Option<PathBuf>,
    /// Store connector transcripts.
    pub capture_transcripts: bool,
}

impl HarnessEnv {
    /// Loads overrides from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`EnvError`] when an override is unknown or malformed.
    pub fn load() -> Result<Self, EnvError> {
        Self::from_vars(std::env::vars_os())
    }

    /// Builds overrides from `(name, value)` pairs; names outside the
    /// `CERTIFY_` prefix are ignored and a later pair wins over an earlier one.
    ///
    /// # Errors
    ///
    /// Returns [`EnvError`] when an override is unknown or malformed.
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, EnvError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<OsStr>,
        V: Into<OsString>,
    {
        let mut env = Self::default();
        for (name, value) in vars {
            let Some(name) = name.as_ref().to_str() else {
                continue;
            };
            if !name.starts_with(ENV_PREFIX) {
                continue;
            }
            let var = HarnessEnvVar::from_name(name)
                .ok_or_else(|| EnvError::Unknown(name.to_string()))?;
            env.set(var, value.into())?;
        }
        Ok(env)
    }

    /// Validates and stores one override.
    fn set(&mut self, var: HarnessEnvVar, raw: OsString) -> Result<(), EnvError> {
        let name = var.as_str();
        let value = raw.into_string().map_err(|_| EnvError::NotUnicode(name))?;
        let value = value.trim();
        if value.is_empty() {
            return Err(EnvError::Empty(name));
        }
        match var {
            HarnessEnvVar::ConfigPath => self.config_path = Some(PathBuf::from(value)),
            HarnessEnvVar::RunRoot => self.run_root = Some(PathBuf::from(value)),
            HarnessEnvVar::TimeoutSeconds => self.timeout_floor = Some(timeout_floor(value)?),
            HarnessEnvVar::ConnectorProgram => {
                if value.chars().any(char::is_whitespace) {
                    return Err(invalid(
                        var,
                        "names one executable; put arguments in connector.args",
                    ));
                }
                self.connector_program = Some(value.to_string());
            }
            HarnessEnvVar::LogPath => self.log_path = Some(log_file(value)?),
            HarnessEnvVar::CaptureTranscripts => {
                self.capture_transcripts = switch(var, value)?;
            }
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Value Rules
// ============================================================================

/// Builds an [`EnvError::Invalid`] for `var`.
fn invalid(var: HarnessEnvVar, reason: impl Into<String>) -> EnvError {
    EnvError::Invalid {
        var: var.as_str(),
        reason: reason.into(),
    }
}

/// Parses the timeout floor.
fn timeout_floor(value: &str) -> Result<Duration, EnvError> {
    let var = HarnessEnvVar::TimeoutSeconds;
    let secs: u64 =
        value.parse().map_err(|_| invalid(var, format!("'{value}' is not a whole number of seconds")))?;
    if secs == 0 || secs > MAX_TIMEOUT_FLOOR_SECS {
        return Err(invalid(var, format!("must be between 1 and {MAX_TIMEOUT_FLOOR_SECS}")));
    }
    Ok(Duration::from_secs(secs))
}

/// Parses the log path, which must end in a file name.
fn log_file(value: &str) -> Result<PathBuf, EnvError> {
    let path = Path::new(value);
    let names_file = !value.ends_with('/')
        && !value.ends_with('\\')
        && path.file_name().is_some_and(|name| name != "." && name != "..");
    if !names_file {
        return Err(invalid(HarnessEnvVar::LogPath, format!("'{value}' does not name a file")));
    }
    Ok(path.to_path_buf())
}

/// Parses an on/off switch.
fn switch(var: HarnessEnvVar, value: &str) -> Result<bool, EnvError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "on" => Ok(true),
        "0" | "false" | "off" => Ok(false),
        _ => Err(invalid(var, format!("'{value}' is not one of 1, 0, true, false, on, off"))),
    }
}
