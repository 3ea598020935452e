// crates/certify-config/src/config.rs
// ============================================================================
// Module: Harness Configuration
// Description: Configuration loading and validation for certification runs.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: certify-core, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Missing or invalid configuration fails closed. Environment overrides from
//! [`HarnessEnv`] are applied after parsing and the result is re-validated.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use certify_core::ArtifactStore;
use certify_core::DeploymentMode;
use certify_core::FileHarnessLog;
use certify_core::HarnessLog;
use certify_core::NoopHarnessLog;
use certify_core::StderrHarnessLog;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::env::HarnessEnv;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "certify.toml";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Minimum operation timeout in milliseconds.
pub(crate) const MIN_TIMEOUT_MS: u64 = 100;
/// Maximum operation timeout in milliseconds.
pub(crate) const MAX_TIMEOUT_MS: u64 = 60 * 60 * 1000;
/// Maximum number of connector arguments.
pub(crate) const MAX_CONNECTOR_ARGS: usize = 64;
/// Default check timeout.
const DEFAULT_CHECK_TIMEOUT_MS: u64 = 60_000;
/// Default write timeout.
const DEFAULT_WRITE_TIMEOUT_MS: u64 = 300_000;

// ============================================================================
// SECTION: Config Model
// ============================================================================

/// Root harness configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HarnessConfig {
    /// How to launch the connector under test.
    pub connector: ConnectorSection,
    /// Operation timeouts.
    #[serde(default)]
    pub timeouts: TimeoutSection,
    /// Artifact capture.
    #[serde(default)]
    pub artifacts: ArtifactSection,
    /// Harness event logging.
    #[serde(default)]
    pub log: LogSection,
}

/// Connector launch settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectorSection {
    /// Image identity reported in logs (for example `airbyte/destination-dev-null:dev`).
    #[serde(default)]
    pub image: Option<String>,
    /// Executable to launch.
    pub program: String,
    /// Arguments placed before the operation name.
    #[serde(default)]
    pub args: Vec<String>,
    /// Extra environment for the connector process.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

/// Operation timeouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimeoutSection {
    /// Check timeout in milliseconds.
    #[serde(default = "default_check_timeout_ms")]
    pub check_ms: u64,
    /// Write timeout in milliseconds.
    #[serde(default = "default_write_timeout_ms")]
    pub write_ms: u64,
}

impl Default for TimeoutSection {
    fn default() -> Self {
        Self {
            check_ms: DEFAULT_CHECK_TIMEOUT_MS,
            write_ms: DEFAULT_WRITE_TIMEOUT_MS,
        }
    }
}

impl TimeoutSection {
    /// Returns the check timeout.
    #[must_use]
    pub const fn check(&self) -> Duration {
        Duration::from_millis(self.check_ms)
    }

    /// Returns the write timeout.
    #[must_use]
    pub const fn write(&self) -> Duration {
        Duration::from_millis(self.write_ms)
    }
}

/// Default check timeout for serde.
const fn default_check_timeout_ms() -> u64 {
    DEFAULT_CHECK_TIMEOUT_MS
}

/// Default write timeout for serde.
const fn default_write_timeout_ms() -> u64 {
    DEFAULT_WRITE_TIMEOUT_MS
}

/// Artifact capture settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArtifactSection {
    /// Root directory for run artifacts.
    #[serde(default)]
    pub root: Option<PathBuf>,
    /// Store connector transcripts per write session.
    #[serde(default)]
    pub capture_transcripts: bool,
}

/// Harness event sink selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogSinkKind {
    /// JSON lines on stderr.
    #[default]
    Stderr,
    /// JSON lines appended to a file.
    File,
    /// Discard events.
    None,
}

/// Harness event logging settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogSection {
    /// Sink kind.
    #[serde(default)]
    pub sink: LogSinkKind,
    /// Log file path (required for the file sink).
    #[serde(default)]
    pub path: Option<PathBuf>,
}

// ============================================================================
// SECTION: Loading
// ============================================================================

impl HarnessConfig {
    /// Loads configuration from disk using the default resolution rules:
    /// explicit path, then `CERTIFY_CONFIG`, then `certify.toml`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml_str(content)
    }

    /// Loads configuration and applies environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading, env parsing, or validation fails.
    pub fn load_with_env(path: Option<&Path>) -> Result<Self, ConfigError> {
        let env = HarnessEnv::load().map_err(|err| ConfigError::Invalid(err.to_string()))?;
        let mut config = Self::load(path)?;
        config.apply_env(&env)?;
        Ok(config)
    }

    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Builds a configuration launching `program` with defaults elsewhere.
    #[must_use]
    pub fn for_program(program: impl Into<String>) -> Self {
        Self {
            connector: ConnectorSection {
                image: None,
                program: program.into(),
                args: Vec::new(),
                env: BTreeMap::new(),
            },
            timeouts: TimeoutSection::default(),
            artifacts: ArtifactSection::default(),
            log: LogSection {
                sink: LogSinkKind::None,
                path: None,
            },
        }
    }

    /// Applies environment overrides and re-validates.
    /// The env timeout raises both operation timeouts to at least its value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the overridden configuration is invalid.
    pub fn apply_env(&mut self, env: &HarnessEnv) -> Result<(), ConfigError> {
        if let Some(root) = &env.run_root {
            self.artifacts.root = Some(root.clone());
        }
        if let Some(timeout) = env.timeout_floor {
            let floor = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
            self.timeouts.check_ms = self.timeouts.check_ms.max(floor);
            self.timeouts.write_ms = self.timeouts.write_ms.max(floor);
        }
        if let Some(program) = &env.connector_program {
            self.connector.program.clone_from(program);
        }
        if let Some(path) = &env.log_path {
            self.log.sink = LogSinkKind::File;
            self.log.path = Some(path.clone());
        }
        self.artifacts.capture_transcripts |= env.capture_transcripts;
        self.validate()
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.connector.validate()?;
        self.timeouts.validate()?;
        if let Some(root) = &self.artifacts.root {
            validate_path(root)?;
        }
        self.log.validate()
    }

    /// Opens the configured harness event sink.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the log file cannot be opened.
    pub fn open_log(&self) -> Result<Arc<dyn HarnessLog>, ConfigError> {
        match (self.log.sink, &self.log.path) {
            (LogSinkKind::Stderr, _) => Ok(Arc::new(StderrHarnessLog)),
            (LogSinkKind::None, _) => Ok(Arc::new(NoopHarnessLog)),
            (LogSinkKind::File, Some(path)) => FileHarnessLog::new(path)
                .map(|log| Arc::new(log) as Arc<dyn HarnessLog>)
                .map_err(|err| ConfigError::Io(err.to_string())),
            (LogSinkKind::File, None) => {
                Err(ConfigError::Invalid("log.path is required for the file sink".to_string()))
            }
        }
    }

    /// Opens the transcript store for a test when capture is enabled.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the artifact directory cannot be created.
    pub fn artifact_store(&self, test_name: &str) -> Result<Option<ArtifactStore>, ConfigError> {
        if !self.artifacts.capture_transcripts {
            return Ok(None);
        }
        ArtifactStore::for_test(self.artifacts.root.as_deref(), test_name)
            .map(Some)
            .map_err(|err| ConfigError::Io(err.to_string()))
    }

    /// Returns the connector identity used in logs.
    #[must_use]
    pub fn connector_identity(&self) -> &str {
        self.connector.image.as_deref().unwrap_or(&self.connector.program)
    }
}

impl ConnectorSection {
    /// Validates launch settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.program.trim().is_empty() {
            return Err(ConfigError::Invalid("connector.program must be set".to_string()));
        }
        if self.args.len() > MAX_CONNECTOR_ARGS {
            return Err(ConfigError::Invalid("connector.args exceeds max entries".to_string()));
        }
        for key in self.env.keys() {
            if key.trim().is_empty() {
                return Err(ConfigError::Invalid("connector.env keys must be non-empty".to_string()));
            }
            if key == DeploymentMode::ENV_VAR {
                return Err(ConfigError::Invalid(format!(
                    "connector.env must not set {key}; the mode is passed per invocation"
                )));
            }
        }
        Ok(())
    }
}

impl TimeoutSection {
    /// Validates timeout bounds.
    fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [("check_ms", self.check_ms), ("write_ms", self.write_ms)] {
            if !(MIN_TIMEOUT_MS ..= MAX_TIMEOUT_MS).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "timeouts.{name} must be between {MIN_TIMEOUT_MS} and {MAX_TIMEOUT_MS}"
                )));
            }
        }
        Ok(())
    }
}

impl LogSection {
    /// Validates sink settings.
    fn validate(&self) -> Result<(), ConfigError> {
        match (self.sink, &self.path) {
            (LogSinkKind::File, None) => {
                Err(ConfigError::Invalid("log.path is required for the file sink".to_string()))
            }
            (_, Some(path)) => validate_path(path),
            _ => Ok(()),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from an explicit path or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    let env = HarnessEnv::load().map_err(|err| ConfigError::Invalid(err.to_string()))?;
    if let Some(env_path) = env.config_path {
        if env_path.as_os_str().len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(env_path);
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates a path against length limits.
pub(crate) fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("path component too long".to_string()));
        }
    }
    Ok(())
}
