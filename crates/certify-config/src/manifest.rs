// crates/certify-config/src/manifest.rs
// ============================================================================
// Module: Check Manifests
// Description: Declarative success and failure fixture lists.
// Purpose: Let a connector suite declare its check expectations in TOML.
// Dependencies: certify-core, serde, toml
// ============================================================================

//! ## Overview
//! A check manifest lists `[[success]]` and `[[failure]]` entries. Each entry
//! names a config document and the deployment mode to check it under. Failure
//! entries carry either a regular expression (`pattern`) or an exact message
//! (`message`); both must match the reported message in full. Relative paths
//! resolve against the manifest's directory.
//!
//! ```toml
//! [[success]]
//! path = "test_configs/logging.json"
//! mode = "OSS"
//!
//! [[failure]]
//! path = "test_configs/logging.json"
//! mode = "CLOUD"
//! pattern = "Value 'LOGGING' is not defined in the schema"
//! ```

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use certify_core::CheckExpectations;
use certify_core::ConfigFixture;
use certify_core::DeploymentMode;
use certify_core::FailurePattern;
use serde::Deserialize;
use serde::Serialize;

use crate::config::ConfigError;
use crate::config::MAX_CONFIG_FILE_SIZE;
use crate::config::validate_path;

// ============================================================================
// SECTION: Manifest Model
// ============================================================================

/// Fixture that must check `SUCCEEDED`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SuccessEntry {
    /// Config document path.
    pub path: PathBuf,
    /// Mode to check under.
    pub mode: DeploymentMode,
}

/// Fixture that must check `FAILED` with a matching message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FailureEntry {
    /// Config document path.
    pub path: PathBuf,
    /// Mode to check under.
    pub mode: DeploymentMode,
    /// Regular expression the whole message must match.
    #[serde(default)]
    pub pattern: Option<String>,
    /// Exact expected message.
    #[serde(default)]
    pub message: Option<String>,
}

impl FailureEntry {
    /// Compiles the entry's pattern.
    fn failure_pattern(&self) -> Result<FailurePattern, ConfigError> {
        let compiled = match (&self.pattern, &self.message) {
            (Some(pattern), None) => FailurePattern::new(pattern),
            (None, Some(message)) => FailurePattern::literal(message),
            _ => {
                return Err(ConfigError::Invalid(format!(
                    "failure entry {} must set exactly one of pattern or message",
                    self.path.display()
                )));
            }
        };
        compiled.map_err(|err| ConfigError::Invalid(err.to_string()))
    }
}

/// Check expectations declared in TOML.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CheckManifest {
    /// Fixtures expected to succeed.
    #[serde(default)]
    pub success: Vec<SuccessEntry>,
    /// Fixtures expected to fail.
    #[serde(default)]
    pub failure: Vec<FailureEntry>,
    /// Directory relative paths resolve against.
    #[serde(skip)]
    base_dir: PathBuf,
}

impl CheckManifest {
    /// Loads a manifest file; relative fixture paths resolve against its directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        validate_path(path)?;
        let bytes = fs::read(path).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("manifest exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("manifest must be utf-8".to_string()))?;
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Self::from_toml_str(content, base_dir)
    }

    /// Parses a manifest from TOML.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the document is malformed.
    pub fn from_toml_str(content: &str, base_dir: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let mut manifest: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        manifest.base_dir = base_dir.into();
        Ok(manifest)
    }

    /// Converts the manifest into a validated expectation set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for bad patterns, duplicate fixtures,
    /// or fixtures declared as both success and failure.
    pub fn expectations(&self) -> Result<CheckExpectations, ConfigError> {
        let success = self
            .success
            .iter()
            .map(|entry| ConfigFixture::new(self.resolve(&entry.path), entry.mode))
            .collect();
        let failure = self
            .failure
            .iter()
            .map(|entry| {
                let fixture = ConfigFixture::new(self.resolve(&entry.path), entry.mode);
                entry.failure_pattern().map(|pattern| (fixture, pattern))
            })
            .collect::<Result<Vec<_>, _>>()?;
        CheckExpectations::new(success, failure).map_err(|err| ConfigError::Invalid(err.to_string()))
    }

    /// Resolves a fixture path against the manifest directory.
    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() { path.to_path_buf() } else { self.base_dir.join(path) }
    }
}
