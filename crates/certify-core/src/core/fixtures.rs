// crates/certify-core/src/core/fixtures.rs
// ============================================================================
// Module: Configuration Fixtures
// Description: Config documents tagged with the mode they are judged under.
// Purpose: Declare success/failure expectations as plain data.
// Dependencies: regex, serde_json, thiserror
// ============================================================================

//! ## Overview
//! A [`ConfigFixture`] pairs a configuration document locator with the
//! [`DeploymentMode`] it is evaluated under. [`CheckExpectations`] groups the
//! fixtures expected to pass with the fixtures expected to fail (each carrying
//! a [`FailurePattern`]).
//! Invariants:
//! - Fixture identity is the `(path, mode)` pair.
//! - A fixture identity never appears in both the success and failure sets.
//! - Failure patterns match the whole message, never a substring.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use regex::Regex;
use serde_json::Value;
use thiserror::Error;

use crate::core::deployment::DeploymentMode;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while building or reading fixtures.
#[derive(Debug, Error)]
pub enum FixtureError {
    /// Fixture document could not be read.
    #[error("failed to read fixture {path}: {message}")]
    Io {
        /// Fixture locator.
        path: String,
        /// Underlying error text.
        message: String,
    },
    /// Failure pattern does not compile.
    #[error("invalid failure pattern '{pattern}': {message}")]
    InvalidPattern {
        /// Pattern source.
        pattern: String,
        /// Compiler error text.
        message: String,
    },
    /// Same fixture identity declared twice in one set.
    #[error("fixture declared more than once: {0}")]
    Duplicate(String),
    /// Same fixture identity expected to both pass and fail.
    #[error("fixture expected to both succeed and fail: {0}")]
    Conflicting(String),
}

// ============================================================================
// SECTION: Config Document
// ============================================================================

/// Configuration document handed to a connector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigDocument {
    /// Where the document came from (file path or synthetic label).
    locator: String,
    /// Raw document text.
    contents: String,
}

impl ConfigDocument {
    /// Creates a document from a locator and raw contents.
    #[must_use]
    pub fn new(locator: impl Into<String>, contents: impl Into<String>) -> Self {
        Self {
            locator: locator.into(),
            contents: contents.into(),
        }
    }

    /// Reads a document from disk.
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError::Io`] when the file cannot be read as UTF-8.
    pub fn read(path: &Path) -> Result<Self, FixtureError> {
        let contents = fs::read_to_string(path).map_err(|err| FixtureError::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        })?;
        Ok(Self::new(path.display().to_string(), contents))
    }

    /// Returns the document locator.
    #[must_use]
    pub fn locator(&self) -> &str {
        &self.locator
    }

    /// Returns the raw document text.
    #[must_use]
    pub fn contents(&self) -> &str {
        &self.contents
    }

    /// Returns a copy of this document with replaced contents.
    #[must_use]
    pub fn with_contents(&self, contents: impl Into<String>) -> Self {
        Self::new(self.locator.clone(), contents)
    }

    /// Parses the document as JSON.
    ///
    /// # Errors
    ///
    /// Returns the parser error when the contents are not valid JSON.
    pub fn to_json(&self) -> Result<Value, serde_json::Error> {
        serde_json::from_str(&self.contents)
    }
}

// ============================================================================
// SECTION: Config Fixture
// ============================================================================

/// Configuration document locator tagged with its deployment mode.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConfigFixture {
    /// Document locator.
    path: PathBuf,
    /// Mode the document is evaluated under.
    mode: DeploymentMode,
}

impl ConfigFixture {
    /// Creates a fixture.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, mode: DeploymentMode) -> Self {
        Self {
            path: path.into(),
            mode,
        }
    }

    /// Returns the document locator.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the deployment mode.
    #[must_use]
    pub const fn mode(&self) -> DeploymentMode {
        self.mode
    }

    /// Reads the fixture document.
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError::Io`] when the document cannot be read.
    pub fn read_document(&self) -> Result<ConfigDocument, FixtureError> {
        ConfigDocument::read(&self.path)
    }
}

impl fmt::Display for ConfigFixture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.path.display(), self.mode)
    }
}

// ============================================================================
// SECTION: Failure Pattern
// ============================================================================

/// Regular expression a failure message must match in full.
#[derive(Debug, Clone)]
pub struct FailurePattern {
    /// Pattern as declared.
    source: String,
    /// Anchored compiled form.
    regex: Regex,
}

impl FailurePattern {
    /// Compiles a pattern with full-match semantics.
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError::InvalidPattern`] when the pattern does not compile.
    pub fn new(pattern: &str) -> Result<Self, FixtureError> {
        let regex = Regex::new(&format!("^(?:{pattern})$")).map_err(|err| {
            FixtureError::InvalidPattern {
                pattern: pattern.to_string(),
                message: err.to_string(),
            }
        })?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    /// Builds a pattern matching exactly the given literal text.
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError::InvalidPattern`] if the escaped form fails to compile.
    pub fn literal(text: &str) -> Result<Self, FixtureError> {
        let mut pattern = Self::new(&regex::escape(text))?;
        pattern.source = text.to_string();
        Ok(pattern)
    }

    /// Returns the declared pattern text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Returns true when the entire message matches.
    #[must_use]
    pub fn matches(&self, message: &str) -> bool {
        self.regex.is_match(message)
    }
}

impl PartialEq for FailurePattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for FailurePattern {}

impl fmt::Display for FailurePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

// ============================================================================
// SECTION: Expectation Set
// ============================================================================

/// Fixtures expected to pass and fail `check`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckExpectations {
    /// Fixtures that must succeed under their mode.
    success: Vec<ConfigFixture>,
    /// Fixtures that must fail with a matching message.
    failure: Vec<(ConfigFixture, FailurePattern)>,
}

impl CheckExpectations {
    /// Builds an expectation set, enforcing fixture identity invariants.
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError::Duplicate`] or [`FixtureError::Conflicting`] when
    /// a fixture identity is declared more than once.
    pub fn new(
        success: Vec<ConfigFixture>,
        failure: Vec<(ConfigFixture, FailurePattern)>,
    ) -> Result<Self, FixtureError> {
        let mut passing = BTreeSet::new();
        for fixture in &success {
            if !passing.insert(fixture) {
                return Err(FixtureError::Duplicate(fixture.to_string()));
            }
        }
        let mut failing = BTreeSet::new();
        for (fixture, _) in &failure {
            if passing.contains(fixture) {
                return Err(FixtureError::Conflicting(fixture.to_string()));
            }
            if !failing.insert(fixture) {
                return Err(FixtureError::Duplicate(fixture.to_string()));
            }
        }
        Ok(Self {
            success,
            failure,
        })
    }

    /// Returns the success set.
    #[must_use]
    pub fn success(&self) -> &[ConfigFixture] {
        &self.success
    }

    /// Returns the failure set with patterns.
    #[must_use]
    pub fn failure(&self) -> &[(ConfigFixture, FailurePattern)] {
        &self.failure
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions favor direct unwrap.")]

    use super::CheckExpectations;
    use super::ConfigFixture;
    use super::FailurePattern;
    use super::FixtureError;
    use crate::core::deployment::DeploymentMode;

    #[test]
    fn pattern_requires_full_match() {
        let pattern = FailurePattern::new("Value '.*' is not defined in the schema").unwrap();
        assert!(pattern.matches("Value 'LOGGING' is not defined in the schema"));
        assert!(!pattern.matches("error: Value 'LOGGING' is not defined in the schema"));
        assert!(!pattern.matches("Value 'LOGGING' is not defined in the schema!"));
    }

    #[test]
    fn alternation_is_anchored_as_a_whole() {
        let pattern = FailurePattern::new("a|b").unwrap();
        assert!(pattern.matches("a"));
        assert!(!pattern.matches("ab"));
    }

    #[test]
    fn literal_escapes_metacharacters() {
        let pattern = FailurePattern::literal("bad (value)?").unwrap();
        assert!(pattern.matches("bad (value)?"));
        assert!(!pattern.matches("bad value"));
        assert_eq!(pattern.as_str(), "bad (value)?");
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        let err = FailurePattern::new("(unclosed").unwrap_err();
        assert!(matches!(err, FixtureError::InvalidPattern { .. }));
    }

    #[test]
    fn same_document_may_pass_and_fail_across_modes() {
        let oss = ConfigFixture::new("logging.json", DeploymentMode::Oss);
        let cloud = ConfigFixture::new("logging.json", DeploymentMode::Cloud);
        let pattern = FailurePattern::new("nope").unwrap();
        let set = CheckExpectations::new(vec![oss], vec![(cloud, pattern)]).unwrap();
        assert_eq!(set.success().len(), 1);
        assert_eq!(set.failure().len(), 1);
    }

    #[test]
    fn conflicting_identity_is_rejected() {
        let fixture = ConfigFixture::new("logging.json", DeploymentMode::Oss);
        let pattern = FailurePattern::new("nope").unwrap();
        let err = CheckExpectations::new(vec![fixture.clone()], vec![(fixture, pattern)])
            .unwrap_err();
        assert!(matches!(err, FixtureError::Conflicting(_)));
    }

    #[test]
    fn duplicate_identity_is_rejected() {
        let fixture = ConfigFixture::new("logging.json", DeploymentMode::Oss);
        let err = CheckExpectations::new(vec![fixture.clone(), fixture], Vec::new()).unwrap_err();
        assert!(matches!(err, FixtureError::Duplicate(_)));
    }
}
