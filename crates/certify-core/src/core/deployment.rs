// crates/certify-core/src/core/deployment.rs
// ============================================================================
// Module: Deployment Modes
// Description: Target environments that select a connector's config schema.
// Purpose: Tag fixtures and parameterize connector invocations.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! A deployment mode selects which configuration schema a connector applies.
//! The same document can be valid in one mode and rejected in another, so the
//! mode always travels with the fixture and is handed to the connector
//! explicitly.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Deployment Mode
// ============================================================================

/// Environment a connector is deployed into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DeploymentMode {
    /// Self-managed (open source) deployment.
    #[serde(rename = "OSS", alias = "oss", alias = "SELF_MANAGED")]
    Oss,
    /// Managed cloud deployment.
    #[serde(rename = "CLOUD", alias = "cloud", alias = "MANAGED_CLOUD")]
    Cloud,
}

impl DeploymentMode {
    /// Every supported mode, in declaration order.
    pub const ALL: [Self; 2] = [Self::Oss, Self::Cloud];

    /// Environment variable carrying the mode into the connector process.
    pub const ENV_VAR: &'static str = "DEPLOYMENT_MODE";

    /// Returns the canonical wire label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Oss => "OSS",
            Self::Cloud => "CLOUD",
        }
    }
}

impl fmt::Display for DeploymentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when a mode label is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown deployment mode: {0}")]
pub struct UnknownDeploymentMode(pub String);

impl FromStr for DeploymentMode {
    type Err = UnknownDeploymentMode;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        if trimmed.eq_ignore_ascii_case("oss") || trimmed.eq_ignore_ascii_case("self_managed") {
            return Ok(Self::Oss);
        }
        if trimmed.eq_ignore_ascii_case("cloud") || trimmed.eq_ignore_ascii_case("managed_cloud") {
            return Ok(Self::Cloud);
        }
        Err(UnknownDeploymentMode(trimmed.to_string()))
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
