// crates/certify-core/src/core/outcome.rs
// ============================================================================
// Module: Check Outcomes
// Description: Status reported by a connector's check operation.
// Purpose: Carry the single connection status produced per check invocation.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! [`CheckOutcome`] is what a connector reports after validating a
//! configuration document. It is also the payload of the protocol's
//! `CONNECTION_STATUS` message.

use serde::Deserialize;
use serde::Serialize;

/// Result of a connector check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckStatus {
    /// Configuration was accepted.
    Succeeded,
    /// Configuration was rejected.
    Failed,
}

impl CheckStatus {
    /// Returns the wire label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Succeeded => "SUCCEEDED",
            Self::Failed => "FAILED",
        }
    }
}

/// Connection status reported by a connector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckOutcome {
    /// Reported status.
    pub status: CheckStatus,
    /// Optional explanation (required in practice for failures).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CheckOutcome {
    /// Builds a successful outcome.
    #[must_use]
    pub const fn succeeded() -> Self {
        Self {
            status: CheckStatus::Succeeded,
            message: None,
        }
    }

    /// Builds a failed outcome with a message.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: CheckStatus::Failed,
            message: Some(message.into()),
        }
    }
}
