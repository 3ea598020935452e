// crates/certify-core/src/core/session.rs
// ============================================================================
// Module: Write Sessions
// Description: Per-run context shared with connectors and collaborators.
// Purpose: Give each write run an isolated destination scope.
// Dependencies: rand, time
// ============================================================================

//! ## Overview
//! A [`SessionContext`] is created for every write run. Its namespace is
//! randomized so that concurrent sessions never share destination state, and
//! the same context is handed to the connector, the dumper, and the cleaner.

// ============================================================================
// SECTION: Imports
// ============================================================================

use rand::Rng;
use rand::distributions::Alphanumeric;
use time::OffsetDateTime;

use crate::core::deployment::DeploymentMode;
use crate::core::fixtures::ConfigDocument;
use crate::core::records::ConfiguredCatalog;
use crate::core::records::ConfiguredStream;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Length of the random namespace suffix.
const NAMESPACE_SUFFIX_LEN: usize = 8;

// ============================================================================
// SECTION: Session Context
// ============================================================================

/// Context for one write session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    /// Unique session identifier.
    pub session_id: String,
    /// Randomized namespace owned by this session.
    pub namespace: String,
    /// Stream bound to the session namespace.
    pub stream: ConfiguredStream,
    /// Configuration the connector runs with.
    pub config: ConfigDocument,
    /// Deployment mode of the run.
    pub mode: DeploymentMode,
}

impl SessionContext {
    /// Opens a new session with a fresh namespace.
    #[must_use]
    pub fn open(config: ConfigDocument, mode: DeploymentMode, stream: &ConfiguredStream) -> Self {
        let namespace = random_namespace();
        Self {
            session_id: format!("session-{namespace}"),
            stream: stream.in_namespace(&namespace),
            namespace,
            config,
            mode,
        }
    }

    /// Returns the single-stream catalog for the session.
    #[must_use]
    pub fn catalog(&self) -> ConfiguredCatalog {
        ConfiguredCatalog {
            streams: vec![self.stream.clone()],
        }
    }
}

/// Builds a namespace of the form `test<YYYYMMDD><suffix>`.
#[must_use]
pub fn random_namespace() -> String {
    let date = OffsetDateTime::now_utc().date();
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(NAMESPACE_SUFFIX_LEN)
        .map(|byte| char::from(byte).to_ascii_lowercase())
        .collect();
    format!("test{:04}{:02}{:02}{suffix}", date.year(), u8::from(date.month()), date.day())
}

#[cfg(test)]
mod tests {
    use super::random_namespace;

    #[test]
    fn namespaces_are_unique_and_lowercase() {
        let first = random_namespace();
        let second = random_namespace();
        assert_ne!(first, second);
        assert!(first.starts_with("test"));
        assert_eq!(first.len(), "test".len() + 8 + 8);
        assert!(first.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }
}
