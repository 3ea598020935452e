// crates/certify-core/src/artifacts.rs
// ============================================================================
// Module: Test Artifacts
// Description: Per-test and per-session artifact directories.
// Purpose: Keep connector transcripts and summaries for diagnosis.
// Dependencies: serde, serde_jcs
// ============================================================================

//! ## Overview
//! [`ArtifactStore`] owns a directory of diagnostic files. Write sessions
//! store connector transcripts and stderr there; [`TestReporter`] writes a
//! summary for a whole test, even when the test panics.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

// ============================================================================
// SECTION: Artifact Store
// ============================================================================

/// Returns the current time in epoch milliseconds.
fn now_millis() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis()
}

/// Directory of diagnostic artifacts.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    /// Root directory.
    root: PathBuf,
}

impl ArtifactStore {
    /// Opens (and creates) a store rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns an error when the directory cannot be created.
    pub fn new(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
        })
    }

    /// Opens the store for a named test under `run_root`, or under
    /// `target/certify/run_<millis>` when no run root is configured.
    ///
    /// # Errors
    ///
    /// Returns an error when the directory cannot be created.
    pub fn for_test(run_root: Option<&Path>, test_name: &str) -> io::Result<Self> {
        let base = run_root.map_or_else(
            || PathBuf::from("target/certify").join(format!("run_{}", now_millis())),
            Path::to_path_buf,
        );
        Self::new(base.join(test_name))
    }

    /// Returns the root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Opens a child store.
    ///
    /// # Errors
    ///
    /// Returns an error when the directory cannot be created.
    pub fn child(&self, name: &str) -> io::Result<Self> {
        Self::new(self.root.join(name))
    }

    /// Writes a JSON artifact using canonical JCS serialization.
    ///
    /// # Errors
    ///
    /// Returns an error when serialization or the write fails.
    pub fn write_json<T: Serialize>(&self, name: &str, value: &T) -> io::Result<PathBuf> {
        let path = self.root.join(name);
        let bytes = serde_jcs::to_vec(value).map_err(|err| io::Error::other(err.to_string()))?;
        fs::write(&path, bytes)?;
        Ok(path)
    }

    /// Writes a UTF-8 text artifact.
    ///
    /// # Errors
    ///
    /// Returns an error when the write fails.
    pub fn write_text(&self, name: &str, value: &str) -> io::Result<PathBuf> {
        let path = self.root.join(name);
        fs::write(&path, value.as_bytes())?;
        Ok(path)
    }
}

// ============================================================================
// SECTION: Test Reporter
// ============================================================================

/// Summary written at the end of a test.
#[derive(Debug, Serialize)]
struct TestSummary {
    /// Test name.
    test_name: String,
    /// Final status label.
    status: String,
    /// Start time.
    started_at_ms: u128,
    /// End time.
    ended_at_ms: u128,
    /// Elapsed time.
    duration_ms: u128,
    /// Free-form notes.
    notes: Vec<String>,
}

/// Writes a summary for a test, even when it panics.
pub struct TestReporter {
    /// Artifact directory for the test.
    artifacts: ArtifactStore,
    /// Test name.
    test_name: String,
    /// Start time.
    started_at_ms: u128,
    /// Whether a summary was already written.
    finalized: bool,
}

impl TestReporter {
    /// Creates a reporter for the named test.
    ///
    /// # Errors
    ///
    /// Returns an error when the artifact directory cannot be created.
    pub fn new(run_root: Option<&Path>, test_name: &str) -> io::Result<Self> {
        Ok(Self {
            artifacts: ArtifactStore::for_test(run_root, test_name)?,
            test_name: test_name.to_string(),
            started_at_ms: now_millis(),
            finalized: false,
        })
    }

    /// Returns the artifact store.
    #[must_use]
    pub const fn artifacts(&self) -> &ArtifactStore {
        &self.artifacts
    }

    /// Writes the final summary.
    ///
    /// # Errors
    ///
    /// Returns an error when the summary cannot be written.
    pub fn finish(&mut self, status: &str, notes: Vec<String>) -> io::Result<()> {
        let ended_at_ms = now_millis();
        let summary = TestSummary {
            test_name: self.test_name.clone(),
            status: status.to_string(),
            started_at_ms: self.started_at_ms,
            ended_at_ms,
            duration_ms: ended_at_ms.saturating_sub(self.started_at_ms),
            notes,
        };
        self.artifacts.write_json("summary.json", &summary)?;
        self.finalized = true;
        Ok(())
    }
}

impl Drop for TestReporter {
    fn drop(&mut self) {
        if self.finalized {
            return;
        }
        let status = if std::thread::panicking() { "panic" } else { "unknown" };
        let _ = self.finish(status, vec!["test terminated without explicit summary".to_string()]);
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions favor direct unwrap.")]

    use super::TestReporter;

    #[test]
    fn reporter_writes_summary_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let root = {
            let reporter = TestReporter::new(Some(dir.path()), "dropped").unwrap();
            reporter.artifacts().root().to_path_buf()
        };
        let summary = std::fs::read_to_string(root.join("summary.json")).unwrap();
        assert!(summary.contains("\"status\":\"unknown\""));
    }
}
